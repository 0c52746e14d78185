//! End-to-end tracing scenarios: raster in, curve tree out.

use bit2bez::{trace, Bitmap, Segment, TraceParams, TracedPath};
use kurbo::Point;

fn filled_rect(bitmap: &mut Bitmap, x0: i32, y0: i32, x1: i32, y1: i32) {
    for y in y0..y1 {
        for x in x0..x1 {
            bitmap.set(x, y);
        }
    }
}

/// The joint points of a curve made only of corners, as (x, y) pairs.
fn corner_joints(path: &TracedPath) -> Vec<(f64, f64)> {
    let mut joints = Vec::new();
    for seg in path.curve().segments() {
        match *seg {
            Segment::Corner { c1, end } => {
                joints.push((c1.x, c1.y));
                joints.push((end.x, end.y));
            }
            Segment::Bezier { .. } => panic!("expected a purely polygonal curve"),
        }
    }
    joints
}

/// Compare two closed point sequences up to cyclic rotation.
fn assert_cyclically_equal(actual: &[(f64, f64)], expected: &[(f64, f64)]) {
    assert_eq!(actual.len(), expected.len());
    let n = actual.len();
    let eq = |a: (f64, f64), b: (f64, f64)| (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9;
    let found = (0..n).any(|shift| (0..n).all(|i| eq(actual[(i + shift) % n], expected[i])));
    assert!(found, "sequences differ beyond rotation:\n{actual:?}\nvs\n{expected:?}");
}

#[test]
fn empty_raster_yields_empty_trace() {
    let bitmap = Bitmap::new(1, 1).unwrap();
    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn filled_rectangle_traces_to_four_corners() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    filled_rect(&mut bitmap, 8, 8, 24, 24);

    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert_eq!(result.roots().len(), 1);

    let path = &result.roots()[0];
    assert!(path.sign());
    assert_eq!(path.area(), 256);
    assert!(path.children().is_empty());
    assert_eq!(path.curve().segments().len(), 4);

    assert_cyclically_equal(
        &corner_joints(path),
        &[
            (8.0, 8.0),
            (16.0, 8.0),
            (24.0, 8.0),
            (24.0, 16.0),
            (24.0, 24.0),
            (16.0, 24.0),
            (8.0, 24.0),
            (8.0, 16.0),
        ],
    );
}

#[test]
fn filled_disk_traces_to_a_smooth_loop() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    for y in 0..32 {
        for x in 0..32 {
            let dx = x as f64 + 0.5 - 16.0;
            let dy = y as f64 + 0.5 - 16.0;
            if dx * dx + dy * dy <= 64.0 {
                bitmap.set(x, y);
            }
        }
    }

    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert_eq!(result.roots().len(), 1);

    let path = &result.roots()[0];
    assert!(path.sign());
    assert!(path.children().is_empty());
    assert!(path
        .curve()
        .segments()
        .iter()
        .any(|seg| matches!(seg, Segment::Bezier { .. })));

    // every tessellated point stays close to the ideal circle
    let center = Point::new(16.0, 16.0);
    let samples = path.curve().tessellate(10);
    assert!(!samples.is_empty());
    for p in &samples {
        let r = p.distance(center);
        assert!((r - 8.0).abs() < 1.5, "sample {p:?} at radius {r}");
    }
}

#[test]
fn frame_with_hole_builds_two_level_tree() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    filled_rect(&mut bitmap, 8, 8, 24, 24);
    // carve the hole: clear the interior, leaving a width-2 frame
    for y in 10..22 {
        for x in 10..22 {
            bitmap.clear(x, y);
        }
    }

    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert_eq!(result.roots().len(), 1);

    let outer = &result.roots()[0];
    assert!(outer.sign());
    assert_eq!(outer.children().len(), 1);

    let hole = &outer.children()[0];
    assert!(!hole.sign());
    assert!(hole.area() < 0);
    assert!(hole.children().is_empty());
}

#[test]
fn single_pixel_is_despeckled() {
    let mut bitmap = Bitmap::new(16, 16).unwrap();
    bitmap.set(7, 7);
    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert!(result.is_empty());
}

#[test]
fn disjoint_squares_become_siblings() {
    let mut bitmap = Bitmap::new(48, 24).unwrap();
    filled_rect(&mut bitmap, 4, 8, 16, 20);
    filled_rect(&mut bitmap, 28, 8, 40, 20);

    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    assert_eq!(result.roots().len(), 2);
    for path in result.roots() {
        assert!(path.sign());
        assert!(path.children().is_empty());
        assert_eq!(path.area(), 144);
    }
}

#[test]
fn raw_contours_are_closed_unit_step_loops() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    filled_rect(&mut bitmap, 8, 8, 24, 24);
    bitmap.clear(15, 15); // pinhole, despeckled but perturbs nothing

    let result = trace(&bitmap, &TraceParams::default()).unwrap();
    for path in result.iter() {
        let pts = path.points();
        let n = pts.len();
        assert!(n >= 4);
        for i in 0..n {
            let (x0, y0) = pts[i];
            let (x1, y1) = pts[(i + 1) % n];
            assert_eq!(
                (x1 - x0).abs() + (y1 - y0).abs(),
                1,
                "non-unit step at {i} of {n}"
            );
        }
        // sign coherence: foreground contours have positive area
        assert_eq!(path.sign(), path.area() > 0);
    }
}

#[test]
fn polygonal_mode_emits_only_corners() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    filled_rect(&mut bitmap, 8, 8, 24, 24);
    let params = TraceParams {
        alphamax: 0.0,
        ..TraceParams::default()
    };
    let result = trace(&bitmap, &params).unwrap();
    for path in result.iter() {
        assert!(path
            .curve()
            .segments()
            .iter()
            .all(|seg| matches!(seg, Segment::Corner { .. })));
    }
}

#[test]
fn disabling_optimization_still_produces_a_curve() {
    let mut bitmap = Bitmap::new(32, 32).unwrap();
    for y in 0..32 {
        for x in 0..32 {
            let dx = x as f64 + 0.5 - 16.0;
            let dy = y as f64 + 0.5 - 16.0;
            if dx * dx + dy * dy <= 64.0 {
                bitmap.set(x, y);
            }
        }
    }
    let plain = trace(
        &bitmap,
        &TraceParams {
            opttolerance: 0.0,
            ..TraceParams::default()
        },
    )
    .unwrap();
    let optimized = trace(&bitmap, &TraceParams::default()).unwrap();

    let plain_len = plain.roots()[0].curve().segments().len();
    let optimized_len = optimized.roots()[0].curve().segments().len();
    assert!(plain_len >= optimized_len);
    assert!(optimized_len >= 1);
}

#[test]
fn cancellation_returns_no_partial_tree() {
    use bit2bez::{trace_with, CancelToken, Monitor};

    let mut bitmap = Bitmap::new(32, 32).unwrap();
    filled_rect(&mut bitmap, 8, 8, 24, 24);
    let token = CancelToken::new();
    token.cancel();
    let monitor = Monitor::new().with_cancel(&token);
    assert!(trace_with(&bitmap, &TraceParams::default(), &monitor).is_err());
}

#[test]
fn progress_reports_cover_both_stages() {
    use bit2bez::{trace_with, Monitor, ProgressSink, ProgressStage};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        fractions: Mutex<Vec<(ProgressStage, f64)>>,
    }
    impl ProgressSink for Recorder {
        fn report(&self, stage: ProgressStage, fraction: f64) {
            self.fractions.lock().unwrap().push((stage, fraction));
        }
    }

    let mut bitmap = Bitmap::new(64, 64).unwrap();
    filled_rect(&mut bitmap, 4, 4, 28, 28);
    filled_rect(&mut bitmap, 36, 36, 60, 60);

    let recorder = Recorder::default();
    let monitor = Monitor::new().with_sink(&recorder);
    trace_with(&bitmap, &TraceParams::default(), &monitor).unwrap();

    let reports = recorder.fractions.into_inner().unwrap();
    assert!(!reports.is_empty());
    for stage in [ProgressStage::PathListGeneration, ProgressStage::Tracing] {
        let series: Vec<f64> = reports
            .iter()
            .filter(|(s, _)| *s == stage)
            .map(|&(_, f)| f)
            .collect();
        assert!(!series.is_empty(), "no reports for {stage:?}");
        assert!(series.iter().all(|f| (0.0..=1.0).contains(f)));
    }

    // contour extraction is single-threaded, so its reports arrive in
    // strictly non-decreasing order
    let extraction: Vec<f64> = reports
        .iter()
        .filter(|(s, _)| *s == ProgressStage::PathListGeneration)
        .map(|&(_, f)| f)
        .collect();
    for w in extraction.windows(2) {
        assert!(w[0] <= w[1], "extraction went backwards: {extraction:?}");
    }

    // the tracing counter is atomic: every path reports once and the
    // final count reaches 1.0, though worker threads may deliver
    // adjacent fractions out of order
    let tracing: Vec<f64> = reports
        .iter()
        .filter(|(s, _)| *s == ProgressStage::Tracing)
        .map(|&(_, f)| f)
        .collect();
    assert_eq!(tracing.len(), 2); // one report per traced path
    assert!(tracing.iter().any(|&f| f == 1.0));
}
