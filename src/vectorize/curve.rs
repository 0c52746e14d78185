//! Curve model, smoothing and corner detection (analysis stage 4).
//!
//! Converts the adjusted polygon vertices into a closed sequence of
//! segments: a pointed corner where the local deviation is large, a
//! cubic Bezier elsewhere. Also hosts the tessellation and BezPath
//! bridges consumed by backends.

use kurbo::{BezPath, Point};

use crate::geom::{ddenom, dpara, interval};

/// One segment of a closed curve.
///
/// The start point is implicit: each segment begins where its
/// predecessor ends (cyclically), so a curve of m segments is a closed
/// loop of m shared joints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Segment {
    /// Two straight joints: the preceding segment's end connects to `c1`
    /// (the pointed corner itself), then to `end`.
    Corner { c1: Point, end: Point },
    /// Cubic Bezier with control points `c0`, `c1`.
    Bezier { c0: Point, c1: Point, end: Point },
}

impl Segment {
    /// The segment's endpoint (the next segment's start).
    pub fn end(&self) -> Point {
        match *self {
            Segment::Corner { end, .. } => end,
            Segment::Bezier { end, .. } => end,
        }
    }

    /// Sample the segment into a polyline, given its start point.
    ///
    /// A Bezier yields `resolution + 1` points including both endpoints,
    /// iterated with third-order forward differences so the first sample
    /// is exactly `start` (the last lands on `end` up to accumulated
    /// rounding). A corner yields its two joints; `start` is not
    /// repeated.
    pub fn tessellate(&self, start: Point, resolution: u32) -> Vec<Point> {
        match *self {
            Segment::Corner { c1, end } => vec![c1, end],
            Segment::Bezier { c0, c1, end } => {
                let r = resolution.max(1);
                let h = 1.0 / r as f64;

                // power-basis coefficients of the cubic
                let p0 = start.to_vec2();
                let p1 = c0.to_vec2();
                let p2 = c1.to_vec2();
                let p3 = end.to_vec2();
                let a = -p0 + 3.0 * p1 - 3.0 * p2 + p3;
                let b = 3.0 * p0 - 6.0 * p1 + 3.0 * p2;
                let c = -3.0 * p0 + 3.0 * p1;

                let h2 = h * h;
                let h3 = h2 * h;
                let mut f = p0;
                let mut df = a * h3 + b * h2 + c * h;
                let mut ddf = 6.0 * a * h3 + 2.0 * b * h2;
                let dddf = 6.0 * a * h3;

                let mut out = Vec::with_capacity(r as usize + 1);
                out.push(start);
                for _ in 0..r {
                    f += df;
                    df += ddf;
                    ddf += dddf;
                    out.push(f.to_point());
                }
                out
            }
        }
    }
}

/// A closed curve: segments plus the per-vertex shape parameters that
/// the optimization stage consumes.
#[derive(Debug, Clone, Default)]
pub struct Curve {
    pub(crate) segments: Vec<Segment>,
    /// The adjusted polygon vertex each segment bends around.
    pub(crate) vertex: Vec<Point>,
    /// Cropped smoothing parameter per vertex.
    pub(crate) alpha: Vec<f64>,
    /// Uncropped smoothing parameter per vertex.
    pub(crate) alpha0: Vec<f64>,
    /// Split ratio between adjacent segments per vertex.
    pub(crate) beta: Vec<f64>,
}

impl Curve {
    /// Number of segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// The segments in cyclic order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// The curve's start point: the endpoint of the last segment.
    pub fn start_point(&self) -> Option<Point> {
        self.segments.last().map(Segment::end)
    }

    /// Adjusted polygon vertices, one per segment.
    pub fn vertices(&self) -> &[Point] {
        &self.vertex
    }

    /// Cropped per-vertex smoothing parameters.
    pub fn alpha(&self) -> &[f64] {
        &self.alpha
    }

    /// Raw (uncropped) per-vertex smoothing parameters.
    pub fn alpha0(&self) -> &[f64] {
        &self.alpha0
    }

    /// Per-vertex split ratios.
    pub fn beta(&self) -> &[f64] {
        &self.beta
    }

    /// Sample the whole closed curve into a polyline.
    ///
    /// Each Bezier contributes `resolution` points beyond its start,
    /// each corner its two joints; junction points are emitted once.
    /// The first emitted point is the curve's start point.
    pub fn tessellate(&self, resolution: u32) -> Vec<Point> {
        let mut out = Vec::new();
        let Some(mut cursor) = self.start_point() else {
            return out;
        };
        out.push(cursor);
        for seg in &self.segments {
            let samples = seg.tessellate(cursor, resolution);
            let skip = match seg {
                // a Bezier's first sample repeats the cursor
                Segment::Bezier { .. } => 1,
                Segment::Corner { .. } => 0,
            };
            out.extend_from_slice(&samples[skip..]);
            cursor = seg.end();
        }
        // the final sample closes onto the start point already in `out`
        out.pop();
        out
    }

    /// Convert to a closed [`kurbo::BezPath`].
    pub fn to_bezpath(&self) -> BezPath {
        let mut path = BezPath::new();
        let Some(start) = self.start_point() else {
            return path;
        };
        path.move_to(start);
        for seg in &self.segments {
            match *seg {
                Segment::Corner { c1, end } => {
                    path.line_to(c1);
                    path.line_to(end);
                }
                Segment::Bezier { c0, c1, end } => {
                    path.curve_to(c0, c1, end);
                }
            }
        }
        path.close_path();
        path
    }
}

/// Build the smoothed curve from the adjusted polygon vertices.
///
/// For each vertex j with cyclic neighbours i and k, the deviation of j
/// from the chord i->k (normalized by the axis-snapped chord height and
/// rescaled by 3/4) gives the smoothing parameter alpha. At or above
/// `alphamax` the vertex becomes a pointed corner; below it, alpha is
/// cropped to [0.55, 1] and the two Bezier control points are placed on
/// the polygon legs at 1/2 + alpha/2. Segment endpoints sit at leg
/// midpoints, which keeps the loop exactly closed.
pub(crate) fn smooth(vertices: Vec<Point>, alphamax: f64) -> Curve {
    let m = vertices.len();
    let mut curve = Curve {
        segments: Vec::with_capacity(m),
        vertex: vertices,
        alpha: vec![0.0; m],
        alpha0: vec![0.0; m],
        beta: vec![0.0; m],
    };

    for j in 0..m {
        let i = (j + m - 1) % m;
        let k = (j + 1) % m;
        let (vi, vj, vk) = (curve.vertex[i], curve.vertex[j], curve.vertex[k]);

        let p4 = interval(0.5, vk, vj);

        let denom = ddenom(vi, vk);
        let mut alpha = if denom != 0.0 {
            let dd = (dpara(vi, vj, vk) / denom).abs();
            let raw = if dd > 1.0 { 1.0 - 1.0 / dd } else { 0.0 };
            raw / 0.75
        } else {
            4.0 / 3.0
        };
        curve.alpha0[j] = alpha;

        if alpha >= alphamax {
            curve.segments.push(Segment::Corner { c1: vj, end: p4 });
        } else {
            alpha = alpha.clamp(0.55, 1.0);
            let p2 = interval(0.5 + 0.5 * alpha, vi, vj);
            let p3 = interval(0.5 + 0.5 * alpha, vk, vj);
            curve.segments.push(Segment::Bezier {
                c0: p2,
                c1: p3,
                end: p4,
            });
        }
        curve.alpha[j] = alpha;
        curve.beta[j] = 0.5;
    }

    curve
}
