//! Contour extraction on the dual (pixel-corner) grid.
//!
//! Repeatedly finds the next set pixel in raster order, walks the closed
//! boundary of its connected region keeping the region on the left, then
//! XOR-fills the interior to remove it from the working bitmap. Diagonal
//! crossings — where two set pixels meet corner-to-corner — are resolved
//! by the configured turn policy.

use crate::bitmap::Bitmap;
use crate::config::{TraceParams, TurnPolicy};
use crate::error::TraceError;
use crate::progress::{Monitor, ProgressStage};

/// A closed path on the pixel-corner grid, as produced by the tracer.
///
/// Consecutive points differ by a unit axis step; the last point connects
/// back to the first. Point 0 is the contour's upper-left corner (highest
/// row, leftmost column within it), a property the nesting resolver
/// depends on.
#[derive(Debug, Clone)]
pub(crate) struct WorkPath {
    pub points: Vec<(i32, i32)>,
    /// Signed enclosed area: positive for foreground contours, negative
    /// for holes. Saturates instead of overflowing.
    pub area: i64,
    /// true = encloses foreground pixels, false = encloses background.
    pub sign: bool,
}

/// Deterministic coin flips for the Random turn policy (xorshift64*).
///
/// Seeded once per tracing run; the boolean is the high bit of the
/// advanced state, so results are reproducible across runs.
struct CoinFlip(u64);

impl CoinFlip {
    fn new() -> Self {
        CoinFlip(0x9e37_79b9_7f4a_7c15)
    }

    fn next(&mut self) -> bool {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_f491_4f6c_dd1d) >> 63 == 1
    }
}

/// Extract all contours of `work`, consuming its pixels.
///
/// `pristine` is the untouched input bitmap, consulted only for the sign
/// of each contour (the working copy has earlier contours XOR-ed away).
/// Contours with enclosed area at most `turdsize` are dropped.
pub(crate) fn decompose(
    work: &mut Bitmap,
    pristine: &Bitmap,
    params: &TraceParams,
    monitor: &Monitor<'_>,
) -> Result<Vec<WorkPath>, TraceError> {
    let mut paths = Vec::new();
    let mut rng = CoinFlip::new();
    let h = work.height() as f64;

    let mut x = 0;
    let mut y = work.height() as i32 - 1;
    while let Some((nx, ny)) = work.find_next_set(x, y) {
        monitor.check()?;
        x = nx;
        y = ny;

        let sign = pristine.get(x, y);
        let path = find_path(work, x, y + 1, sign, params.turnpolicy, &mut rng);
        xor_path(work, &path.points);

        if path.area.abs() > params.turdsize {
            paths.push(path);
        }
        monitor.report(ProgressStage::PathListGeneration, 1.0 - y as f64 / h);
    }
    Ok(paths)
}

/// Walk one closed contour starting from the upper-left corner of pixel
/// (x0, y0 - 1), heading downward.
///
/// At each corner the two pixels flanking the heading are probed:
/// `c` ahead-right, `d` ahead-left. The region being traced stays on the
/// left; `c` set with `d` unset is the ambiguous diagonal crossing
/// delegated to the turn policy. The pixel offsets `(dx + dy - 1) / 2`
/// etc. map each cardinal heading to the correct probe without
/// branching on the direction.
fn find_path(
    bm: &Bitmap,
    x0: i32,
    y0: i32,
    sign: bool,
    policy: TurnPolicy,
    rng: &mut CoinFlip,
) -> WorkPath {
    let mut points = Vec::new();
    let (mut x, mut y) = (x0, y0);
    let (mut dirx, mut diry) = (0i32, -1i32);
    let mut area: i64 = 0;

    loop {
        points.push((x, y));

        x += dirx;
        y += diry;
        area = area.saturating_add(x as i64 * diry as i64);

        if x == x0 && y == y0 {
            break;
        }

        let c = bm.get(x + (dirx + diry - 1) / 2, y + (diry - dirx - 1) / 2);
        let d = bm.get(x + (dirx - diry - 1) / 2, y + (diry + dirx - 1) / 2);

        if c && !d {
            // ambiguous diagonal crossing
            if turn_right(policy, sign, bm, x, y, rng) {
                let tmp = dirx;
                dirx = diry;
                diry = -tmp;
            } else {
                let tmp = dirx;
                dirx = -diry;
                diry = tmp;
            }
        } else if c {
            let tmp = dirx;
            dirx = diry;
            diry = -tmp;
        } else if !d {
            let tmp = dirx;
            dirx = -diry;
            diry = tmp;
        }
    }

    WorkPath {
        points,
        area: if sign { area } else { -area },
        sign,
    }
}

/// Resolve an ambiguous crossing: `true` chooses the right turn.
fn turn_right(
    policy: TurnPolicy,
    sign: bool,
    bm: &Bitmap,
    x: i32,
    y: i32,
    rng: &mut CoinFlip,
) -> bool {
    match policy {
        TurnPolicy::Right => true,
        TurnPolicy::Left => false,
        TurnPolicy::Black => sign,
        TurnPolicy::White => !sign,
        TurnPolicy::Majority => majority(bm, x, y),
        TurnPolicy::Minority => !majority(bm, x, y),
        TurnPolicy::Random => rng.next(),
    }
}

/// Majority vote around the corner (x, y): walk the four edges of the
/// axis-aligned square of radius r = 2..4, counting +1 per set and -1
/// per unset pixel; the first radius with a nonzero total decides.
fn majority(bm: &Bitmap, x: i32, y: i32) -> bool {
    for r in 2..5 {
        let mut ct = 0i32;
        for a in -r + 1..=r - 1 {
            ct += if bm.get(x + a, y + r - 1) { 1 } else { -1 };
            ct += if bm.get(x + r - 1, y + a - 1) { 1 } else { -1 };
            ct += if bm.get(x + a - 1, y - r) { 1 } else { -1 };
            ct += if bm.get(x - r, y + a) { 1 } else { -1 };
        }
        if ct > 0 {
            return true;
        } else if ct < 0 {
            return false;
        }
    }
    false
}

/// XOR-fill the interior of a closed corner-grid path.
///
/// For every vertical step of the path, the row below the step is
/// inverted between the step's column and a fixed word-aligned reference
/// column. Toggles outside the contour cancel pairwise, leaving exactly
/// the interior flipped.
pub(crate) fn xor_path(bm: &mut Bitmap, points: &[(i32, i32)]) {
    if points.is_empty() {
        return;
    }
    let mut y1 = points[points.len() - 1].1;
    let xa = points[0].0 & !63;
    for &(x, y) in points {
        if y != y1 {
            bm.xor_range(x, y.min(y1), xa);
            y1 = y;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_bitmap() -> Bitmap {
        // 16x16 filled square at pixels [8, 24) x [8, 24) in a 32x32 raster.
        let mut bm = Bitmap::new(32, 32).unwrap();
        for y in 8..24 {
            for x in 8..24 {
                bm.set(x, y);
            }
        }
        bm
    }

    fn run(bm: &Bitmap, params: &TraceParams) -> Vec<WorkPath> {
        let mut work = bm.clone();
        decompose(&mut work, bm, params, &Monitor::new()).unwrap()
    }

    #[test]
    fn square_produces_one_closed_contour() {
        let bm = square_bitmap();
        let params = TraceParams::default();
        let paths = run(&bm, &params);
        assert_eq!(paths.len(), 1);

        let p = &paths[0];
        assert!(p.sign);
        assert_eq!(p.area, 256);
        assert_eq!(p.points.len(), 64);
        assert_eq!(p.points[0], (8, 24)); // upper-left corner

        // closure by unit axis steps
        let n = p.points.len();
        for i in 0..n {
            let (x0, y0) = p.points[i];
            let (x1, y1) = p.points[(i + 1) % n];
            assert_eq!((x1 - x0).abs() + (y1 - y0).abs(), 1, "step {i}");
        }
    }

    #[test]
    fn working_bitmap_is_emptied() {
        let bm = square_bitmap();
        let mut work = bm.clone();
        decompose(&mut work, &bm, &TraceParams::default(), &Monitor::new()).unwrap();
        assert!(work.find_next_set(0, 31).is_none());
    }

    #[test]
    fn hole_contour_has_negative_sign_and_area() {
        // Frame: square with a hole.
        let mut bm = Bitmap::new(32, 32).unwrap();
        for y in 8..24 {
            for x in 8..24 {
                if !(10..22).contains(&x) || !(10..22).contains(&y) {
                    bm.set(x, y);
                }
            }
        }
        let paths = run(&bm, &TraceParams::default());
        assert_eq!(paths.len(), 2);
        assert!(paths[0].sign);
        assert!(!paths[1].sign);
        assert!(paths[0].area > 0);
        assert!(paths[1].area < 0);
        assert_eq!(paths[1].area, -144);
    }

    #[test]
    fn despeckle_drops_small_contours() {
        let mut bm = Bitmap::new(8, 8).unwrap();
        bm.set(3, 3);
        let params = TraceParams::default(); // turdsize = 2
        assert!(run(&bm, &params).is_empty());

        let keep_all = TraceParams {
            turdsize: 0,
            ..TraceParams::default()
        };
        assert_eq!(run(&bm, &keep_all).len(), 1);
    }

    #[test]
    fn turn_policy_resolves_checkerboard() {
        // Pixels (0,0) and (1,1) meet corner-to-corner: the crossing at
        // corner (1,1) is ambiguous.
        let mut bm = Bitmap::new(2, 2).unwrap();
        bm.set(0, 0);
        bm.set(1, 1);
        let base = TraceParams {
            turdsize: 0,
            ..TraceParams::default()
        };

        // Right turns connect the diagonal into a single contour.
        let right = run(
            &bm,
            &TraceParams {
                turnpolicy: TurnPolicy::Right,
                ..base.clone()
            },
        );
        assert_eq!(right.len(), 1);
        assert_eq!(right[0].area, 2);

        // Left turns keep the two pixels separate.
        let left = run(
            &bm,
            &TraceParams {
                turnpolicy: TurnPolicy::Left,
                ..base.clone()
            },
        );
        assert_eq!(left.len(), 2);
        assert_eq!(left[0].area, 1);
        assert_eq!(left[1].area, 1);
    }

    #[test]
    fn cancellation_aborts_decompose() {
        use crate::progress::CancelToken;
        let bm = square_bitmap();
        let mut work = bm.clone();
        let token = CancelToken::new();
        token.cancel();
        let monitor = Monitor::new().with_cancel(&token);
        let err = decompose(&mut work, &bm, &TraceParams::default(), &monitor);
        assert!(matches!(err, Err(TraceError::Cancelled)));
    }
}
