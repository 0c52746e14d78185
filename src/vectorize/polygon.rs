//! Optimal polygon approximation (analysis stages 1-3).
//!
//! Given a closed pixel-corner contour, find the polygon with the fewest
//! vertices whose edges each stay within half a pixel of the contour,
//! then refine every vertex to the sub-pixel position minimizing squared
//! distance to the two adjacent edge lines.
//!
//! 1. **Prefix sums** (`calc_sums`) — O(1) line-fit statistics for any
//!    cyclic sub-range of the contour.
//! 2. **Longest straight subpath** (`calc_lon`) — for each point, the
//!    farthest point reachable by a single straight line, via
//!    constraint-pair propagation.
//! 3. **Optimal polygon** (`best_polygon`) — dynamic program minimizing
//!    segment count first, total line-fit penalty second.
//! 4. **Vertex adjustment** (`adjust_vertices`) — quadratic-form
//!    minimization constrained to the unit square around each polygon
//!    vertex; also flips winding for hole contours.

use kurbo::Point;

use crate::geom::{cyclic, floordiv, pmod, sign, xprod};

/// Prefix sum accumulator for O(1) line-fit statistics.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Sums {
    x: f64,
    y: f64,
    x2: f64,
    xy: f64,
    y2: f64,
}

// ── Stage 1a: prefix sums ────────────────────────────────

/// Compute prefix sums of x, y, x², xy, y² relative to point 0.
///
/// For a cyclic range wrapping r times past the end, the range sum is
/// `sums[j+1] - sums[i] + r * sums[n]`.
pub(crate) fn calc_sums(pt: &[(i32, i32)]) -> Vec<Sums> {
    let n = pt.len();
    let (x0, y0) = pt[0];

    let mut sums = vec![Sums::default(); n + 1];
    for i in 0..n {
        let x = (pt[i].0 - x0) as f64;
        let y = (pt[i].1 - y0) as f64;
        sums[i + 1] = Sums {
            x: sums[i].x + x,
            y: sums[i].y + y,
            x2: sums[i].x2 + x * x,
            xy: sums[i].xy + x * y,
            y2: sums[i].y2 + y * y,
        };
    }
    sums
}

// ── Stage 1b: longest straight subpath ───────────────────

/// For each point i, compute the farthest point (cyclically) reachable
/// by a straight line that stays within half a pixel of every
/// intermediate point.
///
/// Walking forward from i, two constraint vectors bound the admissible
/// directions; each visited point more than one pixel away tightens them
/// by half-pixel rounding offsets. The walk also ends when steps in all
/// four cardinal directions have occurred, since no line can follow
/// that. On a constraint violation, the exact last admissible point is
/// found by integer floor division along the violating straight run.
///
/// The direction index `(3 + 3*dx + dy) / 2` maps a cardinal step to
/// 0..=3 (west, south, north, east).
pub(crate) fn calc_lon(pt: &[(i32, i32)]) -> Vec<usize> {
    let n = pt.len();
    let mut lon = vec![0usize; n];

    // nc[i]: next direction change after i. The contour construction
    // guarantees a direction change at index 0, which seeds the cycle.
    let mut nc = vec![0usize; n];
    let mut k = 0usize;
    for i in (0..n).rev() {
        if pt[i].0 != pt[k].0 && pt[i].1 != pt[k].1 {
            k = i + 1;
        }
        nc[i] = k % n;
    }

    let mut pivk = vec![0usize; n];

    for i in (0..n).rev() {
        let mut ct = [0i32; 4];
        let mut constraint = [(0i32, 0i32); 2];

        // direction of the step leaving i
        let i1 = (i + 1) % n;
        let dir = ((3 + 3 * (pt[i1].0 - pt[i].0) + (pt[i1].1 - pt[i].1)) / 2) as usize;
        ct[dir] += 1;

        let mut k = nc[i];
        let mut k1 = i;
        loop {
            let dir =
                ((3 + 3 * sign(pt[k].0 - pt[k1].0) + sign(pt[k].1 - pt[k1].1)) / 2) as usize;
            ct[dir] += 1;

            // all four directions seen: the path must turn here
            if ct[0] != 0 && ct[1] != 0 && ct[2] != 0 && ct[3] != 0 {
                pivk[i] = k1;
                break;
            }

            let cur = (pt[k].0 - pt[i].0, pt[k].1 - pt[i].1);

            if xprod(constraint[0], cur) < 0 || xprod(constraint[1], cur) > 0 {
                pivk[i] = pivot_at_violation(pt, &constraint, k, k1, i);
                break;
            }

            // tighten constraints; points within the unit box impose none
            if !(cur.0.abs() <= 1 && cur.1.abs() <= 1) {
                let off = (
                    cur.0 + if cur.1 >= 0 && (cur.1 > 0 || cur.0 < 0) { 1 } else { -1 },
                    cur.1 + if cur.0 <= 0 && (cur.0 < 0 || cur.1 < 0) { 1 } else { -1 },
                );
                if xprod(constraint[0], off) >= 0 {
                    constraint[0] = off;
                }
                let off = (
                    cur.0 + if cur.1 <= 0 && (cur.1 < 0 || cur.0 < 0) { 1 } else { -1 },
                    cur.1 + if cur.0 >= 0 && (cur.0 > 0 || cur.1 < 0) { 1 } else { -1 },
                );
                if xprod(constraint[1], off) <= 0 {
                    constraint[1] = off;
                }
            }

            k1 = k;
            k = nc[k1];
            if !cyclic(k, i, k1) {
                pivk[i] = pivot_at_violation(pt, &constraint, k, k1, i);
                break;
            }
        }
    }

    // back-propagate pivk into lon
    let mut j = pivk[n - 1];
    lon[n - 1] = j;
    for i in (0..n - 1).rev() {
        if cyclic(i + 1, pivk[i], j) {
            j = pivk[i];
        }
        lon[i] = j;
    }

    // cyclic fix-up pass
    let mut i = n - 1;
    while cyclic((i + 1) % n, j, lon[i]) {
        lon[i] = j;
        if i == 0 {
            break;
        }
        i -= 1;
    }

    lon
}

/// Last point along the straight run k1 -> k still satisfying both
/// constraints, found as the largest integer j with
/// `a + j*b >= 0` and `c + j*d <= 0` (bilinearity of the cross product).
fn pivot_at_violation(
    pt: &[(i32, i32)],
    constraint: &[(i32, i32); 2],
    k: usize,
    k1: usize,
    i: usize,
) -> usize {
    let n = pt.len();
    let dk = (
        sign(pt[k].0 - pt[k1].0),
        sign(pt[k].1 - pt[k1].1),
    );
    let cur = (pt[k1].0 - pt[i].0, pt[k1].1 - pt[i].1);

    let a = xprod(constraint[0], cur);
    let b = xprod(constraint[0], dk);
    let c = xprod(constraint[1], cur);
    let d = xprod(constraint[1], dk);

    let mut j = 10_000_000i64;
    if b < 0 {
        j = floordiv(a, -b);
    }
    if d > 0 {
        j = j.min(floordiv(-c, d));
    }
    pmod(k1 as isize + j as isize, n)
}

// ── Stage 2: optimal polygon ─────────────────────────────

/// Find the optimal polygon: minimum vertex count, then minimum total
/// penalty. Returns vertex indices into `pt` in cyclic order.
pub(crate) fn best_polygon(pt: &[(i32, i32)], lon: &[usize], sums: &[Sums]) -> Vec<usize> {
    let n = pt.len();

    // clip0[i]: farthest vertex reachable from i, non-cyclic.
    let mut clip0 = vec![0usize; n];
    for i in 0..n {
        let prev = if i == 0 { n - 1 } else { i - 1 };
        let mut c = pmod(lon[prev] as isize - 1, n);
        if c == i {
            c = (i + 1) % n;
        }
        clip0[i] = if c < i { n } else { c };
    }

    // clip1[j]: earliest vertex from which j is reachable
    // (j <= clip0[i] iff clip1[j] <= i).
    let mut clip1 = vec![0usize; n + 1];
    let mut j = 1usize;
    for i in 0..n {
        while j <= clip0[i] {
            clip1[j] = i;
            j += 1;
        }
    }

    // seg0[j]: farthest point reachable from 0 with j segments.
    let mut seg0 = vec![0usize; n + 1];
    let m;
    {
        let mut i = 0usize;
        let mut j = 0usize;
        while i < n {
            seg0[j] = i;
            i = clip0[i];
            j += 1;
        }
        seg0[j] = n;
        m = j;
    }

    // seg1[j]: earliest point from which n is reachable with m-j segments.
    let mut seg1 = vec![0usize; m + 1];
    {
        let mut i = n;
        for j in (1..=m).rev() {
            seg1[j] = i;
            i = clip1[i];
        }
        seg1[0] = 0;
    }

    // Shortest path with m segments, minimizing penalty. The two outer
    // loops jointly cover at most n cells, so this is quadratic only in
    // the worst case.
    let mut pen = vec![-1.0f64; n + 1];
    let mut prev = vec![0usize; n + 1];
    pen[0] = 0.0;

    for j in 1..=m {
        for i in seg1[j]..=seg0[j] {
            let mut best = -1.0f64;
            let mut k = seg0[j - 1];
            let k_end = clip1[i];
            while k >= k_end {
                if pen[k] >= 0.0 {
                    let thispen = penalty3(pt, sums, k, i) + pen[k];
                    if best < 0.0 || thispen < best {
                        prev[i] = k;
                        best = thispen;
                    }
                }
                if k == 0 {
                    break;
                }
                k -= 1;
            }
            pen[i] = best;
        }
    }

    // read off the optimal vertex chain
    let mut po = vec![0usize; m];
    let mut i = n;
    for j in (0..m).rev() {
        i = prev[i];
        po[j] = i;
    }
    po
}

/// Penalty of approximating the contour range [i..j] by the chord
/// pt[i] -> pt[j]: sqrt of the mean squared orthogonal distance of the
/// range's points to the chord, times the chord length. O(1) via the
/// prefix sums.
fn penalty3(pt: &[(i32, i32)], sums: &[Sums], i: usize, j: usize) -> f64 {
    let n = pt.len();
    let (x0, y0) = pt[0];

    // r = number of wraps from i to j
    let (jn, r) = if j >= n { (j - n, 1.0) } else { (j, 0.0) };

    let x = sums[jn + 1].x - sums[i].x + r * sums[n].x;
    let y = sums[jn + 1].y - sums[i].y + r * sums[n].y;
    let x2 = sums[jn + 1].x2 - sums[i].x2 + r * sums[n].x2;
    let xy = sums[jn + 1].xy - sums[i].xy + r * sums[n].xy;
    let y2 = sums[jn + 1].y2 - sums[i].y2 + r * sums[n].y2;
    let k = (jn + 1 - i) as f64 + r * n as f64;

    let px = (pt[i].0 + pt[jn].0) as f64 / 2.0 - x0 as f64;
    let py = (pt[i].1 + pt[jn].1) as f64 / 2.0 - y0 as f64;
    let ey = (pt[jn].0 - pt[i].0) as f64;
    let ex = -(pt[jn].1 - pt[i].1) as f64;

    let a = (x2 - 2.0 * x * px) / k + px * px;
    let b = (xy - x * py - y * px) / k + px * py;
    let c = (y2 - 2.0 * y * py) / k + py * py;

    let s = ex * ex * a + 2.0 * ex * ey * b + ey * ey * c;
    s.max(0.0).sqrt()
}

// ── Stage 3: vertex adjustment ───────────────────────────

type QuadForm = [[f64; 3]; 3];

/// Refine each polygon vertex to the optimal sub-pixel position.
///
/// Each polygon edge gets a best-fit line (centroid plus principal
/// eigenvector of the range covariance), encoded as a singular 3x3
/// quadratic form measuring squared distance from the line. Each vertex
/// minimizes the sum of its two adjacent forms over the unit square
/// centered on the original corner: first the unconstrained 2x2 solve
/// (with an orthogonal auxiliary axis added if the system is singular),
/// then the four square edges and corners if the interior solution
/// escapes the square.
///
/// For hole contours (`sign == false`) the vertex order is reversed on
/// write, so every curve downstream winds consistently.
pub(crate) fn adjust_vertices(
    pt: &[(i32, i32)],
    po: &[usize],
    sums: &[Sums],
    path_sign: bool,
) -> Vec<Point> {
    let n = pt.len();
    let m = po.len();
    let (x0, y0) = pt[0];

    let mut ctr = vec![(0.0f64, 0.0f64); m];
    let mut dir = vec![(0.0f64, 0.0f64); m];
    for i in 0..m {
        let j = po[(i + 1) % m];
        let j = pmod(j as isize - po[i] as isize, n) + po[i];
        let (c, d) = point_slope(pt, sums, po[i], j);
        ctr[i] = c;
        dir[i] = d;
    }

    // one singular quadratic form per edge line
    let mut q = vec![[[0.0f64; 3]; 3]; m];
    for i in 0..m {
        let d = dir[i].0 * dir[i].0 + dir[i].1 * dir[i].1;
        if d != 0.0 {
            let v = [
                dir[i].1,
                -dir[i].0,
                dir[i].0 * ctr[i].1 - dir[i].1 * ctr[i].0,
            ];
            for l in 0..3 {
                for k in 0..3 {
                    q[i][l][k] = v[l] * v[k] / d;
                }
            }
        }
    }

    let mut vertices = vec![Point::ZERO; m];
    for i in 0..m {
        // vertex in coordinates relative to point 0
        let s = (
            (pt[po[i]].0 - x0) as f64,
            (pt[po[i]].1 - y0) as f64,
        );

        let iprev = (i + m - 1) % m;
        let mut qq: QuadForm = [[0.0; 3]; 3];
        for l in 0..3 {
            for k in 0..3 {
                qq[l][k] = q[iprev][l][k] + q[i][l][k];
            }
        }

        let (mut wx, mut wy);
        loop {
            let det = qq[0][0] * qq[1][1] - qq[0][1] * qq[1][0];
            if det != 0.0 {
                wx = (-qq[0][2] * qq[1][1] + qq[1][2] * qq[0][1]) / det;
                wy = (qq[0][2] * qq[1][0] - qq[1][2] * qq[0][0]) / det;
                break;
            }
            // singular: the lines are parallel. Add an orthogonal axis
            // through the square center and re-solve.
            let (v0, v1) = if qq[0][0] > qq[1][1] {
                (-qq[0][1], qq[0][0])
            } else if qq[1][1] != 0.0 {
                (-qq[1][1], qq[1][0])
            } else {
                (1.0, 0.0)
            };
            let d = v0 * v0 + v1 * v1;
            let v2 = -v1 * s.1 - v0 * s.0;
            let v = [v0, v1, v2];
            for l in 0..3 {
                for k in 0..3 {
                    qq[l][k] += v[l] * v[k] / d;
                }
            }
        }

        let out = if path_sign { i } else { m - 1 - i };

        if (wx - s.0).abs() <= 0.5 && (wy - s.1).abs() <= 0.5 {
            vertices[out] = Point::new(wx + x0 as f64, wy + y0 as f64);
            continue;
        }

        // interior minimum escaped the square: minimize on its boundary
        let mut min = eval_quadform(&qq, s.0, s.1);
        let mut xmin = s.0;
        let mut ymin = s.1;

        if qq[0][0] != 0.0 {
            for z in 0..2 {
                // minimum along a horizontal edge of the square
                let wy = s.1 - 0.5 + z as f64;
                let wx = -(qq[0][1] * wy + qq[0][2]) / qq[0][0];
                if (wx - s.0).abs() <= 0.5 {
                    let cand = eval_quadform(&qq, wx, wy);
                    if cand < min {
                        min = cand;
                        xmin = wx;
                        ymin = wy;
                    }
                }
            }
        }
        if qq[1][1] != 0.0 {
            for z in 0..2 {
                // minimum along a vertical edge of the square
                let wx = s.0 - 0.5 + z as f64;
                let wy = -(qq[1][0] * wx + qq[1][2]) / qq[1][1];
                if (wy - s.1).abs() <= 0.5 {
                    let cand = eval_quadform(&qq, wx, wy);
                    if cand < min {
                        min = cand;
                        xmin = wx;
                        ymin = wy;
                    }
                }
            }
        }
        for l in 0..2 {
            for k in 0..2 {
                let wx = s.0 - 0.5 + l as f64;
                let wy = s.1 - 0.5 + k as f64;
                let cand = eval_quadform(&qq, wx, wy);
                if cand < min {
                    min = cand;
                    xmin = wx;
                    ymin = wy;
                }
            }
        }

        vertices[out] = Point::new(xmin + x0 as f64, ymin + y0 as f64);
    }
    vertices
}

/// Best-fit line through the contour range [a..b]: centroid (relative
/// to point 0) and the unit eigenvector of the covariance matrix for
/// its larger eigenvalue.
fn point_slope(
    pt: &[(i32, i32)],
    sums: &[Sums],
    a: usize,
    b: usize,
) -> ((f64, f64), (f64, f64)) {
    let n = pt.len();
    let (bn, r) = if b >= n { (b - n, 1.0) } else { (b, 0.0) };

    let x = sums[bn + 1].x - sums[a].x + r * sums[n].x;
    let y = sums[bn + 1].y - sums[a].y + r * sums[n].y;
    let x2 = sums[bn + 1].x2 - sums[a].x2 + r * sums[n].x2;
    let xy = sums[bn + 1].xy - sums[a].xy + r * sums[n].xy;
    let y2 = sums[bn + 1].y2 - sums[a].y2 + r * sums[n].y2;
    let k = (bn + 1 - a) as f64 + r * n as f64;

    let ctr = (x / k, y / k);

    let mut ca = (x2 - x * x / k) / k;
    let cb = (xy - x * y / k) / k;
    let mut cc = (y2 - y * y / k) / k;

    // larger eigenvalue of [[ca, cb], [cb, cc]]
    let lambda2 = (ca + cc + ((ca - cc) * (ca - cc) + 4.0 * cb * cb).sqrt()) / 2.0;
    ca -= lambda2;
    cc -= lambda2;

    let dir = if ca.abs() >= cc.abs() {
        let l = (ca * ca + cb * cb).sqrt();
        if l == 0.0 {
            (0.0, 0.0)
        } else {
            (-cb / l, ca / l)
        }
    } else {
        let l = (cc * cc + cb * cb).sqrt();
        if l == 0.0 {
            (0.0, 0.0)
        } else {
            (-cc / l, cb / l)
        }
    };

    (ctr, dir)
}

/// Evaluate a quadratic form at (x, y): [x, y, 1] Q [x, y, 1]^T.
fn eval_quadform(q: &QuadForm, x: f64, y: f64) -> f64 {
    let p = [x, y, 1.0];
    let mut val = 0.0;
    for l in 0..3 {
        for k in 0..3 {
            val += p[l] * q[l][k] * p[k];
        }
    }
    val
}
