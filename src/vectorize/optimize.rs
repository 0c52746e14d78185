//! Curve optimization (analysis stage 5).
//!
//! Replaces maximal chains of consecutive Bezier segments that share one
//! convexity and bend less than 179 degrees in total by a single Bezier,
//! when one exists within the deviation tolerance. A dynamic program
//! picks the chain decomposition with the fewest segments, breaking ties
//! by accumulated squared deviation.

use kurbo::Point;

use crate::geom::{bezier, cprod, ddist, dpara, fsign, interval, iprod, iprod1, tangent};

use super::curve::{Curve, Segment};

/// cos(179 degrees): the bend limit for merging.
const COS_179: f64 = -0.999_847_695_156_391;

/// Candidate single-Bezier replacement for a segment chain.
#[derive(Debug, Clone, Copy)]
struct Opti {
    pen: f64,
    c: [Point; 2],
    t: f64,
    s: f64,
    alpha: f64,
}

/// Optimize the curve, merging Bezier chains within `opttolerance`.
pub(crate) fn opticurve(curve: &Curve, opttolerance: f64) -> Curve {
    let m = curve.len();

    // convexity per segment: turn sign at its vertex, 0 for corners
    let convc: Vec<i32> = (0..m)
        .map(|i| match curve.segments[i] {
            Segment::Bezier { .. } => fsign(dpara(
                curve.vertex[(i + m - 1) % m],
                curve.vertex[i],
                curve.vertex[(i + 1) % m],
            )) as i32,
            Segment::Corner { .. } => 0,
        })
        .collect();

    // cumulative area under the curve relative to its first vertex,
    // with each Bezier's contribution weighted by its alpha
    let mut areac = vec![0.0f64; m + 1];
    {
        let mut area = 0.0;
        let p0 = curve.vertex[0];
        for i in 0..m {
            let i1 = (i + 1) % m;
            if let Segment::Bezier { .. } = curve.segments[i1] {
                let alpha = curve.alpha[i1];
                area += 0.3
                    * alpha
                    * (4.0 - alpha)
                    * dpara(
                        curve.segments[i].end(),
                        curve.vertex[i1],
                        curve.segments[i1].end(),
                    )
                    / 2.0;
                area += dpara(p0, curve.segments[i].end(), curve.segments[i1].end()) / 2.0;
            }
            areac[i + 1] = area;
        }
    }

    // best chain decomposition of the prefix ending at j: fewest
    // segments first, then least penalty
    let mut pt = vec![-1isize; m + 1];
    let mut pen = vec![0.0f64; m + 1];
    let mut len = vec![0usize; m + 1];
    let mut opt: Vec<Option<Opti>> = vec![None; m + 1];

    for j in 1..=m {
        pt[j] = j as isize - 1;
        pen[j] = pen[j - 1];
        len[j] = len[j - 1] + 1;
        opt[j] = None;

        if j < 2 {
            continue;
        }
        for i in (0..=j - 2).rev() {
            let Some(o) = opti_penalty(curve, i, j % m, opttolerance, &convc, &areac) else {
                break;
            };
            if len[j] > len[i] + 1 || (len[j] == len[i] + 1 && pen[j] > pen[i] + o.pen) {
                pt[j] = i as isize;
                pen[j] = pen[i] + o.pen;
                len[j] = len[i] + 1;
                opt[j] = Some(o);
            }
        }
    }

    // read off the chosen chains back to front
    let om = len[m];
    let placeholder = Segment::Corner {
        c1: Point::ZERO,
        end: Point::ZERO,
    };
    let mut out = Curve {
        segments: vec![placeholder; om],
        vertex: vec![Point::ZERO; om],
        alpha: vec![0.0; om],
        alpha0: vec![0.0; om],
        beta: vec![0.0; om],
    };
    let mut s = vec![0.0f64; om];
    let mut t = vec![0.0f64; om];

    let mut j = m;
    for i in (0..om).rev() {
        let jm = j % m;
        if pt[j] == j as isize - 1 {
            out.segments[i] = curve.segments[jm];
            out.vertex[i] = curve.vertex[jm];
            out.alpha[i] = curve.alpha[jm];
            out.alpha0[i] = curve.alpha0[jm];
            out.beta[i] = curve.beta[jm];
            s[i] = 1.0;
            t[i] = 1.0;
        } else {
            let o = opt[j].expect("merged chain always carries its candidate");
            out.segments[i] = Segment::Bezier {
                c0: o.c[0],
                c1: o.c[1],
                end: curve.segments[jm].end(),
            };
            out.vertex[i] = interval(o.s, curve.segments[jm].end(), curve.vertex[jm]);
            out.alpha[i] = o.alpha;
            out.alpha0[i] = o.alpha;
            s[i] = o.s;
            t[i] = o.t;
        }
        j = pt[j] as usize;
    }

    for i in 0..om {
        out.beta[i] = s[i] / (s[i] + t[(i + 1) % om]);
    }
    out
}

/// Try to replace segments i+1..=j by a single Bezier; `None` if the
/// chain is not mergeable or misses the tolerance.
///
/// The chain must be corner-free with uniform convexity and total bend
/// under 179 degrees. The candidate's control points lie on the chords
/// towards the intersection of the chain's end tangents, scaled so the
/// candidate reproduces the chain's enclosed area. The candidate is then
/// validated against every skipped edge (tangency point within
/// `opttolerance` of the edge, and inside its span) and every skipped
/// joint chord (no undershoot beyond the tolerance).
fn opti_penalty(
    curve: &Curve,
    i: usize,
    j: usize,
    opttolerance: f64,
    convc: &[i32],
    areac: &[f64],
) -> Option<Opti> {
    let m = curve.len();

    // a full loop can never be a single segment
    if i == j {
        return None;
    }

    let i1 = (i + 1) % m;
    let conv = convc[i1];
    if conv == 0 {
        return None;
    }

    let d = ddist(curve.vertex[i], curve.vertex[i1]);
    let mut k = i1;
    while k != j {
        let k1 = (k + 1) % m;
        let k2 = (k + 2) % m;
        if convc[k1] != conv {
            return None;
        }
        if fsign(cprod(
            curve.vertex[i],
            curve.vertex[i1],
            curve.vertex[k1],
            curve.vertex[k2],
        )) as i32
            != conv
        {
            return None;
        }
        if iprod1(
            curve.vertex[i],
            curve.vertex[i1],
            curve.vertex[k1],
            curve.vertex[k2],
        ) < d * ddist(curve.vertex[k1], curve.vertex[k2]) * COS_179
        {
            return None;
        }
        k = k1;
    }

    // the replacement works in the frame p0, p3 = chain endpoints with
    // tangent directions towards the adjacent vertices
    let p0 = curve.segments[i].end();
    let mut p1 = curve.vertex[i1];
    let mut p2 = curve.vertex[j];
    let p3 = curve.segments[j].end();

    // area enclosed by the chain, from the cumulative cache
    let mut area = areac[j] - areac[i];
    area -= dpara(curve.vertex[0], curve.segments[i].end(), curve.segments[j].end()) / 2.0;
    if i >= j {
        area += areac[m];
    }

    let a1 = dpara(p0, p1, p2);
    let a2 = dpara(p0, p1, p3);
    let a3 = dpara(p0, p2, p3);
    let a4 = a1 + a3 - a2;

    if a2 == a1 {
        // parallel tangents: no intersection point
        return None;
    }

    let t = a3 / (a3 - a4);
    let s = a2 / (a2 - a1);
    let big_a = a2 * t / 2.0;
    if big_a == 0.0 {
        return None;
    }

    let relative = area / big_a;
    let alpha = 2.0 - (4.0 - relative / 0.3).sqrt();

    let res_c = [interval(t * alpha, p0, p1), interval(s * alpha, p3, p2)];
    p1 = res_c[0];
    p2 = res_c[1];
    let mut pen = 0.0;

    // the candidate must pass close to every skipped edge...
    let mut k = i1;
    while k != j {
        let k1 = (k + 1) % m;
        let tt = tangent(p0, p1, p2, p3, curve.vertex[k], curve.vertex[k1])?;
        let pt = bezier(tt, p0, p1, p2, p3);
        let d = ddist(curve.vertex[k], curve.vertex[k1]);
        if d == 0.0 {
            return None;
        }
        let d1 = dpara(curve.vertex[k], curve.vertex[k1], pt) / d;
        if d1.abs() > opttolerance {
            return None;
        }
        if iprod(curve.vertex[k], curve.vertex[k1], pt) < 0.0
            || iprod(curve.vertex[k1], curve.vertex[k], pt) < 0.0
        {
            return None;
        }
        pen += d1 * d1;
        k = k1;
    }

    // ...and must not undershoot any skipped joint chord
    let mut k = i;
    while k != j {
        let k1 = (k + 1) % m;
        let tt = tangent(p0, p1, p2, p3, curve.segments[k].end(), curve.segments[k1].end())?;
        let pt = bezier(tt, p0, p1, p2, p3);
        let d = ddist(curve.segments[k].end(), curve.segments[k1].end());
        if d == 0.0 {
            return None;
        }
        let mut d1 = dpara(curve.segments[k].end(), curve.segments[k1].end(), pt) / d;
        let mut d2 = dpara(curve.segments[k].end(), curve.segments[k1].end(), curve.vertex[k1]) / d;
        d2 *= 0.75 * curve.alpha[k1];
        if d2 < 0.0 {
            d1 = -d1;
            d2 = -d2;
        }
        if d1 < d2 - opttolerance {
            return None;
        }
        if d1 < d2 {
            pen += (d1 - d2) * (d1 - d2);
        }
        k = k1;
    }

    Some(Opti {
        pen,
        c: res_c,
        t,
        s,
        alpha,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vectorize::smooth;

    fn square_curve() -> Curve {
        smooth(
            vec![
                Point::new(8.0, 24.0),
                Point::new(8.0, 8.0),
                Point::new(24.0, 8.0),
                Point::new(24.0, 24.0),
            ],
            1.0,
        )
    }

    #[test]
    fn corner_only_curve_passes_through_unchanged() {
        let curve = square_curve();
        let optimized = opticurve(&curve, 0.2);
        assert_eq!(optimized.len(), curve.len());
        assert_eq!(optimized.segments(), curve.segments());
        assert_eq!(optimized.vertices(), curve.vertices());
    }

    #[test]
    fn optimization_never_adds_segments() {
        // regular octagon, all-smooth: every vertex becomes a Bezier
        let octagon: Vec<Point> = (0..8)
            .map(|k| {
                let a = std::f64::consts::TAU * k as f64 / 8.0;
                Point::new(20.0 + 10.0 * a.cos(), 20.0 + 10.0 * a.sin())
            })
            .collect();
        let curve = smooth(octagon, 1.334);
        let optimized = opticurve(&curve, 0.5);
        assert!(optimized.len() <= curve.len());
        assert!(!optimized.is_empty());
        // the result is still a closed chain of segments
        for w in 0..optimized.len() {
            let prev = optimized.segments()[(w + optimized.len() - 1) % optimized.len()];
            let _ = prev.end(); // every segment has a well-defined joint
        }
    }

    #[test]
    fn merged_chain_betas_are_ratios_in_unit_range() {
        let octagon: Vec<Point> = (0..8)
            .map(|k| {
                let a = std::f64::consts::TAU * k as f64 / 8.0;
                Point::new(20.0 + 10.0 * a.cos(), 20.0 + 10.0 * a.sin())
            })
            .collect();
        let curve = smooth(octagon, 1.334);
        let optimized = opticurve(&curve, 0.5);
        for &b in optimized.beta() {
            assert!((0.0..=1.0).contains(&b), "beta = {b}");
        }
    }
}
