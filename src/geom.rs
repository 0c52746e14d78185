//! Shared geometry utilities.
//!
//! Integer helpers serve the contour analysis on the pixel grid; the
//! floating-point helpers serve the curve stages. All angles and cross
//! products follow the y-up convention used throughout the crate.

use kurbo::{Point, Vec2};

// ── Integer helpers ──────────────────────────────────────

/// Integer cross product.
pub(crate) fn xprod(a: (i32, i32), b: (i32, i32)) -> i64 {
    a.0 as i64 * b.1 as i64 - a.1 as i64 * b.0 as i64
}

/// Sign function: -1, 0, or 1.
pub(crate) fn sign(x: i32) -> i32 {
    match x.cmp(&0) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

/// Proper modulo for signed values (always non-negative result).
pub(crate) fn pmod(a: isize, n: usize) -> usize {
    let n = n as isize;
    (((a % n) + n) % n) as usize
}

/// Floor division (rounds toward negative infinity).
pub(crate) fn floordiv(a: i64, b: i64) -> i64 {
    if a >= 0 {
        a / b
    } else {
        -1 - (-1 - a) / b
    }
}

/// Check if b is in the cyclic interval [a, c).
pub(crate) fn cyclic(a: usize, b: usize, c: usize) -> bool {
    if a <= c {
        a <= b && b < c
    } else {
        a <= b || b < c
    }
}

// ── Floating-point helpers ───────────────────────────────

/// Sign function for f64: -1.0, 0.0, or 1.0.
pub(crate) fn fsign(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Twice the signed area of the triangle (p0, p1, p2).
pub(crate) fn dpara(p0: Point, p1: Point, p2: Point) -> f64 {
    (p1 - p0).cross(p2 - p0)
}

/// Cross product (p1 - p0) × (p3 - p2).
pub(crate) fn cprod(p0: Point, p1: Point, p2: Point, p3: Point) -> f64 {
    (p1 - p0).cross(p3 - p2)
}

/// Inner product (p1 - p0) · (p2 - p0).
pub(crate) fn iprod(p0: Point, p1: Point, p2: Point) -> f64 {
    (p1 - p0).dot(p2 - p0)
}

/// Inner product (p1 - p0) · (p3 - p2).
pub(crate) fn iprod1(p0: Point, p1: Point, p2: Point, p3: Point) -> f64 {
    (p1 - p0).dot(p3 - p2)
}

/// Euclidean distance between p and q.
pub(crate) fn ddist(p: Point, q: Point) -> f64 {
    p.distance(q)
}

/// Linear interpolation: a + t·(b - a).
pub(crate) fn interval(t: f64, a: Point, b: Point) -> Point {
    a.lerp(b, t)
}

/// 90-degree rotation of the direction from p0 to p2, snapped to the
/// nearest axis direction.
pub(crate) fn dorth_infty(p0: Point, p2: Point) -> Vec2 {
    Vec2::new(-fsign(p2.y - p0.y), fsign(p2.x - p0.x))
}

/// Denominator used by the corner-detection alpha: cross of (p2 - p0)
/// with the axis-snapped orthogonal of the same chord.
pub(crate) fn ddenom(p0: Point, p2: Point) -> f64 {
    let r = dorth_infty(p0, p2);
    r.y * (p2.x - p0.x) - r.x * (p2.y - p0.y)
}

/// Point on the cubic Bezier (p0, p1, p2, p3) at parameter t.
pub(crate) fn bezier(t: f64, p0: Point, p1: Point, p2: Point, p3: Point) -> Point {
    let s = 1.0 - t;
    // Bernstein form; the coefficients s³, 3s²t, 3st², t³ sum to 1.
    Point::new(
        s * s * s * p0.x + 3.0 * (s * s * t) * p1.x + 3.0 * (t * t * s) * p2.x + t * t * t * p3.x,
        s * s * s * p0.y + 3.0 * (s * s * t) * p1.y + 3.0 * (t * t * s) * p2.y + t * t * t * p3.y,
    )
}

/// Parameter t in [0, 1] where the Bezier (p0..p3) is tangent to the
/// direction q1 - q0, or `None` if no such parameter exists.
///
/// The tangency condition is a quadratic in t whose coefficients are
/// cross products of the control polygon legs with the query direction.
pub(crate) fn tangent(p0: Point, p1: Point, p2: Point, p3: Point, q0: Point, q1: Point) -> Option<f64> {
    let big_a = cprod(p0, p1, q0, q1);
    let big_b = cprod(p1, p2, q0, q1);
    let big_c = cprod(p2, p3, q0, q1);

    let a = big_a - 2.0 * big_b + big_c;
    let b = -2.0 * big_a + 2.0 * big_b;
    let c = big_a;

    let d = b * b - 4.0 * a * c;
    if a == 0.0 || d < 0.0 {
        return None;
    }
    let s = d.sqrt();
    let r1 = (-b + s) / (2.0 * a);
    let r2 = (-b - s) / (2.0 * a);

    if (0.0..=1.0).contains(&r1) {
        Some(r1)
    } else if (0.0..=1.0).contains(&r2) {
        Some(r2)
    } else {
        None
    }
}
