//! Angle and distance helpers over 3-D landmarks.
//!
//! Both functions feed a best-effort classifier, so anything that cannot be
//! computed comes back as `0.0` instead of an error.

use crate::landmarks::Landmark;

const ANGLE_EPS: f64 = 1e-6;

pub fn distance(a: Landmark, b: Landmark) -> f64 {
    if !a.is_finite() || !b.is_finite() {
        return 0.0;
    }
    let d = norm(sub(a, b));
    if d.is_finite() { d } else { 0.0 }
}

/// Angle at vertex `b` of the triangle `a-b-c`, in degrees.
pub fn angle_degrees(a: Landmark, b: Landmark, c: Landmark) -> f64 {
    if !a.is_finite() || !b.is_finite() || !c.is_finite() {
        return 0.0;
    }
    let ba = sub(a, b);
    let bc = sub(c, b);
    let cos = dot(ba, bc) / (norm(ba) * norm(bc) + ANGLE_EPS);
    if !cos.is_finite() {
        return 0.0;
    }
    let deg = cos.clamp(-1.0, 1.0).acos().to_degrees();
    if deg.is_finite() { deg } else { 0.0 }
}

fn sub(a: Landmark, b: Landmark) -> [f64; 3] {
    [a.x - b.x, a.y - b.y, a.z - b.z]
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn norm(v: [f64; 3]) -> f64 {
    dot(v, v).sqrt()
}
