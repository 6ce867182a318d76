use glam::{Quat, Vec3};

/// Keys closer than this to the 90 degree hemisphere boundary are not
/// flipped, so a half turn keeps the direction it was authored in.
const HEMISPHERE_EPSILON: f32 = 1e-6;

/// Above this dot product the arc is too short for a stable `sin` division.
const NLERP_THRESHOLD: f32 = 0.9995;

/// A value type that can be sampled between two keyframes.
///
/// `t` is normally in `[0, 1]`; linear extrapolation passes values outside
/// that range and implementations must stay well-defined there.
pub trait Interpolatable: Copy + Sized {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self;
}

impl Interpolatable for Vec3 {
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        start.lerp(end, t)
    }
}

impl Interpolatable for Quat {
    /// Spherical interpolation along the shortest arc, normalized.
    fn interpolate_linear(start: Self, end: Self, t: f32) -> Self {
        let mut end = end;
        let mut dot = start.dot(end);
        // q and -q are the same rotation; pick the hemisphere closest to start
        if dot < -HEMISPHERE_EPSILON {
            end = -end;
            dot = -dot;
        }

        // glam's slerp and lerp re-check the hemisphere, so blend by hand
        let (a, b) = if dot > NLERP_THRESHOLD {
            (1.0 - t, t)
        } else {
            let theta = dot.clamp(-1.0, 1.0).acos();
            let sin_theta = theta.sin();
            (
                ((1.0 - t) * theta).sin() / sin_theta,
                (t * theta).sin() / sin_theta,
            )
        };
        (start * a + end * b).normalize()
    }
}
