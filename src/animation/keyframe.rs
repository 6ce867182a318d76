use std::fmt;

use glam::{Quat, Vec3};

/// A single time-stamped sample.
///
/// Keyframes are values: the time and sample are fixed at construction and
/// only editing tools go through [`Keyframe::set`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    time: f32,
    value: T,
}

impl<T: Copy> Keyframe<T> {
    #[must_use]
    pub const fn new(time: f32, value: T) -> Self {
        Self { time, value }
    }

    #[inline]
    #[must_use]
    pub fn time(&self) -> f32 {
        self.time
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> T {
        self.value
    }

    /// Replaces both time and value. Intended for editing tools.
    pub fn set(&mut self, time: f32, value: T) {
        self.time = time;
        self.value = value;
    }
}

impl<T: Copy> From<(f32, T)> for Keyframe<T> {
    fn from((time, value): (f32, T)) -> Self {
        Self::new(time, value)
    }
}

pub type PositionKey = Keyframe<Vec3>;
pub type RotationKey = Keyframe<Quat>;
pub type ScaleKey = Keyframe<Vec3>;

/// Identifies one of the three key series of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyTrack {
    Position,
    Rotation,
    Scale,
}

impl fmt::Display for KeyTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            KeyTrack::Position => "position",
            KeyTrack::Rotation => "rotation",
            KeyTrack::Scale => "scale",
        };
        f.write_str(name)
    }
}
