//! Animation Channel
//!
//! One channel animates one named node with three independent key series:
//! position, rotation and scale. Each series may have its own length and time
//! range and is sampled separately; the results are composed into a local
//! `T * R * S` matrix that replaces the node's authored local transform.

use std::fmt;

use glam::{Mat4, Quat, Vec3};

use crate::animation::keyframe::{KeyTrack, Keyframe, PositionKey, RotationKey, ScaleKey};
use crate::animation::values::Interpolatable;
use crate::errors::{AnimationError, Result};
use crate::settings::ExtrapolationMode;

/// Behaviour of a channel outside its sampled time range.
///
/// Only honoured with [`ExtrapolationMode::Declared`]; under the default
/// [`ExtrapolationMode::ClampToEdge`] every variant clamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnimationBehavior {
    /// Hold the edge key.
    #[default]
    Default,
    /// Hold the edge key.
    Constant,
    /// Extend the slope of the edge segment.
    Linear,
    /// Wrap time back into the key range.
    Repeat,
}

/// Result of applying an out-of-range behaviour.
enum OutOfRange<T> {
    /// The behaviour produced the sample directly.
    Value(T),
    /// Sample the series at this (possibly remapped) time.
    Time(f32),
}

#[derive(Debug, Clone)]
pub struct AnimationChannel {
    node_name: String,

    position_keys: Vec<PositionKey>,
    rotation_keys: Vec<RotationKey>,
    scale_keys: Vec<ScaleKey>,

    pre_behavior: AnimationBehavior,
    post_behavior: AnimationBehavior,
}

impl AnimationChannel {
    /// Creates a channel targeting the node called `node_name`.
    ///
    /// Keys within each series must be in ascending time order; they are not
    /// sorted here. `prepare()` validates the order under
    /// [`KeyValidation::Strict`](crate::settings::KeyValidation::Strict).
    #[must_use]
    pub fn new(
        node_name: &str,
        position_keys: Vec<PositionKey>,
        rotation_keys: Vec<RotationKey>,
        scale_keys: Vec<ScaleKey>,
    ) -> Self {
        Self {
            node_name: node_name.to_string(),
            position_keys,
            rotation_keys,
            scale_keys,
            pre_behavior: AnimationBehavior::Default,
            post_behavior: AnimationBehavior::Default,
        }
    }

    #[must_use]
    pub fn with_behaviors(mut self, pre: AnimationBehavior, post: AnimationBehavior) -> Self {
        self.pre_behavior = pre;
        self.post_behavior = post;
        self
    }

    #[inline]
    #[must_use]
    pub fn node_name(&self) -> &str {
        &self.node_name
    }

    #[inline]
    #[must_use]
    pub fn pre_behavior(&self) -> AnimationBehavior {
        self.pre_behavior
    }

    #[inline]
    #[must_use]
    pub fn post_behavior(&self) -> AnimationBehavior {
        self.post_behavior
    }

    // ========================================================================
    // Key access
    // ========================================================================

    #[must_use]
    pub fn num_position_keys(&self) -> usize {
        self.position_keys.len()
    }

    #[must_use]
    pub fn num_rotation_keys(&self) -> usize {
        self.rotation_keys.len()
    }

    #[must_use]
    pub fn num_scale_keys(&self) -> usize {
        self.scale_keys.len()
    }

    #[must_use]
    pub fn position_key(&self, index: usize) -> Option<&PositionKey> {
        self.position_keys.get(index)
    }

    #[must_use]
    pub fn rotation_key(&self, index: usize) -> Option<&RotationKey> {
        self.rotation_keys.get(index)
    }

    #[must_use]
    pub fn scale_key(&self, index: usize) -> Option<&ScaleKey> {
        self.scale_keys.get(index)
    }

    #[must_use]
    pub fn position_keys(&self) -> &[PositionKey] {
        &self.position_keys
    }

    #[must_use]
    pub fn rotation_keys(&self) -> &[RotationKey] {
        &self.rotation_keys
    }

    #[must_use]
    pub fn scale_keys(&self) -> &[ScaleKey] {
        &self.scale_keys
    }

    /// Overwrites a position key. Returns `false` if `index` is out of range.
    pub fn set_position_key(&mut self, index: usize, time: f32, position: Vec3) -> bool {
        set_key(&mut self.position_keys, index, time, position)
    }

    /// Overwrites a rotation key. Returns `false` if `index` is out of range.
    pub fn set_rotation_key(&mut self, index: usize, time: f32, rotation: Quat) -> bool {
        set_key(&mut self.rotation_keys, index, time, rotation)
    }

    /// Overwrites a scale key. Returns `false` if `index` is out of range.
    pub fn set_scale_key(&mut self, index: usize, time: f32, scale: Vec3) -> bool {
        set_key(&mut self.scale_keys, index, time, scale)
    }

    // ========================================================================
    // Sampling
    // ========================================================================

    /// Local transform at `time`, clamping outside the key range.
    #[must_use]
    pub fn evaluate(&self, time: f32) -> Mat4 {
        self.evaluate_with(time, ExtrapolationMode::ClampToEdge)
    }

    /// Local transform at `time` as `T * R * S`: translation lands in the
    /// last column and the per-axis scale is folded into the rotation basis.
    #[must_use]
    pub fn evaluate_with(&self, time: f32, mode: ExtrapolationMode) -> Mat4 {
        let position = self.position_at(time, mode);
        let rotation = self.rotation_at(time, mode);
        let scale = self.scale_at(time, mode);
        Mat4::from_scale_rotation_translation(scale, rotation, position)
    }

    /// Position at `time`; `(0, 0, 0)` when the channel has no position keys.
    #[must_use]
    pub fn position_at(&self, time: f32, mode: ExtrapolationMode) -> Vec3 {
        self.sample(&self.position_keys, time, Vec3::ZERO, mode)
    }

    /// Rotation at `time`; identity when the channel has no rotation keys.
    #[must_use]
    pub fn rotation_at(&self, time: f32, mode: ExtrapolationMode) -> Quat {
        self.sample(&self.rotation_keys, time, Quat::IDENTITY, mode)
    }

    /// Scale at `time`; `(1, 1, 1)` when the channel has no scale keys.
    #[must_use]
    pub fn scale_at(&self, time: f32, mode: ExtrapolationMode) -> Vec3 {
        self.sample(&self.scale_keys, time, Vec3::ONE, mode)
    }

    fn sample<T: Interpolatable>(
        &self,
        keys: &[Keyframe<T>],
        time: f32,
        default: T,
        mode: ExtrapolationMode,
    ) -> T {
        match keys {
            [] => default,
            [only] => only.value(),
            _ => {
                let time = match mode {
                    ExtrapolationMode::ClampToEdge => time,
                    ExtrapolationMode::Declared => {
                        match self.out_of_range(keys, time) {
                            OutOfRange::Value(v) => return v,
                            OutOfRange::Time(t) => t,
                        }
                    }
                };
                interpolate_keys(keys, time)
            }
        }
    }

    /// Applies the declared pre/post behaviour. `keys` has at least two entries.
    fn out_of_range<T: Interpolatable>(&self, keys: &[Keyframe<T>], time: f32) -> OutOfRange<T> {
        let first = keys[0];
        let last = keys[keys.len() - 1];

        let (behavior, edge, a, b) = if time < first.time() {
            (self.pre_behavior, first, keys[0], keys[1])
        } else if time > last.time() {
            (self.post_behavior, last, keys[keys.len() - 2], last)
        } else {
            return OutOfRange::Time(time);
        };

        match behavior {
            AnimationBehavior::Default | AnimationBehavior::Constant => {
                OutOfRange::Value(edge.value())
            }
            AnimationBehavior::Linear => {
                let dt = b.time() - a.time();
                if dt > 0.0 {
                    let factor = (time - a.time()) / dt;
                    OutOfRange::Value(T::interpolate_linear(a.value(), b.value(), factor))
                } else {
                    OutOfRange::Value(edge.value())
                }
            }
            AnimationBehavior::Repeat => {
                let span = last.time() - first.time();
                if span > 0.0 {
                    OutOfRange::Time(first.time() + (time - first.time()).rem_euclid(span))
                } else {
                    OutOfRange::Value(edge.value())
                }
            }
        }
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Checks that every key time is finite and no key precedes its predecessor.
    pub fn validate(&self) -> Result<()> {
        validate_series(&self.node_name, KeyTrack::Position, &self.position_keys)?;
        validate_series(&self.node_name, KeyTrack::Rotation, &self.rotation_keys)?;
        validate_series(&self.node_name, KeyTrack::Scale, &self.scale_keys)
    }
}

fn set_key<T: Copy>(keys: &mut [Keyframe<T>], index: usize, time: f32, value: T) -> bool {
    match keys.get_mut(index) {
        Some(key) => {
            key.set(time, value);
            true
        }
        None => false,
    }
}

/// Index `i` of the first key whose successor lies after `time`, or `0` when
/// there is none (time at or past the last key, or malformed data).
#[inline]
fn key_index<T: Copy>(keys: &[Keyframe<T>], time: f32) -> usize {
    keys.windows(2)
        .position(|pair| time < pair[1].time())
        .unwrap_or(0)
}

/// Samples a series of two or more keys, clamping outside its time range.
fn interpolate_keys<T: Interpolatable>(keys: &[Keyframe<T>], time: f32) -> T {
    let index = key_index(keys, time);
    let k0 = keys[index];
    let k1 = keys[index + 1];

    if k0.time() <= time && time <= k1.time() {
        let dt = k1.time() - k0.time();
        let factor = if dt > 0.0 { (time - k0.time()) / dt } else { 0.0 };

        if factor <= 0.0 {
            k0.value()
        } else if factor >= 1.0 {
            k1.value()
        } else {
            T::interpolate_linear(k0.value(), k1.value(), factor)
        }
    } else {
        let first = keys[0];
        let last = keys[keys.len() - 1];
        if time <= first.time() {
            first.value()
        } else if time >= last.time() {
            last.value()
        } else {
            // NaN time
            first.value()
        }
    }
}

fn validate_series<T: Copy>(node: &str, track: KeyTrack, keys: &[Keyframe<T>]) -> Result<()> {
    let mut previous: Option<f32> = None;
    for (index, key) in keys.iter().enumerate() {
        let time = key.time();
        if !time.is_finite() {
            return Err(AnimationError::NonFiniteKeyTime {
                node: node.to_string(),
                track,
                index,
            });
        }
        if let Some(prev) = previous
            && time < prev
        {
            return Err(AnimationError::UnsortedKeys {
                node: node.to_string(),
                track,
                index,
                time,
                previous: prev,
            });
        }
        previous = Some(time);
    }
    Ok(())
}

impl fmt::Display for AnimationChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "AnimationChannel [node={}, position_keys={}, rotation_keys={}, scale_keys={}, pre={:?}, post={:?}]",
            self.node_name,
            self.position_keys.len(),
            self.rotation_keys.len(),
            self.scale_keys.len(),
            self.pre_behavior,
            self.post_behavior,
        )
    }
}
