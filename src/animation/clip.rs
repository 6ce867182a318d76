use std::fmt;

use glam::Mat4;

use crate::animation::channel::AnimationChannel;
use crate::errors::{AnimationError, Result};
use crate::settings::{AnimationSettings, ExtrapolationMode, KeyValidation};

/// Tick rate used when a clip declares none (or a non-positive one).
pub const DEFAULT_TICKS_PER_SECOND: f32 = 25.0;

/// Lower bound for the loop modulus, so a zero-length clip maps every time to tick 0.
pub const MIN_DURATION_TICKS: f32 = 1e-3;

/// A keyframe animation: one channel per animated node plus timing metadata.
///
/// # Lifecycle
///
/// 1. Construct with [`AnimationClip::new`] and append channels.
/// 2. Call [`AnimationClip::prepare`] once. This validates key data (per
///    settings) and allocates one scratch matrix per channel.
/// 3. Call [`AnimationClip::transforms`] once per frame.
///
/// Sampling before step 2 fails with [`AnimationError::NotPrepared`].
#[doc(alias = "KeyframeAnimation")]
#[derive(Debug, Clone)]
pub struct AnimationClip {
    pub name: String,
    duration_ticks: f32,
    ticks_per_second: f32,
    channels: Vec<AnimationChannel>,

    extrapolation: ExtrapolationMode,
    /// Per-channel scratch matrices, reused every frame. `None` until prepared.
    transforms: Option<Vec<Mat4>>,
}

impl AnimationClip {
    #[must_use]
    pub fn new(name: &str, duration_ticks: f32, ticks_per_second: f32) -> Self {
        Self {
            name: name.to_string(),
            duration_ticks,
            ticks_per_second,
            channels: Vec::new(),
            extrapolation: ExtrapolationMode::ClampToEdge,
            transforms: None,
        }
    }

    /// Appends a channel. Duplicate node names are not detected; lookups
    /// return the first match.
    ///
    /// Adding a channel after `prepare()` invalidates the preparation.
    pub fn add_channel(&mut self, channel: AnimationChannel) {
        log::trace!("Clip '{}': adding channel for '{}'", self.name, channel.node_name());
        self.channels.push(channel);
        self.transforms = None;
    }

    /// Index of the channel targeting `node_name`, by exact name match.
    #[must_use]
    pub fn find_channel(&self, node_name: &str) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.node_name() == node_name)
    }

    #[must_use]
    pub fn channel(&self, index: usize) -> Option<&AnimationChannel> {
        self.channels.get(index)
    }

    #[must_use]
    pub fn channels(&self) -> &[AnimationChannel] {
        &self.channels
    }

    #[inline]
    #[must_use]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    #[inline]
    #[must_use]
    pub fn duration_ticks(&self) -> f32 {
        self.duration_ticks
    }

    /// Effective tick rate: the declared rate, or [`DEFAULT_TICKS_PER_SECOND`]
    /// when the declared rate is not positive.
    #[inline]
    #[must_use]
    pub fn ticks_per_second(&self) -> f32 {
        if self.ticks_per_second > 0.0 {
            self.ticks_per_second
        } else {
            DEFAULT_TICKS_PER_SECOND
        }
    }

    #[inline]
    #[must_use]
    pub fn duration_seconds(&self) -> f32 {
        self.duration_ticks / self.ticks_per_second()
    }

    /// Converts wall-clock seconds to a clip tick, wrapping around the
    /// duration so playback always loops. Negative times wrap backwards.
    #[must_use]
    pub fn tick_at(&self, time_in_seconds: f32) -> f32 {
        let time_in_ticks = time_in_seconds * self.ticks_per_second();
        let duration = self.duration_ticks.max(MIN_DURATION_TICKS);
        let tick = time_in_ticks.rem_euclid(duration);
        // rem_euclid can round up to exactly `duration` for tiny negative inputs
        if tick >= duration { 0.0 } else { tick }
    }

    #[inline]
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.transforms.is_some()
    }

    /// Validates channel data and allocates the per-channel scratch matrices.
    ///
    /// Calling it again re-validates and reallocates. A failed call leaves the
    /// clip unprepared.
    pub fn prepare(&mut self, settings: &AnimationSettings) -> Result<()> {
        self.transforms = None;
        if settings.key_validation == KeyValidation::Strict {
            for channel in &self.channels {
                channel.validate()?;
            }
        }

        self.extrapolation = settings.extrapolation;
        self.transforms = Some(vec![Mat4::IDENTITY; self.channels.len()]);

        log::debug!(
            "Clip '{}' prepared: {} channels, {} ticks at {} ticks/s",
            self.name,
            self.channels.len(),
            self.duration_ticks,
            self.ticks_per_second()
        );
        Ok(())
    }

    /// Samples every channel at `tick`, overwriting the scratch matrices.
    ///
    /// The returned slice is indexed like [`AnimationClip::channels`] and is
    /// overwritten by the next call.
    pub fn transforms(&mut self, tick: f32) -> Result<&[Mat4]> {
        let Some(transforms) = self.transforms.as_mut() else {
            log::error!("Clip '{}' sampled before prepare()", self.name);
            return Err(AnimationError::NotPrepared {
                clip: self.name.clone(),
            });
        };

        for (slot, channel) in transforms.iter_mut().zip(&self.channels) {
            *slot = channel.evaluate_with(tick, self.extrapolation);
        }

        Ok(transforms.as_slice())
    }
}

impl fmt::Display for AnimationClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "AnimationClip [name={}, duration={} ticks, ticks_per_second={}, {} channels]",
            self.name,
            self.duration_ticks,
            self.ticks_per_second(),
            self.channels.len()
        )?;
        for channel in &self.channels {
            writeln!(f, "  {channel}")?;
        }
        Ok(())
    }
}
