use crate::animation::controller::AnimationController;
use crate::errors::{AnimationError, Result};
use crate::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopMode {
    /// Play to the end, then stop on the last pose.
    Once,
    #[default]
    Loop,
    /// Alternate forward and backward passes.
    PingPong,
}

/// Elapsed-time playback on top of an [`AnimationController`].
///
/// A controller's `animate` always loops. The player keeps its own clock and
/// maps it onto clip ticks per [`LoopMode`], so it can stop after one pass
/// or after a number of repeats.
///
/// ```rust,ignore
/// let mut player = AnimationPlayer::new();
/// player.loop_mode = LoopMode::PingPong;
/// player.repeat_limit = Some(4);
///
/// // per frame
/// player.update(dt, &mut controller, &mut scene)?;
/// ```
#[derive(Debug, Clone)]
pub struct AnimationPlayer {
    /// Elapsed playback time in seconds, scaled by `time_scale`.
    pub time: f32,
    pub time_scale: f32,
    pub loop_mode: LoopMode,
    /// Number of passes before playback finishes. `None` plays forever.
    /// Ignored by [`LoopMode::Once`].
    pub repeat_limit: Option<u32>,
    pub paused: bool,

    iterations: u32,
    finished: bool,
}

impl Default for AnimationPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnimationPlayer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            time: 0.0,
            time_scale: 1.0,
            loop_mode: LoopMode::Loop,
            repeat_limit: None,
            paused: false,
            iterations: 0,
            finished: false,
        }
    }

    /// Completed passes through the clip.
    #[inline]
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Rewinds to the start and clears the counters.
    pub fn reset(&mut self) {
        self.time = 0.0;
        self.iterations = 0;
        self.finished = false;
        self.paused = false;
    }

    /// Advances the clock by `dt` seconds and poses the scene.
    ///
    /// Returns `false` once playback has finished. A paused or finished
    /// player leaves the scene untouched.
    pub fn update<C>(&mut self, dt: f32, controller: &mut C, scene: &mut Scene) -> Result<bool>
    where
        C: AnimationController + ?Sized,
    {
        if !controller.is_prepared() {
            log::error!(
                "Player updated with unprepared clip '{}'",
                controller.clip().name
            );
            return Err(AnimationError::NotPrepared {
                clip: controller.clip().name.clone(),
            });
        }

        if self.paused || self.finished {
            return Ok(!self.finished);
        }

        let duration = controller.clip().duration_seconds();
        let ticks_per_second = controller.clip().ticks_per_second();

        if duration <= 0.0 {
            controller.animate_tick(scene, 0.0)?;
            self.finish();
            return Ok(false);
        }

        self.time += dt * self.time_scale;
        let local_time = self.local_time(duration);

        controller.animate_tick(scene, local_time * ticks_per_second)?;
        Ok(!self.finished)
    }

    /// Maps the clock onto `[0, duration]`, updating the counters.
    fn local_time(&mut self, duration: f32) -> f32 {
        match self.loop_mode {
            LoopMode::Once => {
                if self.time >= duration {
                    self.time = duration;
                    self.iterations = 1;
                    self.finish();
                    duration
                } else if self.time < 0.0 {
                    self.time = 0.0;
                    self.finish();
                    0.0
                } else {
                    self.time
                }
            }
            LoopMode::Loop | LoopMode::PingPong => {
                let cycles = (self.time / duration).floor();
                self.iterations = cycles.max(0.0) as u32;

                if let Some(limit) = self.repeat_limit {
                    let limit = limit.max(1);
                    if self.iterations >= limit {
                        self.iterations = limit;
                        self.time = duration * limit as f32;
                        self.finish();
                        return self.end_pose(duration, limit);
                    }
                }

                let phase = self.time.rem_euclid(duration);
                let reversed = self.loop_mode == LoopMode::PingPong && (cycles as i64) & 1 == 1;
                if reversed { duration - phase } else { phase }
            }
        }
    }

    fn end_pose(&self, duration: f32, limit: u32) -> f32 {
        if self.loop_mode == LoopMode::PingPong && limit % 2 == 0 {
            0.0
        } else {
            duration
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.paused = true;
    }
}
