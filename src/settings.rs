//! Animation Settings
//!
//! Policy knobs for the behaviours the keyframe pipeline leaves open:
//! extrapolation outside the sampled range, validation of imported key data,
//! and what to do when a bone-owning node has a singular world transform.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use skeletal_keyframe::settings::{AnimationSettings, ExtrapolationMode};
//!
//! // Default: clamp at edges, reject unsorted keys, identity on singular matrices
//! let settings = AnimationSettings::default();
//!
//! // Honour each channel's declared pre/post behaviour
//! let settings = AnimationSettings {
//!     extrapolation: ExtrapolationMode::Declared,
//!     ..Default::default()
//! };
//!
//! let controller = SkinningController::with_settings(clip, settings);
//! ```

// ---------------------------------------------------------------------------
// ExtrapolationMode
// ---------------------------------------------------------------------------

/// How a multi-key series is sampled outside its `[first, last]` time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtrapolationMode {
    /// Always return the edge key. The channel's pre/post behaviour is
    /// carried as metadata only.
    #[default]
    ClampToEdge,
    /// Apply each channel's [`AnimationBehavior`](crate::animation::AnimationBehavior)
    /// before the first key and after the last key.
    Declared,
}

// ---------------------------------------------------------------------------
// KeyValidation
// ---------------------------------------------------------------------------

/// What `prepare()` does with key times that are not ascending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyValidation {
    /// Reject non-finite or descending key times with an error.
    #[default]
    Strict,
    /// Accept any key data. Sampling an unsorted series uses the first
    /// bracket the linear scan finds, which can skip keys.
    Lenient,
}

// ---------------------------------------------------------------------------
// InversionPolicy
// ---------------------------------------------------------------------------

/// What the skinning pass does when a bone owner's world matrix is singular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InversionPolicy {
    /// Use the identity matrix in place of the inverse, log once and count
    /// the occurrence on the controller.
    #[default]
    IdentityFallback,
    /// Abort the frame with [`AnimationError::DegenerateTransform`](crate::errors::AnimationError::DegenerateTransform).
    Error,
}

// ---------------------------------------------------------------------------
// AnimationSettings
// ---------------------------------------------------------------------------

/// Per-controller animation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AnimationSettings {
    pub extrapolation: ExtrapolationMode,
    pub key_validation: KeyValidation,
    pub inversion: InversionPolicy,
}

impl AnimationSettings {
    /// Settings that reproduce the historical lenient behaviour: clamp at
    /// edges and no validation of key order.
    #[must_use]
    pub fn lenient() -> Self {
        Self {
            key_validation: KeyValidation::Lenient,
            ..Default::default()
        }
    }
}
