//! Error Types
//!
//! This module defines the error types used throughout the animation core.
//!
//! # Overview
//!
//! The main error type [`AnimationError`] covers the failure modes of the
//! keyframe pipeline:
//! - Usage errors (evaluating a clip that was never prepared)
//! - Malformed keyframe data rejected by validation
//! - Degenerate transforms met while computing bone matrices
//! - Invalid scene handles
//!
//! Lookup misses while binding bones are *not* errors: they are logged and
//! skipped so the rest of the skeleton still animates.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, AnimationError>`.
//!
//! ```rust,ignore
//! use skeletal_keyframe::errors::Result;
//!
//! fn drive(controller: &mut SkinningController, scene: &mut Scene, t: f32) -> Result<()> {
//!     controller.animate(scene, t)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

use crate::animation::keyframe::KeyTrack;
use crate::scene::NodeHandle;

/// The main error type for keyframe animation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    // ========================================================================
    // Usage Errors
    // ========================================================================
    /// A clip or controller was evaluated before `prepare()` was called.
    #[error("Animation '{clip}' evaluated before prepare() was called")]
    NotPrepared {
        /// Name of the clip that was evaluated
        clip: String,
    },

    /// The root node handed to `prepare()` does not exist in the scene.
    #[error("Node not found in scene: {0:?}")]
    NodeNotFound(NodeHandle),

    // ========================================================================
    // Keyframe Data Errors
    // ========================================================================
    /// A key time is smaller than the time of the key before it.
    #[error(
        "Keyframes out of order in channel '{node}': {track} key {index} at {time} precedes {previous}"
    )]
    UnsortedKeys {
        /// Target node name of the channel
        node: String,
        /// Which key series is malformed
        track: KeyTrack,
        /// Index of the offending key
        index: usize,
        /// Time of the offending key
        time: f32,
        /// Time of the key before it
        previous: f32,
    },

    /// A key time is NaN or infinite.
    #[error("Non-finite keyframe time in channel '{node}': {track} key {index}")]
    NonFiniteKeyTime {
        /// Target node name of the channel
        node: String,
        /// Which key series is malformed
        track: KeyTrack,
        /// Index of the offending key
        index: usize,
    },

    // ========================================================================
    // Numeric Errors
    // ========================================================================
    /// The world transform of a bone-owning node could not be inverted.
    #[error("Degenerate world transform on bone owner node {node:?}")]
    DegenerateTransform {
        /// The node whose world matrix is singular
        node: NodeHandle,
    },
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
