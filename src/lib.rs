#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod animation;
pub mod errors;
pub mod scene;
pub mod settings;

pub use animation::{
    AnimationBehavior, AnimationChannel, AnimationClip, AnimationController, AnimationPlayer,
    LoopMode, NodeAnimationController, PositionKey, RotationKey, ScaleKey, SkinningController,
};
pub use errors::{AnimationError, Result};
pub use scene::{Bone, Mesh, Node, NodeHandle, Scene, Transform};
pub use settings::{AnimationSettings, ExtrapolationMode, InversionPolicy, KeyValidation};
