//! Keyframe Animation
//!
//! - values: interpolation for key value types
//! - keyframe / channel: per-node key series and their sampling
//! - clip: a set of channels plus timing, with per-frame scratch matrices
//! - skeleton / binding: the pruned animation tree and its bone bindings
//! - controller: per-frame drivers writing bone or node matrices
//! - player: elapsed-time playback with loop modes

mod values;
pub mod binding;
pub mod channel;
pub mod clip;
pub mod controller;
pub mod keyframe;
pub mod player;
pub mod skeleton;

pub use binding::{BoneBinding, SkinnedNode};
pub use channel::{AnimationBehavior, AnimationChannel};
pub use clip::{AnimationClip, DEFAULT_TICKS_PER_SECOND, MIN_DURATION_TICKS};
pub use controller::{
    AnimationController, KeyframeAnimator, NodeAnimationController, SkinningController,
};
pub use keyframe::{KeyTrack, Keyframe, PositionKey, RotationKey, ScaleKey};
pub use player::{AnimationPlayer, LoopMode};
pub use skeleton::{AnimNode, AnimTree, SkeletonBuilder};
pub use values::Interpolatable;
