//! Animation Controllers
//!
//! A controller owns a clip and the animation tree built for it, and turns a
//! time into matrices once per frame:
//!
//! ```text
//! seconds -> ticks -> channel transforms -> tree walk -> output
//! ```
//!
//! Two outputs exist:
//! - [`SkinningController`] writes one final matrix per bone into the mesh's
//!   [`Bone`](crate::scene::Bone) sinks.
//! - [`NodeAnimationController`] writes the sampled local transforms back
//!   onto the animated nodes, for hierarchies without skinning.
//!
//! Both share [`KeyframeAnimator`] for everything up to the tree walk.
//!
//! # Frame contract
//!
//! `animate` runs synchronously and writes every output before returning;
//! the renderer must read bone matrices only after it returns. Controllers
//! keep scratch state and must not be evaluated from two threads at once.
//! Separate controllers share nothing and can run in parallel.

use glam::Mat4;

use crate::animation::clip::AnimationClip;
use crate::animation::skeleton::{AnimTree, SkeletonBuilder};
use crate::errors::{AnimationError, Result};
use crate::scene::{MeshKey, NodeHandle, Scene};
use crate::settings::{AnimationSettings, InversionPolicy};

/// Determinant magnitude below which a world matrix is treated as singular.
pub const MIN_INVERTIBLE_DETERMINANT: f32 = 1e-12;

/// Common interface of the per-frame animation drivers.
pub trait AnimationController {
    fn clip(&self) -> &AnimationClip;

    fn is_prepared(&self) -> bool;

    /// Builds the animation tree under `root` and prepares the clip.
    ///
    /// Must be called once after all channels are added and before any
    /// evaluation. Calling it again rebuilds from the current scene.
    fn prepare(&mut self, scene: &Scene, root: NodeHandle) -> Result<()>;

    /// Evaluates the clip at `tick` (no wrapping) and writes the outputs.
    fn animate_tick(&mut self, scene: &mut Scene, tick: f32) -> Result<()>;

    /// Evaluates the clip at wall-clock time `time_in_seconds`, looping
    /// around the clip duration, and writes the outputs.
    fn animate(&mut self, scene: &mut Scene, time_in_seconds: f32) -> Result<()> {
        let tick = self.clip().tick_at(time_in_seconds);
        self.animate_tick(scene, tick)
    }
}

// ============================================================================
// KeyframeAnimator
// ============================================================================

/// Clip sampling and tree propagation shared by both controllers.
#[derive(Debug, Clone)]
pub struct KeyframeAnimator {
    clip: AnimationClip,
    settings: AnimationSettings,
    tree: Option<AnimTree>,
}

impl KeyframeAnimator {
    #[must_use]
    pub fn new(clip: AnimationClip, settings: AnimationSettings) -> Self {
        Self {
            clip,
            settings,
            tree: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn clip(&self) -> &AnimationClip {
        &self.clip
    }

    #[inline]
    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        &self.settings
    }

    /// The pruned animation tree, once prepared.
    #[inline]
    #[must_use]
    pub fn tree(&self) -> Option<&AnimTree> {
        self.tree.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn is_prepared(&self) -> bool {
        self.tree.is_some() && self.clip.is_prepared()
    }

    pub fn prepare(&mut self, scene: &Scene, root: NodeHandle) -> Result<()> {
        self.tree = None;
        self.clip.prepare(&self.settings)?;
        let tree = SkeletonBuilder::new(scene, &self.clip).build(root)?;
        self.tree = Some(tree);
        Ok(())
    }

    /// Samples all channels at `tick` and propagates transforms down the tree.
    pub fn evaluate(&mut self, scene: &Scene, tick: f32) -> Result<&AnimTree> {
        let Some(tree) = self.tree.as_mut() else {
            log::error!("Clip '{}' animated before prepare()", self.clip.name);
            return Err(AnimationError::NotPrepared {
                clip: self.clip.name.clone(),
            });
        };

        let transforms = self.clip.transforms(tick)?;
        tree.update(transforms, scene);
        Ok(tree)
    }
}

// ============================================================================
// SkinningController
// ============================================================================

/// Drives skeletal animation and writes per-bone skinning matrices.
///
/// For every bone bound to a skeletal node:
///
/// ```text
/// final = inverse(world(mesh owner)) * global(skeletal node) * offset
/// ```
#[derive(Debug, Clone)]
pub struct SkinningController {
    animator: KeyframeAnimator,
    /// Pending writes for the current frame, reused across frames
    pending: Vec<(MeshKey, usize, Mat4)>,
    degenerate_inversions: u64,
}

impl SkinningController {
    #[must_use]
    pub fn new(clip: AnimationClip) -> Self {
        Self::with_settings(clip, AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(clip: AnimationClip, settings: AnimationSettings) -> Self {
        Self {
            animator: KeyframeAnimator::new(clip, settings),
            pending: Vec::new(),
            degenerate_inversions: 0,
        }
    }

    #[must_use]
    pub fn tree(&self) -> Option<&AnimTree> {
        self.animator.tree()
    }

    #[must_use]
    pub fn settings(&self) -> &AnimationSettings {
        self.animator.settings()
    }

    /// Number of singular bone-owner matrices replaced by identity so far.
    #[must_use]
    pub fn degenerate_inversions(&self) -> u64 {
        self.degenerate_inversions
    }
}

impl AnimationController for SkinningController {
    fn clip(&self) -> &AnimationClip {
        self.animator.clip()
    }

    fn is_prepared(&self) -> bool {
        self.animator.is_prepared()
    }

    fn prepare(&mut self, scene: &Scene, root: NodeHandle) -> Result<()> {
        self.animator.prepare(scene, root)?;
        let capacity = self.animator.tree().map_or(0, AnimTree::num_bindings);
        self.pending = Vec::with_capacity(capacity);
        Ok(())
    }

    fn animate_tick(&mut self, scene: &mut Scene, tick: f32) -> Result<()> {
        let policy = self.animator.settings.inversion;
        let tree = self.animator.evaluate(scene, tick)?;

        // Compute everything first so a failing frame writes nothing
        self.pending.clear();
        for skinned in tree.skinned_nodes() {
            let global = tree.nodes()[skinned.tree_index].global_transform;
            for binding in &skinned.bones {
                let Some(owner) = scene.get_node(binding.owner) else {
                    continue;
                };
                let owner_world = owner.transform.world_matrix_as_mat4();
                let inverse = invert_world(
                    owner_world,
                    binding.owner,
                    policy,
                    &mut self.degenerate_inversions,
                )?;
                self.pending.push((
                    binding.mesh,
                    binding.bone_index,
                    inverse * global * binding.offset_matrix,
                ));
            }
        }

        for &(mesh, bone_index, matrix) in &self.pending {
            if let Some(bone) = scene
                .mesh_mut(mesh)
                .and_then(|m| m.bones.get_mut(bone_index))
            {
                bone.set_final_transform(matrix);
            }
        }
        Ok(())
    }
}

fn invert_world(
    world: Mat4,
    node: NodeHandle,
    policy: InversionPolicy,
    degenerate_count: &mut u64,
) -> Result<Mat4> {
    let det = world.determinant();
    if det.is_finite() && det.abs() >= MIN_INVERTIBLE_DETERMINANT {
        return Ok(world.inverse());
    }

    match policy {
        InversionPolicy::IdentityFallback => {
            if *degenerate_count == 0 {
                log::warn!(
                    "Singular world transform on bone owner {node:?} (det = {det}), using identity"
                );
            } else {
                log::debug!("Singular world transform on bone owner {node:?}, using identity");
            }
            *degenerate_count += 1;
            Ok(Mat4::IDENTITY)
        }
        InversionPolicy::Error => Err(AnimationError::DegenerateTransform { node }),
    }
}

// ============================================================================
// NodeAnimationController
// ============================================================================

/// Drives hierarchical animation without skinning.
///
/// Writes each animated node's sampled local transform back into its TRS,
/// then refreshes world matrices from the `prepare` root down. Unanimated
/// descendants follow their animated parents, and the root keeps whatever
/// sits above it. The written TRS survives later
/// [`Scene::update_matrix_world`] calls.
#[derive(Debug, Clone)]
pub struct NodeAnimationController {
    animator: KeyframeAnimator,
}

impl NodeAnimationController {
    #[must_use]
    pub fn new(clip: AnimationClip) -> Self {
        Self::with_settings(clip, AnimationSettings::default())
    }

    #[must_use]
    pub fn with_settings(clip: AnimationClip, settings: AnimationSettings) -> Self {
        Self {
            animator: KeyframeAnimator::new(clip, settings),
        }
    }

    #[must_use]
    pub fn tree(&self) -> Option<&AnimTree> {
        self.animator.tree()
    }
}

impl AnimationController for NodeAnimationController {
    fn clip(&self) -> &AnimationClip {
        self.animator.clip()
    }

    fn is_prepared(&self) -> bool {
        self.animator.is_prepared()
    }

    fn prepare(&mut self, scene: &Scene, root: NodeHandle) -> Result<()> {
        self.animator.prepare(scene, root)
    }

    fn animate_tick(&mut self, scene: &mut Scene, tick: f32) -> Result<()> {
        let tree = self.animator.evaluate(scene, tick)?;

        for node in tree.nodes() {
            if node.channel.is_none() {
                continue;
            }
            if let Some(target) = scene.get_node_mut(node.target) {
                target.transform.apply_local_matrix(node.local_transform);
            }
        }
        if let Some(root) = tree.root() {
            scene.update_subtree(root.target);
        }
        Ok(())
    }
}
