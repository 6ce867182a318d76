//! Skeleton Builder & Animation Tree
//!
//! Mirrors the animated part of a scene hierarchy in a flat arena:
//!
//! - [`SkeletonBuilder`] walks the scene once in depth-first pre-order,
//!   records each node's bind-pose transform and channel index, and collects
//!   bone bindings from attached meshes.
//! - [`AnimTree::prune`] drops subtrees that have no channel and drive no
//!   bone, so the per-frame walk only touches relevant nodes.
//! - [`AnimTree::update`] recomputes local and global transforms every frame.
//!
//! Nodes are stored in pre-order, so a parent's index is always smaller than
//! its children's and the frame update is a single forward pass.

use glam::Mat4;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::animation::binding::{BoneBinding, SkinnedNode};
use crate::animation::clip::AnimationClip;
use crate::errors::{AnimationError, Result};
use crate::scene::{MeshKey, NodeHandle, Scene};

/// One node of the animation tree.
#[derive(Debug, Clone)]
pub struct AnimNode {
    /// Scene node this entry mirrors
    pub target: NodeHandle,
    pub parent: Option<usize>,
    pub children: Vec<usize>,
    pub local_transform: Mat4,
    pub global_transform: Mat4,
    /// Index of the clip channel animating this node
    pub channel: Option<usize>,
}

/// Arena-backed animation tree with its bone lookup.
#[derive(Debug, Clone, Default)]
pub struct AnimTree {
    nodes: Vec<AnimNode>,
    skinned: Vec<SkinnedNode>,
    by_node: FxHashMap<NodeHandle, usize>,
}

impl AnimTree {
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn root(&self) -> Option<&AnimNode> {
        self.nodes.first()
    }

    /// All nodes in pre-order.
    #[must_use]
    pub fn nodes(&self) -> &[AnimNode] {
        &self.nodes
    }

    #[must_use]
    pub fn node(&self, target: NodeHandle) -> Option<&AnimNode> {
        self.by_node.get(&target).map(|&i| &self.nodes[i])
    }

    #[must_use]
    pub fn contains(&self, target: NodeHandle) -> bool {
        self.by_node.contains_key(&target)
    }

    /// Global transform of `target` from the last update (bind pose before
    /// the first one).
    #[must_use]
    pub fn global_transform(&self, target: NodeHandle) -> Option<Mat4> {
        self.node(target).map(|n| n.global_transform)
    }

    #[must_use]
    pub fn skinned_nodes(&self) -> &[SkinnedNode] {
        &self.skinned
    }

    /// Bone bindings driven by `target`, in discovery order.
    #[must_use]
    pub fn bindings_for(&self, target: NodeHandle) -> &[BoneBinding] {
        self.skinned
            .iter()
            .find(|s| s.node == target)
            .map(|s| s.bones.as_slice())
            .unwrap_or(&[])
    }

    #[must_use]
    pub fn num_bindings(&self) -> usize {
        self.skinned.iter().map(|s| s.bones.len()).sum()
    }

    /// Removes every subtree whose nodes have no channel and drive no bone.
    ///
    /// A node survives if it has a channel, drives a bone, or has a
    /// surviving descendant. Children of animated nodes are pruned too.
    pub fn prune(&mut self) {
        let before = self.nodes.len();

        let mut keep = vec![false; before];
        for skinned in &self.skinned {
            keep[skinned.tree_index] = true;
        }
        // Children always follow their parent, so a reverse pass sees every
        // child before its parent.
        for i in (0..before).rev() {
            if self.nodes[i].channel.is_some() {
                keep[i] = true;
            }
            if keep[i]
                && let Some(parent) = self.nodes[i].parent
            {
                keep[parent] = true;
            }
        }

        let mut remap: Vec<Option<usize>> = vec![None; before];
        let mut kept = Vec::with_capacity(before);
        for (i, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if keep[i] {
                remap[i] = Some(kept.len());
                kept.push(node);
            }
        }

        for node in &mut kept {
            node.parent = node.parent.and_then(|p| remap[p]);
            node.children = node.children.iter().filter_map(|&c| remap[c]).collect();
        }
        for skinned in &mut self.skinned {
            // Skinned nodes are always kept
            if let Some(index) = remap[skinned.tree_index] {
                skinned.tree_index = index;
            }
        }

        self.by_node = kept
            .iter()
            .enumerate()
            .map(|(i, n)| (n.target, i))
            .collect();
        self.nodes = kept;

        log::debug!(
            "Animation tree pruned: {} -> {} nodes, {} skinned nodes, {} bone bindings",
            before,
            self.nodes.len(),
            self.skinned.len(),
            self.num_bindings()
        );
    }

    /// Recomputes every node's local and global transform.
    ///
    /// Animated nodes take their local transform from `channel_transforms`;
    /// the others re-read their authored local transform from the scene, so
    /// ancestors kept only for their descendants still follow edits made to
    /// the scene.
    pub fn update(&mut self, channel_transforms: &[Mat4], scene: &Scene) {
        for i in 0..self.nodes.len() {
            let node = &self.nodes[i];

            let channel_local = node
                .channel
                .and_then(|c| channel_transforms.get(c).copied());
            let local = channel_local.unwrap_or_else(|| {
                scene.get_node(node.target).map_or(node.local_transform, |n| {
                    Mat4::from(n.transform.compose_local_matrix())
                })
            });

            let parent_global = node
                .parent
                .map_or(Mat4::IDENTITY, |p| self.nodes[p].global_transform);

            let node = &mut self.nodes[i];
            node.local_transform = local;
            node.global_transform = parent_global * local;
        }
    }
}

/// A bone found on a mesh while walking, resolved against node names once
/// the walk is complete.
struct PendingBone<'a> {
    name: &'a str,
    mesh: MeshKey,
    bone_index: usize,
    owner: NodeHandle,
    offset_matrix: Mat4,
}

/// Builds an [`AnimTree`] from a scene hierarchy and a clip.
pub struct SkeletonBuilder<'a> {
    scene: &'a Scene,
    clip: &'a AnimationClip,
}

impl<'a> SkeletonBuilder<'a> {
    #[must_use]
    pub fn new(scene: &'a Scene, clip: &'a AnimationClip) -> Self {
        Self { scene, clip }
    }

    /// Builds and prunes the tree under `root`.
    pub fn build(&self, root: NodeHandle) -> Result<AnimTree> {
        let mut tree = self.build_unpruned(root)?;
        tree.prune();
        Ok(tree)
    }

    /// Builds the full tree under `root` without pruning.
    ///
    /// Bones naming a node that is not in the hierarchy are logged and
    /// skipped. When several nodes share a name, bones bind to the last one
    /// visited.
    pub fn build_unpruned(&self, root: NodeHandle) -> Result<AnimTree> {
        if !self.scene.nodes.contains_key(root) {
            return Err(AnimationError::NodeNotFound(root));
        }

        let mut nodes: Vec<AnimNode> = Vec::new();
        let mut by_name: FxHashMap<&'a str, usize> = FxHashMap::default();
        let mut pending: Vec<PendingBone<'a>> = Vec::new();

        // (scene node, parent tree index)
        let mut stack: Vec<(NodeHandle, Option<usize>)> = vec![(root, None)];
        while let Some((handle, parent)) = stack.pop() {
            let Some(scene_node) = self.scene.get_node(handle) else {
                continue;
            };

            let index = nodes.len();
            let local = Mat4::from(scene_node.transform.compose_local_matrix());
            let global = parent.map_or(local, |p| nodes[p].global_transform * local);

            let name = scene_node.name();
            let channel = name.and_then(|n| self.clip.find_channel(n));
            if let Some(n) = name {
                by_name.insert(n, index);
            }

            self.collect_bones(handle, &mut pending);

            nodes.push(AnimNode {
                target: handle,
                parent,
                children: Vec::new(),
                local_transform: local,
                global_transform: global,
                channel,
            });
            if let Some(p) = parent {
                nodes[p].children.push(index);
            }

            for &child in scene_node.children().iter().rev() {
                stack.push((child, Some(index)));
            }
        }

        let mut skinned: Vec<SkinnedNode> = Vec::new();
        let mut skinned_slot: FxHashMap<usize, usize> = FxHashMap::default();
        for bone in pending {
            let Some(&tree_index) = by_name.get(bone.name) else {
                log::warn!(
                    "Cannot find the skeletal node for bone '{}' (mesh owner {:?}), skipping",
                    bone.name,
                    bone.owner
                );
                continue;
            };

            let slot = *skinned_slot.entry(tree_index).or_insert_with(|| {
                skinned.push(SkinnedNode {
                    node: nodes[tree_index].target,
                    tree_index,
                    bones: SmallVec::new(),
                });
                skinned.len() - 1
            });
            skinned[slot].bones.push(BoneBinding {
                mesh: bone.mesh,
                bone_index: bone.bone_index,
                owner: bone.owner,
                offset_matrix: bone.offset_matrix,
            });
        }

        let by_node = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.target, i))
            .collect();

        log::debug!(
            "Animation tree built for clip '{}': {} nodes, {} skinned nodes",
            self.clip.name,
            nodes.len(),
            skinned.len()
        );

        Ok(AnimTree {
            nodes,
            skinned,
            by_node,
        })
    }

    fn collect_bones(&self, owner: NodeHandle, pending: &mut Vec<PendingBone<'a>>) {
        let Some(mesh_key) = self.scene.get_node(owner).and_then(|n| n.mesh) else {
            return;
        };
        let Some(mesh) = self.scene.mesh(mesh_key) else {
            return;
        };

        log::trace!("Collecting {} bones from mesh '{}'", mesh.bones.len(), mesh.name);
        for (bone_index, bone) in mesh.bones.iter().enumerate() {
            pending.push(PendingBone {
                name: &bone.name,
                mesh: mesh_key,
                bone_index,
                owner,
                offset_matrix: bone.offset_matrix,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::channel::AnimationChannel;
    use crate::scene::{Bone, Mesh, Node};

    fn clip_for(names: &[&str]) -> AnimationClip {
        let mut clip = AnimationClip::new("test", 10.0, 25.0);
        for name in names {
            clip.add_channel(AnimationChannel::new(name, vec![], vec![], vec![]));
        }
        clip
    }

    #[test]
    fn nodes_are_stored_in_pre_order() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let a = scene.add_to_parent(Node::with_name("a"), root);
        let b = scene.add_to_parent(Node::with_name("b"), root);
        let a1 = scene.add_to_parent(Node::with_name("a1"), a);

        let clip = clip_for(&[]);
        let tree = SkeletonBuilder::new(&scene, &clip)
            .build_unpruned(root)
            .unwrap();

        let order: Vec<NodeHandle> = tree.nodes().iter().map(|n| n.target).collect();
        assert_eq!(order, vec![root, a, a1, b]);
        for (i, node) in tree.nodes().iter().enumerate() {
            if let Some(p) = node.parent {
                assert!(p < i);
            }
        }
    }

    #[test]
    fn prune_drops_static_children_of_animated_nodes() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let arm = scene.add_to_parent(Node::with_name("arm"), root);
        let prop = scene.add_to_parent(Node::with_name("prop"), arm);

        let clip = clip_for(&["arm"]);
        let tree = SkeletonBuilder::new(&scene, &clip).build(root).unwrap();

        assert!(tree.contains(root));
        assert!(tree.contains(arm));
        assert!(!tree.contains(prop));
        assert!(tree.node(arm).unwrap().children.is_empty());
    }

    #[test]
    fn prune_keeps_bone_targets_without_channels() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        let joint = scene.add_to_parent(Node::with_name("joint"), root);
        let skin = scene.add_to_parent(Node::with_name("skin"), root);
        scene.set_mesh(
            skin,
            Mesh::with_bones("body", vec![Bone::new("joint", Mat4::IDENTITY)]),
        );

        let clip = clip_for(&[]);
        let tree = SkeletonBuilder::new(&scene, &clip).build(root).unwrap();

        assert!(tree.contains(joint));
        // The mesh owner itself is not part of the animated skeleton
        assert!(!tree.contains(skin));
        assert_eq!(tree.num_bindings(), 1);
        let skinned = &tree.skinned_nodes()[0];
        assert_eq!(tree.nodes()[skinned.tree_index].target, joint);
    }

    #[test]
    fn prune_of_static_hierarchy_is_empty() {
        let mut scene = Scene::new();
        let root = scene.create_node("root");
        scene.add_to_parent(Node::with_name("child"), root);

        let clip = clip_for(&["missing"]);
        let tree = SkeletonBuilder::new(&scene, &clip).build(root).unwrap();
        assert!(tree.is_empty());
        assert!(tree.root().is_none());
    }
}
