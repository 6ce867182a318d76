use glam::Mat4;
use smallvec::SmallVec;

use crate::scene::{MeshKey, NodeHandle};

/// Links one bone of a skinned mesh to the skeletal node that drives it.
///
/// The bone itself lives in `scene.meshes[mesh].bones[bone_index]`; that is
/// where the final matrix is written.
#[derive(Debug, Clone)]
pub struct BoneBinding {
    pub mesh: MeshKey,
    pub bone_index: usize,
    /// Node that carries the mesh. Its world transform is factored out of
    /// the final matrix.
    pub owner: NodeHandle,
    /// Inverse bind-pose matrix copied from the bone at build time
    pub offset_matrix: Mat4,
}

/// A skeletal node that drives one or more bones.
///
/// One joint can drive several bones when its influence is split across
/// multiple meshes.
#[derive(Debug, Clone)]
pub struct SkinnedNode {
    pub node: NodeHandle,
    /// Index of the node in the owning [`AnimTree`](crate::animation::AnimTree)
    pub tree_index: usize,
    pub bones: SmallVec<[BoneBinding; 2]>,
}
