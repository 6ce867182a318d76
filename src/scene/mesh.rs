use glam::Mat4;

/// A bone of a skinned mesh.
///
/// `name` is the name of the skeletal node whose animated transform drives
/// this bone. `final_transform` is the sink the skinning controller writes
/// every frame; the renderer reads it when building the joint palette.
#[derive(Debug, Clone)]
pub struct Bone {
    pub name: String,
    /// Inverse bind-pose matrix: mesh space -> bone space
    pub offset_matrix: Mat4,
    pub(crate) final_transform: Mat4,
}

impl Bone {
    #[must_use]
    pub fn new(name: &str, offset_matrix: Mat4) -> Self {
        Self {
            name: name.to_string(),
            offset_matrix,
            final_transform: Mat4::IDENTITY,
        }
    }

    #[inline]
    #[must_use]
    pub fn final_transform(&self) -> &Mat4 {
        &self.final_transform
    }

    #[inline]
    pub fn set_final_transform(&mut self, matrix: Mat4) {
        self.final_transform = matrix;
    }
}

/// Mesh component. Only the skinning-relevant part is modelled here.
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub bones: Vec<Bone>,
}

impl Mesh {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            bones: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_bones(name: &str, bones: Vec<Bone>) -> Self {
        Self {
            name: name.to_string(),
            bones,
        }
    }

    #[inline]
    #[must_use]
    pub fn has_bones(&self) -> bool {
        !self.bones.is_empty()
    }

    /// Final bone matrices in bone order, ready for upload as a joint palette.
    #[must_use]
    pub fn joint_matrices(&self) -> Vec<Mat4> {
        self.bones.iter().map(|b| b.final_transform).collect()
    }
}
