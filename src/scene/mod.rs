//! Scene Graph
//!
//! The minimal hierarchy the animation core runs against:
//! - Node: scene node (parent/child links, name, transform)
//! - Transform: TRS component with a cached world matrix
//! - Mesh / Bone: mesh component carrying bone bindings and their final matrices
//! - Scene: node and mesh storage
//! - transform_system: world-matrix propagation, decoupled from `Scene`

pub mod mesh;
pub mod node;
pub mod scene;
pub mod transform;
pub mod transform_system;

pub use mesh::{Bone, Mesh};
pub use node::Node;
pub use scene::Scene;
pub use transform::Transform;

use slotmap::new_key_type;

new_key_type! {
    pub struct NodeHandle;
    pub struct MeshKey;
}
