//! Arena storage with stable handles

pub use slotmap::{new_key_type, SlotMap};

new_key_type! {
    /// Stable handle of a collision mesh inside a [`MeshArena`](crate::physics::collision::MeshArena)
    pub struct MeshKey;

    /// Stable handle of a rigid body inside a query scene
    pub struct BodyKey;
}

/// Handle of one ridge, valid for the lifetime of its owning mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RidgeHandle {
    /// Owning mesh
    pub mesh: MeshKey,
    /// Index into the mesh's ridge vector
    pub index: usize,
}

impl RidgeHandle {
    /// Create a new ridge handle
    pub fn new(mesh: MeshKey, index: usize) -> Self {
        Self { mesh, index }
    }
}
