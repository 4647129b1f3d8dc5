use serde::{Deserialize, Serialize};

use crate::ecs::{Component, EntityId};
use crate::math::{EulerRot, Mat4, Quat, Vec3};

/// 3D Transform component
/// Represents position, rotation and scale in 3D space.
///
/// Setters only flag the transform as changed; the transform system picks the
/// change up once per frame and turns it into an instance update message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    position: Vec3,
    rotation: Quat,
    scale: Vec3,
    /// Owning entity, recorded by the attach hook
    #[serde(skip)]
    entity: Option<EntityId>,
    #[serde(skip, default = "changed_on_load")]
    changed: bool,
}

fn changed_on_load() -> bool {
    true
}

impl Transform {
    /// Create a new Transform with specified values
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position,
            rotation,
            scale,
            entity: None,
            changed: true,
        }
    }

    /// Create a transform from euler angles in radians (yaw around Y, pitch around X, roll around Z)
    pub fn from_euler(position: Vec3, euler: Vec3, scale: Vec3) -> Self {
        let rotation = Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z);
        Self::new(position, rotation, scale)
    }

    /// Create an identity transform (no translation, rotation, or scale)
    pub fn identity() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY, Vec3::ONE)
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY, Vec3::ONE)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
        self.changed = true;
    }

    pub fn set_rotation(&mut self, rotation: Quat) {
        self.rotation = rotation;
        self.changed = true;
    }

    pub fn set_euler(&mut self, euler: Vec3) {
        self.set_rotation(Quat::from_euler(EulerRot::YXZ, euler.y, euler.x, euler.z));
    }

    pub fn set_scale(&mut self, scale: Vec3) {
        self.scale = scale;
        self.changed = true;
    }

    pub fn translate(&mut self, delta: Vec3) {
        self.set_position(self.position + delta);
    }

    /// Convert to a 4x4 transformation matrix (translation * rotation * scale)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Entity this transform is attached to, if any
    pub fn entity(&self) -> Option<EntityId> {
        self.entity
    }

    pub fn is_changed(&self) -> bool {
        self.changed
    }

    /// Clears the changed flag and returns the owner and the new model matrix.
    /// Detached transforms keep their flag until they are attached.
    pub fn take_change(&mut self) -> Option<(EntityId, Mat4)> {
        let entity = self.entity?;
        if !self.changed {
            return None;
        }
        self.changed = false;
        Some((entity, self.to_matrix()))
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Component for Transform {
    fn on_attach(&mut self, entity: EntityId) {
        self.entity = Some(entity);
        // The first matrix has to reach the instance buffer as well
        self.changed = true;
    }
}
