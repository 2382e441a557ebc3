use foundation::math::{Quat, Vec3};

/// Placement of the globe group in world space.
///
/// Anchors are stored as globe-local unit directions; the pose rotates and
/// scales them into the world each tick.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GlobePose {
    pub rotation: Quat,
    pub radius: f64,
}

impl Default for GlobePose {
    fn default() -> Self {
        Self {
            rotation: Quat::IDENTITY,
            radius: 1.0,
        }
    }
}

impl GlobePose {
    pub fn rotated(rotation: Quat) -> Self {
        Self {
            rotation,
            ..Self::default()
        }
    }

    /// Outward surface normal at a globe-local anchor.
    pub fn normal_at(&self, anchor: Vec3) -> Vec3 {
        self.rotation.rotate(anchor)
    }

    /// World position of an anchor lifted `lift` (fraction of the radius) above the surface.
    pub fn anchor_to_world(&self, anchor: Vec3, lift: f64) -> Vec3 {
        self.normal_at(anchor) * (self.radius * (1.0 + lift))
    }
}
