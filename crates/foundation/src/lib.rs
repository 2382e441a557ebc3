pub mod math;

// Foundation crate: small, well-tested primitives only.
pub use math::{Mat4, Quat, Vec3};
