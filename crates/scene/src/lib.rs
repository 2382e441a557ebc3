pub mod camera;
pub mod globe;
pub mod visibility;

pub use camera::*;
pub use globe::*;
pub use visibility::*;
