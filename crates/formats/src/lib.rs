pub mod cache;
pub mod countries;
pub mod error;
pub mod source;

pub use cache::*;
pub use countries::*;
pub use error::*;
pub use source::*;
