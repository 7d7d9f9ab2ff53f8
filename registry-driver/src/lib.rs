//! # Registry driver
//!
//! The capability interface a storage backend implements to hold images, and
//! the error type backends report failures with.

mod error;
mod registry;

pub use error::{RegistryError, RegistryErrorBuilder, RegistryErrorKind};
pub use registry::{ArcRegistry, Registry};
