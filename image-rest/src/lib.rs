//! # Image REST storage
//!
//! Implements the List, Get, Create and Delete verbs for images on top of a
//! pluggable registry. Every verb forwards the request [`Context`] to the
//! registry untouched; Create additionally checks the object type, reconciles
//! the object's namespace with the context, and validates it before anything
//! is persisted.
//!
//! ## Example
//!
//! ```rust
//! use image_api::{Context, Image, Selector};
//! use image_rest::ImageRest;
//! use registry_store::MemoryRegistry;
//!
//! # async fn example() -> Result<(), image_rest::ApiError> {
//! let rest = ImageRest::new(MemoryRegistry::new());
//! let ctx = Context::with_namespace("default");
//!
//! let image = rest
//!     .create(&ctx, Image::new("ruby", "openshift/ruby-19-centos"))
//!     .await?;
//! assert_eq!(image.namespace(), "default");
//!
//! let images = rest
//!     .list(&ctx, &Selector::everything(), &Selector::everything())
//!     .await?;
//! assert_eq!(images.len(), 1);
//! # Ok(())
//! # }
//! ```

mod error;
#[cfg(test)]
mod mock;
mod rest;

pub use error::{ApiError, ApiErrorKind, StatusError};
pub use rest::ImageRest;

#[doc(no_inline)]
pub use image_api::Context;
