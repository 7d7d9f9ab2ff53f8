//! # Image API
//!
//! Object model shared by the image registries and the REST storage layer:
//! the request [`Context`], the [`Image`] resource and its list form, label and
//! field [`Selector`]s, field-level validation, and the [`Status`] payload
//! returned by terminal operations.

mod context;
mod image;
mod meta;
pub mod selector;
mod status;
pub mod validation;

pub use context::Context;
pub use image::{Image, ImageList, Object};
pub use meta::ObjectMeta;
pub use selector::{Fields, Selector, SelectorError};
pub use status::{Status, StatusCause, StatusDetails, StatusOutcome, StatusReason};
pub use validation::{
    is_dns_label, is_dns_subdomain, validate_image, FieldError, FieldErrorKind,
};
