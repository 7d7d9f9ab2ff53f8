//! Field-level validation of images before they are persisted.

use std::fmt;

use crate::image::Image;

const DNS_SUBDOMAIN_MAX_LEN: usize = 253;
const DNS_LABEL_MAX_LEN: usize = 63;

/// Categorizes why a field failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldErrorKind {
    /// The field was empty but must be set.
    Required,

    /// The field was set to a value that is not allowed.
    Invalid,
}

impl FieldErrorKind {
    /// Short machine-readable reason, as used in status causes.
    pub fn reason(&self) -> &'static str {
        match self {
            FieldErrorKind::Required => "FieldValueRequired",
            FieldErrorKind::Invalid => "FieldValueInvalid",
        }
    }
}

impl fmt::Display for FieldErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldErrorKind::Required => write!(f, "required value"),
            FieldErrorKind::Invalid => write!(f, "invalid value"),
        }
    }
}

/// A single field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Path of the offending field, e.g. `metadata.name`.
    pub field: String,

    /// Why the field failed.
    pub kind: FieldErrorKind,

    /// Human readable detail.
    pub detail: String,
}

impl FieldError {
    /// A required field was left empty.
    pub fn required(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldErrorKind::Required,
            detail: String::new(),
        }
    }

    /// A field holds a disallowed value.
    pub fn invalid(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            kind: FieldErrorKind::Invalid,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.kind)?;
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

/// Validate an image, returning every failing field.
///
/// An empty result means the image may be persisted.
pub fn validate_image(image: &Image) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = &image.metadata.name;
    if name.is_empty() {
        errors.push(FieldError::required("metadata.name"));
    } else if !is_dns_subdomain(name) {
        errors.push(FieldError::invalid(
            "metadata.name",
            format!("{name:?} must be a DNS subdomain"),
        ));
    }

    let namespace = &image.metadata.namespace;
    if !namespace.is_empty() && !is_dns_label(namespace) {
        errors.push(FieldError::invalid(
            "metadata.namespace",
            format!("{namespace:?} must be a DNS label"),
        ));
    }

    if image.docker_image_reference.is_empty() {
        errors.push(FieldError::required("dockerImageReference"));
    }

    errors
}

/// Whether `value` is a DNS label: lowercase alphanumerics and `-`, at most 63 bytes.
pub fn is_dns_label(value: &str) -> bool {
    let bytes = value.as_bytes();
    !bytes.is_empty()
        && bytes.len() <= DNS_LABEL_MAX_LEN
        && bytes
            .iter()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || *b == b'-')
        && bytes.first().is_some_and(u8::is_ascii_alphanumeric)
        && bytes.last().is_some_and(u8::is_ascii_alphanumeric)
}

/// Whether `value` is a dot-separated sequence of DNS labels, at most 253 bytes.
pub fn is_dns_subdomain(value: &str) -> bool {
    value.len() <= DNS_SUBDOMAIN_MAX_LEN && value.split('.').all(is_dns_label)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_image() {
        let image = Image::new("foo", "openshift/ruby-19-centos").in_namespace("default");
        assert!(validate_image(&image).is_empty());
    }

    #[test]
    fn missing_fields() {
        let errors = validate_image(&Image::default());
        assert_eq!(
            errors,
            vec![
                FieldError::required("metadata.name"),
                FieldError::required("dockerImageReference"),
            ]
        );
    }

    #[test]
    fn invalid_names() {
        for name in ["Foo", "-foo", "foo-", "foo..bar", "foo_bar"] {
            let errors = validate_image(&Image::new(name, "ref"));
            assert_eq!(errors.len(), 1, "{name}");
            assert_eq!(errors[0].kind, FieldErrorKind::Invalid);
        }

        assert!(validate_image(&Image::new("ruby-19.centos", "ref")).is_empty());
        assert!(!validate_image(&Image::new("a".repeat(254), "ref")).is_empty());
    }

    #[test]
    fn invalid_namespace() {
        let image = Image::new("foo", "ref").in_namespace("has.dots");
        let errors = validate_image(&image);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "metadata.namespace");
    }

    #[test]
    fn display() {
        assert_eq!(
            FieldError::required("metadata.name").to_string(),
            "metadata.name: required value"
        );
    }
}
