//! Error types for the image REST storage

use std::fmt;

use http::StatusCode;
use image_api::{FieldError, Status, StatusReason};
use registry_driver::{RegistryError, RegistryErrorKind};

/// Categorizes [`ApiError`]s so callers can branch without matching on messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The object handed to a verb was not of the expected kind.
    TypeMismatch,

    /// The object failed field validation.
    Invalid,

    /// The object's namespace contradicts the request context.
    Conflict,

    /// Any other failure carried as a [`Status`].
    Status,

    /// The registry failed; the registry's own error is carried unchanged.
    Registry,
}

impl fmt::Display for ApiErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiErrorKind::TypeMismatch => write!(f, "type mismatch"),
            ApiErrorKind::Invalid => write!(f, "invalid"),
            ApiErrorKind::Conflict => write!(f, "conflict"),
            ApiErrorKind::Status => write!(f, "status"),
            ApiErrorKind::Registry => write!(f, "registry"),
        }
    }
}

/// A failure that carries a complete [`Status`], ready for a transport to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    status: Status,
}

impl StatusError {
    /// Wrap a failure status.
    pub fn new(status: Status) -> Self {
        Self { status }
    }

    /// An object failed validation. Each field error becomes a status cause.
    pub fn invalid(kind: &str, name: &str, errors: &[FieldError]) -> Self {
        let reasons = errors
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ");
        let status = Status::failure(
            StatusReason::Invalid,
            format!("{kind} {name:?} is invalid: {reasons}"),
        )
        .with_details(kind, name)
        .with_causes(errors);
        Self { status }
    }

    /// A write conflicts with the scope of the request.
    pub fn conflict(kind: &str, name: &str, message: impl fmt::Display) -> Self {
        let status = Status::failure(StatusReason::Conflict, format!("{kind} {name:?}: {message}"))
            .with_details(kind, name);
        Self { status }
    }

    /// The status describing this failure.
    pub fn status(&self) -> &Status {
        &self.status
    }

    /// The HTTP status code of this failure.
    pub fn code(&self) -> StatusCode {
        self.status.status_code()
    }

    /// The machine-readable reason for this failure.
    pub fn reason(&self) -> Option<StatusReason> {
        self.status.reason
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.status)
    }
}

impl std::error::Error for StatusError {}

impl From<StatusError> for Status {
    fn from(value: StatusError) -> Self {
        value.status
    }
}

/// Error returned by the image REST verbs.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The object handed to Create was not an image.
    #[error("not an image: {kind}")]
    TypeMismatch {
        /// Kind of the object that was received.
        kind: &'static str,
    },

    /// Validation, namespace or other failure, carrying its status.
    #[error(transparent)]
    Status(#[from] StatusError),

    /// Registry failure, exactly as the registry reported it.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

impl ApiError {
    /// The object handed to a verb had the wrong kind.
    pub fn type_mismatch(kind: &'static str) -> Self {
        ApiError::TypeMismatch { kind }
    }

    /// Categorize this error.
    pub fn kind(&self) -> ApiErrorKind {
        match self {
            ApiError::TypeMismatch { .. } => ApiErrorKind::TypeMismatch,
            ApiError::Status(err) => match err.reason() {
                Some(StatusReason::Invalid) => ApiErrorKind::Invalid,
                Some(StatusReason::Conflict) => ApiErrorKind::Conflict,
                _ => ApiErrorKind::Status,
            },
            ApiError::Registry(_) => ApiErrorKind::Registry,
        }
    }

    /// Whether this is a validation failure.
    pub fn is_invalid(&self) -> bool {
        self.kind() == ApiErrorKind::Invalid
    }

    /// Whether this is a namespace conflict.
    pub fn is_conflict(&self) -> bool {
        self.kind() == ApiErrorKind::Conflict
    }

    /// Whether the wrong kind of object was supplied.
    pub fn is_type_mismatch(&self) -> bool {
        self.kind() == ApiErrorKind::TypeMismatch
    }

    /// The registry error, if the registry failed.
    pub fn registry_error(&self) -> Option<&RegistryError> {
        match self {
            ApiError::Registry(err) => Some(err),
            _ => None,
        }
    }

    /// Recover the registry error, or return `self` unchanged.
    pub fn into_registry_error(self) -> Result<RegistryError, Self> {
        match self {
            ApiError::Registry(err) => Ok(err),
            other => Err(other),
        }
    }

    /// The structured status of a validation or conflict failure.
    pub fn status_error(&self) -> Option<&StatusError> {
        match self {
            ApiError::Status(err) => Some(err),
            _ => None,
        }
    }

    /// Render any error as a failure [`Status`] for a transport layer.
    pub fn status(&self) -> Status {
        match self {
            ApiError::TypeMismatch { .. } => {
                Status::failure(StatusReason::BadRequest, self.to_string())
            }
            ApiError::Status(err) => err.status().clone(),
            ApiError::Registry(err) => {
                let reason = match err.kind() {
                    RegistryErrorKind::NotFound => StatusReason::NotFound,
                    RegistryErrorKind::AlreadyExists => StatusReason::AlreadyExists,
                    RegistryErrorKind::PermissionDenied => StatusReason::Forbidden,
                    RegistryErrorKind::InvalidRequest => StatusReason::BadRequest,
                    RegistryErrorKind::Unavailable => StatusReason::ServiceUnavailable,
                    RegistryErrorKind::Io
                    | RegistryErrorKind::Serialization
                    | RegistryErrorKind::Other => StatusReason::InternalError,
                };
                let status = Status::failure(reason, err.to_string());
                match err.name() {
                    Some(name) => status.with_details(image_api::Image::KIND, name),
                    None => status,
                }
            }
        }
    }

    /// The HTTP status code a transport should answer with.
    pub fn status_code(&self) -> StatusCode {
        self.status().status_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(ApiError: Send, Sync, std::error::Error);

    #[test]
    fn type_mismatch() {
        let err = ApiError::type_mismatch("ImageList");
        assert_eq!(err.to_string(), "not an image: ImageList");
        assert!(err.is_type_mismatch());
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn invalid_carries_fields() {
        let err: ApiError = StatusError::invalid(
            "Image",
            "",
            &[
                FieldError::required("metadata.name"),
                FieldError::required("dockerImageReference"),
            ],
        )
        .into();

        assert!(err.is_invalid());
        assert!(!err.is_conflict());
        assert_eq!(
            err.to_string(),
            "Image \"\" is invalid: metadata.name: required value; dockerImageReference: required value"
        );

        let status = err.status();
        assert_eq!(status.code, 422);
        let fields: Vec<_> = status
            .details
            .unwrap()
            .causes
            .into_iter()
            .map(|cause| cause.field)
            .collect();
        assert_eq!(fields, ["metadata.name", "dockerImageReference"]);
    }

    #[test]
    fn conflict() {
        let err: ApiError = StatusError::conflict(
            "Image",
            "foo",
            "Image.Namespace does not match the provided context",
        )
        .into();

        assert!(err.is_conflict());
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
        assert_eq!(
            err.to_string(),
            "Image \"foo\": Image.Namespace does not match the provided context"
        );
    }

    #[test]
    fn other_statuses_are_neither_invalid_nor_conflict() {
        let err: ApiError =
            StatusError::new(Status::failure(StatusReason::NotFound, "gone")).into();
        assert_eq!(err.kind(), ApiErrorKind::Status);
        assert!(!err.is_invalid());
        assert!(!err.is_conflict());
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);

        let err: ApiError = StatusError::new(Status::success()).into();
        assert_eq!(err.kind(), ApiErrorKind::Status);
        assert!(!err.is_invalid());
    }

    #[test]
    fn registry_errors_keep_identity() {
        let source = RegistryError::builder("memory", RegistryErrorKind::NotFound, "gone")
            .name("foo")
            .build();
        let err = ApiError::from(source.clone());

        assert_eq!(err.kind(), ApiErrorKind::Registry);
        assert_eq!(err.to_string(), source.to_string());
        assert!(err.registry_error().unwrap().ptr_eq(&source));

        let status = err.status();
        assert_eq!(status.code, 404);
        assert_eq!(status.details.unwrap().name, "foo");

        assert!(err.into_registry_error().unwrap().ptr_eq(&source));
    }

    #[test]
    fn registry_status_codes() {
        for (kind, code) in [
            (RegistryErrorKind::AlreadyExists, StatusCode::CONFLICT),
            (RegistryErrorKind::PermissionDenied, StatusCode::FORBIDDEN),
            (RegistryErrorKind::InvalidRequest, StatusCode::BAD_REQUEST),
            (RegistryErrorKind::Unavailable, StatusCode::SERVICE_UNAVAILABLE),
            (RegistryErrorKind::Io, StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let err = ApiError::from(RegistryError::new("memory", kind, "test error"));
            assert_eq!(err.status_code(), code, "{kind}");
        }
    }
}
