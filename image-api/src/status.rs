use std::fmt;

use http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::validation::FieldError;

/// Outcome tag of a [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusOutcome {
    /// The operation completed.
    Success,

    /// The operation failed; see the reason and message.
    Failure,
}

/// Machine-readable reason for a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatusReason {
    /// The request could not be interpreted.
    BadRequest,
    /// The object failed validation.
    Invalid,
    /// The request conflicts with the current state or scope.
    Conflict,
    /// The named object does not exist.
    NotFound,
    /// An object with the same name already exists.
    AlreadyExists,
    /// The caller may not perform this operation.
    Forbidden,
    /// The backend is temporarily unavailable.
    ServiceUnavailable,
    /// Uncategorized server-side failure.
    InternalError,
}

impl StatusReason {
    /// The HTTP status code conventionally paired with this reason.
    pub fn code(&self) -> StatusCode {
        match self {
            StatusReason::BadRequest => StatusCode::BAD_REQUEST,
            StatusReason::Invalid => StatusCode::UNPROCESSABLE_ENTITY,
            StatusReason::Conflict | StatusReason::AlreadyExists => StatusCode::CONFLICT,
            StatusReason::NotFound => StatusCode::NOT_FOUND,
            StatusReason::Forbidden => StatusCode::FORBIDDEN,
            StatusReason::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            StatusReason::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// A single cause contributing to a failure, usually one invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCause {
    /// Machine-readable reason, e.g. `FieldValueRequired`.
    pub reason: String,
    /// Human readable description.
    pub message: String,
    /// Path of the field at fault, if any.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub field: String,
}

impl From<&FieldError> for StatusCause {
    fn from(error: &FieldError) -> Self {
        Self {
            reason: error.kind.reason().to_owned(),
            message: error.to_string(),
            field: error.field.clone(),
        }
    }
}

/// Identifies the object a status refers to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusDetails {
    /// Kind of the object, e.g. `Image`.
    pub kind: String,
    /// Name of the object.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,
    /// Individual causes, one per failing field.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub causes: Vec<StatusCause>,
}

/// Terminal result of an operation that does not return the object itself.
///
/// Built with [`Status::success`] or [`Status::failure`] and refined with the
/// `with_*` methods:
///
/// ```rust
/// use image_api::{Status, StatusReason};
///
/// let status = Status::failure(StatusReason::Conflict, "namespace mismatch")
///     .with_details("Image", "foo");
/// assert_eq!(status.code, 409);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    /// Success or failure.
    pub status: StatusOutcome,

    /// Human readable description.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub message: String,

    /// Machine-readable failure reason.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<StatusReason>,

    /// HTTP-style status code.
    pub code: u16,

    /// The object this status refers to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<StatusDetails>,
}

impl Status {
    /// Kind name used in messages.
    pub const KIND: &'static str = "Status";

    /// A successful outcome.
    pub fn success() -> Self {
        Self {
            status: StatusOutcome::Success,
            message: String::new(),
            reason: None,
            code: StatusCode::OK.as_u16(),
            details: None,
        }
    }

    /// A failed outcome, with the code implied by `reason`.
    pub fn failure(reason: StatusReason, message: impl Into<String>) -> Self {
        Self {
            status: StatusOutcome::Failure,
            message: message.into(),
            reason: Some(reason),
            code: reason.code().as_u16(),
            details: None,
        }
    }

    /// Override the status code.
    pub fn with_code(mut self, code: StatusCode) -> Self {
        self.code = code.as_u16();
        self
    }

    /// Identify the object this status refers to.
    pub fn with_details(mut self, kind: impl Into<String>, name: impl Into<String>) -> Self {
        let details = self.details.get_or_insert_with(StatusDetails::default);
        details.kind = kind.into();
        details.name = name.into();
        self
    }

    /// Attach field causes.
    pub fn with_causes<'e, I>(mut self, errors: I) -> Self
    where
        I: IntoIterator<Item = &'e FieldError>,
    {
        let details = self.details.get_or_insert_with(StatusDetails::default);
        details.causes.extend(errors.into_iter().map(StatusCause::from));
        self
    }

    /// Whether this status reports success.
    pub fn is_success(&self) -> bool {
        self.status == StatusOutcome::Success
    }

    /// The status code as an [`http::StatusCode`].
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.status, self.message.is_empty()) {
            (StatusOutcome::Success, _) => write!(f, "success"),
            (StatusOutcome::Failure, true) => write!(f, "failure ({})", self.code),
            (StatusOutcome::Failure, false) => f.write_str(&self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success() {
        let status = Status::success();
        assert!(status.is_success());
        assert_eq!(status.status_code(), StatusCode::OK);
        assert_eq!(
            serde_json::to_value(&status).unwrap(),
            serde_json::json!({"status": "Success", "code": 200})
        );
    }

    #[test]
    fn failure_with_causes() {
        let errors = [FieldError::required("metadata.name")];
        let status = Status::failure(StatusReason::Invalid, "image \"\" is invalid")
            .with_details("Image", "")
            .with_causes(&errors);

        assert!(!status.is_success());
        assert_eq!(status.status_code(), StatusCode::UNPROCESSABLE_ENTITY);

        let details = status.details.unwrap();
        assert_eq!(details.kind, "Image");
        assert_eq!(details.causes.len(), 1);
        assert_eq!(details.causes[0].field, "metadata.name");
        assert_eq!(details.causes[0].reason, "FieldValueRequired");
    }

    #[test]
    fn code_override() {
        let status =
            Status::failure(StatusReason::InternalError, "boom").with_code(StatusCode::BAD_GATEWAY);
        assert_eq!(status.code, 502);
        assert_eq!(status.to_string(), "boom");
    }
}
