use std::backtrace::Backtrace;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

use tracing_error::SpanTrace;

/// Categorizes registry errors by their semantic meaning, independent of
/// the backend that produced them.
///
/// Callers inspect the kind to decide how to respond without parsing
/// messages or knowing backend-specific details.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegistryErrorKind {
    /// The named image does not exist in the requested scope.
    ///
    /// **Retryable:** No.
    NotFound,

    /// An image with the same name already exists in the requested scope.
    ///
    /// **Retryable:** No - the name is taken.
    AlreadyExists,

    /// The backend refused access to the underlying storage.
    ///
    /// **Retryable:** No - unless permissions change.
    PermissionDenied,

    /// The operation failed due to I/O errors (disk, network, etc.).
    ///
    /// **Retryable:** Maybe - depends on whether the I/O issue is transient.
    Io,

    /// The backend is temporarily unavailable.
    ///
    /// **Retryable:** Yes.
    Unavailable,

    /// The request could not be served as asked (bad selector, bad name).
    ///
    /// **Retryable:** No.
    InvalidRequest,

    /// A stored image could not be encoded or decoded.
    ///
    /// **Retryable:** No - indicates a data format mismatch.
    Serialization,

    /// An unexpected or uncategorized error occurred.
    Other,
}

impl RegistryErrorKind {
    /// Returns whether this error kind typically indicates a retryable condition.
    pub fn is_retryable(&self) -> bool {
        matches!(self, RegistryErrorKind::Unavailable | RegistryErrorKind::Io)
    }

    /// Returns whether this error indicates a client-side fault.
    pub fn is_client_fault(&self) -> bool {
        matches!(
            self,
            RegistryErrorKind::NotFound
                | RegistryErrorKind::AlreadyExists
                | RegistryErrorKind::PermissionDenied
                | RegistryErrorKind::InvalidRequest
        )
    }

    /// Returns whether this error indicates a server-side fault.
    pub fn is_server_fault(&self) -> bool {
        !self.is_client_fault()
    }
}

impl fmt::Display for RegistryErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryErrorKind::NotFound => write!(f, "not found"),
            RegistryErrorKind::AlreadyExists => write!(f, "already exists"),
            RegistryErrorKind::PermissionDenied => write!(f, "permission denied"),
            RegistryErrorKind::Io => write!(f, "I/O error"),
            RegistryErrorKind::Unavailable => write!(f, "unavailable"),
            RegistryErrorKind::InvalidRequest => write!(f, "invalid request"),
            RegistryErrorKind::Serialization => write!(f, "serialization error"),
            RegistryErrorKind::Other => write!(f, "other error"),
        }
    }
}

#[derive(Debug)]
struct ErrorTrace {
    /// Captured backtrace, controlled by `RUST_BACKTRACE`.
    backtrace: Backtrace,

    /// Span context at the point where the error was created.
    span_trace: SpanTrace,
}

impl ErrorTrace {
    #[track_caller]
    fn capture() -> Self {
        ErrorTrace {
            backtrace: Backtrace::capture(),
            span_trace: SpanTrace::capture(),
        }
    }
}

#[derive(Debug)]
struct Inner {
    kind: RegistryErrorKind,
    engine: &'static str,
    namespace: Option<String>,
    name: Option<String>,
    context: Option<String>,
    source: Box<dyn StdError + Send + Sync + 'static>,
    traces: ErrorTrace,
}

/// Error reported by a [`Registry`](crate::Registry) backend.
///
/// This error type provides:
/// - **Semantic categorization** via [`RegistryErrorKind`]
/// - **Operation context** (engine, namespace, image name)
/// - **Error chain preservation** via `Box<dyn Error + Send + Sync>`
/// - **Backtrace and span trace capture** for debugging
///
/// Cloning is cheap and every clone refers to the same underlying error, so
/// layers above the registry can hand the error on without rebuilding it.
/// [`RegistryError::ptr_eq`] tells whether two values are the same error.
///
/// # Example
///
/// ```rust
/// use registry_driver::{RegistryError, RegistryErrorKind};
///
/// let error = RegistryError::builder("memory", RegistryErrorKind::NotFound, "image not found")
///     .namespace("default")
///     .name("foo")
///     .build();
/// assert_eq!(error.kind(), RegistryErrorKind::NotFound);
/// assert_eq!(error.name(), Some("foo"));
/// ```
#[derive(Debug, Clone)]
pub struct RegistryError {
    inner: Arc<Inner>,
}

impl StdError for RegistryError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(self.inner.source.as_ref())
    }
}

impl RegistryError {
    /// Create a new registry error with the minimum required information.
    ///
    /// For more control, use [`RegistryError::builder`].
    #[track_caller]
    pub fn new<E>(engine: &'static str, kind: RegistryErrorKind, error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Self::builder(engine, kind, error).build()
    }

    /// Create a builder for constructing a registry error with full context.
    pub fn builder<E>(
        engine: &'static str,
        kind: RegistryErrorKind,
        error: E,
    ) -> RegistryErrorBuilder
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        RegistryErrorBuilder {
            engine,
            kind,
            source: error.into(),
            namespace: None,
            name: None,
            context: None,
        }
    }

    /// Returns a boxed closure that creates a registry error from a downstream error.
    ///
    /// This is useful with `.map_err()` for simple error conversion.
    pub fn with<E>(
        engine: &'static str,
        kind: RegistryErrorKind,
    ) -> Box<dyn FnOnce(E) -> RegistryError + Send + Sync>
    where
        E: Into<Box<dyn StdError + Send + Sync + 'static>>,
    {
        Box::new(move |error: E| RegistryError::new(engine, kind, error))
    }

    /// Returns the error kind.
    pub fn kind(&self) -> RegistryErrorKind {
        self.inner.kind
    }

    /// Returns the name of the registry engine that produced this error.
    pub fn engine(&self) -> &'static str {
        self.inner.engine
    }

    /// Returns the namespace involved, if available.
    pub fn namespace(&self) -> Option<&str> {
        self.inner.namespace.as_deref()
    }

    /// Returns the image name involved, if available.
    pub fn name(&self) -> Option<&str> {
        self.inner.name.as_deref()
    }

    /// Returns additional context, if available.
    pub fn context(&self) -> Option<&str> {
        self.inner.context.as_deref()
    }

    /// Returns whether this error is likely retryable.
    pub fn is_retryable(&self) -> bool {
        self.inner.kind.is_retryable()
    }

    /// Returns whether this is a [`RegistryErrorKind::NotFound`] error.
    pub fn is_not_found(&self) -> bool {
        self.inner.kind == RegistryErrorKind::NotFound
    }

    /// Returns whether `self` and `other` are the same error, not merely equal-looking ones.
    pub fn ptr_eq(&self, other: &RegistryError) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a reference to the captured backtrace.
    pub fn backtrace(&self) -> &Backtrace {
        &self.inner.traces.backtrace
    }

    /// Returns a reference to the captured span trace.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.inner.traces.span_trace
    }
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = &self.inner;
        write!(f, "Registry error [{}] from {}", inner.kind, inner.engine)?;

        if let Some(namespace) = &inner.namespace {
            write!(f, " (namespace: {})", namespace)?;
        }

        if let Some(name) = &inner.name {
            write!(f, " (name: {})", name)?;
        }

        if let Some(context) = &inner.context {
            write!(f, " ({})", context)?;
        }

        write!(f, ": {}", inner.source)
    }
}

/// Builder for constructing [`RegistryError`] with optional context fields.
#[derive(Debug)]
pub struct RegistryErrorBuilder {
    kind: RegistryErrorKind,
    engine: &'static str,
    source: Box<dyn StdError + Send + Sync + 'static>,
    namespace: Option<String>,
    name: Option<String>,
    context: Option<String>,
}

impl RegistryErrorBuilder {
    /// Set the namespace. Empty namespaces are ignored.
    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        if !namespace.is_empty() {
            self.namespace = Some(namespace);
        }
        self
    }

    /// Set the image name. Empty names are ignored.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }

    /// Set additional context.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    /// Build the [`RegistryError`], capturing traces at the call site.
    #[track_caller]
    pub fn build(self) -> RegistryError {
        RegistryError {
            inner: Arc::new(Inner {
                kind: self.kind,
                engine: self.engine,
                namespace: self.namespace,
                name: self.name,
                context: self.context,
                source: self.source,
                traces: ErrorTrace::capture(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_impl_all!(RegistryError: Send, Sync, Clone, StdError);

    #[test]
    fn display_includes_context() {
        let error = RegistryError::builder(
            "memory",
            RegistryErrorKind::AlreadyExists,
            "image already exists",
        )
        .namespace("default")
        .name("foo")
        .context("create")
        .build();

        assert_eq!(
            error.to_string(),
            "Registry error [already exists] from memory (namespace: default) (name: foo) (create): image already exists"
        );
    }

    #[test]
    fn clones_are_the_same_error() {
        let error = RegistryError::new("memory", RegistryErrorKind::Other, "test error");
        let clone = error.clone();
        assert!(error.ptr_eq(&clone));

        let lookalike = RegistryError::new("memory", RegistryErrorKind::Other, "test error");
        assert!(!error.ptr_eq(&lookalike));
        assert_eq!(error.to_string(), lookalike.to_string());
    }

    #[test]
    fn with_closure() {
        let result: Result<(), RegistryError> = Err(std::io::Error::other("disk full"))
            .map_err(RegistryError::with("local", RegistryErrorKind::Io));
        let error = result.unwrap_err();
        assert_eq!(error.kind(), RegistryErrorKind::Io);
        assert!(error.is_retryable());
        assert!(error.source().is_some());
    }

    #[test]
    fn kind_faults() {
        assert!(RegistryErrorKind::NotFound.is_client_fault());
        assert!(RegistryErrorKind::Unavailable.is_server_fault());
        assert!(!RegistryErrorKind::AlreadyExists.is_retryable());
    }
}
