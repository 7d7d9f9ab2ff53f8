use std::fmt;

/// Request-scoped metadata handed to every registry operation.
///
/// A context either carries a namespace, which confines the request to that
/// namespace, or carries none, in which case there is nothing to compare an
/// object's namespace against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Context {
    namespace: Option<String>,
}

impl Context {
    /// Create a context with no namespace constraint.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context scoped to `namespace`.
    ///
    /// An empty namespace is treated as no namespace at all.
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        let namespace = namespace.into();
        Self {
            namespace: (!namespace.is_empty()).then_some(namespace),
        }
    }

    /// The namespace this request is scoped to, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// The namespace this request is scoped to, or the empty (cluster) namespace.
    pub fn namespace_or_cluster(&self) -> &str {
        self.namespace().unwrap_or_default()
    }

    /// Whether an object in `namespace` may be read or written under this context.
    ///
    /// Empty object namespaces always agree, as do contexts without a namespace.
    pub fn agrees_with(&self, namespace: &str) -> bool {
        match self.namespace() {
            Some(scope) => namespace.is_empty() || namespace == scope,
            None => true,
        }
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace() {
            Some(ns) => write!(f, "namespace {ns}"),
            None => f.write_str("cluster"),
        }
    }
}
