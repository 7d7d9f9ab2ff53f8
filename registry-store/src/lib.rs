//! # Image registries
//!
//! Configuration and unification for the registry backends.

use std::sync::Arc;

#[cfg(feature = "local")]
use camino::Utf8PathBuf;
use serde::Deserialize;

use image_api::{Context, Image, ImageList, Selector};

#[cfg(feature = "local")]
pub(crate) mod local;
pub(crate) mod memory;
#[cfg(feature = "tmp")]
pub(crate) mod temp;

#[cfg(feature = "local")]
#[doc(inline)]
pub use local::LocalRegistry;

#[doc(inline)]
pub use memory::MemoryRegistry;

#[cfg(feature = "tmp")]
#[doc(inline)]
pub use temp::TempRegistry;

#[doc(inline)]
pub use registry_driver::{ArcRegistry, Registry, RegistryError, RegistryErrorKind};

/// Selects and configures a registry backend.
///
/// ```rust
/// # use registry_store::RegistryConfig;
/// let config: RegistryConfig = serde_json::from_str(r#""memory""#).unwrap();
/// assert!(matches!(config, RegistryConfig::Memory));
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RegistryConfig {
    /// Keep images in memory.
    Memory,

    /// Store images as JSON documents below `path`.
    #[cfg(feature = "local")]
    Local {
        /// Root directory of the registry.
        path: Utf8PathBuf,
    },

    /// Store images in a temporary directory.
    #[cfg(feature = "tmp")]
    Temp,
}

impl RegistryConfig {
    /// Construct the configured backend.
    #[tracing::instrument]
    pub async fn build(self) -> Result<Images, RegistryError> {
        let images: Images = match self {
            RegistryConfig::Memory => MemoryRegistry::new().into(),
            #[cfg(feature = "local")]
            RegistryConfig::Local { path } => {
                tokio::fs::create_dir_all(&path)
                    .await
                    .map_err(RegistryError::with("local", RegistryErrorKind::Io))?;
                LocalRegistry::new(path).into()
            }
            #[cfg(feature = "tmp")]
            RegistryConfig::Temp => TempRegistry::new()
                .map_err(RegistryError::with("temp", RegistryErrorKind::Io))?
                .into(),
        };
        tracing::debug!(registry = images.name(), "Built registry");
        Ok(images)
    }
}

/// A cloneable handle to a registry backend, which logs each operation.
///
/// Errors from the backend are returned exactly as the backend produced them.
#[derive(Debug, Clone)]
pub struct Images {
    registry: ArcRegistry,
}

impl From<MemoryRegistry> for Images {
    fn from(value: MemoryRegistry) -> Self {
        Images::new(value)
    }
}

#[cfg(feature = "local")]
impl From<LocalRegistry> for Images {
    fn from(value: LocalRegistry) -> Self {
        Images::new(value)
    }
}

#[cfg(feature = "tmp")]
impl From<TempRegistry> for Images {
    fn from(value: TempRegistry) -> Self {
        Images::new(value)
    }
}

impl<R> From<Arc<R>> for Images
where
    R: Registry + Send + Sync + 'static,
{
    fn from(value: Arc<R>) -> Self {
        Images::from_arc(value)
    }
}

impl Images {
    /// Wrap a registry backend.
    pub fn new<R: Registry + Send + Sync + 'static>(registry: R) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// Share an existing registry.
    pub fn from_arc(registry: ArcRegistry) -> Self {
        Self { registry }
    }

    /// The name of the underlying registry engine.
    pub fn name(&self) -> &'static str {
        self.registry.name()
    }

    /// The underlying registry.
    pub fn registry(&self) -> &ArcRegistry {
        &self.registry
    }

    /// List images visible under `ctx` matching both selectors.
    #[tracing::instrument(skip(self), fields(registry = self.registry.name(), %ctx, %label, %field))]
    pub async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        self.registry.list(ctx, label, field).await
    }

    /// Get an image by name.
    #[tracing::instrument(skip(self), fields(registry = self.registry.name(), %ctx))]
    pub async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        self.registry.get(ctx, name).await
    }

    /// Persist a new image.
    #[tracing::instrument(skip(self, image), fields(registry = self.registry.name(), %ctx, name = %image.name()))]
    pub async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        tracing::trace!(namespace = %image.namespace(), "Creating image");
        self.registry.create(ctx, image).await
    }

    /// Delete an image by name.
    #[tracing::instrument(skip(self), fields(registry = self.registry.name(), %ctx))]
    pub async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        self.registry.delete(ctx, name).await
    }
}

#[async_trait::async_trait]
impl Registry for Images {
    fn name(&self) -> &'static str {
        Images::name(self)
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        Images::list(self, ctx, label, field).await
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        Images::get(self, ctx, name).await
    }

    async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        Images::create(self, ctx, image).await
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        Images::delete(self, ctx, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_configs() {
        let config: RegistryConfig = serde_json::from_str(r#""memory""#).unwrap();
        assert!(matches!(config, RegistryConfig::Memory));

        let config: RegistryConfig =
            serde_json::from_str(r#"{"local": {"path": "/var/lib/images"}}"#).unwrap();
        let path = match config {
            RegistryConfig::Local { path } => path,
            other => panic!("expected local config, got {other:?}"),
        };
        assert_eq!(path, "/var/lib/images");
    }

    #[tokio::test]
    async fn build_memory() {
        let images = RegistryConfig::Memory.build().await.unwrap();
        assert_eq!(images.name(), "memory");

        let ctx = Context::new();
        images
            .create(&ctx, Image::new("foo", "openshift/ruby-19-centos"))
            .await
            .unwrap();
        assert_eq!(images.get(&ctx, "foo").await.unwrap().name(), "foo");
    }

    #[tokio::test]
    async fn build_local() {
        let dir = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(dir.path().join("images")).unwrap();

        let images = RegistryConfig::Local { path: path.clone() }
            .build()
            .await
            .unwrap();
        assert_eq!(images.name(), "local");
        assert!(path.is_dir());
    }

    #[tokio::test]
    async fn handle_is_a_registry() {
        let images = Images::new(MemoryRegistry::new());
        let registry: ArcRegistry = Arc::new(images.clone());
        assert_eq!(registry.name(), "memory");

        let ctx = Context::with_namespace("default");
        registry
            .create(&ctx, Image::new("foo", "openshift/ruby-19-centos"))
            .await
            .unwrap();
        assert_eq!(images.get(&ctx, "foo").await.unwrap().name(), "foo");

        let list = registry
            .list(&ctx, &Selector::everything(), &Selector::everything())
            .await
            .unwrap();
        assert_eq!(list.len(), 1);

        registry.delete(&ctx, "foo").await.unwrap();
        assert!(images.get(&ctx, "foo").await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn handle_passes_errors_through() {
        let images = Images::new(MemoryRegistry::new());
        let err = images.get(&Context::new(), "missing").await.unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::NotFound);
        assert_eq!(err.engine(), "memory");
    }
}
