use std::io;

use camino::Utf8PathBuf;
use tempfile::TempDir;

use image_api::{Context, Image, ImageList, Selector};
use registry_driver::{Registry, RegistryError};

use crate::local::LocalRegistry;

/// A registry that stores images in a temporary directory, removed on drop.
#[derive(Debug)]
pub struct TempRegistry {
    #[allow(unused, reason = "held to keep the directory alive")]
    dir: TempDir,
    registry: LocalRegistry,
}

impl TempRegistry {
    /// Create a new `TempRegistry` in a fresh temporary directory.
    pub fn new() -> io::Result<Self> {
        let dir = TempDir::new()?;
        let root = Utf8PathBuf::from_path_buf(dir.path().to_owned())
            .map_err(|path| io::Error::other(format!("non UTF-8 temp dir: {}", path.display())))?;

        Ok(Self {
            dir,
            registry: LocalRegistry::new(root),
        })
    }
}

#[async_trait::async_trait]
impl Registry for TempRegistry {
    fn name(&self) -> &'static str {
        "temp"
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        self.registry.list(ctx, label, field).await
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        self.registry.get(ctx, name).await
    }

    async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        self.registry.create(ctx, image).await
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        self.registry.delete(ctx, name).await
    }
}
