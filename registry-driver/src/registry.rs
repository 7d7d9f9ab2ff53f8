use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use image_api::{Context, Image, ImageList, Selector};

use crate::error::RegistryError;

/// A shared, type-erased registry.
pub type ArcRegistry = Arc<dyn Registry + Send + Sync>;

/// A registry, which holds images on behalf of the REST layer.
///
/// Every operation takes the request [`Context`]; backends use its namespace
/// to scope reads and writes. How images are persisted and how selectors are
/// matched is up to the backend.
#[async_trait::async_trait]
pub trait Registry: fmt::Debug {
    /// The name of the registry engine, used in logs and errors.
    fn name(&self) -> &'static str;

    /// List the images visible under `ctx` which match both selectors.
    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError>;

    /// Get a single image by name.
    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError>;

    /// Persist a new image, returning the stored object.
    async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError>;

    /// Delete an image by name.
    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError>;
}

#[async_trait::async_trait]
impl<R> Registry for Arc<R>
where
    R: ?Sized + Registry + Sync + Send + 'static,
{
    fn name(&self) -> &'static str {
        self.deref().name()
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        self.deref().list(ctx, label, field).await
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        self.deref().get(ctx, name).await
    }

    async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        self.deref().create(ctx, image).await
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        self.deref().delete(ctx, name).await
    }
}

#[async_trait::async_trait]
impl<R> Registry for &R
where
    R: ?Sized + Registry + Sync + Send + 'static,
{
    fn name(&self) -> &'static str {
        (**self).name()
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        (**self).list(ctx, label, field).await
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        (**self).get(ctx, name).await
    }

    async fn create(&self, ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        (**self).create(ctx, image).await
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        (**self).delete(ctx, name).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static_assertions::assert_obj_safe!(Registry);
}
