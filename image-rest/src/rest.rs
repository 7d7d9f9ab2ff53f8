//! REST storage for images

use image_api::{validate_image, Context, Image, ImageList, Object, Selector, Status};
use registry_store::Images;

use crate::error::{ApiError, StatusError};

/// Implements the image verbs on top of a registry.
///
/// Holds nothing but a shared handle to the registry, so it is cheap to clone
/// and safe to call concurrently. Registry errors are handed back exactly as
/// the registry produced them.
#[derive(Debug, Clone)]
pub struct ImageRest {
    registry: Images,
}

impl ImageRest {
    /// Create the REST storage over a registry backend.
    pub fn new(registry: impl Into<Images>) -> Self {
        Self {
            registry: registry.into(),
        }
    }

    /// List images matching both selectors.
    ///
    /// Selector semantics belong to the registry; nothing is filtered here.
    #[tracing::instrument(skip(self), fields(registry = self.registry.name()))]
    pub async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, ApiError> {
        let list = self
            .registry
            .list(ctx, label, field)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "Failed to list images"))?;
        Ok(list)
    }

    /// Get a single image by name.
    ///
    /// The registry scopes the lookup by the context; the returned image's
    /// namespace is not compared against it here.
    #[tracing::instrument(skip(self), fields(registry = self.registry.name()))]
    pub async fn get(&self, ctx: &Context, name: &str) -> Result<Image, ApiError> {
        let image = self
            .registry
            .get(ctx, name)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, %name, "Failed to get image"))?;
        Ok(image)
    }

    /// Create an image from a decoded object.
    ///
    /// The object must be an [`Image`]. Its namespace is defaulted from the
    /// context when empty and must match the context otherwise. The image is
    /// validated before it reaches the registry.
    #[tracing::instrument(skip(self, object), fields(registry = self.registry.name()))]
    pub async fn create(
        &self,
        ctx: &Context,
        object: impl Into<Object>,
    ) -> Result<Image, ApiError> {
        self.admit(ctx, object.into())
            .await
            .inspect_err(|err| tracing::warn!(error = %err, "Failed to create image"))
    }

    async fn admit(&self, ctx: &Context, object: Object) -> Result<Image, ApiError> {
        let image = match object {
            Object::Image(image) => image,
            other => return Err(ApiError::type_mismatch(other.kind())),
        };

        let image = reconcile_namespace(ctx, image)?;

        let errors = validate_image(&image);
        if !errors.is_empty() {
            tracing::debug!(name = %image.name(), "Rejecting invalid image: {} field errors", errors.len());
            return Err(StatusError::invalid(Image::KIND, image.name(), &errors).into());
        }

        Ok(self.registry.create(ctx, image).await?)
    }

    /// Delete an image by name, reporting success as a [`Status`].
    #[tracing::instrument(skip(self), fields(registry = self.registry.name()))]
    pub async fn delete(&self, ctx: &Context, name: &str) -> Result<Status, ApiError> {
        self.registry
            .delete(ctx, name)
            .await
            .inspect_err(|err| tracing::warn!(error = %err, %name, "Failed to delete image"))?;
        Ok(Status::success())
    }
}

/// Default an empty namespace from the context, or reject one that differs from it.
fn reconcile_namespace(ctx: &Context, mut image: Image) -> Result<Image, StatusError> {
    let Some(namespace) = ctx.namespace() else {
        return Ok(image);
    };

    if !ctx.agrees_with(image.namespace()) {
        tracing::debug!(
            expected = %namespace,
            actual = %image.metadata.namespace,
            "Image namespace does not match the request"
        );
        return Err(StatusError::conflict(
            Image::KIND,
            image.name(),
            format_args!("{}.Namespace does not match the provided context", Image::KIND),
        ));
    }

    if image.metadata.namespace.is_empty() {
        image.metadata.namespace = namespace.to_owned();
    }
    Ok(image)
}
