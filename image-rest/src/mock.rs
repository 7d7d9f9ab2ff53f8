//! Scriptable registry used by the unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use image_api::{Context, Image, ImageList, Selector};
use registry_driver::{Registry, RegistryError, RegistryErrorKind};
use registry_store::Images;

/// Returns canned values, or `err` from every operation when set.
#[derive(Debug, Default)]
pub(crate) struct MockRegistry {
    pub(crate) err: Option<RegistryError>,
    pub(crate) images: ImageList,
    pub(crate) image: Option<Image>,
    pub(crate) calls: AtomicUsize,
}

impl MockRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing(err: RegistryError) -> Self {
        Self {
            err: Some(err),
            ..Self::default()
        }
    }

    /// Number of operations the registry has served.
    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn enter(&self) -> Result<(), RegistryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.err {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait::async_trait]
impl Registry for MockRegistry {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list(
        &self,
        _ctx: &Context,
        _label: &Selector,
        _field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        self.enter()?;
        Ok(self.images.clone())
    }

    async fn get(&self, _ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        self.enter()?;
        self.image.clone().ok_or_else(|| {
            RegistryError::builder("mock", RegistryErrorKind::NotFound, "no image")
                .name(name)
                .build()
        })
    }

    async fn create(&self, _ctx: &Context, image: Image) -> Result<Image, RegistryError> {
        self.enter()?;
        Ok(image)
    }

    async fn delete(&self, _ctx: &Context, _name: &str) -> Result<(), RegistryError> {
        self.enter()
    }
}

impl From<MockRegistry> for Images {
    fn from(value: MockRegistry) -> Self {
        Images::new(value)
    }
}
