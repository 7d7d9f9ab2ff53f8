use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use image_api::{Context, Image, ImageList, Selector};
use registry_driver::{Registry, RegistryError, RegistryErrorKind};

const ENGINE: &str = "memory";

#[derive(Debug, Default)]
struct State {
    namespaces: HashMap<String, HashMap<String, Image>>,
    version: u64,
}

impl State {
    fn insert(&mut self, mut image: Image) -> Result<Image, RegistryError> {
        let images = self
            .namespaces
            .entry(image.metadata.namespace.clone())
            .or_default();
        if images.contains_key(image.name()) {
            return Err(RegistryError::builder(
                ENGINE,
                RegistryErrorKind::AlreadyExists,
                format!("image {:?} already exists", image.name()),
            )
            .namespace(image.namespace())
            .name(image.name())
            .build());
        }

        self.version += 1;
        image.metadata.uid = Some(Uuid::new_v4().to_string());
        image.metadata.resource_version = Some(self.version.to_string());
        image.metadata.creation_timestamp = Some(Utc::now());

        images.insert(image.metadata.name.clone(), image.clone());
        Ok(image)
    }
}

fn not_found(ctx: &Context, name: &str) -> RegistryError {
    RegistryError::builder(
        ENGINE,
        RegistryErrorKind::NotFound,
        format!("image {name:?} not found"),
    )
    .namespace(ctx.namespace_or_cluster())
    .name(name)
    .build()
}

/// Registry that keeps images in memory, keyed by namespace and name.
///
/// A namespaced context confines every operation to its namespace. The
/// default context lists across all namespaces, but `get` and `delete` under
/// it only see cluster-scoped images. An image created under the default
/// context keeps its own namespace, so it is reachable afterwards only through
/// a context for that namespace. Namespaces are dropped once their last image
/// is deleted.
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    state: RwLock<State>,
}

impl MemoryRegistry {
    /// Create an empty `MemoryRegistry`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a `MemoryRegistry` pre-populated with `images`.
    ///
    /// Images keep their own namespace. Later duplicates replace earlier ones.
    pub fn with_images<I>(images: I) -> Self
    where
        I: IntoIterator<Item = Image>,
    {
        let mut state = State::default();
        for image in images {
            state
                .namespaces
                .entry(image.metadata.namespace.clone())
                .or_default()
                .insert(image.metadata.name.clone(), image);
        }

        Self {
            state: RwLock::new(state),
        }
    }

    /// Number of images held across all namespaces.
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.namespaces.values().map(HashMap::len).sum()
    }

    /// Whether the registry holds no images.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait::async_trait]
impl Registry for MemoryRegistry {
    fn name(&self) -> &'static str {
        ENGINE
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        tracing::trace!(%ctx, %label, %field, "list memory registry");

        let state = self.state.read().await;
        let scoped: Box<dyn Iterator<Item = &HashMap<String, Image>> + '_> = match ctx.namespace() {
            Some(namespace) => Box::new(state.namespaces.get(namespace).into_iter()),
            None => Box::new(state.namespaces.values()),
        };

        Ok(scoped
            .flat_map(HashMap::values)
            .filter(|image| label.matches(&image.metadata.labels) && field.matches(*image))
            .cloned()
            .collect())
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        let state = self.state.read().await;
        state
            .namespaces
            .get(ctx.namespace_or_cluster())
            .and_then(|images| images.get(name))
            .cloned()
            .ok_or_else(|| not_found(ctx, name))
    }

    async fn create(&self, ctx: &Context, mut image: Image) -> Result<Image, RegistryError> {
        if image.metadata.namespace.is_empty() {
            image.metadata.namespace = ctx.namespace_or_cluster().to_owned();
        }
        tracing::trace!(%ctx, name = %image.name(), "create in memory registry");

        let mut state = self.state.write().await;
        state.insert(image)
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        let namespace = ctx.namespace_or_cluster();
        let mut state = self.state.write().await;
        let images = state
            .namespaces
            .get_mut(namespace)
            .ok_or_else(|| not_found(ctx, name))?;
        images.remove(name).ok_or_else(|| not_found(ctx, name))?;

        if images.is_empty() {
            state.namespaces.remove(namespace);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use image_api::ObjectMeta;

    fn image(name: &str, namespace: &str) -> Image {
        Image::new(name, "openshift/ruby-19-centos").in_namespace(namespace)
    }

    #[tokio::test]
    async fn create_stamps_metadata() {
        let registry = MemoryRegistry::new();
        let ctx = Context::with_namespace("default");

        let stored = registry.create(&ctx, image("foo", "")).await.unwrap();
        assert_eq!(stored.namespace(), "default");
        assert!(stored.metadata.uid.is_some());
        assert_eq!(stored.metadata.resource_version.as_deref(), Some("1"));
        assert!(stored.metadata.creation_timestamp.is_some());

        let fetched = registry.get(&ctx, "foo").await.unwrap();
        assert_eq!(fetched, stored);
    }

    #[tokio::test]
    async fn duplicate_create_fails() {
        let registry = MemoryRegistry::new();
        let ctx = Context::new();

        registry.create(&ctx, image("foo", "")).await.unwrap();
        let err = registry.create(&ctx, image("foo", "")).await.unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::AlreadyExists);
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn get_and_delete_are_scoped() {
        let registry = MemoryRegistry::with_images([image("foo", "a"), image("foo", "b")]);

        let err = registry.get(&Context::new(), "foo").await.unwrap_err();
        assert!(err.is_not_found());

        registry
            .delete(&Context::with_namespace("a"), "foo")
            .await
            .unwrap();
        let err = registry
            .delete(&Context::with_namespace("a"), "foo")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::NotFound);
        assert_eq!(err.namespace(), Some("a"));

        assert!(registry
            .get(&Context::with_namespace("b"), "foo")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn delete_drops_empty_namespaces() {
        let registry = MemoryRegistry::new();
        let ctx = Context::with_namespace("default");

        registry.create(&ctx, image("foo", "")).await.unwrap();
        registry.create(&ctx, image("bar", "")).await.unwrap();

        registry.delete(&ctx, "foo").await.unwrap();
        assert!(registry.state.read().await.namespaces.contains_key("default"));

        registry.delete(&ctx, "bar").await.unwrap();
        assert!(registry.state.read().await.namespaces.is_empty());

        let err = registry.delete(&ctx, "bar").await.unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::NotFound);
    }

    #[tokio::test]
    async fn unscoped_create_keeps_image_namespace() {
        let registry = MemoryRegistry::new();

        registry
            .create(&Context::new(), image("foo", "other"))
            .await
            .unwrap();

        let err = registry.get(&Context::new(), "foo").await.unwrap_err();
        assert_eq!(err.kind(), RegistryErrorKind::NotFound);

        let found = registry
            .get(&Context::with_namespace("other"), "foo")
            .await
            .unwrap();
        assert_eq!(found.namespace(), "other");
    }

    #[tokio::test]
    async fn list_scopes_and_filters() {
        let mut labelled = image("bar", "a");
        labelled.metadata = ObjectMeta::named("bar").in_namespace("a").label("app", "web");
        let registry =
            MemoryRegistry::with_images([image("foo", "a"), labelled, image("baz", "b")]);

        let all = registry
            .list(&Context::new(), &Selector::everything(), &Selector::everything())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);

        let scoped = registry
            .list(
                &Context::with_namespace("a"),
                &Selector::everything(),
                &Selector::everything(),
            )
            .await
            .unwrap();
        assert_eq!(scoped.len(), 2);

        let web = registry
            .list(
                &Context::new(),
                &Selector::parse("app=web").unwrap(),
                &Selector::everything(),
            )
            .await
            .unwrap();
        assert_eq!(web.len(), 1);
        assert_eq!(web.items[0].name(), "bar");

        let by_name = registry
            .list(
                &Context::new(),
                &Selector::everything(),
                &Selector::parse("metadata.name=baz").unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(by_name.len(), 1);
        assert_eq!(by_name.items[0].namespace(), "b");

        let missing = registry
            .list(
                &Context::with_namespace("c"),
                &Selector::everything(),
                &Selector::everything(),
            )
            .await
            .unwrap();
        assert!(missing.is_empty());
    }
}
