use serde::{Deserialize, Serialize};

use crate::meta::ObjectMeta;
use crate::selector::Fields;
use crate::status::Status;

/// A container image known to the registry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    /// Standard object metadata.
    #[serde(default)]
    pub metadata: ObjectMeta,

    /// Reference to the underlying content, e.g. `openshift/ruby-19-centos`.
    #[serde(default)]
    pub docker_image_reference: String,
}

impl Image {
    /// Kind name used in messages and status details.
    pub const KIND: &'static str = "Image";

    /// Create an image with a name and content reference.
    pub fn new(name: impl Into<String>, reference: impl Into<String>) -> Self {
        Self {
            metadata: ObjectMeta::named(name),
            docker_image_reference: reference.into(),
        }
    }

    /// Set the namespace of this image.
    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.metadata.namespace = namespace.into();
        self
    }

    /// The image name.
    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    /// The image namespace, empty when cluster-scoped.
    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }
}

impl Fields for Image {
    fn field(&self, key: &str) -> Option<&str> {
        match key {
            "name" | "metadata.name" => Some(&self.metadata.name),
            "namespace" | "metadata.namespace" => Some(&self.metadata.namespace),
            "dockerImageReference" => Some(&self.docker_image_reference),
            _ => None,
        }
    }
}

/// A collection of images. No ordering is implied.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageList {
    /// The images in this list.
    #[serde(default)]
    pub items: Vec<Image>,
}

impl ImageList {
    /// Kind name used in messages.
    pub const KIND: &'static str = "ImageList";

    /// Number of images in the list.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the list has no images.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl From<Vec<Image>> for ImageList {
    fn from(items: Vec<Image>) -> Self {
        Self { items }
    }
}

impl FromIterator<Image> for ImageList {
    fn from_iter<T: IntoIterator<Item = Image>>(iter: T) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// An object body decoded by a dispatcher, before its type has been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Object {
    /// A single image.
    Image(Image),

    /// A list of images.
    ImageList(ImageList),

    /// A status payload.
    Status(Status),
}

impl Object {
    /// The kind name of the contained object.
    pub fn kind(&self) -> &'static str {
        match self {
            Object::Image(_) => Image::KIND,
            Object::ImageList(_) => ImageList::KIND,
            Object::Status(_) => Status::KIND,
        }
    }
}

impl From<Image> for Object {
    fn from(value: Image) -> Self {
        Object::Image(value)
    }
}

impl From<ImageList> for Object {
    fn from(value: ImageList) -> Self {
        Object::ImageList(value)
    }
}

impl From<Status> for Object {
    fn from(value: Status) -> Self {
        Object::Status(value)
    }
}
