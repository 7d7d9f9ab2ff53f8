use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::Utc;
use eyre::WrapErr;
use tempfile::NamedTempFile;
use tracing::Instrument;
use uuid::Uuid;

use image_api::{is_dns_label, is_dns_subdomain, Context, Image, ImageList, Selector};
use registry_driver::{Registry, RegistryError, RegistryErrorKind};

/// Directory used for cluster-scoped images, which have no namespace.
const CLUSTER_DIR: &str = "_cluster";

fn io_kind(err: &io::Error) -> RegistryErrorKind {
    match err.kind() {
        io::ErrorKind::NotFound => RegistryErrorKind::NotFound,
        io::ErrorKind::AlreadyExists => RegistryErrorKind::AlreadyExists,
        io::ErrorKind::PermissionDenied => RegistryErrorKind::PermissionDenied,
        _ => RegistryErrorKind::Io,
    }
}

/// Convert an I/O error into a registry error, keeping the kind.
fn io_error(engine: &'static str, err: io::Error) -> RegistryError {
    RegistryError::new(engine, io_kind(&err), err)
}

/// Registry that stores each image as a JSON document on the local filesystem.
///
/// Images live at `<root>/<namespace>/<name>.json`, with cluster-scoped
/// images under `<root>/_cluster`. Namespaces must be DNS labels and names DNS
/// subdomains, so no request reaches outside the root. Documents are written
/// to a temporary file and moved into place.
#[derive(Debug)]
pub struct LocalRegistry {
    root: Utf8PathBuf,
}

impl LocalRegistry {
    /// Create a registry rooted at `root`. The directory is created on first write.
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory of this registry.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    fn invalid(&self, namespace: &str, name: &str, message: String) -> RegistryError {
        RegistryError::builder(self.name(), RegistryErrorKind::InvalidRequest, message)
            .namespace(namespace)
            .name(name)
            .build()
    }

    fn namespace_dir(&self, namespace: &str) -> Result<Utf8PathBuf, RegistryError> {
        if namespace.is_empty() {
            Ok(self.root.join(CLUSTER_DIR))
        } else if is_dns_label(namespace) {
            Ok(self.root.join(namespace))
        } else {
            Err(self.invalid(
                namespace,
                "",
                format!("{namespace:?} is not a storable namespace"),
            ))
        }
    }

    fn path(&self, namespace: &str, name: &str) -> Result<Utf8PathBuf, RegistryError> {
        if !is_dns_subdomain(name) {
            return Err(self.invalid(
                namespace,
                name,
                format!("{name:?} is not a storable image name"),
            ));
        }

        let mut path = self.namespace_dir(namespace)?;
        path.push(format!("{name}.json"));
        Ok(path)
    }

    async fn read(&self, path: &Utf8Path) -> Result<Image, RegistryError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|err| io_error(self.name(), err))?;

        serde_json::from_slice(&data)
            .wrap_err_with(|| format!("decode {path}"))
            .map_err(RegistryError::with(
                self.name(),
                RegistryErrorKind::Serialization,
            ))
    }

    async fn read_namespace(
        &self,
        dir: &Utf8Path,
        label: &Selector,
        field: &Selector,
        images: &mut Vec<Image>,
    ) -> Result<(), RegistryError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(err) => return Err(io_error(self.name(), err)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| io_error(self.name(), err))?
        {
            let Ok(path) = Utf8PathBuf::from_path_buf(entry.path()) else {
                continue;
            };
            if path.extension() != Some("json") {
                continue;
            }

            let image = self.read(&path).await?;
            if label.matches(&image.metadata.labels) && field.matches(&image) {
                images.push(image);
            }
        }

        Ok(())
    }
}

#[async_trait::async_trait]
impl Registry for LocalRegistry {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn list(
        &self,
        ctx: &Context,
        label: &Selector,
        field: &Selector,
    ) -> Result<ImageList, RegistryError> {
        let mut images = Vec::new();

        if let Some(namespace) = ctx.namespace() {
            let dir = self.namespace_dir(namespace)?;
            self.read_namespace(&dir, label, field, &mut images).await?;
        } else {
            let mut entries = match tokio::fs::read_dir(&self.root).await {
                Ok(entries) => entries,
                Err(err) if err.kind() == io::ErrorKind::NotFound => {
                    return Ok(ImageList::default());
                }
                Err(err) => return Err(io_error(self.name(), err)),
            };

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|err| io_error(self.name(), err))?
            {
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|err| io_error(self.name(), err))?;
                if !file_type.is_dir() {
                    continue;
                }
                let Ok(dir) = Utf8PathBuf::from_path_buf(entry.path()) else {
                    continue;
                };
                self.read_namespace(&dir, label, field, &mut images).await?;
            }
        }

        tracing::debug!(root = %self.root, "Found {} images", images.len());
        Ok(images.into())
    }

    async fn get(&self, ctx: &Context, name: &str) -> Result<Image, RegistryError> {
        let path = self.path(ctx.namespace_or_cluster(), name)?;
        self.read(&path).await.map_err(|err| {
            if err.is_not_found() {
                RegistryError::builder(
                    self.name(),
                    RegistryErrorKind::NotFound,
                    format!("image {name:?} not found"),
                )
                .namespace(ctx.namespace_or_cluster())
                .name(name)
                .build()
            } else {
                err
            }
        })
    }

    async fn create(&self, ctx: &Context, mut image: Image) -> Result<Image, RegistryError> {
        if image.metadata.namespace.is_empty() {
            image.metadata.namespace = ctx.namespace_or_cluster().to_owned();
        }
        let path = self.path(image.namespace(), image.name())?;

        let now = Utc::now();
        image.metadata.uid = Some(Uuid::new_v4().to_string());
        image.metadata.resource_version = Some(now.timestamp_micros().to_string());
        image.metadata.creation_timestamp = Some(now);

        let data = serde_json::to_vec_pretty(&image)
            .wrap_err("encode image")
            .map_err(RegistryError::with(
                self.name(),
                RegistryErrorKind::Serialization,
            ))?;

        let dir = self.namespace_dir(image.namespace())?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|err| io_error(self.name(), err))?;

        let target = path.clone();
        tokio::task::spawn_blocking(move || write_document(&dir, &target, &data))
            .in_current_span()
            .await
            .map_err(RegistryError::with(self.name(), RegistryErrorKind::Other))?
            .map_err(|err| {
                RegistryError::builder(self.name(), io_kind(&err), err)
                    .namespace(image.namespace())
                    .name(image.name())
                    .build()
            })?;

        tracing::trace!(%path, "Stored image");
        Ok(image)
    }

    async fn delete(&self, ctx: &Context, name: &str) -> Result<(), RegistryError> {
        let path = self.path(ctx.namespace_or_cluster(), name)?;
        tokio::fs::remove_file(&path).await.map_err(|err| {
            RegistryError::builder(self.name(), io_kind(&err), err)
                .namespace(ctx.namespace_or_cluster())
                .name(name)
                .build()
        })
    }
}

/// Write `data` to a temporary file in `dir`, then move it to `path` unless
/// something already lives there. A failed write leaves nothing behind.
#[tracing::instrument(skip(data))]
fn write_document(dir: &Utf8Path, path: &Utf8Path, data: &[u8]) -> io::Result<()> {
    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(data)?;
    file.as_file().sync_all()?;
    file.persist_noclobber(path).map_err(|err| err.error)?;
    Ok(())
}
