//! Object storage for re-hosted product assets.
//!
//! The fetch stage downloads a product's primary image from its origin and
//! re-hosts the bytes through an [`ObjectStore`], so every downstream
//! consumer (embedding provider, warehouse rows) sees a URL we control.
//! [`FsObjectStore`] writes under a local directory and is the shipped
//! implementation; [`MemoryObjectStore`] backs tests.

use std::path::PathBuf;

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use skuforge_core::{Error, Result};

/// A store for opaque asset bytes, addressed by key on upload and by the
/// returned URL afterwards.
///
/// Implementations must be safe to share across worker tasks; the pipeline
/// holds one instance behind an `Arc` for the whole run.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Store `bytes` under `key` and return the public URL of the object.
    ///
    /// Uploading to an existing key overwrites the object.
    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String>;

    /// Fetch the bytes behind a URL previously returned by
    /// [`ObjectStore::upload`].
    async fn download(&self, url: &str) -> Result<Bytes>;
}

// ---------------------------------------------------------------------------
// Filesystem store
// ---------------------------------------------------------------------------

/// Filesystem-backed object store.
///
/// Objects live at `{root}/{key}`; the URL handed back is
/// `{public_base_url}/{key}`, so the base URL doubles as the namespace for
/// [`ObjectStore::download`] lookups.
pub struct FsObjectStore {
    root: PathBuf,
    public_base_url: String,
}

impl FsObjectStore {
    /// Create a store writing under `root`, publishing URLs with the given
    /// prefix. The root directory is created on first upload.
    pub fn new<P: Into<PathBuf>, S: Into<String>>(root: P, public_base_url: S) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Filesystem path for a key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn key_from_url<'a>(&self, url: &'a str) -> Result<&'a str> {
        url.strip_prefix(&self.public_base_url)
            .map(|rest| rest.trim_start_matches('/'))
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                Error::asset(format!(
                    "url '{url}' is not under base '{}'",
                    self.public_base_url
                ))
            })
    }
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    fn name(&self) -> &'static str {
        "fs"
    }

    async fn upload(&self, key: &str, bytes: Bytes, _content_type: &str) -> Result<String> {
        let path = self.path_for(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::asset(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|e| Error::asset(format!("failed to write {}: {e}", path.display())))?;

        tracing::debug!(key, size = bytes.len(), "stored asset");
        Ok(format!("{}/{key}", self.public_base_url))
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let key = self.key_from_url(url)?;
        let path = self.path_for(key);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| Error::asset(format!("failed to read {}: {e}", path.display())))?;
        Ok(Bytes::from(bytes))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// Map-backed store for tests and dry runs.
#[derive(Default)]
pub struct MemoryObjectStore {
    objects: DashMap<String, StoredObject>,
}

struct StoredObject {
    bytes: Bytes,
    content_type: String,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored objects.
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// True when an object is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.objects.contains_key(key)
    }

    /// Content type recorded for `key`, if stored.
    pub fn content_type_of(&self, key: &str) -> Option<String> {
        self.objects.get(key).map(|o| o.content_type.clone())
    }

    fn key_from_url(url: &str) -> Result<&str> {
        url.strip_prefix("memory://")
            .ok_or_else(|| Error::asset(format!("url '{url}' is not a memory:// url")))
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn upload(&self, key: &str, bytes: Bytes, content_type: &str) -> Result<String> {
        self.objects.insert(
            key.to_string(),
            StoredObject {
                bytes,
                content_type: content_type.to_string(),
            },
        );
        Ok(format!("memory://{key}"))
    }

    async fn download(&self, url: &str) -> Result<Bytes> {
        let key = Self::key_from_url(url)?;
        self.objects
            .get(key)
            .map(|o| o.bytes.clone())
            .ok_or_else(|| Error::asset(format!("no object stored under '{key}'")))
    }
}
