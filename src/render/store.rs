//! Artifact storage for rendered pages.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;
use uuid::Uuid;

use crate::error::{Result, VisualDataError};

/// Sub-directory of the storage root holding rendered pages.
pub const RENDERS_DIR: &str = "renders";

/// A stored artifact, readable as soon as it is returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    pub id: String,
    pub locator: String,
}

/// Storage backend trait
pub trait ArtifactStore: Send + Sync {
    /// Persist an HTML page under a fresh identifier.
    fn store(&self, html: &str) -> Result<Artifact>;
}

fn artifact_file_name(id: &str) -> String {
    format!("render_{}.html", id)
}

/// Local file system store.
///
/// Pages land in `<storage>/renders/` and are addressed through the
/// server's `/static` mount.
#[derive(Debug, Clone)]
pub struct FsArtifactStore {
    dir: PathBuf,
    base_url: String,
}

impl FsArtifactStore {
    pub fn new(storage_dir: impl AsRef<Path>, base_url: impl Into<String>) -> Self {
        Self {
            dir: storage_dir.as_ref().join(RENDERS_DIR),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File backing a stored artifact.
    pub fn artifact_path(&self, artifact: &Artifact) -> PathBuf {
        self.dir.join(artifact_file_name(&artifact.id))
    }
}

impl ArtifactStore for FsArtifactStore {
    fn store(&self, html: &str) -> Result<Artifact> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| VisualDataError::Storage(format!("Failed to create {}: {}", self.dir.display(), e)))?;

        let id = Uuid::new_v4().to_string();
        let file_name = artifact_file_name(&id);
        let path = self.dir.join(&file_name);

        // Write-once: an existing file is never overwritten.
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|e| VisualDataError::Storage(format!("Failed to create {}: {}", path.display(), e)))?;
        file.write_all(html.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| VisualDataError::Storage(format!("Failed to write {}: {}", path.display(), e)))?;

        debug!(path = %path.display(), bytes = html.len(), "Stored artifact");

        Ok(Artifact {
            locator: format!("{}/static/{}/{}", self.base_url, RENDERS_DIR, file_name),
            id,
        })
    }
}

/// In-memory store, mostly for tests.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    pages: Mutex<HashMap<String, String>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<String> {
        self.pages.lock().get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.pages.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.lock().is_empty()
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn store(&self, html: &str) -> Result<Artifact> {
        let id = Uuid::new_v4().to_string();
        self.pages.lock().insert(id.clone(), html.to_string());
        Ok(Artifact {
            locator: format!("memory://{}/{}", RENDERS_DIR, artifact_file_name(&id)),
            id,
        })
    }
}
