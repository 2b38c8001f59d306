//! Source loading.
//!
//! [`DataLoader`] resolves a source string (local path or http/https URL) to
//! a [`LoadedData`] value. Local paths are confined to the loader's project
//! root before anything else happens; the format is then chosen purely from
//! the extension.

pub mod delimited;
pub mod flatten;
pub mod format;
pub mod raster;
pub mod remote;
pub mod spreadsheet;
pub mod sql;
pub mod upload;

pub use format::SourceFormat;
pub use raster::PixelMatrix;
pub use upload::load_upload;

use std::fs::File;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use polars::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, VisualDataError};
use crate::frame::Frame;

/// What a source turned out to contain.
#[derive(Debug, Clone)]
pub enum LoadedData {
    Table(Frame),
    Pixels(PixelMatrix),
    Text(String),
}

impl LoadedData {
    pub fn kind(&self) -> &'static str {
        match self {
            LoadedData::Table(_) => "table",
            LoadedData::Pixels(_) => "image",
            LoadedData::Text(_) => "text",
        }
    }

    pub fn into_frame(self) -> Result<Frame> {
        match self {
            LoadedData::Table(frame) => Ok(frame),
            other => Err(VisualDataError::InvalidInput(format!(
                "source produced {} data, a table is required",
                other.kind()
            ))),
        }
    }
}

/// Per-call options for formats that need more than a path.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Query to run for `.sql` sources.
    pub sql_query: Option<String>,
    /// Database file for `.sql` sources, contained like any local path.
    pub db_path: Option<String>,
    /// Load images as an `x, y, R, G, B` frame instead of a pixel matrix.
    pub image_as_frame: bool,
}

impl LoadOptions {
    pub fn with_sql(mut self, db_path: impl Into<String>, query: impl Into<String>) -> Self {
        self.db_path = Some(db_path.into());
        self.sql_query = Some(query.into());
        self
    }

    pub fn with_image_as_frame(mut self, as_frame: bool) -> Self {
        self.image_as_frame = as_frame;
        self
    }
}

/// Fold `.` and `..` without touching the filesystem.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn read_error(path: &Path, e: std::io::Error) -> VisualDataError {
    match e.kind() {
        std::io::ErrorKind::NotFound => VisualDataError::NotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            VisualDataError::AccessDenied(format!("cannot read {}", path.display()))
        }
        _ => VisualDataError::NotFound(format!("{}: {}", path.display(), e)),
    }
}

/// Loader for local and remote sources, confined to a project root.
#[derive(Debug, Clone)]
pub struct DataLoader {
    root: PathBuf,
    canonical_root: PathBuf,
    timeout: Duration,
    allow_private_hosts: bool,
}

impl DataLoader {
    /// Create a loader whose local sources must live under `root`.
    pub fn new(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let absolute = if root.is_absolute() {
            root.to_path_buf()
        } else {
            std::env::current_dir()
                .map(|cwd| cwd.join(root))
                .unwrap_or_else(|_| root.to_path_buf())
        };
        let root = normalize_lexically(&absolute);
        let canonical_root = std::fs::canonicalize(&root).unwrap_or_else(|_| root.clone());
        Self {
            root,
            canonical_root,
            timeout: Duration::from_secs(30),
            allow_private_hosts: false,
        }
    }

    /// Set the timeout for remote fetches
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Allow remote sources on loopback and private networks
    pub fn with_private_hosts(mut self, allow: bool) -> Self {
        self.allow_private_hosts = allow;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a local path and check that it stays under the root.
    ///
    /// The check is lexical so it also holds for files that do not exist.
    /// Existing paths are canonicalized as well, so a symlink cannot lead
    /// outside the root.
    pub fn resolve_local(&self, source: &str) -> Result<PathBuf> {
        let normalized = source.trim().replace('\\', "/");
        let path = Path::new(&normalized);
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        let resolved = normalize_lexically(&joined);
        if !resolved.starts_with(&self.root) {
            return Err(VisualDataError::AccessDenied(format!(
                "'{}' is outside the project root",
                source
            )));
        }
        if resolved.exists() {
            let canonical = std::fs::canonicalize(&resolved).map_err(|e| read_error(&resolved, e))?;
            if !canonical.starts_with(&self.canonical_root) {
                return Err(VisualDataError::AccessDenied(format!(
                    "'{}' links outside the project root",
                    source
                )));
            }
        }
        Ok(resolved)
    }

    /// Load a source with default options.
    pub fn load(&self, source: &str) -> Result<LoadedData> {
        self.load_with(source, &LoadOptions::default())
    }

    /// Load a source that must be tabular.
    pub fn load_frame(&self, source: &str) -> Result<Frame> {
        self.load(source)?.into_frame()
    }

    pub fn load_with(&self, source: &str, options: &LoadOptions) -> Result<LoadedData> {
        let start = Instant::now();
        let data = if remote::is_remote(source) {
            self.load_remote(source)?
        } else {
            self.load_local(source, options)?
        };
        if let LoadedData::Table(frame) = &data {
            info!(
                source = %source,
                rows = frame.height(),
                columns = frame.width(),
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Loaded table"
            );
        } else {
            info!(source = %source, kind = data.kind(), "Loaded source");
        }
        Ok(data)
    }

    fn load_local(&self, source: &str, options: &LoadOptions) -> Result<LoadedData> {
        let path = self.resolve_local(source)?;
        let format = SourceFormat::detect(&path.to_string_lossy())?;
        info!(path = %path.display(), format = %format, "Reading local source");

        match format {
            SourceFormat::Delimited { tab_separated } => {
                let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
                let separator = if tab_separated {
                    b'\t'
                } else {
                    delimited::detect_separator(&String::from_utf8_lossy(&bytes))
                };
                Ok(LoadedData::Table(delimited::read_delimited(bytes, separator)?))
            }
            SourceFormat::Spreadsheet => {
                if !path.is_file() {
                    return Err(VisualDataError::NotFound(path.display().to_string()));
                }
                Ok(LoadedData::Table(spreadsheet::read_spreadsheet_file(&path)?))
            }
            SourceFormat::Json => {
                let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
                Ok(LoadedData::Table(flatten::parse_json(&bytes)?))
            }
            SourceFormat::Yaml => {
                let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
                Ok(LoadedData::Table(flatten::parse_yaml(&bytes)?))
            }
            SourceFormat::Parquet => {
                let file = File::open(&path).map_err(|e| read_error(&path, e))?;
                let df = ParquetReader::new(file)
                    .finish()
                    .map_err(|e| VisualDataError::ParseError(format!("invalid parquet: {}", e)))?;
                Ok(LoadedData::Table(Frame::new(df)))
            }
            SourceFormat::Sql => {
                let (db_path, query) = match (&options.db_path, &options.sql_query) {
                    (Some(db), Some(q)) if !db.trim().is_empty() && !q.trim().is_empty() => (db, q),
                    _ => {
                        return Err(VisualDataError::UnsupportedFormat(
                            "sql sources need both a database path and a query".to_string(),
                        ))
                    }
                };
                let db = self.resolve_local(db_path)?;
                Ok(LoadedData::Table(sql::read_query(&db, query)?))
            }
            SourceFormat::Image => {
                let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
                let pixels = raster::decode_image(&bytes)?;
                if options.image_as_frame {
                    Ok(LoadedData::Table(pixels.to_frame()?))
                } else {
                    Ok(LoadedData::Pixels(pixels))
                }
            }
            SourceFormat::Text => {
                let bytes = std::fs::read(&path).map_err(|e| read_error(&path, e))?;
                let text = String::from_utf8(bytes)
                    .map_err(|e| VisualDataError::ParseError(format!("text is not UTF-8: {}", e)))?;
                Ok(LoadedData::Text(text))
            }
        }
    }

    fn load_remote(&self, source: &str) -> Result<LoadedData> {
        let url = remote::validate_url(source, self.allow_private_hosts)?;
        let format = SourceFormat::detect(url.path())?;
        if !format.is_remote_supported() {
            return Err(VisualDataError::UnsupportedFormat(format!(
                "{} sources cannot be loaded from a URL",
                format
            )));
        }
        info!(url = %url, format = %format, "Fetching remote source");
        let bytes = remote::fetch(&url, self.timeout)?;

        match format {
            SourceFormat::Delimited { tab_separated } => {
                let separator = if tab_separated { b'\t' } else { b',' };
                Ok(LoadedData::Table(delimited::read_delimited(bytes, separator)?))
            }
            SourceFormat::Spreadsheet => Ok(LoadedData::Table(spreadsheet::read_spreadsheet_bytes(bytes)?)),
            SourceFormat::Json => Ok(LoadedData::Table(flatten::parse_json(&bytes)?)),
            SourceFormat::Yaml => Ok(LoadedData::Table(flatten::parse_yaml(&bytes)?)),
            SourceFormat::Text => Ok(LoadedData::Text(delimited::decode_text(&bytes))),
            other => Err(VisualDataError::UnsupportedFormat(format!(
                "{} sources cannot be loaded from a URL",
                other
            ))),
        }
    }
}
