//! Source format detection by file extension.

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{Result, VisualDataError};

/// Formats the loader knows how to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// Delimited text. `tab_separated` is set for `.tsv`.
    Delimited { tab_separated: bool },
    Spreadsheet,
    Json,
    Yaml,
    Parquet,
    Sql,
    Image,
    Text,
}

impl SourceFormat {
    /// Map a file extension (without the dot, any case) to a format.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" => Some(SourceFormat::Delimited { tab_separated: false }),
            "tsv" => Some(SourceFormat::Delimited { tab_separated: true }),
            "xls" | "xlsx" => Some(SourceFormat::Spreadsheet),
            "json" => Some(SourceFormat::Json),
            "yaml" | "yml" => Some(SourceFormat::Yaml),
            "parquet" | "pq" => Some(SourceFormat::Parquet),
            "sql" => Some(SourceFormat::Sql),
            "png" | "jpg" | "jpeg" => Some(SourceFormat::Image),
            "txt" => Some(SourceFormat::Text),
            _ => None,
        }
    }

    /// Detect the format of a path, failing with `UnsupportedFormat`.
    pub fn detect(path: &str) -> Result<Self> {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("");
        Self::from_extension(ext).ok_or_else(|| {
            VisualDataError::UnsupportedFormat(if ext.is_empty() {
                format!("'{}' has no file extension", path)
            } else {
                format!("'.{}' files are not supported", ext)
            })
        })
    }

    /// Remote sources are limited to text-like formats.
    pub fn is_remote_supported(&self) -> bool {
        matches!(
            self,
            SourceFormat::Delimited { .. }
                | SourceFormat::Spreadsheet
                | SourceFormat::Json
                | SourceFormat::Yaml
                | SourceFormat::Text
        )
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SourceFormat::Delimited { tab_separated: false } => "csv",
            SourceFormat::Delimited { tab_separated: true } => "tsv",
            SourceFormat::Spreadsheet => "spreadsheet",
            SourceFormat::Json => "json",
            SourceFormat::Yaml => "yaml",
            SourceFormat::Parquet => "parquet",
            SourceFormat::Sql => "sql",
            SourceFormat::Image => "image",
            SourceFormat::Text => "text",
        };
        f.write_str(name)
    }
}
