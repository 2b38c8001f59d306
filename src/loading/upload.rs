//! Ingestion of in-memory uploads (csv and spreadsheets only).

use std::path::Path;

use tracing::info;

use super::delimited::{decode_text, read_delimited, sniff_separator};
use super::spreadsheet::read_spreadsheet_bytes;
use crate::error::{Result, VisualDataError};
use crate::frame::Frame;

/// Parse uploaded bytes according to the file name's extension.
pub fn load_upload(file_name: &str, bytes: &[u8]) -> Result<Frame> {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let frame = match ext.as_str() {
        "csv" => {
            let text = decode_text(bytes);
            let separator = sniff_separator(&text);
            info!(file = %file_name, separator = %(separator as char).escape_default(), "Parsing uploaded csv");
            read_delimited(text.into_bytes(), separator)?
        }
        "xlsx" | "xls" => {
            info!(file = %file_name, "Parsing uploaded spreadsheet");
            read_spreadsheet_bytes(bytes.to_vec())?
        }
        _ => {
            return Err(VisualDataError::UnsupportedFormat(format!(
                "uploads must be .csv, .xlsx or .xls, got '{}'",
                file_name
            )))
        }
    };
    Ok(frame)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_csv_sniffed() {
        let frame = load_upload("points.CSV", b"a;b\n1;2\n3;4\n").unwrap();
        assert_eq!(frame.column_names(), vec!["a", "b"]);
        assert_eq!(frame.height(), 2);
    }

    #[test]
    fn test_upload_latin1() {
        let mut bytes = b"name,score\ncaf".to_vec();
        bytes.push(0xE9);
        bytes.extend_from_slice(b",3\n");
        let frame = load_upload("menu.csv", &bytes).unwrap();
        let name = frame.column("name").unwrap().str().unwrap().get(0).map(|s| s.to_string());
        assert_eq!(name.as_deref(), Some("café"));
    }

    #[test]
    fn test_upload_rejects_other_formats() {
        assert!(matches!(
            load_upload("data.json", b"[]"),
            Err(VisualDataError::UnsupportedFormat(_))
        ));
    }
}
