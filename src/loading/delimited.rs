//! Delimited text parsing and separator detection.

use std::io::Cursor;

use polars::prelude::*;

use crate::error::{Result, VisualDataError};
use crate::frame::Frame;

/// Separators tried on the first line of a local file, highest priority first.
pub const LINE_PRIORITY: [u8; 4] = [b';', b'|', b'\t', b','];

/// Candidates for sniffing uploaded content, in tie-break order.
pub const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

const SNIFF_SAMPLE_CHARS: usize = 1000;

fn count_byte(line: &str, sep: u8) -> usize {
    line.bytes().filter(|b| *b == sep).count()
}

fn first_line(text: &str) -> &str {
    text.lines().next().unwrap_or("")
}

/// Separator of a local file, read from its first line.
///
/// The first candidate present in [`LINE_PRIORITY`] order wins. A line with
/// none of them is a single-column file and parses the same with `,`.
pub fn detect_separator(text: &str) -> u8 {
    let line = first_line(text);
    LINE_PRIORITY
        .iter()
        .copied()
        .find(|sep| count_byte(line, *sep) > 0)
        .unwrap_or(b',')
}

/// Separator of uploaded content, sniffed over the first 1000 characters.
///
/// A candidate that occurs the same non-zero number of times on every
/// complete sampled line wins. Otherwise the most frequent candidate on the
/// first line is used, and `,` when there is none.
pub fn sniff_separator(text: &str) -> u8 {
    let (sample, truncated) = match text.char_indices().nth(SNIFF_SAMPLE_CHARS) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    };
    let mut lines: Vec<&str> = sample.lines().filter(|l| !l.trim().is_empty()).collect();
    if truncated && lines.len() > 1 {
        lines.pop();
    }

    if !lines.is_empty() {
        for sep in SNIFF_CANDIDATES {
            let first = count_byte(lines[0], sep);
            if first > 0 && lines.iter().all(|l| count_byte(l, sep) == first) {
                return sep;
            }
        }
    }

    let line = first_line(sample);
    SNIFF_CANDIDATES
        .iter()
        .copied()
        .map(|sep| (sep, count_byte(line, sep)))
        .filter(|(_, n)| *n > 0)
        .fold(None::<(u8, usize)>, |best, (sep, n)| match best {
            Some((_, bn)) if bn >= n => best,
            _ => Some((sep, n)),
        })
        .map(|(sep, _)| sep)
        .unwrap_or(b',')
}

/// Parse delimited bytes with a header row.
pub fn read_delimited(bytes: Vec<u8>, separator: u8) -> Result<Frame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(1000))
        .with_parse_options(CsvParseOptions::default().with_separator(separator))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()
        .map_err(|e| {
            VisualDataError::ParseError(format!(
                "could not parse delimited text with separator {:?} (candidates ; | tab ,): {}",
                separator as char, e
            ))
        })?;
    Ok(Frame::new(df))
}

/// Decode text as UTF-8, falling back to Latin-1.
pub fn decode_text(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}
