//! Spreadsheet (xls / xlsx) reading. The first worksheet is used and its
//! first row is the header.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Range, Reader};

use crate::error::{Result, VisualDataError};
use crate::frame::{CellValue, Frame, FrameBuilder};

fn cell(value: &Data) -> CellValue {
    match value {
        Data::Empty => CellValue::Null,
        Data::Int(i) => CellValue::Int(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::String(s) if s.is_empty() => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Error(_) => CellValue::Null,
        other => CellValue::Text(other.to_string()),
    }
}

fn range_to_frame(range: &Range<Data>) -> Result<Frame> {
    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header) => header.iter().map(|h| h.to_string()).collect(),
        None => return Ok(Frame::empty()),
    };
    let mut builder = FrameBuilder::new(&headers);
    for row in rows {
        builder.push_row(row.iter().map(cell).collect());
    }
    builder.build()
}

fn parse_error(e: impl std::fmt::Display) -> VisualDataError {
    VisualDataError::ParseError(format!("invalid spreadsheet: {}", e))
}

pub fn read_spreadsheet_file(path: &Path) -> Result<Frame> {
    let mut workbook = open_workbook_auto(path).map_err(parse_error)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| VisualDataError::ParseError("workbook has no worksheets".to_string()))?;
    let range = workbook.worksheet_range(&first).map_err(parse_error)?;
    range_to_frame(&range)
}

pub fn read_spreadsheet_bytes(bytes: Vec<u8>) -> Result<Frame> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes)).map_err(parse_error)?;
    let first = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| VisualDataError::ParseError("workbook has no worksheets".to_string()))?;
    let range = workbook.worksheet_range(&first).map_err(parse_error)?;
    range_to_frame(&range)
}
