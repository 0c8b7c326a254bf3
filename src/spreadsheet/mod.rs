//! Workbook readers that turn worksheets into in-memory grids of values

pub mod cell;
pub(crate) mod reference;
pub mod sheet;
pub(crate) mod xlsx;

use crate::error::RustyTablesError;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::xlsx::XlsxSpreadsheet;
use std::path::Path;
use thiserror::Error;

/// Errors raised while reading workbook files
#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported or invalid spreadsheet file '{0}'")]
    FileFormatError(String),

    #[error("Missing workbook part '{0}'")]
    FileError(String),

    #[error("Spreadsheet '{0}' has no sheets")]
    SpreadsheetEmptyError(String),

    #[error("Sheet '{1}' not found in '{0}'")]
    SheetNotFoundError(String, String),

    #[error("Invalid cell value in '{0}' sheet '{1}' at {2}: {3}")]
    CellValueError(String, String, String, String),

    #[error("Shared string index {0} out of range")]
    SharedStringError(usize),
}

/// A workbook whose worksheets can be read by name.
pub trait Spreadsheet {
    /// File name of the workbook
    fn name(&self) -> &str;

    /// Worksheet names in workbook order
    fn sheet_names(&self) -> Vec<String>;

    /// Reads every populated cell of a worksheet.
    fn read_sheet(&mut self, sheet_name: &str) -> Result<Sheet, RustyTablesError>;
}

/// Opens a workbook, choosing the reader from the file extension.
pub fn open_spreadsheet(path: &Path) -> Result<Box<dyn Spreadsheet>, RustyTablesError> {
    let extension = path
        .extension()
        .map(|extension| extension.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "xlsx" | "xlsm" | "xlam" => Ok(Box::new(XlsxSpreadsheet::open(path)?)),
        _ => Err(SpreadsheetError::FileFormatError(path.to_string_lossy().to_string()))?,
    }
}
