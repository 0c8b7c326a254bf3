//! # Rusty Tables
//!
//! Finds ad-hoc tables inside human-maintained spreadsheets and turns them into
//! typed, immutable record sets.
//!
//! A table is announced by a marker cell. The row below the marker is the
//! header, and the rows below the header are records until the first fully
//! blank row.
//!
//! ## Features
//!
//! - **Table location**: marker scan, header span detection and header name normalization
//! - **Record sets**: key validation, sentinel row filters, value normalization
//! - **Aggregation**: exact decimal grand totals, key indexes and sorted `sum_by`
//! - **Workbook models**: YAML table descriptors and glob-based workbook lookup
//! - **Pure Rust reader**: Office Open XML workbooks (`.xlsx`, `.xlsm`, `.xlam`)
//!
//! ## Example
//!
//! ```no_run
//! use rusty_tables::{Config, WorkbookModel};
//!
//! let config = Config::load("config.yaml".as_ref())?;
//! let model = WorkbookModel::from_yaml_str(&std::fs::read_to_string("input_book.yaml")?)?;
//! let workbook = model.load(&config)?;
//! if let Some(table) = workbook.table("test_table") {
//!     for record in table.sum_by(&["key_a"])?.iter() {
//!         println!("{}", record);
//!     }
//! }
//! # Ok::<(), rusty_tables::RustyTablesError>(())
//! ```

pub mod config;
pub mod error;
mod helpers;
pub mod normalize;
pub mod records;
pub mod spreadsheet;
pub mod table;
pub mod workbook;

pub use crate::config::Config;
pub use crate::config::ConfigError;
pub use crate::error::RustyTablesError;
pub use crate::helpers::xml::XmlError;
pub use crate::normalize::camel_to_snake;
pub use crate::normalize::normalize_name;
pub use crate::normalize::normalize_value;
pub use crate::records::aggregate::add_values;
pub use crate::records::builder::RecordBuilder;
pub use crate::records::builder::RowRules;
pub use crate::records::find_duplicates;
pub use crate::records::record::Record;
pub use crate::records::record::Schema;
pub use crate::records::record_set::RecordSet;
pub use crate::records::value::Value;
pub use crate::records::RecordError;
pub use crate::spreadsheet::open_spreadsheet;
pub use crate::spreadsheet::sheet::Sheet;
pub use crate::spreadsheet::Spreadsheet;
pub use crate::spreadsheet::SpreadsheetError;
pub use crate::table::load_table;
pub use crate::table::TableDescriptor;
pub use crate::table::TableError;
pub use crate::table::TableExtent;
pub use crate::workbook::LoadedWorkbook;
pub use crate::workbook::WorkbookModel;
