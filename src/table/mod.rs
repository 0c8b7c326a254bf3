//! Marker-delimited tables inside worksheets

pub mod locator;
pub mod rows;

use crate::config::ConfigError;
use crate::error::ResultMessage;
use crate::error::RustyTablesError;
use crate::records::builder::RowRules;
use crate::records::record_set::RecordSet;
use crate::records::value::Value;
use crate::spreadsheet::sheet::Sheet;
use crate::table::locator::locate;
use crate::table::rows::RowStream;
use chrono::format::Item;
use chrono::format::StrftimeItems;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised when a worksheet does not match its table descriptor
#[derive(Error, Debug)]
pub enum TableError {
    #[error("Marker '{marker}' not found in sheet '{sheet}'")]
    MarkerNotFound { sheet: String, marker: String },

    #[error("Key field '{field}' missing from header ({fields})")]
    MissingKeyField { field: String, fields: String },

    #[error("Header cell at row {row}, column {col} has no usable name")]
    BlankHeaderName { row: usize, col: usize },
}

fn default_header_date_format() -> String {
    "%b-%y".to_owned()
}

/// Where and how to find one table in a workbook.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TableDescriptor {
    /// Table name, also the record type name
    pub name: String,
    pub worksheet: String,
    /// Text of the cell that marks the table, one row above its header
    pub marker: String,
    #[serde(default)]
    pub key_fields: Vec<String>,
    /// Fields whose values are normalized like header names
    #[serde(default)]
    pub normalize_fields: Vec<String>,
    /// Rows whose field equals the given value are dropped
    #[serde(default)]
    pub filters: BTreeMap<String, Value>,
    /// strftime format for date-valued header cells (`Jul-18` becomes `jul_18`)
    #[serde(default = "default_header_date_format")]
    pub header_date_format: String,
}

impl TableDescriptor {
    pub fn new(name: &str, worksheet: &str, marker: &str) -> Self {
        TableDescriptor {
            name: name.to_owned(),
            worksheet: worksheet.to_owned(),
            marker: marker.to_owned(),
            key_fields: Vec::new(),
            normalize_fields: Vec::new(),
            filters: BTreeMap::new(),
            header_date_format: default_header_date_format(),
        }
    }

    pub fn with_key_fields(mut self, key_fields: &[&str]) -> Self {
        self.key_fields = key_fields.iter().map(|field| field.to_string()).collect();
        self
    }

    pub fn with_normalize_fields(mut self, normalize_fields: &[&str]) -> Self {
        self.normalize_fields = normalize_fields.iter().map(|field| field.to_string()).collect();
        self
    }

    pub fn with_filter<V: Into<Value>>(mut self, field: &str, value: V) -> Self {
        self.filters.insert(field.to_owned(), value.into());
        self
    }

    pub fn with_header_date_format(mut self, format: &str) -> Self {
        self.header_date_format = format.to_owned();
        self
    }

    /// Checks that the descriptor can be used to locate a table.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (key, value) in [("name", &self.name), ("worksheet", &self.worksheet), ("marker", &self.marker)] {
            if value.trim().is_empty() {
                Err(ConfigError::MissingValue(format!("table {}", key)))?;
            }
        }
        if StrftimeItems::new(&self.header_date_format).any(|item| matches!(item, Item::Error)) {
            Err(ConfigError::InvalidDateFormat(self.header_date_format.to_owned()))?;
        }
        Ok(())
    }

    /// Row filters and normalized fields as builder rules.
    pub fn rules(&self) -> RowRules {
        RowRules {
            normalize_fields: self.normalize_fields.to_owned(),
            filters: self
                .filters
                .iter()
                .map(|(field, value)| (field.to_owned(), value.to_owned()))
                .collect(),
        }
    }
}

/// The located region of a table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TableExtent {
    /// Header row (0-based); records start on the row after it
    pub start_row: usize,
    /// First table column (0-based), the column of the marker cell
    pub start_col: usize,
    /// One past the last table column
    pub stop_col: usize,
    /// Normalized header names
    pub fields: Vec<String>,
}

/// Locates the described table in `sheet` and builds its record set.
pub fn load_table(sheet: &Sheet, descriptor: &Arc<TableDescriptor>) -> Result<RecordSet, RustyTablesError> {
    let message = format!("Load table '{}' from sheet '{}'", descriptor.name, sheet.name());
    descriptor.validate().map_err(RustyTablesError::from).with_prefix(&message)?;
    let mut rows = sheet.rows();
    let extent = locate(
        &mut rows,
        &descriptor.marker,
        &descriptor.header_date_format,
        &descriptor.key_fields,
    )
    .with_prefix(&message)?;
    let records = RecordSet::new(
        &descriptor.name,
        extent.fields.to_owned(),
        &descriptor.key_fields,
        RowStream::new(rows, &extent),
        &descriptor.rules(),
    )
    .map_err(RustyTablesError::from)
    .with_prefix(&message)?;
    Ok(records.with_source(descriptor, extent))
}
