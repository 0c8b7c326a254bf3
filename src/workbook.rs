//! Workbook models: a file name pattern plus the tables to load from the file

use crate::config::Config;
use crate::config::ConfigError;
use crate::error::ResultMessage;
use crate::error::RustyTablesError;
use crate::records::find_duplicates;
use crate::records::record_set::RecordSet;
use crate::spreadsheet::open_spreadsheet;
use crate::spreadsheet::sheet::Sheet;
use crate::spreadsheet::Spreadsheet;
use crate::table::load_table;
use crate::table::TableDescriptor;
use glob::glob;
use serde::Deserialize;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;
use tracing::info;
use tracing::warn;

/// Describes a family of workbooks and the tables each one holds.
///
/// ```yaml
/// name: InputBook
/// name_pattern: book_?.xlsx
/// tables:
///   - name: test_table
///     worksheet: sheet_a
///     marker: test_table_marker
///     key_fields: [key_a]
///     filters:
///       key_b: Total
/// ```
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct WorkbookModel {
    /// Model name, the key of its directory in [`Config`]
    pub name: String,
    /// Glob pattern of the workbook file name
    pub name_pattern: String,
    #[serde(default)]
    pub tables: Vec<Arc<TableDescriptor>>,
}

impl WorkbookModel {
    pub fn new(name: &str, name_pattern: &str) -> Self {
        WorkbookModel {
            name: name.to_owned(),
            name_pattern: name_pattern.to_owned(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: TableDescriptor) -> Self {
        self.tables.push(Arc::new(table));
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RustyTablesError> {
        let model: WorkbookModel = serde_yaml::from_str(yaml)?;
        model.validate()?;
        Ok(model)
    }

    /// Checks the model and every table descriptor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            Err(ConfigError::MissingValue("workbook name".to_owned()))?;
        }
        if self.name_pattern.trim().is_empty() {
            Err(ConfigError::MissingValue(format!("name_pattern of workbook '{}'", self.name)))?;
        }
        if let Some(name) = find_duplicates(self.tables.iter().map(|table| table.name.as_str())).first() {
            Err(ConfigError::DuplicateTable(name.to_string()))?;
        }
        self.tables.iter().try_for_each(|table| table.validate())
    }

    /// Finds the workbook file in the configured directory.
    ///
    /// When several files match, the lexically highest is taken as the most recent.
    pub fn resolve_path(&self, config: &Config) -> Result<PathBuf, RustyTablesError> {
        let pattern = config.directory_for(&self.name).join(&self.name_pattern);
        let pattern = pattern.to_string_lossy();
        let mut paths = Vec::new();
        for entry in glob(&pattern)? {
            match entry {
                Ok(path) => paths.push(path),
                Err(error) => warn!("{}: skip unreadable path: {}", self.name, error),
            }
        }
        paths.sort();
        let path = paths
            .pop()
            .ok_or_else(|| ConfigError::WorkbookNotFound(pattern.to_string()))?;
        debug!("{}: resolved '{}' to {}", self.name, pattern, path.display());
        Ok(path)
    }

    /// Resolves, opens and loads every declared table.
    pub fn load(&self, config: &Config) -> Result<LoadedWorkbook, RustyTablesError> {
        self.validate()?;
        let path = self.resolve_path(config)?;
        let message = format!("Load workbook '{}'", path.display());
        let mut spreadsheet = open_spreadsheet(&path).with_prefix(&message)?;
        let tables = self.load_from(spreadsheet.as_mut()).with_prefix(&message)?;
        info!("{}: loaded {} tables from {}", self.name, tables.len(), path.display());
        Ok(LoadedWorkbook {
            path,
            model: self.to_owned(),
            tables,
        })
    }

    /// Loads every declared table from an open spreadsheet, reading each
    /// worksheet once.
    pub fn load_from(&self, spreadsheet: &mut dyn Spreadsheet) -> Result<BTreeMap<String, RecordSet>, RustyTablesError> {
        let mut sheets = BTreeMap::<String, Sheet>::new();
        let mut tables = BTreeMap::new();
        for descriptor in &self.tables {
            let sheet = match sheets.entry(descriptor.worksheet.to_owned()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(spreadsheet.read_sheet(&descriptor.worksheet)?),
            };
            let table = load_table(sheet, descriptor)?;
            debug!("{}: table '{}' has {} records", self.name, descriptor.name, table.len());
            tables.insert(descriptor.name.to_owned(), table);
        }
        Ok(tables)
    }
}

/// The record sets of one workbook file.
#[derive(Debug)]
pub struct LoadedWorkbook {
    path: PathBuf,
    /// Keeps the descriptors referenced by the record sets alive
    model: WorkbookModel,
    tables: BTreeMap<String, RecordSet>,
}

impl LoadedWorkbook {
    /// Path of the workbook file the tables were read from
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn model(&self) -> &WorkbookModel {
        &self.model
    }

    pub fn table(&self, name: &str) -> Option<&RecordSet> {
        self.tables.get(name)
    }

    /// Tables by name, in name order.
    pub fn tables(&self) -> &BTreeMap<String, RecordSet> {
        &self.tables
    }
}
