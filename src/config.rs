//! Directory configuration for locating workbooks on disk
//!
//! ```yaml
//! directories:
//!   InputBook: test/resources
//! ```

use crate::error::ResultMessage;
use crate::error::RustyTablesError;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::path::PathBuf;
use thiserror::Error;

/// Errors in workbook models, table descriptors and configuration files
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing value for {0}")]
    MissingValue(String),

    #[error("Invalid header date format '{0}'")]
    InvalidDateFormat(String),

    #[error("No workbook matches '{0}'")]
    WorkbookNotFound(String),

    #[error("Table '{0}' is declared more than once")]
    DuplicateTable(String),
}

/// Maps workbook model names to the directories searched for them.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub directories: BTreeMap<String, PathBuf>,
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, RustyTablesError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Reads a YAML configuration file.
    pub fn load(path: &Path) -> Result<Self, RustyTablesError> {
        let message = format!("Load config '{}'", path.display());
        let yaml = fs::read_to_string(path).map_err(RustyTablesError::from).with_prefix(&message)?;
        Config::from_yaml_str(&yaml).with_prefix(&message)
    }

    pub fn with_directory<P: Into<PathBuf>>(mut self, model: &str, directory: P) -> Self {
        self.directories.insert(model.to_owned(), directory.into());
        self
    }

    /// Directory configured for `model`, the current directory by default.
    pub fn directory_for(&self, model: &str) -> &Path {
        self.directories
            .get(model)
            .map(PathBuf::as_path)
            .unwrap_or_else(|| Path::new("."))
    }
}
