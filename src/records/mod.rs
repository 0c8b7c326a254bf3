//! Typed records and record sets built from table rows

pub mod aggregate;
pub mod builder;
pub mod record;
pub mod record_set;
pub mod value;

use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while building or combining records
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Duplicate field '{0}'")]
    DuplicateField(String),

    #[error("Unknown field '{0}'")]
    UnknownField(String),

    #[error("Row has {actual} values but {expected} fields")]
    RowLengthMismatch { expected: usize, actual: usize },

    #[error("Cannot add {left} values to {right} values")]
    LengthMismatch { left: usize, right: usize },

    #[error("Value '{0}' is not summable")]
    NotSummable(String),

    #[error("Numeric overflow in {0}")]
    NumericOverflow(String),
}

/// Returns, sorted, every key that occurs more than once.
pub fn find_duplicates<T, I>(keys: I) -> Vec<T>
where
    T: Ord,
    I: IntoIterator<Item = T>,
{
    let mut counts = BTreeMap::new();
    for key in keys {
        *counts.entry(key).or_insert(0usize) += 1;
    }
    counts
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .map(|(key, _)| key)
        .collect()
}
