use crate::config::ConfigError;
use crate::error::RustyTablesError;
use crate::normalize::normalize_name;
use crate::records::find_duplicates;
use crate::records::value::Value;
use crate::records::RecordError;
use crate::spreadsheet::sheet::Rows;
use crate::table::TableError;
use crate::table::TableExtent;
use std::fmt::Write;
use tracing::debug;

/// Header cells that end the header before a blank one does
const SEPARATORS: [&str; 2] = ["sep", "separator"];

/// Finds a marker-delimited table and reads its header.
///
/// Consumes `rows` up to and including the header row, so the cursor is left
/// on the first record row.
///
/// # Arguments
/// * `rows` - Row cursor positioned before the marker row
/// * `marker` - Text of the first truthy cell of the marker row
/// * `date_format` - strftime format for date-valued header cells
/// * `key_fields` - Fields the header must contain
pub fn locate<S: AsRef<str>>(
    rows: &mut Rows<'_>,
    marker: &str,
    date_format: &str,
    key_fields: &[S],
) -> Result<TableExtent, RustyTablesError> {
    let sheet = rows.sheet();
    let (marker_row, start_col) = rows
        .find_map(|row| match row.first_truthy() {
            Some((col, Value::Text(text))) if text == marker => Some((row.index(), col)),
            _ => None,
        })
        .ok_or_else(|| TableError::MarkerNotFound {
            sheet: sheet.name().to_owned(),
            marker: marker.to_owned(),
        })?;

    let mut fields = Vec::new();
    if let Some(header) = rows.next() {
        for col in start_col..sheet.col_count() {
            let cell = header.value(col);
            if is_separator(cell) {
                break;
            }
            let name = normalize_name(&header_text(cell, date_format)?).ok_or(TableError::BlankHeaderName {
                row: header.index(),
                col,
            })?;
            fields.push(name);
        }
    }

    if let Some(duplicate) = find_duplicates(fields.iter()).into_iter().next() {
        Err(RecordError::DuplicateField(duplicate.to_owned()))?;
    }
    for key_field in key_fields {
        if !fields.iter().any(|field| field == key_field.as_ref()) {
            Err(TableError::MissingKeyField {
                field: key_field.as_ref().to_owned(),
                fields: fields.join(", "),
            })?;
        }
    }

    let extent = TableExtent {
        start_row: marker_row + 1,
        start_col,
        stop_col: start_col + fields.len(),
        fields,
    };
    debug!(
        "{}: found '{}' at row {}, columns {}..{}",
        sheet.name(),
        marker,
        extent.start_row,
        extent.start_col,
        extent.stop_col
    );
    Ok(extent)
}

fn is_separator(value: &Value) -> bool {
    match value {
        Value::Text(text) => text.trim().is_empty() || SEPARATORS.contains(&text.as_str()),
        _ => value.is_null(),
    }
}

/// Renders a header cell as text; dates use `date_format`.
fn header_text(value: &Value, date_format: &str) -> Result<String, ConfigError> {
    match value {
        Value::Date(date) => {
            let mut text = String::new();
            write!(text, "{}", date.format(date_format))
                .map_err(|_| ConfigError::InvalidDateFormat(date_format.to_owned()))?;
            Ok(text)
        }
        _ => Ok(value.to_string()),
    }
}
