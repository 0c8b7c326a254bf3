use crate::records::record::Record;
use crate::records::record::Schema;
use crate::records::record_set::RecordSet;
use crate::records::value::Value;
use crate::records::RecordError;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Adds two value tuples position by position.
///
/// `Null` counts as zero, so `Null + Null` is `0`. Tuples of different
/// lengths, or any non-numeric value, are an error.
pub fn add_values(left: &[Value], right: &[Value]) -> Result<Vec<Value>, RecordError> {
    if left.len() != right.len() {
        Err(RecordError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        })?;
    }
    left.iter()
        .zip(right)
        .map(|(left, right)| {
            let augend = left.summand().ok_or_else(|| RecordError::NotSummable(left.to_string()))?;
            let addend = right.summand().ok_or_else(|| RecordError::NotSummable(right.to_string()))?;
            augend
                .checked_add(addend)
                .map(Value::Number)
                .ok_or_else(|| RecordError::NumericOverflow(format!("{} + {}", augend, addend)))
        })
        .collect()
}

impl RecordSet {
    /// Sums the grand-total fields per distinct combination of `key_fields`.
    ///
    /// The result is a new record set named `<name>_by_<keys>` with fields
    /// `key_fields` followed by the summed fields, one record per group,
    /// sorted ascending by key tuple.
    pub fn sum_by<S: AsRef<str>>(&self, key_fields: &[S]) -> Result<RecordSet, RecordError> {
        let keys: Vec<&str> = key_fields.iter().map(AsRef::as_ref).collect();
        let key_positions = self.schema().positions(&keys)?;
        let summed_fields: Vec<String> = self
            .grand_total()
            .fields()
            .iter()
            .filter(|field| !keys.contains(&field.as_str()))
            .cloned()
            .collect();
        let summed_positions = self.schema().positions(&summed_fields)?;

        let zeros = vec![Value::Number(Decimal::ZERO); summed_positions.len()];
        let mut groups: BTreeMap<Vec<Value>, Vec<Value>> = BTreeMap::new();
        for record in self {
            let total = groups
                .entry(record.pick(&key_positions))
                .or_insert_with(|| zeros.to_owned());
            *total = add_values(total, &record.pick(&summed_positions))?;
        }

        let name = format!("{}_by_{}", self.name(), keys.join("_"));
        debug!("{}: {} groups from {} records", name, groups.len(), self.len());
        let fields = keys.iter().map(|key| key.to_string()).chain(summed_fields).collect();
        let schema = Arc::new(Schema::new(&name, fields)?);
        // Groups keyed on falsy values are kept so the totals still add up.
        let records = groups
            .into_iter()
            .map(|(mut key, total)| {
                key.extend(total);
                Record::new(Arc::clone(&schema), key)
            })
            .collect::<Result<Vec<_>, _>>()?;
        RecordSet::from_records(schema, &keys, records)
    }
}
