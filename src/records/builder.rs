use crate::normalize::normalize_value;
use crate::records::record::Record;
use crate::records::record::Schema;
use crate::records::value::Value;
use crate::records::RecordError;
use std::sync::Arc;
use tracing::trace;

/// Per-row validity and normalization rules of a table.
#[derive(Clone, Debug, Default)]
pub struct RowRules {
    /// Fields whose values are replaced by their normalized name
    pub normalize_fields: Vec<String>,
    /// `(field, sentinel)` pairs; a row whose field equals the sentinel is dropped
    pub filters: Vec<(String, Value)>,
}

/// Turns raw value tuples into records of one schema, dropping dummy rows.
#[derive(Debug)]
pub struct RecordBuilder {
    schema: Arc<Schema>,
    key_positions: Vec<usize>,
    normalize_positions: Vec<usize>,
    filters: Vec<(usize, Value)>,
}

impl RecordBuilder {
    /// Resolves every named field against the schema up front.
    pub fn new<S: AsRef<str>>(schema: Arc<Schema>, key_fields: &[S], rules: &RowRules) -> Result<Self, RecordError> {
        let key_positions = schema.positions(key_fields)?;
        let normalize_positions = schema.positions(&rules.normalize_fields)?;
        let filters = rules
            .filters
            .iter()
            .map(|(field, sentinel)| {
                schema
                    .position(field)
                    .map(|position| (position, sentinel.to_owned()))
                    .ok_or_else(|| RecordError::UnknownField(field.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(RecordBuilder {
            schema,
            key_positions,
            normalize_positions,
            filters,
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Builds one record, or `None` when the row is a dummy row
    /// (a falsy key value or a filter hit).
    pub fn build(&self, mut values: Vec<Value>) -> Result<Option<Record>, RecordError> {
        if values.len() != self.schema.len() {
            Err(RecordError::RowLengthMismatch {
                expected: self.schema.len(),
                actual: values.len(),
            })?;
        }
        if let Some(position) = self.key_positions.iter().find(|position| !values[**position].is_truthy()) {
            trace!("{}: drop row with empty key '{}'", self.schema.name(), self.schema.fields()[*position]);
            return Ok(None);
        }
        if let Some((position, sentinel)) = self.filters.iter().find(|(position, sentinel)| values[*position] == *sentinel) {
            trace!("{}: drop row with {}={}", self.schema.name(), self.schema.fields()[*position], sentinel);
            return Ok(None);
        }
        for position in &self.normalize_positions {
            values[*position] = normalize_value(&values[*position]);
        }
        Record::new(Arc::clone(&self.schema), values).map(Some)
    }

    /// Builds records from `rows` lazily, preserving row order.
    pub fn build_all<'a, I>(&'a self, rows: I) -> impl Iterator<Item = Result<Record, RecordError>> + 'a
    where
        I: IntoIterator<Item = Vec<Value>>,
        I::IntoIter: 'a,
    {
        rows.into_iter().filter_map(move |values| self.build(values).transpose())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(key_fields: &[&str], rules: RowRules) -> RecordBuilder {
        let fields = ["key_a", "key_b", "value_a", "value_b"].iter().map(|f| f.to_string()).collect();
        let schema = Arc::new(Schema::new("test_table", fields).unwrap());
        RecordBuilder::new(schema, key_fields, &rules).unwrap()
    }

    fn row(values: [Value; 4]) -> Vec<Value> {
        values.to_vec()
    }

    #[test]
    fn drops_rows_with_falsy_keys() {
        let builder = builder(&["key_a", "key_b"], RowRules::default());
        let rows = vec![
            row(["a".into(), "b".into(), 1.into(), "x".into()]),
            row([Value::Null, "b".into(), 2.into(), "x".into()]),
            row(["a".into(), "".into(), 3.into(), "x".into()]),
            row(["a".into(), 0.into(), 4.into(), "x".into()]),
            row(["c".into(), "d".into(), 5.into(), "x".into()]),
        ];
        let records: Vec<Record> = builder.build_all(rows).collect::<Result<_, _>>().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["value_a"], Value::from(1));
        assert_eq!(records[1]["value_a"], Value::from(5));
    }

    #[test]
    fn drops_rows_matching_filters() {
        let rules = RowRules {
            filters: vec![("key_b".to_owned(), "Total".into())],
            ..RowRules::default()
        };
        let builder = builder(&["key_a"], rules);
        let kept = builder.build(row(["a".into(), "b".into(), 1.into(), Value::Null])).unwrap();
        let dropped = builder.build(row(["a".into(), "Total".into(), 9.into(), Value::Null])).unwrap();
        assert!(kept.is_some());
        assert!(dropped.is_none());
    }

    #[test]
    fn normalizes_after_filtering() {
        let rules = RowRules {
            normalize_fields: vec!["value_b".to_owned()],
            filters: vec![("value_b".to_owned(), "So 1 (QP)".into())],
        };
        let builder = builder(&[], rules);
        let dropped = builder.build(row(["a".into(), "b".into(), 1.into(), "So 1 (QP)".into()])).unwrap();
        assert!(dropped.is_none());
        let record = builder.build(row(["a".into(), "b".into(), 1.into(), "So/1 QP".into()])).unwrap().unwrap();
        assert_eq!(record["value_b"], Value::from("so_per_1_qp"));
    }

    #[test]
    fn unknown_rule_fields_are_rejected() {
        let fields = vec!["key_a".to_owned()];
        let schema = Arc::new(Schema::new("t", fields).unwrap());
        let rules = RowRules {
            filters: vec![("key_z".to_owned(), "Total".into())],
            ..RowRules::default()
        };
        let error = RecordBuilder::new(schema, &["key_a"], &rules).unwrap_err();
        assert!(matches!(error, RecordError::UnknownField(field) if field == "key_z"));
    }

    #[test]
    fn row_length_is_checked() {
        let builder = builder(&[], RowRules::default());
        let error = builder.build(vec![Value::Null]).unwrap_err();
        assert!(matches!(error, RecordError::RowLengthMismatch { expected: 4, actual: 1 }));
    }
}
