use crate::records::builder::RecordBuilder;
use crate::records::builder::RowRules;
use crate::records::record::Record;
use crate::records::record::Schema;
use crate::records::value::Value;
use crate::records::RecordError;
use crate::table::TableDescriptor;
use crate::table::TableExtent;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;
use std::sync::Weak;
use tracing::debug;

/// The validated records of one table, in spreadsheet order.
///
/// A record set is built in one pass and never changes afterwards. Its grand
/// total and key index are computed during construction.
#[derive(Debug)]
pub struct RecordSet {
    schema: Arc<Schema>,
    key_fields: Vec<String>,
    non_key_fields: Vec<String>,
    records: Vec<Record>,
    grand_total: Record,
    /// Key tuple to the position of the last record holding it
    by_key: HashMap<Vec<Value>, usize>,
    source: Option<Weak<TableDescriptor>>,
    extent: Option<TableExtent>,
}

impl RecordSet {
    /// Builds a record set named `name` from raw rows.
    ///
    /// # Arguments
    /// * `fields` - Field names, one per row value
    /// * `key_fields` - Fields that must be truthy for a row to be kept
    /// * `rows` - Raw value tuples in spreadsheet order
    /// * `rules` - Filters and normalized fields
    pub fn new<S, I>(name: &str, fields: Vec<String>, key_fields: &[S], rows: I, rules: &RowRules) -> Result<Self, RecordError>
    where
        S: AsRef<str>,
        I: IntoIterator<Item = Vec<Value>>,
    {
        let schema = Arc::new(Schema::new(name, fields)?);
        let builder = RecordBuilder::new(Arc::clone(&schema), key_fields, rules)?;
        let records = builder.build_all(rows).collect::<Result<Vec<_>, _>>()?;
        RecordSet::from_records(schema, key_fields, records)
    }

    /// Wraps records that already share `schema`, without dropping any of
    /// them; only the grand total and key index are computed.
    pub(crate) fn from_records<S: AsRef<str>>(
        schema: Arc<Schema>,
        key_fields: &[S],
        records: Vec<Record>,
    ) -> Result<Self, RecordError> {
        let key_positions = schema.positions(key_fields)?;
        let key_fields: Vec<String> = key_fields.iter().map(|field| field.as_ref().to_owned()).collect();
        let non_key_fields: Vec<String> = schema
            .fields()
            .iter()
            .filter(|field| !key_fields.contains(field))
            .cloned()
            .collect();

        let grand_total = grand_total(&schema, &non_key_fields, &records)?;
        let by_key = records
            .iter()
            .enumerate()
            .map(|(index, record)| (record.pick(&key_positions), index))
            .collect();

        debug!(
            "{}: {} records, grand total over {} fields",
            schema.name(),
            records.len(),
            grand_total.len()
        );
        Ok(RecordSet {
            schema,
            key_fields,
            non_key_fields,
            records,
            grand_total,
            by_key,
            source: None,
            extent: None,
        })
    }

    /// Attaches the descriptor and extent this set was loaded from.
    pub(crate) fn with_source(mut self, descriptor: &Arc<TableDescriptor>, extent: TableExtent) -> Self {
        self.source = Some(Arc::downgrade(descriptor));
        self.extent = Some(extent);
        self
    }

    pub fn name(&self) -> &str {
        self.schema.name()
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }

    pub fn key_fields(&self) -> &[String] {
        &self.key_fields
    }

    pub fn non_key_fields(&self) -> &[String] {
        &self.non_key_fields
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sum of every non-key field that held only numbers or nothing.
    pub fn grand_total(&self) -> &Record {
        &self.grand_total
    }

    /// The last record whose key fields equal `key`, in key field order.
    pub fn by_key(&self, key: &[Value]) -> Option<&Record> {
        self.by_key.get(key).map(|index| &self.records[*index])
    }

    /// Distinct key tuples of the set, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &[Value]> + '_ {
        self.by_key.keys().map(Vec::as_slice)
    }

    /// Groups records by the values of `fields`, keeping set order inside each group.
    pub fn make_index<S: AsRef<str>>(&self, fields: &[S]) -> Result<HashMap<Vec<Value>, Vec<&Record>>, RecordError> {
        let positions = self.schema.positions(fields)?;
        let mut index: HashMap<Vec<Value>, Vec<&Record>> = HashMap::new();
        for record in &self.records {
            index.entry(record.pick(&positions)).or_default().push(record);
        }
        Ok(index)
    }

    /// The descriptor this set was loaded from, while it is still alive.
    pub fn source(&self) -> Option<Arc<TableDescriptor>> {
        self.source.as_ref().and_then(Weak::upgrade)
    }

    /// Where the table was found in its worksheet.
    pub fn extent(&self) -> Option<&TableExtent> {
        self.extent.as_ref()
    }
}

/// Sums the non-key fields, dropping any field that ever holds a non-numeric value.
fn grand_total(schema: &Schema, non_key_fields: &[String], records: &[Record]) -> Result<Record, RecordError> {
    let positions = schema.positions(non_key_fields)?;
    let mut totals = vec![Some(Decimal::ZERO); positions.len()];
    for record in records {
        for ((total, position), field) in totals.iter_mut().zip(&positions).zip(non_key_fields) {
            if let Some(sum) = *total {
                *total = match record[*position].summand() {
                    Some(value) => Some(
                        sum.checked_add(value)
                            .ok_or_else(|| RecordError::NumericOverflow(field.to_owned()))?,
                    ),
                    None => None,
                };
            }
        }
    }

    let (fields, values): (Vec<String>, Vec<Value>) = non_key_fields
        .iter()
        .zip(totals)
        .filter_map(|(field, total)| total.map(|total| (field.to_owned(), Value::Number(total))))
        .unzip();
    let schema = Schema::new(&format!("{}_grand_total", schema.name()), fields)?;
    Record::new(Arc::new(schema), values)
}

impl Index<usize> for RecordSet {
    type Output = Record;

    fn index(&self, index: usize) -> &Self::Output {
        &self.records[index]
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}
