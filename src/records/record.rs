use crate::records::value::Value;
use crate::records::RecordError;
use std::collections::HashMap;
use std::fmt::Display;
use std::hash::Hash;
use std::hash::Hasher;
use std::ops::Index;
use std::sync::Arc;

/// Ordered field names shared by every record of one shape.
#[derive(Debug)]
pub struct Schema {
    /// Record type name (table name, `<table>_grand_total`, ...)
    name: String,
    fields: Vec<String>,
    /// Field name to position
    positions: HashMap<String, usize>,
}

impl Schema {
    /// Creates a schema, failing on duplicate field names.
    pub fn new(name: &str, fields: Vec<String>) -> Result<Self, RecordError> {
        let mut positions = HashMap::with_capacity(fields.len());
        for (position, field) in fields.iter().enumerate() {
            if positions.insert(field.to_owned(), position).is_some() {
                Err(RecordError::DuplicateField(field.to_owned()))?;
            }
        }
        Ok(Schema {
            name: name.to_owned(),
            fields,
            positions,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    /// Positions of `fields` in order, failing on the first unknown name.
    pub fn positions<S: AsRef<str>>(&self, fields: &[S]) -> Result<Vec<usize>, RecordError> {
        fields
            .iter()
            .map(|field| {
                self.position(field.as_ref())
                    .ok_or_else(|| RecordError::UnknownField(field.as_ref().to_owned()))
            })
            .collect()
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.fields == other.fields
    }
}

impl Eq for Schema {}

impl Hash for Schema {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.fields.hash(state);
    }
}

/// An immutable row of named values.
///
/// Values are reachable by position or by field name, and iterate in field
/// order. Two records with the same field names and values are equal,
/// whatever table they came from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Record {
    schema: Arc<Schema>,
    values: Box<[Value]>,
}

impl Record {
    /// Creates a record; `values` must match the schema length.
    pub fn new(schema: Arc<Schema>, values: Vec<Value>) -> Result<Self, RecordError> {
        if values.len() != schema.len() {
            Err(RecordError::RowLengthMismatch {
                expected: schema.len(),
                actual: values.len(),
            })?;
        }
        Ok(Record {
            schema,
            values: values.into_boxed_slice(),
        })
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn fields(&self) -> &[String] {
        self.schema.fields()
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of the named field, `None` for unknown names.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.schema.position(field).map(|position| &self.values[position])
    }

    /// `(field, value)` pairs in field order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.schema
            .fields()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    /// Values of the named fields, in the order given.
    pub fn project<S: AsRef<str>>(&self, fields: &[S]) -> Result<Vec<Value>, RecordError> {
        Ok(self.pick(&self.schema.positions(fields)?))
    }

    /// Values at precomputed positions.
    pub(crate) fn pick(&self, positions: &[usize]) -> Vec<Value> {
        positions
            .iter()
            .map(|position| self.values[*position].to_owned())
            .collect()
    }
}

impl Index<usize> for Record {
    type Output = Value;

    fn index(&self, position: usize) -> &Self::Output {
        &self.values[position]
    }
}

impl Index<&str> for Record {
    type Output = Value;

    /// Panics when the field does not exist, like indexing a map.
    fn index(&self, field: &str) -> &Self::Output {
        match self.get(field) {
            Some(value) => value,
            None => panic!("no field '{}' in {}", field, self.schema.name()),
        }
    }
}

impl Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.schema.name())?;
        for (index, (field, value)) in self.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            match value {
                Value::Null => write!(f, "{}=None", field)?,
                Value::Text(text) => write!(f, "{}={:?}", field, text)?,
                _ => write!(f, "{}={}", field, value)?,
            }
        }
        write!(f, ")")
    }
}
