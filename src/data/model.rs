use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;

// ---------------------------------------------------------------------------
// Value – a single cell of a loaded table
// ---------------------------------------------------------------------------

/// A typed scalar cell.  Text columns stay verbatim, numeric columns are
/// parsed once at load time.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Integer(i64),
    Real(f64),
}

// -- Manual Eq/Ord so Value can key a BTreeMap / live in a BTreeSet --

// Equality follows `Ord` (and so `Hash`): reals are compared bitwise-total.
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use Value::*;
        fn discriminant(v: &Value) -> u8 {
            match v {
                Integer(_) => 0,
                Real(_) => 1,
                Text(_) => 2,
            }
        }
        match (self, other) {
            (Integer(a), Integer(b)) => a.cmp(b),
            (Real(a), Real(b)) => a.total_cmp(b),
            (Text(a), Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Value {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Value::Text(s) => s.hash(state),
            Value::Integer(i) => i.hash(state),
            Value::Real(f) => f.to_bits().hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Real(v) => write!(f, "{v}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl Value {
    /// Interpret the value as an `f64` (numeric columns only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Real(v) => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Text(_) => None,
        }
    }

    /// Borrow the text of a `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Render any value as text, borrowing when it already is text.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            Value::Text(s) => Cow::Borrowed(s),
            other => Cow::Owned(other.to_string()),
        }
    }

    /// Numeric ordering used by `top_n`.  Integers compare exactly, anything
    /// involving a real goes through `f64::total_cmp`.
    pub fn numeric_cmp(&self, other: &Value) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => Some(a.cmp(b)),
            _ => Some(self.as_f64()?.total_cmp(&other.as_f64()?)),
        }
    }
}

// ---------------------------------------------------------------------------
// Schema – column names with declared types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Text,
    Integer,
    Real,
}

impl ColumnType {
    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Real)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnType::Text => write!(f, "text"),
            ColumnType::Integer => write!(f, "integer"),
            ColumnType::Real => write!(f, "real"),
        }
    }
}

/// What to do with header columns a schema does not declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExtraColumns {
    /// Any undeclared column is a schema mismatch.
    #[default]
    Reject,
    /// Undeclared columns are kept as `Text`.
    AsText,
}

/// Ordered column declarations.
///
/// A schema attached to a [`Dataset`] is always *resolved*: it lists exactly
/// the file's columns in file order.  Schemas written by hand (see
/// [`crate::catalog`]) are declarations that [`crate::data::coerce`] resolves
/// against a header.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    columns: Vec<(String, ColumnType)>,
    extra: ExtraColumns,
}

impl Schema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = (S, ColumnType)>,
        S: Into<String>,
    {
        Schema {
            columns: columns.into_iter().map(|(n, t)| (n.into(), t)).collect(),
            extra: ExtraColumns::Reject,
        }
    }

    /// Keep undeclared columns as text instead of rejecting them.
    pub fn allow_extra_text(mut self) -> Self {
        self.extra = ExtraColumns::AsText;
        self
    }

    pub fn extra_columns(&self) -> ExtraColumns {
        self.extra
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Position of a column.
    pub fn index_of(&self, column: &str) -> Option<usize> {
        self.columns.iter().position(|(n, _)| n == column)
    }

    pub fn column_type(&self, column: &str) -> Option<ColumnType> {
        self.columns
            .iter()
            .find(|(n, _)| n == column)
            .map(|(_, t)| *t)
    }

    /// Column names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(n, _)| n.as_str())
    }

    pub fn columns(&self) -> &[(String, ColumnType)] {
        &self.columns
    }
}

// ---------------------------------------------------------------------------
// Record – one row of a dataset
// ---------------------------------------------------------------------------

/// One CSV row: an ordered mapping column name → value.  The column set is
/// the one of the shared schema, so every record of a dataset agrees on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: Arc<Schema>,
    values: Vec<Value>,
}

impl Record {
    /// Build a record; `values` must line up with `schema`.
    pub(crate) fn new(schema: Arc<Schema>, values: Vec<Value>) -> Self {
        debug_assert_eq!(schema.len(), values.len());
        Record { schema, values }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Value under `column`, if the column exists.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.schema.index_of(column).map(|i| &self.values[i])
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.schema.names().zip(self.values.iter())
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// A named table whose records share one resolved schema.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub name: String,
    schema: Arc<Schema>,
    rows: Vec<Record>,
}

impl Dataset {
    pub(crate) fn new(name: impl Into<String>, schema: Arc<Schema>, rows: Vec<Record>) -> Self {
        Dataset {
            name: name.into(),
            schema,
            rows,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    /// Ordered column names.
    pub fn column_names(&self) -> Vec<String> {
        self.schema.names().map(str::to_string).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
