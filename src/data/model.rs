use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use super::error::{DataError, Result};
use super::schema::{ColumnKind, Schema};

// ---------------------------------------------------------------------------
// Value – a single typed cell
// ---------------------------------------------------------------------------

/// A typed cell value. Grouping and set filters key on `Value`, so it has
/// to be `Ord` and `Hash`. Equality follows `Ord` (numbers compare with
/// `total_cmp`), so `==`, ordering and hashing agree.
#[derive(Debug, Clone)]
pub enum Value {
    Text(String),
    Number(f64),
    Date(NaiveDate),
    Null,
}

// -- Manual Eq/Ord so Value can live in BTreeMap / BTreeSet --

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
                Null => 0,
                Number(_) => 1,
                Date(_) => 2,
                Text(_) => 3,
            }
        }
        match (self, other) {
            (Null, Null) => std::cmp::Ordering::Equal,
            (Number(a), Number(b)) => a.total_cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
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
            Value::Number(f) => f.to_bits().hash(state),
            Value::Date(d) => d.hash(state),
            Value::Null => {}
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => write!(f, "{s}"),
            Value::Number(v) => write!(f, "{v}"),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Value::Text(s) => serializer.serialize_str(s),
            Value::Number(v) => serializer.serialize_f64(*v),
            Value::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
            Value::Null => serializer.serialize_unit(),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Record – one row of the source table
// ---------------------------------------------------------------------------

/// One row: column name → value, for exactly the schema's columns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    pub values: BTreeMap<String, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.insert(column.into(), value.into());
        self
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.values.get(column)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The loaded, read-only table plus a distinct-value index for every
/// categorical column.
#[derive(Debug, Clone)]
pub struct Dataset {
    schema: Schema,
    records: Vec<Record>,
    unique_values: BTreeMap<String, BTreeSet<Value>>,
}

impl Dataset {
    /// Check every record against the schema and build the categorical index.
    pub fn from_records(schema: Schema, records: Vec<Record>) -> Result<Self> {
        schema.validate()?;

        let mut unique_values: BTreeMap<String, BTreeSet<Value>> = schema
            .categorical_columns()
            .map(|c| (c.to_string(), BTreeSet::new()))
            .collect();

        for (row, record) in records.iter().enumerate() {
            for col in &schema.columns {
                let value = record
                    .get(&col.name)
                    .ok_or_else(|| DataError::MissingColumn(col.name.clone()))?;
                let conforms = match (col.kind, value) {
                    (ColumnKind::Categorical, Value::Text(_) | Value::Null) => true,
                    (ColumnKind::Numeric, Value::Number(v)) => v.is_finite(),
                    (ColumnKind::Date, Value::Date(_)) => true,
                    _ => false,
                };
                if !conforms {
                    return Err(DataError::Parse {
                        row,
                        column: col.name.clone(),
                        value: value.to_string(),
                        reason: format!("expected a finite {} value", col.kind),
                    });
                }
                if let Some(set) = unique_values.get_mut(&col.name) {
                    set.insert(value.clone());
                }
            }
        }

        Ok(Dataset {
            schema,
            records,
            unique_values,
        })
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Unique values of a categorical column, in ascending order.
    pub fn distinct_values(&self, column: &str) -> Result<&BTreeSet<Value>> {
        self.schema.require(column, ColumnKind::Categorical)?;
        self.unique_values
            .get(column)
            .ok_or_else(|| DataError::UnknownColumn(column.to_string()))
    }

    /// Earliest and latest date in `column` across the whole dataset.
    pub fn date_range(&self, column: &str) -> Result<(NaiveDate, NaiveDate)> {
        self.schema.require(column, ColumnKind::Date)?;
        let mut dates = self
            .records
            .iter()
            .filter_map(|r| r.get(column).and_then(Value::as_date));
        let first = dates.next().ok_or_else(|| DataError::EmptyDataset {
            column: column.to_string(),
        })?;
        Ok(dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    }

    /// Date range of the schema's designated date column.
    pub fn full_date_range(&self) -> Result<(NaiveDate, NaiveDate)> {
        let column = self.schema.date_column().ok_or(DataError::NoDateColumn)?;
        self.date_range(column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::ColumnSpec;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnSpec::new("Category", ColumnKind::Categorical),
            ColumnSpec::new("Date", ColumnKind::Date),
            ColumnSpec::new("Total", ColumnKind::Numeric),
        ])
        .unwrap()
    }

    fn row(cat: &str, d: &str, total: f64) -> Record {
        Record::new()
            .with("Category", cat)
            .with("Date", date(d))
            .with("Total", total)
    }

    #[test]
    fn value_ordering_is_total() {
        let mut set = BTreeSet::new();
        set.insert(Value::from("b"));
        set.insert(Value::Null);
        set.insert(Value::from(2.0));
        set.insert(Value::from("a"));
        set.insert(Value::from(f64::NAN));
        let ordered: Vec<String> = set.iter().map(|v| v.to_string()).collect();
        assert_eq!(ordered, vec!["<null>", "2", "NaN", "a", "b"]);
    }

    #[test]
    fn equality_agrees_with_ordering_and_hash() {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        fn hash(v: &Value) -> u64 {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        }

        let zero = Value::Number(0.0);
        let neg_zero = Value::Number(-0.0);
        assert_ne!(zero, neg_zero);
        assert_ne!(zero.cmp(&neg_zero), std::cmp::Ordering::Equal);

        let nan = Value::Number(f64::NAN);
        assert_eq!(nan, nan.clone());
        assert_eq!(hash(&nan), hash(&nan.clone()));

        for (a, b) in [(&zero, &neg_zero), (&zero, &zero.clone())] {
            assert_eq!(a == b, a.cmp(b) == std::cmp::Ordering::Equal);
            if a == b {
                assert_eq!(hash(a), hash(b));
            }
        }
    }

    #[test]
    fn distinct_values_and_date_range() {
        let ds = Dataset::from_records(
            schema(),
            vec![
                row("X", "2024-03-01", 1.0),
                row("Y", "2024-01-15", 2.0),
                row("X", "2024-02-10", 3.0),
            ],
        )
        .unwrap();

        let cats: Vec<&Value> = ds.distinct_values("Category").unwrap().iter().collect();
        assert_eq!(cats, vec![&Value::from("X"), &Value::from("Y")]);
        assert_eq!(
            ds.date_range("Date").unwrap(),
            (date("2024-01-15"), date("2024-03-01"))
        );
        assert!(matches!(
            ds.distinct_values("Total"),
            Err(DataError::WrongColumnKind { .. })
        ));
    }

    #[test]
    fn date_range_of_empty_dataset_fails() {
        let ds = Dataset::from_records(schema(), Vec::new()).unwrap();
        assert!(matches!(
            ds.date_range("Date"),
            Err(DataError::EmptyDataset { .. })
        ));
    }

    #[test]
    fn rejects_records_that_do_not_match_schema() {
        let bad = Record::new()
            .with("Category", "X")
            .with("Date", "2024-01-01")
            .with("Total", 1.0);
        let err = Dataset::from_records(schema(), vec![bad]).unwrap_err();
        assert!(matches!(err, DataError::Parse { row: 0, ref column, .. } if column == "Date"));

        let nan = Record::new()
            .with("Category", "X")
            .with("Date", date("2024-01-01"))
            .with("Total", f64::NAN);
        assert!(matches!(
            Dataset::from_records(schema(), vec![nan]),
            Err(DataError::Parse { ref column, .. }) if column == "Total"
        ));

        let missing = Record::new().with("Category", "X");
        assert!(matches!(
            Dataset::from_records(schema(), vec![missing]),
            Err(DataError::MissingColumn(_))
        ));
    }
}
