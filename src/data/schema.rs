use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};

/// Default textual date format, `YYYY-MM-DD`.
pub const DEFAULT_DATE_FORMAT: &str = "%Y-%m-%d";

// ---------------------------------------------------------------------------
// ColumnKind – semantic type of a column
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    /// Text values used for grouping and set filters.
    Categorical,
    /// Floating point measures (price, quantity, totals).
    Numeric,
    /// Calendar dates parsed with the schema's date format.
    Date,
}

impl fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Categorical => write!(f, "categorical"),
            ColumnKind::Numeric => write!(f, "numeric"),
            ColumnKind::Date => write!(f, "date"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

// ---------------------------------------------------------------------------
// Schema – fixed column layout supplied as configuration
// ---------------------------------------------------------------------------

/// The column layout a source is parsed against. Never inferred from data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    pub columns: Vec<ColumnSpec>,
    #[serde(default = "default_date_format")]
    pub date_format: String,
}

fn default_date_format() -> String {
    DEFAULT_DATE_FORMAT.to_string()
}

impl Schema {
    /// Build and validate a schema using the default date format.
    pub fn new(columns: Vec<ColumnSpec>) -> Result<Self> {
        let schema = Schema {
            columns,
            date_format: default_date_format(),
        };
        schema.validate()?;
        Ok(schema)
    }

    pub fn with_date_format(mut self, format: impl Into<String>) -> Self {
        self.date_format = format.into();
        self
    }

    /// Names must be unique and non-empty, and at most one column may be a date.
    pub fn validate(&self) -> Result<()> {
        if self.columns.is_empty() {
            return Err(DataError::InvalidSchema("no columns".into()));
        }
        let mut seen = BTreeSet::new();
        for col in &self.columns {
            if col.name.trim().is_empty() {
                return Err(DataError::InvalidSchema("empty column name".into()));
            }
            if !seen.insert(col.name.as_str()) {
                return Err(DataError::InvalidSchema(format!(
                    "duplicate column '{}'",
                    col.name
                )));
            }
        }
        let dates = self
            .columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Date)
            .count();
        if dates > 1 {
            return Err(DataError::InvalidSchema(format!(
                "{dates} date columns, at most one is allowed"
            )));
        }
        Ok(())
    }

    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.columns
            .iter()
            .find(|c| c.name == column)
            .map(|c| c.kind)
    }

    /// Look up a column and check it has the expected kind.
    pub fn require(&self, column: &str, expected: ColumnKind) -> Result<()> {
        match self.kind_of(column) {
            None => Err(DataError::UnknownColumn(column.to_string())),
            Some(actual) if actual != expected => Err(DataError::WrongColumnKind {
                column: column.to_string(),
                expected,
                actual,
            }),
            Some(_) => Ok(()),
        }
    }

    /// The designated date column, if the schema has one.
    pub fn date_column(&self) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.kind == ColumnKind::Date)
            .map(|c| c.name.as_str())
    }

    /// Columns that can be narrowed with a value set.
    pub fn categorical_columns(&self) -> impl Iterator<Item = &str> {
        self.columns
            .iter()
            .filter(|c| c.kind == ColumnKind::Categorical)
            .map(|c| c.name.as_str())
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_duplicate_and_multiple_dates() {
        let dup = Schema::new(vec![
            ColumnSpec::new("A", ColumnKind::Categorical),
            ColumnSpec::new("A", ColumnKind::Numeric),
        ]);
        assert!(matches!(dup, Err(DataError::InvalidSchema(_))));

        let dates = Schema::new(vec![
            ColumnSpec::new("From", ColumnKind::Date),
            ColumnSpec::new("To", ColumnKind::Date),
        ]);
        assert!(matches!(dates, Err(DataError::InvalidSchema(_))));
    }

    #[test]
    fn require_reports_kind_mismatch() {
        let schema = Schema::new(vec![
            ColumnSpec::new("Category", ColumnKind::Categorical),
            ColumnSpec::new("Total", ColumnKind::Numeric),
        ])
        .unwrap();

        assert!(schema.require("Total", ColumnKind::Numeric).is_ok());
        assert!(matches!(
            schema.require("Category", ColumnKind::Numeric),
            Err(DataError::WrongColumnKind { .. })
        ));
        assert!(matches!(
            schema.require("Nope", ColumnKind::Numeric),
            Err(DataError::UnknownColumn(_))
        ));
        assert_eq!(schema.date_column(), None);
    }

    #[test]
    fn deserializes_with_default_date_format() {
        let json = r#"{"columns":[{"name":"Day","kind":"date"}]}"#;
        let schema: Schema = serde_json::from_str(json).unwrap();
        assert_eq!(schema.date_format, DEFAULT_DATE_FORMAT);
        assert_eq!(schema.date_column(), Some("Day"));
    }
}
