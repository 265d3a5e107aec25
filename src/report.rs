//! The fixed set of numbers and series a dashboard renders, computed from a
//! filtered view. Presentation (charts, widgets) belongs to the caller.

use std::fmt;
use std::sync::Arc;

use arrow::array::{ArrayRef, Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema as ArrowSchema};
use arrow::record_batch::RecordBatch;
use arrow::util::pretty::pretty_format_batches;
use serde::{Deserialize, Serialize};

use crate::data::aggregate::{aggregate, total_metric, AggregationResult, Reducer, SortOrder};
use crate::data::error::{DataError, Result};
use crate::data::filter::FilteredView;
use crate::data::model::Value;
use crate::data::schema::{ColumnKind, Schema};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// A single headline number, e.g. "Total sales".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineSpec {
    pub label: String,
    pub column: String,
    pub reducer: Reducer,
}

/// A grouped series, rendered by the caller as a bar or line chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesSpec {
    pub title: String,
    pub group_by: String,
    pub value_column: String,
    pub reducer: Reducer,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub headlines: Vec<HeadlineSpec>,
    #[serde(default)]
    pub series: Vec<SeriesSpec>,
}

impl ReportConfig {
    /// Every referenced column must exist, and `sum`/`mean` targets must be numeric.
    pub fn validate(&self, schema: &Schema) -> Result<()> {
        let check_value = |column: &str, reducer: Reducer| match reducer {
            Reducer::Count => schema
                .kind_of(column)
                .map(|_| ())
                .ok_or_else(|| DataError::UnknownColumn(column.to_string())),
            Reducer::Sum | Reducer::Mean => schema.require(column, ColumnKind::Numeric),
        };
        for h in &self.headlines {
            check_value(&h.column, h.reducer)?;
        }
        for s in &self.series {
            if schema.kind_of(&s.group_by).is_none() {
                return Err(DataError::UnknownColumn(s.group_by.clone()));
            }
            check_value(&s.value_column, s.reducer)?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Headline {
    pub label: String,
    pub reducer: Reducer,
    /// `None` when the reduction is undefined, i.e. a mean over no records.
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Series {
    pub title: String,
    pub order: SortOrder,
    pub result: AggregationResult,
}

/// Everything a dashboard shows for one FilterSpec.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub title: String,
    pub total_records: usize,
    pub filtered_records: usize,
    pub headlines: Vec<Headline>,
    pub series: Vec<Series>,
}

impl DashboardReport {
    /// Compute every headline and series of `config` over `view`.
    pub fn build(title: &str, config: &ReportConfig, view: &FilteredView<'_>) -> Result<Self> {
        let headlines = config
            .headlines
            .iter()
            .map(|h| {
                let value = match total_metric(view, &h.column, h.reducer) {
                    Ok(v) => Some(v),
                    Err(DataError::EmptyAggregation { .. }) => None,
                    Err(e) => return Err(e),
                };
                Ok(Headline {
                    label: h.label.clone(),
                    reducer: h.reducer,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let series = config
            .series
            .iter()
            .map(|s| {
                aggregate(view, &s.group_by, &s.value_column, s.reducer, s.order).map(|result| {
                    Series {
                        title: s.title.clone(),
                        order: s.order,
                        result,
                    }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(DashboardReport {
            title: title.to_string(),
            total_records: view.dataset().len(),
            filtered_records: view.len(),
            headlines,
            series,
        })
    }
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        format!("{v:.2}")
    }
}

impl fmt::Display for DashboardReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", "=".repeat(self.title.chars().count()))?;
        writeln!(
            f,
            "{} of {} records match the current filters",
            self.filtered_records, self.total_records
        )?;
        writeln!(f)?;

        for h in &self.headlines {
            match h.value {
                Some(v) => writeln!(f, "{:<24} {:>14}", h.label, format_number(v))?,
                None => writeln!(f, "{:<24} {:>14}", h.label, "n/a")?,
            }
        }

        for s in &self.series {
            writeln!(f)?;
            writeln!(f, "{}", s.title)?;
            writeln!(f, "{}", "-".repeat(s.title.chars().count()))?;
            if s.result.is_empty() {
                writeln!(f, "  (no data)")?;
                continue;
            }
            let width = s
                .result
                .keys()
                .map(|k| k.to_string().chars().count())
                .max()
                .unwrap_or(0);
            for entry in &s.result.entries {
                writeln!(
                    f,
                    "  {:<width$}  {:>14}",
                    entry.key.to_string(),
                    format_number(entry.value)
                )?;
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Row table
// ---------------------------------------------------------------------------

/// Convert up to `limit` records of `view` into an Arrow batch with the
/// schema's column order.
pub fn view_to_record_batch(view: &FilteredView<'_>, limit: usize) -> Result<RecordBatch> {
    let schema = view.dataset().schema();
    let rows: Vec<_> = view.iter().take(limit).collect();

    let mut fields = Vec::with_capacity(schema.columns.len());
    let mut arrays: Vec<ArrayRef> = Vec::with_capacity(schema.columns.len());

    for col in &schema.columns {
        let cells = rows.iter().map(|r| r.get(&col.name));
        match col.kind {
            ColumnKind::Categorical => {
                let values: StringArray = cells
                    .map(|v| v.and_then(Value::as_str).map(str::to_string))
                    .collect();
                fields.push(Field::new(&col.name, DataType::Utf8, true));
                arrays.push(Arc::new(values));
            }
            ColumnKind::Numeric => {
                let values: Float64Array = cells.map(|v| v.and_then(Value::as_f64)).collect();
                fields.push(Field::new(&col.name, DataType::Float64, true));
                arrays.push(Arc::new(values));
            }
            ColumnKind::Date => {
                let values: Date32Array = cells
                    .map(|v| v.and_then(Value::as_date).map(Date32Type::from_naive_date))
                    .collect();
                fields.push(Field::new(&col.name, DataType::Date32, true));
                arrays.push(Arc::new(values));
            }
        }
    }

    Ok(RecordBatch::try_new(Arc::new(ArrowSchema::new(fields)), arrays)?)
}

/// Pretty-print up to `limit` records of `view` as a text table.
pub fn render_rows(view: &FilteredView<'_>, limit: usize) -> Result<String> {
    let batch = view_to_record_batch(view, limit)?;
    Ok(pretty_format_batches(&[batch])?.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{Dataset, Record};
    use crate::data::schema::ColumnSpec;
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        let schema = Schema::new(vec![
            ColumnSpec::new("Team", ColumnKind::Categorical),
            ColumnSpec::new("Day", ColumnKind::Date),
            ColumnSpec::new("Score", ColumnKind::Numeric),
        ])
        .unwrap();
        let day = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        Dataset::from_records(
            schema,
            vec![
                Record::new().with("Team", "Red").with("Day", day("2024-05-01")).with("Score", 3.0),
                Record::new().with("Team", "Blue").with("Day", day("2024-05-02")).with("Score", 4.5),
            ],
        )
        .unwrap()
    }

    fn config() -> ReportConfig {
        ReportConfig {
            headlines: vec![HeadlineSpec {
                label: "Average score".into(),
                column: "Score".into(),
                reducer: Reducer::Mean,
            }],
            series: vec![SeriesSpec {
                title: "Score by team".into(),
                group_by: "Team".into(),
                value_column: "Score".into(),
                reducer: Reducer::Sum,
                order: SortOrder::DescendingByValue,
            }],
        }
    }

    #[test]
    fn builds_and_renders() {
        let ds = dataset();
        let view = FilteredView::all(&ds);
        let report = DashboardReport::build("Scores", &config(), &view).unwrap();
        assert_eq!(report.headlines[0].value, Some(3.75));
        assert_eq!(report.series[0].result.entries[0].key, Value::from("Blue"));

        let text = report.to_string();
        assert!(text.contains("2 of 2 records"));
        assert!(text.contains("Average score"));
        assert!(text.contains("3.75"));
    }

    #[test]
    fn empty_view_mean_headline_is_absent() {
        let ds = dataset();
        let view = FilteredView::from_indices(&ds, Vec::new());
        let report = DashboardReport::build("Scores", &config(), &view).unwrap();
        assert_eq!(report.headlines[0].value, None);
        assert!(report.series[0].result.is_empty());
        assert!(report.to_string().contains("n/a"));
    }

    #[test]
    fn row_table_keeps_schema_order() {
        let ds = dataset();
        let view = FilteredView::all(&ds);
        let batch = view_to_record_batch(&view, 1).unwrap();
        assert_eq!(batch.num_rows(), 1);
        assert_eq!(batch.num_columns(), 3);
        let table = render_rows(&view, 10).unwrap();
        assert!(table.contains("Team"));
        assert!(table.contains("2024-05-02"));
    }

    #[test]
    fn validate_rejects_mean_of_text() {
        let mut cfg = config();
        cfg.series[0].value_column = "Team".into();
        assert!(matches!(
            cfg.validate(dataset().schema()),
            Err(DataError::WrongColumnKind { .. })
        ));
    }
}
