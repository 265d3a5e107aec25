use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{DataError, Result};
use super::filter::FilteredView;
use super::model::Value;
use super::schema::ColumnKind;

// ---------------------------------------------------------------------------
// Reducer / SortOrder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reducer {
    Sum,
    Mean,
    Count,
}

impl fmt::Display for Reducer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reducer::Sum => write!(f, "sum"),
            Reducer::Mean => write!(f, "mean"),
            Reducer::Count => write!(f, "count"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    /// Rankings: largest value first, ties by ascending key.
    #[default]
    DescendingByValue,
    /// Time series: chronological / lexical key order.
    AscendingByKey,
}

/// Running count and sum for one group.
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    count: usize,
    sum: f64,
}

impl Accumulator {
    fn push(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
    }

    /// Groups only exist once a record was pushed, so `count > 0` for `Mean`.
    fn reduce(&self, reducer: Reducer) -> f64 {
        match reducer {
            Reducer::Sum => self.sum,
            Reducer::Mean => self.sum / self.count as f64,
            Reducer::Count => self.count as f64,
        }
    }
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupEntry {
    pub key: Value,
    pub value: f64,
}

/// Grouped reduction of one column, ordered for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregationResult {
    pub group_by: String,
    pub value_column: String,
    pub reducer: Reducer,
    pub entries: Vec<GroupEntry>,
}

impl AggregationResult {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &Value) -> Option<f64> {
        self.entries.iter().find(|e| &e.key == key).map(|e| e.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|e| &e.key)
    }

    /// Sum of all group values.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.value).sum()
    }
}

/// count / sum / mean for a single group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub key: Value,
    pub count: usize,
    pub sum: f64,
    pub mean: f64,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

/// Check the reducer can be applied to `column`. `Count` works on anything.
fn check_value_column(view: &FilteredView<'_>, column: &str, reducer: Reducer) -> Result<()> {
    let schema = view.dataset().schema();
    match reducer {
        Reducer::Count => schema
            .kind_of(column)
            .map(|_| ())
            .ok_or_else(|| DataError::UnknownColumn(column.to_string())),
        Reducer::Sum | Reducer::Mean => schema.require(column, ColumnKind::Numeric),
    }
}

fn group(view: &FilteredView<'_>, group_by: &str, value_column: &str) -> BTreeMap<Value, Accumulator> {
    let mut groups: BTreeMap<Value, Accumulator> = BTreeMap::new();
    for rec in view.iter() {
        let key = rec.get(group_by).cloned().unwrap_or(Value::Null);
        let value = rec.get(value_column).and_then(Value::as_f64).unwrap_or(0.0);
        groups.entry(key).or_default().push(value);
    }
    groups
}

/// Group `view` by `group_by` and reduce `value_column` in each group.
///
/// An empty view yields an empty result for every reducer.
pub fn aggregate(
    view: &FilteredView<'_>,
    group_by: &str,
    value_column: &str,
    reducer: Reducer,
    order: SortOrder,
) -> Result<AggregationResult> {
    let schema = view.dataset().schema();
    if schema.kind_of(group_by).is_none() {
        return Err(DataError::UnknownColumn(group_by.to_string()));
    }
    check_value_column(view, value_column, reducer)?;

    // BTreeMap iteration already gives ascending keys.
    let mut entries: Vec<GroupEntry> = group(view, group_by, value_column)
        .into_iter()
        .map(|(key, acc)| GroupEntry {
            key,
            value: acc.reduce(reducer),
        })
        .collect();

    if order == SortOrder::DescendingByValue {
        // Stable sort keeps ascending key order among equal values.
        entries.sort_by(|a, b| b.value.total_cmp(&a.value));
    }

    log::debug!(
        "{reducer}({value_column}) by {group_by}: {} groups from {} records",
        entries.len(),
        view.len()
    );

    Ok(AggregationResult {
        group_by: group_by.to_string(),
        value_column: value_column.to_string(),
        reducer,
        entries,
    })
}

/// count, sum and mean of `value_column` per group, ascending by key.
pub fn summarize(
    view: &FilteredView<'_>,
    group_by: &str,
    value_column: &str,
) -> Result<Vec<GroupSummary>> {
    if view.dataset().schema().kind_of(group_by).is_none() {
        return Err(DataError::UnknownColumn(group_by.to_string()));
    }
    check_value_column(view, value_column, Reducer::Sum)?;

    Ok(group(view, group_by, value_column)
        .into_iter()
        .map(|(key, acc)| GroupSummary {
            key,
            count: acc.count,
            sum: acc.sum,
            mean: acc.reduce(Reducer::Mean),
        })
        .collect())
}

/// Reduce `column` over the whole view to one headline number.
///
/// `Sum` and `Count` of an empty view are `0`; `Mean` of an empty view is
/// [`DataError::EmptyAggregation`].
pub fn total_metric(view: &FilteredView<'_>, column: &str, reducer: Reducer) -> Result<f64> {
    check_value_column(view, column, reducer)?;

    let mut acc = Accumulator::default();
    for rec in view.iter() {
        acc.push(rec.get(column).and_then(Value::as_f64).unwrap_or(0.0));
    }

    if reducer == Reducer::Mean && acc.count == 0 {
        return Err(DataError::EmptyAggregation {
            column: column.to_string(),
        });
    }
    Ok(acc.reduce(reducer))
}
