use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;

use super::error::{DataError, Result};
use super::model::{Dataset, Record, Value};
use super::schema::ColumnKind;

// ---------------------------------------------------------------------------
// DateRange – inclusive, normalized
// ---------------------------------------------------------------------------

/// Inclusive `[start, end]` range. Always `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, swapping the bounds when they arrive inverted
    /// (date pickers happily hand out `end < start`).
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start > end {
            log::debug!("Swapping inverted date range {start}..{end}");
            DateRange {
                start: end,
                end: start,
            }
        } else {
            DateRange { start, end }
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

// ---------------------------------------------------------------------------
// FilterSpec – which values are selected per column
// ---------------------------------------------------------------------------

/// Per-column selection state plus an optional range on the schema's date
/// column.
///
/// * column absent from `categories` → no constraint
/// * empty set → nothing selected → no record matches
/// * full set of distinct values → effectively no constraint
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSpec {
    pub categories: BTreeMap<String, BTreeSet<Value>>,
    pub date_range: Option<DateRange>,
}

impl FilterSpec {
    /// A spec with nothing constrained.
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialise a spec with every value selected and the full date range,
    /// i.e. the default state of a freshly loaded dashboard.
    pub fn select_all(dataset: &Dataset) -> Self {
        let categories = dataset
            .schema()
            .categorical_columns()
            .filter_map(|col| {
                dataset
                    .distinct_values(col)
                    .ok()
                    .map(|vals| (col.to_string(), vals.clone()))
            })
            .collect();
        let date_range = dataset
            .full_date_range()
            .ok()
            .map(|(lo, hi)| DateRange::new(lo, hi));
        FilterSpec {
            categories,
            date_range,
        }
    }

    /// Restrict `column` to exactly `values`.
    pub fn with_values<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.categories
            .insert(column.into(), values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range = Some(DateRange::new(start, end));
        self
    }
}

// ---------------------------------------------------------------------------
// FilteredView – the records passing a FilterSpec
// ---------------------------------------------------------------------------

/// Ordered subsequence of a dataset. Holds indices only; the dataset is
/// borrowed, never copied or mutated.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    /// A view over every record.
    pub fn all(dataset: &'a Dataset) -> Self {
        FilteredView {
            dataset,
            indices: (0..dataset.len()).collect(),
        }
    }

    /// A view over the given record indices, which must be ascending and in bounds.
    pub fn from_indices(dataset: &'a Dataset, indices: Vec<usize>) -> Self {
        debug_assert!(indices.windows(2).all(|w| w[0] < w[1]));
        debug_assert!(indices.last().map_or(true, |&i| i < dataset.len()));
        FilteredView { dataset, indices }
    }

    pub fn dataset(&self) -> &'a Dataset {
        self.dataset
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Records in original dataset order.
    pub fn iter(&self) -> impl Iterator<Item = &'a Record> + '_ {
        let records = self.dataset.records();
        self.indices.iter().map(move |&i| &records[i])
    }
}

/// Check that every column `spec` names can be filtered on this dataset.
fn validate(dataset: &Dataset, spec: &FilterSpec) -> Result<()> {
    for col in spec.categories.keys() {
        dataset.schema().require(col, ColumnKind::Categorical)?;
    }
    if spec.date_range.is_some() && dataset.schema().date_column().is_none() {
        return Err(DataError::NoDateColumn);
    }
    Ok(())
}

/// Return indices of records that pass all active filters.
///
/// A record passes a column filter when:
/// * The filter set for that column is empty → nothing selected → fails
/// * The record's value for that column is in the selected set → passes
///
/// and, when a date range is set, its date lies within the range.
pub fn filtered_indices(dataset: &Dataset, spec: &FilterSpec) -> Result<Vec<usize>> {
    validate(dataset, spec)?;

    // Columns with every distinct value selected can't exclude anything.
    let active: Vec<(&str, &BTreeSet<Value>)> = spec
        .categories
        .iter()
        .filter(|(col, selected)| match dataset.distinct_values(col) {
            Ok(all_vals) => selected.is_empty() || !all_vals.is_subset(selected),
            Err(_) => true,
        })
        .map(|(col, selected)| (col.as_str(), selected))
        .collect();

    let date_filter = spec
        .date_range
        .as_ref()
        .zip(dataset.schema().date_column());

    let indices: Vec<usize> = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, rec)| {
            for &(col, selected) in &active {
                match rec.get(col) {
                    Some(val) if selected.contains(val) => {}
                    _ => return false,
                }
            }
            match date_filter {
                Some((range, col)) => rec
                    .get(col)
                    .and_then(Value::as_date)
                    .is_some_and(|d| range.contains(d)),
                None => true,
            }
        })
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "Filter kept {} of {} records ({} active column filters)",
        indices.len(),
        dataset.len(),
        active.len()
    );
    Ok(indices)
}

/// Apply `spec` to `dataset`, preserving record order.
pub fn filter<'a>(dataset: &'a Dataset, spec: &FilterSpec) -> Result<FilteredView<'a>> {
    let indices = filtered_indices(dataset, spec)?;
    Ok(FilteredView { dataset, indices })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::schema::{ColumnSpec, Schema};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn dataset() -> Dataset {
        let schema = Schema::new(vec![
            ColumnSpec::new("Product", ColumnKind::Categorical),
            ColumnSpec::new("Category", ColumnKind::Categorical),
            ColumnSpec::new("Date", ColumnKind::Date),
            ColumnSpec::new("Total", ColumnKind::Numeric),
        ])
        .unwrap();
        let rows = [
            ("A", "X", "2024-01-01", 100.0),
            ("B", "X", "2024-01-02", 50.0),
            ("C", "Y", "2024-01-03", 10.0),
            ("A", "Y", "2024-01-04", 5.0),
        ];
        let records = rows
            .iter()
            .map(|&(p, c, d, t)| {
                Record::new()
                    .with("Product", p)
                    .with("Category", c)
                    .with("Date", date(d))
                    .with("Total", t)
            })
            .collect();
        Dataset::from_records(schema, records).unwrap()
    }

    #[test]
    fn inverted_range_is_swapped() {
        let r = DateRange::new(date("2024-02-01"), date("2024-01-01"));
        assert_eq!(r.start(), date("2024-01-01"));
        assert_eq!(r.end(), date("2024-02-01"));
        assert!(r.contains(date("2024-01-01")));
        assert!(r.contains(date("2024-02-01")));
        assert!(!r.contains(date("2024-02-02")));
    }

    #[test]
    fn select_all_is_identity() {
        let ds = dataset();
        let view = filter(&ds, &FilterSpec::select_all(&ds)).unwrap();
        assert_eq!(view.indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn conjunction_preserves_order() {
        let ds = dataset();
        let spec = FilterSpec::new()
            .with_values("Product", ["A", "C"])
            .with_date_range(date("2024-01-02"), date("2024-01-04"));
        let view = filter(&ds, &spec).unwrap();
        assert_eq!(view.indices(), &[2, 3]);
        let products: Vec<String> = view
            .iter()
            .map(|r| r.get("Product").unwrap().to_string())
            .collect();
        assert_eq!(products, vec!["C", "A"]);
    }

    #[test]
    fn empty_selection_matches_nothing() {
        let ds = dataset();
        let spec = FilterSpec::select_all(&ds).with_values("Category", Vec::<Value>::new());
        let view = filter(&ds, &spec).unwrap();
        assert!(view.is_empty());
    }

    #[test]
    fn unknown_or_non_categorical_columns_are_rejected() {
        let ds = dataset();
        let unknown = FilterSpec::new().with_values("Region", ["North"]);
        assert!(matches!(
            filter(&ds, &unknown),
            Err(DataError::UnknownColumn(_))
        ));
        let numeric = FilterSpec::new().with_values("Total", [100.0]);
        assert!(matches!(
            filter(&ds, &numeric),
            Err(DataError::WrongColumnKind { .. })
        ));
    }
}
