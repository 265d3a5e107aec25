use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;

use crate::config::DashboardConfig;
use crate::data::error::{DataError, Result};
use crate::data::filter::{filtered_indices, FilterSpec, FilteredView};
use crate::data::loader::load_file;
use crate::data::model::{Dataset, Value};
use crate::report::DashboardReport;

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// One viewer's dashboard state, independent of rendering.
///
/// The dataset is shared read-only (`Arc`), so any number of sessions can
/// look at the same table while each keeps its own selections.
///
/// `dataset`, `filters` and `visible_indices` only change together, through
/// the methods below, so the cached indices always match the selections.
pub struct Session {
    pub config: DashboardConfig,

    /// Loaded dataset (None until a file loads successfully).
    dataset: Option<Arc<Dataset>>,

    /// Current selections.
    filters: FilterSpec,

    /// Indices of records passing `filters`.
    visible_indices: Vec<usize>,

    /// Status / error message for the UI.
    pub status_message: Option<String>,
}

impl Session {
    pub fn new(config: DashboardConfig) -> Self {
        Self {
            config,
            dataset: None,
            filters: FilterSpec::default(),
            visible_indices: Vec::new(),
            status_message: None,
        }
    }

    /// Load `path` with the session's schema.
    ///
    /// A missing file is not fatal: the session stays in its "no data"
    /// state with a status message and `Ok(())` is returned. Any other
    /// failure is returned to the caller.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        match load_file(path, &self.config.schema) {
            Ok(dataset) => {
                self.set_dataset(Arc::new(dataset));
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                log::error!("Failed to load file: {e}");
                self.clear();
                self.status_message = Some(format!("{e}. Place the file next to the program or pass its path."));
                Ok(())
            }
            Err(e) => {
                log::error!("Failed to load file: {e}");
                self.status_message = Some(format!("Error: {e}"));
                Err(e)
            }
        }
    }

    /// Ingest a dataset and select everything.
    pub fn set_dataset(&mut self, dataset: Arc<Dataset>) {
        self.filters = FilterSpec::select_all(&dataset);
        self.visible_indices = (0..dataset.len()).collect();
        self.dataset = Some(dataset);
        self.status_message = None;
    }

    fn clear(&mut self) {
        self.dataset = None;
        self.filters = FilterSpec::default();
        self.visible_indices.clear();
    }

    pub fn has_data(&self) -> bool {
        self.dataset.is_some()
    }

    pub fn dataset(&self) -> Option<&Arc<Dataset>> {
        self.dataset.as_ref()
    }

    /// Current selections. Change them with [`Session::set_filters`] or the
    /// toggle / select helpers.
    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    /// Indices of the records passing [`Session::filters`].
    pub fn visible_indices(&self) -> &[usize] {
        &self.visible_indices
    }

    /// Recompute `visible_indices` after a filter change.
    fn refilter(&mut self) -> Result<()> {
        if let Some(ds) = &self.dataset {
            self.visible_indices = filtered_indices(ds, &self.filters)?;
        }
        Ok(())
    }

    /// The records currently visible, or `None` without data.
    pub fn view(&self) -> Option<FilteredView<'_>> {
        self.dataset
            .as_deref()
            .map(|ds| FilteredView::from_indices(ds, self.visible_indices.clone()))
    }

    /// Replace the whole filter spec.
    pub fn set_filters(&mut self, filters: FilterSpec) -> Result<()> {
        let previous = std::mem::replace(&mut self.filters, filters);
        if let Err(e) = self.refilter() {
            self.filters = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Toggle a single value in a column's selection.
    pub fn toggle_filter_value(&mut self, column: &str, value: &Value) -> Result<()> {
        let mut filters = self.filters.clone();
        let selected = filters.categories.entry(column.to_string()).or_default();
        if !selected.remove(value) {
            selected.insert(value.clone());
        }
        self.set_filters(filters)
    }

    /// Select all values in a column.
    pub fn select_all(&mut self, column: &str) -> Result<()> {
        let Some(ds) = &self.dataset else {
            return Ok(());
        };
        let all_vals = ds.distinct_values(column)?.clone();
        let mut filters = self.filters.clone();
        filters.categories.insert(column.to_string(), all_vals);
        self.set_filters(filters)
    }

    /// Deselect all values in a column.
    pub fn select_none(&mut self, column: &str) -> Result<()> {
        let mut filters = self.filters.clone();
        filters.categories.insert(column.to_string(), Default::default());
        self.set_filters(filters)
    }

    /// Narrow the date column to `[start, end]` (swapped if inverted).
    pub fn set_date_range(&mut self, start: NaiveDate, end: NaiveDate) -> Result<()> {
        let filters = self.filters.clone().with_date_range(start, end);
        self.set_filters(filters)
    }

    /// Compute the configured report over the visible records.
    pub fn report(&self) -> Result<Option<DashboardReport>> {
        self.view()
            .map(|view| DashboardReport::build(&self.config.title, &self.config.report, &view))
            .transpose()
    }

    /// Date bounds for populating a picker.
    pub fn date_bounds(&self) -> Result<Option<(NaiveDate, NaiveDate)>> {
        match &self.dataset {
            None => Ok(None),
            Some(ds) => match ds.full_date_range() {
                Ok(range) => Ok(Some(range)),
                Err(DataError::EmptyDataset { .. } | DataError::NoDateColumn) => Ok(None),
                Err(e) => Err(e),
            },
        }
    }
}
