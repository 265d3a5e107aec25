/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///  .csv / .json / .parquet          Schema (configuration)
///        │                              │
///        ▼                              │
///   ┌──────────┐                        │
///   │  loader   │  parse file ◄─────────┘
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Dataset  │  Vec<Record>, distinct-value index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  apply FilterSpec → FilteredView (indices)
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  group + reduce → AggregationResult / headline totals
///   └───────────┘
/// ```

pub mod aggregate;
pub mod error;
pub mod filter;
pub mod loader;
pub mod model;
pub mod schema;

pub use aggregate::{aggregate, summarize, total_metric, AggregationResult, GroupEntry, GroupSummary, Reducer, SortOrder};
pub use error::{DataError, Result};
pub use filter::{filter, DateRange, FilterSpec, FilteredView};
pub use loader::load_file;
pub use model::{Dataset, Record, Value};
pub use schema::{ColumnKind, ColumnSpec, Schema};
