use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::aggregate::{Reducer, SortOrder};
use crate::data::schema::{ColumnKind, ColumnSpec, Schema};
use crate::report::{HeadlineSpec, ReportConfig, SeriesSpec};

// ---------------------------------------------------------------------------
// Dashboard configuration
// ---------------------------------------------------------------------------

/// Everything a dashboard variant needs: how to parse the file and which
/// numbers and series to compute from it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub title: String,
    pub schema: Schema,
    pub report: ReportConfig,
}

/// Built-in dashboard presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Variant {
    /// Sales by product: `Product_Name, Category, Price, Quantity_Sold, Total_Sales, Date_Sold`
    #[default]
    Sales,
    /// Product sales by region: `Product, Region, Date, Price, Quantity, Total`
    ProductSales,
    /// Employee records: `Name, Department, Position, Hire_Date, Salary, Age`
    Employee,
}

impl DashboardConfig {
    /// Read a JSON config file and validate its schema.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: DashboardConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config
            .schema
            .validate()
            .with_context(|| format!("validating schema in {}", path.display()))?;
        config.report.validate(&config.schema)?;
        Ok(config)
    }

    pub fn preset(variant: Variant) -> Self {
        match variant {
            Variant::Sales => sales(),
            Variant::ProductSales => product_sales(),
            Variant::Employee => employee(),
        }
    }
}

fn schema(columns: &[(&str, ColumnKind)]) -> Schema {
    Schema {
        columns: columns
            .iter()
            .map(|&(name, kind)| ColumnSpec::new(name, kind))
            .collect(),
        date_format: crate::data::schema::DEFAULT_DATE_FORMAT.to_string(),
    }
}

fn headline(label: &str, column: &str, reducer: Reducer) -> HeadlineSpec {
    HeadlineSpec {
        label: label.to_string(),
        column: column.to_string(),
        reducer,
    }
}

fn series(title: &str, group_by: &str, value: &str, reducer: Reducer, order: SortOrder) -> SeriesSpec {
    SeriesSpec {
        title: title.to_string(),
        group_by: group_by.to_string(),
        value_column: value.to_string(),
        reducer,
        order,
    }
}

fn sales() -> DashboardConfig {
    use ColumnKind::*;
    use Reducer::*;
    use SortOrder::*;
    DashboardConfig {
        title: "Product Sales Dashboard".into(),
        schema: schema(&[
            ("Product_Name", Categorical),
            ("Category", Categorical),
            ("Price", Numeric),
            ("Quantity_Sold", Numeric),
            ("Total_Sales", Numeric),
            ("Date_Sold", Date),
        ]),
        report: ReportConfig {
            headlines: vec![
                headline("Total sales", "Total_Sales", Sum),
                headline("Units sold", "Quantity_Sold", Sum),
            ],
            series: vec![
                series("Sales by product", "Product_Name", "Total_Sales", Sum, DescendingByValue),
                series("Sales by category", "Category", "Total_Sales", Sum, DescendingByValue),
                series("Sales over time", "Date_Sold", "Total_Sales", Sum, AscendingByKey),
                series("Average price by category", "Category", "Price", Mean, DescendingByValue),
            ],
        },
    }
}

fn product_sales() -> DashboardConfig {
    use ColumnKind::*;
    use Reducer::*;
    use SortOrder::*;
    DashboardConfig {
        title: "Sales by Product and Region".into(),
        schema: schema(&[
            ("Product", Categorical),
            ("Region", Categorical),
            ("Date", Date),
            ("Price", Numeric),
            ("Quantity", Numeric),
            ("Total", Numeric),
        ]),
        report: ReportConfig {
            headlines: vec![
                headline("Total revenue", "Total", Sum),
                headline("Units sold", "Quantity", Sum),
                headline("Average ticket", "Total", Mean),
            ],
            series: vec![
                series("Revenue by product", "Product", "Total", Sum, DescendingByValue),
                series("Revenue by region", "Region", "Total", Sum, DescendingByValue),
                series("Revenue over time", "Date", "Total", Sum, AscendingByKey),
                series("Units by product", "Product", "Quantity", Sum, DescendingByValue),
            ],
        },
    }
}

fn employee() -> DashboardConfig {
    use ColumnKind::*;
    use Reducer::*;
    use SortOrder::*;
    DashboardConfig {
        title: "Employee Dashboard".into(),
        schema: schema(&[
            ("Name", Categorical),
            ("Department", Categorical),
            ("Position", Categorical),
            ("Hire_Date", Date),
            ("Salary", Numeric),
            ("Age", Numeric),
        ]),
        report: ReportConfig {
            headlines: vec![
                headline("Headcount", "Name", Count),
                headline("Total payroll", "Salary", Sum),
                headline("Average salary", "Salary", Mean),
            ],
            series: vec![
                series("Headcount by department", "Department", "Name", Count, DescendingByValue),
                series("Average salary by department", "Department", "Salary", Mean, DescendingByValue),
                series("Average age by position", "Position", "Age", Mean, DescendingByValue),
                series("Hires over time", "Hire_Date", "Name", Count, AscendingByKey),
            ],
        },
    }
}
