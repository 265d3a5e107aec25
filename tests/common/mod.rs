//! Fixtures shared by the integration tests.
#![allow(dead_code)]

use std::io::Write;
use std::path::PathBuf;

use chrono::NaiveDate;
use tabular_dash::data::schema::{ColumnKind, ColumnSpec, Schema};
use tempfile::TempDir;

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

/// `Product, Category, Date, Total` — the two-row scenario table.
pub fn scenario_schema() -> Schema {
    Schema::new(vec![
        ColumnSpec::new("Product", ColumnKind::Categorical),
        ColumnSpec::new("Category", ColumnKind::Categorical),
        ColumnSpec::new("Date", ColumnKind::Date),
        ColumnSpec::new("Total", ColumnKind::Numeric),
    ])
    .unwrap()
}

pub const SCENARIO_CSV: &str = "\
Product,Category,Date,Total
A,X,2024-01-01,100
B,X,2024-01-02,50
";

/// Rows in the `sales` preset layout.
pub struct SalesFixture;

impl SalesFixture {
    pub fn headers() -> [&'static str; 6] {
        [
            "Product_Name",
            "Category",
            "Price",
            "Quantity_Sold",
            "Total_Sales",
            "Date_Sold",
        ]
    }

    /// (product, category, price, quantity, date)
    pub fn data() -> Vec<(&'static str, &'static str, f64, f64, &'static str)> {
        vec![
            ("Laptop", "Electronics", 4500.0, 2.0, "2024-01-05"),
            ("Mouse", "Accessories", 80.0, 10.0, "2024-01-05"),
            ("Smartphone", "Electronics", 2500.0, 3.0, "2024-01-07"),
            ("Keyboard", "Accessories", 150.0, 4.0, "2024-01-02"),
            ("Laptop", "Electronics", 4300.0, 1.0, "2024-01-09"),
            ("Desk Chair", "Furniture", 900.0, 2.0, "2024-01-07"),
            ("Mouse", "Accessories", 75.0, 6.0, "2024-01-11"),
            ("Bookshelf", "Furniture", 600.0, 1.0, "2024-01-03"),
        ]
    }

    pub fn csv() -> String {
        let mut out = Self::headers().join(",");
        out.push('\n');
        for (product, category, price, qty, date) in Self::data() {
            out.push_str(&format!(
                "{product},{category},{price},{qty},{},{date}\n",
                price * qty
            ));
        }
        out
    }

    pub fn json() -> String {
        let rows: Vec<serde_json::Value> = Self::data()
            .into_iter()
            .map(|(product, category, price, qty, date)| {
                serde_json::json!({
                    "Product_Name": product,
                    "Category": category,
                    "Price": price,
                    "Quantity_Sold": qty,
                    "Total_Sales": price * qty,
                    "Date_Sold": date,
                })
            })
            .collect();
        serde_json::to_string(&rows).unwrap()
    }
}

/// A temporary directory holding fixture files.
pub struct TestDir {
    pub dir: TempDir,
}

impl TestDir {
    pub fn new() -> Self {
        TestDir {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }
}
