use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Date32Array, Float64Array, StringArray};
use arrow::datatypes::{DataType, Date32Type, Field, Schema};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate};
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a deterministic sales table in the `sales` dashboard layout.
#[derive(Parser)]
#[command(name = "generate_sample")]
struct Args {
    /// Number of sales rows
    #[arg(long, default_value_t = 200)]
    rows: usize,

    /// Output directory for sales_data.csv and sales_data.parquet
    #[arg(long, default_value = ".")]
    out: PathBuf,

    #[arg(long, default_value_t = 42)]
    seed: u64,
}

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    fn below(&mut self, n: usize) -> usize {
        (self.next_f64() * n as f64) as usize % n
    }
}

/// (product, category, list price)
const CATALOG: &[(&str, &str, f64)] = &[
    ("Laptop", "Electronics", 4500.0),
    ("Smartphone", "Electronics", 2500.0),
    ("Headphones", "Electronics", 350.0),
    ("Desk Chair", "Furniture", 900.0),
    ("Bookshelf", "Furniture", 600.0),
    ("Coffee Maker", "Appliances", 280.0),
    ("Blender", "Appliances", 190.0),
    ("Notebook", "Stationery", 25.0),
    ("Pen Set", "Stationery", 40.0),
];

struct Sale {
    product: &'static str,
    category: &'static str,
    price: f64,
    quantity: f64,
    date: NaiveDate,
}

fn generate(rows: usize, seed: u64) -> Result<Vec<Sale>> {
    let mut rng = SimpleRng::new(seed);
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).context("invalid start date")?;

    Ok((0..rows)
        .map(|_| {
            let (product, category, list) = CATALOG[rng.below(CATALOG.len())];
            // ±10% around list price, rounded to cents
            let price = (list * (0.9 + 0.2 * rng.next_f64()) * 100.0).round() / 100.0;
            Sale {
                product,
                category,
                price,
                quantity: (1 + rng.below(10)) as f64,
                date: start + Duration::days(rng.below(90) as i64),
            }
        })
        .collect())
}

fn write_csv(path: &Path, sales: &[Sale]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer.write_record([
        "Product_Name",
        "Category",
        "Price",
        "Quantity_Sold",
        "Total_Sales",
        "Date_Sold",
    ])?;
    for s in sales {
        writer.write_record([
            s.product.to_string(),
            s.category.to_string(),
            format!("{:.2}", s.price),
            format!("{}", s.quantity),
            format!("{:.2}", s.price * s.quantity),
            s.date.format("%Y-%m-%d").to_string(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, sales: &[Sale]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("Product_Name", DataType::Utf8, false),
        Field::new("Category", DataType::Utf8, false),
        Field::new("Price", DataType::Float64, false),
        Field::new("Quantity_Sold", DataType::Float64, false),
        Field::new("Total_Sales", DataType::Float64, false),
        Field::new("Date_Sold", DataType::Date32, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.product))),
            Arc::new(StringArray::from_iter_values(sales.iter().map(|s| s.category))),
            Arc::new(Float64Array::from_iter_values(sales.iter().map(|s| s.price))),
            Arc::new(Float64Array::from_iter_values(sales.iter().map(|s| s.quantity))),
            Arc::new(Float64Array::from_iter_values(
                sales.iter().map(|s| s.price * s.quantity),
            )),
            Arc::new(Date32Array::from_iter_values(
                sales.iter().map(|s| Date32Type::from_naive_date(s.date)),
            )),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let sales = generate(args.rows, args.seed)?;

    let csv_path = args.out.join("sales_data.csv");
    write_csv(&csv_path, &sales)?;
    let parquet_path = args.out.join("sales_data.parquet");
    write_parquet(&parquet_path, &sales)?;

    println!(
        "Wrote {} sales rows to {} and {}",
        sales.len(),
        csv_path.display(),
        parquet_path.display()
    );
    Ok(())
}
