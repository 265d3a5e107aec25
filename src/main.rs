use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, ValueEnum};

use tabular_dash::data::model::Value;
use tabular_dash::data::schema::DEFAULT_DATE_FORMAT;
use tabular_dash::report::render_rows;
use tabular_dash::{DashboardConfig, Session, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(name = "tabular-dash")]
#[command(version)]
#[command(about = "Filter a sales or HR table and print its dashboard numbers")]
struct Cli {
    /// Input file (.csv, .json or .parquet)
    #[arg(default_value = "sales_data.csv")]
    file: PathBuf,

    /// Built-in dashboard layout
    #[arg(short, long, value_enum, default_value_t = Variant::Sales)]
    variant: Variant,

    /// JSON dashboard config; overrides --variant
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep only COLUMN=VALUE (repeat to allow several values per column)
    #[arg(short, long = "select", value_name = "COLUMN=VALUE")]
    selections: Vec<String>,

    /// First day of the date range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    from: Option<NaiveDate>,

    /// Last day of the date range (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date)]
    to: Option<NaiveDate>,

    /// Print the first N matching rows as a table
    #[arg(long, default_value_t = 0)]
    rows: usize,

    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

fn parse_date(s: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(s, DEFAULT_DATE_FORMAT).map_err(|e| format!("{e} (expected YYYY-MM-DD)"))
}

/// Group `COLUMN=VALUE` arguments by column.
fn parse_selections(args: &[String]) -> Result<BTreeMap<String, BTreeSet<Value>>> {
    let mut out: BTreeMap<String, BTreeSet<Value>> = BTreeMap::new();
    for arg in args {
        let Some((col, val)) = arg.split_once('=') else {
            bail!("--select expects COLUMN=VALUE, got '{arg}'");
        };
        out.entry(col.trim().to_string())
            .or_default()
            .insert(Value::from(val.trim()));
    }
    Ok(out)
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::preset(cli.variant),
    };

    let mut session = Session::new(config);
    session
        .load(&cli.file)
        .with_context(|| format!("loading {}", cli.file.display()))?;

    if !session.has_data() {
        if let Some(msg) = &session.status_message {
            eprintln!("{msg}");
        }
        println!("No data loaded.");
        return Ok(());
    }

    let mut filters = session.filters().clone();
    filters.categories.extend(parse_selections(&cli.selections)?);
    if cli.from.is_some() || cli.to.is_some() {
        let Some((lo, hi)) = session.date_bounds()? else {
            bail!("--from/--to given but the dataset has no dates");
        };
        filters = filters.with_date_range(cli.from.unwrap_or(lo), cli.to.unwrap_or(hi));
    }
    session.set_filters(filters).context("applying filters")?;

    let Some(report) = session.report()? else {
        bail!("session lost its dataset");
    };

    match cli.format {
        OutputFormat::Text => {
            print!("{report}");
            if cli.rows > 0 {
                if let Some(view) = session.view() {
                    println!();
                    println!("{}", render_rows(&view, cli.rows)?);
                }
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }
    Ok(())
}
