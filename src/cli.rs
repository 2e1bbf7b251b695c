//! CLI definition and dispatch.

use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::csv_adapter::{CsvRowSink, CsvRowSource};
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::sqlite::{self, SqliteDatabase};
use crate::domain::amount::{parse_amount, parse_text};
use crate::domain::asset::{Asset, AssetPatch, NewAsset};
use crate::domain::dates::{format_date, parse_date, parse_optional_date};
use crate::domain::error::LedgerError;
use crate::domain::ingest::{export_products, import_products};
use crate::domain::product::{Product, ProductField, ProductPatch};
use crate::domain::tenor_query::query_as_of;
use crate::domain::transaction::{NewTransaction, Transaction, TransactionPatch};
use crate::logging::init_logging;
use crate::ports::asset_port::AssetRepository;
use crate::ports::config_port::ConfigPort;
use crate::ports::product_port::ProductRepository;
use crate::ports::transaction_port::TransactionRepository;

pub const DEFAULT_DB_PATH: &str = "fund_report.db";
pub const DEFAULT_DATA_DIR: &str = "data";
pub const NOT_FOUND_EXIT: u8 = 5;

#[derive(Parser, Debug)]
#[command(
    name = "wealthledger",
    about = "Wealth product ledger: products, assets and investment transactions"
)]
pub struct Cli {
    /// SQLite database file (overrides `[database] path`)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,
    /// INI configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
    #[arg(short, long, global = true)]
    pub verbose: bool,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create the database tables
    Init,
    /// Import products from a CSV file, upserting by yindeng code
    Import {
        file: PathBuf,
        /// Stamp the remaining-days snapshot as of this date
        #[arg(long)]
        query_date: Option<String>,
    },
    /// Export products to a CSV file
    Export {
        file: PathBuf,
        /// Only products whose snapshot was taken on this date
        #[arg(long)]
        query_date: Option<String>,
    },
    /// Remaining tenor of every product as of a date
    Query {
        #[arg(long)]
        query_date: String,
    },
    /// Manage products
    Product {
        #[command(subcommand)]
        action: ProductCommand,
    },
    /// Manage assets
    Asset {
        #[command(subcommand)]
        action: AssetCommand,
    },
    /// Manage investment transactions
    Transaction {
        #[command(subcommand)]
        action: TransactionCommand,
    },
}

#[derive(Args, Debug, Clone, Copy)]
pub struct Paging {
    #[arg(long, default_value_t = 0)]
    pub offset: usize,
    #[arg(long, default_value_t = 100)]
    pub limit: usize,
}

impl Paging {
    /// Page through rows that were filtered in memory.
    pub fn apply<T>(self, rows: Vec<T>) -> Vec<T> {
        rows.into_iter().skip(self.offset).take(self.limit).collect()
    }
}

#[derive(Subcommand, Debug)]
pub enum ProductCommand {
    List {
        #[command(flatten)]
        paging: Paging,
    },
    Get {
        id: i64,
    },
    /// Change fields with repeated `--set field=value`
    Update {
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum AssetCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long = "type")]
        asset_type: String,
        #[arg(long)]
        code: Option<String>,
        #[arg(long)]
        issuer: Option<String>,
        #[arg(long)]
        industry: Option<String>,
        #[arg(long)]
        region: Option<String>,
        /// Defaults to today
        #[arg(long)]
        created_date: Option<String>,
    },
    Get {
        id: i64,
    },
    List {
        #[command(flatten)]
        paging: Paging,
    },
    Update {
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
    },
    Delete {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransactionCommand {
    Create {
        /// Yindeng code of the product
        #[arg(long)]
        product_code: String,
        /// Code of the asset
        #[arg(long)]
        asset_code: String,
        #[arg(long)]
        investment_date: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        maturity_date: Option<String>,
        #[arg(long)]
        interest_rate: Option<String>,
        #[arg(long)]
        unit_net_price: Option<String>,
        #[arg(long)]
        unit_full_price: Option<String>,
        #[arg(long)]
        settlement_amount: Option<String>,
    },
    Get {
        id: i64,
    },
    List {
        #[command(flatten)]
        paging: Paging,
        #[arg(long, conflicts_with_all = ["asset_id", "from"])]
        product_id: Option<i64>,
        #[arg(long, conflicts_with = "from")]
        asset_id: Option<i64>,
        /// First investment date, inclusive
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Last investment date, inclusive
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    Update {
        id: i64,
        #[arg(long = "set", value_name = "FIELD=VALUE", value_parser = parse_assignment, required = true)]
        set: Vec<(String, String)>,
    },
    Delete {
        id: i64,
    },
}

/// Result of a command that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    NotFound,
}

pub fn run(cli: Cli) -> ExitCode {
    match execute(cli) {
        Ok(Outcome::Done) => ExitCode::SUCCESS,
        Ok(Outcome::NotFound) => ExitCode::from(NOT_FOUND_EXIT),
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load configuration, open the database and dispatch the command.
pub fn execute(cli: Cli) -> Result<Outcome, LedgerError> {
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => FileConfigAdapter::empty(),
    };
    init_logging(cli.verbose, config.get_string("log", "level").as_deref());

    let db_path = resolve_db_path(cli.db.as_deref(), &config);
    let db = SqliteDatabase::open(&db_path, sqlite::pool_size(&config)?)?;
    db.initialize_schema()?;

    match cli.command {
        Command::Init => {
            eprintln!("Initialized database at {db_path}");
            Ok(Outcome::Done)
        }
        Command::Import { file, query_date } => {
            let data_dir = config
                .get_string("import", "data_dir")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string());
            let path = resolve_import_path(&file, Path::new(&data_dir));
            let source = CsvRowSource::open(&path)?;
            let count = import_products(&source, &db.products(), query_date.as_deref())?;
            eprintln!("Imported {count} products from {}", path.display());
            Ok(Outcome::Done)
        }
        Command::Export { file, query_date } => {
            let sink = CsvRowSink::create(&file)?;
            let count = export_products(&db.products(), &sink, query_date.as_deref())?;
            eprintln!("Exported {count} products to {}", file.display());
            Ok(Outcome::Done)
        }
        Command::Query { query_date } => {
            let views = query_as_of(&db.products(), &query_date)?;
            println!("id\tname\tyindeng_code\tend_date\tremaining_days");
            for view in &views {
                let p = &view.product;
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    p.id,
                    p.name,
                    p.field_text(ProductField::YindengCode),
                    p.field_text(ProductField::EndDate),
                    view.remaining_days
                );
            }
            eprintln!("{} products as of {}", views.len(), query_date);
            Ok(Outcome::Done)
        }
        Command::Product { action } => run_product(&db.products(), action),
        Command::Asset { action } => run_asset(&db.assets(), action),
        Command::Transaction { action } => run_transaction(&db, action),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, LedgerError> {
    FileConfigAdapter::from_file(path).map_err(|e| LedgerError::ConfigParse {
        file: path.display().to_string(),
        reason: e.to_string(),
    })
}

/// `--db` flag, then `[database] path`, then [`DEFAULT_DB_PATH`].
pub fn resolve_db_path(flag: Option<&Path>, config: &dyn ConfigPort) -> String {
    match flag {
        Some(path) => path.display().to_string(),
        None => config
            .get_string("database", "path")
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DB_PATH.to_string()),
    }
}

/// A relative path that does not exist is looked up under `data_dir`.
pub fn resolve_import_path(file: &Path, data_dir: &Path) -> PathBuf {
    if file.exists() || file.is_absolute() {
        return file.to_path_buf();
    }
    let candidate = data_dir.join(file);
    if candidate.exists() {
        tracing::debug!(path = %candidate.display(), "import file found under data dir");
        candidate
    } else {
        file.to_path_buf()
    }
}

/// clap value parser for `field=value`.
pub fn parse_assignment(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((field, value)) if !field.trim().is_empty() => {
            Ok((field.trim().to_string(), value.to_string()))
        }
        _ => Err(format!("expected FIELD=VALUE, got {raw:?}")),
    }
}

fn not_found(entity: &str, id: i64) -> Outcome {
    eprintln!("{entity} {id} not found");
    Outcome::NotFound
}

fn run_product(
    products: &dyn ProductRepository,
    action: ProductCommand,
) -> Result<Outcome, LedgerError> {
    match action {
        ProductCommand::List { paging } => {
            for p in products.list(paging.offset, paging.limit)? {
                println!("{}", product_line(&p));
            }
            Ok(Outcome::Done)
        }
        ProductCommand::Get { id } => match products.get(id)? {
            Some(p) => {
                for field in ProductField::ALL {
                    println!("{}: {}", field, p.field_text(field));
                }
                Ok(Outcome::Done)
            }
            None => Ok(not_found("product", id)),
        },
        ProductCommand::Update { id, set } => {
            let mut patch = ProductPatch::default();
            for (field, value) in &set {
                patch.set(field, value)?;
            }
            match products.update(id, patch)? {
                Some(p) => {
                    println!("{}", product_line(&p));
                    Ok(Outcome::Done)
                }
                None => Ok(not_found("product", id)),
            }
        }
        ProductCommand::Delete { id } => {
            if products.delete(id)? {
                eprintln!("Deleted product {id}");
                Ok(Outcome::Done)
            } else {
                Ok(not_found("product", id))
            }
        }
    }
}

fn run_asset(assets: &dyn AssetRepository, action: AssetCommand) -> Result<Outcome, LedgerError> {
    match action {
        AssetCommand::Create {
            name,
            asset_type,
            code,
            issuer,
            industry,
            region,
            created_date,
        } => {
            let mut asset = NewAsset::new(name, asset_type);
            asset.code = code.as_deref().and_then(parse_text);
            asset.issuer = issuer.as_deref().and_then(parse_text);
            asset.industry = industry.as_deref().and_then(parse_text);
            asset.region = region.as_deref().and_then(parse_text);
            asset.created_date = created_date.as_deref().map(parse_date).transpose()?;

            let stored = assets.create(asset)?;
            println!("{}", asset_line(&stored));
            Ok(Outcome::Done)
        }
        AssetCommand::Get { id } => match assets.get(id)? {
            Some(a) => {
                println!("{}", asset_line(&a));
                Ok(Outcome::Done)
            }
            None => Ok(not_found("asset", id)),
        },
        AssetCommand::List { paging } => {
            for a in assets.list(paging.offset, paging.limit)? {
                println!("{}", asset_line(&a));
            }
            Ok(Outcome::Done)
        }
        AssetCommand::Update { id, set } => {
            let mut patch = AssetPatch::default();
            for (field, value) in &set {
                patch.set(field, value)?;
            }
            match assets.update(id, patch)? {
                Some(a) => {
                    println!("{}", asset_line(&a));
                    Ok(Outcome::Done)
                }
                None => Ok(not_found("asset", id)),
            }
        }
        AssetCommand::Delete { id } => {
            if assets.delete(id)? {
                eprintln!("Deleted asset {id}");
                Ok(Outcome::Done)
            } else {
                Ok(not_found("asset", id))
            }
        }
    }
}

fn run_transaction(
    db: &SqliteDatabase,
    action: TransactionCommand,
) -> Result<Outcome, LedgerError> {
    let transactions = db.transactions();
    match action {
        TransactionCommand::Create {
            product_code,
            asset_code,
            investment_date,
            quantity,
            maturity_date,
            interest_rate,
            unit_net_price,
            unit_full_price,
            settlement_amount,
        } => {
            let product = db.products().get_by_natural_code(&product_code)?;
            let asset = db.assets().get_by_code(&asset_code)?;
            let (product, asset) = match (product, asset) {
                (Some(p), Some(a)) => (p, a),
                (product, asset) => {
                    if product.is_none() {
                        eprintln!("product with code {product_code} not found");
                    }
                    if asset.is_none() {
                        eprintln!("asset with code {asset_code} not found");
                    }
                    return Ok(Outcome::NotFound);
                }
            };

            let quantity = parse_amount(&quantity)?.ok_or_else(|| LedgerError::missing("quantity"))?;
            let mut tx =
                NewTransaction::new(product.id, asset.id, parse_date(&investment_date)?, quantity);
            tx.maturity_date = optional(maturity_date, parse_optional_date)?;
            tx.interest_rate = optional(interest_rate, parse_amount)?;
            tx.unit_net_price = optional(unit_net_price, parse_amount)?;
            tx.unit_full_price = optional(unit_full_price, parse_amount)?;
            tx.settlement_amount = optional(settlement_amount, parse_amount)?;

            let stored = transactions.create(tx)?;
            println!("{}", transaction_line(&stored));
            Ok(Outcome::Done)
        }
        TransactionCommand::Get { id } => match transactions.get(id)? {
            Some(t) => {
                println!("{}", transaction_line(&t));
                Ok(Outcome::Done)
            }
            None => Ok(not_found("transaction", id)),
        },
        TransactionCommand::List {
            paging,
            product_id,
            asset_id,
            from,
            to,
        } => {
            let rows = match (product_id, asset_id, from, to) {
                (Some(product_id), _, _, _) => {
                    paging.apply(transactions.list_by_product(product_id)?)
                }
                (_, Some(asset_id), _, _) => paging.apply(transactions.list_by_asset(asset_id)?),
                (_, _, Some(from), Some(to)) => paging.apply(
                    transactions.list_by_date_range(parse_date(&from)?, parse_date(&to)?)?,
                ),
                _ => transactions.list(paging.offset, paging.limit)?,
            };
            for t in &rows {
                println!("{}", transaction_line(t));
            }
            Ok(Outcome::Done)
        }
        TransactionCommand::Update { id, set } => {
            let mut patch = TransactionPatch::default();
            for (field, value) in &set {
                patch.set(field, value)?;
            }
            match transactions.update(id, patch)? {
                Some(t) => {
                    println!("{}", transaction_line(&t));
                    Ok(Outcome::Done)
                }
                None => Ok(not_found("transaction", id)),
            }
        }
        TransactionCommand::Delete { id } => {
            if transactions.delete(id)? {
                eprintln!("Deleted transaction {id}");
                Ok(Outcome::Done)
            } else {
                Ok(not_found("transaction", id))
            }
        }
    }
}

fn optional<T>(
    raw: Option<String>,
    parse: fn(&str) -> Result<Option<T>, LedgerError>,
) -> Result<Option<T>, LedgerError> {
    Ok(match raw {
        Some(raw) => parse(&raw)?,
        None => None,
    })
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or("")
}

fn number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn product_line(p: &Product) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        p.id,
        p.name,
        text(p.yindeng_code.as_deref()),
        p.field_text(ProductField::StartDate),
        p.field_text(ProductField::EndDate),
        p.days_total
    )
}

fn asset_line(a: &Asset) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
        a.id,
        a.name,
        text(a.code.as_deref()),
        a.asset_type,
        text(a.issuer.as_deref()),
        text(a.industry.as_deref()),
        text(a.region.as_deref()),
        format_date(a.created_date)
    )
}

fn transaction_line(t: &Transaction) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}\t{}",
        t.id,
        t.product_id,
        t.asset_id,
        format_date(t.investment_date),
        t.quantity,
        number(t.unit_full_price),
        number(t.settlement_amount)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assignment_splits_on_first_equals() {
        assert_eq!(
            parse_assignment("name=A=B").unwrap(),
            ("name".to_string(), "A=B".to_string())
        );
        assert_eq!(
            parse_assignment(" end_date =").unwrap(),
            ("end_date".to_string(), String::new())
        );
        assert!(parse_assignment("name").is_err());
        assert!(parse_assignment("=x").is_err());
    }

    #[test]
    fn paging_applies_to_filtered_rows() {
        let paging = Paging {
            offset: 1,
            limit: 2,
        };
        assert_eq!(paging.apply(vec![10, 20, 30, 40]), vec![20, 30]);
        assert_eq!(paging.apply(vec![10]), Vec::<i32>::new());
    }

    #[test]
    fn db_path_precedence() {
        let config = FileConfigAdapter::from_string("[database]\npath = from_config.db\n").unwrap();
        assert_eq!(
            resolve_db_path(Some(Path::new("flag.db")), &config),
            "flag.db"
        );
        assert_eq!(resolve_db_path(None, &config), "from_config.db");
        assert_eq!(
            resolve_db_path(None, &FileConfigAdapter::empty()),
            DEFAULT_DB_PATH
        );
    }

    #[test]
    fn import_path_falls_back_to_data_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::write(dir.path().join("batch.csv"), "name\n").unwrap();

        let resolved = resolve_import_path(Path::new("batch.csv"), dir.path());
        assert_eq!(resolved, dir.path().join("batch.csv"));

        let missing = resolve_import_path(Path::new("nowhere.csv"), dir.path());
        assert_eq!(missing, PathBuf::from("nowhere.csv"));
    }

    #[test]
    fn cli_parses_update_pairs() {
        let cli = Cli::try_parse_from([
            "wealthledger",
            "--db",
            "x.db",
            "product",
            "update",
            "3",
            "--set",
            "name=New",
            "--set",
            "end_date=2026-01-01",
        ])
        .unwrap();
        match cli.command {
            Command::Product {
                action: ProductCommand::Update { id, set },
            } => {
                assert_eq!(id, 3);
                assert_eq!(set.len(), 2);
                assert_eq!(set[1], ("end_date".to_string(), "2026-01-01".to_string()));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_rejects_update_without_set() {
        assert!(Cli::try_parse_from(["wealthledger", "asset", "update", "1"]).is_err());
    }

    #[test]
    fn cli_date_range_requires_both_ends() {
        assert!(
            Cli::try_parse_from(["wealthledger", "transaction", "list", "--from", "2025-01-01"])
                .is_err()
        );
    }

    #[test]
    fn cli_pages_filtered_transaction_lists() {
        let cli = Cli::try_parse_from([
            "wealthledger",
            "transaction",
            "list",
            "--product-id",
            "7",
            "--offset",
            "5",
            "--limit",
            "10",
        ])
        .unwrap();
        match cli.command {
            Command::Transaction {
                action:
                    TransactionCommand::List {
                        paging, product_id, ..
                    },
            } => {
                assert_eq!(product_id, Some(7));
                assert_eq!((paging.offset, paging.limit), (5, 10));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
