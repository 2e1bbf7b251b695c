//! SQLite storage: an r2d2 pool of rusqlite connections shared by the
//! product, asset and transaction repositories.
//!
//! Each repository call checks a connection out of the pool and hands it back
//! when the guard drops, on success and on error alike. Multi-statement writes
//! run inside a rusqlite transaction that rolls back unless committed.

mod assets;
mod products;
mod transactions;

pub use assets::SqliteAssetRepository;
pub use products::SqliteProductRepository;
pub use transactions::SqliteTransactionRepository;

use crate::domain::dates::{format_date, CANONICAL_FORMAT};
use crate::domain::error::LedgerError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    yindeng_code TEXT,
    jinshu_code TEXT,
    custody_code TEXT,
    start_date TEXT,
    end_date TEXT,
    days_total INTEGER NOT NULL DEFAULT 0,
    query_date TEXT,
    days_remaining INTEGER,
    performance_benchmark REAL,
    raise_target REAL,
    raise_amount REAL,
    raise_institutional REAL,
    raise_retail REAL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_products_yindeng_code
    ON products(yindeng_code) WHERE yindeng_code IS NOT NULL;
CREATE INDEX IF NOT EXISTS ix_products_name ON products(name);

CREATE TABLE IF NOT EXISTS assets (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    code TEXT,
    asset_type TEXT NOT NULL,
    issuer TEXT,
    industry TEXT,
    region TEXT,
    created_date TEXT NOT NULL
);
CREATE UNIQUE INDEX IF NOT EXISTS ux_assets_code
    ON assets(code) WHERE code IS NOT NULL;

CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_id INTEGER NOT NULL REFERENCES products(id),
    asset_id INTEGER NOT NULL REFERENCES assets(id),
    investment_date TEXT NOT NULL,
    maturity_date TEXT,
    interest_rate REAL,
    quantity REAL NOT NULL,
    unit_net_price REAL,
    unit_full_price REAL,
    settlement_amount REAL
);
CREATE INDEX IF NOT EXISTS ix_transactions_product ON transactions(product_id);
CREATE INDEX IF NOT EXISTS ix_transactions_asset ON transactions(asset_id);
CREATE INDEX IF NOT EXISTS ix_transactions_investment_date ON transactions(investment_date);
";

pub const DEFAULT_POOL_SIZE: u32 = 4;

/// Connection factory injected into every repository.
#[derive(Clone)]
pub struct SqliteDatabase {
    pool: Pool<SqliteConnectionManager>,
}

impl SqliteDatabase {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, LedgerError> {
        let db_path =
            config
                .get_string("database", "path")
                .ok_or_else(|| LedgerError::ConfigMissing {
                    section: "database".into(),
                    key: "path".into(),
                })?;

        Self::open(&db_path, pool_size(config)?)
    }

    pub fn open(path: &str, pool_size: u32) -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::file(path).with_init(enable_foreign_keys);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_error)?;

        tracing::debug!(path, pool_size, "opened sqlite pool");
        Ok(Self { pool })
    }

    /// A private in-memory database. The pool holds a single connection that
    /// is never recycled, so the data lives as long as the pool.
    pub fn in_memory() -> Result<Self, LedgerError> {
        let manager = SqliteConnectionManager::memory().with_init(enable_foreign_keys);
        let pool = Pool::builder()
            .max_size(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .build(manager)
            .map_err(pool_error)?;

        Ok(Self { pool })
    }

    pub fn initialize_schema(&self) -> Result<(), LedgerError> {
        let conn = self.connection()?;
        conn.execute_batch(SCHEMA).map_err(query_error)?;
        Ok(())
    }

    pub fn products(&self) -> SqliteProductRepository {
        SqliteProductRepository::new(self.clone())
    }

    pub fn assets(&self) -> SqliteAssetRepository {
        SqliteAssetRepository::new(self.clone())
    }

    pub fn transactions(&self) -> SqliteTransactionRepository {
        SqliteTransactionRepository::new(self.clone())
    }

    pub(crate) fn connection(
        &self,
    ) -> Result<PooledConnection<SqliteConnectionManager>, LedgerError> {
        self.pool.get().map_err(pool_error)
    }
}

/// `[database] pool_size`, defaulting to [`DEFAULT_POOL_SIZE`].
pub fn pool_size(config: &dyn ConfigPort) -> Result<u32, LedgerError> {
    let size = config.get_int("database", "pool_size", i64::from(DEFAULT_POOL_SIZE));
    u32::try_from(size)
        .ok()
        .filter(|size| *size >= 1)
        .ok_or_else(|| LedgerError::ConfigInvalid {
            section: "database".into(),
            key: "pool_size".into(),
            reason: format!("pool_size must be a positive integer, got {size}"),
        })
}

fn enable_foreign_keys(conn: &mut rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")
}

pub(crate) fn pool_error(e: r2d2::Error) -> LedgerError {
    LedgerError::Database {
        reason: e.to_string(),
    }
}

/// SQLite constraint failures surface as `ConstraintViolation`; everything
/// else is a query error.
pub(crate) fn query_error(e: rusqlite::Error) -> LedgerError {
    match &e {
        rusqlite::Error::SqliteFailure(failure, _)
            if failure.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            LedgerError::ConstraintViolation {
                reason: e.to_string(),
            }
        }
        _ => LedgerError::DatabaseQuery {
            reason: e.to_string(),
        },
    }
}

pub(crate) fn date_param(date: Option<NaiveDate>) -> Option<String> {
    date.map(format_date)
}

pub(crate) fn date_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<Option<NaiveDate>, rusqlite::Error> {
    let raw: Option<String> = row.get(idx)?;
    raw.map(|s| {
        NaiveDate::parse_from_str(&s, CANONICAL_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                idx,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })
    })
    .transpose()
}

pub(crate) fn required_date_column(
    row: &rusqlite::Row<'_>,
    idx: usize,
) -> Result<NaiveDate, rusqlite::Error> {
    date_column(row, idx)?.ok_or(rusqlite::Error::InvalidColumnType(
        idx,
        "date".into(),
        rusqlite::types::Type::Null,
    ))
}

/// Collect mapped rows, converting the first failure.
pub(crate) fn collect_rows<T>(
    rows: impl Iterator<Item = Result<T, rusqlite::Error>>,
) -> Result<Vec<T>, LedgerError> {
    rows.collect::<Result<Vec<_>, _>>().map_err(query_error)
}

/// SQLite LIMIT/OFFSET values; `usize::MAX` saturates.
pub(crate) fn page(offset: usize, limit: usize) -> (i64, i64) {
    (
        i64::try_from(offset).unwrap_or(i64::MAX),
        i64::try_from(limit).unwrap_or(i64::MAX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MapConfig(Vec<(&'static str, &'static str, String)>);

    impl ConfigPort for MapConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.0
                .iter()
                .find(|(s, k, _)| *s == section && *k == key)
                .map(|(_, _, v)| v.to_string())
        }
        fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
            self.get_string(section, key)
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }
    }

    #[test]
    fn from_config_missing_path() {
        let result = SqliteDatabase::from_config(&MapConfig(vec![]));
        match result {
            Err(LedgerError::ConfigMissing { section, key }) => {
                assert_eq!(section, "database");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn from_config_rejects_empty_pool() {
        let config = MapConfig(vec![
            ("database", "path", ":memory:".to_string()),
            ("database", "pool_size", "0".to_string()),
        ]);
        assert!(matches!(
            SqliteDatabase::from_config(&config),
            Err(LedgerError::ConfigInvalid { key, .. }) if key == "pool_size"
        ));
    }

    #[test]
    fn from_config_opens_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let config = MapConfig(vec![("database", "path", path.display().to_string())]);
        let db = SqliteDatabase::from_config(&config).unwrap();
        db.initialize_schema().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn schema_is_idempotent() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.initialize_schema().unwrap();
        db.initialize_schema().unwrap();
    }

    #[test]
    fn foreign_keys_are_enforced() {
        let db = SqliteDatabase::in_memory().unwrap();
        db.initialize_schema().unwrap();
        let conn = db.connection().unwrap();
        let enabled: i64 = conn
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);

        let err = conn
            .execute(
                "INSERT INTO transactions (product_id, asset_id, investment_date, quantity)
                 VALUES (99, 99, '2025-08-01', 1.0)",
                [],
            )
            .map_err(query_error)
            .unwrap_err();
        assert!(matches!(err, LedgerError::ConstraintViolation { .. }));
    }

    #[test]
    fn page_saturates() {
        assert_eq!(page(0, usize::MAX), (0, i64::MAX));
        assert_eq!(page(5, 10), (5, 10));
    }
}
