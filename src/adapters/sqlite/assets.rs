use super::{collect_rows, page, query_error, required_date_column, SqliteDatabase};
use crate::domain::asset::{Asset, AssetPatch, NewAsset};
use crate::domain::dates::format_date;
use crate::domain::error::LedgerError;
use crate::ports::asset_port::AssetRepository;
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, name, code, asset_type, issuer, industry, region, created_date";

pub struct SqliteAssetRepository {
    db: SqliteDatabase,
}

impl SqliteAssetRepository {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

fn asset_from_row(row: &rusqlite::Row<'_>) -> Result<Asset, rusqlite::Error> {
    Ok(Asset {
        id: row.get(0)?,
        name: row.get(1)?,
        code: row.get(2)?,
        asset_type: row.get(3)?,
        issuer: row.get(4)?,
        industry: row.get(5)?,
        region: row.get(6)?,
        created_date: required_date_column(row, 7)?,
    })
}

fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Asset>, LedgerError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM assets WHERE id = ?1"),
        params![id],
        asset_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Asset>, LedgerError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM assets WHERE code = ?1"),
        params![code],
        asset_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn today() -> chrono::NaiveDate {
    chrono::Local::now().date_naive()
}

impl AssetRepository for SqliteAssetRepository {
    fn create(&self, asset: NewAsset) -> Result<Asset, LedgerError> {
        let asset = asset.normalized();
        asset.validate()?;

        let conn = self.db.connection()?;
        if let Some(code) = asset.code.as_deref() {
            if find_by_code(&conn, code)?.is_some() {
                return Err(LedgerError::constraint(format!(
                    "asset code {code} already exists"
                )));
            }
        }

        let created_date = asset.created_date.unwrap_or_else(today);
        conn.execute(
            "INSERT INTO assets (name, code, asset_type, issuer, industry, region, created_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                asset.name,
                asset.code,
                asset.asset_type,
                asset.issuer,
                asset.industry,
                asset.region,
                format_date(created_date),
            ],
        )
        .map_err(query_error)?;

        let id = conn.last_insert_rowid();
        tracing::debug!(id, name = %asset.name, "inserted asset");
        Ok(asset.into_asset(id, created_date))
    }

    fn get(&self, id: i64) -> Result<Option<Asset>, LedgerError> {
        let conn = self.db.connection()?;
        find_by_id(&conn, id)
    }

    fn get_by_code(&self, code: &str) -> Result<Option<Asset>, LedgerError> {
        let conn = self.db.connection()?;
        find_by_code(&conn, code)
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Asset>, LedgerError> {
        let conn = self.db.connection()?;
        let (offset, limit) = page(offset, limit);
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM assets ORDER BY id LIMIT ?1 OFFSET ?2"
            ))
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![limit, offset], asset_from_row)
            .map_err(query_error)?;
        collect_rows(rows)
    }

    fn update(&self, id: i64, patch: AssetPatch) -> Result<Option<Asset>, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        let Some(mut asset) = find_by_id(&tx, id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut asset)?;

        tx.execute(
            "UPDATE assets
                SET name = ?2, code = ?3, asset_type = ?4, issuer = ?5,
                    industry = ?6, region = ?7, created_date = ?8
              WHERE id = ?1",
            params![
                asset.id,
                asset.name,
                asset.code,
                asset.asset_type,
                asset.issuer,
                asset.industry,
                asset.region,
                format_date(asset.created_date),
            ],
        )
        .map_err(query_error)?;

        tx.commit().map_err(query_error)?;
        tracing::debug!(id, "updated asset");
        Ok(Some(asset))
    }

    fn delete(&self, id: i64) -> Result<bool, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        let referencing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE asset_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        if referencing > 0 {
            return Err(LedgerError::constraint(format!(
                "asset {id} is referenced by {referencing} transaction(s)"
            )));
        }

        let removed = tx
            .execute("DELETE FROM assets WHERE id = ?1", params![id])
            .map_err(query_error)?;
        tx.commit().map_err(query_error)?;
        Ok(removed > 0)
    }
}
