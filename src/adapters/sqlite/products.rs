use super::{collect_rows, date_column, date_param, page, query_error, SqliteDatabase};
use crate::domain::error::LedgerError;
use crate::domain::product::{NewProduct, Product, ProductPatch};
use crate::ports::product_port::ProductRepository;
use rusqlite::{params, Connection, OptionalExtension};

const COLUMNS: &str = "id, name, yindeng_code, jinshu_code, custody_code, start_date, end_date, \
                       days_total, query_date, days_remaining, performance_benchmark, \
                       raise_target, raise_amount, raise_institutional, raise_retail";

pub struct SqliteProductRepository {
    db: SqliteDatabase,
}

impl SqliteProductRepository {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }
}

fn product_from_row(row: &rusqlite::Row<'_>) -> Result<Product, rusqlite::Error> {
    Ok(Product {
        id: row.get(0)?,
        name: row.get(1)?,
        yindeng_code: row.get(2)?,
        jinshu_code: row.get(3)?,
        custody_code: row.get(4)?,
        start_date: date_column(row, 5)?,
        end_date: date_column(row, 6)?,
        days_total: row.get(7)?,
        query_date: date_column(row, 8)?,
        days_remaining: row.get(9)?,
        performance_benchmark: row.get(10)?,
        raise_target: row.get(11)?,
        raise_amount: row.get(12)?,
        raise_institutional: row.get(13)?,
        raise_retail: row.get(14)?,
    })
}

fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Product>, LedgerError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM products WHERE id = ?1"),
        params![id],
        product_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn find_by_code(conn: &Connection, code: &str) -> Result<Option<Product>, LedgerError> {
    let code = code.trim();
    if code.is_empty() {
        return Ok(None);
    }
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM products WHERE yindeng_code = ?1"),
        params![code],
        product_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn insert(conn: &Connection, product: NewProduct) -> Result<Product, LedgerError> {
    conn.execute(
        "INSERT INTO products (name, yindeng_code, jinshu_code, custody_code,
                               start_date, end_date, days_total, query_date, days_remaining,
                               performance_benchmark, raise_target, raise_amount,
                               raise_institutional, raise_retail)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        params![
            product.name,
            product.yindeng_code,
            product.jinshu_code,
            product.custody_code,
            date_param(product.start_date),
            date_param(product.end_date),
            product.days_total,
            date_param(product.query_date),
            product.days_remaining,
            product.performance_benchmark,
            product.raise_target,
            product.raise_amount,
            product.raise_institutional,
            product.raise_retail,
        ],
    )
    .map_err(query_error)?;

    let id = conn.last_insert_rowid();
    tracing::debug!(id, name = %product.name, "inserted product");
    Ok(product.into_product(id))
}

/// Write every column of `product` over the row with the same id.
fn overwrite(conn: &Connection, product: &Product) -> Result<(), LedgerError> {
    conn.execute(
        "UPDATE products
            SET name = ?2, yindeng_code = ?3, jinshu_code = ?4, custody_code = ?5,
                start_date = ?6, end_date = ?7, days_total = ?8,
                query_date = ?9, days_remaining = ?10,
                performance_benchmark = ?11, raise_target = ?12, raise_amount = ?13,
                raise_institutional = ?14, raise_retail = ?15
          WHERE id = ?1",
        params![
            product.id,
            product.name,
            product.yindeng_code,
            product.jinshu_code,
            product.custody_code,
            date_param(product.start_date),
            date_param(product.end_date),
            product.days_total,
            date_param(product.query_date),
            product.days_remaining,
            product.performance_benchmark,
            product.raise_target,
            product.raise_amount,
            product.raise_institutional,
            product.raise_retail,
        ],
    )
    .map_err(query_error)?;

    tracing::debug!(id = product.id, "overwrote product");
    Ok(())
}

fn upsert(conn: &Connection, product: NewProduct) -> Result<Product, LedgerError> {
    let product = product.normalized();
    product.validate()?;

    let existing = match product.natural_code() {
        Some(code) => find_by_code(conn, code)?,
        None => None,
    };

    match existing {
        Some(existing) => {
            let merged = product.into_product(existing.id);
            overwrite(conn, &merged)?;
            Ok(merged)
        }
        None => insert(conn, product),
    }
}

impl ProductRepository for SqliteProductRepository {
    fn get(&self, id: i64) -> Result<Option<Product>, LedgerError> {
        let conn = self.db.connection()?;
        find_by_id(&conn, id)
    }

    fn get_by_natural_code(&self, code: &str) -> Result<Option<Product>, LedgerError> {
        let conn = self.db.connection()?;
        find_by_code(&conn, code)
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Product>, LedgerError> {
        let conn = self.db.connection()?;
        let (offset, limit) = page(offset, limit);
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {COLUMNS} FROM products ORDER BY id LIMIT ?1 OFFSET ?2"
            ))
            .map_err(query_error)?;
        let rows = stmt
            .query_map(params![limit, offset], product_from_row)
            .map_err(query_error)?;
        collect_rows(rows)
    }

    fn list_all(&self) -> Result<Vec<Product>, LedgerError> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM products ORDER BY id"))
            .map_err(query_error)?;
        let rows = stmt.query_map([], product_from_row).map_err(query_error)?;
        collect_rows(rows)
    }

    fn create(&self, product: NewProduct) -> Result<Product, LedgerError> {
        let product = product.normalized();
        product.validate()?;

        let conn = self.db.connection()?;
        if let Some(code) = product.natural_code() {
            if find_by_code(&conn, code)?.is_some() {
                return Err(LedgerError::constraint(format!(
                    "yindeng code {code} already exists"
                )));
            }
        }
        insert(&conn, product)
    }

    fn update(&self, id: i64, patch: ProductPatch) -> Result<Option<Product>, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        let Some(mut product) = find_by_id(&tx, id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut product)?;
        overwrite(&tx, &product)?;

        tx.commit().map_err(query_error)?;
        Ok(Some(product))
    }

    fn upsert_by_natural_code(&self, product: NewProduct) -> Result<Product, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;
        let stored = upsert(&tx, product)?;
        tx.commit().map_err(query_error)?;
        Ok(stored)
    }

    fn upsert_batch(&self, products: Vec<NewProduct>) -> Result<Vec<Product>, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        let mut stored = Vec::with_capacity(products.len());
        for product in products {
            stored.push(upsert(&tx, product)?);
        }

        tx.commit().map_err(query_error)?;
        tracing::debug!(rows = stored.len(), "committed product batch");
        Ok(stored)
    }

    fn delete(&self, id: i64) -> Result<bool, LedgerError> {
        let mut conn = self.db.connection()?;
        let tx = conn.transaction().map_err(query_error)?;

        let referencing: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM transactions WHERE product_id = ?1",
                params![id],
                |row| row.get(0),
            )
            .map_err(query_error)?;
        if referencing > 0 {
            return Err(LedgerError::constraint(format!(
                "product {id} is referenced by {referencing} transaction(s)"
            )));
        }

        let removed = tx
            .execute("DELETE FROM products WHERE id = ?1", params![id])
            .map_err(query_error)?;
        tx.commit().map_err(query_error)?;
        Ok(removed > 0)
    }
}
