use super::{
    collect_rows, date_column, date_param, page, query_error, required_date_column,
    SqliteDatabase,
};
use crate::domain::dates::format_date;
use crate::domain::error::LedgerError;
use crate::domain::transaction::{NewTransaction, Transaction, TransactionPatch};
use crate::ports::transaction_port::TransactionRepository;
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, ToSql};

const COLUMNS: &str = "id, product_id, asset_id, investment_date, maturity_date, interest_rate, \
                       quantity, unit_net_price, unit_full_price, settlement_amount";

pub struct SqliteTransactionRepository {
    db: SqliteDatabase,
}

impl SqliteTransactionRepository {
    pub fn new(db: SqliteDatabase) -> Self {
        Self { db }
    }

    fn select(
        &self,
        clause: &str,
        args: &[&dyn ToSql],
    ) -> Result<Vec<Transaction>, LedgerError> {
        let conn = self.db.connection()?;
        let mut stmt = conn
            .prepare(&format!("SELECT {COLUMNS} FROM transactions {clause}"))
            .map_err(query_error)?;
        let rows = stmt
            .query_map(args, transaction_from_row)
            .map_err(query_error)?;
        collect_rows(rows)
    }
}

fn transaction_from_row(row: &rusqlite::Row<'_>) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        product_id: row.get(1)?,
        asset_id: row.get(2)?,
        investment_date: required_date_column(row, 3)?,
        maturity_date: date_column(row, 4)?,
        interest_rate: row.get(5)?,
        quantity: row.get(6)?,
        unit_net_price: row.get(7)?,
        unit_full_price: row.get(8)?,
        settlement_amount: row.get(9)?,
    })
}

fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Transaction>, LedgerError> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM transactions WHERE id = ?1"),
        params![id],
        transaction_from_row,
    )
    .optional()
    .map_err(query_error)
}

fn exists(conn: &Connection, table: &str, id: i64) -> Result<bool, LedgerError> {
    conn.query_row(
        &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
        params![id],
        |row| row.get(0),
    )
    .map_err(query_error)
}

/// Both ends of a transaction must point at stored rows.
fn check_references(conn: &Connection, product_id: i64, asset_id: i64) -> Result<(), LedgerError> {
    if !exists(conn, "products", product_id)? {
        return Err(LedgerError::constraint(format!(
            "product {product_id} does not exist"
        )));
    }
    if !exists(conn, "assets", asset_id)? {
        return Err(LedgerError::constraint(format!(
            "asset {asset_id} does not exist"
        )));
    }
    Ok(())
}

impl TransactionRepository for SqliteTransactionRepository {
    fn create(&self, tx: NewTransaction) -> Result<Transaction, LedgerError> {
        let tx = tx.with_derived_settlement();
        let conn = self.db.connection()?;
        check_references(&conn, tx.product_id, tx.asset_id)?;

        conn.execute(
            "INSERT INTO transactions (product_id, asset_id, investment_date, maturity_date,
                                       interest_rate, quantity, unit_net_price,
                                       unit_full_price, settlement_amount)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                tx.product_id,
                tx.asset_id,
                format_date(tx.investment_date),
                date_param(tx.maturity_date),
                tx.interest_rate,
                tx.quantity,
                tx.unit_net_price,
                tx.unit_full_price,
                tx.settlement_amount,
            ],
        )
        .map_err(query_error)?;

        let id = conn.last_insert_rowid();
        tracing::debug!(
            id,
            product_id = tx.product_id,
            asset_id = tx.asset_id,
            "inserted transaction"
        );
        Ok(tx.into_transaction(id))
    }

    fn get(&self, id: i64) -> Result<Option<Transaction>, LedgerError> {
        let conn = self.db.connection()?;
        find_by_id(&conn, id)
    }

    fn list(&self, offset: usize, limit: usize) -> Result<Vec<Transaction>, LedgerError> {
        let (offset, limit) = page(offset, limit);
        self.select("ORDER BY id LIMIT ?1 OFFSET ?2", &[&limit, &offset])
    }

    fn list_by_product(&self, product_id: i64) -> Result<Vec<Transaction>, LedgerError> {
        self.select("WHERE product_id = ?1 ORDER BY id", &[&product_id])
    }

    fn list_by_asset(&self, asset_id: i64) -> Result<Vec<Transaction>, LedgerError> {
        self.select("WHERE asset_id = ?1 ORDER BY id", &[&asset_id])
    }

    fn list_by_date_range(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let (start, end) = (format_date(start), format_date(end));
        self.select(
            "WHERE investment_date >= ?1 AND investment_date <= ?2 \
             ORDER BY investment_date, id",
            &[&start, &end],
        )
    }

    fn update(
        &self,
        id: i64,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>, LedgerError> {
        let mut conn = self.db.connection()?;
        let db_tx = conn.transaction().map_err(query_error)?;

        let Some(mut stored) = find_by_id(&db_tx, id)? else {
            return Ok(None);
        };
        let relinked = patch.product_id.is_some() || patch.asset_id.is_some();
        patch.apply_to(&mut stored);
        if relinked {
            check_references(&db_tx, stored.product_id, stored.asset_id)?;
        }

        db_tx
            .execute(
                "UPDATE transactions
                    SET product_id = ?2, asset_id = ?3, investment_date = ?4,
                        maturity_date = ?5, interest_rate = ?6, quantity = ?7,
                        unit_net_price = ?8, unit_full_price = ?9, settlement_amount = ?10
                  WHERE id = ?1",
                params![
                    stored.id,
                    stored.product_id,
                    stored.asset_id,
                    format_date(stored.investment_date),
                    date_param(stored.maturity_date),
                    stored.interest_rate,
                    stored.quantity,
                    stored.unit_net_price,
                    stored.unit_full_price,
                    stored.settlement_amount,
                ],
            )
            .map_err(query_error)?;

        db_tx.commit().map_err(query_error)?;
        tracing::debug!(id, "updated transaction");
        Ok(Some(stored))
    }

    fn delete(&self, id: i64) -> Result<bool, LedgerError> {
        let conn = self.db.connection()?;
        let removed = conn
            .execute("DELETE FROM transactions WHERE id = ?1", params![id])
            .map_err(query_error)?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::asset::NewAsset;
    use crate::domain::product::NewProduct;
    use crate::ports::asset_port::AssetRepository;
    use crate::ports::product_port::ProductRepository;
    use approx::assert_relative_eq;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    struct Fixture {
        db: SqliteDatabase,
        product_id: i64,
        asset_id: i64,
    }

    fn fixture() -> Fixture {
        let db = SqliteDatabase::in_memory().unwrap();
        db.initialize_schema().unwrap();
        let product = db
            .products()
            .create(NewProduct::new("Fund", Some(d(2025, 1, 1)), Some(d(2025, 12, 31))))
            .unwrap();
        let asset = db.assets().create(NewAsset::new("Bond", "bond")).unwrap();
        Fixture {
            db,
            product_id: product.id,
            asset_id: asset.id,
        }
    }

    fn new_tx(f: &Fixture, date: NaiveDate, quantity: f64, full: Option<f64>) -> NewTransaction {
        let mut tx = NewTransaction::new(f.product_id, f.asset_id, date, quantity);
        tx.unit_full_price = full;
        tx
    }

    #[test]
    fn create_derives_settlement() {
        let f = fixture();
        let repo = f.db.transactions();
        let tx = repo.create(new_tx(&f, d(2025, 8, 1), 10.0, Some(100.0))).unwrap();
        assert_relative_eq!(tx.settlement_amount.unwrap(), 1000.0);
        assert_eq!(repo.get(tx.id).unwrap().unwrap(), tx);
    }

    #[test]
    fn create_without_price_leaves_settlement_absent() {
        let f = fixture();
        let repo = f.db.transactions();
        let tx = repo.create(new_tx(&f, d(2025, 8, 1), 10.0, None)).unwrap();
        assert_eq!(tx.settlement_amount, None);
        assert_eq!(repo.get(tx.id).unwrap().unwrap().settlement_amount, None);
    }

    #[test]
    fn create_rejects_unknown_references() {
        let f = fixture();
        let repo = f.db.transactions();

        let mut tx = new_tx(&f, d(2025, 8, 1), 1.0, None);
        tx.product_id = 999;
        let err = repo.create(tx).unwrap_err();
        assert!(matches!(err, LedgerError::ConstraintViolation { reason } if reason.contains("product")));

        let mut tx = new_tx(&f, d(2025, 8, 1), 1.0, None);
        tx.asset_id = 999;
        let err = repo.create(tx).unwrap_err();
        assert!(matches!(err, LedgerError::ConstraintViolation { reason } if reason.contains("asset")));
        assert!(repo.list(0, 10).unwrap().is_empty());
    }

    #[test]
    fn update_quantity_recomputes_settlement() {
        let f = fixture();
        let repo = f.db.transactions();
        let tx = repo.create(new_tx(&f, d(2025, 8, 1), 10.0, Some(100.0))).unwrap();

        let mut patch = TransactionPatch::default();
        patch.set("quantity", "20").unwrap();
        let updated = repo.update(tx.id, patch).unwrap().unwrap();
        assert_relative_eq!(updated.settlement_amount.unwrap(), 2000.0);
        assert_eq!(repo.get(tx.id).unwrap().unwrap(), updated);
    }

    #[test]
    fn update_to_unknown_product_is_rejected() {
        let f = fixture();
        let repo = f.db.transactions();
        let tx = repo.create(new_tx(&f, d(2025, 8, 1), 1.0, None)).unwrap();
        let mut patch = TransactionPatch::default();
        patch.set("product_id", "404").unwrap();
        assert!(matches!(
            repo.update(tx.id, patch),
            Err(LedgerError::ConstraintViolation { .. })
        ));
        assert_eq!(repo.get(tx.id).unwrap().unwrap().product_id, f.product_id);
    }

    #[test]
    fn update_missing_returns_none() {
        let f = fixture();
        let repo = f.db.transactions();
        let mut patch = TransactionPatch::default();
        patch.set("quantity", "1").unwrap();
        assert_eq!(repo.update(77, patch).unwrap(), None);
    }

    #[test]
    fn date_range_is_inclusive() {
        let f = fixture();
        let repo = f.db.transactions();
        for day in [1, 5, 10, 11] {
            repo.create(new_tx(&f, d(2025, 8, day), 1.0, None)).unwrap();
        }
        let hits = repo.list_by_date_range(d(2025, 8, 1), d(2025, 8, 10)).unwrap();
        let days: Vec<NaiveDate> = hits.iter().map(|t| t.investment_date).collect();
        assert_eq!(days, vec![d(2025, 8, 1), d(2025, 8, 5), d(2025, 8, 10)]);
    }

    #[test]
    fn lists_by_product_and_asset() {
        let f = fixture();
        let other_asset = f
            .db
            .assets()
            .create(NewAsset::new("Stock", "stock"))
            .unwrap();
        let repo = f.db.transactions();
        repo.create(new_tx(&f, d(2025, 8, 1), 1.0, None)).unwrap();
        let mut second = new_tx(&f, d(2025, 8, 2), 2.0, None);
        second.asset_id = other_asset.id;
        repo.create(second).unwrap();

        assert_eq!(repo.list_by_product(f.product_id).unwrap().len(), 2);
        assert_eq!(repo.list_by_asset(f.asset_id).unwrap().len(), 1);
        assert_eq!(repo.list_by_asset(other_asset.id).unwrap()[0].quantity, 2.0);
    }

    #[test]
    fn referenced_parents_cannot_be_deleted() {
        let f = fixture();
        let repo = f.db.transactions();
        let tx = repo.create(new_tx(&f, d(2025, 8, 1), 1.0, None)).unwrap();

        assert!(matches!(
            f.db.products().delete(f.product_id),
            Err(LedgerError::ConstraintViolation { .. })
        ));
        assert!(matches!(
            f.db.assets().delete(f.asset_id),
            Err(LedgerError::ConstraintViolation { .. })
        ));

        assert!(repo.delete(tx.id).unwrap());
        assert!(f.db.products().delete(f.product_id).unwrap());
        assert!(f.db.assets().delete(f.asset_id).unwrap());
    }
}
