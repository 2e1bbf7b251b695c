//! Bulk product import and export over tabular rows.
//!
//! Import parses and validates every row before touching storage, then hands
//! the whole batch to [`ProductRepository::upsert_batch`], so a bad row
//! anywhere leaves the database unchanged.

use crate::domain::amount::{parse_amount, parse_text};
use crate::domain::dates::{parse_date, parse_optional_date};
use crate::domain::error::LedgerError;
use crate::domain::product::{NewProduct, ProductField};
use crate::ports::product_port::ProductRepository;
use crate::ports::tabular_port::{Record, RowSink, RowSource};
use chrono::NaiveDate;

/// Accepted column headers per field; the first non-empty cell wins.
const NAME: &[&str] = &["产品名称", "name", "product_name", "product name"];
const YINDENG_CODE: &[&str] = &["银登编码", "yindeng_code", "product_yindeng_code"];
const JINSHU_CODE: &[&str] = &["金数编码", "jinshu_code", "product_jinshu_code"];
const CUSTODY_CODE: &[&str] = &["托管编码", "custody_code", "product_custody_code"];
const START_DATE: &[&str] = &["起息日", "start_date", "product_start_date"];
const END_DATE: &[&str] = &["到期日", "end_date", "product_end_date"];
const BENCHMARK: &[&str] = &[
    "业绩基准",
    "performance_benchmark",
    "product_performance_benchmark",
];
const RAISE_TARGET: &[&str] = &["募集目标", "raise_target", "product_raise_target"];
const RAISE_AMOUNT: &[&str] = &["募集金额", "raise_amount", "product_raise_amount"];
const RAISE_INSTITUTIONAL: &[&str] = &[
    "机构募集",
    "raise_institutional",
    "product_raise_institutional",
];
const RAISE_RETAIL: &[&str] = &["个人募集", "raise_retail", "product_raise_retail"];

fn cell<'a>(record: &'a Record, aliases: &[&str]) -> &'a str {
    aliases
        .iter()
        .filter_map(|alias| record.get(*alias))
        .map(|value| value.trim())
        .find(|value| !value.is_empty())
        .unwrap_or("")
}

/// Map one tabular record to a validated product.
///
/// The tenor is derived from the dates; any tenor or snapshot columns in the
/// input are ignored. With a `query_date` the remaining-days snapshot is
/// stamped as of that date.
pub fn parse_product_record(
    record: &Record,
    query_date: Option<NaiveDate>,
) -> Result<NewProduct, LedgerError> {
    let name = parse_text(cell(record, NAME)).ok_or_else(|| LedgerError::missing("name"))?;
    let start_date = parse_optional_date(cell(record, START_DATE))?;
    let end_date = parse_optional_date(cell(record, END_DATE))?;

    let mut product = NewProduct::new(name, start_date, end_date);
    product.yindeng_code = parse_text(cell(record, YINDENG_CODE));
    product.jinshu_code = parse_text(cell(record, JINSHU_CODE));
    product.custody_code = parse_text(cell(record, CUSTODY_CODE));
    product.performance_benchmark = parse_amount(cell(record, BENCHMARK))?;
    product.raise_target = parse_amount(cell(record, RAISE_TARGET))?;
    product.raise_amount = parse_amount(cell(record, RAISE_AMOUNT))?;
    product.raise_institutional = parse_amount(cell(record, RAISE_INSTITUTIONAL))?;
    product.raise_retail = parse_amount(cell(record, RAISE_RETAIL))?;

    if let Some(reference) = query_date {
        product = product.with_snapshot(reference);
    }

    product.validate()?;
    Ok(product)
}

/// Import every row of `source`, upserting by natural code. Returns the
/// number of rows written.
pub fn import_products(
    source: &dyn RowSource,
    products: &dyn ProductRepository,
    query_date: Option<&str>,
) -> Result<usize, LedgerError> {
    let reference = query_date.map(parse_date).transpose()?;
    let records = source.read_rows()?;

    let batch = records
        .iter()
        .enumerate()
        .map(|(i, record)| parse_product_record(record, reference).map_err(|e| e.at_row(i + 1)))
        .collect::<Result<Vec<_>, _>>()?;

    let written = products.upsert_batch(batch)?.len();
    tracing::info!(rows = written, ?reference, "product import committed");
    Ok(written)
}

/// Export all products, or only those whose stored snapshot date equals
/// `query_date`. Returns the number of rows written.
pub fn export_products(
    products: &dyn ProductRepository,
    sink: &dyn RowSink,
    query_date: Option<&str>,
) -> Result<usize, LedgerError> {
    let reference = query_date.map(parse_date).transpose()?;
    let headers: Vec<&str> = ProductField::ALL.iter().map(|f| f.as_str()).collect();

    let rows: Vec<Vec<String>> = products
        .list_all()?
        .iter()
        .filter(|p| reference.is_none() || p.query_date == reference)
        .map(|p| ProductField::ALL.iter().map(|f| p.field_text(*f)).collect())
        .collect();

    sink.write_rows(&headers, &rows)?;
    tracing::info!(rows = rows.len(), ?reference, "product export written");
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn record(pairs: &[(&str, &str)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn parses_localized_headers() {
        let r = record(&[
            ("产品名称", "产品A"),
            ("银登编码", "Y001"),
            ("金数编码", "J001"),
            ("托管编码", "T001"),
            ("起息日", "2025-08-01"),
            ("到期日", "2025年8月10日"),
            ("业绩基准", "5.5%"),
            ("募集目标", "1,000,000"),
            ("募集金额", "900000"),
            ("机构募集", "700000"),
            ("个人募集", "null"),
        ]);
        let p = parse_product_record(&r, Some(d(2025, 8, 1))).unwrap();

        assert_eq!(p.name, "产品A");
        assert_eq!(p.yindeng_code.as_deref(), Some("Y001"));
        assert_eq!(p.end_date, Some(d(2025, 8, 10)));
        assert_eq!(p.days_total, 9);
        assert_eq!(p.query_date, Some(d(2025, 8, 1)));
        assert_eq!(p.days_remaining, Some(9));
        assert_relative_eq!(p.performance_benchmark.unwrap(), 0.055);
        assert_relative_eq!(p.raise_target.unwrap(), 1_000_000.0);
        assert_eq!(p.raise_retail, None);
    }

    #[test]
    fn parses_canonical_and_legacy_headers() {
        let r = record(&[
            ("product_name", "Legacy"),
            ("name", ""),
            ("start_date", "2025/08/01"),
            ("product_end_date", "2025.08.31"),
        ]);
        let p = parse_product_record(&r, None).unwrap();
        assert_eq!(p.name, "Legacy");
        assert_eq!(p.days_total, 30);
        assert_eq!(p.query_date, None);
        assert_eq!(p.days_remaining, None);
    }

    #[test]
    fn missing_end_date_gives_zero_tenor() {
        let r = record(&[("产品名称", "产品B"), ("起息日", "2025-08-01"), ("到期日", "")]);
        let p = parse_product_record(&r, Some(d(2025, 8, 1))).unwrap();
        assert_eq!(p.end_date, None);
        assert_eq!(p.days_total, 0);
        assert_eq!(p.days_remaining, None);
    }

    #[test]
    fn blank_name_is_missing() {
        let r = record(&[("银登编码", "Y003"), ("起息日", "2025-08-01")]);
        assert!(matches!(
            parse_product_record(&r, None),
            Err(LedgerError::MissingRequiredField { field }) if field == "name"
        ));
    }

    #[test]
    fn null_like_text_is_kept_verbatim() {
        let r = record(&[("产品名称", "None"), ("银登编码", "NULL"), ("募集金额", "nan")]);
        let p = parse_product_record(&r, None).unwrap();
        assert_eq!(p.name, "None");
        assert_eq!(p.yindeng_code.as_deref(), Some("NULL"));
        assert_eq!(p.raise_amount, None);
    }

    #[test]
    fn bad_cells_are_reported() {
        let r = record(&[("产品名称", "X"), ("到期日", "someday")]);
        assert!(matches!(
            parse_product_record(&r, None),
            Err(LedgerError::InvalidDateFormat { .. })
        ));

        let r = record(&[("产品名称", "X"), ("募集金额", "lots")]);
        assert!(matches!(
            parse_product_record(&r, None),
            Err(LedgerError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn tenor_columns_in_input_are_ignored() {
        let r = record(&[
            ("name", "X"),
            ("start_date", "2025-08-01"),
            ("end_date", "2025-08-03"),
            ("days_total", "999"),
            ("days_remaining", "999"),
        ]);
        let p = parse_product_record(&r, None).unwrap();
        assert_eq!(p.days_total, 2);
        assert_eq!(p.days_remaining, None);
    }
}
