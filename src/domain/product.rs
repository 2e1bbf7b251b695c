//! Wealth product entity, creation payload and partial update.

use crate::domain::amount::{parse_amount, parse_days, parse_text};
use crate::domain::dates::{self, parse_optional_date};
use crate::domain::error::LedgerError;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

/// A stored wealth product.
#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: i64,
    pub name: String,
    /// Registry code; the natural key for upserts.
    pub yindeng_code: Option<String>,
    pub jinshu_code: Option<String>,
    pub custody_code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_total: i64,
    /// Reference date of the stored `days_remaining` snapshot.
    pub query_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    /// Decimal fraction, e.g. 0.055 for 5.5%.
    pub performance_benchmark: Option<f64>,
    pub raise_target: Option<f64>,
    pub raise_amount: Option<f64>,
    pub raise_institutional: Option<f64>,
    pub raise_retail: Option<f64>,
}

/// Fields of a product that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub yindeng_code: Option<String>,
    pub jinshu_code: Option<String>,
    pub custody_code: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub days_total: i64,
    pub query_date: Option<NaiveDate>,
    pub days_remaining: Option<i64>,
    pub performance_benchmark: Option<f64>,
    pub raise_target: Option<f64>,
    pub raise_amount: Option<f64>,
    pub raise_institutional: Option<f64>,
    pub raise_retail: Option<f64>,
}

impl NewProduct {
    /// A product with its tenor derived from the two dates.
    pub fn new(
        name: impl Into<String>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Self {
        Self {
            name: name.into(),
            yindeng_code: None,
            jinshu_code: None,
            custody_code: None,
            start_date,
            end_date,
            days_total: dates::tenor_days(start_date, end_date),
            query_date: None,
            days_remaining: None,
            performance_benchmark: None,
            raise_target: None,
            raise_amount: None,
            raise_institutional: None,
            raise_retail: None,
        }
    }

    pub fn with_yindeng_code(mut self, code: impl Into<String>) -> Self {
        self.yindeng_code = normalize_code(Some(code.into()));
        self
    }

    /// Stamp the remaining-days snapshot as of `query_date`.
    pub fn with_snapshot(mut self, query_date: NaiveDate) -> Self {
        self.query_date = Some(query_date);
        self.days_remaining = self
            .end_date
            .map(|end| dates::days_remaining(end, query_date));
        self
    }

    /// The natural code if it can take part in upsert matching.
    pub fn natural_code(&self) -> Option<&str> {
        self.yindeng_code.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Trim codes to `None` when blank so they stay out of the unique index.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.yindeng_code = normalize_code(self.yindeng_code);
        self.jinshu_code = normalize_code(self.jinshu_code);
        self.custody_code = normalize_code(self.custody_code);
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_fields(&self.name, self.start_date, self.end_date)
    }

    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            yindeng_code: self.yindeng_code,
            jinshu_code: self.jinshu_code,
            custody_code: self.custody_code,
            start_date: self.start_date,
            end_date: self.end_date,
            days_total: self.days_total,
            query_date: self.query_date,
            days_remaining: self.days_remaining,
            performance_benchmark: self.performance_benchmark,
            raise_target: self.raise_target,
            raise_amount: self.raise_amount,
            raise_institutional: self.raise_institutional,
            raise_retail: self.raise_retail,
        }
    }
}

impl Product {
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_fields(&self.name, self.start_date, self.end_date)
    }

    /// Canonical text of one field, empty when absent. Used by export.
    pub fn field_text(&self, field: ProductField) -> String {
        fn opt<T: ToString>(v: &Option<T>) -> String {
            v.as_ref().map(ToString::to_string).unwrap_or_default()
        }
        fn opt_date(v: Option<NaiveDate>) -> String {
            v.map(dates::format_date).unwrap_or_default()
        }
        match field {
            ProductField::Id => self.id.to_string(),
            ProductField::Name => self.name.clone(),
            ProductField::YindengCode => opt(&self.yindeng_code),
            ProductField::JinshuCode => opt(&self.jinshu_code),
            ProductField::CustodyCode => opt(&self.custody_code),
            ProductField::StartDate => opt_date(self.start_date),
            ProductField::EndDate => opt_date(self.end_date),
            ProductField::DaysTotal => self.days_total.to_string(),
            ProductField::QueryDate => opt_date(self.query_date),
            ProductField::DaysRemaining => opt(&self.days_remaining),
            ProductField::PerformanceBenchmark => opt(&self.performance_benchmark),
            ProductField::RaiseTarget => opt(&self.raise_target),
            ProductField::RaiseAmount => opt(&self.raise_amount),
            ProductField::RaiseInstitutional => opt(&self.raise_institutional),
            ProductField::RaiseRetail => opt(&self.raise_retail),
        }
    }
}

fn validate_fields(
    name: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::missing("name"));
    }
    if let (Some(start), Some(end)) = (start, end) {
        if end < start {
            return Err(LedgerError::constraint(format!(
                "end date {end} precedes start date {start}"
            )));
        }
    }
    Ok(())
}

fn normalize_code(code: Option<String>) -> Option<String> {
    code.map(|c| c.trim().to_string()).filter(|c| !c.is_empty())
}

/// Every column of a product, in export order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Id,
    Name,
    YindengCode,
    JinshuCode,
    CustodyCode,
    StartDate,
    EndDate,
    DaysTotal,
    QueryDate,
    DaysRemaining,
    PerformanceBenchmark,
    RaiseTarget,
    RaiseAmount,
    RaiseInstitutional,
    RaiseRetail,
}

impl ProductField {
    pub const ALL: [ProductField; 15] = [
        ProductField::Id,
        ProductField::Name,
        ProductField::YindengCode,
        ProductField::JinshuCode,
        ProductField::CustodyCode,
        ProductField::StartDate,
        ProductField::EndDate,
        ProductField::DaysTotal,
        ProductField::QueryDate,
        ProductField::DaysRemaining,
        ProductField::PerformanceBenchmark,
        ProductField::RaiseTarget,
        ProductField::RaiseAmount,
        ProductField::RaiseInstitutional,
        ProductField::RaiseRetail,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProductField::Id => "id",
            ProductField::Name => "name",
            ProductField::YindengCode => "yindeng_code",
            ProductField::JinshuCode => "jinshu_code",
            ProductField::CustodyCode => "custody_code",
            ProductField::StartDate => "start_date",
            ProductField::EndDate => "end_date",
            ProductField::DaysTotal => "days_total",
            ProductField::QueryDate => "query_date",
            ProductField::DaysRemaining => "days_remaining",
            ProductField::PerformanceBenchmark => "performance_benchmark",
            ProductField::RaiseTarget => "raise_target",
            ProductField::RaiseAmount => "raise_amount",
            ProductField::RaiseInstitutional => "raise_institutional",
            ProductField::RaiseRetail => "raise_retail",
        }
    }
}

impl fmt::Display for ProductField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductField {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        ProductField::ALL
            .into_iter()
            .find(|f| f.as_str() == key)
            .ok_or_else(|| LedgerError::UnknownField {
                entity: "product".into(),
                field: key.to_string(),
            })
    }
}

/// Explicit partial update: `None` leaves a field untouched, `Some(None)`
/// clears a nullable field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub yindeng_code: Option<Option<String>>,
    pub jinshu_code: Option<Option<String>>,
    pub custody_code: Option<Option<String>>,
    pub start_date: Option<Option<NaiveDate>>,
    pub end_date: Option<Option<NaiveDate>>,
    pub days_total: Option<i64>,
    pub query_date: Option<Option<NaiveDate>>,
    pub days_remaining: Option<Option<i64>>,
    pub performance_benchmark: Option<Option<f64>>,
    pub raise_target: Option<Option<f64>>,
    pub raise_amount: Option<Option<f64>>,
    pub raise_institutional: Option<Option<f64>>,
    pub raise_retail: Option<Option<f64>>,
}

impl ProductPatch {
    /// Set one field from its textual form, e.g. `("end_date", "2025/9/1")`.
    pub fn set(&mut self, field: &str, raw: &str) -> Result<(), LedgerError> {
        match field.parse::<ProductField>()? {
            ProductField::Id => {
                return Err(LedgerError::constraint("product id is immutable"));
            }
            ProductField::Name => {
                self.name = Some(parse_text(raw).ok_or_else(|| LedgerError::missing("name"))?)
            }
            ProductField::YindengCode => self.yindeng_code = Some(parse_text(raw)),
            ProductField::JinshuCode => self.jinshu_code = Some(parse_text(raw)),
            ProductField::CustodyCode => self.custody_code = Some(parse_text(raw)),
            ProductField::StartDate => self.start_date = Some(parse_optional_date(raw)?),
            ProductField::EndDate => self.end_date = Some(parse_optional_date(raw)?),
            ProductField::DaysTotal => {
                self.days_total =
                    Some(parse_days(raw)?.ok_or_else(|| LedgerError::missing("days_total"))?)
            }
            ProductField::QueryDate => self.query_date = Some(parse_optional_date(raw)?),
            ProductField::DaysRemaining => self.days_remaining = Some(parse_days(raw)?),
            ProductField::PerformanceBenchmark => {
                self.performance_benchmark = Some(parse_amount(raw)?)
            }
            ProductField::RaiseTarget => self.raise_target = Some(parse_amount(raw)?),
            ProductField::RaiseAmount => self.raise_amount = Some(parse_amount(raw)?),
            ProductField::RaiseInstitutional => {
                self.raise_institutional = Some(parse_amount(raw)?)
            }
            ProductField::RaiseRetail => self.raise_retail = Some(parse_amount(raw)?),
        }
        Ok(())
    }

    /// Apply onto a stored product and re-validate it.
    ///
    /// Changing either date without an explicit `days_total` re-derives the
    /// tenor from the resulting dates.
    pub fn apply_to(self, product: &mut Product) -> Result<(), LedgerError> {
        let ProductPatch {
            name,
            yindeng_code,
            jinshu_code,
            custody_code,
            start_date,
            end_date,
            days_total,
            query_date,
            days_remaining,
            performance_benchmark,
            raise_target,
            raise_amount,
            raise_institutional,
            raise_retail,
        } = self;

        let dates_changed = start_date.is_some() || end_date.is_some();

        if let Some(v) = name {
            product.name = v.trim().to_string();
        }
        if let Some(v) = yindeng_code {
            product.yindeng_code = normalize_code(v);
        }
        if let Some(v) = jinshu_code {
            product.jinshu_code = normalize_code(v);
        }
        if let Some(v) = custody_code {
            product.custody_code = normalize_code(v);
        }
        if let Some(v) = start_date {
            product.start_date = v;
        }
        if let Some(v) = end_date {
            product.end_date = v;
        }
        match days_total {
            Some(v) => product.days_total = v,
            None if dates_changed => {
                product.days_total = dates::tenor_days(product.start_date, product.end_date)
            }
            None => {}
        }
        if let Some(v) = query_date {
            product.query_date = v;
        }
        if let Some(v) = days_remaining {
            product.days_remaining = v;
        }
        if let Some(v) = performance_benchmark {
            product.performance_benchmark = v;
        }
        if let Some(v) = raise_target {
            product.raise_target = v;
        }
        if let Some(v) = raise_amount {
            product.raise_amount = v;
        }
        if let Some(v) = raise_institutional {
            product.raise_institutional = v;
        }
        if let Some(v) = raise_retail {
            product.raise_retail = v;
        }

        product.validate()
    }
}
