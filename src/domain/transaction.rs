//! Investment transactions linking a product to an asset.
//!
//! The settlement amount is derived as `quantity * unit_full_price` unless the
//! caller supplies it. An absent price leaves the amount absent, never zero.

use crate::domain::amount::parse_amount;
use crate::domain::dates::{parse_date, parse_optional_date};
use crate::domain::error::LedgerError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: i64,
    pub product_id: i64,
    pub asset_id: i64,
    pub investment_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<f64>,
    pub quantity: f64,
    pub unit_net_price: Option<f64>,
    pub unit_full_price: Option<f64>,
    pub settlement_amount: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub product_id: i64,
    pub asset_id: i64,
    pub investment_date: NaiveDate,
    pub maturity_date: Option<NaiveDate>,
    pub interest_rate: Option<f64>,
    pub quantity: f64,
    pub unit_net_price: Option<f64>,
    pub unit_full_price: Option<f64>,
    pub settlement_amount: Option<f64>,
}

pub fn settlement_amount(quantity: f64, unit_full_price: Option<f64>) -> Option<f64> {
    unit_full_price.map(|price| quantity * price)
}

impl NewTransaction {
    pub fn new(product_id: i64, asset_id: i64, investment_date: NaiveDate, quantity: f64) -> Self {
        Self {
            product_id,
            asset_id,
            investment_date,
            maturity_date: None,
            interest_rate: None,
            quantity,
            unit_net_price: None,
            unit_full_price: None,
            settlement_amount: None,
        }
    }

    /// Fill in the settlement amount when the caller left it out.
    pub fn with_derived_settlement(mut self) -> Self {
        if self.settlement_amount.is_none() {
            self.settlement_amount = settlement_amount(self.quantity, self.unit_full_price);
        }
        self
    }

    pub fn into_transaction(self, id: i64) -> Transaction {
        Transaction {
            id,
            product_id: self.product_id,
            asset_id: self.asset_id,
            investment_date: self.investment_date,
            maturity_date: self.maturity_date,
            interest_rate: self.interest_rate,
            quantity: self.quantity,
            unit_net_price: self.unit_net_price,
            unit_full_price: self.unit_full_price,
            settlement_amount: self.settlement_amount,
        }
    }
}

/// Explicit partial update for a transaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionPatch {
    pub product_id: Option<i64>,
    pub asset_id: Option<i64>,
    pub investment_date: Option<NaiveDate>,
    pub maturity_date: Option<Option<NaiveDate>>,
    pub interest_rate: Option<Option<f64>>,
    pub quantity: Option<f64>,
    pub unit_net_price: Option<Option<f64>>,
    pub unit_full_price: Option<Option<f64>>,
    pub settlement_amount: Option<Option<f64>>,
}

impl TransactionPatch {
    pub fn set(&mut self, field: &str, raw: &str) -> Result<(), LedgerError> {
        let required = |name: &str, value: Option<f64>| {
            value.ok_or_else(|| LedgerError::missing(name))
        };
        match field.trim() {
            "product_id" => self.product_id = Some(parse_id(raw)?),
            "asset_id" => self.asset_id = Some(parse_id(raw)?),
            "investment_date" => self.investment_date = Some(parse_date(raw)?),
            "maturity_date" => self.maturity_date = Some(parse_optional_date(raw)?),
            "interest_rate" => self.interest_rate = Some(parse_amount(raw)?),
            "quantity" => self.quantity = Some(required("quantity", parse_amount(raw)?)?),
            "unit_net_price" => self.unit_net_price = Some(parse_amount(raw)?),
            "unit_full_price" => self.unit_full_price = Some(parse_amount(raw)?),
            "settlement_amount" => self.settlement_amount = Some(parse_amount(raw)?),
            other => {
                return Err(LedgerError::UnknownField {
                    entity: "transaction".into(),
                    field: other.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Apply onto a stored transaction.
    ///
    /// When quantity or unit full price changes and the patch does not set the
    /// settlement amount itself, the amount is recomputed from the merged
    /// values. If the merged price is absent the stored amount is kept.
    pub fn apply_to(self, tx: &mut Transaction) {
        let TransactionPatch {
            product_id,
            asset_id,
            investment_date,
            maturity_date,
            interest_rate,
            quantity,
            unit_net_price,
            unit_full_price,
            settlement_amount: explicit_settlement,
        } = self;

        let recompute =
            (quantity.is_some() || unit_full_price.is_some()) && explicit_settlement.is_none();

        if let Some(v) = product_id {
            tx.product_id = v;
        }
        if let Some(v) = asset_id {
            tx.asset_id = v;
        }
        if let Some(v) = investment_date {
            tx.investment_date = v;
        }
        if let Some(v) = maturity_date {
            tx.maturity_date = v;
        }
        if let Some(v) = interest_rate {
            tx.interest_rate = v;
        }
        if let Some(v) = quantity {
            tx.quantity = v;
        }
        if let Some(v) = unit_net_price {
            tx.unit_net_price = v;
        }
        if let Some(v) = unit_full_price {
            tx.unit_full_price = v;
        }
        if let Some(v) = explicit_settlement {
            tx.settlement_amount = v;
        }

        if recompute {
            if let Some(amount) = settlement_amount(tx.quantity, tx.unit_full_price) {
                tx.settlement_amount = Some(amount);
            }
        }
    }
}

fn parse_id(raw: &str) -> Result<i64, LedgerError> {
    raw.trim().parse().map_err(|_| LedgerError::InvalidNumber {
        input: raw.to_string(),
    })
}
