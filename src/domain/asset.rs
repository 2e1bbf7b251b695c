//! Asset reference data.

use crate::domain::amount::parse_text;
use crate::domain::dates::parse_date;
use crate::domain::error::LedgerError;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct Asset {
    pub id: i64,
    pub name: String,
    pub code: Option<String>,
    /// Free-form classification: stock, bond, fund, deposit, ...
    pub asset_type: String,
    pub issuer: Option<String>,
    pub industry: Option<String>,
    pub region: Option<String>,
    pub created_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAsset {
    pub name: String,
    pub code: Option<String>,
    pub asset_type: String,
    pub issuer: Option<String>,
    pub industry: Option<String>,
    pub region: Option<String>,
    /// Defaults to the current date when the asset is stored.
    pub created_date: Option<NaiveDate>,
}

impl NewAsset {
    pub fn new(name: impl Into<String>, asset_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: None,
            asset_type: asset_type.into(),
            issuer: None,
            industry: None,
            region: None,
            created_date: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = parse_text(&code.into());
        self
    }

    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.asset_type = self.asset_type.trim().to_string();
        self.code = self.code.as_deref().and_then(parse_text);
        self
    }

    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_fields(&self.name, &self.asset_type)
    }

    pub fn into_asset(self, id: i64, today: NaiveDate) -> Asset {
        Asset {
            id,
            name: self.name,
            code: self.code,
            asset_type: self.asset_type,
            issuer: self.issuer,
            industry: self.industry,
            region: self.region,
            created_date: self.created_date.unwrap_or(today),
        }
    }
}

impl Asset {
    pub fn validate(&self) -> Result<(), LedgerError> {
        validate_fields(&self.name, &self.asset_type)
    }
}

fn validate_fields(name: &str, asset_type: &str) -> Result<(), LedgerError> {
    if name.trim().is_empty() {
        return Err(LedgerError::missing("name"));
    }
    if asset_type.trim().is_empty() {
        return Err(LedgerError::missing("asset_type"));
    }
    Ok(())
}

/// Explicit partial update for an asset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssetPatch {
    pub name: Option<String>,
    pub code: Option<Option<String>>,
    pub asset_type: Option<String>,
    pub issuer: Option<Option<String>>,
    pub industry: Option<Option<String>>,
    pub region: Option<Option<String>>,
    pub created_date: Option<NaiveDate>,
}

impl AssetPatch {
    pub fn set(&mut self, field: &str, raw: &str) -> Result<(), LedgerError> {
        match field.trim() {
            "name" => self.name = Some(parse_text(raw).ok_or_else(|| LedgerError::missing("name"))?),
            "code" => self.code = Some(parse_text(raw)),
            "asset_type" | "type" => {
                self.asset_type =
                    Some(parse_text(raw).ok_or_else(|| LedgerError::missing("asset_type"))?)
            }
            "issuer" => self.issuer = Some(parse_text(raw)),
            "industry" => self.industry = Some(parse_text(raw)),
            "region" => self.region = Some(parse_text(raw)),
            "created_date" => self.created_date = Some(parse_date(raw)?),
            other => {
                return Err(LedgerError::UnknownField {
                    entity: "asset".into(),
                    field: other.to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn apply_to(self, asset: &mut Asset) -> Result<(), LedgerError> {
        let AssetPatch {
            name,
            code,
            asset_type,
            issuer,
            industry,
            region,
            created_date,
        } = self;

        if let Some(v) = name {
            asset.name = v.trim().to_string();
        }
        if let Some(v) = code {
            asset.code = v.as_deref().and_then(parse_text);
        }
        if let Some(v) = asset_type {
            asset.asset_type = v.trim().to_string();
        }
        if let Some(v) = issuer {
            asset.issuer = v;
        }
        if let Some(v) = industry {
            asset.industry = v;
        }
        if let Some(v) = region {
            asset.region = v;
        }
        if let Some(v) = created_date {
            asset.created_date = v;
        }

        asset.validate()
    }
}
