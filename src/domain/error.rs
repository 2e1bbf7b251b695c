//! Domain error types.

/// Top-level error type for wealthledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("invalid date format: {input:?}")]
    InvalidDateFormat { input: String },

    #[error("invalid number: {input:?}")]
    InvalidNumber { input: String },

    #[error("missing required field: {field}")]
    MissingRequiredField { field: String },

    #[error("unknown {entity} field: {field}")]
    UnknownField { entity: String, field: String },

    #[error("constraint violation: {reason}")]
    ConstraintViolation { reason: String },

    #[error("unsupported file format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("row {row}: {source}")]
    ImportRow {
        row: usize,
        source: Box<LedgerError>,
    },

    #[error("tabular data error: {reason}")]
    Tabular { reason: String },

    #[error("database error: {reason}")]
    Database { reason: String },

    #[error("database query error: {reason}")]
    DatabaseQuery { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    pub fn missing(field: &str) -> Self {
        LedgerError::MissingRequiredField {
            field: field.to_string(),
        }
    }

    pub fn constraint(reason: impl Into<String>) -> Self {
        LedgerError::ConstraintViolation {
            reason: reason.into(),
        }
    }

    /// Attach a 1-based data row number to a validation error.
    pub fn at_row(self, row: usize) -> Self {
        LedgerError::ImportRow {
            row,
            source: Box::new(self),
        }
    }

    /// The innermost error, looking through row context.
    pub fn root(&self) -> &LedgerError {
        match self {
            LedgerError::ImportRow { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<&LedgerError> for std::process::ExitCode {
    fn from(err: &LedgerError) -> Self {
        let code: u8 = match err.root() {
            LedgerError::Io(_) | LedgerError::Tabular { .. } => 1,
            LedgerError::ConfigParse { .. }
            | LedgerError::ConfigMissing { .. }
            | LedgerError::ConfigInvalid { .. } => 2,
            LedgerError::Database { .. } | LedgerError::DatabaseQuery { .. } => 3,
            LedgerError::InvalidDateFormat { .. }
            | LedgerError::InvalidNumber { .. }
            | LedgerError::MissingRequiredField { .. }
            | LedgerError::UnknownField { .. }
            | LedgerError::ConstraintViolation { .. } => 4,
            LedgerError::UnsupportedFormat { .. } => 6,
            LedgerError::ImportRow { .. } => 4,
        };
        std::process::ExitCode::from(code)
    }
}
