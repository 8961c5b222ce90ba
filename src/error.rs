use thiserror::Error;

/// Errors surfaced by the roster core.
///
/// Date-parse failures are recoverable at call sites that walk lists (skip
/// and warn) and fatal where a single valid value is required. Schema and
/// format failures abort before any artifact is touched.
#[derive(Debug, Error)]
pub enum RosterError {
    #[error("could not parse date '{value}'")]
    DateParse { value: String },

    #[error("missing required columns in faculty summary: {}", .missing.join(", "))]
    SchemaValidation { missing: Vec<String> },

    #[error("unsupported file type '{filename}'")]
    UnsupportedFormat { filename: String },

    #[error("invalid schedule entry: {reason}")]
    ScheduleConfig { reason: String },

    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RosterError {
    pub fn date_parse(value: impl Into<String>) -> Self {
        RosterError::DateParse { value: value.into() }
    }

    pub fn unsupported_format(filename: impl Into<String>) -> Self {
        RosterError::UnsupportedFormat { filename: filename.into() }
    }

    pub fn schedule_config(reason: impl Into<String>) -> Self {
        RosterError::ScheduleConfig { reason: reason.into() }
    }

    /// Whether the failure is the caller's input rather than this service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RosterError::DateParse { .. }
                | RosterError::SchemaValidation { .. }
                | RosterError::UnsupportedFormat { .. }
                | RosterError::ScheduleConfig { .. }
        )
    }
}
