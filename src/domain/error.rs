//! Domain error types.
//!
//! Only fatal conditions live here. Warm-up, invalid indicators and order
//! rejections are ordinary outcomes of a bar and are modelled as
//! [`HoldReason`](crate::domain::controller::HoldReason) and
//! [`OrderEventKind`](crate::domain::order::OrderEventKind) instead.

/// Top-level error type for trendsniper.
#[derive(Debug, thiserror::Error)]
pub enum SniperError {
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

    #[error("data error: {reason}")]
    Data { reason: String },

    #[error("no data in {source_name}")]
    NoData { source_name: String },

    #[error("bars out of order at index {index}: {timestamp} is not after {previous}")]
    UnorderedBars {
        index: usize,
        previous: chrono::NaiveDateTime,
        timestamp: chrono::NaiveDateTime,
    },

    #[error("broker protocol violation: {reason}")]
    Protocol { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SniperError {
    pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        SniperError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// True for errors raised while building or validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SniperError::ConfigParse { .. }
                | SniperError::ConfigMissing { .. }
                | SniperError::ConfigInvalid { .. }
        )
    }
}

impl From<&SniperError> for std::process::ExitCode {
    fn from(err: &SniperError) -> Self {
        let code: u8 = match err {
            SniperError::Io(_) | SniperError::Report { .. } => 1,
            SniperError::ConfigParse { .. }
            | SniperError::ConfigMissing { .. }
            | SniperError::ConfigInvalid { .. } => 2,
            SniperError::Data { .. } | SniperError::UnorderedBars { .. } => 3,
            SniperError::Protocol { .. } => 4,
            SniperError::NoData { .. } => 5,
        };
        std::process::ExitCode::from(code)
    }
}
