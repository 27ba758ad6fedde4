use thiserror::Error;

/// Stable machine-readable codes surfaced alongside `BusinessRule` errors,
/// carried through to the `code` field of a 422 response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    DuplicateCurrencyCode,
    InvalidIso4217Code,
    InvalidProviderSeriesId,
    NoExchangeRateDataAvailable,
    StartDateOutOfRange,
    CurrencyNotEnabled,
}

impl ErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DuplicateCurrencyCode => "DUPLICATE_CURRENCY_CODE",
            Self::InvalidIso4217Code => "INVALID_ISO4217_CODE",
            Self::InvalidProviderSeriesId => "INVALID_PROVIDER_SERIES_ID",
            Self::NoExchangeRateDataAvailable => "NO_EXCHANGE_RATE_DATA_AVAILABLE",
            Self::StartDateOutOfRange => "START_DATE_OUT_OF_RANGE",
            Self::CurrencyNotEnabled => "CURRENCY_NOT_ENABLED",
        }
    }
}

/// Unified error type for the fxrates workspace. Each variant maps to
/// exactly one HTTP status via [`FxError::status_code`] and, for
/// `BusinessRule`, a stable `code` string via [`FxError::code`].
#[derive(Debug, Error)]
pub enum FxError {
    /// Malformed client input: bad date range, bad query parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A referenced resource (series id, etc.) does not exist.
    #[error("not found: {0}")]
    ResourceNotFound(String),

    /// A domain/validation rule was violated; carries a stable code for callers.
    #[error("{message}")]
    BusinessRule {
        code: ErrorCode,
        message: String,
    },

    /// The upstream provider could not be reached or returned a 5xx.
    #[error("provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// The upstream provider rejected the request (4xx other than existence-check).
    #[error("provider rejected request: {0}")]
    ProviderRejected(String),

    /// The upstream provider's payload violated its own contract (e.g. duplicate dates).
    #[error("provider contract violation: {0}")]
    ProviderContractViolation(String),

    /// An import's payload size exceeded the configured sanity caps.
    #[error("import sanity check failed: {0}")]
    ImportSanityFailed(String),

    /// Anything else: programmer error, unexpected IO failure, etc.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FxError {
    #[must_use]
    pub fn business(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::BusinessRule {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn start_date_out_of_range(earliest: chrono::NaiveDate) -> Self {
        Self::business(
            ErrorCode::StartDateOutOfRange,
            format!("requested start date precedes earliest stored date {earliest}"),
        )
    }

    /// Stable machine-readable code, present only for `BusinessRule` variants.
    #[must_use]
    pub const fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::BusinessRule { code, .. } => Some(*code),
            _ => None,
        }
    }

    /// HTTP status this error kind surfaces as.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::ResourceNotFound(_) => 404,
            Self::BusinessRule { .. } => 422,
            Self::ProviderUnavailable(_)
            | Self::ProviderRejected(_)
            | Self::ProviderContractViolation(_)
            | Self::ImportSanityFailed(_) => 503,
            Self::Internal(_) => 500,
        }
    }

    /// Whether an import attempt failing with this error should be retried
    /// by the scheduler (provider/transient failures) or treated as fatal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderUnavailable(_) | Self::ImportSanityFailed(_)
        )
    }
}

pub type FxResult<T> = Result<T, FxError>;
