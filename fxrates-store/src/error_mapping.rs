use fxrates_core::FxError;

/// `SQLSTATE 23505`: unique_violation.
#[must_use]
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

pub fn map_sqlx_err(context: &str, err: sqlx::Error) -> FxError {
    FxError::Internal(format!("{context}: {err}"))
}
