use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use fxrates_core::FxError;
use serde::Serialize;

/// Wire shape for every non-2xx response: `{ type, message, code? }`.
/// `type` is always the fixed string `"APPLICATION_ERROR"`; `code` is
/// present only for [`FxError::BusinessRule`].
#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'static str>,
}

/// Newtype so [`FxError`] (defined in `fxrates-core`, which has no axum
/// dependency) can implement [`IntoResponse`] here without an orphan-rule
/// violation.
pub struct ApiError(pub FxError);

impl From<FxError> for ApiError {
    fn from(err: FxError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = ErrorBody {
            kind: "APPLICATION_ERROR",
            message: self.0.to_string(),
            code: self.0.code().map(fxrates_core::ErrorCode::as_str),
        };
        (status, Json(body)).into_response()
    }
}
