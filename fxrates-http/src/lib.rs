//! axum HTTP surface for the fxrates reference-rate service: catalog
//! admin, dense exchange-rate queries, and a manual import trigger.
//! Every handler maps [`fxrates_core::FxError`] to the `{type, message,
//! code}` body through [`error::ApiError`]'s single `IntoResponse` impl.

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
