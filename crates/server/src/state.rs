use std::sync::Arc;

use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use shopfront_core::cart::ProductLookup;
use shopfront_core::config::StoreConfig;
use shopfront_core::errors::{ApplicationError, InterfaceError};
use shopfront_db::repositories::{CatalogRepository, OrderRepository, SessionStore};
use shopfront_mail::Notifier;

/// Shared handler dependencies. Repositories are trait objects so tests can
/// swap in the in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<dyn CatalogRepository>,
    pub lookup: Arc<dyn ProductLookup>,
    pub orders: Arc<dyn OrderRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub notifier: Arc<dyn Notifier>,
    pub store: StoreConfig,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub error: String,
    pub correlation_id: String,
}

pub type ErrorReply = (StatusCode, Json<ErrorBody>);

pub fn new_correlation_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Map an application failure onto the wire: status code plus a user-safe
/// message, with the detail kept in the logs.
pub fn error_reply(error: ApplicationError, correlation_id: &str) -> ErrorReply {
    let interface = error.into_interface(correlation_id.to_string());
    warn!(
        event_name = "http.request.failed",
        correlation_id = %correlation_id,
        error = %interface,
        "request failed"
    );

    let status = match interface {
        InterfaceError::BadRequest { .. } => StatusCode::BAD_REQUEST,
        InterfaceError::NotFound { .. } => StatusCode::NOT_FOUND,
        InterfaceError::ServiceUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        InterfaceError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    };

    (
        status,
        Json(ErrorBody {
            error: interface.user_message().to_string(),
            correlation_id: correlation_id.to_string(),
        }),
    )
}

pub fn reject(
    status: StatusCode,
    message: impl Into<String>,
    correlation_id: &str,
) -> ErrorReply {
    (
        status,
        Json(ErrorBody { error: message.into(), correlation_id: correlation_id.to_string() }),
    )
}
