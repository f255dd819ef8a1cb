use axum::http::{header, HeaderMap, HeaderValue};

use shopfront_core::errors::ApplicationError;
use shopfront_core::session::{Session, SessionId};

use crate::state::AppState;

/// A visitor session opened for the duration of one request.
pub struct SessionHandle {
    pub id: SessionId,
    pub session: Session,
    is_new: bool,
}

pub fn session_id_from_headers(headers: &HeaderMap, cookie_name: &str) -> Option<SessionId> {
    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').map(str::trim).find_map(|pair| {
        let (name, value) = pair.split_once('=')?;
        (name == cookie_name && !value.is_empty()).then(|| SessionId(value.to_string()))
    })
}

/// Resolve the visitor's session from the request cookie, or start a fresh
/// one. An unknown or absent cookie gets a new session id.
pub async fn open(state: &AppState, headers: &HeaderMap) -> Result<SessionHandle, ApplicationError> {
    if let Some(id) = session_id_from_headers(headers, &state.store.session_cookie) {
        let existing = state
            .sessions
            .load(&id)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))?;
        if let Some(session) = existing {
            return Ok(SessionHandle { id, session, is_new: false });
        }
    }

    Ok(SessionHandle { id: SessionId::generate(), session: Session::new(), is_new: true })
}

/// Persist the session if anything changed and produce the response headers.
/// Only a freshly minted session sets the cookie.
pub async fn commit(
    state: &AppState,
    handle: SessionHandle,
) -> Result<HeaderMap, ApplicationError> {
    if handle.is_new || handle.session.is_modified() {
        state
            .sessions
            .save(&handle.id, &handle.session)
            .await
            .map_err(|err| ApplicationError::Persistence(err.to_string()))?;
    }

    let mut headers = HeaderMap::new();
    if handle.is_new {
        let cookie = format!(
            "{}={}; Path=/; HttpOnly; SameSite=Lax",
            state.store.session_cookie, handle.id.0
        );
        let value = HeaderValue::from_str(&cookie)
            .map_err(|err| ApplicationError::Configuration(format!("invalid cookie: {err}")))?;
        headers.insert(header::SET_COOKIE, value);
    }

    Ok(headers)
}
