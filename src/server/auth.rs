//! Shared-key access guard for the routine portal.
//!
//! Gated routes require the `x-api-key` header to equal a configured key.
//! Requests under the inline view prefix (`/api/view/` by default) are let
//! through without a key: browsers load those URLs from `<img>` tags, which
//! cannot attach custom headers. Those routes rely solely on the storage-root
//! containment check in [`RoutineStore`](crate::files::RoutineStore).
//!
//! # Not authentication
//!
//! The key is a single static value shipped inside the web client, so anyone
//! who reads the client code has it. The guard only keeps out casual direct
//! browser access to the catalog and download routes. If real access control
//! is ever needed it must be replaced by per-user credentials checked
//! server-side.
//!
//! # Example
//!
//! ```rust
//! use routine_portal::server::auth::{AuthError, ApiKeyGuard};
//!
//! let guard = ApiKeyGuard::new("shared-key");
//!
//! assert!(guard.check("/api/routines/db", Some("shared-key")).is_ok());
//! assert!(matches!(guard.check("/api/download/pdf/abc", None), Err(AuthError::MissingKey)));
//! assert!(guard.check("/api/view/image/abc", None).is_ok());
//! ```

use axum::{
    extract::{OriginalUri, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use subtle::ConstantTimeEq;
use tracing::warn;

use super::handlers::ErrorResponse;

/// Header carrying the shared key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Path prefix exempt from the key check.
pub const DEFAULT_VIEW_PREFIX: &str = "/api/view/";

// =============================================================================
// Errors
// =============================================================================

/// Access guard rejection reasons.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// No key header on a gated route
    MissingKey,

    /// Key header present but wrong
    InvalidKey,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MissingKey => write!(
                f,
                "Access Denied: Direct browser access is not allowed (missing API key)"
            ),
            AuthError::InvalidKey => write!(
                f,
                "Access Denied: Direct browser access is not allowed (invalid API key)"
            ),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = StatusCode::FORBIDDEN;
        let error_type = match &self {
            AuthError::MissingKey => "missing_api_key",
            AuthError::InvalidKey => "invalid_api_key",
        };
        let message = self.to_string();

        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Access denied: {}",
            message
        );

        let error_response = ErrorResponse::with_status(error_type, message, status);
        (status, Json(error_response)).into_response()
    }
}

// =============================================================================
// Guard
// =============================================================================

/// Stateless shared-key check with a path exemption for inline viewing.
#[derive(Clone)]
pub struct ApiKeyGuard {
    api_key: Vec<u8>,
    view_prefix: String,
}

impl ApiKeyGuard {
    /// Create a guard expecting the given key.
    pub fn new(api_key: impl AsRef<[u8]>) -> Self {
        Self {
            api_key: api_key.as_ref().to_vec(),
            view_prefix: DEFAULT_VIEW_PREFIX.to_string(),
        }
    }

    /// Use a different exempt path prefix.
    pub fn with_view_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.view_prefix = prefix.into();
        self
    }

    /// The exempt path prefix.
    pub fn view_prefix(&self) -> &str {
        &self.view_prefix
    }

    /// Decide whether a request may proceed.
    ///
    /// Paths under the view prefix always pass. Everything else needs a
    /// supplied key exactly equal to the configured one.
    pub fn check(&self, path: &str, supplied: Option<&str>) -> Result<(), AuthError> {
        if path.starts_with(&self.view_prefix) {
            return Ok(());
        }

        let supplied = supplied.ok_or(AuthError::MissingKey)?;

        // ct_eq returns false for differing lengths
        if supplied.as_bytes().ct_eq(&self.api_key).into() {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware applying [`ApiKeyGuard`] to every request it wraps.
///
/// Uses the original URI so the check sees the full path even inside nested
/// routers. A key header that is not valid UTF-8 counts as a wrong key.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use routine_portal::server::auth::{ApiKeyGuard, api_key_middleware};
///
/// let guard = ApiKeyGuard::new("shared-key");
/// let app = Router::new()
///     .route("/api/routines/db", get(routines_handler))
///     .layer(middleware::from_fn_with_state(guard, api_key_middleware));
/// ```
pub async fn api_key_middleware(
    State(guard): State<ApiKeyGuard>,
    OriginalUri(original_uri): OriginalUri,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let supplied = match request.headers().get(API_KEY_HEADER) {
        Some(value) => Some(value.to_str().map_err(|_| AuthError::InvalidKey)?),
        None => None,
    };

    guard.check(original_uri.path(), supplied)?;

    Ok(next.run(request).await)
}

// =============================================================================
// Tests
// =============================================================================
