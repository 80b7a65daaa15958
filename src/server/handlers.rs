//! HTTP request handlers for the routine portal API.
//!
//! # Endpoints
//!
//! - `GET /api/routines/db` - Obfuscated routine catalog
//! - `GET /api/routines/lookup` - Single routine by program/intake/section
//! - `GET /api/view/{type}/{token}` - Stream a routine file inline
//! - `GET /api/download/{type}/{token}` - Stream a routine file as an attachment
//! - `GET /api/health` - Health check endpoint

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{
        rejection::{PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info, warn};

use crate::catalog::{Catalog, CatalogSource, RoutineRecord};
use crate::error::{CatalogError, LookupError, ResolveError};
use crate::files::{Delivery, RoutineStore};

/// Cache-Control value for responses that must never be cached.
pub const NO_STORE: &str = "no-store, no-cache, must-revalidate, proxy-revalidate";

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
pub struct AppState<C: CatalogSource> {
    /// Where the routine catalog is read from
    pub catalog: Arc<C>,

    /// Storage-root-scoped file resolver
    pub store: Arc<RoutineStore>,
}

impl<C: CatalogSource> AppState<C> {
    /// Create a new application state.
    pub fn new(catalog: C, store: RoutineStore) -> Self {
        Self {
            catalog: Arc::new(catalog),
            store: Arc::new(store),
        }
    }
}

impl<C: CatalogSource> Clone for AppState<C> {
    fn clone(&self) -> Self {
        Self {
            catalog: Arc::clone(&self.catalog),
            store: Arc::clone(&self.store),
        }
    }
}

// =============================================================================
// Request Parameters
// =============================================================================

/// Path parameters for view and download requests.
///
/// Extracted from: `/api/{view,download}/{kind}/{token}`
#[derive(Debug, Deserialize)]
pub struct FilePathParams {
    /// Requested file kind ("image" or "pdf")
    pub kind: String,

    /// Encoded storage path
    pub token: String,
}

/// Query parameters for the lookup endpoint.
#[derive(Debug, Default, Deserialize)]
pub struct LookupQueryParams {
    #[serde(default)]
    pub program: Option<String>,

    #[serde(default)]
    pub intake: Option<String>,

    #[serde(default)]
    pub section: Option<String>,
}

// =============================================================================
// Response Types
// =============================================================================

/// JSON error response returned for all error conditions.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error type identifier (e.g., "not_found", "invalid_type")
    pub error: String,

    /// Human-readable error message
    pub message: String,

    /// HTTP status code (included for convenience)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
}

impl ErrorResponse {
    /// Create a new error response.
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create a new error response with status code.
    pub fn with_status(
        error: impl Into<String>,
        message: impl Into<String>,
        status: StatusCode,
    ) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
            status: Some(status.as_u16()),
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Short human-readable status line
    pub message: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Error Mapping
// =============================================================================

/// Build a JSON error response, logging by severity:
/// - 5xx at ERROR
/// - 403 at WARN
/// - 404 at DEBUG (common and expected)
/// - other 4xx at WARN
fn error_response(status: StatusCode, error_type: &str, message: String) -> Response {
    if status.is_server_error() {
        error!(
            error_type = error_type,
            status = status.as_u16(),
            "Server error: {}",
            message
        );
    } else if status == StatusCode::NOT_FOUND {
        debug!(
            error_type = error_type,
            status = status.as_u16(),
            "Resource not found: {}",
            message
        );
    } else {
        warn!(
            error_type = error_type,
            status = status.as_u16(),
            "Client error: {}",
            message
        );
    }

    let error_response = ErrorResponse::with_status(error_type, message, status);
    (status, Json(error_response)).into_response()
}

/// Any catalog failure is a server error; the body never carries partial data.
impl IntoResponse for CatalogError {
    fn into_response(self) -> Response {
        error_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "catalog_error",
            format!("Failed to load routines: {}", self),
        )
    }
}

impl IntoResponse for ResolveError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            ResolveError::InvalidReference => (StatusCode::BAD_REQUEST, "invalid_reference"),
            ResolveError::InvalidType(_) => (StatusCode::BAD_REQUEST, "invalid_type"),
            ResolveError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            ResolveError::AccessDenied => (StatusCode::FORBIDDEN, "access_denied"),
            ResolveError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "io_error"),
        };

        // Do not echo decoded storage paths back to the client
        let message = match &self {
            ResolveError::NotFound(path) => {
                debug!(path = %path, "Requested file is missing");
                "File not found".to_string()
            }
            _ => self.to_string(),
        };

        error_response(status, error_type, message)
    }
}

impl IntoResponse for LookupError {
    fn into_response(self) -> Response {
        match self {
            LookupError::MissingSelection(_) => error_response(
                StatusCode::BAD_REQUEST,
                "missing_selection",
                self.to_string(),
            ),
            LookupError::InvalidQuery(_) => {
                error_response(StatusCode::BAD_REQUEST, "invalid_query", self.to_string())
            }
            LookupError::NoMatch { .. } => {
                error_response(StatusCode::NOT_FOUND, "not_found", self.to_string())
            }
            LookupError::Catalog(err) => err.into_response(),
        }
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle routine catalog requests.
///
/// # Endpoint
///
/// `GET /api/routines/db`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// { "payload": "<base64 of the JSON record array, file paths tokenized>" }
/// ```
///
/// # Headers
///
/// - `Cache-Control: no-store, no-cache, must-revalidate, proxy-revalidate`
/// - `Pragma: no-cache`
/// - `Expires: 0`
///
/// # Errors
///
/// - `403 Forbidden`: Missing or wrong API key (from the guard)
/// - `500 Internal Server Error`: Catalog unreadable or malformed
pub async fn routines_handler<C: CatalogSource>(
    State(state): State<AppState<C>>,
) -> Result<Response, CatalogError> {
    let catalog = Catalog::load(state.catalog.as_ref()).await?;
    let payload = catalog.to_payload()?;

    debug!(
        records = catalog.len(),
        source = %state.catalog.describe(),
        "Serving routine catalog"
    );

    Ok((
        [
            (header::CACHE_CONTROL, NO_STORE),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(payload),
    )
        .into_response())
}

/// Handle single routine lookups.
///
/// # Endpoint
///
/// `GET /api/routines/lookup?program=...&intake=...&section=...`
///
/// # Response
///
/// `200 OK` with the first matching record, file paths tokenized.
///
/// # Errors
///
/// - `400 Bad Request`: A selection parameter is missing, empty, or repeated
/// - `404 Not Found`: No record matches
/// - `500 Internal Server Error`: Catalog unreadable or malformed
pub async fn lookup_handler<C: CatalogSource>(
    State(state): State<AppState<C>>,
    query: Result<Query<LookupQueryParams>, QueryRejection>,
) -> Result<Response, LookupError> {
    let Query(query) = query.map_err(|e| LookupError::InvalidQuery(e.body_text()))?;
    let catalog = Catalog::load(state.catalog.as_ref()).await?;

    let record = catalog.find(
        query.program.as_deref().unwrap_or(""),
        query.intake.as_deref().unwrap_or(""),
        query.section.as_deref().unwrap_or(""),
    )?;
    let record: RoutineRecord = record.with_encoded_paths();

    Ok(([(header::CACHE_CONTROL, NO_STORE)], Json(record)).into_response())
}

/// Handle inline file requests.
///
/// # Endpoint
///
/// `GET /api/view/{type}/{token}`
///
/// Not gated by the API key, so the URL can be used as an `<img>` source.
///
/// # Response
///
/// `200 OK` streaming the file with only `Content-Type` and `Content-Length`.
/// No `Content-Disposition` header is sent.
///
/// # Errors
///
/// - `400 Bad Request`: Invalid token or file type
/// - `403 Forbidden`: Token resolves outside the storage root
/// - `404 Not Found`: File does not exist
/// - `500 Internal Server Error`: Unexpected I/O failure
pub async fn view_handler<C: CatalogSource>(
    State(state): State<AppState<C>>,
    params: Result<Path<FilePathParams>, PathRejection>,
) -> Result<Response, ResolveError> {
    let Path(params) = params.map_err(path_rejection)?;
    serve_file(&state.store, &params, Delivery::Inline).await
}

/// Handle file download requests.
///
/// # Endpoint
///
/// `GET /api/download/{type}/{token}`
///
/// # Response
///
/// `200 OK` streaming the file with `Content-Type` and
/// `Content-Disposition: attachment; filename="<base name>"`.
///
/// # Errors
///
/// Same as [`view_handler`], plus `403 Forbidden` for a missing or wrong key.
pub async fn download_handler<C: CatalogSource>(
    State(state): State<AppState<C>>,
    params: Result<Path<FilePathParams>, PathRejection>,
) -> Result<Response, ResolveError> {
    let Path(params) = params.map_err(path_rejection)?;
    serve_file(&state.store, &params, Delivery::Attachment).await
}

/// A path segment that cannot be extracted (e.g. not valid UTF-8 once
/// percent-decoded) is an unusable file reference.
fn path_rejection(rejection: PathRejection) -> ResolveError {
    debug!(error = %rejection.body_text(), "Rejected file path parameters");
    ResolveError::InvalidReference
}

/// Resolve, open, and stream a routine file.
///
/// The body is streamed chunk by chunk; if reading fails midway the
/// connection is cut and the truncated response is the only symptom.
async fn serve_file(
    store: &RoutineStore,
    params: &FilePathParams,
    delivery: Delivery,
) -> Result<Response, ResolveError> {
    let resolved = store.resolve(&params.kind, &params.token).await?;
    let file = resolved.open().await?;

    let length = file
        .metadata()
        .await
        .map(|m| m.len())
        .unwrap_or(resolved.size);

    info!(
        kind = %resolved.kind,
        path = %resolved.relative,
        size = length,
        delivery = ?delivery,
        "Serving routine file"
    );

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, resolved.content_type())
        .header(header::CONTENT_LENGTH, length);

    if let Some(disposition) = delivery.content_disposition(resolved.file_name()) {
        builder = builder.header(header::CONTENT_DISPOSITION, disposition);
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| ResolveError::Io(format!("failed to build response: {}", e)))
}

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /api/health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "ok",
///   "message": "Server is running",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// =============================================================================
// Tests
// =============================================================================
