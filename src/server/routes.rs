//! Router configuration for the routine portal.
//!
//! This module defines the HTTP routes and applies middleware for the access
//! guard and CORS.
//!
//! # Route Structure
//!
//! ```text
//! /api/health                         - Health check (public)
//! /api/routines/db                    - Obfuscated catalog (key required)
//! /api/routines/lookup                - Single routine (key required)
//! /api/download/{type}/{token}        - File as attachment (key required)
//! /api/view/{type}/{token}            - File inline (exempt from key)
//! ```
//!
//! The view route sits behind the same guard layer as the gated routes; the
//! guard itself exempts the view prefix.
//!
//! # Example
//!
//! ```ignore
//! use routine_portal::catalog::FileCatalogSource;
//! use routine_portal::files::RoutineStore;
//! use routine_portal::server::routes::{create_router, RouterConfig};
//!
//! let store = RoutineStore::new("storage/routines");
//! let catalog = FileCatalogSource::new("storage/routines/routine_db.json");
//!
//! let config = RouterConfig::new("shared-key")
//!     .with_cors_origins(vec!["https://example.com".to_string()]);
//!
//! let router = create_router(catalog, store, config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::time::Duration;

use axum::{middleware, routing::get, Router};
use http::header::CONTENT_TYPE;
use http::{HeaderName, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use super::auth::{api_key_middleware, ApiKeyGuard, API_KEY_HEADER, DEFAULT_VIEW_PREFIX};
use super::handlers::{
    download_handler, health_handler, lookup_handler, routines_handler, view_handler, AppState,
};
use crate::catalog::CatalogSource;
use crate::files::RoutineStore;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Shared key expected in the `x-api-key` header
    pub api_key: String,

    /// Whether the key is required on gated routes
    pub auth_enabled: bool,

    /// Path prefix exempt from the key check
    pub view_prefix: String,

    /// Allowed CORS origins (None = allow any origin)
    pub cors_origins: Option<Vec<String>>,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given API key.
    ///
    /// By default:
    /// - The key is required on gated routes
    /// - `/api/view/` is exempt from the key check
    /// - CORS allows any origin
    /// - Tracing is enabled
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            auth_enabled: true,
            view_prefix: DEFAULT_VIEW_PREFIX.to_string(),
            cors_origins: None,
            enable_tracing: true,
        }
    }

    /// Create a configuration with the key check disabled.
    ///
    /// **Warning**: This should only be used for development/testing.
    pub fn without_auth() -> Self {
        Self {
            auth_enabled: false,
            ..Self::new(String::new())
        }
    }

    /// Set specific allowed CORS origins.
    ///
    /// Pass an empty vec to disallow all cross-origin requests.
    pub fn with_cors_origins(mut self, origins: Vec<String>) -> Self {
        self.cors_origins = Some(origins);
        self
    }

    /// Allow any CORS origin.
    pub fn with_cors_any_origin(mut self) -> Self {
        self.cors_origins = None;
        self
    }

    /// Enable or disable the key check.
    pub fn with_auth_enabled(mut self, enabled: bool) -> Self {
        self.auth_enabled = enabled;
        self
    }

    /// Set the path prefix exempt from the key check.
    pub fn with_view_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.view_prefix = prefix.into();
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// This function builds the complete Axum router with:
/// - Public routes (health check)
/// - Guarded routes (catalog, lookup, download, and the exempt view route)
/// - CORS configuration
/// - Request tracing (optional)
pub fn create_router<C>(catalog: C, store: RoutineStore, config: RouterConfig) -> Router
where
    C: CatalogSource + 'static,
{
    let app_state = AppState::new(catalog, store);
    let cors = build_cors_layer(&config);

    let api_routes = Router::new()
        .route("/routines/db", get(routines_handler::<C>))
        .route("/routines/lookup", get(lookup_handler::<C>))
        .route("/view/{kind}/{token}", get(view_handler::<C>))
        .route("/download/{kind}/{token}", get(download_handler::<C>))
        .with_state(app_state);

    // Guard applied after nesting so it sees the full /api/... path
    let api_routes = if config.auth_enabled {
        let guard = ApiKeyGuard::new(&config.api_key).with_view_prefix(&config.view_prefix);
        Router::new()
            .nest("/api", api_routes)
            .layer(middleware::from_fn_with_state(guard, api_key_middleware))
    } else {
        Router::new().nest("/api", api_routes)
    };

    let public_routes = Router::new().route("/api/health", get(health_handler));

    let router = Router::new()
        .merge(api_routes)
        .merge(public_routes)
        .layer(cors);

    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

/// Build the CORS layer based on configuration.
fn build_cors_layer(config: &RouterConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::HEAD, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, HeaderName::from_static(API_KEY_HEADER)])
        .max_age(Duration::from_secs(86400)); // 24 hours

    match &config.cors_origins {
        None => cors.allow_origin(Any),
        Some(origins) if origins.is_empty() => cors,
        Some(origins) => {
            let parsed_origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            cors.allow_origin(parsed_origins)
        }
    }
}

// =============================================================================
// Convenience Functions
// =============================================================================

/// Create a development router with the key check disabled.
///
/// **Warning**: This should only be used for local development and testing.
pub fn create_dev_router<C>(catalog: C, store: RoutineStore) -> Router
where
    C: CatalogSource + 'static,
{
    create_router(catalog, store, RouterConfig::without_auth())
}

// =============================================================================
// Tests
// =============================================================================
