//! HTTP server layer for the routine portal.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         HTTP Layer                              │
//! │     /api/routines/*    /api/view/*    /api/download/*           │
//! │                                                                 │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────────┐  │
//! │  │  handlers   │  │     auth     │  │        routes          │  │
//! │  │ (requests)  │  │ (shared key) │  │   (router config)      │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod handlers;
pub mod routes;

pub use auth::{api_key_middleware, ApiKeyGuard, AuthError, API_KEY_HEADER, DEFAULT_VIEW_PREFIX};
pub use handlers::{
    download_handler, health_handler, lookup_handler, routines_handler, view_handler, AppState,
    ErrorResponse, FilePathParams, HealthResponse, LookupQueryParams, NO_STORE,
};
pub use routes::{create_dev_router, create_router, RouterConfig};
