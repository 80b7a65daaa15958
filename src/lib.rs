//! # Routine Portal
//!
//! A lookup-and-download server for class routines.
//!
//! Clients fetch the routine catalog, pick a program, intake, and section, and
//! then load the matching routine image inline or download its PDF. The
//! library provides the layer between those clients and the on-disk file
//! store:
//!
//! - File paths are swapped for opaque tokens before leaving the server
//! - Tokens are resolved back to files strictly inside a storage root
//! - Catalog and download routes are gated by a shared `x-api-key` header,
//!   while the inline view route stays open for `<img>` tags
//!
//! Neither the tokens nor the shared key are security controls. The storage
//! root containment check is.
//!
//! ## Architecture
//!
//! - [`codec`] - Path token encoding and decoding
//! - [`catalog`] - Routine records, catalog loading, and the listing payload
//! - [`files`] - Storage-root-scoped resolution and delivery modes
//! - [`server`] - Axum-based HTTP server, access guard, and routes
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use routine_portal::{create_router, FileCatalogSource, RouterConfig, RoutineStore};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RoutineStore::new("storage/routines");
//!     let catalog = FileCatalogSource::new("storage/routines/routine_db.json");
//!     let router = create_router(catalog, store, RouterConfig::new("shared-key"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3001").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod catalog;
pub mod codec;
pub mod config;
pub mod error;
pub mod files;
pub mod server;

// Re-export commonly used types
pub use catalog::{
    AuditIssue, Catalog, CatalogPayload, CatalogSource, FileCatalogSource, Intake, RoutineRecord,
};
pub use codec::{decode_token, encode_path};
pub use config::{CheckConfig, Cli, Command, ServeConfig, TokenAction, TokenConfig};
pub use error::{CatalogError, LookupError, ResolveError};
pub use files::{content_type_for, Delivery, FileKind, ResolvedFile, RoutineStore};
pub use server::{
    api_key_middleware, create_dev_router, create_router, health_handler, ApiKeyGuard, AppState,
    AuthError, ErrorResponse, HealthResponse, RouterConfig,
};
