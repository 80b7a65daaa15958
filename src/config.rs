//! Configuration management for the routine portal.
//!
//! This module provides a configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `ROUTINE_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use clap::Parser;
//! use routine_portal::config::{Cli, Command};
//!
//! match Cli::parse().into_command() {
//!     Command::Serve(config) => println!("Listening on {}", config.bind_address()),
//!     Command::Token(_) | Command::Check(_) => {}
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `ROUTINE_HOST` - Server bind address (default: 0.0.0.0)
//! - `ROUTINE_PORT` - Server port (default: 3001)
//! - `ROUTINE_STORAGE_ROOT` - Directory holding routine files (default: storage/routines)
//! - `ROUTINE_CATALOG` - Catalog JSON file (default: `<storage root>/routine_db.json`)
//! - `ROUTINE_API_KEY` - Shared key expected in the `x-api-key` header
//! - `ROUTINE_AUTH_ENABLED` - Require the key on gated routes (default: true)
//! - `ROUTINE_CORS_ORIGINS` - Allowed CORS origins, comma-separated (default: any)

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 3001;

/// Default storage root, relative to the working directory.
pub const DEFAULT_STORAGE_ROOT: &str = "storage/routines";

/// File name of the catalog inside the storage root.
pub const DEFAULT_CATALOG_FILE: &str = "routine_db.json";

// =============================================================================
// CLI
// =============================================================================

/// Routine Portal - class routine lookup and download server.
///
/// Serves an obfuscated routine catalog and streams routine images and PDFs
/// from a local storage directory. Runs `serve` when no subcommand is given.
#[derive(Parser, Debug, Clone)]
#[command(name = "routine-portal")]
#[command(author, version, about, long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub serve: ServeConfig,
}

impl Cli {
    /// Resolve the command to run, defaulting to `serve`.
    pub fn into_command(self) -> Command {
        self.command.unwrap_or(Command::Serve(self.serve))
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Encode a storage path into a token, or decode a token
    Token(TokenConfig),

    /// Validate the catalog and every file it references
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "ROUTINE_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "ROUTINE_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory containing routine images and PDFs.
    ///
    /// No file outside this directory is ever served.
    #[arg(long, default_value = DEFAULT_STORAGE_ROOT, env = "ROUTINE_STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// Path to the routine catalog JSON file.
    ///
    /// Defaults to `routine_db.json` inside the storage root.
    #[arg(long, env = "ROUTINE_CATALOG")]
    pub catalog: Option<PathBuf>,

    // =========================================================================
    // Access Configuration
    // =========================================================================
    /// Shared key expected in the `x-api-key` header on gated routes.
    ///
    /// The same key ships with the web client, so it only keeps out casual
    /// direct browser access. It is not a credential.
    #[arg(long, env = "ROUTINE_API_KEY")]
    pub api_key: Option<String>,

    /// Require the shared key on gated routes.
    ///
    /// WARNING: Only disable in development/testing.
    #[arg(
        long,
        default_value_t = true,
        env = "ROUTINE_AUTH_ENABLED",
        action = clap::ArgAction::Set
    )]
    pub auth_enabled: bool,

    // =========================================================================
    // CORS Configuration
    // =========================================================================
    /// Allowed CORS origins (comma-separated).
    ///
    /// If not specified, allows any origin.
    #[arg(long, env = "ROUTINE_CORS_ORIGINS", value_delimiter = ',')]
    pub cors_origins: Option<Vec<String>>,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_enabled {
            match self.api_key.as_deref() {
                None => {
                    return Err(
                        "Authentication is enabled but no API key provided. \
                         Set --api-key or ROUTINE_API_KEY, or disable auth with --auth-enabled false"
                            .to_string(),
                    )
                }
                Some(key) if key.is_empty() => {
                    return Err("API key must not be empty".to_string());
                }
                Some(_) => {}
            }
        }

        if self.storage_root.as_os_str().is_empty() {
            return Err(
                "Storage root is required. Set --storage-root or ROUTINE_STORAGE_ROOT".to_string(),
            );
        }

        if self.port == 0 {
            return Err("port must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the catalog path, falling back to the file inside the storage root.
    pub fn catalog_path(&self) -> PathBuf {
        catalog_path(&self.storage_root, self.catalog.as_ref())
    }

    /// Get the API key, or an empty string when unset (call validate() first).
    pub fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }
}

fn catalog_path(storage_root: &std::path::Path, catalog: Option<&PathBuf>) -> PathBuf {
    catalog
        .cloned()
        .unwrap_or_else(|| storage_root.join(DEFAULT_CATALOG_FILE))
}

// =============================================================================
// Token
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct TokenConfig {
    #[command(subcommand)]
    pub action: TokenAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TokenAction {
    /// Print the token for a relative storage path
    Encode {
        /// Path relative to the storage root (e.g. routine_images/CSE_p1.png)
        path: String,
    },

    /// Print the storage path behind a token
    Decode {
        /// Token as it appears in view/download URLs
        token: String,
    },
}

// =============================================================================
// Check
// =============================================================================

#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Directory containing routine images and PDFs.
    #[arg(long, default_value = DEFAULT_STORAGE_ROOT, env = "ROUTINE_STORAGE_ROOT")]
    pub storage_root: PathBuf,

    /// Path to the routine catalog JSON file.
    #[arg(long, env = "ROUTINE_CATALOG")]
    pub catalog: Option<PathBuf>,

    /// Enable verbose logging.
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl CheckConfig {
    /// Get the catalog path, falling back to the file inside the storage root.
    pub fn catalog_path(&self) -> PathBuf {
        catalog_path(&self.storage_root, self.catalog.as_ref())
    }
}

// =============================================================================
// Tests
// =============================================================================
