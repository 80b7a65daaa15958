//! Routine Portal - class routine lookup and download server.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use routine_portal::{
    catalog::{Catalog, CatalogSource, FileCatalogSource},
    codec::{decode_token, encode_path},
    config::{CheckConfig, Cli, Command, ServeConfig, TokenAction, TokenConfig},
    files::RoutineStore,
    server::{create_router, RouterConfig},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Token(config) => run_token(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    init_logging(config.verbose);

    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    print_banner();

    let catalog_path = config.catalog_path();

    info!("Configuration:");
    info!("  Storage root: {}", config.storage_root.display());
    info!("  Catalog: {}", catalog_path.display());

    if config.auth_enabled {
        info!("  API key: required on catalog and download routes");
    } else {
        warn!("  API key: DISABLED - catalog and downloads are publicly accessible");
        warn!("           Enable for production: --auth-enabled true --api-key=<key>");
    }

    if !config.storage_root.is_dir() {
        error!(
            "Storage root {} does not exist or is not a directory",
            config.storage_root.display()
        );
        return ExitCode::FAILURE;
    }

    let source = FileCatalogSource::new(&catalog_path);

    // The catalog is re-read per request, so a broken one is not fatal here
    info!("");
    info!("Loading catalog...");
    match Catalog::load(&source).await {
        Ok(catalog) => info!("  Found {} routine(s)", catalog.len()),
        Err(e) => {
            warn!("  {}", e);
            warn!("  Catalog requests will fail until the file is fixed");
        }
    }

    let store = RoutineStore::new(&config.storage_root);
    let router = create_router(source, store, build_router_config(&config));

    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/api/health", addr);
    if config.auth_enabled {
        info!(
            "    curl -H 'x-api-key: <key>' http://{}/api/routines/db",
            addr
        );
    } else {
        info!("    curl http://{}/api/routines/db", addr);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Print the startup banner.
fn print_banner() {
    let version = env!("CARGO_PKG_VERSION");
    info!("");
    info!("╦═╗╔═╗╦ ╦╔╦╗╦╔╗╔╔═╗  ╔═╗╔═╗╦═╗╔╦╗╔═╗╦  ");
    info!("╠╦╝║ ║║ ║ ║ ║║║║║╣   ╠═╝║ ║╠╦╝ ║ ╠═╣║  ");
    info!("╩╚═╚═╝╚═╝ ╩ ╩╝╚╝╚═╝  ╩  ╚═╝╩╚═ ╩ ╩ ╩╩═╝");
    info!("");
    info!("                                   v{}", version);
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "routine_portal=debug,tower_http=debug"
    } else {
        "routine_portal=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> RouterConfig {
    let mut router_config = if config.auth_enabled {
        RouterConfig::new(config.api_key_or_empty())
    } else {
        RouterConfig::without_auth()
    };

    if let Some(ref origins) = config.cors_origins {
        router_config = router_config.with_cors_origins(origins.clone());
    }

    router_config.with_tracing(!config.no_tracing)
}

// =============================================================================
// Token Command
// =============================================================================

fn run_token(config: TokenConfig) -> ExitCode {
    match config.action {
        TokenAction::Encode { path } => {
            println!("{}", encode_path(&path));
            ExitCode::SUCCESS
        }
        TokenAction::Decode { token } => match decode_token(&token) {
            Some(path) => {
                println!("{}", path);
                ExitCode::SUCCESS
            }
            None => {
                eprintln!("Error: '{}' is not a valid file token", token);
                ExitCode::FAILURE
            }
        },
    }
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    if config.verbose {
        init_logging(true);
    }

    println!("Routine Portal Catalog Check");
    println!("════════════════════════════");
    println!();

    if config.storage_root.is_dir() {
        println!("✓ Storage root: {}", config.storage_root.display());
    } else {
        println!(
            "✗ Storage root: {} is not a directory",
            config.storage_root.display()
        );
        return ExitCode::FAILURE;
    }

    let source = FileCatalogSource::new(config.catalog_path());
    let catalog = match Catalog::load(&source).await {
        Ok(catalog) => {
            println!(
                "✓ Catalog: {} ({} routines)",
                source.describe(),
                catalog.len()
            );
            catalog
        }
        Err(e) => {
            println!("✗ Catalog: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print!("Checking referenced files... ");

    let store = RoutineStore::new(&config.storage_root);
    let issues = catalog.audit(&store).await;

    if issues.is_empty() {
        println!("✓ all {} files present", catalog.len() * 2);
    } else {
        println!("✗ {} problem(s)", issues.len());
        println!();
        for issue in &issues {
            let record = &catalog.records()[issue.index];
            println!(
                "  {} / {} / {}: {}",
                record.program, record.intake, record.section, issue
            );
        }
        return ExitCode::FAILURE;
    }

    println!();
    println!("════════════════════════════");
    println!("✓ All checks passed!");

    ExitCode::SUCCESS
}
