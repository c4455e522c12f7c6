//! covercache - cached command line access to the insurance portal API.
//!
//! Every command goes through the same cached services an interactive client
//! would use, and prints its result as JSON on stdout.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use covercache_core::models::{AssetPatch, AssetType, CreateAssetInput, PolicyTypeFilters};
use covercache_core::{ApiClient, Config, FileStore, Services};

// ── CLI ─────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "covercache", version, about = "cached access to the insurance portal API")]
struct Args {
    /// also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// backend base URL (overrides config and COVERCACHE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// dashboard overview
    Dashboard {
        #[arg(long)]
        refresh: bool,
    },
    /// list my policies
    Policies {
        #[arg(long)]
        refresh: bool,
    },
    /// show one of my policies
    Policy { id: String },
    /// cancel one of my policies
    Cancel {
        id: String,
        #[arg(long)]
        reason: Option<String>,
    },
    /// renew one of my policies
    Renew { id: String },
    /// list policy categories
    Categories,
    /// list policy types, optionally filtered
    Types {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        company: Option<String>,
        #[arg(long)]
        featured: bool,
        #[arg(long)]
        search: Option<String>,
        #[arg(long)]
        min_price: Option<f64>,
        #[arg(long)]
        max_price: Option<f64>,
    },
    /// compare policy types side by side
    Compare {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// list my assets
    Assets {
        #[arg(long)]
        refresh: bool,
    },
    /// list my vehicles
    Vehicles,
    /// register an asset
    AddAsset {
        #[arg(long = "type", value_enum)]
        asset_type: AssetKind,
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: Option<String>,
        /// free-form details as a JSON object
        #[arg(long)]
        details: Option<String>,
    },
    /// change an asset's name or description
    UpdateAsset {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        description: Option<String>,
    },
    /// remove an asset
    DeleteAsset { id: String },
    /// forget assets saved locally while the backend was unavailable
    ClearLocal,
    /// show the effective configuration
    Config {
        /// write the config file with every setting filled in
        #[arg(long)]
        init: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum AssetKind {
    Vehicle,
    Property,
    Business,
    Other,
}

impl From<AssetKind> for AssetType {
    fn from(kind: AssetKind) -> Self {
        match kind {
            AssetKind::Vehicle => AssetType::Vehicle,
            AssetKind::Property => AssetType::Property,
            AssetKind::Business => AssetType::Business,
            AssetKind::Other => AssetType::Other,
        }
    }
}

// ── Setup ───────────────────────────────────────────────────────────

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). The returned guard must
/// stay alive for file output to be flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .context("Log file path has no file name")?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    Ok(guard)
}

fn build_services(config: &Config) -> Result<Services> {
    let mut api = ApiClient::new(&config.api_base_url).context("Failed to create HTTP client")?;
    if let Some(ref token) = config.access_token {
        api.set_token(token.clone());
    }
    let data_dir = config.data_dir()?;
    let store = FileStore::new(&data_dir)
        .with_context(|| format!("Failed to open data directory: {}", data_dir.display()))?;
    Ok(Services::new(api, &config.cache, Arc::new(store)))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

// ── Commands ────────────────────────────────────────────────────────

async fn run(command: Command, config: &Config, services: &Services) -> Result<()> {
    match command {
        Command::Dashboard { refresh } => {
            print_json(&services.dashboard.get_dashboard_data(refresh).await?)
        }
        Command::Policies { refresh } => {
            print_json(&services.policies.get_user_policies(refresh).await?)
        }
        Command::Policy { id } => print_json(&services.policies.get_policy_by_id(&id).await?),
        Command::Cancel { id, reason } => print_json(
            &services
                .policies
                .cancel_policy(&id, reason.as_deref())
                .await
                .with_context(|| format!("Failed to cancel policy {}", id))?,
        ),
        Command::Renew { id } => print_json(
            &services
                .policies
                .renew_policy(&id)
                .await
                .with_context(|| format!("Failed to renew policy {}", id))?,
        ),
        Command::Categories => print_json(&services.catalog.get_categories().await?),
        Command::Types {
            category,
            company,
            featured,
            search,
            min_price,
            max_price,
        } => {
            let filters = PolicyTypeFilters {
                category,
                company,
                featured: featured.then_some(true),
                search,
                min_price,
                max_price,
            };
            print_json(&services.catalog.get_policy_types(&filters).await?)
        }
        Command::Compare { ids } => print_json(&services.catalog.compare_policies(&ids).await?),
        Command::Assets { refresh } => print_json(&services.assets.get_user_assets(refresh).await),
        Command::Vehicles => print_json(&services.assets.get_user_vehicles().await),
        Command::AddAsset {
            asset_type,
            name,
            description,
            details,
        } => {
            let details = match details {
                Some(raw) => serde_json::from_str(&raw).context("--details is not valid JSON")?,
                None => serde_json::Value::Object(Default::default()),
            };
            let input = CreateAssetInput {
                asset_type: asset_type.into(),
                name,
                description,
                details,
            };
            print_json(&services.assets.create_asset(input).await?)
        }
        Command::UpdateAsset {
            id,
            name,
            description,
        } => {
            let patch = AssetPatch {
                name,
                description,
                ..Default::default()
            };
            print_json(
                &services
                    .assets
                    .update_asset(&id, patch)
                    .await
                    .with_context(|| format!("Failed to update asset {}", id))?,
            )
        }
        Command::DeleteAsset { id } => {
            services
                .assets
                .delete_asset(&id)
                .await
                .with_context(|| format!("Failed to delete asset {}", id))?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        Command::ClearLocal => {
            services
                .assets
                .clear_local_copy()
                .context("Failed to clear local assets")?;
            print_json(&serde_json::json!({ "cleared": "assets" }))
        }
        Command::Config { init: true } => {
            // Only what is on disk; env and flag overrides stay out of the file
            let path = Config::config_path()?;
            Config::load_file(&path)?.save_to(&path)?;
            info!(path = %path.display(), "Wrote config file");
            print_json(&serde_json::json!({ "written": path }))
        }
        Command::Config { init: false } => {
            let mut shown = config.clone();
            if shown.access_token.is_some() {
                shown.access_token = Some("********".to_string());
            }
            print_json(&serde_json::json!({
                "path": Config::config_path()?,
                "data_dir": config.data_dir()?,
                "config": shown,
            }))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args = Args::parse();
    let _guard = init_tracing(args.log_file.as_deref())?;

    let mut config = Config::load()?;
    if let Some(url) = args.api_url {
        config.api_base_url = url;
    }
    info!(api = %config.api_base_url, "covercache starting");

    let services = build_services(&config)?;
    run(args.command, &config, &services).await
}
