//! QWC2 themes generator.
//!
//! Reads the themes configuration, queries every configured QGIS Server
//! project for its GetProjectSettings and writes `themes.json`:
//! - Themes that cannot be read become error entries, the run goes on
//! - Missing thumbnails are rendered with GetMap into the assets directory
//! - An unreadable configuration aborts without writing anything

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use themes_generator::{generate, GeneratorOptions, ThemesConfig};
use wms_protocol::HttpFetcher;

#[derive(Parser, Debug)]
#[command(name = "themes-generator")]
#[command(about = "Generate the QWC2 themes.json from QGIS Server project settings")]
struct Args {
    /// Themes configuration file (JSON, or YAML by extension)
    #[arg(short, long, env = "QWC2_THEMES_CONFIG", default_value = "themesConfig.json")]
    config: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "themes.json")]
    output: PathBuf,

    /// Client assets directory (thumbnails go to img/mapthumbs below it)
    #[arg(long, default_value = "assets")]
    assets_dir: PathBuf,

    /// Base URL for service URLs given as a path
    #[arg(long, env = "QWC2_HOST_URL", default_value = "http://localhost")]
    host_url: String,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment from .env file if present
    dotenvy::dotenv().ok();

    let args = Args::parse();
    init_tracing(&args)?;

    info!(config = %args.config.display(), "Reading themes configuration");
    let config = ThemesConfig::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;

    let options = GeneratorOptions {
        host_url: args.host_url.clone(),
        assets_dir: args.assets_dir.clone(),
        config_dir: config_dir(&args.config),
    };
    let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;

    let document = generate(&config, &fetcher, &options).await;
    let (themes, errors) = document.summary();
    if errors > 0 {
        warn!(errors, "Some themes could not be read");
    }

    let json = serde_json::to_string_pretty(&document).context("Failed to serialize themes")?;
    tokio::fs::write(&args.output, json)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(output = %args.output.display(), themes, errors, "Wrote themes configuration");
    Ok(())
}

fn init_tracing(args: &Args) -> Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let builder = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true);

    if args.json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

/// Directory edit config paths are resolved against.
fn config_dir(config: &Path) -> PathBuf {
    config
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}
