//! swarmview - live terminal dashboard for a swarm cluster
//!
//! This is the main CLI entry point for swarmview.

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use swarmview::channel::WsConnector;
use swarmview::config::{log_path, DashboardConfig};
use swarmview::error::Result;
use swarmview::session::Session;
use swarmview::tui::App;
use swarmview::view::SortBy;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// swarmview - live swarm dashboard
#[derive(Parser)]
#[command(name = "swarmview")]
#[command(author = "Evoker Industries")]
#[command(version)]
#[command(about = "A live terminal dashboard for Docker Swarm compatible clusters", long_about = None)]
struct Cli {
    /// Dashboard origin; the push channel URL is derived from it
    #[arg(long)]
    origin: Option<String>,

    /// Push channel URL, used as is
    #[arg(long)]
    url: Option<String>,

    /// Config file (defaults to the per-user config, if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Secondary sort key
    #[arg(long, value_enum)]
    sort: Option<SortArg>,

    /// Initial filter text
    #[arg(short, long)]
    filter: Option<String>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Log file (defaults to swarmview/swarmview.log in the per-user data directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Created,
    Service,
}

impl From<SortArg> for SortBy {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Created => SortBy::Created,
            SortArg::Service => SortBy::ServiceName,
        }
    }
}

/// The TUI owns the terminal, so logs never go to stderr
fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    match log_path(cli.log_file.as_deref()) {
        Some(path) => {
            if let Some(dir) = path.parent() {
                std::fs::create_dir_all(dir)?;
            }
            let file = std::fs::OpenOptions::new().create(true).append(true).open(&path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::sink)
                .init();
        }
    }
    Ok(())
}

fn load_config(cli: &Cli) -> Result<DashboardConfig> {
    let mut config = DashboardConfig::discover(cli.config.as_deref())?;

    if let Some(origin) = &cli.origin {
        config.origin = origin.clone();
    }
    if let Some(url) = &cli.url {
        config.url = Some(url.clone());
    }
    if let Some(sort) = cli.sort {
        config.view.sort_by = sort.into();
    }
    if let Some(filter) = &cli.filter {
        config.view.filter.text = filter.clone();
    }

    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config = load_config(&cli)?;
    let channel = config.channel_config()?;
    info!(url = %channel.url, "Starting dashboard");

    let (mut session, mut events) = Session::new(channel, Arc::new(WsConnector));
    let mut app = App::new(config.view.clone());
    app.run(&mut session, &mut events).await
}
