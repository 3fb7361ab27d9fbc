use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::Parser;
use matrix_core::{push, Config, MatrixClient};
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "matrix-ai")]
#[command(about = "Terminal client for the Matrix AI chat and voice assistant")]
#[command(version)]
struct Cli {
    /// Base URL of the Matrix AI server (overrides MATRIX_AI_URL)
    #[arg(short, long)]
    server: Option<String>,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Start without the digital rain
    #[arg(long)]
    no_rain: bool,

    /// Where to write the diagnostic log
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn default_log_path() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .or_else(dirs::config_dir)
        .context("Could not determine cache directory")?;
    Ok(cache_dir.join("matrix-ai").join("matrix-ai.log"))
}

/// The terminal belongs to the UI, so diagnostics go to a file
fn init_logging(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,matrix_core=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}

fn load_config(cli: &Cli) -> Config {
    let loaded = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    let mut config = loaded.unwrap_or_else(|e| {
        warn!(error = %e, "could not load config, using defaults");
        Config::new()
    });

    config.apply_env();
    if let Some(server) = &cli.server {
        config.server_url = server.clone();
    }
    if cli.no_rain {
        config.rain.enabled = false;
    }
    config
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_path = match &cli.log_file {
        Some(path) => path.clone(),
        None => default_log_path()?,
    };
    init_logging(&log_path)?;

    let config = load_config(&cli);
    let client = MatrixClient::new(&config.server_url)
        .with_context(|| format!("Invalid server url: {}", config.server_url))?;
    info!(server = %config.server_url, "starting matrix-ai");

    // Push channel runs for the life of the session; no reconnects
    let (push_tx, mut push_rx) = mpsc::unbounded_channel();
    let server_url = config.server_url.clone();
    tokio::spawn(async move {
        if let Err(e) = push::run(&server_url, push_tx).await {
            warn!(error = %e, "push channel failed");
        }
    });

    let (widget_tx, mut widget_rx) = mpsc::unbounded_channel();
    let mut events = EventHandler::new();
    let mut app = App::new(&config, client, widget_tx, events.sender());

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let size = terminal.size()?;
    app.resize_surface(size.width, size.height);
    if config.rain.enabled {
        app.start_rain();
    }

    let result = run(&mut terminal, &mut app, &mut events, &mut widget_rx, &mut push_rx).await;

    app.stop_rain();
    tui::restore()?;
    info!("session ended");
    result
}

async fn run(
    terminal: &mut tui::Tui,
    app: &mut App,
    events: &mut EventHandler,
    widget_rx: &mut mpsc::UnboundedReceiver<matrix_core::WidgetEvent>,
    push_rx: &mut mpsc::UnboundedReceiver<matrix_core::PushEvent>,
) -> Result<()> {
    loop {
        terminal.draw(|frame| ui::render(app, frame))?;

        tokio::select! {
            Some(event) = events.next() => handler::handle_event(app, event)?,
            Some(event) = widget_rx.recv() => app.on_widget_event(event),
            Some(event) = push_rx.recv() => app.on_push(event),
            else => break,
        }

        if app.should_quit {
            break;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use matrix_core::config::SERVER_URL_ENV;

    #[test]
    fn server_url_precedence() {
        let dir = std::env::temp_dir().join("matrix-ai-cli-test");
        let missing = dir.join("absent.json");
        let missing = missing.to_str().unwrap();
        std::env::set_var(SERVER_URL_ENV, "http://from-env:5000");

        // The environment is read once, by the config layer
        let cli = Cli::try_parse_from(["matrix-ai", "--config", missing]).unwrap();
        assert!(cli.server.is_none());
        assert_eq!(load_config(&cli).server_url, "http://from-env:5000");

        let cli = Cli::try_parse_from(["matrix-ai", "--config", missing, "-s", "http://flag:5000"])
            .unwrap();
        assert_eq!(load_config(&cli).server_url, "http://flag:5000");

        std::env::remove_var(SERVER_URL_ENV);
    }
}
