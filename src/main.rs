use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;

mod app;
mod chat_client;
mod config;
mod conversation;
mod handler;
mod logging;
mod markdown;
mod tui;
mod ui;

use app::App;
use chat_client::ChatClient;
use config::Config;
use tui::{EventHandler, Tui};

#[derive(Parser)]
#[command(name = "chat-panel")]
#[command(about = "Chat with an assistant served over a JSON HTTP endpoint")]
#[command(version)]
struct Cli {
    /// Chat endpoint URL (default: http://localhost:8000/api/chat)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Config file to use instead of the per-user one
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Where to write the diagnostic log
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Write the effective settings back to the config file and continue
    #[arg(long)]
    save_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match cli.config {
        Some(path) => path,
        None => Config::get_config_path()?,
    };
    let mut config = Config::load_from(&config_path)?;
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = Some(endpoint);
    }
    if cli.save_config {
        config.save_to(&config_path)?;
    }

    let log_path = match cli.log_file {
        Some(path) => path,
        None => logging::default_log_path()?,
    };
    logging::init(&log_path)?;
    tracing::info!(endpoint = config.endpoint(), config = %config_path.display(), "starting chat panel");

    let backend = Arc::new(ChatClient::new(config.endpoint()));
    let mut app = App::new(&config, backend);

    tui::install_panic_hook();
    let mut terminal = tui::init()?;

    let result = run(&mut terminal, &mut app).await;

    tui::restore()?;
    if let Err(error) = &result {
        tracing::error!(%error, "chat panel exited with error");
    }
    result
}

async fn run(terminal: &mut Tui, app: &mut App) -> Result<()> {
    let mut events = EventHandler::new();

    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event),
            None => break,
        }
    }

    if app.is_awaiting() {
        tracing::info!("quitting with a request still in flight");
    }
    Ok(())
}
