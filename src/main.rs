use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use tracing::info;

use analyst_chat::config::{self, ChatConfig};
use analyst_chat::widget::HttpBackend;
use analyst_chat::{console, tui};

#[derive(Parser, Debug)]
#[command(name = "analyst-chat", version, about = "Chat with the data analyst from your terminal")]
struct Cli {
    /// Config file (defaults to ~/.analyst-chat/config.toml)
    #[arg(short, long, env = "ANALYST_CHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Base URL of the chat server
    #[arg(long)]
    url: Option<String>,

    /// Plain line console instead of the terminal UI
    #[arg(long)]
    plain: bool,

    /// Override a config value, e.g. --set credits=2/5
    #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_key_val)]
    overrides: Vec<(String, String)>,
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    s.split_once('=')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))
}

fn init_logging(config: &ChatConfig, to_file: bool) -> anyhow::Result<()> {
    let level = config.log_level();
    if to_file {
        // The terminal belongs to the UI, so logs go to a file.
        let path = config.log_file();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create log directory: {}", parent.display()))?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file: {}", path.display()))?;
        tracing_subscriber::fmt()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_max_level(level)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(level)
            .init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = config::load_or_create_config(cli.config.as_deref())?;
    let mut overrides = cli.overrides;
    if let Some(url) = cli.url {
        overrides.push(("url".to_string(), url));
    }
    config.merge_overrides(overrides)?;

    let use_tui = config.tui.enabled && !cli.plain;
    init_logging(&config, use_tui)?;
    info!(url = %config.server.base_url, tui = use_tui, "starting analyst chat");

    let backend = Arc::new(HttpBackend::new(&config.backend_config())?);
    let options = config.widget_options();

    if use_tui {
        let screen = tui::Screen::new(
            config.widget.credits,
            config.tui.uploads,
            config.tui.auto_scroll,
        );
        tui::run_tui(screen, backend, options).await
    } else {
        console::run_console(config.widget.credits, backend, options).await
    }
}
