use std::path::PathBuf;

use anyhow::{Context, Result};
use charla_core::Config;
use clap::Parser;

mod app;
mod handler;
mod logging;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "charla")]
#[command(about = "Terminal chat screen with a canned assistant reply")]
#[command(version)]
struct Args {
    /// Config file (defaults to the user config directory)
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Delay before the bot reply, overriding the config file
    #[arg(long, value_name = "MS")]
    reply_delay_ms: Option<u64>,

    /// Where to write logs (defaults to the user cache directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(ms) = args.reply_delay_ms {
        config.reply_delay_ms = ms;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_path = match &args.log_file {
        Some(path) => path.clone(),
        None => logging::default_log_path()?,
    };
    logging::init(&log_path, args.verbose)?;

    let config = load_config(&args).context("failed to load config")?;
    tracing::info!(
        reply_delay_ms = config.reply_delay_ms,
        reply_order = ?config.reply_order,
        "starting chat screen"
    );

    // Install panic hook before entering raw mode
    tui::install_panic_hook();

    let mut terminal = tui::init()?;
    let result = run(&mut terminal, &config).await;
    tui::restore()?;

    if let Err(err) = &result {
        tracing::error!("chat screen exited with error: {err:#}");
    }
    result
}

async fn run(terminal: &mut tui::Tui, config: &Config) -> Result<()> {
    let (mut app, scheduled) = App::new(config);
    let mut events = EventHandler::new(config.tick_rate(), scheduled);

    loop {
        terminal.draw(|frame| ui::render(&mut app, frame))?;

        let Some(event) = events.next().await else {
            break;
        };
        handler::handle_event(&mut app, event);

        if app.should_quit {
            break;
        }
    }

    // Outstanding timers must not outlive the screen
    app.shutdown();
    tracing::info!(messages = app.store.len(), "chat screen closed");
    Ok(())
}
