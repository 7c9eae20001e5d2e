mod app;
mod coalesce;
mod connection;
mod follow;
mod frame;
mod logging;
mod tui;
mod ui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::sync::mpsc;

use crate::app::ViewerApp;

/// Terminal viewer that tails a markdown text stream over a WebSocket.
#[derive(Debug, Parser)]
#[command(name = "mdtail", version)]
struct Args {
    /// Stream endpoint
    #[arg(default_value = "ws://127.0.0.1:4000/stream?role=viewer")]
    url: String,

    /// Commit interval in milliseconds (how often staged chunks may reach the
    /// screen)
    #[arg(long, default_value_t = 16)]
    tick_ms: u64,

    /// Keep the viewport where it is after commits instead of following the
    /// end of the stream
    #[arg(long)]
    no_follow: bool,

    /// Connect on startup instead of waiting for the connect key
    #[arg(long)]
    connect: bool,

    /// Write diagnostics to this file (verbosity via RUST_LOG)
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let mut app = ViewerApp::new(
        args.url,
        Duration::from_millis(args.tick_ms.max(1)),
        !args.no_follow,
        events_tx,
    );
    if args.connect {
        app.connect();
    }

    let mut terminal = tui::init()?;
    let result = app.event_loop(&mut terminal, events_rx).await;
    let cleanup = tui::restore();

    result?;
    cleanup?;
    Ok(())
}
