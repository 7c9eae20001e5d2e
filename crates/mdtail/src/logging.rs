//! File-based tracing setup. Stdout belongs to the TUI, so diagnostics go to
//! a log file when one is requested; verbosity follows `RUST_LOG`.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

pub fn init(log_file: Option<&Path>) -> Result<()> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = File::create(path)?;

    let env_filter = EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into());
    let fmt_layer = fmt::layer().with_writer(Arc::new(file)).with_ansi(false);

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(env_filter)
        .init();
    Ok(())
}
