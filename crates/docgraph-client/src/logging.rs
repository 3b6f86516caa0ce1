use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::session::config_dir;

const DEFAULT_FILTER: &str = "docgraph=info,docgraph_client=info,docgraph_core=info";

/// Log to `<config dir>/docgraph/docgraph.log`; the terminal belongs to the UI.
pub fn init() -> Result<()> {
    let path = config_dir()?.join("docgraph.log");
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Could not open log file {}", path.display()))?;

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into()))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("Could not install log subscriber")?;

    Ok(())
}
