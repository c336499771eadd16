//! `flbh-merge`: merge two replay archives into one.
//!
//! ```text
//! flbh-merge <BASE> <INCOMING> <OUTPUT> <BASE_LABEL> <INCOMING_LABEL>
//! ```
//!
//! Logging goes to stderr; set `RUST_LOG` to change the level.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flbh::merge::{merge_replays, MergeConfig};

/// Merge two replay recordings into one chronologically ordered replay.
#[derive(Debug, Parser)]
#[command(name = "flbh-merge", version, about)]
struct Cli {
    /// Base replay archive; its header, icon and chunk caches are kept.
    base: PathBuf,
    /// Replay archive whose events are merged into the base.
    incoming: PathBuf,
    /// Where to write the merged archive.
    output: PathBuf,
    /// Label for events from the base archive.
    base_label: String,
    /// Label for events from the incoming archive.
    incoming_label: String,
}

impl Cli {
    fn config(self) -> MergeConfig {
        MergeConfig::new(
            self.base,
            self.incoming,
            self.output,
            self.base_label,
            self.incoming_label,
        )
    }
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().config();
    let report = merge_replays(&config).with_context(|| {
        format!(
            "failed to merge {} into {}",
            config.incoming.display(),
            config.base.display()
        )
    })?;

    if let Ok(json) = serde_json::to_string_pretty(&report) {
        tracing::debug!(report = %json, "merge report");
    }
    println!(
        "Merged {} events ({} + {}) into {}",
        report.merged_events,
        report.base.events,
        report.incoming.events,
        report.output.display()
    );
    Ok(())
}
