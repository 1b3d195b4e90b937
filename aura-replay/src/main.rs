//! AuraCap Replay
//!
//! Feeds a recorded packet stream through the live view pipeline and prints
//! the statistics, the filtered packet list and the detail of one packet.

mod cli;
mod replay;
mod settings;

use anyhow::{Context, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::ReplayArgs;
use replay::{Capture, ReplayOptions};
use settings::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auracap=info,aura_live=info,aura_model=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = ReplayArgs::from_matches(&cli::build_cli().get_matches());

    let mut settings = match &args.settings {
        Some(path) => Settings::load_from(path)
            .with_context(|| format!("Failed to load settings from {}", path.display()))?,
        None => Settings::load(),
    };
    if let Some(capacity) = args.buffer_capacity {
        settings.session.buffer_capacity = capacity;
    }
    if let Some(limit) = args.limit {
        settings.row_limit = limit;
    }

    if args.save_settings {
        match &args.settings {
            Some(path) => settings.save_to(path)?,
            None => {
                let path = settings.save()?;
                tracing::info!("Saved settings to {}", path.display());
            }
        }
    }

    tracing::info!("Replaying {}", args.input.display());
    let capture = Capture::read(&args.input)?;

    let options = ReplayOptions {
        filter: args
            .filter
            .clone()
            .unwrap_or_else(|| settings.default_filter.clone()),
        select: args.select,
        row_limit: settings.row_limit,
    };
    let report = replay::run(capture, &settings, &options).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", replay::render(&report, settings.show_hex));
    }

    Ok(())
}
