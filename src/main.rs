//! Headless replay of a lightbox scenario.
//!
//! Delegates all logic to the library crate; no local modules here.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, fmt};

use image_lightbox::config::Configuration;
use image_lightbox::replay::{self, Scenario};
use image_lightbox::tasks::fetch::HttpImageSource;
use image_lightbox::Image;

#[derive(Debug, Parser)]
#[command(name = "lightbox-replay", about = "Replay gestures against the image lightbox")]
struct Cli {
    /// Path to YAML config file; built-in defaults when omitted
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Scenario to replay
    #[arg(short, long, value_name = "FILE")]
    scenario: PathBuf,

    /// Initial (thumbnail) image; a blank placeholder when omitted
    #[arg(short, long, value_name = "FILE")]
    image: Option<PathBuf>,

    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let level = match verbosity {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    let filter = EnvFilter::from_default_env()
        .add_directive(format!("image_lightbox={level}").parse()?)
        .add_directive(format!("lightbox_replay={level}").parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("hyper=warn".parse()?);
    fmt().with_env_filter(filter).with_target(true).init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose)?;

    let cfg = match &cli.config {
        Some(path) => Configuration::from_yaml_file(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Configuration::default(),
    }
    .validated()
    .context("validating configuration")?;

    let scenario = Scenario::from_yaml_file(&cli.scenario)?;

    let image = match &cli.image {
        Some(path) => {
            let bytes = std::fs::read(path)
                .with_context(|| format!("reading image {}", path.display()))?;
            Image::decode(&bytes).with_context(|| format!("decoding {}", path.display()))?
        }
        None => Image::blank(64, 48, [40, 40, 40, 255]),
    };

    let source = Arc::new(HttpImageSource::new(&cfg.fetch)?);
    let report = replay::run(cfg, scenario, image, source).await?;

    for change in &report.phases {
        info!(from = ?change.from, to = ?change.to, "phase");
    }
    info!(
        final_phase = ?report.final_phase,
        will_present = report.will_present,
        did_dismiss = report.did_dismiss,
        images = report.displayed.len(),
        overlay_visible = report.overlay_visible,
        "replay finished"
    );
    Ok(())
}
