//! Livepair CLI - live-image pairing toolkit
//!
//! Command-line interface over the pairing operation surface.

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

mod commands;

use commands::detect::{DetectCommand, ExportCommand, ResolveCommand};
use commands::extract::{DurationCommand, FrameCommand, FrameCountCommand};
use commands::inspect::InspectCommand;
use commands::synthesize::{PublishCommand, SynthesizeCommand};

#[derive(Parser)]
#[command(
    name = "livepair",
    version,
    about = "Detect, extract, and synthesize live-image pairs",
    long_about = "Work with dual-asset live images: classify library assets,\n\
                  resolve and export their paired videos, pull single frames,\n\
                  and synthesize new still/video pairs linked by a shared\n\
                  pairing token.",
    after_help = "EXAMPLES:\n  \
                  # Is this library asset one half of a live image?\n  \
                  livepair detect --library ./photos MVIMG_0001.jpg\n\n  \
                  # Export its paired video\n  \
                  livepair export --library ./photos MVIMG_0001.jpg --dest ./out\n\n  \
                  # Pull the frame nearest 650ms as a JPEG\n  \
                  livepair frame clip.mov --timestamp-ms 650 --output frame.jpg\n\n  \
                  # Synthesize a live pair from ordered frames\n  \
                  livepair synthesize frames/*.jpg --fps 15 --cover-index 10 \\\n      \
                  --video-output pair.mov --still-output pair.jpg\n\n  \
                  # Verify the pairing metadata round-trip\n  \
                  livepair inspect pair.jpg"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Classify whether a library asset is one half of a live-image pair
    Detect(DetectCommand),

    /// Resolve the paired video resource behind an asset
    Resolve(ResolveCommand),

    /// Export an asset's paired video into a directory
    Export(ExportCommand),

    /// Report container duration in milliseconds
    Duration(DurationCommand),

    /// Report nominal frame count
    FrameCount(FrameCountCommand),

    /// Extract one still frame to a JPEG
    Frame(FrameCommand),

    /// Synthesize a still/video live pair from frame images
    Synthesize(SynthesizeCommand),

    /// Publish a finished pair into the gallery
    Publish(PublishCommand),

    /// Inspect the pairing metadata embedded in a still
    Inspect(InspectCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let verbose = cli.verbose;
    match cli.command {
        Commands::Detect(cmd) => cmd.execute(verbose).await,
        Commands::Resolve(cmd) => cmd.execute(verbose).await,
        Commands::Export(cmd) => cmd.execute(verbose).await,
        Commands::Duration(cmd) => cmd.execute(verbose).await,
        Commands::FrameCount(cmd) => cmd.execute(verbose).await,
        Commands::Frame(cmd) => cmd.execute(verbose).await,
        Commands::Synthesize(cmd) => cmd.execute(verbose).await,
        Commands::Publish(cmd) => cmd.execute(verbose).await,
        Commands::Inspect(cmd) => cmd.execute(verbose).await,
    }
}
