//! Frame-side commands: duration, frame count, single-frame extraction

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use livepair_core::{Operation, OperationOutput};

use super::run_local;

#[derive(Args)]
pub struct DurationCommand {
    /// Video file to probe
    #[arg(value_name = "VIDEO")]
    video: PathBuf,
}

impl DurationCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_local(verbose, Operation::GetDuration { video_path: self.video }).await?;
        if let OperationOutput::Duration { duration_ms } = output {
            println!("{duration_ms}");
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct FrameCountCommand {
    /// Video file to probe
    #[arg(value_name = "VIDEO")]
    video: PathBuf,
}

impl FrameCountCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output =
            run_local(verbose, Operation::GetFrameCount { video_path: self.video }).await?;
        if let OperationOutput::FrameCount { frame_count } = output {
            println!("{frame_count}");
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct FrameCommand {
    /// Video file to read
    #[arg(value_name = "VIDEO")]
    video: PathBuf,

    /// Presentation timestamp to seek to, in milliseconds
    #[arg(long, conflicts_with = "index")]
    timestamp_ms: Option<u64>,

    /// Frame index at the given frame rate
    #[arg(long, requires = "fps")]
    index: Option<u64>,

    /// Frame rate used to convert an index to a timestamp
    #[arg(long)]
    fps: Option<u32>,

    /// Accepted deviation before the timestamp, in milliseconds
    #[arg(long, default_value = "0")]
    tolerance_before_ms: u64,

    /// Accepted deviation after the timestamp, in milliseconds
    #[arg(long, default_value = "0")]
    tolerance_after_ms: u64,

    /// Where to write the extracted JPEG
    #[arg(short, long, default_value = "frame.jpg")]
    output: PathBuf,
}

impl FrameCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let operation = match (self.timestamp_ms, self.index, self.fps) {
            (_, Some(index), Some(fps)) => Operation::ExtractFrameAtIndex {
                video_path: self.video,
                index,
                fps,
            },
            (Some(timestamp_ms), _, _) => Operation::ExtractFrameAtTime {
                video_path: self.video,
                timestamp_ms,
                tolerance_before_ms: self.tolerance_before_ms,
                tolerance_after_ms: self.tolerance_after_ms,
            },
            _ => anyhow::bail!("specify either --timestamp-ms or --index with --fps"),
        };

        let output = run_local(verbose, operation).await?;
        if let OperationOutput::Frame { frame } = output {
            match frame {
                Some(frame) => {
                    std::fs::write(&self.output, &frame.bytes)?;
                    println!(
                        "{} ({}x{}, frame {} at {}ms)",
                        self.output.display(),
                        frame.width,
                        frame.height,
                        frame.index,
                        frame.timestamp_ms
                    );
                }
                None => println!("no decodable frame"),
            }
        }
        Ok(())
    }
}
