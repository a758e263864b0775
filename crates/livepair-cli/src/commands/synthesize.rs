//! Synthesis-side commands: synthesize, publish

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use livepair_core::{Operation, OperationOutput};

use super::{run_local, run_operation};

#[derive(Args)]
pub struct SynthesizeCommand {
    /// Ordered frame images (first frame defines the canvas)
    #[arg(value_name = "FRAME", required = true)]
    frames: Vec<PathBuf>,

    /// Playback frame rate of the synthesized video
    #[arg(long, default_value = "15")]
    fps: u32,

    /// Index of the frame to mark as the cover instant
    #[arg(long, default_value = "0")]
    cover_index: usize,

    /// Output path for the video artifact
    #[arg(long, default_value = "pair.mov")]
    video_output: PathBuf,

    /// Output path for the still artifact
    #[arg(long, default_value = "pair.jpg")]
    still_output: PathBuf,
}

impl SynthesizeCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_local(
            verbose,
            Operation::Synthesize {
                frame_paths: self.frames,
                fps: self.fps,
                cover_index: self.cover_index,
                video_output: self.video_output,
                still_output: self.still_output,
            },
        )
        .await?;

        if let OperationOutput::Synthesized { container } = output {
            println!("{}", serde_json::to_string_pretty(&container)?);
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct PublishCommand {
    /// Still artifact of the pair
    #[arg(value_name = "STILL")]
    still: PathBuf,

    /// Video artifact of the pair
    #[arg(value_name = "VIDEO")]
    video: PathBuf,

    /// Gallery directory to publish into
    #[arg(long, default_value = "./gallery")]
    gallery: PathBuf,

    /// Grant consent to write into the gallery
    #[arg(long)]
    consent: bool,
}

impl PublishCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_operation(
            PathBuf::from("."),
            self.gallery,
            self.consent,
            verbose,
            Operation::Publish {
                still: self.still,
                video: self.video,
            },
        )
        .await?;

        if let OperationOutput::Published { published } = output {
            println!("published: {published}");
        }
        Ok(())
    }
}
