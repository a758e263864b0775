//! Still-artifact inspection command

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use livepair_core::{Operation, OperationOutput};

use super::run_local;

#[derive(Args)]
pub struct InspectCommand {
    /// Still artifact to read
    #[arg(value_name = "STILL")]
    still: PathBuf,
}

impl InspectCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_local(verbose, Operation::Inspect { still_path: self.still }).await?;
        if let OperationOutput::StillInfo {
            pairing_token,
            cover_time_seconds,
        } = output
        {
            println!("pairing-token: {pairing_token}");
            println!("cover-time-seconds: {cover_time_seconds}");
        }
        Ok(())
    }
}
