//! Detection-side commands: classify, resolve, export

use anyhow::Result;
use clap::Args;
use std::path::PathBuf;

use livepair_core::{Operation, OperationOutput};

use super::run_operation;

#[derive(Args)]
pub struct DetectCommand {
    /// Asset identifier (file name within the library)
    #[arg(value_name = "ASSET_ID")]
    asset_id: String,

    /// Library directory backing the asset store
    #[arg(long, default_value = ".")]
    library: PathBuf,
}

impl DetectCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_operation(
            self.library,
            PathBuf::from("."),
            false,
            verbose,
            Operation::IsPairedAsset {
                asset_id: self.asset_id.clone(),
            },
        )
        .await?;

        if let OperationOutput::Paired { paired } = output {
            println!(
                "{}: {}",
                self.asset_id,
                if paired { "paired live image" } else { "not paired" }
            );
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ResolveCommand {
    /// Asset identifier (file name within the library)
    #[arg(value_name = "ASSET_ID")]
    asset_id: String,

    /// Library directory backing the asset store
    #[arg(long, default_value = ".")]
    library: PathBuf,
}

impl ResolveCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_operation(
            self.library,
            PathBuf::from("."),
            false,
            verbose,
            Operation::ResolveVideoResource {
                asset_id: self.asset_id,
            },
        )
        .await?;

        if let OperationOutput::VideoResource { resource } = output {
            match resource {
                Some(r) => println!("{}", serde_json::to_string_pretty(&r)?),
                None => println!("no paired video"),
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ExportCommand {
    /// Asset identifier (file name within the library)
    #[arg(value_name = "ASSET_ID")]
    asset_id: String,

    /// Library directory backing the asset store
    #[arg(long, default_value = ".")]
    library: PathBuf,

    /// Directory to write the exported video into
    #[arg(long, default_value = ".")]
    dest: PathBuf,
}

impl ExportCommand {
    pub async fn execute(self, verbose: bool) -> Result<()> {
        let output = run_operation(
            self.library,
            PathBuf::from("."),
            false,
            verbose,
            Operation::ExportPairedVideo {
                asset_id: self.asset_id,
                dest_dir: self.dest,
            },
        )
        .await?;

        if let OperationOutput::ExportedVideo { path } = output {
            println!("{}", path.display());
        }
        Ok(())
    }
}
