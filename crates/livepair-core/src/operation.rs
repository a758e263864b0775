//! Operation surface
//!
//! The full capability set of the pairing system as a closed enum.
//! Callers construct a variant, hand it to the executor, and branch on
//! the typed output; there is no string-keyed dispatch anywhere.
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use livepair_common::{FrameResult, LiveContainer, PairedResource};

/// The operation to perform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Operation {
    /// Heuristic live-image classification of a library asset
    IsPairedAsset { asset_id: String },

    /// Locate the paired video resource behind an asset
    ResolveVideoResource { asset_id: String },

    /// Materialize an asset's paired video under a directory
    ExportPairedVideo { asset_id: String, dest_dir: PathBuf },

    /// Container duration in milliseconds, with a degraded default
    /// when the stream cannot be probed
    GetDuration { video_path: PathBuf },

    /// Nominal frame count, with a degraded default when the stream
    /// cannot be probed
    GetFrameCount { video_path: PathBuf },

    /// One still frame near a presentation timestamp
    ExtractFrameAtTime {
        video_path: PathBuf,
        timestamp_ms: u64,
        #[serde(default)]
        tolerance_before_ms: u64,
        #[serde(default)]
        tolerance_after_ms: u64,
    },

    /// One still frame by fixed-rate frame index
    ExtractFrameAtIndex {
        video_path: PathBuf,
        index: u64,
        fps: u32,
    },

    /// Synthesize a still/video pair from ordered frame paths
    Synthesize {
        frame_paths: Vec<PathBuf>,
        fps: u32,
        cover_index: usize,
        video_output: PathBuf,
        still_output: PathBuf,
    },

    /// Hand a finished pair to the gallery publisher
    Publish { still: PathBuf, video: PathBuf },

    /// Read the pairing metadata embedded in a still artifact
    Inspect { still_path: PathBuf },
}

impl Operation {
    /// Get a short name for logging
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Operation::IsPairedAsset { .. } => "is_paired_asset",
            Operation::ResolveVideoResource { .. } => "resolve_video_resource",
            Operation::ExportPairedVideo { .. } => "export_paired_video",
            Operation::GetDuration { .. } => "get_duration",
            Operation::GetFrameCount { .. } => "get_frame_count",
            Operation::ExtractFrameAtTime { .. } => "extract_frame_at_time",
            Operation::ExtractFrameAtIndex { .. } => "extract_frame_at_index",
            Operation::Synthesize { .. } => "synthesize",
            Operation::Publish { .. } => "publish",
            Operation::Inspect { .. } => "inspect",
        }
    }
}

/// Typed result of an executed operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OperationOutput {
    Paired { paired: bool },
    VideoResource { resource: Option<PairedResource> },
    ExportedVideo { path: PathBuf },
    Duration { duration_ms: u64 },
    FrameCount { frame_count: u64 },
    Frame { frame: Option<FrameResult> },
    Synthesized { container: LiveContainer },
    Published { published: bool },
    StillInfo {
        pairing_token: String,
        cover_time_seconds: String,
    },
}
