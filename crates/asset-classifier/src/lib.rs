/// Live-image asset detection
///
/// Applies best-effort heuristics over asset metadata to decide whether
/// a library item is a paired live-image asset, resolves the paired
/// video resource for confirmed assets, and probes video streams for
/// duration and frame count with degraded defaults on failure.
///
/// The classifier is deliberately confidence-free. False positives and
/// negatives are expected, particularly for the size heuristic, and are
/// a known limitation rather than a defect.
use async_trait::async_trait;
use ffmpeg_next as ffmpeg;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

use livepair_common::{
    Asset, MediaKind, PairError, PairedResource, ResourceKind, ResourceLocation, Result,
};

/// Vendor file-name prefixes that mark motion photos
const VENDOR_PREFIXES: &[&str] = &["MVIMG", "MPIMG"];

/// Substring marker used by some vendors instead of a prefix
const MOTION_MARKER: &str = "_MOTION";

/// Fallback duration when a stream cannot be probed
pub const DEFAULT_DURATION_MS: u64 = 3000;

/// Fallback frame count when a stream cannot be probed
pub const DEFAULT_FRAME_COUNT: u64 = 30;

/// Fallback frame rate when a stream reports none
pub const DEFAULT_FPS: u32 = 30;

/// Read-side capability over the platform asset library. Injected so
/// the classifier never reaches into process-global state.
#[async_trait]
pub trait AssetStore: Send + Sync {
    /// Look up an asset by identifier. `None` means unknown id.
    async fn resolve(&self, asset_id: &str) -> Result<Option<Asset>>;

    /// The platform resource list for an asset, in platform order.
    async fn resources(&self, asset_id: &str) -> Result<Vec<livepair_common::AssetResource>>;

    /// Materialize a resource's bytes. May fetch a cloud-stored
    /// original, so callers bound this with a timeout.
    async fn fetch_bytes(&self, resource: &PairedResource) -> Result<Vec<u8>>;
}

/// Classifier policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// Image assets larger than this are assumed to carry an embedded
    /// video. Coarse signal with no stated false-positive tolerance.
    pub size_threshold_bytes: u64,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            size_threshold_bytes: 4 * 1024 * 1024,
        }
    }
}

/// Detection heuristics and paired-resource resolution
#[derive(Debug, Clone, Default)]
pub struct AssetClassifier {
    config: ClassifierConfig,
}

impl AssetClassifier {
    #[must_use]
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    /// Heuristic: is this asset one half of a live-image pair?
    ///
    /// True iff the library explicitly flags a paired video, or an
    /// image asset matches a vendor naming pattern, or an image asset
    /// exceeds the configured size threshold.
    #[must_use]
    pub fn is_paired_asset(&self, asset: &Asset) -> bool {
        if asset.subtypes.paired_video {
            return true;
        }
        if asset.kind != MediaKind::Image {
            return false;
        }

        let name = asset.display_name.to_ascii_uppercase();
        if VENDOR_PREFIXES.iter().any(|p| name.starts_with(p)) || name.contains(MOTION_MARKER) {
            return true;
        }

        asset.size_bytes > self.config.size_threshold_bytes
    }

    /// Locate the paired video resource for an asset.
    ///
    /// # Errors
    ///
    /// Returns `AssetNotFound` if the identifier is unknown. An asset
    /// that exists but has no paired video yields `Ok(None)`.
    pub async fn resolve_video_resource(
        &self,
        store: &dyn AssetStore,
        asset_id: &str,
    ) -> Result<Option<PairedResource>> {
        let asset = store
            .resolve(asset_id)
            .await?
            .ok_or_else(|| PairError::AssetNotFound(asset_id.to_string()))?;

        if !self.is_paired_asset(&asset) {
            debug!("Asset {} not classified as paired", asset_id);
            return Ok(None);
        }

        let resources = store.resources(asset_id).await?;
        Ok(resources
            .into_iter()
            .find(|r| r.kind == ResourceKind::PairedVideo)
            .map(PairedResource::from))
    }

    /// Export an asset's paired video to a collision-free file under
    /// `dest_dir`, fetching bytes through the store.
    ///
    /// # Errors
    ///
    /// `AssetNotFound` for unknown ids, `NoPairedVideo` when the asset
    /// has no paired resource, `ExportFailed` when the bytes cannot be
    /// written.
    pub async fn export_paired_video(
        &self,
        store: &dyn AssetStore,
        asset_id: &str,
        dest_dir: &Path,
    ) -> Result<PathBuf> {
        let resource = self
            .resolve_video_resource(store, asset_id)
            .await?
            .ok_or_else(|| PairError::NoPairedVideo(asset_id.to_string()))?;

        let bytes = store.fetch_bytes(&resource).await?;
        let dest = dest_dir.join(format!("live_video_{}.mov", Uuid::new_v4()));
        std::fs::write(&dest, &bytes)
            .map_err(|e| PairError::ExportFailed(format!("write {dest:?}: {e}")))?;

        debug!(
            "Exported paired video for {}: {:?} ({} bytes)",
            asset_id,
            dest,
            bytes.len()
        );
        Ok(dest)
    }

    /// Container-level duration in milliseconds. Degrades to
    /// [`DEFAULT_DURATION_MS`] on any probe failure.
    #[must_use]
    pub fn estimate_duration_ms(&self, path: &Path) -> u64 {
        match probe_video(path) {
            Ok(probe) => probe.duration_ms,
            Err(e) => {
                warn!("Duration probe failed for {:?}, using default: {}", path, e);
                DEFAULT_DURATION_MS
            }
        }
    }

    /// Nominal frame count from duration and reported frame rate.
    /// Degrades to [`DEFAULT_FRAME_COUNT`] on any probe failure.
    #[must_use]
    pub fn estimate_frame_count(&self, path: &Path) -> u64 {
        match probe_video(path) {
            Ok(probe) => {
                let fps = if probe.fps > 0.0 {
                    probe.fps
                } else {
                    f64::from(DEFAULT_FPS)
                };
                #[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
                let count = (probe.duration_ms as f64 / 1000.0 * fps) as u64;
                count
            }
            Err(e) => {
                warn!(
                    "Frame-count probe failed for {:?}, using default: {}",
                    path, e
                );
                DEFAULT_FRAME_COUNT
            }
        }
    }
}

/// Probed stream facts used by the estimate queries
#[derive(Debug, Clone, Copy)]
struct VideoProbe {
    duration_ms: u64,
    fps: f64,
}

/// Initialize `FFmpeg` library
fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

fn probe_video(path: &Path) -> Result<VideoProbe> {
    init_ffmpeg();

    let input = ffmpeg::format::input(&path)
        .map_err(|e| PairError::FFmpegError(format!("Failed to open file {path:?}: {e}")))?;

    let duration = input.duration();
    if duration <= 0 {
        return Err(PairError::FFmpegError(format!(
            "No container duration in {path:?}"
        )));
    }
    #[allow(clippy::cast_sign_loss)]
    let duration_ms = (duration as u64) * 1000 / (ffmpeg::ffi::AV_TIME_BASE as u64);

    let video_stream = input
        .streams()
        .best(ffmpeg::media::Type::Video)
        .ok_or(PairError::NoVideoStream)?;

    let rate = video_stream.avg_frame_rate();
    let fps = if rate.1 > 0 {
        f64::from(rate.0) / f64::from(rate.1)
    } else {
        0.0
    };

    debug!(
        "Probed {:?}: duration={}ms fps={:.2}",
        path, duration_ms, fps
    );

    Ok(VideoProbe { duration_ms, fps })
}
