//! Live-image synthesis
//!
//! Turns an ordered raster sequence into a paired still/video
//! artifact set: an H.264 MOV paced at a fixed frame rate with a
//! timed cover marker, and a JPEG still carrying the same pairing
//! token in its EXIF block. Both artifacts are written to temporary
//! siblings first and renamed into place only once the pair is
//! complete, so callers never observe a half-written result.
use image::imageops::FilterType;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, info, warn};

use livepair_common::{
    timebase, CancelToken, CoverMark, FrameSequence, FrameSource, LiveContainer, PairError,
    Result,
};

pub mod pair;
pub mod still;
mod video;

pub use pair::PairIdentifier;
pub use still::{read_still_metadata, write_still, StillMetadata};

use video::ContainerWriter;

/// Frame rate applied when the caller does not specify one
pub const DEFAULT_FPS: u32 = 15;

static FFMPEG_INIT: Once = Once::new();

pub(crate) fn init_ffmpeg() {
    FFMPEG_INIT.call_once(|| {
        if let Err(e) = ffmpeg_next::init() {
            warn!("FFmpeg initialization failed: {e}");
        }
    });
}

/// Encoder tuning knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    pub bit_rate: usize,
    pub preset: String,
    pub profile: String,
    pub still_jpeg_quality: u8,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            bit_rate: 2_000_000,
            preset: "fast".to_string(),
            profile: "baseline".to_string(),
            still_jpeg_quality: 95,
        }
    }
}

/// What to synthesize and where to put it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisSpec {
    pub fps: u32,
    pub cover_index: usize,
    pub video_output: PathBuf,
    pub still_output: PathBuf,
}

/// Lifecycle of a synthesis run, logged as each phase is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncodePhase {
    Init,
    CanvasResolved,
    WriterOpened,
    FramesAppended,
    MetadataSealed,
    Finalizing,
    Completed,
    Failed,
}

fn enter_phase(current: &mut EncodePhase, next: EncodePhase) {
    debug!("Synthesis phase {current:?} -> {next:?}");
    *current = next;
}

/// Removes leftover temporaries unless disarmed after a successful
/// rename into place.
struct TempGuard {
    paths: Vec<PathBuf>,
    armed: bool,
}

impl TempGuard {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in &self.paths {
            if path.exists() {
                if let Err(e) = std::fs::remove_file(path) {
                    warn!("Failed to remove temporary {path:?}: {e}");
                }
            }
        }
    }
}

fn load_raster(source: &FrameSource) -> Result<RgbImage> {
    let dynamic = match source {
        FrameSource::Path(path) => image::open(path)
            .map_err(|e| PairError::ImageError(format!("cannot read frame {path:?}: {e}")))?,
        FrameSource::Buffer(bytes) => image::load_from_memory(bytes)
            .map_err(|e| PairError::ImageError(format!("cannot decode frame buffer: {e}")))?,
    };
    Ok(dynamic.to_rgb8())
}

fn temp_sibling(target: &Path, salt: &str, extension: &str) -> PathBuf {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    dir.join(format!("live_{salt}.tmp.{extension}"))
}

/// Synthesizes complete live-image pairs from raster sequences.
#[derive(Debug, Clone)]
pub struct LiveContainerEncoder {
    config: EncoderConfig,
}

impl Default for LiveContainerEncoder {
    fn default() -> Self {
        Self::new(EncoderConfig::default())
    }
}

impl LiveContainerEncoder {
    #[must_use]
    pub fn new(config: EncoderConfig) -> Self {
        Self { config }
    }

    /// Encode `frames` into the still/video pair described by `spec`.
    ///
    /// The first frame defines the video canvas and must decode;
    /// later frames that fail to decode are skipped without leaving a
    /// timing gap. The cover index clamps to the last frame of the
    /// sequence. Temporary files are cleaned up on every exit path.
    ///
    /// # Errors
    ///
    /// Returns `Cancelled` when the token fires, `EncodeFailed` when
    /// the first frame or the encoder pipeline fails, `ExportFailed`
    /// when the finished artifacts cannot be moved into place.
    pub fn synthesize(
        &self,
        frames: &FrameSequence,
        spec: &SynthesisSpec,
        cancel: &CancelToken,
    ) -> Result<LiveContainer> {
        let mut phase = EncodePhase::Init;
        match self.run(frames, spec, cancel, &mut phase) {
            Ok(container) => Ok(container),
            Err(e) => {
                enter_phase(&mut phase, EncodePhase::Failed);
                Err(e)
            }
        }
    }

    fn run(
        &self,
        frames: &FrameSequence,
        spec: &SynthesisSpec,
        cancel: &CancelToken,
        phase: &mut EncodePhase,
    ) -> Result<LiveContainer> {
        let fps = if spec.fps == 0 { DEFAULT_FPS } else { spec.fps };
        let token = PairIdentifier::mint();
        let salt = token.as_str();

        let Some(first_source) = frames.get(0) else {
            return Err(PairError::EmptyFrameSequence);
        };
        let first = load_raster(first_source)
            .map_err(|e| PairError::EncodeFailed(format!("first frame unusable: {e}")))?;
        let (canvas_width, canvas_height) = first.dimensions();
        enter_phase(phase, EncodePhase::CanvasResolved);

        let video_tmp = temp_sibling(&spec.video_output, salt, "mov");
        let still_tmp = temp_sibling(&spec.still_output, salt, "jpg");
        let mut guard = TempGuard::new(vec![video_tmp.clone(), still_tmp.clone()]);

        let mut writer = ContainerWriter::open(
            &video_tmp,
            canvas_width,
            canvas_height,
            fps,
            &token,
            &self.config,
        )?;
        enter_phase(phase, EncodePhase::WriterOpened);

        for (index, source) in frames.iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(PairError::Cancelled);
            }
            let loaded;
            let raster = if index == 0 {
                &first
            } else {
                match load_raster(source) {
                    Ok(r) => {
                        loaded = r;
                        &loaded
                    }
                    Err(e) => {
                        warn!("Skipping unreadable frame {index}: {e}");
                        continue;
                    }
                }
            };
            if raster.dimensions() == (canvas_width, canvas_height) {
                writer.append_frame(raster)?;
            } else {
                let fitted =
                    image::imageops::resize(raster, canvas_width, canvas_height, FilterType::Triangle);
                writer.append_frame(&fitted)?;
            }
        }
        debug!(
            "Appended {} of {} frames",
            writer.appended(),
            frames.len()
        );
        enter_phase(phase, EncodePhase::FramesAppended);

        if cancel.is_cancelled() {
            return Err(PairError::Cancelled);
        }

        let clamped = CoverMark::new(spec.cover_index).clamped(frames.len());
        writer.seal_cover_mark(clamped, &token)?;
        enter_phase(phase, EncodePhase::MetadataSealed);

        enter_phase(phase, EncodePhase::Finalizing);
        writer.finalize()?;

        let cover_raster = if clamped == 0 {
            first
        } else {
            match frames.get(clamped).map(load_raster) {
                Some(Ok(raster)) => raster,
                _ => {
                    warn!("Cover frame {clamped} unreadable, falling back to first frame");
                    first
                }
            }
        };
        let cover_seconds = format!("{:.6}", timebase::frame_time_seconds(clamped as u64, fps));
        still::write_still(
            &still_tmp,
            &cover_raster,
            &token,
            &cover_seconds,
            self.config.still_jpeg_quality,
        )?;

        std::fs::rename(&video_tmp, &spec.video_output).map_err(|e| {
            PairError::ExportFailed(format!("cannot move video into {:?}: {e}", spec.video_output))
        })?;
        if let Err(e) = std::fs::rename(&still_tmp, &spec.still_output) {
            // Roll the already-placed video back so no half pair survives.
            if let Err(re) = std::fs::remove_file(&spec.video_output) {
                warn!("Failed to roll back video {:?}: {re}", spec.video_output);
            }
            return Err(PairError::ExportFailed(format!(
                "cannot move still into {:?}: {e}",
                spec.still_output
            )));
        }
        guard.disarm();
        enter_phase(phase, EncodePhase::Completed);

        let cover_timestamp_ms = timebase::frame_time_ms(clamped as u64, fps);
        info!(
            "Synthesized live pair: video={:?} still={:?} token={} cover={}ms",
            spec.video_output, spec.still_output, token, cover_timestamp_ms
        );
        Ok(LiveContainer {
            still: spec.still_output.clone(),
            video: spec.video_output.clone(),
            token,
            cover_timestamp_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_encoder_config_defaults() {
        let config = EncoderConfig::default();
        assert_eq!(config.bit_rate, 2_000_000);
        assert_eq!(config.preset, "fast");
        assert_eq!(config.profile, "baseline");
        assert_eq!(config.still_jpeg_quality, 95);
    }

    #[test]
    fn test_encoder_config_deserializes_partial() {
        let config: EncoderConfig = serde_json::from_str(r#"{"preset": "veryfast"}"#).unwrap();
        assert_eq!(config.preset, "veryfast");
        assert_eq!(config.bit_rate, 2_000_000);
    }

    #[test]
    fn test_temp_guard_removes_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_x.tmp.mov");
        std::fs::write(&path, b"partial").unwrap();

        drop(TempGuard::new(vec![path.clone()]));
        assert!(!path.exists());
    }

    #[test]
    fn test_temp_guard_keeps_when_disarmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("live_x.tmp.mov");
        std::fs::write(&path, b"done").unwrap();

        let mut guard = TempGuard::new(vec![path.clone()]);
        guard.disarm();
        drop(guard);
        assert!(path.exists());
    }

    #[test]
    fn test_temp_sibling_stays_in_target_directory() {
        let tmp = temp_sibling(Path::new("/out/final.mov"), "abc", "mov");
        assert_eq!(tmp, PathBuf::from("/out/live_abc.tmp.mov"));
    }

    #[test]
    fn test_load_raster_from_buffer() {
        let raster = RgbImage::from_pixel(4, 4, image::Rgb([10, 20, 30]));
        let mut png = Cursor::new(Vec::new());
        raster
            .write_to(&mut png, image::ImageFormat::Png)
            .unwrap();

        let loaded = load_raster(&FrameSource::Buffer(png.into_inner())).unwrap();
        assert_eq!(loaded.dimensions(), (4, 4));
        assert_eq!(loaded.get_pixel(2, 2), &image::Rgb([10, 20, 30]));
    }

    #[test]
    fn test_load_raster_missing_path_fails() {
        let err = load_raster(&FrameSource::Path(PathBuf::from("/no/such/frame.png"))).unwrap_err();
        assert_eq!(err.code(), "IMAGE_ERROR");
    }
}
