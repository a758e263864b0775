/// Single-frame video decoder
///
/// Extracts one still frame nearest a requested presentation timestamp,
/// honoring a tolerance window and clamping out-of-range requests to
/// the last decodable frame. The realized timestamp of the decoded
/// frame is reported truthfully; codec seek granularity means it may
/// differ slightly from the requested one.
use ffmpeg_next as ffmpeg;
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, warn};

use livepair_common::{timebase, FrameRequest, FrameResult, PairError, Result, Tolerance};

/// Frame decoder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameDecoderConfig {
    /// JPEG quality for the returned raster (1-100)
    pub jpeg_quality: u8,
}

impl Default for FrameDecoderConfig {
    fn default() -> Self {
        Self { jpeg_quality: 90 }
    }
}

/// Decodes single frames out of a video stream
#[derive(Debug, Clone, Default)]
pub struct FrameDecoder {
    config: FrameDecoderConfig,
}

/// Initialize `FFmpeg` library
fn init_ffmpeg() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        ffmpeg::init().expect("Failed to initialize FFmpeg");
    });
}

impl FrameDecoder {
    #[must_use]
    pub fn new(config: FrameDecoderConfig) -> Self {
        Self { config }
    }

    /// Extract the frame nearest `request.timestamp_ms`.
    ///
    /// Returns `Ok(None)` when the stream is unreadable or contains no
    /// decodable frames. Requests beyond the stream duration clamp to
    /// the last decodable frame rather than failing.
    ///
    /// # Errors
    ///
    /// Returns an error only when a decoded raster cannot be re-encoded
    /// to JPEG; all stream-level failures degrade to `Ok(None)`.
    pub fn extract_frame(&self, path: &Path, request: &FrameRequest) -> Result<Option<FrameResult>> {
        init_ffmpeg();

        let mut ictx = match ffmpeg::format::input(&path) {
            Ok(ictx) => ictx,
            Err(e) => {
                warn!("Failed to open {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let Some(video_stream) = ictx.streams().best(ffmpeg::media::Type::Video) else {
            warn!("No video stream in {:?}", path);
            return Ok(None);
        };
        let stream_index = video_stream.index();
        let time_base = video_stream.time_base();
        let rate = video_stream.avg_frame_rate();
        let nominal_fps = if rate.1 > 0 && rate.0 > 0 {
            (f64::from(rate.0) / f64::from(rate.1)).round() as u32
        } else {
            30
        };

        let duration_ms = container_duration_ms(&ictx);
        let target_ms = request.timestamp_ms.min(duration_ms);

        // Seek backward to the keyframe at or before the target, then
        // decode forward to the nearest in-tolerance frame.
        #[allow(clippy::cast_possible_truncation)]
        let seek_ts = (u128::from(target_ms) * (ffmpeg::ffi::AV_TIME_BASE as u128) / 1000)
            .min(i64::MAX as u128) as i64;
        if let Err(e) = ictx.seek(seek_ts, ..seek_ts) {
            debug!("Seek to {}ms failed ({}), decoding from start", target_ms, e);
        }

        let codec_params = ictx
            .stream(stream_index)
            .map(|s| s.parameters())
            .ok_or_else(|| PairError::ExtractionFailed("video stream disappeared".to_string()))?;

        let mut decoder = match ffmpeg::codec::context::Context::from_parameters(codec_params)
            .and_then(|ctx| ctx.decoder().video())
        {
            Ok(decoder) => decoder,
            Err(e) => {
                warn!("Failed to create decoder for {:?}: {}", path, e);
                return Ok(None);
            }
        };

        let width = decoder.width();
        let height = decoder.height();
        let mut scaler = ffmpeg::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg::format::Pixel::RGB24,
            width,
            height,
            ffmpeg::software::scaling::Flags::BILINEAR,
        )
        .map_err(|e| PairError::FFmpegError(format!("Failed to create scaler: {e}")))?;

        let mut best: Option<(u64, Vec<u8>)> = None;
        let upper_bound = target_ms.saturating_add(request.tolerance.after_ms);
        let mut decoded_frame = ffmpeg::util::frame::video::Video::empty();
        let mut converted_frame = ffmpeg::util::frame::video::Video::empty();
        let mut past_window = false;

        'packets: for (stream, packet) in ictx.packets() {
            if stream.index() != stream_index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let ts_ms = pts_to_ms(decoded_frame.timestamp(), time_base);
                let closer = match &best {
                    None => true,
                    Some((best_ts, _)) => {
                        ts_ms.abs_diff(target_ms) < best_ts.abs_diff(target_ms)
                    }
                };
                if closer {
                    scaler.run(&decoded_frame, &mut converted_frame).map_err(|e| {
                        PairError::FFmpegError(format!("Failed to convert frame: {e}"))
                    })?;
                    best = Some((ts_ms, copy_rgb_frame(&converted_frame)));
                }
                if ts_ms > upper_bound && best.is_some() {
                    past_window = true;
                    break 'packets;
                }
            }
        }

        if !past_window {
            // Flush the decoder so a request clamped to the stream end
            // can still see the final frames.
            decoder.send_eof().ok();
            while decoder.receive_frame(&mut decoded_frame).is_ok() {
                let ts_ms = pts_to_ms(decoded_frame.timestamp(), time_base);
                let closer = match &best {
                    None => true,
                    Some((best_ts, _)) => ts_ms.abs_diff(target_ms) < best_ts.abs_diff(target_ms),
                };
                if closer {
                    scaler.run(&decoded_frame, &mut converted_frame).map_err(|e| {
                        PairError::FFmpegError(format!("Failed to convert frame: {e}"))
                    })?;
                    best = Some((ts_ms, copy_rgb_frame(&converted_frame)));
                }
            }
        }

        let Some((realized_ms, rgb)) = best else {
            warn!("No decodable frames in {:?}", path);
            return Ok(None);
        };

        let bytes = self.encode_jpeg(&rgb, width, height)?;
        let index = timebase::frame_count(realized_ms, nominal_fps);

        debug!(
            "Extracted frame from {:?}: requested={}ms realized={}ms index={}",
            path, request.timestamp_ms, realized_ms, index
        );

        Ok(Some(FrameResult {
            bytes,
            width,
            height,
            timestamp_ms: realized_ms,
            index,
        }))
    }

    /// Extract the frame at presentation index `index` for a stream
    /// played at `fps`. Thin wrapper over [`extract_frame`] with the
    /// timestamp derived through the shared time base.
    ///
    /// # Errors
    ///
    /// Same conditions as [`extract_frame`].
    ///
    /// [`extract_frame`]: FrameDecoder::extract_frame
    pub fn extract_frame_at_index(
        &self,
        path: &Path,
        index: u64,
        fps: u32,
    ) -> Result<Option<FrameResult>> {
        let request = FrameRequest {
            timestamp_ms: timebase::frame_time_ms(index, fps),
            tolerance: Tolerance {
                before_ms: 0,
                after_ms: timebase::frame_duration_ms(fps),
            },
        };
        Ok(self.extract_frame(path, &request)?.map(|mut frame| {
            frame.index = index;
            frame
        }))
    }

    fn encode_jpeg(&self, rgb: &[u8], width: u32, height: u32) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let encoder = JpegEncoder::new_with_quality(&mut bytes, self.config.jpeg_quality);
        encoder
            .write_image(rgb, width, height, ExtendedColorType::Rgb8)
            .map_err(|e| PairError::ImageError(format!("JPEG encode failed: {e}")))?;
        Ok(bytes)
    }
}

/// Copy an RGB24 frame into a contiguous buffer, honoring row stride
fn copy_rgb_frame(frame: &ffmpeg::util::frame::video::Video) -> Vec<u8> {
    let width = frame.width() as usize;
    let height = frame.height() as usize;
    let stride = frame.stride(0);
    let plane_data = frame.data(0);

    let mut data = Vec::with_capacity(width * height * 3);
    for y in 0..height {
        let row_start = y * stride;
        let row_end = row_start + (width * 3);
        data.extend_from_slice(&plane_data[row_start..row_end]);
    }
    data
}

fn container_duration_ms(ictx: &ffmpeg::format::context::Input) -> u64 {
    let duration = ictx.duration();
    if duration > 0 {
        #[allow(clippy::cast_sign_loss)]
        let ms = (duration as u64) * 1000 / (ffmpeg::ffi::AV_TIME_BASE as u64);
        ms
    } else {
        u64::MAX
    }
}

fn pts_to_ms(pts: Option<i64>, time_base: ffmpeg::Rational) -> u64 {
    let pts = pts.unwrap_or(0).max(0);
    #[allow(clippy::cast_sign_loss)]
    let ms = (pts as u64) * 1000 * (time_base.0.max(0) as u64) / (time_base.1.max(1) as u64);
    ms
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decoder_config_default() {
        let config = FrameDecoderConfig::default();
        assert_eq!(config.jpeg_quality, 90);
    }

    #[test]
    fn test_unreadable_stream_is_absent() {
        let decoder = FrameDecoder::default();
        let result = decoder
            .extract_frame(Path::new("/nonexistent/clip.mov"), &FrameRequest::at(0))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_garbage_bytes_are_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not_a_video.mov");
        std::fs::write(&path, b"definitely not an mp4").unwrap();

        let decoder = FrameDecoder::default();
        let result = decoder.extract_frame(&path, &FrameRequest::at(500)).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_pts_to_ms() {
        // 90kHz time base, pts 45000 -> 500ms
        assert_eq!(pts_to_ms(Some(45000), ffmpeg::Rational(1, 90000)), 500);
        assert_eq!(pts_to_ms(None, ffmpeg::Rational(1, 90000)), 0);
        assert_eq!(pts_to_ms(Some(-10), ffmpeg::Rational(1, 1000)), 0);
    }

    #[test]
    fn test_index_wrapper_uses_timebase() {
        // index 10 at 15 fps targets 666ms with one frame of slack
        let request_ts = livepair_common::timebase::frame_time_ms(10, 15);
        assert_eq!(request_ts, 666);
    }
}
