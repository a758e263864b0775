//! MOV container writing
//!
//! One H.264 video track plus a generic data track that carries the
//! pairing token at the cover instant. The pairing token is also set
//! as container-level metadata under `content-identifier`, exported
//! through the muxer with `movflags=use_metadata_tags`.
use ffmpeg_next as ffmpeg;

use ffmpeg::software::scaling;
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::{codec, encoder, format, Dictionary, Packet, Rational};
use image::RgbImage;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use livepair_common::{PairError, PairToken, Result};

use crate::EncoderConfig;

const VIDEO_STREAM_INDEX: usize = 0;

/// Open muxer with its encoder, scaler, and stream bookkeeping.
///
/// Presentation timestamps are assigned in encoder time base
/// (1/fps), so frame `n` always lands at index `n` regardless of how
/// many source rasters were skipped before it.
pub(crate) struct ContainerWriter {
    octx: format::context::Output,
    encoder: encoder::video::Encoder,
    scaler: scaling::Context,
    frame_tb: Rational,
    ost_video_tb: Rational,
    ost_meta_tb: Rational,
    meta_stream_index: usize,
    appended: i64,
    path: PathBuf,
}

impl ContainerWriter {
    pub(crate) fn open(
        path: &Path,
        canvas_width: u32,
        canvas_height: u32,
        fps: u32,
        token: &PairToken,
        config: &EncoderConfig,
    ) -> Result<Self> {
        crate::init_ffmpeg();

        let mut octx = format::output(&path)
            .map_err(|e| PairError::EncodeFailed(format!("cannot open muxer for {path:?}: {e}")))?;

        let h264 = encoder::find(codec::Id::H264)
            .ok_or_else(|| PairError::EncodeFailed("H.264 encoder unavailable".to_string()))?;

        let frame_tb = Rational(1, fps.max(1) as i32);
        // libx264 rejects odd dimensions with 4:2:0 subsampling.
        let enc_width = canvas_width & !1;
        let enc_height = canvas_height & !1;

        {
            let mut ost = octx
                .add_stream(h264)
                .map_err(|e| PairError::EncodeFailed(format!("cannot add video stream: {e}")))?;
            ost.set_time_base(frame_tb);
        }

        let mut enc = codec::Context::new_with_codec(h264)
            .encoder()
            .video()
            .map_err(|e| PairError::EncodeFailed(format!("H.264 context setup failed: {e}")))?;
        enc.set_width(enc_width);
        enc.set_height(enc_height);
        enc.set_format(format::Pixel::YUV420P);
        enc.set_time_base(frame_tb);
        enc.set_frame_rate(Some(Rational(fps.max(1) as i32, 1)));
        enc.set_bit_rate(config.bit_rate);

        let mut x264_opts = Dictionary::new();
        x264_opts.set("preset", &config.preset);
        x264_opts.set("profile", &config.profile);

        let opened = enc
            .open_as_with(h264, x264_opts)
            .map_err(|e| PairError::EncodeFailed(format!("cannot open H.264 encoder: {e}")))?;

        unsafe {
            ffmpeg::ffi::avcodec_parameters_from_context(
                (**(*octx.as_mut_ptr()).streams.add(VIDEO_STREAM_INDEX)).codecpar,
                opened.as_ptr(),
            );
        }

        // Timed pairing-data track. ffmpeg-next has no safe wrapper for
        // non-A/V streams, so this drops to the raw allocator.
        let meta_stream_index = unsafe {
            let stream =
                ffmpeg::ffi::avformat_new_stream(octx.as_mut_ptr(), std::ptr::null());
            if stream.is_null() {
                return Err(PairError::EncodeFailed(
                    "cannot allocate pairing-data stream".to_string(),
                ));
            }
            (*stream).time_base = ffmpeg::ffi::AVRational {
                num: 1,
                den: fps.max(1) as i32,
            };
            (*(*stream).codecpar).codec_type = ffmpeg::ffi::AVMediaType::AVMEDIA_TYPE_DATA;
            (*(*stream).codecpar).codec_id = ffmpeg::ffi::AVCodecID::AV_CODEC_ID_BIN_DATA;
            (*stream).index as usize
        };

        let mut container_meta = Dictionary::new();
        container_meta.set("content-identifier", token.as_str());
        octx.set_metadata(container_meta);

        let mut mux_opts = Dictionary::new();
        mux_opts.set("movflags", "use_metadata_tags");
        octx.write_header_with(mux_opts)
            .map_err(|e| PairError::EncodeFailed(format!("header write failed: {e}")))?;

        // The muxer may rewrite stream time bases during header write;
        // rescale against what it actually chose.
        let ost_video_tb = octx
            .stream(VIDEO_STREAM_INDEX)
            .map_or(frame_tb, |s| s.time_base());
        let ost_meta_tb = octx
            .stream(meta_stream_index)
            .map_or(frame_tb, |s| s.time_base());

        let scaler = scaling::Context::get(
            format::Pixel::RGB24,
            canvas_width,
            canvas_height,
            format::Pixel::YUV420P,
            enc_width,
            enc_height,
            scaling::Flags::BILINEAR,
        )
        .map_err(|e| PairError::EncodeFailed(format!("scaler setup failed: {e}")))?;

        debug!(
            "Opened container {:?}: {}x{} @ {}fps, token={}",
            path, enc_width, enc_height, fps, token
        );

        Ok(Self {
            octx,
            encoder: opened,
            scaler,
            frame_tb,
            ost_video_tb,
            ost_meta_tb,
            meta_stream_index,
            appended: 0,
            path: path.to_path_buf(),
        })
    }

    /// Encode one canvas-sized raster at the next presentation index.
    pub(crate) fn append_frame(&mut self, raster: &RgbImage) -> Result<()> {
        let mut rgb = VideoFrame::new(format::Pixel::RGB24, raster.width(), raster.height());
        let stride = rgb.stride(0);
        let row_len = raster.width() as usize * 3;
        {
            let data = rgb.data_mut(0);
            for (y, row) in raster.as_raw().chunks_exact(row_len).enumerate() {
                data[y * stride..y * stride + row_len].copy_from_slice(row);
            }
        }

        let mut yuv = VideoFrame::empty();
        self.scaler
            .run(&rgb, &mut yuv)
            .map_err(|e| PairError::EncodeFailed(format!("pixel conversion failed: {e}")))?;
        yuv.set_pts(Some(self.appended));

        loop {
            match self.encoder.send_frame(&yuv) {
                Ok(()) => break,
                Err(ffmpeg::Error::Other { errno }) if errno == ffmpeg::util::error::EAGAIN => {
                    // Encoder is full; drain before retrying.
                    self.drain_packets()?;
                }
                Err(e) => {
                    return Err(PairError::EncodeFailed(format!(
                        "frame submit failed at index {}: {e}",
                        self.appended
                    )))
                }
            }
        }
        self.drain_packets()?;

        trace!("Appended frame pts={}", self.appended);
        self.appended += 1;
        Ok(())
    }

    /// Number of frames successfully appended so far.
    pub(crate) fn appended(&self) -> usize {
        self.appended as usize
    }

    /// Write the pairing token as a one-frame data sample at the cover
    /// presentation index.
    pub(crate) fn seal_cover_mark(&mut self, cover_index: usize, token: &PairToken) -> Result<()> {
        let mut packet = Packet::copy(token.as_str().as_bytes());
        packet.set_stream(self.meta_stream_index);
        packet.set_pts(Some(cover_index as i64));
        packet.set_dts(Some(cover_index as i64));
        packet.set_duration(1);
        packet.rescale_ts(self.frame_tb, self.ost_meta_tb);
        packet
            .write_interleaved(&mut self.octx)
            .map_err(|e| PairError::EncodeFailed(format!("cover marker write failed: {e}")))?;

        debug!("Sealed cover marker at frame index {cover_index}");
        Ok(())
    }

    /// Flush the encoder, write the trailer, and report the finished
    /// container size.
    pub(crate) fn finalize(mut self) -> Result<u64> {
        self.encoder
            .send_eof()
            .map_err(|e| PairError::EncodeFailed(format!("encoder flush failed: {e}")))?;
        self.drain_packets()?;
        self.octx
            .write_trailer()
            .map_err(|e| PairError::EncodeFailed(format!("trailer write failed: {e}")))?;

        let len = std::fs::metadata(&self.path).map(|m| m.len()).unwrap_or(0);
        if len == 0 {
            return Err(PairError::EncodeFailed(format!(
                "muxer produced an empty container at {:?}",
                self.path
            )));
        }
        debug!("Finalized container {:?} ({len} bytes)", self.path);
        Ok(len)
    }

    fn drain_packets(&mut self) -> Result<()> {
        let mut packet = Packet::empty();
        while self.encoder.receive_packet(&mut packet).is_ok() {
            packet.set_stream(VIDEO_STREAM_INDEX);
            packet.rescale_ts(self.frame_tb, self.ost_video_tb);
            packet
                .write_interleaved(&mut self.octx)
                .map_err(|e| PairError::EncodeFailed(format!("packet write failed: {e}")))?;
        }
        Ok(())
    }
}
