//! Live pair media suite - encodes and decodes real video
//!
//! These tests shell through FFmpeg codecs and are ignored by default
//! so the pure-logic suite stays fast on machines without x264.
//!
//! Run: cargo test --test live_pair_suite -- --ignored --test-threads=1

use std::path::{Path, PathBuf};
use std::sync::Arc;

use livepair_common::{timebase, CancelToken, FrameSequence};
use livepair_core::{
    Context, CoreConfig, FsAssetStore, FsGalleryPublisher, Operation, OperationExecutor,
    OperationOutput,
};
use livepair_frame_decoder::{FrameDecoder, FrameDecoderConfig};
use livepair_live_encoder::{still, EncoderConfig, LiveContainerEncoder, SynthesisSpec};

/// Write `count` solid-gradient PNG frames into `dir` and return their paths.
fn write_frames(dir: &Path, count: usize, width: u32, height: u32) -> Vec<PathBuf> {
    (0..count)
        .map(|i| {
            let shade = (i * 255 / count.max(1)) as u8;
            let raster = image::RgbImage::from_fn(width, height, |x, y| {
                image::Rgb([shade, (x % 256) as u8, (y % 256) as u8])
            });
            let path = dir.join(format!("frame_{i:03}.png"));
            raster.save(&path).unwrap();
            path
        })
        .collect()
}

fn synthesize(
    frames: &[PathBuf],
    fps: u32,
    cover_index: usize,
    out_dir: &Path,
) -> livepair_common::Result<livepair_common::LiveContainer> {
    let encoder = LiveContainerEncoder::new(EncoderConfig::default());
    let sequence = FrameSequence::from_paths(frames.to_vec()).unwrap();
    encoder.synthesize(
        &sequence,
        &SynthesisSpec {
            fps,
            cover_index,
            video_output: out_dir.join("pair.mov"),
            still_output: out_dir.join("pair.jpg"),
        },
        &CancelToken::new(),
    )
}

#[test]
#[ignore]
fn synthesized_pair_round_trips_token_and_cover() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 30, 64, 48);

    let container = synthesize(&frames, 15, 10, dir.path()).unwrap();
    assert!(container.video.exists());
    assert!(container.still.exists());
    assert_eq!(container.cover_timestamp_ms, 666);

    // The still carries the same token the container reports.
    let metadata = still::read_still_metadata(&container.still).unwrap();
    assert_eq!(metadata.pairing_token, container.token.as_str());
    assert_eq!(metadata.cover_time_seconds, "0.666667");

    // The cover frame decodes back out of the video near its timestamp.
    let decoder = FrameDecoder::new(FrameDecoderConfig::default());
    let frame = decoder
        .extract_frame_at_index(&container.video, 10, 15)
        .unwrap()
        .expect("cover frame should decode");
    assert_eq!(frame.index, 10);
    let drift = frame.timestamp_ms.abs_diff(666);
    assert!(drift <= timebase::frame_duration_ms(15), "drift {drift}ms");
}

#[test]
#[ignore]
fn probes_report_duration_and_frame_count() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 30, 64, 48);
    let container = synthesize(&frames, 15, 0, dir.path()).unwrap();

    let classifier = livepair_asset_classifier::AssetClassifier::new(Default::default());
    let duration = classifier.estimate_duration_ms(&container.video);
    let count = classifier.estimate_frame_count(&container.video);

    // 30 frames at 15fps is 2000ms; allow one frame of container slack.
    assert!(duration.abs_diff(2000) <= timebase::frame_duration_ms(15), "duration {duration}ms");
    assert!(count.abs_diff(30) <= 1, "count {count}");
}

#[test]
#[ignore]
fn cover_index_past_the_end_clamps_to_last_frame() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 10, 64, 48);

    let container = synthesize(&frames, 15, 99, dir.path()).unwrap();
    assert_eq!(container.cover_timestamp_ms, timebase::frame_time_ms(9, 15));

    let metadata = still::read_still_metadata(&container.still).unwrap();
    assert_eq!(metadata.cover_time_seconds, "0.600000");
}

#[test]
#[ignore]
fn unreadable_middle_frame_is_skipped_without_a_gap() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 10, 64, 48);

    // Corrupt a frame in the middle of the sequence.
    std::fs::write(&frames[5], b"not an image").unwrap();

    let container = synthesize(&frames, 15, 0, dir.path()).unwrap();
    assert!(container.video.exists());

    // Nine appended frames, so the last decodable index is 8.
    let decoder = FrameDecoder::new(FrameDecoderConfig::default());
    let frame = decoder
        .extract_frame_at_index(&container.video, 8, 15)
        .unwrap();
    assert!(frame.is_some());
}

#[test]
#[ignore]
fn cancelled_synthesis_leaves_no_artifacts() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 30, 64, 48);
    let out = tempfile::tempdir().unwrap();

    let cancel = CancelToken::new();
    cancel.cancel();

    let encoder = LiveContainerEncoder::new(EncoderConfig::default());
    let sequence = FrameSequence::from_paths(frames).unwrap();
    let err = encoder
        .synthesize(
            &sequence,
            &SynthesisSpec {
                fps: 15,
                cover_index: 0,
                video_output: out.path().join("pair.mov"),
                still_output: out.path().join("pair.jpg"),
            },
            &cancel,
        )
        .unwrap_err();
    assert_eq!(err.code(), "CANCELLED");

    // Neither finals nor temporaries survive cancellation.
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
#[ignore]
fn garbage_first_frame_fails_the_whole_synthesis() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 3, 64, 48);
    std::fs::write(&frames[0], b"not an image").unwrap();
    let out = tempfile::tempdir().unwrap();

    let err = synthesize(&frames, 15, 0, out.path()).unwrap_err();
    assert_eq!(err.code(), "ENCODE_FAILED");
    assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
}

#[test]
#[ignore]
fn mismatched_frame_sizes_resize_to_the_first_canvas() {
    let dir = tempfile::tempdir().unwrap();
    let mut frames = write_frames(dir.path(), 5, 64, 48);
    let odd = image::RgbImage::from_fn(32, 96, |_, _| image::Rgb([10, 20, 30]));
    let odd_path = dir.path().join("odd.png");
    odd.save(&odd_path).unwrap();
    frames[2] = odd_path;

    let container = synthesize(&frames, 15, 0, dir.path()).unwrap();

    let decoder = FrameDecoder::new(FrameDecoderConfig::default());
    let frame = decoder
        .extract_frame_at_index(&container.video, 2, 15)
        .unwrap()
        .expect("resized frame should decode");
    assert_eq!((frame.width, frame.height), (64, 48));
}

#[tokio::test]
#[ignore]
async fn executor_synthesizes_then_publishes_with_consent() {
    let dir = tempfile::tempdir().unwrap();
    let frames = write_frames(dir.path(), 15, 64, 48);
    let gallery = dir.path().join("gallery");

    let executor = OperationExecutor::new(
        Arc::new(FsAssetStore::new(dir.path().to_path_buf())),
        Arc::new(FsGalleryPublisher::new(gallery.clone()).with_consent(true)),
        CoreConfig::default(),
    );
    let ctx = Context::performance();
    let cancel = CancelToken::new();

    let output = executor
        .execute(
            &ctx,
            Operation::Synthesize {
                frame_paths: frames,
                fps: 15,
                cover_index: 5,
                video_output: dir.path().join("pair.mov"),
                still_output: dir.path().join("pair.jpg"),
            },
            &cancel,
        )
        .await
        .unwrap();
    let OperationOutput::Synthesized { container } = output else {
        panic!("expected synthesized output");
    };

    let output = executor
        .execute(
            &ctx,
            Operation::Publish {
                still: container.still,
                video: container.video,
            },
            &cancel,
        )
        .await
        .unwrap();
    assert!(matches!(output, OperationOutput::Published { published: true }));
    assert!(gallery.join("pair.jpg").exists());
    assert!(gallery.join("pair.mov").exists());
}
