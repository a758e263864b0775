//! Operation executor
//!
//! Routes each [`Operation`] variant to the component crate that
//! implements it. FFmpeg-bound work runs on the blocking pool; fetch
//! and publish are bounded by the configured timeouts. Each execution
//! is independent, there is no shared mutable state between calls.
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use livepair_asset_classifier::{AssetClassifier, AssetStore};
use livepair_common::{
    CancelToken, FrameRequest, FrameSequence, PairError, Result, Tolerance,
};
use livepair_frame_decoder::FrameDecoder;
use livepair_live_encoder::{still, LiveContainerEncoder, SynthesisSpec};

use crate::context::{Context, CoreConfig};
use crate::operation::{Operation, OperationOutput};
use crate::publish::GalleryPublisher;

/// Executes operations against injected store and publisher
/// capabilities.
pub struct OperationExecutor {
    classifier: AssetClassifier,
    decoder: FrameDecoder,
    encoder: LiveContainerEncoder,
    store: Arc<dyn AssetStore>,
    publisher: Arc<dyn GalleryPublisher>,
    config: CoreConfig,
}

impl OperationExecutor {
    #[must_use]
    pub fn new(
        store: Arc<dyn AssetStore>,
        publisher: Arc<dyn GalleryPublisher>,
        config: CoreConfig,
    ) -> Self {
        Self {
            classifier: AssetClassifier::new(config.classifier.clone()),
            decoder: FrameDecoder::new(config.decoder.clone()),
            encoder: LiveContainerEncoder::new(config.encoder.clone()),
            store,
            publisher,
            config,
        }
    }

    /// Execute one operation to completion.
    ///
    /// # Errors
    ///
    /// Propagates the component error for the operation; see
    /// `PairError::code` for the stable codes callers branch on.
    pub async fn execute(
        &self,
        ctx: &Context,
        operation: Operation,
        cancel: &CancelToken,
    ) -> Result<OperationOutput> {
        let name = operation.name();
        let started = Instant::now();
        debug!("Executing operation {name}");

        let output = match operation {
            Operation::IsPairedAsset { asset_id } => {
                // Classification uncertainty is a boolean, never an
                // error; an unknown id is simply not a paired asset.
                let paired = match self.store.resolve(&asset_id).await? {
                    Some(asset) => self.classifier.is_paired_asset(&asset),
                    None => {
                        debug!("Asset {asset_id} unknown, classifying as unpaired");
                        false
                    }
                };
                OperationOutput::Paired { paired }
            }

            Operation::ResolveVideoResource { asset_id } => {
                let resource = self
                    .classifier
                    .resolve_video_resource(self.store.as_ref(), &asset_id)
                    .await?;
                OperationOutput::VideoResource { resource }
            }

            Operation::ExportPairedVideo { asset_id, dest_dir } => {
                let timeout = Duration::from_millis(self.config.fetch_timeout_ms);
                let export =
                    self.classifier
                        .export_paired_video(self.store.as_ref(), &asset_id, &dest_dir);
                let path = tokio::time::timeout(timeout, export)
                    .await
                    .map_err(|_| PairError::Timeout(self.config.fetch_timeout_ms))??;
                OperationOutput::ExportedVideo { path }
            }

            Operation::GetDuration { video_path } => {
                let classifier = self.classifier.clone();
                let duration_ms = spawn_blocking(move || {
                    Ok(classifier.estimate_duration_ms(&video_path))
                })
                .await?;
                OperationOutput::Duration { duration_ms }
            }

            Operation::GetFrameCount { video_path } => {
                let classifier = self.classifier.clone();
                let frame_count = spawn_blocking(move || {
                    Ok(classifier.estimate_frame_count(&video_path))
                })
                .await?;
                OperationOutput::FrameCount { frame_count }
            }

            Operation::ExtractFrameAtTime {
                video_path,
                timestamp_ms,
                tolerance_before_ms,
                tolerance_after_ms,
            } => {
                let decoder = self.decoder.clone();
                let request = FrameRequest {
                    timestamp_ms,
                    tolerance: Tolerance {
                        before_ms: tolerance_before_ms,
                        after_ms: tolerance_after_ms,
                    },
                };
                let frame =
                    spawn_blocking(move || decoder.extract_frame(&video_path, &request)).await?;
                OperationOutput::Frame { frame }
            }

            Operation::ExtractFrameAtIndex {
                video_path,
                index,
                fps,
            } => {
                let decoder = self.decoder.clone();
                let frame = spawn_blocking(move || {
                    decoder.extract_frame_at_index(&video_path, index, fps)
                })
                .await?;
                OperationOutput::Frame { frame }
            }

            Operation::Synthesize {
                frame_paths,
                fps,
                cover_index,
                video_output,
                still_output,
            } => {
                let frames = FrameSequence::from_paths(frame_paths)?;
                let spec = SynthesisSpec {
                    fps,
                    cover_index,
                    video_output,
                    still_output,
                };
                let encoder = self.encoder.clone();
                let cancel = cancel.clone();
                let container =
                    spawn_blocking(move || encoder.synthesize(&frames, &spec, &cancel)).await?;
                OperationOutput::Synthesized { container }
            }

            Operation::Publish { still, video } => {
                let timeout = Duration::from_millis(self.config.readiness_timeout_ms);
                let published = tokio::time::timeout(timeout, self.publisher.publish(&still, &video))
                    .await
                    .map_err(|_| PairError::Timeout(self.config.readiness_timeout_ms))??;
                OperationOutput::Published { published }
            }

            Operation::Inspect { still_path } => {
                let metadata =
                    spawn_blocking(move || still::read_still_metadata(&still_path)).await?;
                OperationOutput::StillInfo {
                    pairing_token: metadata.pairing_token,
                    cover_time_seconds: metadata.cover_time_seconds,
                }
            }
        };

        if ctx.verbose {
            info!("Operation {name} completed in {:?}", started.elapsed());
        } else {
            debug!("Operation {name} completed in {:?}", started.elapsed());
        }
        Ok(output)
    }
}

async fn spawn_blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PairError::Other(format!("blocking task failed: {e}")))?
}
