//! Gallery publishing capability
//!
//! Publishing is the only operation that writes into user-visible
//! space, so it sits behind an injected trait with an explicit consent
//! gate. No consent, no write.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use livepair_common::{PairError, Result};

/// Write-side capability over the user's gallery
#[async_trait]
pub trait GalleryPublisher: Send + Sync {
    /// Place a finished still/video pair into the gallery. Returns
    /// `true` once both artifacts are accepted.
    async fn publish(&self, still: &Path, video: &Path) -> Result<bool>;
}

/// Publisher backed by a local gallery directory
#[derive(Debug, Clone)]
pub struct FsGalleryPublisher {
    gallery_dir: PathBuf,
    consent: bool,
}

impl FsGalleryPublisher {
    /// A new publisher starts without consent and refuses to publish.
    #[must_use]
    pub fn new(gallery_dir: PathBuf) -> Self {
        Self {
            gallery_dir,
            consent: false,
        }
    }

    /// Consent is granted once at construction time, never implied.
    #[must_use]
    pub fn with_consent(mut self, consent: bool) -> Self {
        self.consent = consent;
        self
    }
}

#[async_trait]
impl GalleryPublisher for FsGalleryPublisher {
    async fn publish(&self, still: &Path, video: &Path) -> Result<bool> {
        if !self.consent {
            warn!("Publish refused: gallery consent not granted");
            return Err(PairError::SaveFailed(
                "gallery consent not granted".to_string(),
            ));
        }

        tokio::fs::create_dir_all(&self.gallery_dir)
            .await
            .map_err(|e| {
                PairError::SaveFailed(format!("cannot create gallery {:?}: {e}", self.gallery_dir))
            })?;

        for artifact in [still, video] {
            let name = artifact.file_name().ok_or_else(|| {
                PairError::SaveFailed(format!("artifact has no file name: {artifact:?}"))
            })?;
            let dest = self.gallery_dir.join(name);
            tokio::fs::copy(artifact, &dest).await.map_err(|e| {
                PairError::SaveFailed(format!("cannot copy {artifact:?} into gallery: {e}"))
            })?;
        }

        info!(
            "Published pair to gallery {:?}: {:?} + {:?}",
            self.gallery_dir,
            still.file_name(),
            video.file_name()
        );
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_without_consent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FsGalleryPublisher::new(dir.path().join("gallery"));

        let err = publisher
            .publish(Path::new("a.jpg"), Path::new("a.mov"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SAVE_FAILED");
        assert!(!dir.path().join("gallery").exists());
    }

    #[tokio::test]
    async fn test_publish_with_consent_copies_both_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let still = dir.path().join("pair.jpg");
        let video = dir.path().join("pair.mov");
        std::fs::write(&still, b"jpeg").unwrap();
        std::fs::write(&video, b"mov").unwrap();

        let gallery = dir.path().join("gallery");
        let publisher = FsGalleryPublisher::new(gallery.clone()).with_consent(true);

        assert!(publisher.publish(&still, &video).await.unwrap());
        assert_eq!(std::fs::read(gallery.join("pair.jpg")).unwrap(), b"jpeg");
        assert_eq!(std::fs::read(gallery.join("pair.mov")).unwrap(), b"mov");
    }

    #[tokio::test]
    async fn test_publish_missing_artifact_is_save_failed() {
        let dir = tempfile::tempdir().unwrap();
        let publisher =
            FsGalleryPublisher::new(dir.path().join("gallery")).with_consent(true);

        let err = publisher
            .publish(&dir.path().join("no.jpg"), &dir.path().join("no.mov"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SAVE_FAILED");
    }
}
