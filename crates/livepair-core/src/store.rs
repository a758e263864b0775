//! Directory-backed asset store
//!
//! Maps a flat directory onto the [`AssetStore`] capability: each file
//! is an asset whose id is its file name, and a sibling file with the
//! same stem and a video extension is its paired video resource. Used
//! by the CLI and by tests; platform-native stores implement the same
//! trait elsewhere.
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use livepair_asset_classifier::AssetStore;
use livepair_common::{
    Asset, AssetResource, MediaKind, PairError, PairedResource, ResourceKind, ResourceLocation,
    Result, SubtypeFlags,
};

const VIDEO_EXTENSIONS: &[&str] = &["mov", "mp4"];

/// Asset store rooted at a local directory
#[derive(Debug, Clone)]
pub struct FsAssetStore {
    root: PathBuf,
}

impl FsAssetStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Asset ids are plain file names; anything that could escape the
    /// root directory is rejected.
    fn asset_path(&self, asset_id: &str) -> Result<PathBuf> {
        if asset_id.is_empty()
            || asset_id.contains('/')
            || asset_id.contains('\\')
            || asset_id.contains("..")
        {
            return Err(PairError::InvalidArgument(format!(
                "asset id is not a plain file name: {asset_id}"
            )));
        }
        Ok(self.root.join(asset_id))
    }
}

fn sibling_video(path: &Path) -> Option<PathBuf> {
    for ext in VIDEO_EXTENSIONS {
        let candidate = path.with_extension(ext);
        if candidate != path && candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

fn media_kind(path: &Path) -> MediaKind {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some(e) if VIDEO_EXTENSIONS.contains(&e) => MediaKind::Video,
        _ => MediaKind::Image,
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn resolve(&self, asset_id: &str) -> Result<Option<Asset>> {
        let path = self.asset_path(asset_id)?;
        let metadata = match tokio::fs::metadata(&path).await {
            Ok(m) if m.is_file() => m,
            _ => return Ok(None),
        };

        Ok(Some(Asset {
            id: asset_id.to_string(),
            display_name: asset_id.to_string(),
            kind: media_kind(&path),
            size_bytes: metadata.len(),
            subtypes: SubtypeFlags {
                paired_video: sibling_video(&path).is_some(),
            },
        }))
    }

    async fn resources(&self, asset_id: &str) -> Result<Vec<AssetResource>> {
        let path = self.asset_path(asset_id)?;
        if !path.is_file() {
            return Ok(Vec::new());
        }

        let mut resources = vec![AssetResource {
            asset_id: asset_id.to_string(),
            kind: ResourceKind::FullSizePhoto,
            location: ResourceLocation::Path(path.clone()),
        }];
        if let Some(video) = sibling_video(&path) {
            debug!("Found paired video for {}: {:?}", asset_id, video);
            resources.push(AssetResource {
                asset_id: asset_id.to_string(),
                kind: ResourceKind::PairedVideo,
                location: ResourceLocation::Path(video),
            });
        }
        Ok(resources)
    }

    async fn fetch_bytes(&self, resource: &PairedResource) -> Result<Vec<u8>> {
        match &resource.location {
            ResourceLocation::Path(path) => Ok(tokio::fs::read(path).await?),
            ResourceLocation::Bytes(bytes) => Ok(bytes.clone()),
        }
    }
}
