//! Shared data model for live-image detection and synthesis
use crate::{PairError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Media kind of a library asset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// Container-level subtype flags carried by a library asset
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtypeFlags {
    /// The library explicitly marks this asset as having a paired video
    pub paired_video: bool,
}

/// A reference to a library-stored media item. Read-only from this
/// system's perspective.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: String,
    pub display_name: String,
    pub kind: MediaKind,
    pub size_bytes: u64,
    pub subtypes: SubtypeFlags,
}

/// Where a paired resource's bytes can be read from
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ResourceLocation {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

/// Resource type within a library asset's resource list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    FullSizePhoto,
    PairedVideo,
}

/// One entry in an asset's platform resource list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetResource {
    pub asset_id: String,
    pub kind: ResourceKind,
    pub location: ResourceLocation,
}

/// One image asset's paired video stream. Absence of a resolvable
/// stream is a valid terminal state, not an invariant violation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairedResource {
    pub asset_id: String,
    pub location: ResourceLocation,
}

impl From<AssetResource> for PairedResource {
    fn from(resource: AssetResource) -> Self {
        Self {
            asset_id: resource.asset_id,
            location: resource.location,
        }
    }
}

/// Tolerance window around a requested timestamp, in milliseconds
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Tolerance {
    pub before_ms: u64,
    pub after_ms: u64,
}

/// A request for one still frame at a presentation timestamp
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FrameRequest {
    pub timestamp_ms: u64,
    pub tolerance: Tolerance,
}

impl FrameRequest {
    /// Exact-seek request with a zero tolerance window
    #[must_use]
    pub fn at(timestamp_ms: u64) -> Self {
        Self {
            timestamp_ms,
            tolerance: Tolerance::default(),
        }
    }
}

/// One decoded still frame. The timestamp is the realized decode
/// position, which may differ from the requested one due to codec seek
/// granularity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameResult {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp_ms: u64,
    pub index: u64,
}

/// One raster source inside a frame sequence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FrameSource {
    Path(PathBuf),
    Buffer(Vec<u8>),
}

/// Ordered list of raster sources in presentation order. Non-empty by
/// construction; the first frame's dimensions define the video canvas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameSequence {
    sources: Vec<FrameSource>,
}

impl FrameSequence {
    pub fn new(sources: Vec<FrameSource>) -> Result<Self> {
        if sources.is_empty() {
            return Err(PairError::EmptyFrameSequence);
        }
        Ok(Self { sources })
    }

    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self> {
        Self::new(paths.into_iter().map(FrameSource::Path).collect())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn iter(&self) -> impl Iterator<Item = &FrameSource> {
        self.sources.iter()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&FrameSource> {
        self.sources.get(index)
    }
}

/// Designated cover frame, by index into the intended sequence
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CoverMark {
    pub frame_index: usize,
}

impl CoverMark {
    #[must_use]
    pub fn new(frame_index: usize) -> Self {
        Self { frame_index }
    }

    /// Clamp to the last valid index of a sequence of `len` frames.
    /// Out-of-range cover indices degrade, never error.
    #[must_use]
    pub fn clamped(&self, len: usize) -> usize {
        debug_assert!(len > 0);
        self.frame_index.min(len.saturating_sub(1))
    }
}

/// Opaque pairing token embedded byte-identically in both artifacts of
/// a synthesized live image
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PairToken(String);

impl PairToken {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PairToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A finalized still/video pair. Only ever returned fully formed;
/// partial temporaries are discarded on failure paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveContainer {
    pub still: PathBuf,
    pub video: PathBuf,
    pub token: PairToken,
    pub cover_timestamp_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_sequence_rejects_empty() {
        let err = FrameSequence::new(vec![]).unwrap_err();
        assert_eq!(err.code(), "INVALID_ARGS");
    }

    #[test]
    fn test_frame_sequence_preserves_order() {
        let seq = FrameSequence::from_paths(vec![
            PathBuf::from("a.jpg"),
            PathBuf::from("b.jpg"),
            PathBuf::from("c.jpg"),
        ])
        .unwrap();
        assert_eq!(seq.len(), 3);
        match seq.get(1) {
            Some(FrameSource::Path(p)) => assert_eq!(p, &PathBuf::from("b.jpg")),
            other => panic!("unexpected source: {other:?}"),
        }
    }

    #[test]
    fn test_cover_mark_clamps_high_index() {
        assert_eq!(CoverMark::new(99).clamped(30), 29);
        assert_eq!(CoverMark::new(10).clamped(30), 10);
        assert_eq!(CoverMark::new(0).clamped(1), 0);
    }

    #[test]
    fn test_pair_token_identity() {
        let a = PairToken::new("abc".to_string());
        let b = PairToken::new("abc".to_string());
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "abc");
    }
}
