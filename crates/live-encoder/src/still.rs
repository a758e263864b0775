//! Still-artifact construction and inspection
//!
//! The still half of a live image is a JPEG whose APP1 segment carries
//! the pairing token (`ImageUniqueID`) and the cover timestamp as a
//! decimal seconds string (`UserComment`). Both values are written and
//! read by this module so pairing integrity is verifiable end to end.
use exif::experimental::Writer;
use exif::{Field, In, Tag, Value};
use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage};
use std::io::Cursor;
use std::path::Path;
use tracing::debug;

use livepair_common::{PairError, PairToken, Result};

const USER_COMMENT_CHARSET: &[u8; 8] = b"ASCII\0\0\0";
const COVER_TIME_KEY: &str = "cover-time-seconds=";

/// Metadata embedded in a still artifact
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StillMetadata {
    pub pairing_token: String,
    pub cover_time_seconds: String,
}

/// Encode `raster` to JPEG at `quality` and write it to `path` with the
/// pairing metadata embedded.
///
/// # Errors
///
/// Returns `ImageError` if JPEG or metadata encoding fails, `IoError`
/// if the file cannot be written.
pub fn write_still(
    path: &Path,
    raster: &RgbImage,
    token: &PairToken,
    cover_time_seconds: &str,
    quality: u8,
) -> Result<()> {
    let mut jpeg = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut jpeg, quality);
    encoder
        .write_image(
            raster.as_raw(),
            raster.width(),
            raster.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| PairError::ImageError(format!("JPEG encode failed: {e}")))?;

    let exif_payload = build_exif_payload(token, cover_time_seconds)?;
    let spliced = splice_app1(&jpeg, &exif_payload)?;
    std::fs::write(path, spliced)?;

    debug!(
        "Wrote still artifact {:?}: token={} cover={}s",
        path, token, cover_time_seconds
    );
    Ok(())
}

/// Read the pairing metadata back out of a still artifact.
///
/// # Errors
///
/// Returns `ImageError` when the file carries no readable pairing
/// metadata.
pub fn read_still_metadata(path: &Path) -> Result<StillMetadata> {
    let file = std::fs::File::open(path)?;
    let mut reader = std::io::BufReader::new(file);
    let exif = exif::Reader::new()
        .read_from_container(&mut reader)
        .map_err(|e| PairError::ImageError(format!("EXIF read failed for {path:?}: {e}")))?;

    let pairing_token = exif
        .get_field(Tag::ImageUniqueID, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Ascii(parts) => parts
                .first()
                .map(|b| String::from_utf8_lossy(b).trim_end_matches('\0').to_string()),
            _ => None,
        })
        .ok_or_else(|| PairError::ImageError(format!("no pairing token in {path:?}")))?;

    let cover_time_seconds = exif
        .get_field(Tag::UserComment, In::PRIMARY)
        .and_then(|f| match &f.value {
            Value::Undefined(bytes, _) if bytes.len() > USER_COMMENT_CHARSET.len() => {
                let text = String::from_utf8_lossy(&bytes[USER_COMMENT_CHARSET.len()..]);
                text.strip_prefix(COVER_TIME_KEY)
                    .map(|s| s.trim_end_matches('\0').to_string())
            }
            _ => None,
        })
        .ok_or_else(|| PairError::ImageError(format!("no cover timestamp in {path:?}")))?;

    Ok(StillMetadata {
        pairing_token,
        cover_time_seconds,
    })
}

fn build_exif_payload(token: &PairToken, cover_time_seconds: &str) -> Result<Vec<u8>> {
    let unique_id = Field {
        tag: Tag::ImageUniqueID,
        ifd_num: In::PRIMARY,
        value: Value::Ascii(vec![token.as_str().as_bytes().to_vec()]),
    };

    let mut comment = USER_COMMENT_CHARSET.to_vec();
    comment.extend_from_slice(COVER_TIME_KEY.as_bytes());
    comment.extend_from_slice(cover_time_seconds.as_bytes());
    let user_comment = Field {
        tag: Tag::UserComment,
        ifd_num: In::PRIMARY,
        value: Value::Undefined(comment, 0),
    };

    let mut writer = Writer::new();
    writer.push_field(&unique_id);
    writer.push_field(&user_comment);
    let mut buf = Cursor::new(Vec::new());
    writer
        .write(&mut buf, false)
        .map_err(|e| PairError::ImageError(format!("EXIF encode failed: {e}")))?;
    Ok(buf.into_inner())
}

/// Insert an APP1 Exif segment immediately after the JPEG SOI marker.
fn splice_app1(jpeg: &[u8], exif_payload: &[u8]) -> Result<Vec<u8>> {
    if jpeg.len() < 2 || jpeg[0] != 0xFF || jpeg[1] != 0xD8 {
        return Err(PairError::ImageError("not a JPEG stream".to_string()));
    }

    // Segment length counts itself plus the Exif identifier and body.
    let segment_len = 2 + 6 + exif_payload.len();
    let segment_len = u16::try_from(segment_len)
        .map_err(|_| PairError::ImageError("EXIF payload too large for APP1".to_string()))?;

    let mut out = Vec::with_capacity(jpeg.len() + usize::from(segment_len) + 2);
    out.extend_from_slice(&jpeg[..2]);
    out.extend_from_slice(&[0xFF, 0xE1]);
    out.extend_from_slice(&segment_len.to_be_bytes());
    out.extend_from_slice(b"Exif\0\0");
    out.extend_from_slice(exif_payload);
    out.extend_from_slice(&jpeg[2..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pair::PairIdentifier;

    fn test_raster() -> RgbImage {
        RgbImage::from_fn(8, 8, |x, y| image::Rgb([x as u8 * 16, y as u8 * 16, 128]))
    }

    #[test]
    fn test_write_then_read_round_trips_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        let token = PairIdentifier::mint();

        write_still(&path, &test_raster(), &token, "0.666667", 95).unwrap();

        let meta = read_still_metadata(&path).unwrap();
        assert_eq!(meta.pairing_token, token.as_str());
        assert_eq!(meta.cover_time_seconds, "0.666667");
    }

    #[test]
    fn test_still_is_a_decodable_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cover.jpg");
        let token = PairIdentifier::mint();

        write_still(&path, &test_raster(), &token, "0.0", 95).unwrap();

        let decoded = image::open(&path).unwrap().to_rgb8();
        assert_eq!(decoded.dimensions(), (8, 8));
    }

    #[test]
    fn test_splice_rejects_non_jpeg() {
        let err = splice_app1(b"PNG...", &[0u8; 4]).unwrap_err();
        assert_eq!(err.code(), "IMAGE_ERROR");
    }

    #[test]
    fn test_splice_places_app1_after_soi() {
        let jpeg = [0xFF, 0xD8, 0xFF, 0xD9];
        let out = splice_app1(&jpeg, &[1, 2, 3, 4]).unwrap();
        assert_eq!(&out[..4], &[0xFF, 0xD8, 0xFF, 0xE1]);
        assert_eq!(&out[out.len() - 2..], &[0xFF, 0xD9]);
    }

    #[test]
    fn test_read_without_metadata_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.jpg");
        test_raster().save(&path).unwrap();

        let err = read_still_metadata(&path).unwrap_err();
        assert_eq!(err.code(), "IMAGE_ERROR");
    }
}
