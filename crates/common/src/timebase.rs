//! Fixed-rate presentation clock arithmetic.
//!
//! The encoder and decoder share these conversions so a frame written
//! at presentation index `i` is retrievable by requesting
//! `frame_time_ms(i, fps)` within one frame duration of tolerance.
//! Conversions truncate toward zero in both directions.

/// Presentation timestamp of frame `index` at `fps`, in milliseconds.
#[must_use]
pub fn frame_time_ms(index: u64, fps: u32) -> u64 {
    index * 1000 / u64::from(fps.max(1))
}

/// Number of whole frames that fit in `duration_ms` at `fps`.
#[must_use]
pub fn frame_count(duration_ms: u64, fps: u32) -> u64 {
    duration_ms * u64::from(fps.max(1)) / 1000
}

/// Duration of a single frame at `fps`, in milliseconds.
#[must_use]
pub fn frame_duration_ms(fps: u32) -> u64 {
    1000 / u64::from(fps.max(1))
}

/// Presentation timestamp of frame `index` at `fps`, in seconds, for
/// string-encoded metadata values.
#[must_use]
pub fn frame_time_seconds(index: u64, fps: u32) -> f64 {
    index as f64 / f64::from(fps.max(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_time_truncates() {
        assert_eq!(frame_time_ms(0, 15), 0);
        assert_eq!(frame_time_ms(1, 15), 66);
        assert_eq!(frame_time_ms(10, 15), 666);
        assert_eq!(frame_time_ms(30, 15), 2000);
    }

    #[test]
    fn test_frame_count_inverts_frame_time() {
        for fps in [10u32, 15, 24, 30] {
            for index in 0..120u64 {
                let ts = frame_time_ms(index, fps);
                let count = frame_count(ts, fps);
                // Truncation in both directions loses at most one frame.
                assert!(
                    count == index || count + 1 == index,
                    "fps={fps} index={index} ts={ts} count={count}"
                );
            }
        }
    }

    #[test]
    fn test_frame_duration() {
        assert_eq!(frame_duration_ms(15), 66);
        assert_eq!(frame_duration_ms(30), 33);
        assert_eq!(frame_duration_ms(10), 100);
    }

    #[test]
    fn test_zero_fps_normalized() {
        assert_eq!(frame_time_ms(10, 0), frame_time_ms(10, 1));
        assert_eq!(frame_duration_ms(0), 1000);
    }

    #[test]
    fn test_frame_time_seconds() {
        let s = frame_time_seconds(10, 15);
        assert!((s - 0.666_666_6).abs() < 1e-6);
        assert_eq!(format!("{s:.6}"), "0.666667");
    }
}
