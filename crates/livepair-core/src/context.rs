//! Execution context and configuration for operations

use livepair_asset_classifier::ClassifierConfig;
use livepair_frame_decoder::FrameDecoderConfig;
use livepair_live_encoder::EncoderConfig;
use serde::{Deserialize, Serialize};

/// Execution mode that determines optimization priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    /// Debug mode - verbose logging
    Debug,

    /// Performance mode - minimum overhead
    Performance,
}

/// Context passed through operation execution
#[derive(Debug, Clone)]
pub struct Context {
    /// Execution mode
    pub mode: ExecutionMode,

    /// Whether verbose logging is enabled
    pub verbose: bool,
}

impl Context {
    /// Create a debug context
    #[must_use]
    pub fn debug() -> Self {
        Self {
            mode: ExecutionMode::Debug,
            verbose: true,
        }
    }

    /// Create a performance context
    #[must_use]
    pub fn performance() -> Self {
        Self {
            mode: ExecutionMode::Performance,
            verbose: false,
        }
    }

    /// Create a context for the given mode
    #[must_use]
    pub fn new(mode: ExecutionMode) -> Self {
        match mode {
            ExecutionMode::Debug => Self::debug(),
            ExecutionMode::Performance => Self::performance(),
        }
    }
}

/// Tunables for the operation executor and its component crates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Bound on paired-resource fetch plus export, in milliseconds
    pub fetch_timeout_ms: u64,

    /// Bound on the gallery sink accepting a finished pair, in
    /// milliseconds
    pub readiness_timeout_ms: u64,

    pub classifier: ClassifierConfig,
    pub decoder: FrameDecoderConfig,
    pub encoder: EncoderConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            fetch_timeout_ms: 30_000,
            readiness_timeout_ms: 5_000,
            classifier: ClassifierConfig::default(),
            decoder: FrameDecoderConfig::default(),
            encoder: EncoderConfig::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_context() {
        let ctx = Context::debug();
        assert_eq!(ctx.mode, ExecutionMode::Debug);
        assert!(ctx.verbose);
    }

    #[test]
    fn test_performance_context() {
        let ctx = Context::new(ExecutionMode::Performance);
        assert_eq!(ctx.mode, ExecutionMode::Performance);
        assert!(!ctx.verbose);
    }
}
