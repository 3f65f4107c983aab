//! Tunable knobs for a `CurveCodec` instance.
//!
//! Mirrors the role of `monocoque_zmtp::config::BufferConfig`: a small
//! `Copy` struct with a sensible `Default` plus named presets, rather than a
//! grab-bag of loose constructor arguments.

use std::time::Duration;

use crate::limits::DEFAULT_METADATA_LIMIT;

/// Default budget for a server-side ZAP round trip (§5 "Cancellation" — the
/// codec has no clock of its own, so this is advisory: it is the caller's
/// `ZapAuthenticator` impl that actually enforces it).
pub const DEFAULT_ZAP_TIMEOUT: Duration = Duration::from_secs(5);

/// Per-instance configuration for a `CurveCodec`.
#[derive(Debug, Clone, Copy)]
pub struct CodecConfig {
    /// Cap on the total encoded size of a metadata property list (§9
    /// "Metadata size limit").
    pub metadata_limit: usize,
    /// Advisory budget for `execute(INITIATE)` when a ZAP authenticator is
    /// configured. Not enforced by the codec itself.
    pub zap_timeout: Duration,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            metadata_limit: DEFAULT_METADATA_LIMIT,
            zap_timeout: DEFAULT_ZAP_TIMEOUT,
        }
    }
}

impl CodecConfig {
    #[must_use]
    pub const fn new(metadata_limit: usize, zap_timeout: Duration) -> Self {
        Self {
            metadata_limit,
            zap_timeout,
        }
    }
}
