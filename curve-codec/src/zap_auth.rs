//! Synchronous ZAP authenticator contract (spec §6, §1 "the ZAP
//! authenticator ... described only by its request/reply contract").
//!
//! The teacher's `ZapHandler` is `async` and owns an inproc socket
//! (`ZapServer`/`spawn_zap_server`); this codec never performs I/O of its
//! own (spec §5), so the contract here drops the transport entirely and
//! leaves the caller to implement whatever round-trip — inproc socket,
//! local function call, anything — it wants behind a plain synchronous
//! call. `execute(INITIATE)` on the server is the one operation allowed to
//! block on this call (spec §5).

use std::time::Duration;

use crate::zap::{ZapRequest, ZapResponse};

/// Implemented by the caller-supplied collaborator that authorizes a
/// client's permanent public key during INITIATE. A server constructed
/// without one accepts any well-formed client (spec §3 "absence disables
/// ZAP").
///
/// `timeout` is `CodecConfig::zap_timeout` (§5 "Cancellation"): the codec
/// has no clock of its own, so it is this call's job to bound its own
/// round-trip and return a failure `ZapResponse` rather than block forever.
pub trait ZapAuthenticator {
    fn authenticate(&mut self, request: &ZapRequest, timeout: Duration) -> ZapResponse;
}

/// Accepts every request. Useful for tests and for servers that want ZAP
/// framing without an authorization policy.
#[derive(Debug, Default)]
pub struct AllowAllAuthenticator;

impl ZapAuthenticator for AllowAllAuthenticator {
    fn authenticate(&mut self, request: &ZapRequest, _timeout: Duration) -> ZapResponse {
        ZapResponse::success(request.request_id.clone(), String::new())
    }
}

/// Rejects every request with the given reason. Useful for exercising the
/// ZAP-denial path in tests.
#[derive(Debug, Clone)]
pub struct DenyAllAuthenticator {
    pub reason: String,
}

impl ZapAuthenticator for DenyAllAuthenticator {
    fn authenticate(&mut self, request: &ZapRequest, _timeout: Duration) -> ZapResponse {
        ZapResponse::failure(request.request_id.clone(), self.reason.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> ZapRequest {
        ZapRequest::for_curve_client("1", "global", "", &[1u8; 32])
    }

    #[test]
    fn allow_all_succeeds() {
        let mut auth = AllowAllAuthenticator;
        let response = auth.authenticate(&sample_request(), Duration::from_secs(1));
        assert!(response.status_code.is_success());
    }

    #[test]
    fn deny_all_carries_reason() {
        let mut auth = DenyAllAuthenticator {
            reason: "not on allowlist".to_string(),
        };
        let response = auth.authenticate(&sample_request(), Duration::from_secs(1));
        assert!(!response.status_code.is_success());
        assert_eq!(response.status_text, "not on allowlist");
    }
}
