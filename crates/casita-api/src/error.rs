use thiserror::Error;

/// Error type for every network-facing operation handed to the sync core.
///
/// The core never translates these: a failed fetch resets the service's
/// fetch-state flags and rethrows the error untouched, leaving presentation
/// to the caller. The classification helpers below are the only part the
/// core inspects (the liveliness monitor flips offline on transport
/// failures only).
#[derive(Debug, Error)]
pub enum ApiError {
    // ── Transport ───────────────────────────────────────────────────
    /// Network unreachable, DNS failure, TLS handshake error, etc.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// Request timed out at the transport layer.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    // ── Application-level ───────────────────────────────────────────
    /// Non-2xx response with a structured error body.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// Session rejected (401/403) — re-authentication required.
    #[error("authorization failed: {message}")]
    Authorization { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Response body did not match the expected shape.
    #[error("deserialization error: {message}")]
    Deserialization { message: String },

    // ── Push channel ────────────────────────────────────────────────
    /// Push channel could not be opened.
    #[error("push channel connect failed: {0}")]
    PushConnect(String),
}

impl ApiError {
    /// `true` for failures of the transport itself (the server was never
    /// reached or never answered). The liveliness monitor treats exactly
    /// these as "go offline"; application-level rejections are not
    /// connectivity signals.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::Timeout { .. } | Self::PushConnect(_)
        )
    }

    /// `true` if the session was rejected and re-authentication might help.
    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::Authorization { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_classification() {
        assert!(
            ApiError::Transport {
                message: "connection refused".into()
            }
            .is_transport()
        );
        assert!(ApiError::Timeout { timeout_secs: 30 }.is_transport());
        assert!(ApiError::PushConnect("refused".into()).is_transport());
        assert!(
            !ApiError::Api {
                status: 500,
                message: "boom".into()
            }
            .is_transport()
        );
        assert!(
            !ApiError::Authorization {
                message: "expired".into()
            }
            .is_transport()
        );
    }

    #[test]
    fn authorization_classification() {
        assert!(
            ApiError::Authorization {
                message: "expired".into()
            }
            .is_authorization()
        );
        assert!(
            !ApiError::Transport {
                message: "dns".into()
            }
            .is_authorization()
        );
    }
}
