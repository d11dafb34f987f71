// ── Server-push transport abstraction ──
//
// The core's feed-merge logic only needs "a stream of text frames that can
// be closed". Keeping the transport behind this seam lets the same merge
// path run over server-sent events in a browser shell, a socket in a
// native shell, or a plain channel in tests.

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::ApiError;

/// Factory for push connections, one per feed channel.
///
/// `connect` is called again on every full refetch of a push-backed
/// resource; the previous connection is closed first. Implementations own
/// reconnection policy below this seam if they want it — the core treats
/// a silent stream as "no deltas".
pub trait PushTransport: Send + Sync {
    /// Open a push connection scoped to the authenticated session.
    fn connect(&self, channel: &str) -> Result<PushReceiver, ApiError>;
}

/// Handle to one open push connection: raw text frames plus a close signal.
pub struct PushReceiver {
    frames: mpsc::UnboundedReceiver<String>,
    cancel: CancellationToken,
}

impl PushReceiver {
    /// Build a receiver and the sender half a transport feeds frames into.
    ///
    /// The transport should stop producing once the returned receiver's
    /// cancellation fires (sends to a closed channel are simply dropped).
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, frames) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                frames,
                cancel: CancellationToken::new(),
            },
        )
    }

    /// Next raw frame, or `None` once the connection is closed (either end).
    pub async fn next_frame(&mut self) -> Option<String> {
        tokio::select! {
            biased;
            () = self.cancel.cancelled() => None,
            frame = self.frames.recv() => frame,
        }
    }

    /// Close the connection. Idempotent; pending `next_frame` calls
    /// resolve to `None`.
    pub fn close(&self) {
        self.cancel.cancel();
    }

    /// Token transports can watch to tear down their read loop.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn frames_flow_until_closed() {
        let (tx, mut rx) = PushReceiver::channel();
        tx.send("one".into()).expect("send");
        tx.send("two".into()).expect("send");

        assert_eq!(rx.next_frame().await.as_deref(), Some("one"));
        assert_eq!(rx.next_frame().await.as_deref(), Some("two"));

        rx.close();
        assert!(rx.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn sender_drop_ends_stream() {
        let (tx, mut rx) = PushReceiver::channel();
        drop(tx);
        assert!(rx.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn close_is_idempotent() {
        let (_tx, rx) = PushReceiver::channel();
        rx.close();
        rx.close();
        assert!(rx.cancellation().is_cancelled());
    }
}
