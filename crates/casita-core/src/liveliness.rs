// ── Liveliness monitor ──
//
// One periodic heartbeat for the whole app: probes the server while a
// session is logged in and publishes connectivity transitions. Two
// orthogonal fields updated together each cycle — `online` tracks
// whether the server answered at all, the remote-link status is only
// ever sourced from a successful response body.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{Notify, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use casita_api::{ApiError, RemoteConnectionStatus};

/// Async probe bound to the lightweight status endpoint.
pub type ProbeFn =
    Arc<dyn Fn() -> BoxFuture<'static, Result<RemoteConnectionStatus, ApiError>> + Send + Sync>;

/// Connectivity as the UI should display it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivelinessInfo {
    /// Whether the server answered the last probe.
    pub online: bool,
    /// Remote-link status from the last successful probe.
    pub remote_connection_status: RemoteConnectionStatus,
}

impl Default for LivelinessInfo {
    /// Optimistic start: assume reachable until a probe says otherwise.
    fn default() -> Self {
        Self {
            online: true,
            remote_connection_status: RemoteConnectionStatus::NotConfigured,
        }
    }
}

/// The app-wide heartbeat. Cheaply cloneable; one `run` loop lives for
/// the process lifetime and no-ops while logged out.
#[derive(Clone)]
pub struct LivelinessMonitor {
    inner: Arc<MonitorInner>,
}

struct MonitorInner {
    info: watch::Sender<LivelinessInfo>,
    probe: ProbeFn,
    logged_in: watch::Receiver<bool>,
    poke: Notify,
}

impl LivelinessMonitor {
    pub(crate) fn new(probe: ProbeFn, logged_in: watch::Receiver<bool>) -> Self {
        let (info, _) = watch::channel(LivelinessInfo::default());
        Self {
            inner: Arc::new(MonitorInner {
                info,
                probe,
                logged_in,
                poke: Notify::new(),
            }),
        }
    }

    /// Snapshot of the current connectivity state.
    pub fn current(&self) -> LivelinessInfo {
        *self.inner.info.borrow()
    }

    /// Observe transitions. The channel only fires on real changes — a
    /// probe that confirms the existing state publishes nothing.
    pub fn subscribe(&self) -> watch::Receiver<LivelinessInfo> {
        self.inner.info.subscribe()
    }

    /// Force an immediate re-evaluation without waiting for the next
    /// tick, e.g. right after remote-connection settings changed.
    pub fn check_now(&self) {
        self.inner.poke.notify_one();
    }

    /// The heartbeat loop. Spawned once at composition; runs until
    /// cancelled.
    pub(crate) async fn run(self, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {}
                () = self.inner.poke.notified() => {}
            }

            if !*self.inner.logged_in.borrow() {
                continue;
            }
            self.probe_once().await;
        }
        debug!("liveliness monitor exiting");
    }

    /// One probe cycle. Publishes only when a field actually changes.
    pub(crate) async fn probe_once(&self) {
        match (self.inner.probe)().await {
            Ok(status) => {
                let changed = self.inner.info.send_if_modified(|info| {
                    let mut changed = false;
                    if !info.online {
                        info.online = true;
                        changed = true;
                    }
                    if info.remote_connection_status != status {
                        info.remote_connection_status = status;
                        changed = true;
                    }
                    changed
                });
                if changed {
                    debug!(%status, "server reachable");
                }
            }
            Err(e) if e.is_transport() => {
                let changed = self.inner.info.send_if_modified(|info| {
                    let was_online = info.online;
                    info.online = false;
                    was_online
                });
                if changed {
                    warn!(error = %e, "server unreachable");
                }
            }
            Err(e) => {
                // The status enum is only sourced from a successful
                // response body; application-level rejections change
                // nothing.
                debug!(error = %e, "probe rejected, state unchanged");
            }
        }
    }
}
