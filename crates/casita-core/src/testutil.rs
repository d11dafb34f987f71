// ── In-crate test doubles ──

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use tokio::sync::mpsc::UnboundedSender;

use casita_api::{ApiError, PushReceiver, PushTransport, RemoteConnectionStatus};

use crate::connector::ApiConnector;
use crate::model::{
    Action, LanDevice, Minion, MinionTimeout, RemoteSettings, TimelineNode, Timing, User,
};

/// What the fake probe should answer next.
#[derive(Debug, Clone, Copy)]
pub(crate) enum ProbeOutcome {
    Ok(RemoteConnectionStatus),
    TransportFailure,
    AppRejection,
}

/// Connector whose fetches serve configurable in-memory values and count
/// their calls.
pub(crate) struct FakeConnector {
    pub minions: Mutex<Vec<Minion>>,
    pub timings: Mutex<Vec<Timing>>,
    pub probe: Mutex<ProbeOutcome>,
    pub minion_fetches: AtomicUsize,
    pub probe_calls: AtomicUsize,
}

impl Default for FakeConnector {
    fn default() -> Self {
        Self {
            minions: Mutex::new(Vec::new()),
            timings: Mutex::new(Vec::new()),
            probe: Mutex::new(ProbeOutcome::Ok(RemoteConnectionStatus::NotConfigured)),
            minion_fetches: AtomicUsize::new(0),
            probe_calls: AtomicUsize::new(0),
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn ready<T: Send + 'static>(value: T) -> BoxFuture<'static, Result<T, ApiError>> {
    async move { Ok(value) }.boxed()
}

impl ApiConnector for FakeConnector {
    fn fetch_minions(&self) -> BoxFuture<'static, Result<Vec<Minion>, ApiError>> {
        self.minion_fetches.fetch_add(1, Ordering::SeqCst);
        ready(lock(&self.minions).clone())
    }

    fn fetch_timings(&self) -> BoxFuture<'static, Result<Vec<Timing>, ApiError>> {
        ready(lock(&self.timings).clone())
    }

    fn fetch_users(&self) -> BoxFuture<'static, Result<Vec<User>, ApiError>> {
        ready(Vec::new())
    }

    fn fetch_lan_devices(&self) -> BoxFuture<'static, Result<Vec<LanDevice>, ApiError>> {
        ready(Vec::new())
    }

    fn fetch_actions(&self) -> BoxFuture<'static, Result<Vec<Action>, ApiError>> {
        ready(Vec::new())
    }

    fn fetch_timeouts(&self) -> BoxFuture<'static, Result<Vec<MinionTimeout>, ApiError>> {
        ready(Vec::new())
    }

    fn fetch_timeline(&self) -> BoxFuture<'static, Result<Vec<TimelineNode>, ApiError>> {
        ready(Vec::new())
    }

    fn fetch_remote_settings(&self) -> BoxFuture<'static, Result<RemoteSettings, ApiError>> {
        ready(RemoteSettings::default())
    }

    fn probe_liveliness(&self) -> BoxFuture<'static, Result<RemoteConnectionStatus, ApiError>> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        let outcome = *lock(&self.probe);
        async move {
            match outcome {
                ProbeOutcome::Ok(status) => Ok(status),
                ProbeOutcome::TransportFailure => Err(ApiError::Transport {
                    message: "no route to host".into(),
                }),
                ProbeOutcome::AppRejection => Err(ApiError::Api {
                    status: 500,
                    message: "internal error".into(),
                }),
            }
        }
        .boxed()
    }
}

/// Plain switch minion for fetch fixtures.
pub(crate) fn minion_fixture(id: &str) -> Minion {
    use crate::model::{MinionStatus, MinionType};
    Minion {
        minion_id: id.into(),
        name: format!("minion {id}"),
        minion_type: MinionType::Switch,
        room: None,
        is_properly_communicated: true,
        minion_status: MinionStatus::off(),
        minion_auto_turn_off_ms: None,
    }
}

/// Push transport backed by plain channels; tests inject frames by hand.
#[derive(Default)]
pub(crate) struct ChannelTransport {
    senders: Mutex<HashMap<String, Vec<UnboundedSender<String>>>>,
    pub connects: AtomicUsize,
}

impl ChannelTransport {
    /// Deliver a frame to every open connection on `channel`.
    pub(crate) fn send(&self, channel: &str, frame: &str) {
        if let Some(senders) = lock(&self.senders).get(channel) {
            for tx in senders {
                let _ = tx.send(frame.to_owned());
            }
        }
    }

    pub(crate) fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

impl PushTransport for ChannelTransport {
    fn connect(&self, channel: &str) -> Result<PushReceiver, ApiError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let (tx, receiver) = PushReceiver::channel();
        lock(&self.senders)
            .entry(channel.to_owned())
            .or_default()
            .push(tx);
        Ok(receiver)
    }
}
