// ── Minions: the primary device-status resource ──
//
// Push-backed: every full fetch re-opens the minions feed first, so live
// status deltas keep flowing into the cache between refetches.

use std::sync::{Arc, OnceLock, Weak};

use futures_util::FutureExt;
use tracing::debug;

use casita_api::{ApiError, KeyedStore, PushTransport};

use crate::connector::ApiConnector;
use crate::model::{Minion, MinionStatus};
use crate::service::{CacheMode, DataService, FetchFn, ServiceOptions, ServiceRegistry};

use super::feed::{self, FeedGuard, FeedMessage};

/// Reactive collection of all minions.
pub struct MinionsService {
    service: Arc<DataService<Vec<Minion>>>,
    feed_guard: Arc<FeedGuard>,
}

impl MinionsService {
    pub(crate) fn new(
        connector: &Arc<dyn ApiConnector>,
        transport: &Arc<dyn PushTransport>,
        store: &Arc<dyn KeyedStore>,
        registry: &ServiceRegistry,
        feed_channel: &str,
    ) -> Self {
        let feed_guard = Arc::new(FeedGuard::default());
        // The fetch closure needs the service for feed merges, and the
        // service owns the closure. The once-set weak slot breaks the cycle.
        let slot: Arc<OnceLock<Weak<DataService<Vec<Minion>>>>> = Arc::new(OnceLock::new());

        let fetch: FetchFn<Vec<Minion>> = {
            let connector = Arc::clone(connector);
            let transport = Arc::clone(transport);
            let guard = Arc::clone(&feed_guard);
            let slot = Arc::clone(&slot);
            let channel = feed_channel.to_owned();
            Arc::new(move || {
                let connector = Arc::clone(&connector);
                let transport = Arc::clone(&transport);
                let guard = Arc::clone(&guard);
                let slot = Arc::clone(&slot);
                let channel = channel.clone();
                async move {
                    if let Some(weak) = slot.get() {
                        feed::reopen_feed(weak, transport.as_ref(), &channel, &guard);
                    }
                    connector.fetch_minions().await
                }
                .boxed()
            })
        };

        let service = DataService::new(
            "Minions",
            Vec::new(),
            fetch,
            ServiceOptions {
                cache_mode: CacheMode::Full,
                cache_key: None,
            },
            Arc::clone(store),
            registry,
        );
        let _ = slot.set(Arc::downgrade(&service));

        Self {
            service,
            feed_guard,
        }
    }

    /// The underlying generic service, for subscriptions and direct reads.
    pub fn service(&self) -> &Arc<DataService<Vec<Minion>>> {
        &self.service
    }

    /// Copy of the current cached collection.
    pub fn data(&self) -> Vec<Minion> {
        self.service.data()
    }

    pub async fn get_data(&self) -> Result<Vec<Minion>, ApiError> {
        self.service.get_data().await
    }

    // ── Optimistic mutators ──────────────────────────────────────────
    //
    // For UI code that just completed a REST mutation: update the local
    // cache now instead of waiting for the push event or a refetch. Same
    // in-place-then-republish pattern as the push handler.

    pub fn update_minion(&self, minion: Minion) {
        self.merge(FeedMessage::Updated(minion));
    }

    pub fn create_minion(&self, minion: Minion) {
        self.merge(FeedMessage::Created(minion));
    }

    pub fn delete_minion(&self, minion_id: &str) {
        self.service.update_in_place(|items| {
            items.retain(|m| m.minion_id != minion_id);
            true
        });
    }

    /// Set one minion's status in the cache; a no-op for unknown ids.
    pub fn set_minion_status(&self, minion_id: &str, status: MinionStatus) {
        self.service.update_in_place(|items| {
            let Some(minion) = items.iter_mut().find(|m| m.minion_id == minion_id) else {
                debug!(minion_id, "status update for unknown minion ignored");
                return false;
            };
            minion.minion_status = status;
            true
        });
    }

    /// Close the live feed; the next fetch re-opens it.
    pub fn close_feed(&self) {
        self.feed_guard.close();
    }

    fn merge(&self, message: FeedMessage<Minion>) {
        self.service.update_in_place(|items| {
            feed::apply_message(items, message);
            true
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{MinionType, SwitchState};
    use crate::testutil::{ChannelTransport, FakeConnector};
    use casita_api::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn minion(id: &str, state: SwitchState) -> Minion {
        Minion {
            minion_id: id.into(),
            name: format!("minion {id}"),
            minion_type: MinionType::Switch,
            room: None,
            is_properly_communicated: true,
            minion_status: MinionStatus {
                state,
                extra: serde_json::Value::Null,
            },
            minion_auto_turn_off_ms: None,
        }
    }

    struct Fixture {
        connector: Arc<FakeConnector>,
        transport: Arc<ChannelTransport>,
        minions: MinionsService,
    }

    fn fixture() -> Fixture {
        let connector = Arc::new(FakeConnector::default());
        let transport = Arc::new(ChannelTransport::default());
        let registry = ServiceRegistry::new();
        let store: Arc<dyn KeyedStore> = Arc::new(MemoryStore::new());

        let minions = MinionsService::new(
            &(Arc::clone(&connector) as Arc<dyn ApiConnector>),
            &(Arc::clone(&transport) as Arc<dyn PushTransport>),
            &store,
            &registry,
            "minions",
        );
        Fixture {
            connector,
            transport,
            minions,
        }
    }

    async fn settle() {
        // Let spawned pump tasks observe their queued frames.
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn fetch_opens_feed_and_reopens_on_refetch() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];

        fx.minions.get_data().await.unwrap();
        assert_eq!(fx.transport.connect_count(), 1);

        fx.minions.service().force_fetch().await.unwrap();
        assert_eq!(fx.transport.connect_count(), 2);
    }

    #[tokio::test]
    async fn push_update_merges_into_cache() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];
        fx.minions.get_data().await.unwrap();

        let frame = serde_json::json!({
            "event": "Updated",
            "entity": {
                "minionId": "m1",
                "name": "minion m1",
                "minionType": "switch",
                "minionStatus": { "state": "on" }
            }
        });
        fx.transport.send("minions", &frame.to_string());
        fx.transport.send("minions", "init");
        settle().await;

        let items = fx.minions.data();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].minion_status.state, SwitchState::On);
        // The push merge did not trigger a refetch.
        assert_eq!(fx.connector.minion_fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn push_created_and_removed_round_trip() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];
        fx.minions.get_data().await.unwrap();

        let created = serde_json::json!({
            "event": "Created",
            "entity": {
                "minionId": "m2",
                "name": "minion m2",
                "minionType": "switch",
                "minionStatus": { "state": "off" }
            }
        });
        fx.transport.send("minions", &created.to_string());
        settle().await;
        assert_eq!(fx.minions.data().len(), 2);

        let removed = serde_json::json!({
            "event": "Removed",
            "entity": {
                "minionId": "m1",
                "name": "minion m1",
                "minionType": "switch",
                "minionStatus": { "state": "off" }
            }
        });
        fx.transport.send("minions", &removed.to_string());
        settle().await;

        let items = fx.minions.data();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].minion_id, "m2");
    }

    #[tokio::test]
    async fn optimistic_mutators_republish_full_collection() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];
        fx.minions.get_data().await.unwrap();

        fx.minions.create_minion(minion("m2", SwitchState::On));
        assert_eq!(fx.minions.data().len(), 2);

        fx.minions.set_minion_status("m1", MinionStatus {
            state: SwitchState::On,
            extra: serde_json::Value::Null,
        });
        assert_eq!(fx.minions.data()[0].minion_status.state, SwitchState::On);

        fx.minions.delete_minion("m2");
        let items = fx.minions.data();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].minion_id, "m1");
    }

    #[tokio::test]
    async fn status_update_for_unknown_id_publishes_nothing() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];
        fx.minions.get_data().await.unwrap();

        let publishes = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let _sub = {
            let publishes = Arc::clone(&publishes);
            fx.minions
                .service()
                .attach(Arc::new(move |_| {
                    publishes.fetch_add(1, Ordering::SeqCst);
                }))
                .await
                .unwrap()
        };
        assert_eq!(publishes.load(Ordering::SeqCst), 1);

        fx.minions.set_minion_status("ghost", MinionStatus {
            state: SwitchState::On,
            extra: serde_json::Value::Null,
        });
        assert_eq!(publishes.load(Ordering::SeqCst), 1);
        assert_eq!(fx.minions.data()[0].minion_status.state, SwitchState::Off);
    }

    #[tokio::test]
    async fn closed_feed_stops_deltas() {
        let fx = fixture();
        *fx.connector.minions.lock().unwrap() = vec![minion("m1", SwitchState::Off)];
        fx.minions.get_data().await.unwrap();

        fx.minions.close_feed();
        settle().await;

        let frame = serde_json::json!({
            "event": "Removed",
            "entity": {
                "minionId": "m1",
                "name": "minion m1",
                "minionType": "switch",
                "minionStatus": { "state": "off" }
            }
        });
        fx.transport.send("minions", &frame.to_string());
        settle().await;

        assert_eq!(fx.minions.data().len(), 1);
    }
}
