// ── Push-feed merge path ──
//
// The push stream only carries deltas; the service cache remains the
// source of truth. Every applied delta republishes the whole collection,
// so the subscriber contract stays uniform: a publish always delivers the
// full `T`, never a delta type.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use casita_api::{PushReceiver, PushTransport};

use crate::model::Identified;
use crate::service::DataService;

/// Handshake frame the server sends on connect; carries no data.
const HANDSHAKE_FRAME: &str = "init";

/// A delta from the push stream, each variant carrying the full updated
/// entity.
#[derive(Debug, Deserialize)]
#[serde(tag = "event", content = "entity")]
pub(crate) enum FeedMessage<T> {
    Created(T),
    Updated(T),
    Removed(T),
}

/// Parse one raw frame. The `"init"` handshake yields `None`; so does any
/// malformed frame — the subscriber loop must never die on bad input.
pub(crate) fn parse_frame<T: DeserializeOwned>(raw: &str) -> Option<FeedMessage<T>> {
    if raw.trim() == HANDSHAKE_FRAME {
        return None;
    }
    match serde_json::from_str(raw) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!(error = %e, "ignoring malformed push frame");
            None
        }
    }
}

/// Merge one delta into the collection in place, matched by id.
///
/// `Created` for an id already present replaces it — the optimistic
/// mutators and the push stream race, and both must converge on one entry.
pub(crate) fn apply_message<T: Identified>(items: &mut Vec<T>, message: FeedMessage<T>) {
    match message {
        FeedMessage::Created(entity) | FeedMessage::Updated(entity) => {
            if let Some(slot) = items.iter_mut().find(|i| i.id() == entity.id()) {
                *slot = entity;
            } else {
                items.push(entity);
            }
        }
        FeedMessage::Removed(entity) => {
            items.retain(|i| i.id() != entity.id());
        }
    }
}

/// Guard over the currently open feed connection for one service.
/// Re-opening cancels the previous pump task; closing cancels outright.
#[derive(Default)]
pub(crate) struct FeedGuard {
    current: Mutex<Option<CancellationToken>>,
}

impl FeedGuard {
    fn swap(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut current = self
            .current
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *current, next)
    }

    pub(crate) fn close(&self) {
        if let Some(previous) = self.swap(None) {
            previous.cancel();
        }
    }
}

/// Open (or re-open, closing any prior connection) the push channel for a
/// service and start pumping its deltas into the cache.
///
/// A connect failure is logged, not propagated: the REST fetch that
/// triggered the re-open still proceeds, the service just misses live
/// deltas until the next refetch.
pub(crate) fn reopen_feed<T>(
    service: &Weak<DataService<Vec<T>>>,
    transport: &dyn PushTransport,
    channel: &str,
    guard: &FeedGuard,
) where
    T: Identified + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    let Some(service) = service.upgrade() else {
        return;
    };

    match transport.connect(channel) {
        Ok(receiver) => {
            let token = CancellationToken::new();
            if let Some(previous) = guard.swap(Some(token.clone())) {
                previous.cancel();
            }
            debug!(channel, "push channel opened");
            spawn_feed_pump(service, receiver, token);
        }
        Err(e) => {
            warn!(channel, error = %e, "push channel connect failed");
        }
    }
}

/// Pump task: read frames until the connection ends or the guard cancels,
/// merging each delta and republishing the full collection.
fn spawn_feed_pump<T>(
    service: Arc<DataService<Vec<T>>>,
    mut receiver: PushReceiver,
    cancel: CancellationToken,
) -> JoinHandle<()>
where
    T: Identified + Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                frame = receiver.next_frame() => frame,
            };
            let Some(frame) = frame else { break };
            let Some(message) = parse_frame::<T>(&frame) else {
                continue;
            };

            service.update_in_place(|items| {
                apply_message(items, message);
                true
            });
        }
        receiver.close();
        debug!(service = service.name(), "feed pump exiting");
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Minion, MinionStatus, MinionType, SwitchState};
    use pretty_assertions::assert_eq;

    fn minion(id: &str, name: &str, state: SwitchState) -> Minion {
        Minion {
            minion_id: id.into(),
            name: name.into(),
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

    #[test]
    fn handshake_frame_is_ignored() {
        assert!(parse_frame::<Minion>("init").is_none());
        assert!(parse_frame::<Minion>("  init  ").is_none());
    }

    #[test]
    fn malformed_frame_is_swallowed() {
        assert!(parse_frame::<Minion>("{ not json").is_none());
        assert!(parse_frame::<Minion>(r#"{"event":"Exploded","entity":{}}"#).is_none());
    }

    #[test]
    fn updated_replaces_matching_entity_only() {
        let mut items = vec![
            minion("m1", "lamp", SwitchState::Off),
            minion("m2", "heater", SwitchState::Off),
        ];

        let frame = serde_json::json!({
            "event": "Updated",
            "entity": {
                "minionId": "m1",
                "name": "lamp",
                "minionType": "switch",
                "minionStatus": { "state": "on" }
            }
        });
        let message = parse_frame::<Minion>(&frame.to_string()).unwrap();
        apply_message(&mut items, message);

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].minion_status.state, SwitchState::On);
        assert_eq!(items[1], minion("m2", "heater", SwitchState::Off));
    }

    #[test]
    fn created_appends_and_removed_deletes_by_id() {
        let mut items = vec![minion("m1", "lamp", SwitchState::Off)];

        apply_message(
            &mut items,
            FeedMessage::Created(minion("m2", "heater", SwitchState::On)),
        );
        assert_eq!(items.len(), 2);

        apply_message(
            &mut items,
            FeedMessage::Removed(minion("m1", "lamp", SwitchState::Off)),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].minion_id, "m2");
    }

    #[test]
    fn created_for_known_id_converges_to_one_entry() {
        // Optimistic create followed by the server's own Created event.
        let mut items = vec![minion("m1", "lamp", SwitchState::Off)];
        apply_message(
            &mut items,
            FeedMessage::Created(minion("m1", "lamp", SwitchState::On)),
        );
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].minion_status.state, SwitchState::On);
    }
}
