//! Reactive data-sync layer between `casita-api` and UI consumers.
//!
//! This crate owns the caching, fetching, and fan-out logic for the
//! dashboard workspace:
//!
//! - **[`SyncHub`]** — Composition root wiring one connector, push
//!   transport, and local store into every resource service, the session
//!   flag, and the liveliness heartbeat. [`login()`](SyncHub::login) /
//!   [`logout()`](SyncHub::logout) bracket a user session; logout resets
//!   every service so per-user data never leaks across sessions.
//!
//! - **[`DataService<T>`]** — The cache-fetch-publish primitive. Every
//!   read hands out an independent deep copy; subscribers are fanned out
//!   in registration order; a monotonic revision counter drops stale
//!   fetch results that resolve after a newer value.
//!
//! - **Resource services** ([`resources`]) — One [`DataService`] per
//!   server collection (minions, timings, users, LAN devices, actions,
//!   timeouts, timeline, remote settings). Minions and timings merge
//!   live push deltas between refetches.
//!
//! - **[`LivelinessMonitor`]** — Periodic reachability probe publishing
//!   connectivity transitions over a `watch` channel.
//!
//! - **[`ServiceBinding<T>`]** — Mount/unmount adapter for view code:
//!   synchronous first render from cache, background attach, updates
//!   delivered over an event stream, detach on drop.

pub mod binding;
pub mod config;
pub mod connector;
pub mod hub;
pub mod liveliness;
pub mod model;
pub mod resources;
pub mod service;

#[cfg(test)]
mod testutil;

// ── Primary re-exports ──────────────────────────────────────────────
pub use binding::{BindingEvent, ServiceBinding};
pub use config::SyncConfig;
pub use connector::ApiConnector;
pub use hub::SyncHub;
pub use liveliness::{LivelinessInfo, LivelinessMonitor, ProbeFn};
pub use resources::{MinionsService, Resources, TimingsService};
pub use service::{
    CacheMode, DataService, FetchFn, ServiceOptions, ServiceRegistry, SubscriberFn, Subscription,
};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Action,
    ActionStep,
    LanDevice,
    Minion,
    MinionStatus,
    MinionTimeout,
    MinionType,
    RemoteSettings,
    Schedule,
    SwitchState,
    TimelineNode,
    Timing,
    User,
};
