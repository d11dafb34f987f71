//! Interface contracts between the casita sync core and its host.
//!
//! The sync core (`casita-core`) never talks to the network or to durable
//! storage directly. Hosts hand it implementations of the small surfaces
//! defined here:
//!
//! - **[`ApiError`]** — the error taxonomy every fetch function rejects
//!   with. The core propagates these unchanged; classification helpers
//!   ([`ApiError::is_transport`]) drive connectivity handling.
//! - **[`KeyedStore`]** — a minimal key/value string store used as a
//!   cold-start cache. Browsers supply local storage; everything else can
//!   use [`MemoryStore`].
//! - **[`PushTransport`]** — a server-push connection factory yielding raw
//!   text frames. The core parses and merges; the transport only moves
//!   bytes.
//! - **[`RemoteConnectionStatus`]** — the remote-link status enum returned
//!   by the liveliness probe endpoint.

pub mod error;
pub mod push;
pub mod status;
pub mod store;

pub use error::ApiError;
pub use push::{PushReceiver, PushTransport};
pub use status::RemoteConnectionStatus;
pub use store::{KeyedStore, MemoryStore};
