//! The generic cache/fetch/publish primitive and its registry.

pub mod data_service;
pub mod registry;

pub use data_service::{CacheMode, DataService, FetchFn, ServiceOptions, SubscriberFn, Subscription};
pub use registry::{ResettableService, ServiceRegistry};
