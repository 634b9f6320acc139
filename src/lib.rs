// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod identity;
pub mod source;

// Core publishing pipeline
pub mod event;
pub mod fanout;
pub mod limiter;
pub mod render;
pub mod seen;

// Endpoints, wiring & service surface
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod logging;
pub mod metrics;
pub mod notify;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::fanout::{Publisher, PublisherDeps, PublishSettings, RunError, RunReport};
pub use crate::identity::RepositoryIdentity;
