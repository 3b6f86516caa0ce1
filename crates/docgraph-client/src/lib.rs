//! Client side of docgraph: the backend API, optimistic sync of relationship
//! mutations, and the session configuration the terminal UI runs with.

pub mod api;
pub mod config;
pub mod logging;
pub mod session;
pub mod sync;

pub use api::{ApiClient, ApiError};
pub use config::ClientConfig;
pub use sync::{DocumentBackend, PendingSync, SyncError, SyncedGraph, WorkspaceApi};
