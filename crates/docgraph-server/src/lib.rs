pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;

pub use config::Config;
pub use routes::{create_router, AppState};
