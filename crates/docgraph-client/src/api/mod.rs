mod client;
mod remote;

pub use client::{ApiClient, ApiError};
pub use remote::RemoteCall;
