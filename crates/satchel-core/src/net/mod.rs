//! Network layer: connectivity monitoring and the remote API client

mod api;
mod monitor;

pub use api::{HttpRemoteApi, RemoteApi};
pub use monitor::NetworkMonitor;
