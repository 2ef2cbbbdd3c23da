//! # Desktop Bridge Implementations
//!
//! Desktop reference implementations of the platform bridge traits:
//!
//! - [`ReqwestHttpClient`] - HTTP operations via reqwest with retry
//! - [`SqliteSettingsStore`] - Durable key-value storage via SQLite
//! - [`DesktopNetworkMonitor`] - Connectivity detection via TCP reachability
//!
//! Mobile hosts ship their own adapters; this crate exists so the core can be
//! exercised end to end on a development machine.

pub mod http;
pub mod network;
pub mod settings;

pub use http::ReqwestHttpClient;
pub use network::DesktopNetworkMonitor;
pub use settings::SqliteSettingsStore;
