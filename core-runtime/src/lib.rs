//! # Core Runtime
//!
//! Ambient runtime for the dictionary core: configuration and logging.
//!
//! ## Overview
//!
//! - [`config`]: the [`CoreConfig`](config::CoreConfig) builder collects the
//!   platform bridges and tunables every other core crate needs, validating
//!   required capabilities fail-fast at build time.
//! - [`logging`]: `tracing`/`tracing-subscriber` bootstrap with env-filter and
//!   pretty or JSON output.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use core_runtime::logging::{init_logging, LoggingConfig};
//! use std::sync::Arc;
//!
//! init_logging(LoggingConfig::default())?;
//!
//! let config = CoreConfig::builder()
//!     .api_base_url("https://api.example.com")
//!     .settings_store(Arc::new(my_settings_store))
//!     .http_client(Arc::new(my_http_client))
//!     .build()?;
//! ```

pub mod config;
pub mod error;
pub mod logging;

pub use config::{CoreConfig, CoreConfigBuilder, SyncTunables};
pub use error::{CoreError, Result};
pub use logging::{init_logging, LogFormat, LoggingConfig};
