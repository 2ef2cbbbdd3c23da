//! # Favorites Sync Module
//!
//! Offline-first favorites for the dictionary app.
//!
//! ## Overview
//!
//! This crate manages the lifecycle of a user's favorite-word edits made
//! offline or against a flaky connection:
//! - Toggles apply local tentative state synchronously and enqueue a remote
//!   confirmation
//! - A drain pass flushes the queue in batches with retry and terminal-error
//!   reporting
//! - A full resync fetches the remote snapshot and reconciles it against
//!   local state via the conflict resolver
//!
//! ## Components
//!
//! - **Sync Queue Engine** (`engine`): coalescing queue, non-reentrant
//!   batched drain, auto-sync timer, status
//! - **Conflict Resolver** (`conflict`): pure remote-wins reconciliation
//! - **Remote API client** (`api`): `FavoritesApi` over the `HttpClient`
//!   bridge
//! - **Persisted state** (`store`): queue and snapshot over the
//!   `SettingsStore` bridge
//! - **Assembly** (`service`): `FavoritesCore` wired from a `CoreConfig`

pub mod api;
pub mod conflict;
pub mod engine;
pub mod error;
pub mod models;
pub mod service;
pub mod store;

pub use api::{FavoritesApi, HttpFavoritesApi};
pub use conflict::{resolve, resolve_with_pending};
pub use engine::{SyncEngine, SyncEngineConfig, FAVORITES_CACHE_KEY};
pub use error::{Result, SyncError};
pub use models::{
    ActionId, ActionKind, FavoriteWord, PendingAction, SyncResult, SyncStatus, WordId,
};
pub use service::FavoritesCore;
pub use store::FavoritesStore;
