//! Remote favorites API client.
//!
//! The sync engine talks to the remote dictionary service through the
//! [`FavoritesApi`] trait; [`HttpFavoritesApi`] implements it over the
//! platform [`HttpClient`] bridge. Responses are mapped into the
//! [`SyncError`] taxonomy so the engine can decide between retrying and
//! surfacing a terminal failure.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, SyncError};
use crate::models::{FavoriteWord, WordId};

/// Remote API surface the sync engine depends on.
///
/// Both mutations are idempotent on the server: favoriting an
/// already-favorited word and unfavoriting a non-favorited word both succeed
/// with 2xx.
#[async_trait]
pub trait FavoritesApi: Send + Sync {
    /// Add a word to the user's favorites.
    async fn add_favorite(&self, word_id: &WordId) -> Result<()>;

    /// Remove a word from the user's favorites.
    async fn remove_favorite(&self, word_id: &WordId) -> Result<()>;

    /// Fetch the authoritative favorites snapshot (full resync).
    async fn fetch_favorites(&self) -> Result<Vec<FavoriteWord>>;

    /// Cheap health probe; success means "online". No semantic payload.
    async fn ping(&self) -> Result<()>;
}

#[derive(Serialize)]
struct AddFavoriteBody<'a> {
    word_id: &'a str,
}

/// HTTP implementation of [`FavoritesApi`].
pub struct HttpFavoritesApi {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl HttpFavoritesApi {
    /// Create a client rooted at `base_url`.
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }

        Self { http, base_url }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.http
            .execute(request)
            .await
            .map_err(|e| SyncError::Network(e.to_string()))
    }

    fn check_status(response: &HttpResponse) -> Result<()> {
        if response.is_success() {
            return Ok(());
        }

        let message = response
            .text()
            .unwrap_or_else(|_| "<non-UTF-8 body>".to_string());

        Err(SyncError::RemoteStatus {
            status: response.status,
            message,
        })
    }
}

#[async_trait]
impl FavoritesApi for HttpFavoritesApi {
    async fn add_favorite(&self, word_id: &WordId) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Post, self.endpoint("/favorites"))
            .json(&AddFavoriteBody {
                word_id: word_id.as_str(),
            })
            .map_err(|e| SyncError::Serialization(e.to_string()))?;

        let response = self.execute(request).await?;
        Self::check_status(&response)?;

        debug!(word_id = %word_id, "Favorite add confirmed");
        Ok(())
    }

    async fn remove_favorite(&self, word_id: &WordId) -> Result<()> {
        let request = HttpRequest::new(
            HttpMethod::Delete,
            self.endpoint(&format!("/favorites/{}", word_id)),
        );

        let response = self.execute(request).await?;
        Self::check_status(&response)?;

        debug!(word_id = %word_id, "Favorite remove confirmed");
        Ok(())
    }

    async fn fetch_favorites(&self) -> Result<Vec<FavoriteWord>> {
        let request = HttpRequest::new(HttpMethod::Get, self.endpoint("/favorites"));

        let response = self.execute(request).await?;
        Self::check_status(&response)?;

        response
            .json()
            .map_err(|e| SyncError::Serialization(e.to_string()))
    }

    async fn ping(&self) -> Result<()> {
        let request = HttpRequest::new(HttpMethod::Get, self.endpoint("/health"));

        let response = self.execute(request).await?;
        Self::check_status(&response)
    }
}
