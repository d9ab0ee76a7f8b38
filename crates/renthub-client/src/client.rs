use reqwest::{Client, StatusCode};
use thiserror::Error;

use renthub_types::api::LikeResponse;

use crate::optimistic::{OptimisticToggle, ToggleState};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error body.
    #[error("{message}")]
    Api { status: StatusCode, message: String },
}

/// Thin HTTP client for the RentHub API, holding the base URL and the
/// bearer token obtained at login.
pub struct RentHubClient {
    http: Client,
    base_url: String,
    token: String,
}

impl RentHubClient {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }

    /// POST /api/renthub/{id}/like — returns the settled liked flag and
    /// the recomputed count.
    pub async fn toggle_like(&self, listing_id: &str) -> Result<LikeResponse, ClientError> {
        let url = format!("{}/api/renthub/{}/like", self.base_url, listing_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<serde_json::Value>()
                .await
                .ok()
                .and_then(|body| Some(body.get("error")?.as_str()?.to_string()))
                .unwrap_or_else(|| "request failed".to_string());
            return Err(ClientError::Api { status, message });
        }

        Ok(response.json().await?)
    }
}

/// One like control: the optimistic toggle wired to the like endpoint.
pub struct LikeControl {
    listing_id: String,
    toggle: OptimisticToggle,
}

impl LikeControl {
    pub fn new(listing_id: &str, initially_liked: bool, initial_count: i64) -> Self {
        Self {
            listing_id: listing_id.to_string(),
            toggle: OptimisticToggle::new(initially_liked, initial_count),
        }
    }

    pub fn liked(&self) -> bool {
        self.toggle.value()
    }

    pub fn count(&self) -> i64 {
        self.toggle.count()
    }

    pub fn state(&self) -> ToggleState {
        self.toggle.state()
    }

    /// Flip the control immediately, then reconcile with the server:
    /// settle on its response, or roll back and surface the error.
    pub async fn press(&mut self, client: &RentHubClient) -> Result<(), ClientError> {
        self.toggle.press();
        match client.toggle_like(&self.listing_id).await {
            Ok(response) => {
                self.toggle.settle(response.liked, response.likes_count);
                Ok(())
            }
            Err(err) => {
                self.toggle.rollback();
                Err(err)
            }
        }
    }
}
