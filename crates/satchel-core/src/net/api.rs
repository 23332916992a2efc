//! Remote REST API client.
//!
//! Every tracked collection exposes the same contract on the remote
//! authority: incremental `GET /api/{collection}?since={unixMillis}` plus
//! POST/PUT/DELETE for individual records.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;

use crate::config::SyncSettings;
use crate::error::{Error, Result};
use crate::util::compact_text;

/// Per-entity REST operations the sync engine consumes.
///
/// A trait seam so the engine can run against an in-memory fake in tests and
/// alternative transports in embedded clients.
#[allow(async_fn_in_trait)]
pub trait RemoteApi {
    /// Records created or updated at or after `since` (unix ms)
    async fn fetch_since(&self, collection: &str, since: i64) -> Result<Vec<Value>>;

    /// Create a record
    async fn create(&self, collection: &str, payload: &Value) -> Result<()>;

    /// Update a record by id
    async fn update(&self, collection: &str, id: &str, payload: &Value) -> Result<()>;

    /// Delete a record by id
    async fn delete(&self, collection: &str, id: &str) -> Result<()>;
}

/// reqwest-backed implementation of [`RemoteApi`]
#[derive(Clone)]
pub struct HttpRemoteApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteApi {
    /// Build a client for the configured API base URL.
    ///
    /// Every request carries the configured timeout so a dead connection can
    /// never wedge a sync round open.
    pub fn new(settings: &SyncSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            base_url: settings.api_base_url.clone(),
            client,
        })
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/api/{collection}", self.base_url)
    }

    fn record_url(&self, collection: &str, id: &str) -> String {
        format!("{}/api/{collection}/{id}", self.base_url)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(Error::Server {
            status: status.as_u16(),
            message: parse_api_error(status, &body),
        })
    }
}

impl RemoteApi for HttpRemoteApi {
    async fn fetch_since(&self, collection: &str, since: i64) -> Result<Vec<Value>> {
        let response = self
            .client
            .get(self.collection_url(collection))
            .query(&[("since", since)])
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }

    async fn create(&self, collection: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .post(self.collection_url(collection))
            .json(payload)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn update(&self, collection: &str, id: &str, payload: &Value) -> Result<()> {
        let response = self
            .client
            .put(self.record_url(collection, id))
            .json(payload)
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let response = self
            .client
            .delete(self.record_url(collection, id))
            .send()
            .await?;

        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return format!("{} ({})", message.trim(), status.as_u16());
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("{} ({})", compact_text(trimmed), status.as_u16())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_api_error_prefers_structured_message() {
        let message = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"message": "amount must be positive"}"#,
        );
        assert_eq!(message, "amount must be positive (400)");

        let message = parse_api_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "db unavailable"}"#,
        );
        assert_eq!(message, "db unavailable (500)");
    }

    #[test]
    fn parse_api_error_falls_back_to_body_text() {
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, "upstream timeout"),
            "upstream timeout (502)"
        );
        assert_eq!(parse_api_error(StatusCode::NOT_FOUND, ""), "HTTP 404");
    }

    #[test]
    fn urls_follow_the_rest_contract() {
        let settings = SyncSettings::new("https://api.example.com").unwrap();
        let api = HttpRemoteApi::new(&settings).unwrap();

        assert_eq!(
            api.collection_url("activities"),
            "https://api.example.com/api/activities"
        );
        assert_eq!(
            api.record_url("activities", "a1"),
            "https://api.example.com/api/activities/a1"
        );
    }
}
