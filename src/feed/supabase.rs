//! Feed client for the website's Supabase (PostgREST) chat table.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::{Client, RequestBuilder, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::common::error::{FeedError, FeedResult};
use crate::common::{FeedMessage, FeedMessageId, MessageOrigin, NewFeedMessage};
use crate::config::types::FeedConfig;
use crate::feed::FeedClient;

/// PostgREST-backed feed.
pub struct SupabaseFeed {
    http: Client,
    table_url: String,
    service_key: String,
}

/// One row of the chat table.
#[derive(Debug, Deserialize)]
struct FeedRow {
    id: FeedMessageId,
    username: String,
    message: String,
    created_at: String,
    #[serde(default)]
    source: Option<String>,
}

#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: FeedMessageId,
}

impl SupabaseFeed {
    pub fn new(config: &FeedConfig) -> FeedResult<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            table_url: table_url(&config.url, &config.table),
            service_key: config.service_key.clone(),
        })
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait]
impl FeedClient for SupabaseFeed {
    async fn fetch_recent_external(&self, limit: usize) -> FeedResult<Vec<FeedMessage>> {
        let source_filter = format!("eq.{}", MessageOrigin::External.as_wire());
        let limit = limit.to_string();
        let request = self.http.get(&self.table_url).query(&[
            ("select", "*"),
            ("source", source_filter.as_str()),
            ("order", "created_at.desc"),
            ("limit", limit.as_str()),
        ]);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| FeedError::Fetch {
                message: e.to_string(),
            })?;
        let response = ensure_success(response)
            .await
            .map_err(|message| FeedError::Fetch { message })?;

        let rows: Vec<FeedRow> = response.json().await.map_err(|e| FeedError::Decode {
            message: e.to_string(),
        })?;

        let messages: Vec<FeedMessage> = rows
            .into_iter()
            .filter_map(|row| {
                let id = row.id.clone();
                row.into_message()
                    .map_err(|e| warn!(feed_id = %id, "Skipping feed row: {}", e))
                    .ok()
            })
            .collect();

        debug!("Fetched {} website message(s)", messages.len());
        Ok(messages)
    }

    async fn submit(&self, message: &NewFeedMessage) -> FeedResult<FeedMessageId> {
        let body = json!({
            "username": message.author_name,
            "message": message.body,
            "source": message.origin().as_wire(),
        });

        let request = self
            .http
            .post(&self.table_url)
            .header("Prefer", "return=representation")
            .json(&body);

        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(|e| FeedError::Submission {
                message: e.to_string(),
            })?;
        let response = ensure_success(response)
            .await
            .map_err(|message| FeedError::Submission { message })?;

        let rows: Vec<InsertedRow> = response.json().await.map_err(|e| FeedError::Decode {
            message: e.to_string(),
        })?;

        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| FeedError::Submission {
                message: "feed accepted the insert but returned no row".to_string(),
            })
    }
}

impl FeedRow {
    fn into_message(self) -> FeedResult<FeedMessage> {
        let created_at = parse_timestamp(&self.created_at).ok_or_else(|| FeedError::Decode {
            message: format!("invalid created_at '{}'", self.created_at),
        })?;

        // Rows without a source predate the column and came from the website.
        let origin = match self.source.as_deref() {
            None => MessageOrigin::External,
            Some(source) => MessageOrigin::from_wire(source).ok_or_else(|| FeedError::Decode {
                message: format!("unknown source '{}'", source),
            })?,
        };

        Ok(FeedMessage {
            id: self.id,
            author_name: self.username,
            body: self.message,
            created_at,
            origin,
        })
    }
}

/// Build the REST endpoint of a table.
fn table_url(base_url: &str, table: &str) -> String {
    format!("{}/rest/v1/{}", base_url.trim_end_matches('/'), table)
}

/// Parse RFC 3339 timestamps; zone-less values are taken as UTC.
fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Turn a non-2xx response into an error message including the body.
async fn ensure_success(response: Response) -> Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(format!("{}: {}", status, body.trim()))
}
