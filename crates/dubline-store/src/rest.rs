//! `PostgREST` adapters.
//!
//! The transcript source reads the newest row of a table ordered by
//! `updated_at`; the result sink inserts one row per record. Both send the
//! project key as `apikey` and as a bearer token.
//!
//! Push notifications need a realtime websocket, which this adapter does
//! not speak: [`RestTranscriptSource::subscribe`] reports
//! [`SourceError::PushUnsupported`] and the change detector polls instead.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;
use url::Url;

use dubline_core::domain::TranscriptSnapshot;
use dubline_core::ports::{
    ResultRecord, ResultSink, SinkError, SnapshotFeed, SourceError, TranscriptSource,
};

use crate::error::StoreError;

/// Connection settings for a `PostgREST` endpoint.
#[derive(Debug, Clone)]
pub struct RestConfig {
    /// Project URL, e.g. `https://abc.supabase.co`.
    pub base_url: String,
    pub api_key: String,
    pub transcripts_table: String,
    pub results_table: String,
    pub timeout: Duration,
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            transcripts_table: "transcripts".to_string(),
            results_table: "translations".to_string(),
            timeout: Duration::from_secs(10),
        }
    }

    #[must_use]
    pub fn with_tables(mut self, transcripts: impl Into<String>, results: impl Into<String>) -> Self {
        self.transcripts_table = transcripts.into();
        self.results_table = results.into();
        self
    }

    /// `{base}/rest/v1/{table}`
    pub fn table_url(&self, table: &str) -> Result<Url, StoreError> {
        let mut url = Url::parse(&self.base_url)?;
        url.path_segments_mut()
            .map_err(|()| StoreError::NotABase(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["rest", "v1", table]);
        Ok(url)
    }

    /// Query for the single most recently updated transcript row.
    pub fn latest_transcript_url(&self) -> Result<Url, StoreError> {
        let mut url = self.table_url(&self.transcripts_table)?;
        url.query_pairs_mut()
            .append_pair("select", "*")
            .append_pair("order", "updated_at.desc")
            .append_pair("limit", "1");
        Ok(url)
    }
}

/// Shared authenticated client.
#[derive(Debug, Clone)]
struct RestClient {
    http: reqwest::Client,
    api_key: String,
}

impl RestClient {
    fn new(config: &RestConfig) -> Result<Self, StoreError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("dubline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
        })
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }
}

/// One transcript row as returned by `PostgREST`.
#[derive(Debug, Deserialize)]
struct TranscriptRow {
    id: serde_json::Value,
    #[serde(alias = "content", alias = "transcript")]
    text: Option<String>,
    updated_at: Option<DateTime<Utc>>,
    session_id: Option<String>,
    user_id: Option<String>,
}

impl TranscriptRow {
    fn into_snapshot(self) -> Result<TranscriptSnapshot, SourceError> {
        let id = match self.id {
            serde_json::Value::String(s) => s,
            serde_json::Value::Number(n) => n.to_string(),
            other => {
                return Err(SourceError::Malformed(format!(
                    "unsupported transcript id: {other}"
                )));
            }
        };

        let mut snapshot = TranscriptSnapshot::new(id, self.text.unwrap_or_default());
        if let Some(updated_at) = self.updated_at {
            snapshot = snapshot.with_updated_at(updated_at);
        }
        snapshot.session_id = self.session_id;
        snapshot.user_id = self.user_id;
        Ok(snapshot)
    }
}

/// Parse a `PostgREST` response body into the newest snapshot, if any.
pub fn parse_latest(body: &str) -> Result<Option<TranscriptSnapshot>, SourceError> {
    let rows: Vec<TranscriptRow> =
        serde_json::from_str(body).map_err(|e| SourceError::Malformed(e.to_string()))?;
    rows.into_iter()
        .next()
        .map(TranscriptRow::into_snapshot)
        .transpose()
}

/// Polls the newest row of the transcripts table.
#[derive(Debug, Clone)]
pub struct RestTranscriptSource {
    client: RestClient,
    url: Url,
}

impl RestTranscriptSource {
    pub fn new(config: &RestConfig) -> Result<Self, StoreError> {
        Ok(Self {
            client: RestClient::new(config)?,
            url: config.latest_transcript_url()?,
        })
    }
}

#[async_trait]
impl TranscriptSource for RestTranscriptSource {
    async fn fetch_latest(&self) -> Result<Option<TranscriptSnapshot>, SourceError> {
        let response = self
            .client
            .authorize(self.client.http.get(self.url.clone()))
            .send()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(SourceError::Unavailable(format!(
                "transcript query returned {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::Unavailable(e.to_string()))?;
        parse_latest(&body)
    }

    async fn subscribe(&self) -> Result<SnapshotFeed, SourceError> {
        Err(SourceError::PushUnsupported)
    }
}

/// Inserts result records into the results table.
#[derive(Debug, Clone)]
pub struct RestResultSink {
    client: RestClient,
    url: Url,
}

impl RestResultSink {
    pub fn new(config: &RestConfig) -> Result<Self, StoreError> {
        Ok(Self {
            client: RestClient::new(config)?,
            url: config.table_url(&config.results_table)?,
        })
    }
}

#[async_trait]
impl ResultSink for RestResultSink {
    async fn insert(&self, record: ResultRecord) -> Result<(), SinkError> {
        let response = self
            .client
            .authorize(self.client.http.post(self.url.clone()))
            .header("Prefer", "return=minimal")
            .json(&record)
            .send()
            .await
            .map_err(|e| SinkError::Unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SinkError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        debug!(url = %self.url, "Result row inserted");
        Ok(())
    }
}
