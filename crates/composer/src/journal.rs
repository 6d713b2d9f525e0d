//! Persistence bridge to the per-user dream journal.
//!
//! The composer only ever *creates* entries from a generation; listing and
//! deletion are exposed for the journal views.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ComposerError;

/// Body of `POST /journal`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JournalDraft {
    pub title: String,
    pub content: String,
    pub dream_date: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_image_b64: Option<String>,
}

impl JournalDraft {
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        dream_date: DateTime<Utc>,
        generated_image_b64: Option<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            dream_date,
            generated_image_b64,
        }
    }
}

/// A persisted journal entry as returned by the API.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JournalRecord {
    pub id: i64,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub dream_date: DateTime<Utc>,
    pub generated_image_b64: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[async_trait]
pub trait JournalBridge: Send + Sync {
    /// Create an entry. Either the record exists afterwards or the call
    /// failed; there is no partial state.
    async fn save(&self, draft: &JournalDraft) -> Result<JournalRecord, ComposerError>;

    /// Entries whose dream date lies in `[from, to]`, newest first.
    async fn list(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<JournalRecord>, ComposerError>;

    async fn delete(&self, id: i64) -> Result<(), ComposerError>;
}

/// [`JournalBridge`] over the API's `/journal` routes.
pub struct HttpJournalBridge {
    client: reqwest::Client,
    base_url: String,
    access_token: String,
}

impl HttpJournalBridge {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            access_token: access_token.into(),
        }
    }

    async fn read<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ComposerError> {
        let response = check(response).await?;
        Ok(response.json::<Envelope<T>>().await?.data)
    }
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, ComposerError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ComposerError::Api {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl JournalBridge for HttpJournalBridge {
    async fn save(&self, draft: &JournalDraft) -> Result<JournalRecord, ComposerError> {
        let response = self
            .client
            .post(format!("{}/journal", self.base_url))
            .bearer_auth(&self.access_token)
            .json(draft)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn list(
        &self,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> Result<Vec<JournalRecord>, ComposerError> {
        let mut query = Vec::new();
        if let Some(from) = from {
            query.push(("from", from.to_rfc3339()));
        }
        if let Some(to) = to {
            query.push(("to", to.to_rfc3339()));
        }
        let response = self
            .client
            .get(format!("{}/journal", self.base_url))
            .bearer_auth(&self.access_token)
            .query(&query)
            .send()
            .await?;
        Self::read(response).await
    }

    async fn delete(&self, id: i64) -> Result<(), ComposerError> {
        let response = self
            .client
            .delete(format!("{}/journal/{id}", self.base_url))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }
}
