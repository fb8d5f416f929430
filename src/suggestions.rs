use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::api::{decode_records, ApiClient, ApiError};
use crate::error::StoreError;
use crate::models::{StatusChange, Suggestion, SuggestionDraft, SuggestionStatus};
use crate::store::{CollectionStore, Entity, RemoteCollection};

const SUGGESTIONS_PATH: &str = "/api/v1/suggestions";

pub type SuggestionStore = CollectionStore<SuggestionService>;

#[derive(Debug, Deserialize)]
struct SuggestionRecord {
    #[serde(rename = "_id")]
    id: String,
    name: String,
    email: String,
    department: String,
    subject: String,
    suggestion: String,
    #[serde(default)]
    status: Option<SuggestionStatus>,
    #[serde(rename = "createdAt")]
    created_at: String,
}

#[derive(Debug, Deserialize)]
struct SuggestionList {
    suggestions: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct SingleSuggestion {
    suggestion: SuggestionRecord,
}

impl TryFrom<SuggestionRecord> for Suggestion {
    type Error = ApiError;

    fn try_from(record: SuggestionRecord) -> Result<Self, Self::Error> {
        let date = DateTime::parse_from_rfc3339(&record.created_at)
            .map(|parsed| parsed.with_timezone(&Utc))
            .map_err(|err| ApiError::Decode(format!("invalid createdAt {:?}: {}", record.created_at, err)))?;

        Ok(Suggestion {
            id: record.id,
            name: record.name,
            email: record.email,
            department: record.department,
            subject: record.subject,
            message: record.suggestion,
            date,
            status: record.status.unwrap_or_default(),
        })
    }
}

#[derive(Clone)]
pub struct SuggestionService {
    api: ApiClient,
}

impl SuggestionService {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub async fn fetch(&self, id: &str) -> Result<Suggestion, ApiError> {
        let resp: SingleSuggestion = self.api.get(&format!("{}/{}", SUGGESTIONS_PATH, id)).await?;
        resp.suggestion.try_into()
    }
}

#[async_trait]
impl RemoteCollection for SuggestionService {
    type Entity = Suggestion;
    type Draft = SuggestionDraft;
    type Patch = StatusChange;

    async fn list(&self) -> Result<Vec<Suggestion>, ApiError> {
        let resp: SuggestionList = self.api.get(SUGGESTIONS_PATH).await?;
        Ok(decode_records::<SuggestionRecord, Suggestion>(Suggestion::CACHE_KEY, resp.suggestions))
    }

    async fn create(&self, draft: &SuggestionDraft) -> Result<Suggestion, ApiError> {
        let resp: SingleSuggestion = self.api.post(SUGGESTIONS_PATH, draft).await?;
        resp.suggestion.try_into()
    }

    async fn update(&self, id: &str, patch: &StatusChange) -> Result<Suggestion, ApiError> {
        let resp: SingleSuggestion = self
            .api
            .patch(&format!("{}/{}", SUGGESTIONS_PATH, id), patch)
            .await?;
        resp.suggestion.try_into()
    }

    async fn delete(&self, id: &str) -> Result<(), ApiError> {
        self.api.delete(&format!("{}/{}", SUGGESTIONS_PATH, id)).await
    }
}

impl<R> CollectionStore<R>
where
    R: RemoteCollection<Entity = Suggestion, Patch = StatusChange>,
{
    /// Status is the only thing that changes after a suggestion is submitted.
    pub async fn update_status(&self, id: &str, status: SuggestionStatus) -> Result<Suggestion, StoreError> {
        tracing::info!(id, status = %status, "Updating suggestion status");
        self.update(id, &StatusChange { status }).await
    }
}

/// No built-in suggestions: a failed first load leaves an empty queue with `error` set.
impl Entity for Suggestion {
    const CACHE_KEY: &'static str = "fsu_suggestions";

    fn id(&self) -> &str {
        &self.id
    }

    fn assign_local_id(&mut self, id: String) {
        self.id = id;
    }
}
