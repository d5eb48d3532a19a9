//! PostgREST client for the `diary_entries` table.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use super::EntryStore;
use crate::config::Config;
use crate::diary_entry::{DiaryEntry, EntryPatch, NewEntry};
use crate::error::{ensure_success, BackendError, BackendResult};

const TABLE: &str = "diary_entries";

#[derive(Debug, Clone)]
pub struct SupabaseEntryStore {
    table_url: String,
    anon_key: String,
    access_token: String,
    client: Client,
}

impl SupabaseEntryStore {
    pub fn new(config: &Config, client: Client, access_token: impl Into<String>) -> Self {
        Self::with_rest_url(
            config.rest_url(),
            config.supabase_anon_key.clone(),
            client,
            access_token,
        )
    }

    pub fn with_rest_url(
        rest_url: impl AsRef<str>,
        anon_key: impl Into<String>,
        client: Client,
        access_token: impl Into<String>,
    ) -> Self {
        Self {
            table_url: format!("{}/{TABLE}", rest_url.as_ref().trim_end_matches('/')),
            anon_key: anon_key.into(),
            access_token: access_token.into(),
            client,
        }
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.access_token)
    }
}

#[async_trait]
impl EntryStore for SupabaseEntryStore {
    async fn list(&self, owner: &str) -> BackendResult<Vec<DiaryEntry>> {
        let owner_filter = format!("eq.{owner}");
        let request = self.authorized(self.client.get(&self.table_url).query(&[
            ("select", "*"),
            ("user_id", owner_filter.as_str()),
            ("order", "created_at.desc"),
        ]));
        let response = ensure_success(request.send().await?).await?;
        let entries = response.json::<Vec<DiaryEntry>>().await?;
        tracing::debug!(count = entries.len(), "listed diary entries");
        Ok(entries)
    }

    async fn insert(&self, entry: &NewEntry) -> BackendResult<DiaryEntry> {
        let request = self.authorized(
            self.client
                .post(&self.table_url)
                .header("Prefer", "return=representation")
                .json(entry),
        );
        let response = ensure_success(request.send().await?).await?;
        let mut rows = response.json::<Vec<DiaryEntry>>().await?;
        if rows.is_empty() {
            return Err(BackendError::Api(
                "Insert response did not include the new entry".to_string(),
            ));
        }
        Ok(rows.swap_remove(0))
    }

    async fn update(&self, id: &str, patch: &EntryPatch) -> BackendResult<()> {
        let id_filter = format!("eq.{id}");
        let request = self.authorized(
            self.client
                .patch(&self.table_url)
                .query(&[("id", id_filter.as_str())])
                .json(patch),
        );
        ensure_success(request.send().await?).await?;
        Ok(())
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        let id_filter = format!("eq.{id}");
        let request = self.authorized(
            self.client
                .delete(&self.table_url)
                .query(&[("id", id_filter.as_str())]),
        );
        ensure_success(request.send().await?).await?;
        Ok(())
    }
}
