//! Collaborator contracts for the hosted backend, plus the Supabase implementations.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::diary_entry::{DiaryEntry, EntryPatch, NewEntry};
use crate::error::BackendResult;

pub mod auth;
pub mod rest;
pub mod session_store;

#[cfg(test)]
pub(crate) mod fake;

pub use auth::SupabaseAuth;
pub use rest::SupabaseEntryStore;
pub use session_store::FileSessionStore;

const EXPIRY_SKEW_SECONDS: i64 = 60;

/// The signed-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: i64,
    pub user: Identity,
}

impl AuthSession {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= chrono::Utc::now().timestamp() + EXPIRY_SKEW_SECONDS
    }
}

impl fmt::Debug for AuthSession {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("user", &self.user)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    ConfirmationRequired,
}

/// Authentication collaborator.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Session remembered from a previous run, refreshed if it expired.
    async fn restore_session(&self) -> BackendResult<Option<AuthSession>>;
    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession>;
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome>;
    async fn sign_out(&self, session: &AuthSession) -> BackendResult<()>;
}

/// Storage collaborator over the single `diary_entries` collection.
///
/// Row ownership is enforced server side; implementations don't re-check it.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Entries owned by `owner`, newest first.
    async fn list(&self, owner: &str) -> BackendResult<Vec<DiaryEntry>>;
    async fn insert(&self, entry: &NewEntry) -> BackendResult<DiaryEntry>;
    async fn update(&self, id: &str, patch: &EntryPatch) -> BackendResult<()>;
    async fn delete(&self, id: &str) -> BackendResult<()>;
}

/// Builds a store bound to a signed-in session's credentials.
pub type StoreFactory = Arc<dyn Fn(&AuthSession) -> Arc<dyn EntryStore> + Send + Sync>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_debug_redacts_tokens() {
        let session = AuthSession {
            access_token: "secret-access-token".to_string(),
            refresh_token: "secret-refresh-token".to_string(),
            expires_at: 1_700_000_000,
            user: Identity {
                id: "user".to_string(),
                email: None,
            },
        };
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("secret-access-token"));
        assert!(!rendered.contains("secret-refresh-token"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(session.is_expired());
    }
}
