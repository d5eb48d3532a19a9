//! In-memory collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};

use super::{AuthBackend, AuthSession, EntryStore, Identity, SignUpOutcome};
use crate::diary_entry::{DiaryEntry, EntryPatch, NewEntry};
use crate::error::{BackendError, BackendResult};

#[derive(Default)]
pub(crate) struct MemoryStore {
    rows: Mutex<Vec<DiaryEntry>>,
    failure: Mutex<Option<String>>,
    next_id: AtomicUsize,
    pub(crate) list_calls: AtomicUsize,
}

impl MemoryStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Makes every call fail with `message` until cleared.
    pub(crate) fn fail_with(&self, message: Option<&str>) {
        *self.failure.lock().unwrap() = message.map(str::to_string);
    }

    pub(crate) fn rows(&self) -> Vec<DiaryEntry> {
        self.rows.lock().unwrap().clone()
    }

    pub(crate) fn seed(&self, user_id: &str, content: &str, created_at: DateTime<Utc>) -> DiaryEntry {
        let entry = DiaryEntry {
            id: format!("entry-{}", self.next_id.fetch_add(1, Ordering::SeqCst)),
            user_id: user_id.to_string(),
            content: content.to_string(),
            created_at,
        };
        self.rows.lock().unwrap().push(entry.clone());
        entry
    }

    fn check(&self) -> BackendResult<()> {
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(BackendError::Api(message)),
            None => Ok(()),
        }
    }
}

pub(crate) fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 20, 12, 0, 0).unwrap()
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn list(&self, owner: &str) -> BackendResult<Vec<DiaryEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        let mut entries: Vec<DiaryEntry> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|entry| entry.user_id == owner)
            .cloned()
            .collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    async fn insert(&self, entry: &NewEntry) -> BackendResult<DiaryEntry> {
        self.check()?;
        let n = self.next_id.load(Ordering::SeqCst);
        let created_at = base_time() + Duration::minutes(i64::try_from(n).unwrap_or(0));
        Ok(self.seed(&entry.user_id, &entry.content, created_at))
    }

    async fn update(&self, id: &str, patch: &EntryPatch) -> BackendResult<()> {
        self.check()?;
        if let Some(row) = self.rows.lock().unwrap().iter_mut().find(|e| e.id == id) {
            row.content = patch.content.clone();
        }
        Ok(())
    }

    async fn delete(&self, id: &str) -> BackendResult<()> {
        self.check()?;
        self.rows.lock().unwrap().retain(|e| e.id != id);
        Ok(())
    }
}

pub(crate) fn session_for(user_id: &str) -> AuthSession {
    AuthSession {
        access_token: format!("token-{user_id}"),
        refresh_token: "refresh".to_string(),
        expires_at: i64::MAX,
        user: Identity {
            id: user_id.to_string(),
            email: Some(format!("{user_id}@example.com")),
        },
    }
}

#[derive(Default)]
pub(crate) struct FakeAuth {
    pub(crate) stored: Mutex<Option<AuthSession>>,
    pub(crate) restore_error: Mutex<Option<String>>,
    pub(crate) sign_out_calls: AtomicUsize,
}

#[async_trait]
impl AuthBackend for FakeAuth {
    async fn restore_session(&self) -> BackendResult<Option<AuthSession>> {
        if let Some(message) = self.restore_error.lock().unwrap().clone() {
            return Err(BackendError::Api(message));
        }
        Ok(self.stored.lock().unwrap().clone())
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        if password != "secret" {
            return Err(BackendError::Api("Invalid login credentials (400)".to_string()));
        }
        let session = session_for(email.split('@').next().unwrap_or(email));
        *self.stored.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome> {
        if email.ends_with("@confirm.test") {
            return Ok(SignUpOutcome::ConfirmationRequired);
        }
        self.sign_in(email, password).await.map(SignUpOutcome::SignedIn)
    }

    async fn sign_out(&self, _session: &AuthSession) -> BackendResult<()> {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
        *self.stored.lock().unwrap() = None;
        Ok(())
    }
}
