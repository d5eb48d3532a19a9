//! Supabase GoTrue client.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;

use super::{AuthBackend, AuthSession, FileSessionStore, Identity, SignUpOutcome};
use crate::config::Config;
use crate::error::{ensure_success, parse_api_error, BackendError, BackendResult};

#[derive(Debug, Clone)]
pub struct SupabaseAuth {
    auth_url: String,
    anon_key: String,
    client: Client,
    store: FileSessionStore,
}

impl SupabaseAuth {
    pub fn new(config: &Config, client: Client) -> Self {
        Self::with_store(
            config.auth_url(),
            config.supabase_anon_key.clone(),
            client,
            FileSessionStore::new(config.session_file()),
        )
    }

    pub fn with_store(
        auth_url: impl Into<String>,
        anon_key: impl Into<String>,
        client: Client,
        store: FileSessionStore,
    ) -> Self {
        Self {
            auth_url: auth_url.into(),
            anon_key: anon_key.into(),
            client,
            store,
        }
    }

    pub async fn refresh_session(&self, refresh_token: &str) -> BackendResult<AuthSession> {
        if refresh_token.trim().is_empty() {
            return Err(BackendError::InvalidConfiguration(
                "Refresh token must not be empty",
            ));
        }

        let payload = serde_json::json!({ "refresh_token": refresh_token });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "refresh_token")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        response.into_session()?.ok_or_else(|| {
            BackendError::Api("Refresh response did not include an active session".to_string())
        })
    }

    fn public_request(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", self.anon_key))
    }

    async fn send_auth_request(&self, request: RequestBuilder) -> BackendResult<GoTrueResponse> {
        let response = ensure_success(request.send().await?).await?;
        Ok(response.json::<GoTrueResponse>().await?)
    }
}

#[async_trait]
impl AuthBackend for SupabaseAuth {
    async fn restore_session(&self) -> BackendResult<Option<AuthSession>> {
        let Some(stored) = self.store.load_session()? else {
            return Ok(None);
        };

        if !stored.is_expired() {
            return Ok(Some(stored));
        }

        match self.refresh_session(&stored.refresh_token).await {
            Ok(refreshed) => {
                self.store.save_session(&refreshed)?;
                tracing::debug!(user_id = %refreshed.user.id, "refreshed stored session");
                Ok(Some(refreshed))
            }
            Err(error) => {
                tracing::warn!("Failed to refresh stored session: {}", error);
                self.store.clear_session()?;
                Ok(None)
            }
        }
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({ "email": email.trim(), "password": password });
        let request = self.public_request(
            self.client
                .post(format!("{}/token", self.auth_url))
                .query(&[("grant_type", "password")])
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        let session = response.into_session()?.ok_or_else(|| {
            BackendError::Api("Sign-in response did not include an active session".to_string())
        })?;

        self.store.save_session(&session)?;
        Ok(session)
    }

    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<SignUpOutcome> {
        validate_credentials(email, password)?;

        let payload = serde_json::json!({ "email": email.trim(), "password": password });
        let request = self.public_request(
            self.client
                .post(format!("{}/signup", self.auth_url))
                .json(&payload),
        );
        let response = self.send_auth_request(request).await?;
        match response.into_session()? {
            Some(session) => {
                self.store.save_session(&session)?;
                Ok(SignUpOutcome::SignedIn(session))
            }
            None => Ok(SignUpOutcome::ConfirmationRequired),
        }
    }

    async fn sign_out(&self, session: &AuthSession) -> BackendResult<()> {
        // The local copy goes first so a failed logout call can't resurrect it.
        self.store.clear_session()?;

        let response = self
            .client
            .post(format!("{}/logout", self.auth_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&session.access_token)
            .send()
            .await?;
        let status = response.status();
        if !(status.is_success() || status == StatusCode::UNAUTHORIZED) {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Api(parse_api_error(status, &body)));
        }
        Ok(())
    }
}

fn validate_credentials(email: &str, password: &str) -> BackendResult<()> {
    if email.trim().is_empty() {
        return Err(BackendError::Api("Email is required".to_string()));
    }
    if password.trim().is_empty() {
        return Err(BackendError::Api("Password is required".to_string()));
    }
    Ok(())
}

/// GoTrue returns the session either flat or nested under `session`.
#[derive(Debug, Deserialize)]
struct GoTrueResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
    session: Option<GoTrueSession>,
}

#[derive(Debug, Deserialize)]
struct GoTrueSession {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_at: Option<i64>,
    expires_in: Option<i64>,
    user: Option<GoTrueUser>,
}

#[derive(Debug, Deserialize)]
struct GoTrueUser {
    id: String,
    email: Option<String>,
}

impl From<GoTrueUser> for Identity {
    fn from(value: GoTrueUser) -> Self {
        Self {
            id: value.id,
            email: value.email,
        }
    }
}

impl GoTrueResponse {
    fn into_session(self) -> BackendResult<Option<AuthSession>> {
        let nested = self.session;
        let access_token = self
            .access_token
            .or_else(|| nested.as_ref().and_then(|s| s.access_token.clone()));
        let refresh_token = self
            .refresh_token
            .or_else(|| nested.as_ref().and_then(|s| s.refresh_token.clone()));
        let expires_at = self
            .expires_at
            .or_else(|| nested.as_ref().and_then(|s| s.expires_at))
            .or_else(|| {
                self.expires_in
                    .or_else(|| nested.as_ref().and_then(|s| s.expires_in))
                    .map(|expires_in| chrono::Utc::now().timestamp().saturating_add(expires_in))
            });
        let user = self
            .user
            .or_else(|| nested.and_then(|s| s.user))
            .map(Identity::from);

        match (access_token, refresh_token, expires_at, user) {
            (Some(access_token), Some(refresh_token), Some(expires_at), Some(user)) => {
                Ok(Some(AuthSession {
                    access_token,
                    refresh_token,
                    expires_at,
                    user,
                }))
            }
            (None, None, None, Some(_)) => Ok(None),
            _ => Err(BackendError::Api(
                "Auth response did not include enough session fields".to_string(),
            )),
        }
    }
}
