//! Session provider: who is signed in, and whether we know yet.

use crate::backend::{AuthSession, Identity};
use crate::error::BackendResult;

#[derive(Debug)]
pub struct SessionProvider {
    session: Option<AuthSession>,
    loading: bool,
}

impl Default for SessionProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionProvider {
    /// Starts in the loading state until the stored session is checked.
    pub fn new() -> Self {
        SessionProvider {
            session: None,
            loading: true,
        }
    }

    pub fn current_user(&self) -> Option<&Identity> {
        self.session.as_ref().map(|session| &session.user)
    }

    pub fn session(&self) -> Option<&AuthSession> {
        self.session.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Folds in the initial session lookup. A failed lookup means "no user".
    pub fn apply_restore(&mut self, result: BackendResult<Option<AuthSession>>) {
        self.loading = false;
        self.session = match result {
            Ok(session) => session,
            Err(error) => {
                tracing::warn!("Session lookup failed, continuing signed out: {}", error);
                None
            }
        };
        if let Some(user) = self.current_user() {
            tracing::info!(user_id = %user.id, "restored session");
        }
    }

    pub fn signed_in(&mut self, session: AuthSession) {
        tracing::info!(user_id = %session.user.id, "signed in");
        self.loading = false;
        self.session = Some(session);
    }

    /// Clears the identity right away and hands back the session so the
    /// caller can tell the auth service in the background.
    pub fn sign_out(&mut self) -> Option<AuthSession> {
        let session = self.session.take();
        if let Some(session) = &session {
            tracing::info!(user_id = %session.user.id, "signed out");
        }
        session
    }
}

#[cfg(test)]
impl SessionProvider {
    pub(crate) async fn initialize(&mut self, auth: &dyn crate::backend::AuthBackend) {
        let result = auth.restore_session().await;
        self.apply_restore(result);
    }

    /// Signs out locally, then remotely. A remote failure is only logged.
    pub(crate) async fn sign_out_with(&mut self, auth: &dyn crate::backend::AuthBackend) {
        if let Some(session) = self.sign_out() {
            if let Err(error) = auth.sign_out(&session).await {
                tracing::warn!("Remote sign-out failed: {}", error);
            }
        }
    }
}
