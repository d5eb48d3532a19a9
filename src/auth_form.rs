//! Sign-in / sign-up form shown while nobody is signed in.

use crate::backend::{AuthSession, SignUpOutcome};
use crate::error::BackendResult;
use crate::text_input::TextInput;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignIn,
    SignUp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthField {
    Email,
    Password,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub mode: AuthMode,
    pub email: String,
    pub password: String,
}

/// Result of an auth request, normalised across both modes.
#[derive(Debug)]
pub enum AuthAttempt {
    SignIn(BackendResult<AuthSession>),
    SignUp(BackendResult<SignUpOutcome>),
}

#[derive(Debug, Clone)]
pub struct AuthForm {
    pub email: TextInput,
    pub password: TextInput,
    pub mode: AuthMode,
    pub focus: AuthField,
    submitting: bool,
    error: Option<String>,
    info: Option<String>,
}

impl Default for AuthForm {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthForm {
    pub fn new() -> Self {
        AuthForm {
            email: TextInput::single_line(),
            password: TextInput::single_line(),
            mode: AuthMode::SignIn,
            focus: AuthField::Email,
            submitting: false,
            error: None,
            info: None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn info(&self) -> Option<&str> {
        self.info.as_deref()
    }

    pub fn focused_input(&mut self) -> &mut TextInput {
        match self.focus {
            AuthField::Email => &mut self.email,
            AuthField::Password => &mut self.password,
        }
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            AuthField::Email => AuthField::Password,
            AuthField::Password => AuthField::Email,
        };
    }

    pub fn toggle_mode(&mut self) {
        self.mode = match self.mode {
            AuthMode::SignIn => AuthMode::SignUp,
            AuthMode::SignUp => AuthMode::SignIn,
        };
        self.error = None;
        self.info = None;
    }

    pub fn begin_submit(&mut self) -> Option<Credentials> {
        if self.submitting {
            return None;
        }
        let email = self.email.text().trim();
        if email.is_empty() {
            self.error = Some("Email is required".to_string());
            return None;
        }
        if self.password.is_blank() {
            self.error = Some("Password is required".to_string());
            return None;
        }
        self.submitting = true;
        self.error = None;
        self.info = None;
        Some(Credentials {
            mode: self.mode,
            email: email.to_string(),
            password: self.password.text().to_string(),
        })
    }

    /// Applies an auth response; yields the session when one was opened.
    pub fn finish_submit(&mut self, attempt: AuthAttempt) -> Option<AuthSession> {
        self.submitting = false;
        let outcome = match attempt {
            AuthAttempt::SignIn(result) => result.map(SignUpOutcome::SignedIn),
            AuthAttempt::SignUp(result) => result,
        };
        match outcome {
            Ok(SignUpOutcome::SignedIn(session)) => {
                self.password.clear();
                Some(session)
            }
            Ok(SignUpOutcome::ConfirmationRequired) => {
                self.password.clear();
                self.mode = AuthMode::SignIn;
                self.info = Some("Check your email to confirm the account, then sign in.".to_string());
                None
            }
            Err(error) => {
                tracing::warn!("Authentication failed: {}", error);
                self.error = Some(error.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::fake::session_for;
    use crate::error::BackendError;
    use pretty_assertions::assert_eq;

    fn filled(email: &str, password: &str) -> AuthForm {
        let mut form = AuthForm::new();
        form.email.set_text(email);
        form.password.set_text(password);
        form
    }

    #[test]
    fn blank_fields_never_submit() {
        let mut form = filled("  ", "pw");
        assert_eq!(form.begin_submit(), None);
        assert_eq!(form.error(), Some("Email is required"));

        let mut form = filled("me@example.com", "");
        assert_eq!(form.begin_submit(), None);
        assert_eq!(form.error(), Some("Password is required"));
    }

    #[test]
    fn success_clears_password_only() {
        let mut form = filled(" me@example.com ", "secret");
        let credentials = form.begin_submit().unwrap();
        assert_eq!(credentials.email, "me@example.com");
        assert!(form.is_submitting());

        let session = form.finish_submit(AuthAttempt::SignIn(Ok(session_for("me"))));
        assert!(session.is_some());
        assert_eq!(form.password.text(), "");
        assert_eq!(form.email.text(), " me@example.com ");
    }

    #[test]
    fn failure_message_is_shown_verbatim() {
        let mut form = filled("me@example.com", "wrong");
        form.begin_submit();
        let session = form.finish_submit(AuthAttempt::SignIn(Err(BackendError::Api(
            "Invalid login credentials (400)".to_string(),
        ))));
        assert!(session.is_none());
        assert_eq!(form.error(), Some("Invalid login credentials (400)"));
        assert_eq!(form.password.text(), "wrong");
    }

    #[test]
    fn sign_up_confirmation_switches_back_to_sign_in() {
        let mut form = filled("me@example.com", "secret");
        form.toggle_mode();
        assert_eq!(form.begin_submit().unwrap().mode, AuthMode::SignUp);

        let session =
            form.finish_submit(AuthAttempt::SignUp(Ok(SignUpOutcome::ConfirmationRequired)));
        assert!(session.is_none());
        assert_eq!(form.mode, AuthMode::SignIn);
        assert!(form.info().is_some());
    }
}
