//! Entry composer: the input box that posts new entries.

use crate::backend::Identity;
use crate::diary_entry::{normalize_content, DiaryEntry, NewEntry};
use crate::error::BackendResult;
use crate::text_input::TextInput;

pub const PLACEHOLDER: &str = "What's on your mind today?";

#[derive(Debug, Clone)]
pub struct Composer {
    pub input: TextInput,
    submitting: bool,
    error: Option<String>,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new()
    }
}

impl Composer {
    pub fn new() -> Self {
        Composer {
            input: TextInput::multiline(),
            submitting: false,
            error: None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.input.is_blank()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn char_count(&self) -> usize {
        self.input.char_count()
    }

    /// Starts a submission, returning the insert body to send.
    ///
    /// `None` when the input is blank or a submission is already in flight;
    /// nothing changes in that case.
    pub fn begin_submit(&mut self, identity: &Identity) -> Option<NewEntry> {
        if self.submitting {
            return None;
        }
        let content = normalize_content(self.input.text())?;
        self.submitting = true;
        self.error = None;
        Some(NewEntry {
            user_id: identity.id.clone(),
            content,
        })
    }

    /// Applies the insert result. Returns true when the entry was created,
    /// which is the caller's cue to signal the feed.
    pub fn finish_submit(&mut self, result: BackendResult<DiaryEntry>) -> bool {
        self.submitting = false;
        match result {
            Ok(entry) => {
                tracing::info!(entry_id = %entry.id, "created diary entry");
                self.input.clear();
                true
            }
            Err(error) => {
                tracing::warn!("Failed to create diary entry: {}", error);
                self.error = Some(error.to_string());
                false
            }
        }
    }
}

#[cfg(test)]
impl Composer {
    /// Posts the current input and calls `on_entry_created` on success.
    pub(crate) async fn submit(
        &mut self,
        store: &dyn crate::backend::EntryStore,
        identity: &Identity,
        on_entry_created: impl FnOnce(),
    ) {
        let Some(new_entry) = self.begin_submit(identity) else {
            return;
        };
        let result = store.insert(&new_entry).await;
        if self.finish_submit(result) {
            on_entry_created();
        }
    }
}
