//! Entry feed state: the cached, newest-first list of the user's entries plus
//! the edit and delete flows over it.
//!
//! Every remote call is split into a `begin_*` half that decides whether a
//! request goes out and an `apply_*` half that folds the response back in.
//! The async helpers at the bottom chain the two for callers that can await.

use crate::diary_entry::{normalize_content, DiaryEntry, EntryId, EntryPatch};
use crate::error::BackendResult;
use crate::text_input::TextInput;

pub const EMPTY_FEED_MESSAGE: &str = "No entries yet. Start writing your first diary entry!";
pub const DELETE_PROMPT: &str = "Are you sure you want to delete this entry?";

/// Opaque value whose change means "reload the feed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshToken(u64);

impl RefreshToken {
    pub fn bumped(self) -> Self {
        RefreshToken(self.0.wrapping_add(1))
    }
}

impl From<u64> for RefreshToken {
    fn from(value: u64) -> Self {
        RefreshToken(value)
    }
}

/// Sequence number of an issued load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone)]
pub struct EditState {
    pub id: EntryId,
    pub buffer: TextInput,
}

#[derive(Debug, Default)]
pub struct DiaryState {
    entries: Vec<DiaryEntry>,
    loading: bool,
    editing: Option<EditState>,
    pending_delete: Option<EntryId>,
    notice: Option<String>,
    selected: usize,
    issued_loads: u64,
    applied_load: u64,
    observed_refresh: Option<RefreshToken>,
}

impl DiaryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_entries(&self) -> &[DiaryEntry] {
        &self.entries
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Last load/update/delete failure, cleared by the next success.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn editing(&self) -> Option<&EditState> {
        self.editing.as_ref()
    }

    pub fn editing_mut(&mut self) -> Option<&mut EditState> {
        self.editing.as_mut()
    }

    pub fn pending_delete(&self) -> Option<&str> {
        self.pending_delete.as_deref()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected_entry(&self) -> Option<&DiaryEntry> {
        self.entries.get(self.selected)
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.entries.len() {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Starts a reload if `token` differs from the last one seen.
    ///
    /// The first observation always loads, which covers the initial mount.
    pub fn observe_refresh(&mut self, token: RefreshToken) -> Option<LoadTicket> {
        if self.observed_refresh == Some(token) {
            return None;
        }
        self.observed_refresh = Some(token);
        Some(self.begin_load())
    }

    pub fn begin_load(&mut self) -> LoadTicket {
        self.issued_loads += 1;
        self.loading = true;
        LoadTicket(self.issued_loads)
    }

    /// Replaces the list with a load result, unless a newer one already landed.
    ///
    /// Returns whether the response was applied.
    pub fn apply_load(
        &mut self,
        ticket: LoadTicket,
        result: BackendResult<Vec<DiaryEntry>>,
    ) -> bool {
        if ticket.0 <= self.applied_load {
            tracing::debug!(ticket = ticket.0, applied = self.applied_load, "dropping stale load");
            return false;
        }
        self.applied_load = ticket.0;
        if ticket.0 == self.issued_loads {
            self.loading = false;
        }

        match result {
            Ok(entries) => {
                tracing::debug!(count = entries.len(), "feed reloaded");
                self.entries = entries;
                self.notice = None;
                self.clamp_selection();
            }
            Err(error) => {
                tracing::warn!("Failed to load diary entries: {}", error);
                self.notice = Some(format!("Couldn't load entries: {error}"));
            }
        }
        true
    }

    /// Enters edit mode for `id`, dropping any other edit in progress.
    pub fn start_edit(&mut self, id: &str) -> bool {
        let Some(entry) = self.entries.iter().find(|e| e.id == id) else {
            return false;
        };
        let mut buffer = TextInput::multiline();
        buffer.set_text(&entry.content);
        self.editing = Some(EditState {
            id: entry.id.clone(),
            buffer,
        });
        true
    }

    pub fn cancel_edit(&mut self) {
        self.editing = None;
    }

    /// Returns the update to send for `id`, or `None` if `id` isn't being
    /// edited or the trimmed buffer is empty (edit mode stays open).
    pub fn begin_save(&mut self, id: &str) -> Option<EntryPatch> {
        let edit = self.editing.as_ref().filter(|edit| edit.id == id)?;
        let content = normalize_content(edit.buffer.text())?;
        Some(EntryPatch { content })
    }

    pub fn apply_save(&mut self, id: &str, patch: EntryPatch, result: BackendResult<()>) {
        if let Err(error) = result {
            tracing::warn!(entry_id = id, "Failed to update diary entry: {}", error);
            self.notice = Some(format!("Couldn't save changes: {error}"));
            return;
        }

        if let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) {
            entry.content = patch.content;
        }
        if self.editing.as_ref().is_some_and(|edit| edit.id == id) {
            self.editing = None;
        }
        self.notice = None;
    }

    /// First step of a delete: remember which entry awaits confirmation.
    pub fn request_delete(&mut self, id: &str) -> bool {
        if !self.entries.iter().any(|e| e.id == id) {
            return false;
        }
        self.pending_delete = Some(id.to_string());
        true
    }

    pub fn decline_delete(&mut self) {
        self.pending_delete = None;
    }

    /// Confirms the pending delete, returning the id to send.
    pub fn confirm_delete(&mut self) -> Option<EntryId> {
        self.pending_delete.take()
    }

    pub fn apply_delete(&mut self, id: &str, result: BackendResult<()>) {
        if let Err(error) = result {
            tracing::warn!(entry_id = id, "Failed to delete diary entry: {}", error);
            self.notice = Some(format!("Couldn't delete entry: {error}"));
            return;
        }

        self.entries.retain(|e| e.id != id);
        if self.editing.as_ref().is_some_and(|edit| edit.id == id) {
            self.editing = None;
        }
        self.notice = None;
        self.clamp_selection();
    }

    /// Clears everything on sign-out so the next user starts from nothing.
    ///
    /// Load numbering carries on, and every load still in flight is treated
    /// as stale.
    pub fn reset(&mut self) {
        let issued = self.issued_loads;
        *self = Self::default();
        self.issued_loads = issued;
        self.applied_load = issued;
    }

    fn clamp_selection(&mut self) {
        self.selected = self.selected.min(self.entries.len().saturating_sub(1));
    }
}

/// Drives one begin/apply round trip against a store, for tests that
/// don't go through the runtime.
#[cfg(test)]
impl DiaryState {
    pub(crate) async fn load(&mut self, store: &dyn crate::backend::EntryStore, owner: &str) {
        let ticket = self.begin_load();
        let result = store.list(owner).await;
        self.apply_load(ticket, result);
    }

    pub(crate) async fn save_edit(&mut self, store: &dyn crate::backend::EntryStore, id: &str) {
        let Some(patch) = self.begin_save(id) else {
            return;
        };
        let result = store.update(id, &patch).await;
        self.apply_save(id, patch, result);
    }

    /// Sends the delete confirmed via [`DiaryState::confirm_delete`].
    pub(crate) async fn delete_confirmed(&mut self, store: &dyn crate::backend::EntryStore) {
        let Some(id) = self.confirm_delete() else {
            return;
        };
        let result = store.delete(&id).await;
        self.apply_delete(&id, result);
    }
}
