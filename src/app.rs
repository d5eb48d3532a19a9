//! Shell state and reducer.
//!
//! `App::update` takes one event (a key press or a finished backend call),
//! mutates state, and returns the effects the runtime should carry out. It
//! never performs I/O itself.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::auth_form::{AuthAttempt, AuthForm, Credentials};
use crate::backend::AuthSession;
use crate::composer::Composer;
use crate::diary_entry::{DiaryEntry, EntryId, EntryPatch, NewEntry};
use crate::diary_state::{DiaryState, LoadTicket, RefreshToken};
use crate::error::BackendResult;
use crate::session::SessionProvider;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Tick,
    SessionRestored(BackendResult<Option<AuthSession>>),
    AuthFinished(AuthAttempt),
    EntriesLoaded {
        ticket: LoadTicket,
        result: BackendResult<Vec<DiaryEntry>>,
    },
    EntryCreated {
        epoch: SessionEpoch,
        result: BackendResult<DiaryEntry>,
    },
    EntryUpdated {
        epoch: SessionEpoch,
        id: EntryId,
        patch: EntryPatch,
        result: BackendResult<()>,
    },
    EntryDeleted {
        epoch: SessionEpoch,
        id: EntryId,
        result: BackendResult<()>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    RestoreSession,
    Authenticate(Credentials),
    /// Bind the entry store to this session's credentials.
    OpenStore(AuthSession),
    SignOut(AuthSession),
    LoadEntries { ticket: LoadTicket, owner: String },
    CreateEntry {
        epoch: SessionEpoch,
        entry: NewEntry,
    },
    UpdateEntry {
        epoch: SessionEpoch,
        id: EntryId,
        patch: EntryPatch,
    },
    DeleteEntry {
        epoch: SessionEpoch,
        id: EntryId,
    },
    Quit,
}

/// Counts diary mounts. Entry mutations carry the epoch they were sent in,
/// and results from an earlier epoch belong to a session that is gone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionEpoch(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Composer,
    Feed,
}

/// What the shell is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Loading,
    SignIn,
    Diary,
}

#[derive(Debug)]
pub struct App {
    pub session: SessionProvider,
    pub auth_form: AuthForm,
    pub composer: Composer,
    pub feed: DiaryState,
    pub focus: Focus,
    refresh: RefreshToken,
    epoch: SessionEpoch,
    spinner_frame: usize,
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl App {
    pub fn new() -> Self {
        App {
            session: SessionProvider::new(),
            auth_form: AuthForm::new(),
            composer: Composer::new(),
            feed: DiaryState::new(),
            focus: Focus::Composer,
            refresh: RefreshToken::default(),
            epoch: SessionEpoch::default(),
            spinner_frame: 0,
        }
    }

    /// Effects to run once at startup.
    pub fn start(&self) -> Vec<Effect> {
        vec![Effect::RestoreSession]
    }

    pub fn screen(&self) -> Screen {
        if self.session.is_loading() {
            Screen::Loading
        } else if self.session.current_user().is_some() {
            Screen::Diary
        } else {
            Screen::SignIn
        }
    }

    pub fn refresh_token(&self) -> RefreshToken {
        self.refresh
    }

    pub fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    pub fn update(&mut self, event: AppEvent) -> Vec<Effect> {
        match event {
            AppEvent::Key(key) => self.handle_key(key),
            AppEvent::Tick => {
                self.spinner_frame = self.spinner_frame.wrapping_add(1);
                Vec::new()
            }
            AppEvent::SessionRestored(result) => {
                self.session.apply_restore(result);
                self.mount_diary()
            }
            AppEvent::AuthFinished(attempt) => match self.auth_form.finish_submit(attempt) {
                Some(session) => {
                    self.session.signed_in(session);
                    self.mount_diary()
                }
                None => Vec::new(),
            },
            AppEvent::EntriesLoaded { ticket, result } => {
                self.feed.apply_load(ticket, result);
                Vec::new()
            }
            AppEvent::EntryCreated { epoch, result } => {
                if !self.is_current(epoch) {
                    return Vec::new();
                }
                if self.composer.finish_submit(result) {
                    self.on_entry_created()
                } else {
                    Vec::new()
                }
            }
            AppEvent::EntryUpdated {
                epoch,
                id,
                patch,
                result,
            } => {
                if self.is_current(epoch) {
                    self.feed.apply_save(&id, patch, result);
                }
                Vec::new()
            }
            AppEvent::EntryDeleted { epoch, id, result } => {
                if self.is_current(epoch) {
                    self.feed.apply_delete(&id, result);
                }
                Vec::new()
            }
        }
    }

    fn is_current(&self, epoch: SessionEpoch) -> bool {
        epoch == self.epoch && self.session.current_user().is_some()
    }

    /// Composer success hand-off: a new refresh token makes the feed reload.
    fn on_entry_created(&mut self) -> Vec<Effect> {
        self.refresh = self.refresh.bumped();
        self.reload_if_refreshed()
    }

    fn reload_if_refreshed(&mut self) -> Vec<Effect> {
        let Some(owner) = self.session.current_user().map(|user| user.id.clone()) else {
            return Vec::new();
        };
        match self.feed.observe_refresh(self.refresh) {
            Some(ticket) => vec![Effect::LoadEntries { ticket, owner }],
            None => Vec::new(),
        }
    }

    fn mount_diary(&mut self) -> Vec<Effect> {
        let Some(session) = self.session.session().cloned() else {
            return Vec::new();
        };
        self.epoch = SessionEpoch(self.epoch.0 + 1);
        self.composer = Composer::new();
        self.feed.reset();
        self.focus = Focus::Composer;

        let mut effects = vec![Effect::OpenStore(session)];
        effects.extend(self.reload_if_refreshed());
        effects
    }

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('c') {
            return vec![Effect::Quit];
        }

        match self.screen() {
            Screen::Loading => Vec::new(),
            Screen::SignIn => self.handle_sign_in_key(key),
            Screen::Diary => self.handle_diary_key(key),
        }
    }

    fn handle_sign_in_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => vec![Effect::Quit],
            KeyCode::Tab | KeyCode::BackTab => {
                self.auth_form.toggle_focus();
                Vec::new()
            }
            KeyCode::Char('n') if ctrl => {
                self.auth_form.toggle_mode();
                Vec::new()
            }
            KeyCode::Enter => match self.auth_form.begin_submit() {
                Some(credentials) => vec![Effect::Authenticate(credentials)],
                None => Vec::new(),
            },
            _ => {
                self.auth_form.focused_input().handle_key(key);
                Vec::new()
            }
        }
    }

    fn handle_diary_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && key.code == KeyCode::Char('o') {
            return self.sign_out();
        }

        if self.feed.pending_delete().is_some() {
            return match key.code {
                KeyCode::Char('y' | 'Y') => match self.feed.confirm_delete() {
                    Some(id) => vec![Effect::DeleteEntry {
                        epoch: self.epoch,
                        id,
                    }],
                    None => Vec::new(),
                },
                KeyCode::Char('n' | 'N') | KeyCode::Esc => {
                    self.feed.decline_delete();
                    Vec::new()
                }
                _ => Vec::new(),
            };
        }

        if let Some(edit) = self.feed.editing_mut() {
            return match key.code {
                KeyCode::Char('s') if ctrl => {
                    let id = edit.id.clone();
                    match self.feed.begin_save(&id) {
                        Some(patch) => vec![Effect::UpdateEntry {
                            epoch: self.epoch,
                            id,
                            patch,
                        }],
                        None => Vec::new(),
                    }
                }
                KeyCode::Esc => {
                    self.feed.cancel_edit();
                    Vec::new()
                }
                _ => {
                    edit.buffer.handle_key(key);
                    Vec::new()
                }
            };
        }

        if matches!(key.code, KeyCode::Tab | KeyCode::BackTab) {
            self.focus = match self.focus {
                Focus::Composer => Focus::Feed,
                Focus::Feed => Focus::Composer,
            };
            return Vec::new();
        }

        match self.focus {
            Focus::Composer => self.handle_composer_key(key),
            Focus::Feed => self.handle_feed_key(key),
        }
    }

    fn handle_composer_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('s') {
            let Some(user) = self.session.current_user() else {
                return Vec::new();
            };
            return match self.composer.begin_submit(user) {
                Some(entry) => vec![Effect::CreateEntry {
                    epoch: self.epoch,
                    entry,
                }],
                None => Vec::new(),
            };
        }
        self.composer.input.handle_key(key);
        Vec::new()
    }

    fn handle_feed_key(&mut self, key: KeyEvent) -> Vec<Effect> {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.feed.select_previous(),
            KeyCode::Down | KeyCode::Char('j') => self.feed.select_next(),
            KeyCode::Char('e') | KeyCode::Enter => {
                if let Some(id) = self.feed.selected_entry().map(|e| e.id.clone()) {
                    self.feed.start_edit(&id);
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.feed.selected_entry().map(|e| e.id.clone()) {
                    self.feed.request_delete(&id);
                }
            }
            KeyCode::Char('r') => {
                if let Some(owner) = self.session.current_user().map(|u| u.id.clone()) {
                    let ticket = self.feed.begin_load();
                    return vec![Effect::LoadEntries { ticket, owner }];
                }
            }
            _ => {}
        }
        Vec::new()
    }

    fn sign_out(&mut self) -> Vec<Effect> {
        self.epoch = SessionEpoch(self.epoch.0 + 1);
        self.feed.reset();
        self.composer = Composer::new();
        self.auth_form = AuthForm::new();
        match self.session.sign_out() {
            Some(session) => vec![Effect::SignOut(session)],
            None => Vec::new(),
        }
    }
}
