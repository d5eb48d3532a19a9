//! Event loop: feeds terminal input and finished backend calls into the
//! reducer, and turns the effects it returns into spawned tasks.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use crossterm::event::{Event, EventStream, KeyEventKind};
use futures::StreamExt;
use tokio::sync::mpsc;

use crate::app::{App, AppEvent, Effect};
use crate::auth_form::{AuthAttempt, AuthMode};
use crate::backend::{AuthBackend, EntryStore, StoreFactory};
use crate::error::BackendError;
use crate::ui::UI;

const TICK: Duration = Duration::from_millis(150);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Runtime {
    auth: Arc<dyn AuthBackend>,
    store_for: StoreFactory,
    store: Option<Arc<dyn EntryStore>>,
    tx: mpsc::UnboundedSender<AppEvent>,
    rx: mpsc::UnboundedReceiver<AppEvent>,
}

impl Runtime {
    pub fn new(auth: Arc<dyn AuthBackend>, store_for: StoreFactory) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            auth,
            store_for,
            store: None,
            tx,
            rx,
        }
    }

    pub async fn run(mut self, app: &mut App, ui: &mut UI) -> Result<()> {
        let mut input = EventStream::new();
        let mut ticker = tokio::time::interval(TICK);

        if self.execute(app.start()) == Flow::Quit {
            return Ok(());
        }

        loop {
            ui.display(app)?;

            let event = tokio::select! {
                maybe_event = input.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => AppEvent::Key(key),
                    Some(Ok(_)) => continue,
                    Some(Err(error)) => return Err(error.into()),
                    None => break,
                },
                Some(event) = self.rx.recv() => event,
                _ = ticker.tick() => AppEvent::Tick,
            };

            if self.execute(app.update(event)) == Flow::Quit {
                break;
            }
        }

        tracing::info!("exiting");
        Ok(())
    }

    /// Carries out effects in order. Backend calls are spawned and report
    /// back through the event channel.
    pub fn execute(&mut self, effects: Vec<Effect>) -> Flow {
        for effect in effects {
            match effect {
                Effect::Quit => return Flow::Quit,
                Effect::RestoreSession => {
                    let auth = Arc::clone(&self.auth);
                    self.spawn(async move { AppEvent::SessionRestored(auth.restore_session().await) });
                }
                Effect::Authenticate(credentials) => {
                    let auth = Arc::clone(&self.auth);
                    self.spawn(async move {
                        let attempt = match credentials.mode {
                            AuthMode::SignIn => AuthAttempt::SignIn(
                                auth.sign_in(&credentials.email, &credentials.password).await,
                            ),
                            AuthMode::SignUp => AuthAttempt::SignUp(
                                auth.sign_up(&credentials.email, &credentials.password).await,
                            ),
                        };
                        AppEvent::AuthFinished(attempt)
                    });
                }
                Effect::OpenStore(session) => {
                    self.store = Some((self.store_for)(&session));
                }
                Effect::SignOut(session) => {
                    self.store = None;
                    let auth = Arc::clone(&self.auth);
                    tokio::spawn(async move {
                        if let Err(error) = auth.sign_out(&session).await {
                            tracing::warn!("Remote sign-out failed: {}", error);
                        }
                    });
                }
                Effect::LoadEntries { ticket, owner } => {
                    let store = self.store.clone();
                    self.spawn(async move {
                        let result = match store {
                            Some(store) => store.list(&owner).await,
                            None => Err(not_signed_in()),
                        };
                        AppEvent::EntriesLoaded { ticket, result }
                    });
                }
                Effect::CreateEntry { epoch, entry } => {
                    let store = self.store.clone();
                    self.spawn(async move {
                        let result = match store {
                            Some(store) => store.insert(&entry).await,
                            None => Err(not_signed_in()),
                        };
                        AppEvent::EntryCreated { epoch, result }
                    });
                }
                Effect::UpdateEntry { epoch, id, patch } => {
                    let store = self.store.clone();
                    self.spawn(async move {
                        let result = match store {
                            Some(store) => store.update(&id, &patch).await,
                            None => Err(not_signed_in()),
                        };
                        AppEvent::EntryUpdated {
                            epoch,
                            id,
                            patch,
                            result,
                        }
                    });
                }
                Effect::DeleteEntry { epoch, id } => {
                    let store = self.store.clone();
                    self.spawn(async move {
                        let result = match store {
                            Some(store) => store.delete(&id).await,
                            None => Err(not_signed_in()),
                        };
                        AppEvent::EntryDeleted { epoch, id, result }
                    });
                }
            }
        }
        Flow::Continue
    }

    fn spawn<F>(&self, task: F)
    where
        F: std::future::Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            // The receiver only goes away when the loop has already exited.
            let _ = tx.send(task.await);
        });
    }

    #[cfg(test)]
    async fn next_event(&mut self) -> Option<AppEvent> {
        self.rx.recv().await
    }
}

fn not_signed_in() -> BackendError {
    BackendError::Api("Not signed in".to_string())
}
