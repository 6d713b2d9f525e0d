//! Async driver for [`Composer`].
//!
//! Every [`Command`] that needs time or I/O is spawned onto a [`JoinSet`]
//! and races a [`CancellationToken`]; when the task finishes, its outcome
//! is fed back into the state machine as an [`Event`]. All state lives on
//! the session itself, so no locking is needed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backend::GenerationBackend;
use crate::config::ComposerConfig;
use crate::debounce::Ticket;
use crate::error::ComposerError;
use crate::journal::{JournalBridge, JournalRecord};
use crate::machine::{Command, Composer, Event, Notice};
use crate::optimizer::OptimizationId;
use crate::requests::RequestId;

pub struct ComposerSession<B: GenerationBackend> {
    composer: Composer,
    backend: Arc<B>,
    tasks: JoinSet<Option<Event>>,
    timer: Option<(Ticket, CancellationToken)>,
    optimization: Option<(OptimizationId, CancellationToken)>,
    fetches: HashMap<RequestId, CancellationToken>,
    notices: Vec<Notice>,
}

impl<B: GenerationBackend> ComposerSession<B> {
    pub fn new(config: &ComposerConfig, backend: Arc<B>) -> Self {
        Self {
            composer: Composer::new(config),
            backend,
            tasks: JoinSet::new(),
            timer: None,
            optimization: None,
            fetches: HashMap::new(),
            notices: Vec::new(),
        }
    }

    /// Read-only view of the state machine.
    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    // -- user actions -------------------------------------------------------

    pub fn edit_prompt(&mut self, text: impl Into<String>) -> Result<(), ComposerError> {
        self.dispatch(Event::PromptEdited(text.into()))
    }

    pub fn set_ai_mode(&mut self, enabled: bool) -> Result<(), ComposerError> {
        self.dispatch(Event::AiModeToggled(enabled))
    }

    pub fn set_consistency_mode(&mut self, enabled: bool) -> Result<(), ComposerError> {
        self.dispatch(Event::ConsistencyModeToggled(enabled))
    }

    /// Set or clear the caller's own upstream key. Blank keys count as none.
    pub fn set_api_key(&mut self, key: Option<String>) -> Result<(), ComposerError> {
        self.dispatch(Event::ApiKeyChanged(key))
    }

    pub fn accept(&mut self) -> Result<(), ComposerError> {
        self.dispatch(Event::SuggestionAccepted)
    }

    pub fn reject(&mut self) -> Result<(), ComposerError> {
        self.dispatch(Event::SuggestionRejected)
    }

    pub fn select(&mut self, index: usize) -> Result<(), ComposerError> {
        self.dispatch(Event::HistorySelected(index))
    }

    /// Drain the notices raised since the last call.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Persist the displayed generation to the journal.
    pub async fn save_active_to_journal<J>(
        &mut self,
        bridge: &J,
        title: impl Into<String>,
        dream_date: DateTime<Utc>,
    ) -> Result<JournalRecord, ComposerError>
    where
        J: JournalBridge + ?Sized,
    {
        let draft = self.composer.journal_draft(title, dream_date)?;
        match bridge.save(&draft).await {
            Ok(record) => {
                tracing::info!(journal_id = record.id, "Generation saved to journal");
                self.notices.push(Notice::JournalSaved { id: record.id });
                Ok(record)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Journal save failed");
                self.notices.push(Notice::JournalFailed(e.user_message()));
                Err(e)
            }
        }
    }

    // -- driving ------------------------------------------------------------

    /// Wait for the next background task and apply its outcome.
    ///
    /// Returns `false` once nothing is running.
    pub async fn next(&mut self) -> bool {
        match self.tasks.join_next().await {
            None => false,
            Some(Ok(Some(event))) => {
                self.forget_token(&event);
                if let Err(e) = self.dispatch(event) {
                    tracing::warn!(error = %e, "Background event rejected");
                }
                true
            }
            // Cancelled before completion.
            Some(Ok(None)) => true,
            Some(Err(e)) => {
                tracing::error!(error = %e, "Composer task panicked");
                true
            }
        }
    }

    /// Run until every timer and request has finished.
    pub async fn settle(&mut self) {
        while self.next().await {}
    }

    fn dispatch(&mut self, event: Event) -> Result<(), ComposerError> {
        let commands = self.composer.handle(event)?;
        for command in commands {
            self.run(command);
        }
        Ok(())
    }

    fn run(&mut self, command: Command) {
        match command {
            Command::StartTimer { ticket, after } => {
                let token = self.replace_timer(ticket);
                self.tasks.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => None,
                        _ = tokio::time::sleep(after) => Some(Event::DebounceElapsed(ticket)),
                    }
                });
            }
            Command::CancelTimer => {
                if let Some((_, token)) = self.timer.take() {
                    token.cancel();
                }
            }
            Command::Optimize { id, prompt } => {
                let token = CancellationToken::new();
                if let Some((_, previous)) = self.optimization.replace((id, token.clone())) {
                    previous.cancel();
                }
                let backend = Arc::clone(&self.backend);
                self.tasks.spawn(async move {
                    tokio::select! {
                        _ = token.cancelled() => None,
                        result = backend.optimize_prompt(&prompt) => Some(match result {
                            Ok(optimized) => Event::OptimizationSucceeded { id, optimized },
                            Err(e) => {
                                tracing::warn!(error = %e, "Prompt optimization failed");
                                Event::OptimizationFailed { id, error: e.user_message() }
                            }
                        }),
                    }
                });
            }
            Command::CancelOptimization(id) => {
                if matches!(&self.optimization, Some((current, _)) if *current == id) {
                    if let Some((_, token)) = self.optimization.take() {
                        token.cancel();
                    }
                }
            }
            Command::Fetch { id, request } => {
                let token = CancellationToken::new();
                self.fetches.insert(id, token.clone());
                let backend = Arc::clone(&self.backend);
                self.tasks.spawn(async move {
                    let wire = request.to_wire();
                    tokio::select! {
                        _ = token.cancelled() => None,
                        result = backend.generate_image(&wire) => Some(match result {
                            Ok(image) => Event::FetchSucceeded { id, key: request.key, image },
                            Err(error) => Event::FetchFailed { id, key: request.key, error },
                        }),
                    }
                });
            }
            Command::CancelFetch(id) => {
                if let Some(token) = self.fetches.remove(&id) {
                    token.cancel();
                }
            }
            Command::Notify(notice) => self.notices.push(notice),
        }
    }

    fn replace_timer(&mut self, ticket: Ticket) -> CancellationToken {
        let token = CancellationToken::new();
        if let Some((_, previous)) = self.timer.replace((ticket, token.clone())) {
            previous.cancel();
        }
        token
    }

    fn forget_token(&mut self, event: &Event) {
        match event {
            Event::FetchSucceeded { id, .. } | Event::FetchFailed { id, .. } => {
                self.fetches.remove(id);
            }
            Event::OptimizationSucceeded { id, .. } | Event::OptimizationFailed { id, .. } => {
                if matches!(&self.optimization, Some((current, _)) if current == id) {
                    self.optimization = None;
                }
            }
            // A timer that already fired for an older ticket must not drop
            // the token of the one that replaced it.
            Event::DebounceElapsed(ticket) => {
                if matches!(&self.timer, Some((current, _)) if current == ticket) {
                    self.timer = None;
                }
            }
            _ => {}
        }
    }
}
