//! The composer state machine.
//!
//! [`Composer::handle`] consumes one [`Event`] and returns the
//! [`Command`]s the driver must execute. It never blocks and never
//! performs I/O, so every transition can be tested synchronously.
//!
//! After each event the generation gate is re-evaluated from scratch and
//! the resulting verdict is mapped onto a [`Phase`].

use chrono::{DateTime, Utc};
use dreamer_core::generation::{GenerateImageRequest, ImageResult};
use dreamer_core::prompt::is_blank;

use crate::config::ComposerConfig;
use crate::debounce::{Debounced, Debouncer, Ticket};
use crate::error::ComposerError;
use crate::gate::{evaluate, Gate, GateInputs, GenerationFlags};
use crate::history::{GenerationHistory, GenerationRecord};
use crate::journal::JournalDraft;
use crate::optimizer::{Begin, OptimizationId, OptimizerState};
use crate::requests::{InFlightRequests, RequestId, RequestKey, RequestStatus};

// ---------------------------------------------------------------------------
// Events, commands, notices
// ---------------------------------------------------------------------------

/// Where the pipeline currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Debouncing,
    Optimizing,
    AwaitingDecision,
    Ready,
    Fetching,
    Error,
}

/// Inputs to the state machine: user actions and I/O completions.
#[derive(Debug)]
pub enum Event {
    PromptEdited(String),
    DebounceElapsed(Ticket),
    AiModeToggled(bool),
    ConsistencyModeToggled(bool),
    ApiKeyChanged(Option<String>),
    OptimizationSucceeded {
        id: OptimizationId,
        optimized: String,
    },
    OptimizationFailed {
        id: OptimizationId,
        error: String,
    },
    SuggestionAccepted,
    SuggestionRejected,
    FetchSucceeded {
        id: RequestId,
        key: RequestKey,
        image: ImageResult,
    },
    FetchFailed {
        id: RequestId,
        key: RequestKey,
        error: ComposerError,
    },
    HistorySelected(usize),
}

/// Side effects requested by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    StartTimer { ticket: Ticket, after: std::time::Duration },
    CancelTimer,
    Optimize { id: OptimizationId, prompt: String },
    CancelOptimization(OptimizationId),
    Fetch { id: RequestId, request: ImageRequest },
    CancelFetch(RequestId),
    Notify(Notice),
}

/// Non-fatal, user-facing messages (toasts).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    OptimizationFailed(String),
    GenerationFailed(String),
    RateLimited(String),
    JournalSaved { id: i64 },
    JournalFailed(String),
}

/// One image request as the driver should send it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub key: RequestKey,
    pub api_key_override: Option<String>,
}

impl ImageRequest {
    /// The proxy body. Optimization already happened client-side, so the
    /// server is never asked to rewrite again.
    pub fn to_wire(&self) -> GenerateImageRequest {
        GenerateImageRequest {
            prompt: self.key.prompt.clone(),
            user_api_key: self.api_key_override.clone(),
            iterative_mode: self.key.consistency_mode,
            use_optimized_prompt: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

pub struct Composer {
    prompt: String,
    debouncer: Debouncer,
    ai_mode: bool,
    consistency_mode: bool,
    api_key_override: Option<String>,
    optimizer: OptimizerState,
    requests: InFlightRequests,
    history: GenerationHistory,
    phase: Phase,
    last_error: Option<String>,
}

impl Composer {
    pub fn new(config: &ComposerConfig) -> Self {
        Self {
            prompt: String::new(),
            debouncer: Debouncer::new(config.quiet_period),
            ai_mode: false,
            consistency_mode: false,
            api_key_override: None,
            optimizer: OptimizerState::new(),
            requests: InFlightRequests::new(),
            history: GenerationHistory::new(),
            phase: Phase::Idle,
            last_error: None,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Raw text as last typed.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn debounced_prompt(&self) -> &str {
        self.debouncer.settled()
    }

    /// The prompt a fetch would use right now.
    pub fn effective_prompt(&self) -> &str {
        match self.optimizer.accepted() {
            Some(accepted) if self.ai_mode => accepted,
            _ => self.debouncer.settled(),
        }
    }

    pub fn pending_suggestion(&self) -> Option<&str> {
        self.optimizer.pending()
    }

    pub fn ai_mode(&self) -> bool {
        self.ai_mode
    }

    pub fn consistency_mode(&self) -> bool {
        self.consistency_mode
    }

    pub fn history(&self) -> &GenerationHistory {
        &self.history
    }

    /// Message of the most recent failure, cleared by the next success.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn flags(&self) -> GenerationFlags {
        let is_optimizing = self.optimizer.is_optimizing();
        GenerationFlags {
            ai_mode_enabled: self.ai_mode,
            is_optimizing,
            should_generate: !is_optimizing && (!self.ai_mode || self.optimizer.has_decided()),
            should_start_generating: !self.debouncer.is_pending(),
        }
    }

    pub fn gate(&self) -> Gate {
        evaluate(&GateInputs {
            flags: self.flags(),
            effective_prompt: self.effective_prompt(),
            consistency_mode: self.consistency_mode,
        })
    }

    /// Build a journal entry from the displayed generation.
    ///
    /// The content is the prompt that produced the image, and the image is
    /// the displayed payload unchanged.
    pub fn journal_draft(
        &self,
        title: impl Into<String>,
        dream_date: DateTime<Utc>,
    ) -> Result<JournalDraft, ComposerError> {
        let record = self.history.active().ok_or(ComposerError::NothingToSave)?;
        Ok(JournalDraft::new(
            title,
            record.prompt.clone(),
            dream_date,
            Some(record.image.b64_json.clone()),
        ))
    }

    pub fn handle(&mut self, event: Event) -> Result<Vec<Command>, ComposerError> {
        let commands = match event {
            Event::PromptEdited(text) => self.on_prompt_edited(text),
            Event::DebounceElapsed(ticket) => match self.debouncer.elapse(ticket) {
                Some(value) => self.on_settled(&value),
                None => Vec::new(),
            },
            Event::AiModeToggled(enabled) => self.on_ai_mode(enabled),
            Event::ConsistencyModeToggled(enabled) => {
                self.consistency_mode = enabled;
                self.reevaluate()
            }
            Event::ApiKeyChanged(key) => {
                self.api_key_override = key
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty());
                Vec::new()
            }
            Event::OptimizationSucceeded { id, optimized } => {
                if self.optimizer.resolve(id, optimized) {
                    self.reevaluate()
                } else {
                    tracing::debug!(?id, "Dropping result of abandoned optimization");
                    Vec::new()
                }
            }
            Event::OptimizationFailed { id, error } => {
                if self.optimizer.fail(id) {
                    self.last_error = Some(error.clone());
                    let mut commands = vec![Command::Notify(Notice::OptimizationFailed(error))];
                    commands.extend(self.reevaluate());
                    commands
                } else {
                    Vec::new()
                }
            }
            Event::SuggestionAccepted => {
                self.optimizer.accept()?;
                self.reevaluate()
            }
            Event::SuggestionRejected => {
                self.optimizer.reject()?;
                self.reevaluate()
            }
            Event::FetchSucceeded { id, key, image } => self.on_fetch_succeeded(id, key, image),
            Event::FetchFailed { id, key, error } => self.on_fetch_failed(id, key, error),
            Event::HistorySelected(index) => {
                self.history.select(index)?;
                Vec::new()
            }
        };
        Ok(commands)
    }

    fn on_prompt_edited(&mut self, text: String) -> Vec<Command> {
        let pushed = self.debouncer.push(&text);
        self.prompt = text;
        match pushed {
            Debounced::Scheduled { ticket, after } => {
                // A keystroke abandons everything that depended on the
                // previous text.
                let mut commands = self.cancel_optimization();
                commands.extend(self.supersede_fetches(None));
                commands.push(Command::StartTimer { ticket, after });
                commands.extend(self.reevaluate());
                commands
            }
            Debounced::Immediate(value) => {
                let mut commands = vec![Command::CancelTimer];
                commands.extend(self.on_settled(&value));
                commands
            }
            Debounced::Unchanged => Vec::new(),
        }
    }

    fn on_settled(&mut self, value: &str) -> Vec<Command> {
        let mut commands = Vec::new();
        if is_blank(value) {
            // An accepted rewrite must not outlive the prompt it came from.
            if let Some(id) = self.optimizer.invalidate() {
                commands.push(Command::CancelOptimization(id));
            }
        } else {
            self.requests.forget_failed();
            if self.ai_mode {
                commands.extend(self.begin_optimization(value));
            }
        }
        commands.extend(self.reevaluate());
        commands
    }

    fn on_ai_mode(&mut self, enabled: bool) -> Vec<Command> {
        if enabled == self.ai_mode {
            return Vec::new();
        }
        self.ai_mode = enabled;
        let mut commands = Vec::new();
        if enabled {
            let settled = self.debouncer.settled().to_string();
            if !is_blank(&settled) && !self.debouncer.is_pending() {
                commands.extend(self.begin_optimization(&settled));
            }
        } else if let Some(id) = self.optimizer.invalidate() {
            commands.push(Command::CancelOptimization(id));
        }
        commands.extend(self.reevaluate());
        commands
    }

    fn on_fetch_succeeded(
        &mut self,
        id: RequestId,
        key: RequestKey,
        image: ImageResult,
    ) -> Vec<Command> {
        if !self.requests.complete(id, &key) {
            tracing::debug!(prompt = %key.prompt, "Discarding stale image result");
            return Vec::new();
        }
        self.last_error = None;
        let appended = self.history.append(GenerationRecord {
            prompt: key.prompt,
            image,
        });
        if appended.is_none() {
            tracing::debug!("Image already in history, not appended");
        }
        self.reevaluate()
    }

    fn on_fetch_failed(
        &mut self,
        id: RequestId,
        key: RequestKey,
        error: ComposerError,
    ) -> Vec<Command> {
        if !self.requests.fail(id, &key) {
            tracing::debug!(prompt = %key.prompt, error = %error, "Discarding stale image error");
            return Vec::new();
        }
        let message = error.user_message();
        tracing::warn!(prompt = %key.prompt, error = %error, "Image generation failed");
        self.last_error = Some(message.clone());
        let notice = match error {
            ComposerError::RateLimited { .. } => Notice::RateLimited(message),
            _ => Notice::GenerationFailed(message),
        };
        let mut commands = vec![Command::Notify(notice)];
        commands.extend(self.reevaluate());
        commands
    }

    fn begin_optimization(&mut self, prompt: &str) -> Vec<Command> {
        match self.optimizer.begin(prompt) {
            Begin::Started(id) => vec![Command::Optimize {
                id,
                prompt: prompt.to_string(),
            }],
            Begin::Restored | Begin::AlreadyRunning => Vec::new(),
        }
    }

    fn cancel_optimization(&mut self) -> Vec<Command> {
        self.optimizer
            .cancel()
            .map(Command::CancelOptimization)
            .into_iter()
            .collect()
    }

    fn supersede_fetches(&mut self, keep: Option<&RequestKey>) -> Vec<Command> {
        self.requests
            .supersede_except(keep)
            .into_iter()
            .map(Command::CancelFetch)
            .collect()
    }

    /// Recompute the gate and move to the matching phase.
    fn reevaluate(&mut self) -> Vec<Command> {
        let gate = self.gate();
        let debouncing = self.debouncer.is_pending();

        match gate {
            Gate::Open(key) => {
                let mut commands = self.supersede_fetches(Some(&key));
                match self.requests.begin(&key) {
                    Some(id) => {
                        tracing::debug!(prompt = %key.prompt, consistency_mode = key.consistency_mode, "Fetching image");
                        self.last_error = None;
                        self.phase = Phase::Fetching;
                        commands.push(Command::Fetch {
                            id,
                            request: ImageRequest {
                                key,
                                api_key_override: self.api_key_override.clone(),
                            },
                        });
                    }
                    None => {
                        self.phase = match self.requests.status(&key) {
                            Some(RequestStatus::InFlight) => Phase::Fetching,
                            Some(RequestStatus::Failed) => Phase::Error,
                            _ => Phase::Ready,
                        };
                    }
                }
                commands
            }
            Gate::Reset => {
                let mut commands = Vec::new();
                if let Some(id) = self.optimizer.invalidate() {
                    commands.push(Command::CancelOptimization(id));
                }
                commands.extend(self.supersede_fetches(None));
                self.last_error = None;
                self.phase = if debouncing { Phase::Debouncing } else { Phase::Idle };
                commands
            }
            Gate::AwaitSettle => {
                self.phase = Phase::Debouncing;
                self.supersede_fetches(None)
            }
            Gate::AwaitOptimization | Gate::AwaitDecision => {
                self.phase = if debouncing {
                    Phase::Debouncing
                } else if self.optimizer.is_optimizing() {
                    Phase::Optimizing
                } else if self.optimizer.has_failed() {
                    Phase::Error
                } else {
                    Phase::AwaitingDecision
                };
                self.supersede_fetches(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;
    use chrono::TimeZone;
    use dreamer_core::generation::ImageTimings;

    use super::*;

    fn composer() -> Composer {
        Composer::new(&ComposerConfig::default())
    }

    fn image(b64: &str) -> ImageResult {
        ImageResult {
            b64_json: b64.into(),
            timings: ImageTimings { inference: 0.4 },
        }
    }

    /// Type `text` and let the quiet period elapse.
    fn settle(c: &mut Composer, text: &str) -> Vec<Command> {
        let commands = c.handle(Event::PromptEdited(text.into())).unwrap();
        let ticket = commands
            .iter()
            .find_map(|cmd| match cmd {
                Command::StartTimer { ticket, .. } => Some(*ticket),
                _ => None,
            })
            .expect("edit should start a timer");
        c.handle(Event::DebounceElapsed(ticket)).unwrap()
    }

    fn fetch_of(commands: &[Command]) -> (RequestId, ImageRequest) {
        commands
            .iter()
            .find_map(|cmd| match cmd {
                Command::Fetch { id, request } => Some((*id, request.clone())),
                _ => None,
            })
            .expect("expected a Fetch command")
    }

    fn optimize_of(commands: &[Command]) -> (OptimizationId, String) {
        commands
            .iter()
            .find_map(|cmd| match cmd {
                Command::Optimize { id, prompt } => Some((*id, prompt.clone())),
                _ => None,
            })
            .expect("expected an Optimize command")
    }

    fn count_fetches(commands: &[Command]) -> usize {
        commands
            .iter()
            .filter(|cmd| matches!(cmd, Command::Fetch { .. }))
            .count()
    }

    #[test]
    fn edit_starts_debounce_timer() {
        let mut c = composer();
        let commands = c.handle(Event::PromptEdited("a".into())).unwrap();
        assert_matches!(
            commands.as_slice(),
            [Command::StartTimer { after, .. }] if *after == Duration::from_millis(300)
        );
        assert_eq!(c.phase(), Phase::Debouncing);
        assert_eq!(c.debounced_prompt(), "");
    }

    #[test]
    fn raw_prompt_fetches_after_settle() {
        let mut c = composer();
        let commands = settle(&mut c, "a red fox in snow");
        let (id, request) = fetch_of(&commands);

        assert_eq!(c.phase(), Phase::Fetching);
        assert_eq!(request.key, RequestKey::new("a red fox in snow", false));
        assert_eq!(request.to_wire().prompt, "a red fox in snow");

        c.handle(Event::FetchSucceeded {
            id,
            key: request.key,
            image: image("Zm94"),
        })
        .unwrap();
        assert_eq!(c.phase(), Phase::Ready);
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.history().active_index(), Some(0));
    }

    #[test]
    fn clearing_prompt_resets_immediately() {
        let mut c = composer();
        let commands = settle(&mut c, "a cat");
        let (id, _) = fetch_of(&commands);

        let commands = c.handle(Event::PromptEdited(String::new())).unwrap();
        assert!(commands.contains(&Command::CancelTimer));
        assert!(commands.contains(&Command::CancelFetch(id)));
        assert_eq!(c.phase(), Phase::Idle);
        assert_eq!(c.debounced_prompt(), "");
    }

    #[test]
    fn keystroke_supersedes_running_fetch() {
        let mut c = composer();
        let commands = settle(&mut c, "a ca");
        let (id, request) = fetch_of(&commands);

        let commands = c.handle(Event::PromptEdited("a cat".into())).unwrap();
        assert!(commands.contains(&Command::CancelFetch(id)));

        // The stale result arrives anyway and is ignored.
        let commands = c
            .handle(Event::FetchSucceeded {
                id,
                key: request.key,
                image: image("c3RhbGU="),
            })
            .unwrap();
        assert!(commands.is_empty());
        assert!(c.history().is_empty());
    }

    #[test]
    fn identical_key_is_not_refetched() {
        let mut c = composer();
        let commands = settle(&mut c, "a cat");
        let (id, request) = fetch_of(&commands);
        c.handle(Event::FetchSucceeded {
            id,
            key: request.key,
            image: image("Y2F0"),
        })
        .unwrap();

        // Toggling a flag back and forth re-runs the gate.
        c.handle(Event::ConsistencyModeToggled(false)).unwrap();
        let commands = c.handle(Event::ApiKeyChanged(Some("k".into()))).unwrap();
        assert_eq!(count_fetches(&commands), 0);
        assert_eq!(c.history().len(), 1);
        assert_eq!(c.phase(), Phase::Ready);
    }

    #[test]
    fn consistency_toggle_is_a_new_key() {
        let mut c = composer();
        settle(&mut c, "a cat");
        let commands = c.handle(Event::ConsistencyModeToggled(true)).unwrap();
        let (_, request) = fetch_of(&commands);
        assert!(request.key.consistency_mode);
        assert!(request.to_wire().iterative_mode);
    }

    #[test]
    fn ai_mode_waits_for_decision() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let commands = settle(&mut c, "a cat");
        assert_eq!(count_fetches(&commands), 0);
        let (id, prompt) = optimize_of(&commands);
        assert_eq!(prompt, "a cat");
        assert_eq!(c.phase(), Phase::Optimizing);
        assert!(!c.gate().fetch_allowed());

        let commands = c
            .handle(Event::OptimizationSucceeded {
                id,
                optimized: "a fluffy orange cat sitting in sunlight".into(),
            })
            .unwrap();
        assert_eq!(count_fetches(&commands), 0);
        assert_eq!(c.phase(), Phase::AwaitingDecision);
        assert_eq!(
            c.pending_suggestion(),
            Some("a fluffy orange cat sitting in sunlight")
        );
    }

    #[test]
    fn reject_generates_with_raw_prompt() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let (id, _) = optimize_of(&settle(&mut c, "a cat"));
        c.handle(Event::OptimizationSucceeded {
            id,
            optimized: "a fluffy orange cat sitting in sunlight".into(),
        })
        .unwrap();

        let commands = c.handle(Event::SuggestionRejected).unwrap();
        assert_eq!(count_fetches(&commands), 1);
        let (_, request) = fetch_of(&commands);
        assert_eq!(request.key.prompt, "a cat");
    }

    #[test]
    fn accept_generates_with_suggestion() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let (id, _) = optimize_of(&settle(&mut c, "a cat"));
        c.handle(Event::OptimizationSucceeded {
            id,
            optimized: "a fluffy cat".into(),
        })
        .unwrap();

        let commands = c.handle(Event::SuggestionAccepted).unwrap();
        let (_, request) = fetch_of(&commands);
        assert_eq!(request.key.prompt, "a fluffy cat");
        assert_eq!(c.effective_prompt(), "a fluffy cat");
    }

    #[test]
    fn accept_without_suggestion_is_an_error() {
        let mut c = composer();
        assert_matches!(
            c.handle(Event::SuggestionAccepted),
            Err(ComposerError::NoPendingDecision)
        );
    }

    #[test]
    fn optimization_failure_notifies_and_allows_reject() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let (id, _) = optimize_of(&settle(&mut c, "a cat"));

        let commands = c
            .handle(Event::OptimizationFailed {
                id,
                error: "Failed to optimize prompt".into(),
            })
            .unwrap();
        assert!(commands.contains(&Command::Notify(Notice::OptimizationFailed(
            "Failed to optimize prompt".into()
        ))));
        assert_eq!(c.phase(), Phase::Error);

        let commands = c.handle(Event::SuggestionRejected).unwrap();
        assert_eq!(fetch_of(&commands).1.key.prompt, "a cat");
    }

    #[test]
    fn disabling_ai_mode_falls_back_to_raw_prompt() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let (id, _) = optimize_of(&settle(&mut c, "a cat"));

        let commands = c.handle(Event::AiModeToggled(false)).unwrap();
        assert!(commands.contains(&Command::CancelOptimization(id)));
        assert_eq!(fetch_of(&commands).1.key.prompt, "a cat");
    }

    #[test]
    fn fetch_failure_keeps_history_and_notifies() {
        let mut c = composer();
        let (id, request) = fetch_of(&settle(&mut c, "a cat"));
        let commands = c
            .handle(Event::FetchFailed {
                id,
                key: request.key,
                error: ComposerError::RateLimited {
                    message: "No requests left".into(),
                    remaining: Some(0),
                },
            })
            .unwrap();

        assert!(commands.contains(&Command::Notify(Notice::RateLimited(
            "No requests left".into()
        ))));
        assert_eq!(c.phase(), Phase::Error);
        assert!(c.history().is_empty());
        assert_eq!(c.last_error(), Some("No requests left"));
    }

    #[test]
    fn failed_key_retried_after_reediting() {
        let mut c = composer();
        let (id, request) = fetch_of(&settle(&mut c, "a cat"));
        c.handle(Event::FetchFailed {
            id,
            key: request.key,
            error: ComposerError::Api {
                status: 500,
                body: "boom".into(),
            },
        })
        .unwrap();

        settle(&mut c, "a cat!");
        let commands = settle(&mut c, "a cat");
        assert_eq!(count_fetches(&commands), 1);
    }

    #[test]
    fn journal_draft_uses_active_record() {
        let mut c = composer();
        assert_matches!(
            c.journal_draft("t", Utc::now()),
            Err(ComposerError::NothingToSave)
        );

        let (id, request) = fetch_of(&settle(&mut c, "a cat"));
        c.handle(Event::FetchSucceeded {
            id,
            key: request.key,
            image: image("Y2F0"),
        })
        .unwrap();

        let draft = c
            .journal_draft("Flying dream", Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap())
            .unwrap();
        assert_eq!(draft.content, "a cat");
        assert_eq!(draft.generated_image_b64.as_deref(), Some("Y2F0"));
    }

    #[test]
    fn clearing_prompt_drops_accepted_rewrite() {
        let mut c = composer();
        c.handle(Event::AiModeToggled(true)).unwrap();
        let (id, _) = optimize_of(&settle(&mut c, "a cat"));
        c.handle(Event::OptimizationSucceeded {
            id,
            optimized: "a fluffy cat".into(),
        })
        .unwrap();
        c.handle(Event::SuggestionAccepted).unwrap();

        let commands = c.handle(Event::PromptEdited(String::new())).unwrap();
        assert_eq!(count_fetches(&commands), 0);
        assert_eq!(c.effective_prompt(), "");
        assert_eq!(c.phase(), Phase::Idle);
    }

    #[test]
    fn select_out_of_range_is_an_error() {
        let mut c = composer();
        assert_matches!(
            c.handle(Event::HistorySelected(0)),
            Err(ComposerError::IndexOutOfRange { index: 0, len: 0 })
        );
    }
}
