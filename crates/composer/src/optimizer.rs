//! Prompt-rewrite suggestions and the accept/reject decision.
//!
//! A rewrite is never applied on its own: it sits as a *pending*
//! suggestion until the user accepts or rejects it. Rejecting falls back
//! to the raw prompt.

use crate::error::ComposerError;

/// Identifies one optimization call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OptimizationId(u64);

/// The user's answer for the current prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Undecided,
    Accepted(String),
    Rejected,
}

/// Outcome of asking for an optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Begin {
    /// A network call must be issued.
    Started(OptimizationId),
    /// The prompt was optimized before; its suggestion was restored.
    Restored,
    /// A call for this prompt is already running.
    AlreadyRunning,
}

/// A successful rewrite and the prompt it was made from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Suggestion {
    source: String,
    text: String,
}

#[derive(Debug, Default)]
pub struct OptimizerState {
    /// Prompt the current suggestion/decision refers to.
    source: Option<String>,
    in_flight: Option<(OptimizationId, String)>,
    last_optimized: Option<Suggestion>,
    pending: Option<String>,
    decision: Decision,
    failed: bool,
    next_id: u64,
}

impl Default for Decision {
    fn default() -> Self {
        Decision::Undecided
    }
}

impl OptimizerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_optimizing(&self) -> bool {
        self.in_flight.is_some()
    }

    /// The suggestion waiting for accept/reject.
    pub fn pending(&self) -> Option<&str> {
        self.pending.as_deref()
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }

    /// The accepted rewrite, if any.
    pub fn accepted(&self) -> Option<&str> {
        match &self.decision {
            Decision::Accepted(text) => Some(text),
            _ => None,
        }
    }

    /// `true` once the user accepted or rejected for the current prompt.
    pub fn has_decided(&self) -> bool {
        self.decision != Decision::Undecided
    }

    /// `true` if the last call for the current prompt failed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Ask for an optimization of `prompt`.
    ///
    /// A prompt different from the current one invalidates the pending
    /// suggestion and the decision. A prompt identical to the last
    /// successfully optimized one is never sent again.
    pub fn begin(&mut self, prompt: &str) -> Begin {
        if self.source.as_deref() != Some(prompt) {
            self.source = Some(prompt.to_string());
            self.pending = None;
            self.decision = Decision::Undecided;
            self.failed = false;
        }

        if matches!(&self.in_flight, Some((_, p)) if p == prompt) {
            return Begin::AlreadyRunning;
        }

        if let Some(last) = self.last_optimized.as_ref().filter(|s| s.source == prompt) {
            if self.decision == Decision::Undecided {
                self.pending = Some(last.text.clone());
            }
            return Begin::Restored;
        }

        let id = OptimizationId(self.next_id);
        self.next_id += 1;
        self.in_flight = Some((id, prompt.to_string()));
        self.failed = false;
        Begin::Started(id)
    }

    /// Abandon the running call, if any. Returns its id so the transport
    /// can be cancelled.
    pub fn cancel(&mut self) -> Option<OptimizationId> {
        self.in_flight.take().map(|(id, _)| id)
    }

    /// A call finished. Returns `false` for results of abandoned calls.
    pub fn resolve(&mut self, id: OptimizationId, text: String) -> bool {
        let Some(source) = self.take_in_flight(id) else {
            return false;
        };
        if self.source.as_deref() == Some(source.as_str())
            && self.decision == Decision::Undecided
        {
            self.pending = Some(text.clone());
        }
        self.last_optimized = Some(Suggestion { source, text });
        true
    }

    /// A call failed. Returns `false` for failures of abandoned calls.
    pub fn fail(&mut self, id: OptimizationId) -> bool {
        if self.take_in_flight(id).is_none() {
            return false;
        }
        self.failed = true;
        true
    }

    /// Commit the pending suggestion as the optimized prompt.
    pub fn accept(&mut self) -> Result<String, ComposerError> {
        let text = self.pending.take().ok_or(ComposerError::NoPendingDecision)?;
        self.decision = Decision::Accepted(text.clone());
        self.failed = false;
        Ok(text)
    }

    /// Discard the suggestion and continue with the raw prompt.
    ///
    /// Also allowed after a failed call, so a rewrite outage never blocks
    /// generation.
    pub fn reject(&mut self) -> Result<(), ComposerError> {
        let can_reject = self.pending.is_some()
            || (self.failed && self.decision == Decision::Undecided);
        if !can_reject {
            return Err(ComposerError::NoPendingDecision);
        }
        self.pending = None;
        self.decision = Decision::Rejected;
        self.failed = false;
        Ok(())
    }

    /// Forget the suggestion and the decision (AI-mode turned off or the
    /// prompt was cleared). The last successful rewrite stays cached.
    pub fn invalidate(&mut self) -> Option<OptimizationId> {
        self.source = None;
        self.pending = None;
        self.decision = Decision::Undecided;
        self.failed = false;
        self.cancel()
    }

    fn take_in_flight(&mut self, id: OptimizationId) -> Option<String> {
        match self.in_flight.take() {
            Some((current, source)) if current == id => Some(source),
            other => {
                self.in_flight = other;
                None
            }
        }
    }
}
