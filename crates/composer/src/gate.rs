//! The "may we call the image endpoint now" predicate.
//!
//! [`evaluate`] is pure and cheap; the composer re-runs it after every
//! event instead of caching the result.

use dreamer_core::prompt::is_blank;

use crate::requests::RequestKey;

/// The flag bundle whose conjunction gates the image fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerationFlags {
    pub ai_mode_enabled: bool,
    pub is_optimizing: bool,
    /// The user may generate: AI-mode is off, or a suggestion was accepted
    /// or rejected. Always `false` while optimizing.
    pub should_generate: bool,
    /// The debounced prompt has settled.
    pub should_start_generating: bool,
}

/// Everything the gate looks at.
#[derive(Debug, Clone, Copy)]
pub struct GateInputs<'a> {
    pub flags: GenerationFlags,
    pub effective_prompt: &'a str,
    pub consistency_mode: bool,
}

/// Gate verdict, in rule priority order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Gate {
    /// Empty effective prompt: reset every downstream flag.
    Reset,
    /// AI-mode is on and the user has not accepted or rejected yet.
    AwaitDecision,
    /// An optimization call is in flight.
    AwaitOptimization,
    /// The prompt is still inside its quiet period.
    AwaitSettle,
    /// A fetch for this key is allowed, subject to de-duplication.
    Open(RequestKey),
}

impl Gate {
    pub fn fetch_allowed(&self) -> bool {
        matches!(self, Gate::Open(_))
    }
}

pub fn evaluate(inputs: &GateInputs<'_>) -> Gate {
    let flags = inputs.flags;
    if is_blank(inputs.effective_prompt) {
        return Gate::Reset;
    }
    if flags.ai_mode_enabled && !flags.should_generate {
        return Gate::AwaitDecision;
    }
    if flags.is_optimizing {
        return Gate::AwaitOptimization;
    }
    if !flags.should_start_generating {
        return Gate::AwaitSettle;
    }
    Gate::Open(RequestKey::new(
        inputs.effective_prompt,
        inputs.consistency_mode,
    ))
}
