//! Control - Where each racer's per-tick input comes from
//!
//! Player and opponents share one racer type; only their control source
//! differs. The race asks every source for a fresh [`ControlIntent`] each
//! tick and feeds it through the same motion model.

use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::race_sim::opponent::PolicyControl;

/// Per-tick control input, never stored beyond the tick that produced it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlIntent {
    pub forward: bool,
    pub boost: bool,
}

impl ControlIntent {
    pub const IDLE: Self = Self { forward: false, boost: false };
    pub const CRUISE: Self = Self { forward: true, boost: false };
    pub const BOOST: Self = Self { forward: true, boost: true };
}

/// Race state visible to a control source when it decides
#[derive(Debug, Clone, Copy)]
pub struct ControlContext {
    pub progress: f32,
    pub stamina: f32,
    pub dt: f32,
}

/// Latest intent reported by the human input collaborator
#[derive(Debug, Clone, Copy, Default)]
pub struct HumanControl {
    current: ControlIntent,
}

impl HumanControl {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, intent: ControlIntent) {
        self.current = intent;
    }

    pub fn current(&self) -> ControlIntent {
        self.current
    }

    /// Window lost focus: release everything
    pub fn focus_lost(&mut self) {
        self.current = ControlIntent::IDLE;
    }
}

/// Origin of a racer's intents
#[derive(Debug, Clone)]
pub enum ControlSource {
    Human(HumanControl),
    Policy(PolicyControl),
}

impl ControlSource {
    /// Produce this tick's intent
    pub fn next_intent(&mut self, ctx: &ControlContext, rng: &mut dyn RngCore) -> ControlIntent {
        match self {
            ControlSource::Human(human) => human.current(),
            ControlSource::Policy(policy) => policy.decide(ctx, rng),
        }
    }

    /// Clear per-race state ahead of a restart. Human input is whatever the
    /// keys currently say, so it survives.
    pub fn reset(&mut self) {
        match self {
            ControlSource::Human(_) => {}
            ControlSource::Policy(policy) => policy.reset(),
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, ControlSource::Human(_))
    }

    pub fn as_policy(&self) -> Option<&PolicyControl> {
        match self {
            ControlSource::Policy(policy) => Some(policy),
            ControlSource::Human(_) => None,
        }
    }
}
