use std::fmt;
use tracing::debug;

/// Lifecycle of one segment. Transitions only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SegmentState {
    Pending,
    Translating,
    Synthesizing,
    Aligning,
    Done,
    Failed,
    Cancelled,
}

impl SegmentState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed | Self::Cancelled)
    }

    /// Whether `next` is reachable from `self` in one step.
    pub fn can_advance_to(self, next: SegmentState) -> bool {
        use SegmentState::*;
        match (self, next) {
            (Pending, Translating) | (Pending, Cancelled) => true,
            (Translating, Synthesizing) | (Synthesizing, Aligning) | (Aligning, Done) => true,
            (Translating | Synthesizing | Aligning, Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for SegmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pending => "pending",
            Self::Translating => "translating",
            Self::Synthesizing => "synthesizing",
            Self::Aligning => "aligning",
            Self::Done => "done",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Tracks one segment's current state and logs each transition.
#[derive(Debug)]
pub struct SegmentTracker {
    index: usize,
    state: SegmentState,
}

impl SegmentTracker {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            state: SegmentState::Pending,
        }
    }

    pub fn state(&self) -> SegmentState {
        self.state
    }

    pub fn advance(&mut self, next: SegmentState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "segment {} cannot move from {} to {}",
            self.index,
            self.state,
            next
        );
        debug!(segment = self.index, from = %self.state, to = %next, "Segment state change");
        self.state = next;
    }
}
