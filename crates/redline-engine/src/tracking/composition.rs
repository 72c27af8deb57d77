//! IME composition guard.
//!
//! While an input method is composing, every keystroke replaces the
//! provisional text. Tracking each of those replacements would litter the
//! document with deletion runs for text the user never committed, so the
//! editor skips interception until the composition ends and then marks the
//! composed range once.

use std::ops::Range;

use crate::editing::{Bias, Mapping};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CompositionState {
    #[default]
    Normal,
    Start,
    Continuing,
    Finished,
}

/// Per-editor composition state plus the range composed so far
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionGuard {
    state: CompositionState,
    composed: Option<Range<usize>>,
}

impl CompositionGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CompositionState {
        self.state
    }

    /// True while changes must not be intercepted
    pub fn is_composing(&self) -> bool {
        matches!(
            self.state,
            CompositionState::Start | CompositionState::Continuing
        )
    }

    /// Range covered by composed text, in current document coordinates
    pub fn composed_range(&self) -> Option<Range<usize>> {
        self.composed.clone()
    }

    pub fn on_composition_start(&mut self, at: usize) {
        self.state = CompositionState::Start;
        self.composed = Some(at..at);
    }

    pub fn on_composition_update(&mut self) {
        if self.is_composing() {
            self.state = CompositionState::Continuing;
        }
    }

    /// Widen the composed range across a change applied during composition
    pub fn absorb(&mut self, mapping: &Mapping) {
        if let Some(range) = &self.composed {
            let start = mapping.map(range.start, Bias::Left);
            let end = mapping.map(range.end, Bias::Right).max(start);
            self.composed = Some(start..end);
        }
    }

    /// Finish the composition and hand back the composed range, if any text was composed
    pub fn on_composition_end(&mut self) -> Option<Range<usize>> {
        if !self.is_composing() {
            return None;
        }
        self.state = CompositionState::Finished;
        self.composed.take().filter(|range| !range.is_empty())
    }

    pub fn on_selection_change(&mut self) {
        self.state = CompositionState::Normal;
        self.composed = None;
    }
}
