use std::ops::Range;

use crate::editing::{
    mapping::{Bias, Mapping},
    step::Step,
};

/// Flags a host attaches to a change before dispatching it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeMeta {
    /// Produced by the tracking engine itself; never intercepted again
    pub self_originated: bool,
    /// Undo/redo replay of an earlier change
    pub history_replay: bool,
    /// Received from a remote peer
    pub remote_sync: bool,
}

/// An ordered list of steps forming one logical edit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Change {
    steps: Vec<Step>,
    selection: Option<Range<usize>>,
    meta: ChangeMeta,
}

impl Change {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_steps(steps: Vec<Step>) -> Self {
        Self {
            steps,
            ..Self::default()
        }
    }

    pub fn push(&mut self, step: Step) {
        self.steps.push(step);
    }

    pub fn with_step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Selection to set once the change is applied, in post-change coordinates
    pub fn with_selection(mut self, selection: Range<usize>) -> Self {
        self.selection = Some(selection);
        self
    }

    pub fn self_originated(mut self) -> Self {
        self.meta.self_originated = true;
        self
    }

    pub fn history_replay(mut self) -> Self {
        self.meta.history_replay = true;
        self
    }

    pub fn remote_sync(mut self) -> Self {
        self.meta.remote_sync = true;
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }

    pub fn selection(&self) -> Option<Range<usize>> {
        self.selection.clone()
    }

    pub fn meta(&self) -> ChangeMeta {
        self.meta
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// What applying a change did to a document
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedChange {
    /// One map per text-moving step, in application order
    pub mapping: Mapping,
    /// Steps that undo the change when applied in order
    pub inverse: Vec<Step>,
    /// Ranges touched by the change, in final document coordinates
    pub changed: Vec<Range<usize>>,
}

impl AppliedChange {
    pub(crate) fn record(&mut self, step: &Step, inverse: Step) {
        let map = step.step_map();
        for range in &mut self.changed {
            let start = map.map(range.start, Bias::Left);
            let end = map.map(range.end, Bias::Right);
            *range = start..end.max(start);
        }
        self.changed.push(step.touched_range());
        self.mapping.push(map);
        self.inverse.insert(0, inverse);
    }

    /// Chain `next`, which was applied to the document this change produced
    pub fn then(mut self, next: AppliedChange) -> AppliedChange {
        for range in &mut self.changed {
            let start = next.mapping.map(range.start, Bias::Left);
            let end = next.mapping.map(range.end, Bias::Right);
            *range = start..end.max(start);
        }
        self.changed.extend(next.changed);
        self.mapping.extend(&next.mapping);

        let mut inverse = next.inverse;
        inverse.extend(self.inverse);
        self.inverse = inverse;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Document, fragment::Fragment};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_meta_flags() {
        let change = Change::new().self_originated().remote_sync();

        assert!(change.meta().self_originated);
        assert!(change.meta().remote_sync);
        assert!(!change.meta().history_replay);
    }

    #[test]
    fn test_inverse_undoes_multi_step_change() {
        let mut doc = Document::from_text("hello world");
        let change = Change::new()
            .with_step(Step::delete(0..6))
            .with_step(Step::insert(5, Fragment::plain("!")));

        let applied = doc.apply_change(&change).unwrap();
        assert_eq!(doc.text(), "world!");
        assert_eq!(applied.changed, vec![0..0, 5..6]);

        doc.apply_change(&Change::from_steps(applied.inverse)).unwrap();
        assert_eq!(doc.text(), "hello world");
    }
}
