use std::ops::Range;

use crate::editing::{
    Change, Cmd, Document, DocumentModel, EditError, Patch, Step, TrackedRun, compile_command,
};
use crate::tracking::{
    Author, CompositionGuard, Resolution, Scope, TrackInterceptor, TrackingSession, resolve,
};

/// What executing a command did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The document changed
    Applied(Patch),
    /// Editor state changed without touching the document
    Updated,
    /// Tracking was switched; carries the new state
    Tracking(bool),
    /// Nothing to do
    NoOp,
}

/// One undoable unit: a change together with its corrective change
#[derive(Debug, Clone)]
struct Entry {
    forward: Vec<Step>,
    inverse: Vec<Step>,
    selection_before: Range<usize>,
    selection_after: Range<usize>,
}

#[derive(Debug, Clone, Default)]
struct History {
    undo: Vec<Entry>,
    redo: Vec<Entry>,
}

impl History {
    fn record(&mut self, entry: Entry) {
        self.undo.push(entry);
        self.redo.clear();
    }
}

/// A document with change tracking wired in
///
/// Every change goes through [`TrackedEditor::dispatch`], which applies it,
/// lets the track interceptor correct it and commits both as one history
/// entry.
#[derive(Debug, Clone)]
pub struct TrackedEditor {
    doc: Document,
    session: TrackingSession,
    composition: CompositionGuard,
    history: History,
}

impl TrackedEditor {
    pub fn new(doc: Document, session: TrackingSession) -> Self {
        Self {
            doc,
            session,
            composition: CompositionGuard::new(),
            history: History::default(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn session(&self) -> &TrackingSession {
        &self.session
    }

    pub fn composition(&self) -> &CompositionGuard {
        &self.composition
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_enabled()
    }

    pub fn tracked_runs(&self) -> Vec<TrackedRun> {
        self.doc.tracked_runs(0..self.doc.len())
    }

    pub fn can_undo(&self) -> bool {
        !self.history.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.redo.is_empty()
    }

    /// Apply `change`, then the corrective change the interceptor builds for it
    ///
    /// While an input method is composing, interception is skipped and the
    /// composed range is widened instead.
    pub fn dispatch(&mut self, change: Change) -> Result<Patch, EditError> {
        let selection_before = self.doc.selection();
        let mut post = self.doc.clone();
        let mut applied = post.apply_change(&change)?;
        let mut forward = change.steps().to_vec();
        let mut tracked = false;

        if self.composition.is_composing() {
            self.composition.absorb(&applied.mapping);
        } else if let Some(corrective) =
            TrackInterceptor::new(&self.session).intercept(&change, &self.doc, &post)
        {
            match post.apply_change(&corrective) {
                Ok(more) => {
                    applied = applied.then(more);
                    forward.extend(corrective.into_steps());
                    tracked = true;
                }
                Err(err) => log::warn!("corrective change failed to apply: {err}"),
            }
        }

        self.doc = post;
        if !change.meta().history_replay {
            self.history.record(Entry {
                forward,
                inverse: applied.inverse,
                selection_before,
                selection_after: self.doc.selection(),
            });
        }

        Ok(Patch {
            changed: applied.changed,
            new_selection: self.doc.selection(),
            version: self.doc.version(),
            tracked,
        })
    }

    pub fn execute(&mut self, cmd: Cmd) -> Result<Outcome, EditError> {
        if cmd.is_edit() {
            return match compile_command(&self.doc, &cmd) {
                Some(change) => self.dispatch(change).map(Outcome::Applied),
                None => Ok(Outcome::NoOp),
            };
        }

        match cmd {
            Cmd::SetSelection { range } => {
                self.doc.set_selection(range);
                self.composition.on_selection_change();
                Ok(Outcome::Updated)
            }
            Cmd::CompositionStart => self.start_composition(),
            Cmd::CompositionUpdate { text } => self.update_composition(&text),
            Cmd::CompositionEnd => self.end_composition(),
            Cmd::EnableTracking => {
                self.session.enable();
                Ok(Outcome::Tracking(true))
            }
            Cmd::DisableTracking => {
                self.session.disable();
                Ok(Outcome::Tracking(false))
            }
            Cmd::ToggleTracking => Ok(Outcome::Tracking(self.session.toggle())),
            Cmd::SetAuthor { id, name } => {
                self.session.set_author(Author::new(id, name));
                Ok(Outcome::Updated)
            }
            Cmd::AcceptChange => self.review(Resolution::Accept, Scope::Selection(self.doc.selection())),
            Cmd::RejectChange => self.review(Resolution::Reject, Scope::Selection(self.doc.selection())),
            Cmd::AcceptAll => self.review(Resolution::Accept, Scope::WholeDocument),
            Cmd::RejectAll => self.review(Resolution::Reject, Scope::WholeDocument),
            Cmd::Undo => self.undo(),
            Cmd::Redo => self.redo(),
            _ => Ok(Outcome::NoOp),
        }
    }

    fn review(&mut self, resolution: Resolution, scope: Scope) -> Result<Outcome, EditError> {
        match resolve(&self.doc, resolution, scope) {
            Some(change) => self.dispatch(change).map(Outcome::Applied),
            None => Ok(Outcome::NoOp),
        }
    }

    fn start_composition(&mut self) -> Result<Outcome, EditError> {
        let selection = self.doc.selection();
        let mut outcome = Outcome::Updated;
        if !selection.is_empty() {
            let caret = selection.start;
            let change = Change::new()
                .with_step(Step::delete(selection))
                .with_selection(caret..caret);
            outcome = Outcome::Applied(self.dispatch(change)?);
        }
        self.composition.on_composition_start(self.doc.selection().start);
        Ok(outcome)
    }

    fn update_composition(&mut self, text: &str) -> Result<Outcome, EditError> {
        let Some(range) = self.composition.composed_range() else {
            return Ok(Outcome::NoOp);
        };
        if range.is_empty() && text.is_empty() {
            return Ok(Outcome::NoOp);
        }
        self.composition.on_composition_update();

        let fragment = self.doc.inherited_fragment(range.start, text);
        let caret = range.start + fragment.len();
        let change = Change::new()
            .with_step(Step::replace(range, fragment))
            .with_selection(caret..caret);
        self.dispatch(change).map(Outcome::Applied)
    }

    fn end_composition(&mut self) -> Result<Outcome, EditError> {
        if !self.composition.is_composing() {
            return Ok(Outcome::NoOp);
        }
        let Some(range) = self.composition.on_composition_end() else {
            return Ok(Outcome::Updated);
        };
        let steps = TrackInterceptor::new(&self.session).mark_inserted(&self.doc, range);
        if steps.is_empty() {
            return Ok(Outcome::Updated);
        }
        let change = Change::from_steps(steps).self_originated();
        self.dispatch(change).map(Outcome::Applied)
    }

    fn undo(&mut self) -> Result<Outcome, EditError> {
        let Some(entry) = self.history.undo.pop() else {
            return Ok(Outcome::NoOp);
        };
        let change = Change::from_steps(entry.inverse.clone())
            .with_selection(entry.selection_before.clone())
            .history_replay();
        match self.dispatch(change) {
            Ok(patch) => {
                self.history.redo.push(entry);
                Ok(Outcome::Applied(patch))
            }
            Err(err) => {
                self.history.undo.push(entry);
                Err(err)
            }
        }
    }

    fn redo(&mut self) -> Result<Outcome, EditError> {
        let Some(entry) = self.history.redo.pop() else {
            return Ok(Outcome::NoOp);
        };
        let change = Change::from_steps(entry.forward.clone())
            .with_selection(entry.selection_after.clone())
            .history_replay();
        match self.dispatch(change) {
            Ok(patch) => {
                self.history.undo.push(entry);
                Ok(Outcome::Applied(patch))
            }
            Err(err) => {
                self.history.redo.push(entry);
                Err(err)
            }
        }
    }
}
