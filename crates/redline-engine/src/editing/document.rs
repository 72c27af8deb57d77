use std::borrow::Cow;
use std::ops::Range;

use xi_rope::Rope;
use xi_rope::delta::Builder;

use crate::editing::{
    Change, EditError, Fragment, Step,
    change::AppliedChange,
    mapping::{Bias, StepMap},
    marks::{Mark, MarkKind, MarkSet, MarkSpan, TrackedRun},
};

/// The capability the tracking engine needs from a host document
///
/// Offsets are byte offsets into the document text. Implementations own the
/// content and its marks; the engine only reads them and hands back steps.
pub trait DocumentModel {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Plain text of `range`, clamped to the document
    fn text_slice(&self, range: Range<usize>) -> Cow<'_, str>;

    /// Text and marks of `range`
    fn slice(&self, range: Range<usize>) -> Result<Fragment, EditError>;

    /// Marks active immediately to the left of `pos` (to the right at offset 0)
    fn marks_at(&self, pos: usize) -> Vec<Mark>;

    /// Full extent of the `kind` mark active at `pos`, probed like [`Self::marks_at`]
    fn mark_span_at(&self, pos: usize, kind: MarkKind) -> Option<MarkSpan>;

    /// Marks overlapping `range`, clipped to it
    fn mark_spans(&self, range: Range<usize>) -> Vec<MarkSpan>;

    fn selection(&self) -> Range<usize>;

    fn set_selection(&mut self, selection: Range<usize>);

    fn apply_step(&mut self, step: &Step) -> Result<StepMap, EditError>;

    /// Tracked runs overlapping `range`, clipped to it, in document order
    fn tracked_runs(&self, range: Range<usize>) -> Vec<TrackedRun> {
        let mut runs: Vec<TrackedRun> = self
            .mark_spans(range)
            .iter()
            .filter_map(TrackedRun::from_span)
            .collect();
        runs.sort_by_key(|run| (run.range.start, run.range.end));
        runs
    }

    /// The whole tracked run next to a collapsed cursor, if any
    fn tracked_run_at(&self, pos: usize) -> Option<TrackedRun> {
        [MarkKind::Insertion, MarkKind::Deletion]
            .into_iter()
            .filter_map(|kind| self.mark_span_at(pos, kind))
            .find_map(|span| TrackedRun::from_span(&span))
    }
}

/// Rich-text document: an xi-rope text buffer plus an inline mark table
///
/// Block structure is line based: every `'\n'` is a block boundary.
#[derive(Clone)]
pub struct Document {
    /// Document text as UTF-8
    pub(crate) buffer: Rope,
    /// Normalized mark spans over `buffer`
    pub(crate) marks: MarkSet,
    /// Current selection/cursor as byte offsets into `buffer`
    pub(crate) selection: Range<usize>,
    /// Incremented once per applied change
    pub(crate) version: u64,
}

impl Document {
    /// Create a new document from raw bytes
    pub fn from_bytes(bytes: &[u8]) -> anyhow::Result<Self> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::from_text(text))
    }

    pub fn from_text(text: &str) -> Self {
        Self::from_fragment(Fragment::plain(text))
    }

    pub fn from_fragment(fragment: Fragment) -> Self {
        let len = fragment.len();
        Self {
            buffer: Rope::from(fragment.text()),
            marks: fragment.marks().clone(),
            selection: len..len,
            version: 0,
        }
    }

    pub fn text(&self) -> String {
        self.buffer.to_string()
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Text to be typed at `at`, carrying the marks active there
    ///
    /// Typing next to marked text continues the mark, so typing right after a
    /// tracked run inherits its mark until the tracking engine restamps it.
    pub fn inherited_fragment(&self, at: usize, text: &str) -> Fragment {
        self.marks_at(at)
            .into_iter()
            .fold(Fragment::plain(text), |fragment, mark| fragment.with_mark(mark))
    }

    /// Offset of the character before `offset`
    pub fn prev_char_offset(&self, offset: usize) -> Option<usize> {
        self.buffer.prev_codepoint_offset(offset.min(self.len()))
    }

    /// Offset of the character after `offset`
    pub fn next_char_offset(&self, offset: usize) -> Option<usize> {
        self.buffer.next_codepoint_offset(offset.min(self.len()))
    }

    /// Apply every step of `change`, atomically
    ///
    /// On error the document is left exactly as it was. The selection becomes
    /// the change's selection, or the old selection mapped through the change.
    pub fn apply_change(&mut self, change: &Change) -> Result<AppliedChange, EditError> {
        let checkpoint = (self.buffer.clone(), self.marks.clone());
        let mut applied = AppliedChange::default();

        if let Err(err) = self.apply_steps(change.steps(), &mut applied) {
            (self.buffer, self.marks) = checkpoint;
            return Err(err);
        }

        let selection = change.selection().unwrap_or_else(|| {
            let start = applied.mapping.map(self.selection.start, Bias::Right);
            let end = applied.mapping.map(self.selection.end, Bias::Right);
            start..end.max(start)
        });
        self.set_selection(selection);
        self.version += 1;

        Ok(applied)
    }

    fn apply_steps(&mut self, steps: &[Step], applied: &mut AppliedChange) -> Result<(), EditError> {
        for step in steps {
            let inverse = step.invert(&*self)?;
            self.apply_step(step)?;
            applied.record(step, inverse);
        }
        Ok(())
    }

    fn check_range(&self, range: &Range<usize>) -> Result<(), EditError> {
        let len = self.len();
        if range.start > range.end {
            return Err(EditError::InvertedRange {
                start: range.start,
                end: range.end,
            });
        }
        if range.end > len {
            return Err(EditError::OutOfBounds {
                start: range.start,
                end: range.end,
                len,
            });
        }
        for offset in [range.start, range.end] {
            if !self.buffer.is_codepoint_boundary(offset) {
                return Err(EditError::NotCharBoundary { offset });
            }
        }
        Ok(())
    }

    fn probe_offset(&self, pos: usize) -> Option<usize> {
        let len = self.len();
        match pos.min(len) {
            _ if len == 0 => None,
            0 => Some(0),
            pos => Some(pos - 1),
        }
    }
}

impl DocumentModel for Document {
    fn len(&self) -> usize {
        self.buffer.len()
    }

    fn text_slice(&self, range: Range<usize>) -> Cow<'_, str> {
        let len = self.len();
        let start = range.start.min(len);
        let end = range.end.min(len).max(start);
        self.buffer.slice_to_cow(start..end)
    }

    fn slice(&self, range: Range<usize>) -> Result<Fragment, EditError> {
        self.check_range(&range)?;
        let text = self.buffer.slice_to_cow(range.clone()).into_owned();
        Ok(Fragment::new(text, self.marks.slice(range)))
    }

    fn marks_at(&self, pos: usize) -> Vec<Mark> {
        match self.probe_offset(pos) {
            Some(offset) => self
                .marks
                .covering(offset)
                .map(|span| span.mark.clone())
                .collect(),
            None => Vec::new(),
        }
    }

    fn mark_span_at(&self, pos: usize, kind: MarkKind) -> Option<MarkSpan> {
        let offset = self.probe_offset(pos)?;
        self.marks
            .covering(offset)
            .find(|span| span.mark.kind() == kind)
            .cloned()
    }

    fn mark_spans(&self, range: Range<usize>) -> Vec<MarkSpan> {
        self.marks.clipped(range)
    }

    fn selection(&self) -> Range<usize> {
        self.selection.clone()
    }

    fn set_selection(&mut self, selection: Range<usize>) {
        let len = self.len();
        let collapsed = selection.end <= selection.start;
        // Widen to whole characters
        let mut start = selection.start.min(len);
        while start > 0 && !self.buffer.is_codepoint_boundary(start) {
            start -= 1;
        }
        let mut end = if collapsed {
            start
        } else {
            selection.end.min(len).max(start)
        };
        while end < len && !self.buffer.is_codepoint_boundary(end) {
            end += 1;
        }
        self.selection = start..end;
    }

    fn apply_step(&mut self, step: &Step) -> Result<StepMap, EditError> {
        self.check_range(step.range())?;
        match step {
            Step::Replace { range, fragment } => {
                let mut builder = Builder::new(self.buffer.len());
                builder.replace(range.clone(), Rope::from(fragment.text()));
                self.buffer = builder.build().apply(&self.buffer);

                self.marks.delete_range(range.clone());
                self.marks.open_gap(range.start, fragment.len());
                self.marks.splice(range.start, fragment.marks());
            }
            Step::AddMark { range, mark } => self.marks.add(range.clone(), mark.clone()),
            Step::RemoveMark { range, kind } => self.marks.remove(range.clone(), *kind),
        }
        Ok(step.step_map())
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("text", &self.text())
            .field("marks", &self.marks)
            .field("selection", &self.selection)
            .field("version", &self.version)
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        // Version is bookkeeping, not content
        self.buffer.to_string() == other.buffer.to_string()
            && self.marks == other.marks
            && self.selection == other.selection
    }
}
