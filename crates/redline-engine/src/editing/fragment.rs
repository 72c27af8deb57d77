use std::ops::Range;

use crate::editing::marks::{Mark, MarkKind, MarkSet};

/// A piece of marked-up content: text plus marks relative to the fragment start
///
/// Fragments are the payload of insertions and what step inversion recovers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    text: String,
    marks: MarkSet,
}

impl Fragment {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: MarkSet::new(),
        }
    }

    pub fn new(text: impl Into<String>, marks: MarkSet) -> Self {
        let text = text.into();
        debug_assert!(marks.spans().iter().all(|s| s.range.end <= text.len()));
        Self { text, marks }
    }

    /// Text carrying a single mark over its whole length
    pub fn marked(text: impl Into<String>, mark: Mark) -> Self {
        Self::plain(text).with_mark(mark)
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn marks(&self) -> &MarkSet {
        &self.marks
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Block boundaries cannot carry inline marks
    pub fn contains_block_boundary(&self) -> bool {
        self.text.contains('\n')
    }

    /// Apply `mark` over the whole fragment
    pub fn with_mark(mut self, mark: Mark) -> Self {
        let len = self.len();
        self.marks.add(0..len, mark);
        self
    }

    /// Apply `mark` wherever no mark of its kind is present yet
    pub fn filled_with(mut self, mark: Mark) -> Self {
        let len = self.len();
        self.marks.fill(0..len, mark);
        self
    }

    /// Drop every byte that carries a mark of `kind`, keeping the rest in order
    pub fn without_marked(&self, kind: MarkKind) -> Self {
        if !self.marks.has_kind(0..self.len(), kind) {
            return self.clone();
        }
        let mut doomed: Vec<Range<usize>> = self
            .marks
            .spans()
            .iter()
            .filter(|span| span.mark.kind() == kind)
            .map(|span| span.range.clone())
            .collect();
        doomed.sort_by_key(|r| std::cmp::Reverse(r.start));

        let mut text = self.text.clone();
        let mut marks = self.marks.clone();
        for range in doomed {
            text.replace_range(range.clone(), "");
            marks.delete_range(range);
        }
        Self { text, marks }
    }
}

impl From<&str> for Fragment {
    fn from(text: &str) -> Self {
        Fragment::plain(text)
    }
}
