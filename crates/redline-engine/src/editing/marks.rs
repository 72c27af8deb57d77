//! Mark definitions and the inline mark table.
//!
//! Marks are stored as byte ranges over the document text. A [`MarkSet`] is kept
//! normalized: spans are sorted by start, empty spans are dropped and touching
//! spans carrying an equal mark are merged. Two tracked edits by the same author
//! within the same minute therefore end up as a single run.

use std::ops::Range;

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

/// Attributes stamped on every tracked insertion or deletion
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChangeAttrs {
    pub author_id: String,
    pub author_name: String,
    /// Always truncated to a whole minute
    pub changed_at: DateTime<Utc>,
}

impl ChangeAttrs {
    pub fn new(
        author_id: impl Into<String>,
        author_name: impl Into<String>,
        changed_at: DateTime<Utc>,
    ) -> Self {
        Self {
            author_id: author_id.into(),
            author_name: author_name.into(),
            changed_at: truncate_to_minute(changed_at),
        }
    }
}

/// Drop seconds and sub-second precision from a timestamp
pub fn truncate_to_minute(at: DateTime<Utc>) -> DateTime<Utc> {
    at.with_second(0)
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(at)
}

/// The two kinds of tracked change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Insertion,
    Deletion,
}

/// Discriminant of [`Mark`], used to remove marks regardless of their attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkKind {
    Insertion,
    Deletion,
    Strong,
    Emphasis,
    Code,
}

impl From<TrackKind> for MarkKind {
    fn from(kind: TrackKind) -> Self {
        match kind {
            TrackKind::Insertion => MarkKind::Insertion,
            TrackKind::Deletion => MarkKind::Deletion,
        }
    }
}

/// An inline annotation over a range of text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    Insertion(ChangeAttrs),
    Deletion(ChangeAttrs),
    Strong,
    Emphasis,
    Code,
}

impl Mark {
    pub fn kind(&self) -> MarkKind {
        match self {
            Mark::Insertion(_) => MarkKind::Insertion,
            Mark::Deletion(_) => MarkKind::Deletion,
            Mark::Strong => MarkKind::Strong,
            Mark::Emphasis => MarkKind::Emphasis,
            Mark::Code => MarkKind::Code,
        }
    }

    /// `Some` for insertion and deletion marks, `None` for formatting marks
    pub fn track_kind(&self) -> Option<TrackKind> {
        match self {
            Mark::Insertion(_) => Some(TrackKind::Insertion),
            Mark::Deletion(_) => Some(TrackKind::Deletion),
            _ => None,
        }
    }

    pub fn attrs(&self) -> Option<&ChangeAttrs> {
        match self {
            Mark::Insertion(attrs) | Mark::Deletion(attrs) => Some(attrs),
            _ => None,
        }
    }
}

/// A mark applied to a byte range
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkSpan {
    pub range: Range<usize>,
    pub mark: Mark,
}

impl MarkSpan {
    pub fn new(range: Range<usize>, mark: Mark) -> Self {
        Self { range, mark }
    }

    fn overlaps(&self, range: &Range<usize>) -> bool {
        self.range.start < range.end && self.range.end > range.start
    }
}

/// A maximal contiguous region carrying one tracked mark kind and one attribute set
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedRun {
    pub kind: TrackKind,
    pub range: Range<usize>,
    pub attrs: ChangeAttrs,
}

impl TrackedRun {
    pub fn from_span(span: &MarkSpan) -> Option<Self> {
        let kind = span.mark.track_kind()?;
        let attrs = span.mark.attrs()?.clone();
        Some(Self {
            kind,
            range: span.range.clone(),
            attrs,
        })
    }
}

/// Normalized table of mark spans, addressed in byte offsets
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkSet {
    spans: Vec<MarkSpan>,
}

impl MarkSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_spans(spans: impl IntoIterator<Item = MarkSpan>) -> Self {
        let mut set = Self {
            spans: spans.into_iter().collect(),
        };
        set.normalize();
        set
    }

    pub fn spans(&self) -> &[MarkSpan] {
        &self.spans
    }

    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Spans covering the byte at `offset`
    pub fn covering(&self, offset: usize) -> impl Iterator<Item = &MarkSpan> {
        self.spans
            .iter()
            .filter(move |span| span.range.contains(&offset))
    }

    /// Spans that overlap `range`, unclipped
    pub fn overlapping(&self, range: Range<usize>) -> impl Iterator<Item = &MarkSpan> {
        self.spans.iter().filter(move |span| span.overlaps(&range))
    }

    /// Spans overlapping `range`, clipped to it, in absolute offsets
    pub fn clipped(&self, range: Range<usize>) -> Vec<MarkSpan> {
        self.overlapping(range.clone())
            .map(|span| {
                MarkSpan::new(
                    span.range.start.max(range.start)..span.range.end.min(range.end),
                    span.mark.clone(),
                )
            })
            .collect()
    }

    /// Spans within `range`, rebased so that `range.start` becomes offset 0
    pub fn slice(&self, range: Range<usize>) -> MarkSet {
        let base = range.start;
        MarkSet {
            spans: self
                .clipped(range)
                .into_iter()
                .map(|span| {
                    MarkSpan::new(span.range.start - base..span.range.end - base, span.mark)
                })
                .collect(),
        }
    }

    /// True if any byte of `range` carries a mark of `kind`
    pub fn has_kind(&self, range: Range<usize>, kind: MarkKind) -> bool {
        self.overlapping(range).any(|span| span.mark.kind() == kind)
    }

    /// Apply `mark` over `range`, replacing other marks of the same kind there
    pub fn add(&mut self, range: Range<usize>, mark: Mark) {
        if range.is_empty() {
            return;
        }
        self.cut(range.clone(), mark.kind());
        self.spans.push(MarkSpan::new(range, mark));
        self.normalize();
    }

    /// Apply `mark` only where `range` has no mark of the same kind yet
    pub fn fill(&mut self, range: Range<usize>, mark: Mark) {
        let kind = mark.kind();
        let mut covered: Vec<Range<usize>> = self
            .clipped(range.clone())
            .into_iter()
            .filter(|span| span.mark.kind() == kind)
            .map(|span| span.range)
            .collect();
        covered.sort_by_key(|r| r.start);

        let mut cursor = range.start;
        let mut gaps = Vec::new();
        for r in covered {
            if r.start > cursor {
                gaps.push(cursor..r.start);
            }
            cursor = cursor.max(r.end);
        }
        if cursor < range.end {
            gaps.push(cursor..range.end);
        }

        self.spans
            .extend(gaps.into_iter().map(|gap| MarkSpan::new(gap, mark.clone())));
        self.normalize();
    }

    /// Strip marks of `kind` from `range`
    pub fn remove(&mut self, range: Range<usize>, kind: MarkKind) {
        self.cut(range, kind);
        self.normalize();
    }

    /// Account for the text in `range` being removed
    pub fn delete_range(&mut self, range: Range<usize>) {
        let removed = range.len();
        if removed == 0 {
            return;
        }
        let map = |pos: usize| {
            if pos <= range.start {
                pos
            } else if pos >= range.end {
                pos - removed
            } else {
                range.start
            }
        };
        for span in &mut self.spans {
            span.range = map(span.range.start)..map(span.range.end);
        }
        self.normalize();
    }

    /// Account for `len` unmarked bytes being inserted at `at`
    ///
    /// Spans straddling `at` are split so the new text does not inherit them.
    pub fn open_gap(&mut self, at: usize, len: usize) {
        if len == 0 {
            return;
        }
        let mut tails = Vec::new();
        for span in &mut self.spans {
            if span.range.end <= at {
                continue;
            }
            if span.range.start >= at {
                span.range = span.range.start + len..span.range.end + len;
            } else {
                tails.push(MarkSpan::new(at + len..span.range.end + len, span.mark.clone()));
                span.range.end = at;
            }
        }
        self.spans.extend(tails);
        self.normalize();
    }

    /// Merge in `other`, whose offsets are relative to `at`
    pub fn splice(&mut self, at: usize, other: &MarkSet) {
        self.spans.extend(other.spans.iter().map(|span| {
            MarkSpan::new(span.range.start + at..span.range.end + at, span.mark.clone())
        }));
        self.normalize();
    }

    fn cut(&mut self, range: Range<usize>, kind: MarkKind) {
        let mut kept = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            if span.mark.kind() != kind || !span.overlaps(&range) {
                kept.push(span);
                continue;
            }
            if span.range.start < range.start {
                kept.push(MarkSpan::new(span.range.start..range.start, span.mark.clone()));
            }
            if span.range.end > range.end {
                kept.push(MarkSpan::new(range.end..span.range.end, span.mark));
            }
        }
        self.spans = kept;
    }

    fn normalize(&mut self) {
        self.spans.retain(|span| !span.range.is_empty());
        self.spans
            .sort_by_key(|span| (span.range.start, span.range.end, span.mark.kind()));

        let mut merged: Vec<MarkSpan> = Vec::with_capacity(self.spans.len());
        for span in self.spans.drain(..) {
            // Same-mark spans in `merged` are disjoint, so only the latest can touch
            match merged
                .iter_mut()
                .rev()
                .find(|prev| prev.mark == span.mark && prev.range.end >= span.range.start)
            {
                Some(prev) => prev.range.end = prev.range.end.max(span.range.end),
                None => merged.push(span),
            }
        }
        self.spans = merged;
    }
}
