//! Track interceptor: turns a committed change into tracked edits.
//!
//! The interceptor replays the original change on a copy of the pre-change
//! document. Whenever a step removes content, the removed fragment is put
//! back right where it was, marked as deleted. Those restored pieces shift
//! every later step of the change, so each step is first rebased through the
//! pieces restored so far. Content that was inserted is remembered as a range
//! and restamped once the replay is done.
//!
//! The corrective change is applied on top of the post-change document. It
//! re-inserts every restored piece in ascending order (which makes the pieces
//! list its own position mapping) and then fixes the marks on inserted text.

use std::ops::Range;

use crate::editing::{
    Bias, Change, ChangeAttrs, DocumentModel, EditError, Mapping, Mark, MarkKind, Step, StepMap,
    recover_deleted,
};
use crate::tracking::TrackingSession;

/// Rewrites changes against one editor's tracking session
#[derive(Debug, Clone, Copy)]
pub struct TrackInterceptor<'a> {
    session: &'a TrackingSession,
}

impl<'a> TrackInterceptor<'a> {
    pub fn new(session: &'a TrackingSession) -> Self {
        Self { session }
    }

    /// Build the corrective change for `change`, which took `pre` to `post`
    ///
    /// Returns `None` for flagged changes and when nothing needs correcting.
    /// Replay failures are logged and the change is left untracked.
    pub fn intercept<D>(&self, change: &Change, pre: &D, post: &D) -> Option<Change>
    where
        D: DocumentModel + Clone,
    {
        let meta = change.meta();
        if meta.self_originated || meta.history_replay || meta.remote_sync {
            log::debug!("not intercepting flagged change: {meta:?}");
            return None;
        }

        match self.rewrite(change, pre, post) {
            Ok(corrective) => corrective,
            Err(err) => {
                log::warn!("tracking replay failed, change left untracked: {err}");
                None
            }
        }
    }

    /// Steps that mark `range` of `doc` as freshly inserted text
    ///
    /// With tracking enabled the range is stamped as an insertion by the
    /// current author and any deletion mark it inherited is cleared. With
    /// tracking disabled, stale tracked marks are cleared instead.
    pub fn mark_inserted<D>(&self, doc: &D, range: Range<usize>) -> Vec<Step>
    where
        D: DocumentModel + ?Sized,
    {
        let attrs = self.session.is_enabled().then(|| self.session.stamp());
        insertion_steps(doc, range, attrs.as_ref())
    }

    fn rewrite<D>(&self, change: &Change, pre: &D, post: &D) -> Result<Option<Change>, EditError>
    where
        D: DocumentModel + Clone,
    {
        let attrs = self.session.is_enabled().then(|| self.session.stamp());
        let mut tracked = pre.clone();
        let mut replay = Replay::default();

        for step in change.steps() {
            let rebase = replay.mapping();
            match step {
                Step::Replace { range, fragment } => {
                    let start = rebase.map(range.start, Bias::Right);
                    let end = if range.is_empty() {
                        start
                    } else {
                        rebase.map(range.end, Bias::Left).max(start)
                    };
                    let rebased = Step::replace(start..end, fragment.clone());
                    let removed = recover_deleted(&rebased, &tracked)?.unwrap_or_default();
                    let map = tracked.apply_step(&rebased)?;
                    replay.remap(map);

                    let mut restored = 0;
                    if let Some(attrs) = &attrs {
                        let kept = removed.without_marked(MarkKind::Insertion);
                        if kept.contains_block_boundary() {
                            log::debug!(
                                "removal at {start}..{end} spans a block boundary, left untracked"
                            );
                        } else if !kept.is_empty() {
                            restored = kept.len();
                            let kept = kept.filled_with(Mark::Deletion(attrs.clone()));
                            let map = tracked.apply_step(&Step::insert(start, kept))?;
                            replay.remap(map);
                            replay.pieces.push(start..start + restored);
                            replay.pieces.sort_by_key(|piece| piece.start);
                        }
                    }

                    if !fragment.is_empty() {
                        let inserted = start + restored..start + restored + fragment.len();
                        if let Some(attrs) = &attrs {
                            // Stamp right away so later steps see this text as an insertion
                            tracked.apply_step(&Step::remove_mark(
                                inserted.clone(),
                                MarkKind::Deletion,
                            ))?;
                            tracked.apply_step(&Step::add_mark(
                                inserted.clone(),
                                Mark::Insertion(attrs.clone()),
                            ))?;
                        }
                        replay.inserted.push(inserted);
                    }
                }
                Step::AddMark { range, .. } | Step::RemoveMark { range, .. } => {
                    let range = rebase.map_range_inward(range.clone());
                    if !range.is_empty() {
                        tracked.apply_step(&step.with_range(range))?;
                    }
                }
            }
        }

        let mut scratch = post.clone();
        let mut corrective = Change::new();
        for piece in &replay.pieces {
            let step = Step::insert(piece.start, tracked.slice(piece.clone())?);
            scratch.apply_step(&step)?;
            corrective.push(step);
        }
        for range in &replay.inserted {
            for step in insertion_steps(&scratch, range.clone(), attrs.as_ref()) {
                scratch.apply_step(&step)?;
                corrective.push(step);
            }
        }

        if corrective.is_empty() {
            return Ok(None);
        }

        let bias = if is_backward_delete(change, pre) {
            Bias::Left
        } else {
            Bias::Right
        };
        let restore = replay.mapping();
        let selection = post.selection();
        let start = restore.map(selection.start, bias);
        let end = restore.map(selection.end, bias).max(start);

        log::debug!(
            "tracked change: {} restored piece(s), {} inserted range(s)",
            replay.pieces.len(),
            replay.inserted.len()
        );
        Ok(Some(corrective.with_selection(start..end).self_originated()))
    }
}

/// Replay bookkeeping, in tracked-document coordinates
#[derive(Debug, Default)]
struct Replay {
    /// Deleted content put back, ascending and disjoint
    pieces: Vec<Range<usize>>,
    /// Content inserted by the change
    inserted: Vec<Range<usize>>,
}

impl Replay {
    /// Maps positions of the untracked document into the tracked one
    fn mapping(&self) -> Mapping {
        self.pieces
            .iter()
            .map(|piece| StepMap::new(piece.start, 0, piece.len()))
            .collect()
    }

    fn remap(&mut self, map: StepMap) {
        for ranges in [&mut self.pieces, &mut self.inserted] {
            for range in ranges.iter_mut() {
                let start = map.map(range.start, Bias::Right);
                let end = map.map(range.end, Bias::Left).max(start);
                *range = start..end;
            }
            ranges.retain(|range| !range.is_empty());
        }
    }
}

fn insertion_steps<D>(doc: &D, range: Range<usize>, attrs: Option<&ChangeAttrs>) -> Vec<Step>
where
    D: DocumentModel + ?Sized,
{
    if range.is_empty() {
        return Vec::new();
    }
    let spans = doc.mark_spans(range.clone());
    let has = |kind: MarkKind| spans.iter().any(|span| span.mark.kind() == kind);

    let mut steps = Vec::new();
    match attrs {
        Some(attrs) => {
            let mark = Mark::Insertion(attrs.clone());
            let covered: usize = spans
                .iter()
                .filter(|span| span.mark == mark)
                .map(|span| span.range.len())
                .sum();
            if has(MarkKind::Deletion) {
                steps.push(Step::remove_mark(range.clone(), MarkKind::Deletion));
            }
            if covered < range.len() {
                steps.push(Step::add_mark(range, mark));
            }
        }
        None => {
            for kind in [MarkKind::Insertion, MarkKind::Deletion] {
                if has(kind) {
                    steps.push(Step::remove_mark(range.clone(), kind));
                }
            }
        }
    }
    steps
}

/// A backspace: a collapsed caret deleting the content right before it
fn is_backward_delete<D: DocumentModel + ?Sized>(change: &Change, pre: &D) -> bool {
    let caret = pre.selection();
    caret.is_empty()
        && change
            .steps()
            .iter()
            .any(|step| step.deletes() && step.range().end == caret.start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::{Document, Fragment, MarkSet, MarkSpan, TrackKind};
    use crate::tracking::Author;
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn clock() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 12).unwrap()
    }

    fn session(enabled: bool) -> TrackingSession {
        TrackingSession::new(Author::new("u1", "Alice"), enabled).with_clock(clock)
    }

    fn attrs() -> ChangeAttrs {
        ChangeAttrs::new("u1", "Alice", clock())
    }

    /// Apply `change` to `doc`, then whatever the interceptor asks for
    fn run(session: &TrackingSession, doc: &mut Document, change: Change) -> Option<Change> {
        let pre = doc.clone();
        doc.apply_change(&change).unwrap();
        let corrective = TrackInterceptor::new(session).intercept(&change, &pre, doc);
        if let Some(corrective) = &corrective {
            doc.apply_change(corrective).unwrap();
        }
        corrective
    }

    fn runs(doc: &Document) -> Vec<(TrackKind, String)> {
        doc.tracked_runs(0..doc.len())
            .into_iter()
            .map(|run| (run.kind, doc.text_slice(run.range).into_owned()))
            .collect()
    }

    fn caret(doc: &mut Document, at: usize) {
        doc.set_selection(at..at);
    }

    // ============ Insertion tests ============

    #[test]
    fn test_insertion_is_marked() {
        let mut doc = Document::from_text("");
        run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::insert(0, "cat".into())),
        );

        assert_eq!(doc.text(), "cat");
        assert_eq!(runs(&doc), vec![(TrackKind::Insertion, "cat".to_string())]);
        assert_eq!(doc.tracked_runs(0..3)[0].attrs, attrs());
    }

    #[test]
    fn test_typing_after_deletion_run_is_not_a_deletion() {
        let mut doc = Document::from_fragment(Fragment::new(
            "ab",
            MarkSet::from_spans([MarkSpan::new(0..2, Mark::Deletion(attrs()))]),
        ));
        let fragment = doc.inherited_fragment(2, "c");
        run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::insert(2, fragment)),
        );

        assert_eq!(
            runs(&doc),
            vec![
                (TrackKind::Deletion, "ab".to_string()),
                (TrackKind::Insertion, "c".to_string()),
            ]
        );
    }

    // ============ Deletion tests ============

    #[test]
    fn test_deletion_is_restored_and_marked() {
        let mut doc = Document::from_text("hello world");
        caret(&mut doc, 6);
        run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::delete(6..11)),
        );

        assert_eq!(doc.text(), "hello world");
        assert_eq!(runs(&doc), vec![(TrackKind::Deletion, "world".to_string())]);
    }

    #[test]
    fn test_deleting_unaccepted_insertion_removes_it() {
        let mut doc = Document::from_fragment(Fragment::marked("cat", Mark::Insertion(attrs())));
        let corrective = run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::delete(1..2)),
        );

        assert!(corrective.is_none());
        assert_eq!(doc.text(), "ct");
        assert_eq!(runs(&doc), vec![(TrackKind::Insertion, "ct".to_string())]);
    }

    #[test]
    fn test_partially_inserted_deletion_is_split() {
        // "ab" is plain, "XY" an unaccepted insertion, "cd" plain
        let mut doc = Document::from_fragment(Fragment::new(
            "abXYcd",
            MarkSet::from_spans([MarkSpan::new(2..4, Mark::Insertion(attrs()))]),
        ));
        run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::delete(1..5)),
        );

        assert_eq!(doc.text(), "abcd");
        assert_eq!(runs(&doc), vec![(TrackKind::Deletion, "bc".to_string())]);
    }

    #[test]
    fn test_redeleting_keeps_original_deletion_author() {
        let other = ChangeAttrs::new("u2", "Bob", clock());
        let mut doc = Document::from_fragment(Fragment::new(
            "abcd",
            MarkSet::from_spans([MarkSpan::new(1..3, Mark::Deletion(other.clone()))]),
        ));
        run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::delete(0..4)),
        );

        assert_eq!(doc.text(), "abcd");
        let authors: Vec<_> = doc
            .tracked_runs(0..4)
            .into_iter()
            .map(|run| (run.range, run.attrs.author_id))
            .collect();
        assert_eq!(
            authors,
            vec![
                (0..1, "u1".to_string()),
                (1..3, "u2".to_string()),
                (3..4, "u1".to_string()),
            ]
        );
    }

    #[test]
    fn test_block_boundary_removal_is_untracked() {
        let mut doc = Document::from_text("one\ntwo");
        let corrective = run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::delete(2..5)),
        );

        assert!(corrective.is_none());
        assert_eq!(doc.text(), "onwo");
    }

    // ============ Multi-step tests ============

    #[test]
    fn test_repeated_backspace_within_one_change() {
        let mut doc = Document::from_text("abcde");
        caret(&mut doc, 3);
        run(
            &session(true),
            &mut doc,
            Change::new()
                .with_step(Step::delete(2..3))
                .with_step(Step::delete(1..2)),
        );

        assert_eq!(doc.text(), "abcde");
        assert_eq!(runs(&doc), vec![(TrackKind::Deletion, "bc".to_string())]);
        assert_eq!(doc.selection(), 1..1);
    }

    #[test]
    fn test_repeated_forward_delete_within_one_change() {
        let mut doc = Document::from_text("abcde");
        caret(&mut doc, 1);
        run(
            &session(true),
            &mut doc,
            Change::new()
                .with_step(Step::delete(1..2))
                .with_step(Step::delete(1..2)),
        );

        assert_eq!(doc.text(), "abcde");
        assert_eq!(runs(&doc), vec![(TrackKind::Deletion, "bc".to_string())]);
        assert_eq!(doc.selection(), 3..3);
    }

    #[test]
    fn test_replacement_keeps_deleted_text_first() {
        let mut doc = Document::from_text("hello world");
        doc.set_selection(6..11);
        run(
            &session(true),
            &mut doc,
            Change::new()
                .with_step(Step::replace(6..11, "there".into()))
                .with_selection(11..11),
        );

        assert_eq!(doc.text(), "hello worldthere");
        assert_eq!(
            runs(&doc),
            vec![
                (TrackKind::Deletion, "world".to_string()),
                (TrackKind::Insertion, "there".to_string()),
            ]
        );
        assert_eq!(doc.selection(), 16..16);
    }

    #[test]
    fn test_text_inserted_and_deleted_in_one_change_vanishes() {
        let mut doc = Document::from_text("ab");
        run(
            &session(true),
            &mut doc,
            Change::new()
                .with_step(Step::insert(1, "xyz".into()))
                .with_step(Step::delete(2..3)),
        );

        assert_eq!(doc.text(), "axzb");
        assert_eq!(runs(&doc), vec![(TrackKind::Insertion, "xz".to_string())]);
    }

    // ============ Disabled tracking and flags ============

    #[test]
    fn test_disabled_tracking_clears_inherited_marks() {
        let mut doc = Document::from_fragment(Fragment::marked("ab", Mark::Insertion(attrs())));
        let fragment = doc.inherited_fragment(2, "c");
        run(
            &session(false),
            &mut doc,
            Change::new().with_step(Step::insert(2, fragment)),
        );

        assert_eq!(doc.text(), "abc");
        assert_eq!(runs(&doc), vec![(TrackKind::Insertion, "ab".to_string())]);
    }

    #[test]
    fn test_disabled_tracking_without_stale_marks_is_nothing() {
        let mut doc = Document::from_text("abc");
        let corrective = run(
            &session(false),
            &mut doc,
            Change::new().with_step(Step::delete(0..1)),
        );

        assert!(corrective.is_none());
        assert_eq!(doc.text(), "bc");
    }

    #[test]
    fn test_flagged_changes_are_not_intercepted() {
        let session = session(true);
        let interceptor = TrackInterceptor::new(&session);
        let pre = Document::from_text("abc");
        let mut post = pre.clone();
        let change = Change::new().with_step(Step::delete(0..1));
        post.apply_change(&change).unwrap();

        for flagged in [
            change.clone().self_originated(),
            change.clone().history_replay(),
            change.clone().remote_sync(),
        ] {
            assert_eq!(interceptor.intercept(&flagged, &pre, &post), None);
        }
    }

    #[test]
    fn test_corrective_change_is_self_suppressing() {
        let session = session(true);
        let mut doc = Document::from_text("abc");
        let corrective = run(
            &session,
            &mut doc,
            Change::new().with_step(Step::delete(0..1)),
        )
        .unwrap();

        assert!(corrective.meta().self_originated);
        let before = doc.clone();
        assert_eq!(
            TrackInterceptor::new(&session).intercept(&corrective, &before, &doc),
            None
        );
    }

    #[test]
    fn test_formatting_steps_are_not_tracked() {
        let mut doc = Document::from_text("abc");
        let corrective = run(
            &session(true),
            &mut doc,
            Change::new().with_step(Step::add_mark(0..3, Mark::Strong)),
        );

        assert!(corrective.is_none());
        assert!(runs(&doc).is_empty());
    }

    #[test]
    fn test_mark_inserted_skips_covered_range() {
        let session = session(true);
        let doc = Document::from_fragment(Fragment::marked("abc", Mark::Insertion(attrs())));

        assert!(TrackInterceptor::new(&session).mark_inserted(&doc, 0..3).is_empty());
        assert_eq!(
            TrackInterceptor::new(&session).mark_inserted(&Document::from_text("abc"), 0..3),
            vec![Step::add_mark(0..3, Mark::Insertion(attrs()))]
        );
    }
}
