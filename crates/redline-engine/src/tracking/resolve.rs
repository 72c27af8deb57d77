use std::ops::Range;

use crate::editing::{Change, DocumentModel, MarkKind, Step, TrackKind, TrackedRun};

/// What to do with the tracked runs in scope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Accept,
    Reject,
}

/// Which runs a resolution applies to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// A selection; when collapsed, the run touching the caret
    Selection(Range<usize>),
    WholeDocument,
}

/// Build the change that accepts or rejects every tracked run in `scope`
///
/// Accepting an insertion or rejecting a deletion keeps the text and strips
/// the mark. Accepting a deletion or rejecting an insertion removes the text.
/// Returns `None` when there is nothing in scope to resolve.
pub fn resolve<D>(doc: &D, resolution: Resolution, scope: Scope) -> Option<Change>
where
    D: DocumentModel + ?Sized,
{
    let runs = match scope {
        Scope::WholeDocument => doc.tracked_runs(0..doc.len()),
        Scope::Selection(range) if !range.is_empty() => doc.tracked_runs(range),
        Scope::Selection(range) => doc.tracked_run_at(range.start).into_iter().collect(),
    };
    if runs.is_empty() {
        log::debug!("nothing to {resolution:?}");
        return None;
    }

    let mut change = Change::new();
    // In original coordinates, disjoint
    let mut removed: Vec<Range<usize>> = Vec::new();

    for run in runs {
        // Runs of both kinds can cover the same bytes; removed bytes are gone
        for piece in uncovered(run.range.clone(), &removed) {
            let range = shifted(piece.start, &removed)..shifted(piece.end, &removed);
            if removes_content(&run, resolution) {
                change.push(Step::delete(range));
                removed.push(piece);
            } else {
                change.push(Step::remove_mark(range, MarkKind::from(run.kind)));
            }
        }
    }
    if change.is_empty() {
        return None;
    }

    log::debug!("{resolution:?}: {} step(s)", change.steps().len());
    Some(change.self_originated())
}

/// Parts of `range` outside every range in `removed`
fn uncovered(range: Range<usize>, removed: &[Range<usize>]) -> Vec<Range<usize>> {
    let mut holes: Vec<&Range<usize>> = removed
        .iter()
        .filter(|r| r.start < range.end && range.start < r.end)
        .collect();
    holes.sort_by_key(|r| r.start);

    let mut pieces = Vec::new();
    let mut cursor = range.start;
    for hole in holes {
        if hole.start > cursor {
            pieces.push(cursor..hole.start);
        }
        cursor = cursor.max(hole.end);
    }
    if cursor < range.end {
        pieces.push(cursor..range.end);
    }
    pieces
}

/// Where `pos` lands once every range in `removed` is deleted
fn shifted(pos: usize, removed: &[Range<usize>]) -> usize {
    let gone: usize = removed
        .iter()
        .filter(|r| r.start < pos)
        .map(|r| r.end.min(pos) - r.start)
        .sum();
    pos - gone
}

fn removes_content(run: &TrackedRun, resolution: Resolution) -> bool {
    matches!(
        (resolution, run.kind),
        (Resolution::Accept, TrackKind::Deletion) | (Resolution::Reject, TrackKind::Insertion)
    )
}
