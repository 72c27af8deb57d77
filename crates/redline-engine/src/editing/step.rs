use std::ops::Range;

use crate::editing::{
    DocumentModel, EditError,
    fragment::Fragment,
    mapping::StepMap,
    marks::{Mark, MarkKind},
};

/// One atomic edit operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Replace `range` with `fragment`. An empty range is a pure insertion,
    /// an empty fragment a pure deletion.
    Replace { range: Range<usize>, fragment: Fragment },
    AddMark { range: Range<usize>, mark: Mark },
    RemoveMark { range: Range<usize>, kind: MarkKind },
}

impl Step {
    pub fn insert(at: usize, fragment: Fragment) -> Self {
        Step::Replace {
            range: at..at,
            fragment,
        }
    }

    pub fn delete(range: Range<usize>) -> Self {
        Step::Replace {
            range,
            fragment: Fragment::empty(),
        }
    }

    pub fn replace(range: Range<usize>, fragment: Fragment) -> Self {
        Step::Replace { range, fragment }
    }

    pub fn add_mark(range: Range<usize>, mark: Mark) -> Self {
        Step::AddMark { range, mark }
    }

    pub fn remove_mark(range: Range<usize>, kind: MarkKind) -> Self {
        Step::RemoveMark { range, kind }
    }

    /// The range this step addresses, in the coordinates of the document it applies to
    pub fn range(&self) -> &Range<usize> {
        match self {
            Step::Replace { range, .. }
            | Step::AddMark { range, .. }
            | Step::RemoveMark { range, .. } => range,
        }
    }

    /// Same step, retargeted to `range`
    pub fn with_range(&self, range: Range<usize>) -> Self {
        match self {
            Step::Replace { fragment, .. } => Step::Replace {
                range,
                fragment: fragment.clone(),
            },
            Step::AddMark { mark, .. } => Step::AddMark {
                range,
                mark: mark.clone(),
            },
            Step::RemoveMark { kind, .. } => Step::RemoveMark { range, kind: *kind },
        }
    }

    /// True if applying this step removes text
    pub fn deletes(&self) -> bool {
        matches!(self, Step::Replace { range, .. } if !range.is_empty())
    }

    pub fn step_map(&self) -> StepMap {
        match self {
            Step::Replace { range, fragment } => {
                StepMap::new(range.start, range.len(), fragment.len())
            }
            Step::AddMark { .. } | Step::RemoveMark { .. } => StepMap::identity(),
        }
    }

    /// Range touched by this step in the document produced by applying it
    pub fn touched_range(&self) -> Range<usize> {
        match self {
            Step::Replace { range, fragment } => range.start..range.start + fragment.len(),
            Step::AddMark { range, .. } | Step::RemoveMark { range, .. } => range.clone(),
        }
    }

    /// Build the step that undoes this one
    ///
    /// `before` must be the document this step is about to be applied to. Mark
    /// steps are inverted as a replace with the original slice, which restores
    /// whatever marks of the same kind were there before.
    pub fn invert<D: DocumentModel + ?Sized>(&self, before: &D) -> Result<Step, EditError> {
        let original = before.slice(self.range().clone())?;
        Ok(match self {
            Step::Replace { range, fragment } => Step::Replace {
                range: range.start..range.start + fragment.len(),
                fragment: original,
            },
            Step::AddMark { range, .. } | Step::RemoveMark { range, .. } => Step::Replace {
                range: range.clone(),
                fragment: original,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::Document;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_replace_inverse_restores_text_and_marks() {
        let mut doc = Document::from_fragment(Fragment::marked("bold", Mark::Strong));
        let step = Step::replace(1..3, Fragment::plain("xyz"));

        let inverse = step.invert(&doc).unwrap();
        doc.apply_step(&step).unwrap();
        assert_eq!(doc.text(), "bxyzd");

        doc.apply_step(&inverse).unwrap();
        assert_eq!(doc.text(), "bold");
        assert_eq!(doc.marks().spans().len(), 1);
        assert_eq!(doc.marks().spans()[0].range, 0..4);
    }

    #[test]
    fn test_mark_inverse_restores_previous_marks() {
        let mut doc = Document::from_text("plain text");
        let step = Step::add_mark(0..5, Mark::Emphasis);

        let inverse = step.invert(&doc).unwrap();
        doc.apply_step(&step).unwrap();
        assert!(doc.marks().has_kind(0..5, MarkKind::Emphasis));

        doc.apply_step(&inverse).unwrap();
        assert!(doc.marks().is_empty());
        assert_eq!(doc.text(), "plain text");
    }

    #[test]
    fn test_step_map_of_mark_step_is_identity() {
        assert!(Step::remove_mark(0..4, MarkKind::Strong).step_map().is_identity());
        assert_eq!(
            Step::replace(2..4, Fragment::plain("abc")).step_map(),
            StepMap::new(2, 2, 3)
        );
    }
}
