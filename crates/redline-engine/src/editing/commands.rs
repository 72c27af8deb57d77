use std::ops::Range;

use crate::editing::{Change, Document, DocumentModel, Step, marks::Mark};

/// Commands that can be applied to a tracked editor
#[derive(Debug, Clone, PartialEq)]
pub enum Cmd {
    InsertText {
        at: usize,
        text: String,
    },
    /// Type at the cursor, replacing the selection
    TypeText {
        text: String,
    },
    DeleteRange {
        range: Range<usize>,
    },
    ReplaceRange {
        range: Range<usize>,
        text: String,
    },
    DeleteBackward,
    DeleteForward,
    /// Apply a formatting mark; tracked marks are only ever stamped by tracking
    AddMark {
        range: Range<usize>,
        mark: Mark,
    },
    SetSelection {
        range: Range<usize>,
    },
    CompositionStart,
    CompositionUpdate {
        text: String,
    },
    CompositionEnd,
    EnableTracking,
    DisableTracking,
    ToggleTracking,
    SetAuthor {
        id: String,
        name: String,
    },
    AcceptChange,
    RejectChange,
    AcceptAll,
    RejectAll,
    Undo,
    Redo,
}

impl Cmd {
    /// True for commands that compile to a document change
    pub fn is_edit(&self) -> bool {
        matches!(
            self,
            Cmd::InsertText { .. }
                | Cmd::TypeText { .. }
                | Cmd::DeleteRange { .. }
                | Cmd::ReplaceRange { .. }
                | Cmd::DeleteBackward
                | Cmd::DeleteForward
                | Cmd::AddMark { .. }
        )
    }
}

/// Compile an edit command into a change against `doc`
///
/// Returns `None` for non-edit commands and for edits that would do nothing,
/// such as a backspace at the start of the document.
pub(crate) fn compile_command(doc: &Document, cmd: &Cmd) -> Option<Change> {
    match cmd {
        Cmd::InsertText { at, text } => replace_with_text(doc, *at..*at, text),
        Cmd::TypeText { text } => replace_with_text(doc, doc.selection(), text),
        Cmd::ReplaceRange { range, text } => replace_with_text(doc, range.clone(), text),
        Cmd::DeleteRange { range } => delete(range.clone()),
        Cmd::DeleteBackward => {
            let selection = doc.selection();
            if !selection.is_empty() {
                return delete(selection);
            }
            let prev = doc.prev_char_offset(selection.start)?;
            delete(prev..selection.start)
        }
        Cmd::DeleteForward => {
            let selection = doc.selection();
            if !selection.is_empty() {
                return delete(selection);
            }
            let next = doc.next_char_offset(selection.start)?;
            delete(selection.start..next)
        }
        Cmd::AddMark { range, mark } if !range.is_empty() && mark.track_kind().is_none() => {
            Some(Change::new().with_step(Step::add_mark(range.clone(), mark.clone())))
        }
        _ => None,
    }
}

fn replace_with_text(doc: &Document, range: Range<usize>, text: &str) -> Option<Change> {
    if range.is_empty() && text.is_empty() {
        return None;
    }
    let fragment = doc.inherited_fragment(range.start, text);
    let caret = range.start + fragment.len();
    Some(
        Change::new()
            .with_step(Step::replace(range, fragment))
            .with_selection(caret..caret),
    )
}

fn delete(range: Range<usize>) -> Option<Change> {
    if range.is_empty() {
        return None;
    }
    let caret = range.start;
    Some(
        Change::new()
            .with_step(Step::delete(range))
            .with_selection(caret..caret),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn doc_with_cursor(text: &str, selection: Range<usize>) -> Document {
        let mut doc = Document::from_text(text);
        doc.set_selection(selection);
        doc
    }

    #[test]
    fn test_type_text_replaces_selection() {
        let doc = doc_with_cursor("hello world", 6..11);
        let change = compile_command(&doc, &Cmd::TypeText { text: "there".into() }).unwrap();

        assert_eq!(change.steps().len(), 1);
        assert_eq!(change.steps()[0].range(), &(6..11));
        assert_eq!(change.selection(), Some(11..11));
    }

    #[test]
    fn test_delete_backward_at_start_is_nothing() {
        let doc = doc_with_cursor("abc", 0..0);
        assert!(compile_command(&doc, &Cmd::DeleteBackward).is_none());
    }

    #[test]
    fn test_delete_backward_removes_previous_char() {
        let doc = doc_with_cursor("a世b", 4..4);
        let change = compile_command(&doc, &Cmd::DeleteBackward).unwrap();

        assert_eq!(change.steps()[0], Step::delete(1..4));
        assert_eq!(change.selection(), Some(1..1));
    }

    #[test]
    fn test_delete_forward_removes_next_char() {
        let doc = doc_with_cursor("abc", 1..1);
        let change = compile_command(&doc, &Cmd::DeleteForward).unwrap();

        assert_eq!(change.steps()[0], Step::delete(1..2));
        assert_eq!(change.selection(), Some(1..1));
    }

    #[test]
    fn test_delete_with_selection_removes_selection() {
        let doc = doc_with_cursor("abcdef", 1..4);
        let change = compile_command(&doc, &Cmd::DeleteForward).unwrap();

        assert_eq!(change.steps()[0], Step::delete(1..4));
    }

    #[test]
    fn test_add_mark_only_formats() {
        let doc = Document::from_text("abc");
        let bold = Cmd::AddMark {
            range: 0..2,
            mark: Mark::Strong,
        };
        let forged = Cmd::AddMark {
            range: 0..2,
            mark: Mark::Deletion(crate::editing::ChangeAttrs::default()),
        };

        assert_eq!(
            compile_command(&doc, &bold).unwrap().steps(),
            &[Step::add_mark(0..2, Mark::Strong)]
        );
        assert!(compile_command(&doc, &forged).is_none());
    }

    #[test]
    fn test_non_edit_commands_do_not_compile() {
        let doc = Document::from_text("abc");
        assert!(compile_command(&doc, &Cmd::AcceptAll).is_none());
        assert!(!Cmd::Undo.is_edit());
        assert!(Cmd::DeleteBackward.is_edit());
    }
}
