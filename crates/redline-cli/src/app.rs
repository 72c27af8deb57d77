use std::path::PathBuf;

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    style::{Color, Modifier, Style},
    text::{Line, Span},
};
use redline_engine::{
    Cmd, Document, DocumentModel, MarkKind, Outcome, TrackedEditor, TrackingSession, to_markup,
};

/// What the main loop should do after a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App {
    pub editor: TrackedEditor,
    pub path: Option<PathBuf>,
    pub status: String,
}

impl App {
    pub fn new(doc: Document, session: TrackingSession, path: Option<PathBuf>) -> Self {
        let mut app = Self {
            editor: TrackedEditor::new(doc, session),
            path,
            status: String::new(),
        };
        app.status = app.tracking_status();
        app
    }

    fn tracking_status(&self) -> String {
        let session = self.editor.session();
        if session.is_enabled() {
            format!("Tracking ON as {}", session.author().name)
        } else {
            "Tracking OFF".to_string()
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<Flow> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let cmd = match key.code {
            KeyCode::Esc => return Ok(Flow::Quit),
            KeyCode::Char('s') if ctrl => {
                self.save()?;
                return Ok(Flow::Continue);
            }
            KeyCode::Char('t') if ctrl => Cmd::ToggleTracking,
            KeyCode::Char('a') if ctrl => Cmd::AcceptChange,
            KeyCode::Char('r') if ctrl => Cmd::RejectChange,
            KeyCode::Char('y') if ctrl => Cmd::AcceptAll,
            KeyCode::Char('n') if ctrl => Cmd::RejectAll,
            KeyCode::Char('z') if ctrl => {
                if !self.editor.can_undo() {
                    self.status = "Nothing to undo".to_string();
                    return Ok(Flow::Continue);
                }
                Cmd::Undo
            }
            KeyCode::Char('u') if ctrl => {
                if !self.editor.can_redo() {
                    self.status = "Nothing to redo".to_string();
                    return Ok(Flow::Continue);
                }
                Cmd::Redo
            }
            KeyCode::Char(_) if ctrl => return Ok(Flow::Continue),
            KeyCode::Char(c) => Cmd::TypeText {
                text: c.to_string(),
            },
            KeyCode::Enter => Cmd::TypeText {
                text: "\n".to_string(),
            },
            KeyCode::Backspace => Cmd::DeleteBackward,
            KeyCode::Delete => Cmd::DeleteForward,
            KeyCode::Left => self.move_caret(Document::prev_char_offset),
            KeyCode::Right => self.move_caret(Document::next_char_offset),
            KeyCode::Home => Cmd::SetSelection { range: 0..0 },
            KeyCode::End => {
                let len = self.editor.document().len();
                Cmd::SetSelection { range: len..len }
            }
            _ => return Ok(Flow::Continue),
        };

        match self.editor.execute(cmd) {
            Ok(Outcome::Tracking(_)) => self.status = self.tracking_status(),
            Ok(Outcome::Applied(patch)) if patch.tracked => {
                self.status = format!("{} tracked run(s)", self.editor.tracked_runs().len());
            }
            Ok(_) => {}
            Err(err) => self.status = format!("Edit failed: {err}"),
        }
        Ok(Flow::Continue)
    }

    fn move_caret(&self, step: fn(&Document, usize) -> Option<usize>) -> Cmd {
        let doc = self.editor.document();
        let caret = doc.selection().end;
        let at = step(doc, caret).unwrap_or(caret);
        Cmd::SetSelection { range: at..at }
    }

    fn save(&mut self) -> Result<()> {
        let Some(path) = &self.path else {
            self.status = "No file to save to".to_string();
            return Ok(());
        };
        std::fs::write(path, to_markup(self.editor.document()))?;
        log::info!("saved {}", path.display());
        self.status = format!("Saved {}", path.display());
        Ok(())
    }

    /// Line and column (in characters) of the caret
    pub fn caret_position(&self) -> (usize, usize) {
        let doc = self.editor.document();
        let before = doc.text_slice(0..doc.selection().end);
        let line = before.matches('\n').count();
        let column = before
            .rsplit('\n')
            .next()
            .map_or(0, |tail| tail.chars().count());
        (line, column)
    }
}

fn style_for(kinds: &[MarkKind]) -> Style {
    kinds.iter().fold(Style::default(), |style, kind| match kind {
        MarkKind::Insertion => style.fg(Color::Green).add_modifier(Modifier::UNDERLINED),
        MarkKind::Deletion => style.fg(Color::Red).add_modifier(Modifier::CROSSED_OUT),
        MarkKind::Strong => style.add_modifier(Modifier::BOLD),
        MarkKind::Emphasis => style.add_modifier(Modifier::ITALIC),
        MarkKind::Code => style.fg(Color::Cyan),
    })
}

/// Document text as terminal lines, styled by mark
pub fn styled_lines(doc: &Document) -> Vec<Line<'static>> {
    let len = doc.len();
    let spans = doc.mark_spans(0..len);
    let mut bounds: Vec<usize> = spans
        .iter()
        .flat_map(|span| [span.range.start, span.range.end])
        .chain([0, len])
        .collect();
    bounds.sort_unstable();
    bounds.dedup();

    let mut lines = vec![Line::default()];
    for pair in bounds.windows(2) {
        let (from, to) = (pair[0], pair[1]);
        let kinds: Vec<MarkKind> = spans
            .iter()
            .filter(|span| span.range.start <= from && span.range.end >= to)
            .map(|span| span.mark.kind())
            .collect();
        let style = style_for(&kinds);

        let text = doc.text_slice(from..to);
        for (index, piece) in text.split('\n').enumerate() {
            if index > 0 {
                lines.push(Line::default());
            }
            if !piece.is_empty()
                && let Some(line) = lines.last_mut()
            {
                line.push_span(Span::styled(piece.to_string(), style));
            }
        }
    }
    lines
}
