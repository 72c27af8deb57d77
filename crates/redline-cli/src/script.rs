//! Headless command scripts: one editor command per line.
//!
//! ```text
//! # comments and blank lines are skipped
//! author u1 Alice
//! track on
//! select 6 11
//! type there
//! accept-all
//! ```
//!
//! Text arguments run to the end of the line; `\n` inside them is a newline.

use anyhow::{Context, Result, anyhow, bail};
use redline_engine::{Cmd, Mark, TrackedEditor};

/// Parse a whole script into commands
pub fn parse_script(script: &str) -> Result<Vec<Cmd>> {
    script
        .lines()
        .enumerate()
        .filter(|(_, line)| {
            let line = line.trim();
            !line.is_empty() && !line.starts_with('#')
        })
        .map(|(index, line)| parse_line(line.trim()).with_context(|| format!("line {}", index + 1)))
        .collect()
}

/// Run every command against `editor`, stopping at the first failure
pub fn run_script(editor: &mut TrackedEditor, cmds: Vec<Cmd>) -> Result<()> {
    for (index, cmd) in cmds.into_iter().enumerate() {
        let outcome = editor
            .execute(cmd)
            .with_context(|| format!("command {}", index + 1))?;
        log::debug!("command {}: {outcome:?}", index + 1);
    }
    Ok(())
}

fn parse_line(line: &str) -> Result<Cmd> {
    let (verb, rest) = line.split_once(' ').unwrap_or((line, ""));
    let mut args = Args { rest };

    let cmd = match verb {
        "insert" => Cmd::InsertText {
            at: args.offset()?,
            text: args.text(),
        },
        "type" => Cmd::TypeText { text: args.text() },
        "delete" => Cmd::DeleteRange {
            range: args.range()?,
        },
        "replace" => Cmd::ReplaceRange {
            range: args.range()?,
            text: args.text(),
        },
        "backspace" => Cmd::DeleteBackward,
        "delete-forward" => Cmd::DeleteForward,
        "select" => Cmd::SetSelection {
            range: args.range()?,
        },
        "cursor" => {
            let at = args.offset()?;
            Cmd::SetSelection { range: at..at }
        }
        "bold" => Cmd::AddMark {
            range: args.range()?,
            mark: Mark::Strong,
        },
        "italic" => Cmd::AddMark {
            range: args.range()?,
            mark: Mark::Emphasis,
        },
        "code" => Cmd::AddMark {
            range: args.range()?,
            mark: Mark::Code,
        },
        "compose-start" => Cmd::CompositionStart,
        "compose" => Cmd::CompositionUpdate { text: args.text() },
        "compose-end" => Cmd::CompositionEnd,
        "track" => match args.word() {
            Some("on") => Cmd::EnableTracking,
            Some("off") => Cmd::DisableTracking,
            Some("toggle") => Cmd::ToggleTracking,
            other => bail!("expected on, off or toggle, got {other:?}"),
        },
        "author" => Cmd::SetAuthor {
            id: args.word().ok_or_else(|| anyhow!("missing author id"))?.to_string(),
            name: args.text(),
        },
        "accept" => Cmd::AcceptChange,
        "reject" => Cmd::RejectChange,
        "accept-all" => Cmd::AcceptAll,
        "reject-all" => Cmd::RejectAll,
        "undo" => Cmd::Undo,
        "redo" => Cmd::Redo,
        other => bail!("unknown command {other:?}"),
    };
    Ok(cmd)
}

struct Args<'a> {
    rest: &'a str,
}

impl<'a> Args<'a> {
    fn word(&mut self) -> Option<&'a str> {
        let rest = self.rest.trim_start();
        if rest.is_empty() {
            return None;
        }
        let (word, tail) = rest.split_once(' ').unwrap_or((rest, ""));
        self.rest = tail;
        Some(word)
    }

    fn offset(&mut self) -> Result<usize> {
        let word = self.word().ok_or_else(|| anyhow!("missing offset"))?;
        word.parse()
            .with_context(|| format!("invalid offset {word:?}"))
    }

    fn range(&mut self) -> Result<std::ops::Range<usize>> {
        let start = self.offset()?;
        let end = self.offset()?;
        Ok(start..end)
    }

    fn text(&mut self) -> String {
        std::mem::take(&mut self.rest).replace("\\n", "\n")
    }
}
