mod app;
mod script;

use anyhow::{Context, Result};
use app::{App, Flow, styled_lines};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Position},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};
use redline_config::Config;
use redline_engine::{Author, Document, TrackedEditor, TrackingSession, parse_markup, to_markup};
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
};

/// Parsed command line
struct Args {
    script: Option<PathBuf>,
    path: Option<PathBuf>,
}

fn parse_args(args: &[String]) -> Option<Args> {
    match args {
        [] => Some(Args {
            script: None,
            path: None,
        }),
        [flag, script, rest @ ..] if flag == "--script" && rest.len() <= 1 => Some(Args {
            script: Some(PathBuf::from(script)),
            path: rest.first().map(PathBuf::from),
        }),
        [path] if !path.starts_with("--") => Some(Args {
            script: None,
            path: Some(PathBuf::from(path)),
        }),
        _ => None,
    }
}

/// Open `path` as markup, or as plain text when it holds no valid markup
fn load_document(path: &Path) -> Result<Document> {
    if !path.exists() {
        return Ok(Document::from_text(""));
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    match parse_markup(&text) {
        Ok(doc) => Ok(doc),
        Err(err) => {
            log::warn!("{} is not valid markup ({err}), opening as plain text", path.display());
            Ok(Document::from_text(&text))
        }
    }
}

fn session_from(config: &Config) -> TrackingSession {
    TrackingSession::new(
        Author::new(&config.author_id, &config.author_name),
        config.track_changes,
    )
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let Some(parsed) = parse_args(&args[1.min(args.len())..]) else {
        eprintln!("Usage: {} [--script <script>] [document]", args[0]);
        process::exit(1);
    };

    let config = match Config::load() {
        Ok(config) => config.unwrap_or_default(),
        Err(e) => {
            eprintln!("Error: Failed to load config file: {e}");
            process::exit(1);
        }
    };
    let path = parsed.path.or_else(|| config.document_path.clone());
    let doc = match &path {
        Some(path) => load_document(path)?,
        None => Document::from_text(""),
    };
    let session = session_from(&config);

    if let Some(script_path) = parsed.script {
        let script = std::fs::read_to_string(&script_path)
            .with_context(|| format!("Failed to read script {}", script_path.display()))?;
        let cmds = script::parse_script(&script)?;
        let mut editor = TrackedEditor::new(doc, session);
        script::run_script(&mut editor, cmds)?;
        println!("{}", to_markup(editor.document()));
        return Ok(());
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(doc, session, path);

    // Main loop
    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
            && app.handle_key(key)? == Flow::Quit
        {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([Constraint::Min(0), Constraint::Length(2)].as_ref())
        .split(f.area());

    let title = match &app.path {
        Some(path) => path.display().to_string(),
        None => "Untitled".to_string(),
    };
    let content = Paragraph::new(styled_lines(app.editor.document()))
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(content, chunks[0]);

    // Caret sits inside the border
    let (line, column) = app.caret_position();
    f.set_cursor_position(Position::new(
        chunks[0].x + 1 + column as u16,
        chunks[0].y + 1 + line as u16,
    ));

    let help = Paragraph::new(vec![
        Line::from(Span::styled(
            app.status.clone(),
            Style::default().fg(Color::Yellow),
        )),
        Line::from(vec![
            Span::raw("Esc: Quit | "),
            Span::raw("^T: Track | "),
            Span::raw("^A/^R: Accept/Reject | "),
            Span::raw("^Y/^N: Accept/Reject all | "),
            Span::raw("^Z/^U: Undo/Redo | ^S: Save"),
        ]),
    ]);
    f.render_widget(help, chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_args() {
        let parsed = parse_args(&args(&["draft.md"])).unwrap();
        assert_eq!(parsed.path, Some(PathBuf::from("draft.md")));
        assert_eq!(parsed.script, None);

        let parsed = parse_args(&args(&["--script", "edits.txt", "draft.md"])).unwrap();
        assert_eq!(parsed.script, Some(PathBuf::from("edits.txt")));
        assert_eq!(parsed.path, Some(PathBuf::from("draft.md")));

        assert!(parse_args(&args(&[])).is_some());
        assert!(parse_args(&args(&["--script"])).is_none());
        assert!(parse_args(&args(&["a", "b"])).is_none());
    }

    #[test]
    fn test_load_document_reads_markup_or_plain_text() {
        let temp_dir = TempDir::new().unwrap();

        let marked = temp_dir.path().join("marked.html");
        std::fs::write(&marked, "a<ins>b</ins>").unwrap();
        let doc = load_document(&marked).unwrap();
        assert_eq!(doc.text(), "ab");
        assert_eq!(doc.marks().spans().len(), 1);

        let plain = temp_dir.path().join("plain.txt");
        std::fs::write(&plain, "x</del>y").unwrap();
        assert_eq!(load_document(&plain).unwrap().text(), "x</del>y");

        let missing = temp_dir.path().join("missing.txt");
        assert_eq!(load_document(&missing).unwrap().text(), "");
    }

    #[test]
    fn test_session_from_config() {
        let config = Config {
            author_id: "u9".to_string(),
            author_name: "Nine".to_string(),
            track_changes: true,
            document_path: None,
        };
        let session = session_from(&config);

        assert!(session.is_enabled());
        assert_eq!(session.author(), &Author::new("u9", "Nine"));
    }
}
