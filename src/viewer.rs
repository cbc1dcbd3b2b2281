//! Side-by-side viewer for an expected and an actual trace log.
//!
//! Keys: ↑/k/Mouse-Up  ↓/j/Mouse-Down  PgUp/PgDn  d-first divergence  g-goto  q-quit

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, MouseEventKind},
    execute,
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, layout::{Constraint, Direction, Layout, Rect}, style::{Color, Modifier, Style}, text::{Line, Span}, widgets::{Block, Borders, Paragraph}, Frame, Terminal};
use std::{cmp, fs, io, path::Path, time::Duration};
use tracing::debug;

use crate::compare::{compare_lines, Comparison};
use crate::error::TraceError;

/// One rendered row: a line from each side, if present.
#[derive(Debug, PartialEq)]
struct Row {
    number: usize,
    expected: Option<String>,
    actual: Option<String>,
    differs: bool,
}

fn build_rows(expected: &str, actual: &str) -> Vec<Row> {
    let exp: Vec<&str> = expected.lines().collect();
    let act: Vec<&str> = actual.lines().collect();
    let len = cmp::max(exp.len(), act.len());

    (0..len)
        .map(|i| {
            let e = exp.get(i).map(|s| s.trim());
            let a = act.get(i).map(|s| s.trim());
            Row {
                number: i + 1,
                differs: matches!((e, a), (Some(e), Some(a)) if e != a),
                expected: e.map(str::to_string),
                actual: a.map(str::to_string),
            }
        })
        .collect()
}

/// Accepts a 1-based line number; returns the 0-based row.
fn parse_goto(s: &str) -> Option<usize> {
    let n: usize = s.trim().parse().ok()?;
    n.checked_sub(1)
}

enum Mode { View, Goto }

struct App {
    rows: Vec<Row>,
    comparison: Comparison,
    scroll: usize,
    mode: Mode,
    goto_input: String,
}

impl App {
    fn jump_to_divergence(&mut self) {
        if let Some(d) = self.comparison.divergence() {
            self.scroll = d.line - 1;
        }
    }

    fn try_jump(&mut self) -> bool {
        match parse_goto(&self.goto_input) {
            Some(row) => {
                self.scroll = cmp::min(row, self.rows.len().saturating_sub(1));
                true
            }
            None => false,
        }
    }

    fn status(&self) -> Span<'static> {
        match &self.comparison {
            Comparison::Diverged(d) => Span::styled(
                format!(" Line {} differs ", d.line),
                Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
            ),
            Comparison::Identical { compared } => Span::styled(
                format!(" Identical over {} lines ", compared),
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ),
        }
    }
}

/// Opens the viewer on the terminal until the user quits.
pub fn view<P: AsRef<Path>, Q: AsRef<Path>>(expected: P, actual: Q) -> Result<(), TraceError> {
    let (expected, actual) = (expected.as_ref(), actual.as_ref());
    let read = |path: &Path| {
        fs::read(path).map_err(|source| TraceError::Open { path: path.to_path_buf(), source })
    };
    let buf_a = read(expected)?;
    let buf_b = read(actual)?;

    let comparison = compare_lines(buf_a.as_slice(), buf_b.as_slice()).map_err(TraceError::Read)?;
    let rows = build_rows(&String::from_utf8_lossy(&buf_a), &String::from_utf8_lossy(&buf_b));
    debug!(rows = rows.len(), identical = comparison.is_identical(), "opening viewer");
    let mut app = App { rows, comparison, scroll: 0, mode: Mode::View, goto_input: String::new() };

    with_terminal(|term| run(term, &mut app)).map_err(TraceError::Terminal)
}

/// Raw mode and the alternate screen are restored even if `body` fails.
fn with_terminal<F>(body: F) -> io::Result<()>
where
    F: FnOnce(&mut Terminal<CrosstermBackend<io::Stdout>>) -> io::Result<()>,
{
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut term = Terminal::new(backend)?;

    let res = body(&mut term);

    terminal::disable_raw_mode()?;
    execute!(term.backend_mut(), DisableMouseCapture, LeaveAlternateScreen)?;
    term.show_cursor()?;
    res
}

fn run(term: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> io::Result<()> {
    let mut page = 1;

    loop {
        let mut should_quit = false;

        term.draw(|f: &mut Frame| {
            let rows = if matches!(app.mode, Mode::Goto) {
                Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(3), Constraint::Length(2)])
                    .split(f.size())
                    .to_vec()
            } else {
                Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Length(1), Constraint::Min(1), Constraint::Length(2)])
                    .split(f.size())
                    .to_vec()
            };

            f.render_widget(Paragraph::new(Line::from(app.status())), rows[0]);

            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(rows[1]);
            page = panes[0].height.saturating_sub(2).max(1) as usize;

            draw_side(f, panes[0], &app.rows, "Expected", app.scroll, |r| r.expected.as_deref());
            draw_side(f, panes[1], &app.rows, "Actual", app.scroll, |r| r.actual.as_deref());

            if matches!(app.mode, Mode::Goto) {
                let prompt = Paragraph::new(Line::from(vec![
                    Span::styled("Goto line: ", Style::default().fg(Color::Yellow)),
                    Span::raw(&app.goto_input),
                ]))
                    .block(Block::default().borders(Borders::ALL).title("Input"));
                f.render_widget(prompt, rows[2]);
            }

            let help = Line::from(vec![
                Span::styled("↑/k", Style::default().fg(Color::Cyan)), Span::raw(" Scroll   "),
                Span::styled("d", Style::default().fg(Color::Cyan)), Span::raw(" Divergence   "),
                Span::styled("g", Style::default().fg(Color::Cyan)), Span::raw(" Goto   "),
                Span::styled("q", Style::default().fg(Color::Cyan)), Span::raw(" Quit"),
            ]);
            let bar = Paragraph::new(help).block(Block::default().borders(Borders::TOP));
            if let Some(help_area) = rows.last() {
                f.render_widget(bar, *help_area);
            }
        })?;

        let last = app.rows.len().saturating_sub(1);
        if event::poll(Duration::from_millis(50))? {
            match event::read()? {
                Event::Key(k) if k.kind == KeyEventKind::Press => match app.mode {
                    Mode::View => match k.code {
                        KeyCode::Char('q') => should_quit = true,
                        KeyCode::Up | KeyCode::Char('k') => app.scroll = app.scroll.saturating_sub(1),
                        KeyCode::Down | KeyCode::Char('j') => app.scroll = cmp::min(app.scroll + 1, last),
                        KeyCode::PageUp => app.scroll = app.scroll.saturating_sub(page),
                        KeyCode::PageDown => app.scroll = cmp::min(app.scroll + page, last),
                        KeyCode::Char('d') => app.jump_to_divergence(),
                        KeyCode::Char('g') | KeyCode::Char('G') => { app.mode = Mode::Goto; app.goto_input.clear(); }
                        _ => {}
                    },
                    Mode::Goto => match k.code {
                        KeyCode::Esc => app.mode = Mode::View,
                        KeyCode::Enter => if app.try_jump() { app.mode = Mode::View },
                        KeyCode::Backspace => { app.goto_input.pop(); },
                        KeyCode::Char(c) => app.goto_input.push(c),
                        _ => {}
                    },
                },
                Event::Mouse(m) if matches!(app.mode, Mode::View) => match m.kind {
                    MouseEventKind::ScrollUp => app.scroll = app.scroll.saturating_sub(1),
                    MouseEventKind::ScrollDown => app.scroll = cmp::min(app.scroll + 1, last),
                    _ => {}
                },
                _ => {}
            }
        }

        if should_quit { break; }
    }

    Ok(())
}

/// Draws one side of the log at `area`; mismatching rows are red.
fn draw_side(
    f: &mut Frame,
    area: Rect,
    rows: &[Row],
    title: &str,
    scroll: usize,
    pick: impl Fn(&Row) -> Option<&str>,
) {
    let max_rows = area.height.saturating_sub(2) as usize;
    let start = cmp::min(scroll, rows.len().saturating_sub(max_rows));
    let slice = &rows[start..cmp::min(start + max_rows, rows.len())];

    let header = Span::styled(
        format!(" {} ", title),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    );
    let block = Block::default().borders(Borders::ALL).title(header);

    let body: Vec<Line> = slice
        .iter()
        .map(|r| {
            let (text, fg) = match pick(r) {
                Some(t) if r.differs => (t.to_string(), Color::Red),
                Some(t) => (t.to_string(), Color::White),
                None => ("~".to_string(), Color::DarkGray),
            };
            Line::from(vec![
                Span::styled(format!("{:>6}", r.number), Style::default().fg(Color::DarkGray)),
                Span::raw("  "),
                Span::styled(text, Style::default().fg(fg)),
            ])
        })
        .collect();

    let paragraph = Paragraph::new(body).block(block);
    f.render_widget(paragraph, area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_flag_mismatches_and_pad_short_side() {
        let rows = build_rows("a\nb\nc\n", "a\nB  \n");
        assert_eq!(rows.len(), 3);
        assert!(!rows[0].differs);
        assert!(rows[1].differs);
        assert_eq!(rows[1].actual.as_deref(), Some("B"));
        assert_eq!(rows[2], Row { number: 3, expected: Some("c".into()), actual: None, differs: false });
    }

    #[test]
    fn missing_log_fails_before_touching_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("expected.log");
        fs::write(&present, "C000 A:00 X:00 Y:00 P:24 S:FD\n").unwrap();

        let err = view(&present, dir.path().join("actual.log")).unwrap_err();
        assert!(matches!(err, TraceError::Open { .. }));
    }

    #[test]
    fn goto_is_one_based() {
        assert_eq!(parse_goto("1"), Some(0));
        assert_eq!(parse_goto(" 42 "), Some(41));
        assert_eq!(parse_goto("0"), None);
        assert_eq!(parse_goto("x"), None);
    }

    #[test]
    fn divergence_jump_targets_first_mismatch() {
        let (a, b) = ("x\ny\nz\n", "x\ny\nQ\n");
        let mut app = App {
            rows: build_rows(a, b),
            comparison: compare_lines(a.as_bytes(), b.as_bytes()).unwrap(),
            scroll: 0,
            mode: Mode::View,
            goto_input: String::new(),
        };
        app.jump_to_divergence();
        assert_eq!(app.scroll, 2);
        assert!(app.rows[app.scroll].differs);
    }
}
