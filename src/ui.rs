use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthChar;

use crate::app::{App, SettingsRow, SETTINGS_ROWS};
use crate::celebration::{Effects, PALETTE_LEN};
use crate::modes::redact;
use crate::session::Phase;
use crate::settings::GoalType;
use crate::stats::format_duration;

const SIDEBAR_WIDTH: u16 = 30;
const PLACEHOLDER: &str = "Start writing your thoughts here... Let the words flow freely.";
const PALETTE: [Color; PALETTE_LEN] = [
    Color::Red,
    Color::Yellow,
    Color::Green,
    Color::Cyan,
    Color::Blue,
    Color::Magenta,
    Color::LightYellow,
];

/// Text laid out into screen rows with the cursor's row and column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Wrapped {
    pub lines: Vec<String>,
    pub cursor_row: usize,
    pub cursor_col: usize,
}

/// Hard-wrap `text` at `width` columns. Tabs show as a single space.
pub fn wrap_text(text: &str, cursor: usize, width: usize) -> Wrapped {
    let width = width.max(1);
    let mut lines = vec![String::new()];
    let mut col = 0;
    let mut cursor_pos = None;

    for (i, ch) in text.chars().enumerate() {
        if ch == '\n' {
            if i == cursor {
                cursor_pos = Some((lines.len() - 1, col));
            }
            lines.push(String::new());
            col = 0;
            continue;
        }
        let ch = if ch == '\t' { ' ' } else { ch };
        let w = ch.width().unwrap_or(0);
        if col + w > width && col > 0 {
            lines.push(String::new());
            col = 0;
        }
        if i == cursor {
            cursor_pos = Some((lines.len() - 1, col));
        }
        if let Some(line) = lines.last_mut() {
            line.push(ch);
        }
        col += w;
    }

    let (cursor_row, cursor_col) = cursor_pos.unwrap_or_else(|| {
        if col >= width {
            (lines.len(), 0)
        } else {
            (lines.len() - 1, col)
        }
    });
    Wrapped {
        lines,
        cursor_row,
        cursor_col,
    }
}

/// Rectangle of at most `width` x `height` centered in `area`
pub fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let w = width.min(area.width);
    let h = height.min(area.height);
    Rect {
        x: area.x + (area.width - w) / 2,
        y: area.y + (area.height - h) / 2,
        width: w,
        height: h,
    }
}

pub fn draw(app: &mut App, f: &mut Frame) {
    let area = f.area();
    app.effects.resize(area.width, area.height);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(3),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(app, f, rows[0]);

    let show_stats = app.session.settings().show_stats && rows[1].width > SIDEBAR_WIDTH * 2;
    let body = if show_stats {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(20), Constraint::Length(SIDEBAR_WIDTH)])
            .split(rows[1])
    } else {
        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(1)])
            .split(rows[1])
    };

    let cursor = render_writing_area(app, f, body[0]);
    app.cursor_cell = cursor;
    if show_stats {
        render_stats(app, f, body[1]);
    }
    render_footer(app, f, rows[2]);
    render_effects(&app.effects, f.buffer_mut(), area);

    if app.session.settings_open() {
        render_settings_panel(app, f, area);
    }
    if app.session.reset_pending() {
        render_reset_confirm(f, area);
    } else if let (false, Some(pos)) = (app.session.settings_open(), cursor) {
        f.set_cursor_position(pos);
    }
}

fn render_header(app: &App, f: &mut Frame, area: Rect) {
    let bold = Style::default().add_modifier(Modifier::BOLD);
    let dim = Style::default().add_modifier(Modifier::DIM);
    let mut spans = vec![
        Span::styled(" writeflow", bold),
        Span::styled("  Focus. Write. Flow.", dim),
        Span::raw("   "),
        Span::styled(app.phase_label(), Style::default().fg(Color::Cyan)),
    ];
    if app.session.is_locked() {
        spans.push(Span::styled(
            "  [settings locked]",
            Style::default().fg(Color::Yellow),
        ));
    }
    if app.session.has_unsaved_text() {
        spans.push(Span::styled("  [unsaved]", dim));
    }
    f.render_widget(Paragraph::new(Line::from(spans)), area);
}

/// Returns the screen cell of the text cursor, if it is visible
fn render_writing_area(app: &App, f: &mut Frame, area: Rect) -> Option<(u16, u16)> {
    let settings = app.session.settings();
    let mut block = Block::default().borders(Borders::ALL).title(" draft ");
    if settings.redact_mode {
        block = block.title(Line::from(" redacted ").alignment(Alignment::Right));
    }
    let inner = block.inner(area);
    f.render_widget(block, area);
    if inner.width == 0 || inner.height == 0 {
        return None;
    }

    let buffer = app.session.buffer();
    if buffer.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                PLACEHOLDER,
                Style::default()
                    .add_modifier(Modifier::DIM)
                    .add_modifier(Modifier::ITALIC),
            ))
            .wrap(Wrap { trim: true }),
            inner,
        );
        return Some((inner.x, inner.y));
    }

    let shown = if settings.redact_mode {
        redact(buffer.as_str(), buffer.cursor())
    } else {
        buffer.as_str().to_string()
    };
    let wrapped = wrap_text(&shown, buffer.cursor(), usize::from(inner.width));
    let height = usize::from(inner.height);
    let scroll = wrapped.cursor_row.saturating_sub(height - 1);

    let lines: Vec<Line> = wrapped
        .lines
        .iter()
        .skip(scroll)
        .take(height)
        .map(|l| Line::from(l.as_str()))
        .collect();
    f.render_widget(Paragraph::new(lines), inner);

    let row = u16::try_from(wrapped.cursor_row - scroll).ok()?;
    let col = u16::try_from(wrapped.cursor_col).ok()?;
    (col < inner.width && row < inner.height).then_some((inner.x + col, inner.y + row))
}

fn render_stats(app: &App, f: &mut Frame, area: Rect) {
    let stats = app.session.stats();
    let block = Block::default().borders(Borders::ALL).title(" stats ");
    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(0),
        ])
        .split(inner);

    let label = Style::default().add_modifier(Modifier::DIM);
    let value = Style::default().add_modifier(Modifier::BOLD);
    let row = |name: &str, v: String| {
        Line::from(vec![
            Span::styled(format!("{name:<10}"), label),
            Span::styled(v, value),
        ])
    };
    let goal_kind = match stats.goal_type {
        GoalType::Words => "words",
        GoalType::Timer => "timer",
    };
    let lines = vec![
        row("words", stats.word_count.to_string()),
        row("chars", stats.character_count.to_string()),
        row("session", format_duration(stats.session_duration)),
        row("goal", goal_kind.to_string()),
        row("target", stats.goal_summary()),
    ];
    f.render_widget(Paragraph::new(lines), chunks[0]);

    let ratio = (stats.displayed_progress() / 100.0).clamp(0.0, 1.0);
    let gauge_color = if stats.goal_reached_count > 0 {
        Color::Green
    } else {
        Color::Blue
    };
    f.render_widget(
        Gauge::default()
            .gauge_style(Style::default().fg(gauge_color))
            .ratio(ratio)
            .label(format!("{:.1}%", stats.daily_progress)),
        chunks[2],
    );

    if stats.goal_reached_count > 0 {
        let laps = if stats.goal_reached_count == 1 {
            "Goal reached!".to_string()
        } else {
            format!("Goal reached x{}", stats.goal_reached_count)
        };
        f.render_widget(
            Paragraph::new(Span::styled(
                laps,
                Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
            ))
            .alignment(Alignment::Center),
            chunks[3],
        );
    }
}

fn render_footer(app: &App, f: &mut Frame, area: Rect) {
    let line = match &app.notice {
        Some(n) => Line::from(Span::styled(
            format!(" {}", n.message),
            Style::default().fg(Color::Yellow),
        )),
        None => {
            let (line, col) = app.session.buffer().cursor_line_col();
            Line::from(Span::styled(
                format!(
                    " ln {}, col {}   ^S settings  ^T stats  ^R reset  ^Q quit",
                    line + 1,
                    col + 1
                ),
                Style::default().add_modifier(Modifier::DIM),
            ))
        }
    };
    f.render_widget(Paragraph::new(line), area);
}

fn render_settings_panel(app: &App, f: &mut Frame, area: Rect) {
    let settings = app.session.settings();
    let locked = settings.settings_locked;
    let rect = centered(area, 48, SETTINGS_ROWS.len() as u16 + 7);
    f.render_widget(Clear, rect);

    let title = if locked {
        " settings [locked] "
    } else {
        " settings "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .title(title)
        .border_style(Style::default().fg(if locked { Color::Yellow } else { Color::Cyan }));
    let inner = block.inner(rect);
    f.render_widget(block, rect);

    let selected_style = Style::default().add_modifier(Modifier::REVERSED);
    let disabled = Style::default().add_modifier(Modifier::DIM);
    let mut lines: Vec<Line> = SETTINGS_ROWS
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let value = match (&app.panel.goal_input, i == app.panel.selected) {
                (Some(input), true) => format!("{input}_"),
                _ => row.value(settings),
            };
            let text = match row {
                SettingsRow::StartSession => {
                    if app.session.stats().goal_met() && settings.session_started {
                        " > Start new session".to_string()
                    } else {
                        " > Start writing session".to_string()
                    }
                }
                _ => format!(" {:<22}{:>20}", row.to_string(), value),
            };
            let mut style = Style::default();
            if locked {
                style = style.patch(disabled);
            }
            if i == app.panel.selected {
                style = style.patch(selected_style);
            }
            Line::from(Span::styled(text, style))
        })
        .collect();

    lines.push(Line::raw(""));
    let hint = match app.session.phase() {
        Phase::Active { goal_met: false } => {
            "Session in progress. Settings unlock when you reach your goal."
        }
        Phase::Active { goal_met: true } => {
            "Congratulations! You can configure a new session."
        }
        Phase::FirstVisitSetup => "Pick a goal, then start a session. Settings lock until you reach it.",
        Phase::Configuring => "Settings will lock until you reach your goal.",
    };
    lines.push(Line::from(Span::styled(hint, disabled)));
    lines.push(Line::from(Span::styled(
        " ↑↓ move  space toggle  digits+enter goal  s start  esc close",
        disabled,
    )));

    f.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), inner);
}

fn render_reset_confirm(f: &mut Frame, area: Rect) {
    let rect = centered(area, 44, 5);
    f.render_widget(Clear, rect);
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" reset session ")
        .border_style(Style::default().fg(Color::Red));
    let text = vec![
        Line::from("Clear your text and end this session?"),
        Line::from(Span::styled(
            "y to reset, n to keep writing",
            Style::default().add_modifier(Modifier::BOLD),
        )),
    ];
    f.render_widget(
        Paragraph::new(text)
            .block(block)
            .alignment(Alignment::Center),
        rect,
    );
}

fn render_effects(effects: &Effects, buf: &mut Buffer, area: Rect) {
    for p in &effects.particles {
        if p.x < 0.0 || p.y < 0.0 {
            continue;
        }
        let (x, y) = (p.x.round() as u16, p.y.round() as u16);
        if x >= area.x + area.width || y >= area.y + area.height {
            continue;
        }
        if let Some(cell) = buf.cell_mut((x, y)) {
            cell.set_char(p.symbol)
                .set_style(Style::default().fg(PALETTE[p.color_index % PALETTE_LEN]));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use crate::config::AppConfig;
    use crate::session::WritingSession;
    use crate::storage::{MemoryStore, Persistence};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::{backend::TestBackend, Terminal};
    use std::sync::Arc;

    fn app() -> App {
        let session = WritingSession::load(
            Persistence::probe(Box::new(MemoryStore::new())),
            Arc::new(ManualTime::new(0)),
            &AppConfig::default(),
        );
        App::new(session)
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        let buf = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buf.area.height {
            for x in 0..buf.area.width {
                out.push_str(buf[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn wraps_at_width_and_tracks_cursor() {
        let w = wrap_text("abcdefgh", 8, 3);
        assert_eq!(w.lines, vec!["abc", "def", "gh"]);
        assert_eq!((w.cursor_row, w.cursor_col), (2, 2));

        let w = wrap_text("abcdef", 3, 3);
        assert_eq!((w.cursor_row, w.cursor_col), (1, 0));

        let w = wrap_text("abc", 3, 3);
        assert_eq!((w.cursor_row, w.cursor_col), (1, 0));
    }

    #[test]
    fn newlines_start_new_rows() {
        let w = wrap_text("ab\n\ncd", 2, 10);
        assert_eq!(w.lines, vec!["ab", "", "cd"]);
        assert_eq!((w.cursor_row, w.cursor_col), (0, 2));
        let w = wrap_text("ab\n", 3, 10);
        assert_eq!((w.cursor_row, w.cursor_col), (1, 0));
    }

    #[test]
    fn wide_chars_take_two_columns() {
        let w = wrap_text("日本語", 3, 4);
        assert_eq!(w.lines, vec!["日本", "語"]);
        assert_eq!((w.cursor_row, w.cursor_col), (1, 2));
    }

    #[test]
    fn centered_rect_fits_inside() {
        let area = Rect::new(0, 0, 20, 10);
        assert_eq!(centered(area, 10, 4), Rect::new(5, 3, 10, 4));
        assert_eq!(centered(area, 50, 50), area);
    }

    #[test]
    fn first_visit_shows_settings_panel() {
        let mut app = app();
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        let screen = screen_text(&terminal);
        assert!(screen.contains("settings"));
        assert!(screen.contains("Start writing session"));
        assert!(screen.contains("welcome"));
    }

    #[test]
    fn writing_view_shows_text_stats_and_cursor() {
        let mut app = app();
        app.on_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));
        for c in "hello world".chars() {
            app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        let screen = screen_text(&terminal);
        assert!(screen.contains("hello world"));
        assert!(screen.contains("2 / 500 words"));
        assert!(screen.contains("[settings locked]"));
        assert_eq!(app.cursor_cell, Some((12, 2)));
    }

    #[test]
    fn redact_mode_masks_finished_words() {
        let mut app = app();
        app.session.apply_settings(&crate::settings::SettingsPatch {
            redact_mode: Some(true),
            ..Default::default()
        });
        app.on_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));
        for c in "secret dra".chars() {
            app.on_key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        }
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        let screen = screen_text(&terminal);
        assert!(!screen.contains("secret"));
        assert!(screen.contains("•••••• dra"));
    }

    #[test]
    fn reset_confirmation_is_drawn() {
        let mut app = app();
        app.on_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::NONE));
        app.on_key(KeyEvent::new(KeyCode::Char('x'), KeyModifiers::NONE));
        app.on_key(KeyEvent::new(KeyCode::Char('r'), KeyModifiers::CONTROL));
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
        assert!(screen_text(&terminal).contains("y to reset"));
    }
}
