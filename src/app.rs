use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::celebration::Effects;
use crate::modes::{Blocked, EditAction};
use crate::session::{PatchOutcome, Phase, ResetRequest, SessionEvent, WritingSession};
use crate::settings::{parse_goal, GoalType, Settings, SettingsPatch};

/// How long a footer notice stays up, in ticks
const NOTICE_TICKS: u32 = 25;

/// Rows of the settings panel, top to bottom
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum SettingsRow {
    #[strum(serialize = "Goal type")]
    GoalType,
    #[strum(serialize = "Word goal")]
    WordGoal,
    #[strum(serialize = "Timer goal (min)")]
    TimerGoal,
    #[strum(serialize = "Show stats")]
    ShowStats,
    #[strum(serialize = "Redact mode")]
    Redact,
    #[strum(serialize = "No-delete mode")]
    NoDelete,
    #[strum(serialize = "No-copy-paste mode")]
    NoCopyPaste,
    #[strum(serialize = "Start session")]
    StartSession,
}

pub const SETTINGS_ROWS: [SettingsRow; 8] = [
    SettingsRow::GoalType,
    SettingsRow::WordGoal,
    SettingsRow::TimerGoal,
    SettingsRow::ShowStats,
    SettingsRow::Redact,
    SettingsRow::NoDelete,
    SettingsRow::NoCopyPaste,
    SettingsRow::StartSession,
];

impl SettingsRow {
    fn is_goal_input(self) -> bool {
        matches!(self, SettingsRow::WordGoal | SettingsRow::TimerGoal)
    }

    /// Patch that flips this row, for the toggle rows
    fn toggle_patch(self, s: &Settings) -> Option<SettingsPatch> {
        let mut patch = SettingsPatch::default();
        match self {
            SettingsRow::GoalType => patch.goal_type = Some(s.goal_type.toggled()),
            SettingsRow::ShowStats => patch.show_stats = Some(!s.show_stats),
            SettingsRow::Redact => patch.redact_mode = Some(!s.redact_mode),
            SettingsRow::NoDelete => patch.no_delete_mode = Some(!s.no_delete_mode),
            SettingsRow::NoCopyPaste => patch.no_copy_paste_mode = Some(!s.no_copy_paste_mode),
            SettingsRow::WordGoal | SettingsRow::TimerGoal | SettingsRow::StartSession => {
                return None
            }
        }
        Some(patch)
    }

    /// Current value as shown in the panel
    pub fn value(self, s: &Settings) -> String {
        let on_off = |b: bool| (if b { "on" } else { "off" }).to_string();
        match self {
            SettingsRow::GoalType => match s.goal_type {
                GoalType::Words => "words".into(),
                GoalType::Timer => "timer".into(),
            },
            SettingsRow::WordGoal => s.daily_word_goal.to_string(),
            SettingsRow::TimerGoal => s.daily_timer_goal.to_string(),
            SettingsRow::ShowStats => on_off(s.show_stats),
            SettingsRow::Redact => on_off(s.redact_mode),
            SettingsRow::NoDelete => on_off(s.no_delete_mode),
            SettingsRow::NoCopyPaste => on_off(s.no_copy_paste_mode),
            SettingsRow::StartSession => String::new(),
        }
    }
}

#[derive(Debug, Default)]
pub struct PanelState {
    pub selected: usize,
    /// Digits typed into a goal row, not yet committed
    pub goal_input: Option<String>,
}

impl PanelState {
    pub fn row(&self) -> SettingsRow {
        SETTINGS_ROWS[self.selected.min(SETTINGS_ROWS.len() - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub message: String,
    ticks_left: u32,
}

#[derive(Debug)]
pub struct App {
    pub session: WritingSession,
    pub panel: PanelState,
    pub effects: Effects,
    pub notice: Option<Notice>,
    /// Screen cell of the text cursor from the last draw
    pub cursor_cell: Option<(u16, u16)>,
    pub should_quit: bool,
    /// Goal crossings seen by the shell, for the stats sidebar
    pub celebrations: u32,
}

impl App {
    pub fn new(session: WritingSession) -> Self {
        let mut app = Self {
            session,
            panel: PanelState::default(),
            effects: Effects::default(),
            notice: None,
            cursor_cell: None,
            should_quit: false,
            celebrations: 0,
        };
        app.drain_session_events();
        app
    }

    pub fn notify(&mut self, message: impl Into<String>) {
        self.notice = Some(Notice {
            message: message.into(),
            ticks_left: NOTICE_TICKS,
        });
    }

    /// Timer tick: run due session tasks and advance the animation.
    pub fn on_tick(&mut self, dt_secs: f64) {
        self.session.tick();
        self.effects.update(dt_secs);
        if let Some(n) = self.notice.as_mut() {
            n.ticks_left = n.ticks_left.saturating_sub(1);
            if n.ticks_left == 0 {
                self.notice = None;
            }
        }
        self.drain_session_events();
    }

    fn drain_session_events(&mut self) {
        for event in self.session.take_events() {
            match event {
                SessionEvent::GoalReached { .. } => {
                    self.celebrations += 1;
                    self.effects.celebrate();
                }
                SessionEvent::SettingsUnlocked => {
                    self.notify("Goal reached! Settings are unlocked.");
                }
                SessionEvent::SessionResumed { .. } => {
                    self.notify("Welcome back, your session is still running.");
                }
                SessionEvent::SessionStarted | SessionEvent::ResetApplied => {
                    self.panel = PanelState::default();
                }
            }
        }
    }

    pub fn on_paste(&mut self, text: String) {
        if self.session.reset_pending() {
            return;
        }
        if self.session.settings_open() {
            if self.panel.row().is_goal_input() {
                let digits: String = text.chars().filter(|c| c.is_ascii_digit()).collect();
                self.panel.goal_input.get_or_insert_with(String::new).push_str(&digits);
            }
            return;
        }
        self.apply_edit(EditAction::Paste(text));
    }

    pub fn on_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl && key.code == KeyCode::Char('q') {
            self.should_quit = true;
        } else if self.session.reset_pending() {
            self.on_confirm_key(key);
        } else if ctrl && key.code == KeyCode::Char('r') {
            self.request_reset();
        } else if self.session.settings_open() {
            self.on_panel_key(key);
        } else {
            self.on_writing_key(key);
        }
        self.drain_session_events();
    }

    fn request_reset(&mut self) {
        self.panel.goal_input = None;
        if self.session.request_reset() == ResetRequest::Applied {
            self.notify("Session reset.");
        }
    }

    fn on_confirm_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                self.session.confirm_reset();
                self.effects.clear();
                self.notify("Session reset.");
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => self.session.cancel_reset(),
            _ => {}
        }
    }

    fn on_writing_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        let action = match key.code {
            KeyCode::Char('s') | KeyCode::Char(',') if ctrl => {
                self.session.open_settings();
                return;
            }
            KeyCode::Char('t') if ctrl => {
                let patch = SettingsPatch::show_stats(!self.session.settings().show_stats);
                self.apply_patch(&patch);
                return;
            }
            KeyCode::Char('c') if ctrl => EditAction::Copy,
            KeyCode::Char('x') if ctrl => EditAction::Cut,
            KeyCode::Char('v') if ctrl => {
                // Terminals deliver pastes as bracketed paste events.
                if self.apply_edit(EditAction::Paste(String::new())) {
                    self.notify("Paste with your terminal's paste shortcut.");
                }
                return;
            }
            KeyCode::Char('a') if ctrl => EditAction::SelectAll,
            KeyCode::Char(_) if ctrl => return,
            KeyCode::Char(c) => EditAction::Insert(c),
            KeyCode::Enter => EditAction::Newline,
            KeyCode::Tab => EditAction::Insert('\t'),
            KeyCode::Backspace => EditAction::Backspace,
            KeyCode::Delete => EditAction::Delete,
            KeyCode::Left => EditAction::CursorLeft,
            KeyCode::Right => EditAction::CursorRight,
            KeyCode::Home => EditAction::CursorHome,
            KeyCode::End => EditAction::CursorEnd,
            KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            _ => return,
        };
        let spark = matches!(action, EditAction::Insert(c) if !c.is_whitespace());
        if self.apply_edit(action) && spark {
            if let Some((x, y)) = self.cursor_cell {
                self.effects.burst(x, y);
            }
        }
    }

    fn apply_edit(&mut self, action: EditAction) -> bool {
        match self.session.edit(action) {
            Ok(()) => true,
            Err(blocked) => {
                self.notify(blocked_message(blocked));
                false
            }
        }
    }

    fn apply_patch(&mut self, patch: &SettingsPatch) {
        if self.session.apply_settings(patch) == PatchOutcome::Locked {
            self.notify("Settings are locked until you reach your goal.");
        }
    }

    fn on_panel_key(&mut self, key: KeyEvent) {
        let row = self.panel.row();
        if row.is_goal_input() && self.on_goal_input_key(row, key) == Some(true) {
            return;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.panel.goal_input = None;
                self.panel.selected = self.panel.selected.saturating_sub(1);
            }
            KeyCode::Down | KeyCode::Char('j') | KeyCode::Tab => {
                self.panel.goal_input = None;
                self.panel.selected = (self.panel.selected + 1).min(SETTINGS_ROWS.len() - 1);
            }
            KeyCode::Char('s') => self.start_session(),
            KeyCode::Enter | KeyCode::Char(' ') => match row {
                SettingsRow::StartSession => self.start_session(),
                _ => {
                    if let Some(patch) = row.toggle_patch(self.session.settings()) {
                        self.apply_patch(&patch);
                    }
                }
            },
            KeyCode::Esc => {
                if !self.session.close_settings() {
                    self.notify("Start a session to begin writing.");
                }
            }
            _ => {}
        }
    }

    /// Digit entry on a goal row. `Some(true)` when the key was consumed,
    /// `None` to let the generic panel handling see it.
    fn on_goal_input_key(&mut self, row: SettingsRow, key: KeyEvent) -> Option<bool> {
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => {
                if self.session.is_locked() {
                    self.notify("Settings are locked until you reach your goal.");
                } else {
                    self.panel.goal_input.get_or_insert_with(String::new).push(c);
                }
                Some(true)
            }
            KeyCode::Backspace => {
                if let Some(input) = self.panel.goal_input.as_mut() {
                    input.pop();
                }
                Some(true)
            }
            KeyCode::Esc if self.panel.goal_input.is_some() => {
                self.panel.goal_input = None;
                Some(true)
            }
            KeyCode::Enter => {
                let input = self.panel.goal_input.take()?;
                match parse_goal(&input) {
                    Ok(goal) => {
                        let patch = match row {
                            SettingsRow::WordGoal => SettingsPatch::word_goal(goal),
                            _ => SettingsPatch::timer_goal(goal),
                        };
                        self.apply_patch(&patch);
                    }
                    Err(e) => self.notify(e.to_string()),
                }
                Some(true)
            }
            _ => None,
        }
    }

    fn start_session(&mut self) {
        self.panel.goal_input = None;
        if !self.session.start_session() {
            self.notify("A session is already running.");
        }
    }

    /// Short status for the header
    pub fn phase_label(&self) -> &'static str {
        match self.session.phase() {
            Phase::FirstVisitSetup => "welcome",
            Phase::Configuring => "not started",
            Phase::Active { goal_met: false } => "writing · locked",
            Phase::Active { goal_met: true } => "goal reached",
        }
    }

    /// Tear down: flush everything synchronously
    pub fn shutdown(&mut self) {
        self.session.shutdown();
    }
}

fn blocked_message(blocked: Blocked) -> String {
    format!("Blocked: {blocked}.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualTime;
    use crate::config::AppConfig;
    use crate::storage::{MemoryStore, Persistence};
    use std::sync::Arc;

    fn app() -> (App, ManualTime) {
        let time = ManualTime::new(1_700_000_000_000);
        let session = WritingSession::load(
            Persistence::probe(Box::new(MemoryStore::new())),
            Arc::new(time.clone()),
            &AppConfig::default(),
        );
        (App::new(session), time)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn select(app: &mut App, row: SettingsRow) {
        app.panel.selected = SETTINGS_ROWS.iter().position(|r| *r == row).unwrap();
    }

    fn type_str(app: &mut App, s: &str) {
        for c in s.chars() {
            app.on_key(key(KeyCode::Char(c)));
        }
    }

    #[test]
    fn first_visit_panel_cannot_be_escaped() {
        let (mut app, _) = app();
        assert!(app.session.settings_open());
        app.on_key(key(KeyCode::Esc));
        assert!(app.session.settings_open());
        assert!(app.notice.is_some());
        assert!(!app.should_quit);
    }

    #[test]
    fn goal_entry_commits_valid_numbers_only() {
        let (mut app, _) = app();
        select(&mut app, SettingsRow::WordGoal);
        type_str(&mut app, "750");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.settings().daily_word_goal.get(), 750);

        type_str(&mut app, "0");
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.settings().daily_word_goal.get(), 750);
        assert!(app.notice.as_ref().unwrap().message.contains("positive"));
    }

    #[test]
    fn start_session_from_panel_then_write() {
        let (mut app, _) = app();
        select(&mut app, SettingsRow::StartSession);
        app.on_key(key(KeyCode::Enter));
        assert!(!app.session.settings_open());
        assert!(app.session.is_locked());
        type_str(&mut app, "hello world");
        assert_eq!(app.session.text(), "hello world");
        assert_eq!(app.session.stats().word_count, 2);
        assert_eq!(app.phase_label(), "writing · locked");
    }

    #[test]
    fn locked_toggles_show_a_notice_and_change_nothing() {
        let (mut app, _) = app();
        app.on_key(key(KeyCode::Char('s')));
        app.on_key(ctrl('t'));
        assert!(app.session.settings().show_stats);
        assert!(app.notice.as_ref().unwrap().message.contains("locked"));

        app.on_key(ctrl('s'));
        select(&mut app, SettingsRow::Redact);
        app.on_key(key(KeyCode::Char(' ')));
        assert!(!app.session.settings().redact_mode);
    }

    #[test]
    fn reset_with_text_asks_first() {
        let (mut app, _) = app();
        app.on_key(key(KeyCode::Char('s')));
        type_str(&mut app, "draft");
        app.on_key(ctrl('r'));
        assert!(app.session.reset_pending());
        app.on_key(key(KeyCode::Char('n')));
        assert_eq!(app.session.text(), "draft");

        app.on_key(ctrl('r'));
        app.on_key(key(KeyCode::Char('y')));
        assert_eq!(app.session.text(), "");
        assert!(app.session.settings_open());
        assert_eq!(app.phase_label(), "not started");
    }

    #[test]
    fn goal_crossing_starts_the_celebration_once() {
        let (mut app, time) = app();
        select(&mut app, SettingsRow::WordGoal);
        type_str(&mut app, "2");
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('s')));
        type_str(&mut app, "one two three four");
        assert_eq!(app.celebrations, 1);
        assert!(app.effects.is_celebrating());
        assert_eq!(app.phase_label(), "goal reached");
        time.advance_secs(1);
        app.on_tick(0.1);
        assert_eq!(app.celebrations, 1);
    }

    #[test]
    fn no_copy_paste_blocks_paste_events() {
        let (mut app, _) = app();
        select(&mut app, SettingsRow::NoCopyPaste);
        app.on_key(key(KeyCode::Enter));
        app.on_key(key(KeyCode::Char('s')));
        app.on_paste("a whole essay".into());
        assert_eq!(app.session.text(), "");
        assert!(app.notice.as_ref().unwrap().message.contains("no-copy-paste"));
        app.on_key(ctrl('v'));
        assert_eq!(app.session.text(), "");
        assert!(app.notice.as_ref().unwrap().message.contains("no-copy-paste"));
    }

    #[test]
    fn ctrl_v_points_at_the_terminal_paste() {
        let (mut app, _) = app();
        app.on_key(key(KeyCode::Char('s')));
        app.on_key(ctrl('v'));
        assert_eq!(app.session.text(), "");
        assert!(app.notice.as_ref().unwrap().message.contains("paste shortcut"));
    }

    #[test]
    fn paste_into_goal_row_keeps_digits() {
        let (mut app, _) = app();
        select(&mut app, SettingsRow::TimerGoal);
        app.on_paste("4x5".into());
        app.on_key(key(KeyCode::Enter));
        assert_eq!(app.session.settings().daily_timer_goal.get(), 45);
    }

    #[test]
    fn ctrl_q_quits_from_anywhere() {
        let (mut app, _) = app();
        app.on_key(ctrl('q'));
        assert!(app.should_quit);
    }

    #[test]
    fn notices_expire() {
        let (mut app, _) = app();
        app.notify("hello");
        for _ in 0..NOTICE_TICKS {
            app.on_tick(0.1);
        }
        assert!(app.notice.is_none());
    }
}
