//! The writing session: settings, lock state, text, the session clock and
//! the autosave timers, driven one event at a time.
//!
//! Every entry point follows the same order: mutate, recompute stats, then
//! check for a goal crossing. Persistence is best-effort throughout; the
//! in-memory state is authoritative for the current run.

use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::autosave::{AutosavePolicy, Scheduler, TaskHandle, TaskKind};
use crate::clock::{Restore, SessionClock, TimeSource};
use crate::config::AppConfig;
use crate::editor::TextBuffer;
use crate::modes::{Blocked, EditAction, FocusModes};
use crate::settings::{Settings, SettingsPatch};
use crate::stats::WritingStats;
use crate::storage::Persistence;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Never started a session; settings stay open until one starts
    FirstVisitSetup,
    /// No session running, settings editable
    Configuring,
    /// Session running. Settings are locked until the goal is met.
    Active { goal_met: bool },
}

/// Things the shell may want to react to, in the order they happened
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SessionResumed { gap_ms: i64 },
    SessionStarted,
    /// Fired once per lock cycle on the first crossing of 100%
    GoalReached { laps: u32 },
    SettingsUnlocked,
    ResetApplied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied,
    Unchanged,
    /// Settings are locked; nothing changed
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequest {
    Applied,
    /// There is text to lose; call `confirm_reset` or `cancel_reset`
    NeedsConfirmation,
}

/// Cancel handles for the timers a session owns
#[derive(Debug, Default)]
struct SessionTasks {
    text_save: Option<TaskHandle>,
    checkpoint: Option<TaskHandle>,
    display: Option<TaskHandle>,
}

impl SessionTasks {
    fn drain(&mut self) -> impl Iterator<Item = TaskHandle> {
        [
            self.text_save.take(),
            self.checkpoint.take(),
            self.display.take(),
        ]
        .into_iter()
        .flatten()
    }
}

pub struct WritingSession {
    settings: Settings,
    buffer: TextBuffer,
    clock: SessionClock,
    time: Arc<dyn TimeSource>,
    persistence: Persistence,
    scheduler: Scheduler,
    tasks: SessionTasks,
    policy: AutosavePolicy,
    stats: WritingStats,
    first_visit_setup: bool,
    celebrated: bool,
    reset_pending: bool,
    settings_open: bool,
    torn_down: bool,
    events: VecDeque<SessionEvent>,
}

impl std::fmt::Debug for WritingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WritingSession")
            .field("phase", &self.phase())
            .field("settings", &self.settings)
            .field("stats", &self.stats)
            .field("persistence", &self.persistence)
            .finish()
    }
}

impl WritingSession {
    /// Bring a session up from whatever is persisted.
    pub fn load(persistence: Persistence, time: Arc<dyn TimeSource>, config: &AppConfig) -> Self {
        let now = time.now_ms();
        let stored = persistence.load_settings();
        let first_launch = stored.is_none();
        let mut settings = stored.unwrap_or_default();
        if !settings.is_consistent() {
            warn!("settings record locked without a started session, releasing lock");
            settings.settings_locked = false;
        }

        let text = persistence.load_text().unwrap_or_default();
        let clock = SessionClock::new(now);
        let mut events = VecDeque::new();

        if settings.session_started {
            if let Some(data) = persistence.load_session() {
                match clock.restore(&data, now, config.stale_session_ms()) {
                    Restore::Resumed { gap_ms } => {
                        info!(gap_ms, total_ms = clock.total_ms(), "resumed writing session");
                        events.push_back(SessionEvent::SessionResumed { gap_ms });
                    }
                    Restore::Stale { age_ms } => {
                        info!(age_ms, "session record too old, starting the clock fresh");
                    }
                }
            }
            clock.start(now);
        }

        let first_visit_setup = first_launch || (settings.is_first_visit && text.is_empty());
        let settings_open = first_visit_setup || !settings.session_started;
        let policy = AutosavePolicy::from(config);

        let mut session = Self {
            settings,
            buffer: TextBuffer::new(text),
            clock,
            time,
            persistence,
            scheduler: Scheduler::new(),
            tasks: SessionTasks::default(),
            policy,
            stats: WritingStats::default(),
            first_visit_setup,
            celebrated: false,
            reset_pending: false,
            settings_open,
            torn_down: false,
            events,
        };

        session.schedule_checkpoints(now);
        session.tasks.display = Some(session.scheduler.schedule_every(
            TaskKind::DisplayTick,
            now,
            session.policy.display_tick_ms,
        ));

        session.recompute();
        if session.settings.session_started {
            if !session.settings.settings_locked {
                // The lock only drops on a crossing, so this cycle has
                // celebrated even if progress has since fallen back.
                session.celebrated = true;
            } else if session.stats.goal_met() {
                session.celebrated = true;
                session.settings.settings_locked = false;
                session.persistence.save_settings(&session.settings);
            }
        }
        if first_launch {
            session.persistence.save_settings(&session.settings);
        }

        debug!(phase = ?session.phase(), "session loaded");
        session
    }

    fn now(&self) -> i64 {
        self.time.now_ms()
    }

    fn schedule_checkpoints(&mut self, now: i64) {
        self.tasks.checkpoint = Some(self.scheduler.schedule_every(
            TaskKind::SessionCheckpoint,
            now,
            self.policy.checkpoint_interval_ms,
        ));
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// True while an edit is waiting on the debounced text save
    pub fn has_unsaved_text(&self) -> bool {
        self.tasks
            .text_save
            .is_some_and(|handle| self.scheduler.is_live(handle))
    }

    pub fn stats(&self) -> &WritingStats {
        &self.stats
    }

    pub fn text(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn buffer(&self) -> &TextBuffer {
        &self.buffer
    }

    pub fn clock(&self) -> &SessionClock {
        &self.clock
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn focus_modes(&self) -> FocusModes {
        FocusModes::from(&self.settings)
    }

    pub fn is_locked(&self) -> bool {
        self.settings.settings_locked
    }

    pub fn phase(&self) -> Phase {
        if self.settings.session_started {
            Phase::Active {
                goal_met: !self.settings.settings_locked,
            }
        } else if self.first_visit_setup {
            Phase::FirstVisitSetup
        } else {
            Phase::Configuring
        }
    }

    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        self.events.drain(..).collect()
    }

    pub fn settings_open(&self) -> bool {
        self.settings_open
    }

    pub fn open_settings(&mut self) {
        self.settings_open = true;
    }

    /// The first-visit panel cannot be dismissed before a session starts.
    pub fn can_close_settings(&self) -> bool {
        !matches!(self.phase(), Phase::FirstVisitSetup)
    }

    pub fn close_settings(&mut self) -> bool {
        if self.can_close_settings() {
            self.settings_open = false;
        }
        !self.settings_open
    }

    fn recompute(&mut self) {
        let secs = self.clock.elapsed_secs(self.now());
        self.stats = WritingStats::compute(self.buffer.as_str(), secs, &self.settings);
    }

    /// Recompute, then fire the goal edge if this is the first crossing
    /// since the session locked.
    fn refresh(&mut self) {
        self.recompute();
        if !self.settings.session_started || self.celebrated || !self.stats.goal_met() {
            return;
        }
        self.celebrated = true;
        info!(
            progress = self.stats.daily_progress,
            laps = self.stats.goal_reached_count,
            "goal reached"
        );
        self.events.push_back(SessionEvent::GoalReached {
            laps: self.stats.goal_reached_count,
        });
        if self.settings.settings_locked {
            self.settings.settings_locked = false;
            self.persistence.save_settings(&self.settings);
            self.events.push_back(SessionEvent::SettingsUnlocked);
        }
    }

    /// Merge a settings patch. Rejected as a whole while locked.
    pub fn apply_settings(&mut self, patch: &SettingsPatch) -> PatchOutcome {
        if patch.is_empty() {
            return PatchOutcome::Unchanged;
        }
        if self.settings.settings_locked {
            debug!(?patch, "settings locked, patch ignored");
            return PatchOutcome::Locked;
        }
        if !self.settings.merge(patch) {
            return PatchOutcome::Unchanged;
        }
        self.persistence.save_settings(&self.settings);
        self.refresh();
        PatchOutcome::Applied
    }

    /// Lock settings and start timing a fresh run. Ignored while a locked
    /// session is already in progress.
    pub fn start_session(&mut self) -> bool {
        if self.settings.settings_locked {
            return false;
        }
        let now = self.now();
        self.settings.settings_locked = true;
        self.settings.session_started = true;
        self.settings.is_first_visit = false;
        self.first_visit_setup = false;
        self.celebrated = false;
        self.reset_pending = false;
        self.settings_open = false;
        self.clock.begin_fresh(now);

        self.persistence.save_settings(&self.settings);
        self.persistence.save_session(&self.clock.checkpoint(now));
        self.schedule_checkpoints(now);

        info!(goal_type = %self.settings.goal_type, goal = self.settings.active_goal(), "session started");
        self.events.push_back(SessionEvent::SessionStarted);
        self.refresh();
        true
    }

    /// Apply an edit from the writing surface, subject to focus modes.
    pub fn edit(&mut self, action: EditAction) -> Result<(), Blocked> {
        self.focus_modes().check(&action)?;
        let changed = match action {
            EditAction::Insert(c) => {
                self.buffer.insert_char(c);
                true
            }
            EditAction::Newline => {
                self.buffer.insert_char('\n');
                true
            }
            EditAction::Paste(s) => {
                self.buffer.insert_str(&s);
                !s.is_empty()
            }
            EditAction::Backspace => self.buffer.backspace(),
            EditAction::Delete => self.buffer.delete(),
            EditAction::CursorLeft => {
                self.buffer.move_left();
                false
            }
            EditAction::CursorRight => {
                self.buffer.move_right();
                false
            }
            EditAction::CursorHome => {
                self.buffer.move_home();
                false
            }
            EditAction::CursorEnd => {
                self.buffer.move_end();
                false
            }
            // No system clipboard behind the terminal surface.
            EditAction::Copy | EditAction::Cut | EditAction::SelectAll => false,
        };
        if changed {
            let now = self.now();
            self.tasks.text_save = Some(self.scheduler.schedule_once(
                TaskKind::TextSave,
                now,
                self.policy.text_debounce_ms,
            ));
            self.refresh();
        }
        Ok(())
    }

    pub fn reset_pending(&self) -> bool {
        self.reset_pending
    }

    /// Reset right away when there is nothing to lose, otherwise ask first.
    pub fn request_reset(&mut self) -> ResetRequest {
        if self.buffer.is_empty() {
            self.apply_reset();
            ResetRequest::Applied
        } else {
            self.reset_pending = true;
            ResetRequest::NeedsConfirmation
        }
    }

    pub fn confirm_reset(&mut self) -> bool {
        if !self.reset_pending {
            return false;
        }
        self.apply_reset();
        true
    }

    pub fn cancel_reset(&mut self) {
        self.reset_pending = false;
    }

    fn apply_reset(&mut self) {
        let now = self.now();
        // A pending text flush would write the old text back over the cleared record.
        if let Some(handle) = self.tasks.text_save.take() {
            self.scheduler.cancel_handle(handle);
        }
        self.buffer.clear();
        self.clock.reset(now);
        self.settings.settings_locked = false;
        self.settings.session_started = false;
        self.celebrated = false;
        self.reset_pending = false;
        self.settings_open = true;

        self.persistence.clear_text();
        self.persistence.clear_session();
        self.persistence.save_settings(&self.settings);
        self.schedule_checkpoints(now);

        info!("session reset");
        self.events.push_back(SessionEvent::ResetApplied);
        self.refresh();
    }

    /// Run whatever timers are due. Returns what fired.
    pub fn tick(&mut self) -> Vec<TaskKind> {
        let fired = self.scheduler.due(self.now());
        for kind in &fired {
            match kind {
                TaskKind::TextSave => {
                    self.tasks.text_save = None;
                    self.persistence.save_text(self.buffer.as_str());
                }
                TaskKind::SessionCheckpoint => self.checkpoint(),
                TaskKind::DisplayTick => self.refresh(),
            }
        }
        fired
    }

    /// Fold live time into the total and persist the session record.
    pub fn checkpoint(&mut self) {
        if !self.settings.session_started {
            return;
        }
        let data = self.clock.checkpoint(self.now());
        debug!(total_ms = data.total_session_time, "session checkpoint");
        self.persistence.save_session(&data);
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Last-chance synchronous flush. Runs at most once; later calls and
    /// the drop that follows are no-ops.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        for handle in self.tasks.drain() {
            self.scheduler.cancel_handle(handle);
        }
        self.persistence.save_text(self.buffer.as_str());
        self.checkpoint();
        self.clock.pause(self.now());
        self.persistence.save_settings(&self.settings);
        info!("session flushed on teardown");
    }
}

impl Drop for WritingSession {
    fn drop(&mut self) {
        self.shutdown();
    }
}
