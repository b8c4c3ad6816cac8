//! Timer bookkeeping for autosave and the live display.
//!
//! Nothing here sleeps or spawns. The event loop calls [`Scheduler::due`] on
//! every tick with the current time and runs whatever comes back, which keeps
//! all mutation on one thread and makes timing fully deterministic in tests.

use std::collections::BTreeMap;

use crate::config::AppConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKind {
    /// Debounced text flush
    TextSave,
    /// Fold live session time and persist it
    SessionCheckpoint,
    /// Recompute stats for the live duration display
    DisplayTick,
}

/// Handle to one scheduling of a task. Rescheduling the same kind
/// invalidates older handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskHandle {
    pub kind: TaskKind,
    generation: u64,
}

#[derive(Debug, Clone, Copy)]
struct Scheduled {
    due_ms: i64,
    period_ms: Option<i64>,
    generation: u64,
}

#[derive(Debug, Default)]
pub struct Scheduler {
    tasks: BTreeMap<TaskKind, Scheduled>,
    next_generation: u64,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: TaskKind, due_ms: i64, period_ms: Option<i64>) -> TaskHandle {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.tasks.insert(
            kind,
            Scheduled {
                due_ms,
                period_ms,
                generation,
            },
        );
        TaskHandle { kind, generation }
    }

    /// Run once after `delay_ms`. Replaces any pending run of the same kind,
    /// which is what makes repeated calls a debounce.
    pub fn schedule_once(&mut self, kind: TaskKind, now: i64, delay_ms: i64) -> TaskHandle {
        self.insert(kind, now + delay_ms, None)
    }

    /// Run every `period_ms`, first run one period from now
    pub fn schedule_every(&mut self, kind: TaskKind, now: i64, period_ms: i64) -> TaskHandle {
        let period_ms = period_ms.max(1);
        self.insert(kind, now + period_ms, Some(period_ms))
    }

    /// Cancel only if `handle` is still the live scheduling
    pub fn cancel_handle(&mut self, handle: TaskHandle) -> bool {
        match self.tasks.get(&handle.kind) {
            Some(s) if s.generation == handle.generation => {
                self.tasks.remove(&handle.kind);
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.tasks.contains_key(&kind)
    }

    pub fn is_live(&self, handle: TaskHandle) -> bool {
        self.tasks
            .get(&handle.kind)
            .is_some_and(|s| s.generation == handle.generation)
    }

    /// Pop everything due at `now`. One-shot tasks are removed; periodic
    /// tasks fire once even if several periods were missed, then re-arm on
    /// their original cadence.
    pub fn due(&mut self, now: i64) -> Vec<TaskKind> {
        let mut fired = Vec::new();
        let mut finished = Vec::new();
        for (kind, task) in self.tasks.iter_mut() {
            if task.due_ms > now {
                continue;
            }
            fired.push(*kind);
            match task.period_ms {
                Some(period) => {
                    let missed = (now - task.due_ms) / period;
                    task.due_ms += (missed + 1) * period;
                }
                None => finished.push(*kind),
            }
        }
        for kind in finished {
            self.tasks.remove(&kind);
        }
        fired
    }
}

/// Autosave cadence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutosavePolicy {
    pub text_debounce_ms: i64,
    pub checkpoint_interval_ms: i64,
    pub display_tick_ms: i64,
}

impl Default for AutosavePolicy {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for AutosavePolicy {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            text_debounce_ms: cfg.text_debounce_ms(),
            checkpoint_interval_ms: cfg.checkpoint_interval_ms(),
            display_tick_ms: cfg.display_tick_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debounce_coalesces_rapid_edits() {
        let mut s = Scheduler::new();
        s.schedule_once(TaskKind::TextSave, 0, 1000);
        s.schedule_once(TaskKind::TextSave, 400, 1000);
        s.schedule_once(TaskKind::TextSave, 900, 1000);
        assert!(s.due(1000).is_empty());
        assert!(s.due(1899).is_empty());
        assert_eq!(s.due(1900), vec![TaskKind::TextSave]);
        assert!(s.due(5000).is_empty());
    }

    #[test]
    fn periodic_tasks_rearm() {
        let mut s = Scheduler::new();
        s.schedule_every(TaskKind::SessionCheckpoint, 0, 30_000);
        assert!(s.due(29_999).is_empty());
        assert_eq!(s.due(30_000), vec![TaskKind::SessionCheckpoint]);
        assert!(s.due(59_999).is_empty());
        assert_eq!(s.due(60_000), vec![TaskKind::SessionCheckpoint]);
    }

    #[test]
    fn missed_periods_fire_once() {
        let mut s = Scheduler::new();
        s.schedule_every(TaskKind::DisplayTick, 0, 1000);
        assert_eq!(s.due(5_500), vec![TaskKind::DisplayTick]);
        assert!(s.due(5_999).is_empty());
        assert_eq!(s.due(6_000), vec![TaskKind::DisplayTick]);
    }

    #[test]
    fn cancelled_debounce_never_fires() {
        let mut s = Scheduler::new();
        let handle = s.schedule_once(TaskKind::TextSave, 0, 1000);
        assert!(s.cancel_handle(handle));
        assert!(s.due(10_000).is_empty());
        assert!(!s.cancel_handle(handle));
    }

    #[test]
    fn stale_handles_cannot_cancel_newer_schedules() {
        let mut s = Scheduler::new();
        let old = s.schedule_once(TaskKind::TextSave, 0, 1000);
        let new = s.schedule_once(TaskKind::TextSave, 100, 1000);
        assert!(!s.is_live(old));
        assert!(!s.cancel_handle(old));
        assert!(s.is_pending(TaskKind::TextSave));
        assert!(s.cancel_handle(new));
        assert!(!s.is_pending(TaskKind::TextSave));
    }

    #[test]
    fn several_kinds_fire_together_in_order() {
        let mut s = Scheduler::new();
        s.schedule_every(TaskKind::DisplayTick, 0, 1000);
        s.schedule_once(TaskKind::TextSave, 0, 1000);
        s.schedule_every(TaskKind::SessionCheckpoint, 0, 1000);
        assert_eq!(
            s.due(1000),
            vec![
                TaskKind::TextSave,
                TaskKind::SessionCheckpoint,
                TaskKind::DisplayTick
            ]
        );
        assert!(!s.is_pending(TaskKind::TextSave));
        assert!(s.is_pending(TaskKind::DisplayTick));
    }

    #[test]
    fn policy_follows_config() {
        let policy = AutosavePolicy::default();
        assert_eq!(policy.text_debounce_ms, 1000);
        assert_eq!(policy.checkpoint_interval_ms, 30_000);
        assert_eq!(policy.display_tick_ms, 1000);
    }
}
