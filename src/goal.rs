use std::num::NonZeroU32;

use crate::settings::{GoalType, Settings};

/// Inputs to a progress evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GoalInput {
    pub word_count: u64,
    pub session_seconds: u64,
    pub goal_type: GoalType,
    pub word_goal: NonZeroU32,
    pub timer_goal_minutes: NonZeroU32,
    pub session_active: bool,
}

impl GoalInput {
    pub fn from_settings(settings: &Settings, word_count: u64, session_seconds: u64) -> Self {
        Self {
            word_count,
            session_seconds,
            goal_type: settings.goal_type,
            word_goal: settings.daily_word_goal,
            timer_goal_minutes: settings.daily_timer_goal,
            session_active: settings.session_started,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GoalProgress {
    /// Raw percentage, may exceed 100
    pub percent: f64,
    /// Number of whole laps completed
    pub reached_count: u32,
}

impl GoalProgress {
    pub fn is_met(&self) -> bool {
        self.reached_count > 0
    }

    /// Progress bar value: restarts each lap once the goal has been met
    pub fn displayed_percent(&self) -> f64 {
        displayed_percent(self.percent, self.reached_count)
    }
}

pub fn displayed_percent(percent: f64, reached_count: u32) -> f64 {
    if reached_count > 0 {
        percent % 100.0
    } else {
        percent.min(100.0)
    }
}

/// Compute progress against the configured goal.
///
/// Timer progress only counts whole minutes and is pinned to zero unless a
/// session is active.
pub fn evaluate(input: &GoalInput) -> GoalProgress {
    let (amount, goal) = match input.goal_type {
        GoalType::Words => (input.word_count, u64::from(input.word_goal.get())),
        GoalType::Timer if input.session_active => (
            input.session_seconds / 60,
            u64::from(input.timer_goal_minutes.get()),
        ),
        GoalType::Timer => (0, u64::from(input.timer_goal_minutes.get())),
    };

    let percent = 100.0 * amount as f64 / goal as f64;
    let reached_count = u32::try_from(amount / goal).unwrap_or(u32::MAX);

    GoalProgress {
        percent,
        reached_count,
    }
}
