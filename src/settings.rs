use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

use crate::error::SettingsError;

pub const DEFAULT_WORD_GOAL: u32 = 500;
pub const DEFAULT_TIMER_GOAL_MINUTES: u32 = 25;

/// What daily progress is measured in
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GoalType {
    #[default]
    Words,
    Timer,
}

impl GoalType {
    pub fn toggled(self) -> Self {
        match self {
            GoalType::Words => GoalType::Timer,
            GoalType::Timer => GoalType::Words,
        }
    }
}

/// Persisted user settings. The record uses camelCase keys and fills any
/// missing field from the defaults, so older records still load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub show_stats: bool,
    pub redact_mode: bool,
    pub no_delete_mode: bool,
    pub no_copy_paste_mode: bool,
    pub goal_type: GoalType,
    pub daily_word_goal: NonZeroU32,
    /// minutes
    pub daily_timer_goal: NonZeroU32,
    pub is_first_visit: bool,
    pub settings_locked: bool,
    pub session_started: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            show_stats: true,
            redact_mode: false,
            no_delete_mode: false,
            no_copy_paste_mode: false,
            goal_type: GoalType::Words,
            daily_word_goal: NonZeroU32::new(DEFAULT_WORD_GOAL).unwrap_or(NonZeroU32::MIN),
            daily_timer_goal: NonZeroU32::new(DEFAULT_TIMER_GOAL_MINUTES)
                .unwrap_or(NonZeroU32::MIN),
            is_first_visit: true,
            settings_locked: false,
            session_started: false,
        }
    }
}

impl Settings {
    /// Target for the active goal type (words or minutes)
    pub fn active_goal(&self) -> u32 {
        match self.goal_type {
            GoalType::Words => self.daily_word_goal.get(),
            GoalType::Timer => self.daily_timer_goal.get(),
        }
    }

    /// A record claiming a lock without a started session is inconsistent.
    pub fn is_consistent(&self) -> bool {
        !self.settings_locked || self.session_started
    }

    /// Merge a patch in place. Returns true if anything changed.
    /// Callers are responsible for the lock check.
    pub(crate) fn merge(&mut self, patch: &SettingsPatch) -> bool {
        let before = self.clone();
        if let Some(v) = patch.show_stats {
            self.show_stats = v;
        }
        if let Some(v) = patch.redact_mode {
            self.redact_mode = v;
        }
        if let Some(v) = patch.no_delete_mode {
            self.no_delete_mode = v;
        }
        if let Some(v) = patch.no_copy_paste_mode {
            self.no_copy_paste_mode = v;
        }
        if let Some(v) = patch.goal_type {
            self.goal_type = v;
        }
        if let Some(v) = patch.daily_word_goal {
            self.daily_word_goal = v;
        }
        if let Some(v) = patch.daily_timer_goal {
            self.daily_timer_goal = v;
        }
        *self != before
    }
}

/// Partial update for the user-editable settings. Lock and lifecycle flags
/// are deliberately absent: only session actions move those.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsPatch {
    pub show_stats: Option<bool>,
    pub redact_mode: Option<bool>,
    pub no_delete_mode: Option<bool>,
    pub no_copy_paste_mode: Option<bool>,
    pub goal_type: Option<GoalType>,
    pub daily_word_goal: Option<NonZeroU32>,
    pub daily_timer_goal: Option<NonZeroU32>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn show_stats(v: bool) -> Self {
        Self {
            show_stats: Some(v),
            ..Default::default()
        }
    }

    pub fn goal_type(v: GoalType) -> Self {
        Self {
            goal_type: Some(v),
            ..Default::default()
        }
    }

    pub fn word_goal(v: NonZeroU32) -> Self {
        Self {
            daily_word_goal: Some(v),
            ..Default::default()
        }
    }

    pub fn timer_goal(v: NonZeroU32) -> Self {
        Self {
            daily_timer_goal: Some(v),
            ..Default::default()
        }
    }
}

/// Parse a goal typed by the user. Only positive whole numbers get through.
pub fn parse_goal(input: &str) -> Result<NonZeroU32, SettingsError> {
    input
        .trim()
        .parse::<u32>()
        .ok()
        .and_then(NonZeroU32::new)
        .ok_or_else(|| SettingsError::InvalidGoal(input.to_string()))
}
