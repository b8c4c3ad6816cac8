use crate::goal::{displayed_percent, evaluate, GoalInput};
use crate::settings::{GoalType, Settings};

/// Derived, read-only snapshot handed to the rendering layer
#[derive(Debug, Clone, PartialEq)]
pub struct WritingStats {
    pub word_count: u64,
    pub character_count: u64,
    /// seconds
    pub session_duration: u64,
    /// target for the active goal type, words or minutes
    pub daily_goal: u32,
    /// raw percentage, exceeds 100 after the first lap
    pub daily_progress: f64,
    pub goal_reached_count: u32,
    pub goal_type: GoalType,
}

impl Default for WritingStats {
    fn default() -> Self {
        Self {
            word_count: 0,
            character_count: 0,
            session_duration: 0,
            daily_goal: crate::settings::DEFAULT_WORD_GOAL,
            daily_progress: 0.0,
            goal_reached_count: 0,
            goal_type: GoalType::Words,
        }
    }
}

impl WritingStats {
    pub fn compute(text: &str, session_duration: u64, settings: &Settings) -> Self {
        let word_count = count_words(text);
        let progress = evaluate(&GoalInput::from_settings(
            settings,
            word_count,
            session_duration,
        ));
        Self {
            word_count,
            character_count: count_characters(text),
            session_duration,
            daily_goal: settings.active_goal(),
            daily_progress: progress.percent,
            goal_reached_count: progress.reached_count,
            goal_type: settings.goal_type,
        }
    }

    pub fn goal_met(&self) -> bool {
        self.daily_progress >= 100.0
    }

    /// Progress bar value, restarting each lap
    pub fn displayed_progress(&self) -> f64 {
        displayed_percent(self.daily_progress, self.goal_reached_count)
    }

    /// "312 / 500 words" or "12 / 25 min"
    pub fn goal_summary(&self) -> String {
        match self.goal_type {
            GoalType::Words => format!("{} / {} words", self.word_count, self.daily_goal),
            GoalType::Timer => format!("{} / {} min", self.session_duration / 60, self.daily_goal),
        }
    }
}

pub fn count_words(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

pub fn count_characters(text: &str) -> u64 {
    text.chars().count() as u64
}

/// `m:ss`, or `h:mm:ss` past the hour
pub fn format_duration(seconds: u64) -> String {
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        format!("{hours}:{minutes:02}:{secs:02}")
    } else {
        format!("{minutes}:{secs:02}")
    }
}
