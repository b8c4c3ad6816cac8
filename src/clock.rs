use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

pub const MS_PER_SEC: i64 = 1000;
pub const STALE_SESSION_MS: i64 = 60 * 60 * MS_PER_SEC;

/// Source of "now" in milliseconds since the unix epoch
pub trait TimeSource: Send + Sync {
    fn now_ms(&self) -> i64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemTimeSource;

impl TimeSource for SystemTimeSource {
    fn now_ms(&self) -> i64 {
        chrono::Utc::now().timestamp_millis()
    }
}

/// Hand-driven clock for tests and headless runs. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualTime {
    now: Arc<AtomicI64>,
}

impl ManualTime {
    pub fn new(start_ms: i64) -> Self {
        Self {
            now: Arc::new(AtomicI64::new(start_ms)),
        }
    }

    pub fn set(&self, ms: i64) {
        self.now.store(ms, Ordering::SeqCst);
    }

    pub fn advance_ms(&self, ms: i64) {
        self.now.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn advance_secs(&self, secs: i64) {
        self.advance_ms(secs * MS_PER_SEC);
    }
}

impl TimeSource for ManualTime {
    fn now_ms(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Persisted session timing record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionData {
    pub start_time: i64,
    pub last_save_time: i64,
    pub total_session_time: i64,
}

impl SessionData {
    pub fn is_valid(&self) -> bool {
        self.total_session_time >= 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ClockState {
    start_time: i64,
    total_ms: i64,
    active: bool,
}

/// Time from `start` to `now`, never negative and never overflowing
fn span_ms(start: i64, now: i64) -> i64 {
    now.saturating_sub(start).max(0)
}

impl ClockState {
    fn live_ms(&self, now: i64) -> i64 {
        if self.active {
            self.total_ms.saturating_add(span_ms(self.start_time, now))
        } else {
            self.total_ms
        }
    }

    fn fold(&mut self, now: i64) {
        if self.active {
            self.total_ms = self.live_ms(now);
            self.start_time = now;
        }
    }
}

/// How a restore attempt turned out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restore {
    /// Persisted time carried over, including the gap while closed
    Resumed { gap_ms: i64 },
    /// Record too old, started from zero
    Stale { age_ms: i64 },
}

/// Active writing time. Elapsed time is `total + (now - start)` while
/// active; checkpoints fold the live part into the total.
///
/// All state sits behind one mutex so a reader never observes a half-applied
/// checkpoint.
#[derive(Debug)]
pub struct SessionClock {
    state: Mutex<ClockState>,
}

impl SessionClock {
    pub fn new(now: i64) -> Self {
        Self {
            state: Mutex::new(ClockState {
                start_time: now,
                total_ms: 0,
                active: false,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        // The state is plain data; a poisoned guard still holds a usable value.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_active(&self) -> bool {
        self.lock().active
    }

    pub fn total_ms(&self) -> i64 {
        self.lock().total_ms
    }

    pub fn start_time(&self) -> i64 {
        self.lock().start_time
    }

    /// Inactive -> active. Accumulated time carries over.
    pub fn start(&self, now: i64) {
        let mut s = self.lock();
        if !s.active {
            s.start_time = now;
            s.active = true;
        }
    }

    /// New run from zero, active immediately
    pub fn begin_fresh(&self, now: i64) {
        *self.lock() = ClockState {
            start_time: now,
            total_ms: 0,
            active: true,
        };
    }

    pub fn elapsed_ms(&self, now: i64) -> i64 {
        self.lock().live_ms(now)
    }

    pub fn elapsed_secs(&self, now: i64) -> u64 {
        u64::try_from(self.elapsed_ms(now) / MS_PER_SEC).unwrap_or(0)
    }

    /// Fold live time into the total and return the record to persist.
    pub fn checkpoint(&self, now: i64) -> SessionData {
        let mut s = self.lock();
        s.fold(now);
        SessionData {
            start_time: s.start_time,
            last_save_time: now,
            total_session_time: s.total_ms,
        }
    }

    pub fn pause(&self, now: i64) {
        let mut s = self.lock();
        s.fold(now);
        s.active = false;
    }

    pub fn reset(&self, now: i64) {
        *self.lock() = ClockState {
            start_time: now,
            total_ms: 0,
            active: false,
        };
    }

    /// Rebuild from a persisted record. Time spent closed counts as session
    /// time as long as the record is younger than `stale_after_ms`. Leaves
    /// the clock inactive; the caller decides whether the session runs.
    pub fn restore(&self, data: &SessionData, now: i64, stale_after_ms: i64) -> Restore {
        let age = now.checked_sub(data.last_save_time);
        let resumed = age
            .filter(|age| *age < stale_after_ms && data.is_valid())
            .and_then(|age| {
                let gap_ms = age.max(0);
                data.total_session_time
                    .checked_add(gap_ms)
                    .map(|total| (gap_ms, total))
            });
        let mut s = self.lock();
        match resumed {
            Some((gap_ms, total_ms)) => {
                *s = ClockState {
                    start_time: now,
                    total_ms,
                    active: false,
                };
                Restore::Resumed { gap_ms }
            }
            // Out-of-range records are as unusable as old ones.
            None => {
                *s = ClockState {
                    start_time: now,
                    total_ms: 0,
                    active: false,
                };
                Restore::Stale {
                    age_ms: age.unwrap_or(i64::MAX),
                }
            }
        }
    }
}
