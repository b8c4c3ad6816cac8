// Reload scenarios against a real SQLite file: what survives a restart,
// what gets discarded and what the user sees when they come back.

use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;

use tempfile::tempdir;
use writeflow::clock::ManualTime;
use writeflow::config::AppConfig;
use writeflow::modes::EditAction;
use writeflow::session::{Phase, ResetRequest, SessionEvent, WritingSession};
use writeflow::settings::SettingsPatch;
use writeflow::storage::{
    KeyValueStore, Persistence, SqliteStore, UnavailableStore, SESSION_KEY, SETTINGS_KEY,
};

const T0: i64 = 1_700_000_000_000;

fn load(db: &Path, time: &ManualTime) -> WritingSession {
    WritingSession::load(
        Persistence::open_sqlite(db),
        Arc::new(time.clone()),
        &AppConfig::default(),
    )
}

fn type_str(session: &mut WritingSession, s: &str) {
    for c in s.chars() {
        session.edit(EditAction::Insert(c)).unwrap();
    }
}

#[test]
fn short_break_resumes_the_session_with_the_gap_counted() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    let time = ManualTime::new(T0);
    {
        let mut session = load(&db, &time);
        assert_eq!(session.phase(), Phase::FirstVisitSetup);
        assert!(session.start_session());
        type_str(&mut session, "the quick brown fox");
        time.advance_secs(600);
        session.tick();
    }

    time.advance_secs(30 * 60);
    let mut session = load(&db, &time);
    assert_eq!(session.text(), "the quick brown fox");
    assert!(session.is_locked());
    assert!(!session.settings_open());
    assert_eq!(session.phase(), Phase::Active { goal_met: false });
    assert_eq!(session.stats().session_duration, 40 * 60);
    assert!(session
        .take_events()
        .contains(&SessionEvent::SessionResumed { gap_ms: 30 * 60 * 1000 }));

    time.advance_secs(5);
    session.tick();
    assert_eq!(session.stats().session_duration, 40 * 60 + 5);
}

#[test]
fn long_break_keeps_text_and_lock_but_restarts_the_clock() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    let time = ManualTime::new(T0);
    {
        let mut session = load(&db, &time);
        session.start_session();
        type_str(&mut session, "draft");
        time.advance_secs(300);
    }

    time.advance_secs(90 * 60);
    let mut session = load(&db, &time);
    assert_eq!(session.text(), "draft");
    assert!(session.is_locked());
    assert_eq!(session.stats().session_duration, 0);
    assert!(session.take_events().is_empty());
}

#[test]
fn reset_clears_text_and_session_but_keeps_preferences() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    let time = ManualTime::new(T0);
    {
        let mut session = load(&db, &time);
        session.apply_settings(&SettingsPatch::word_goal(NonZeroU32::new(3).unwrap()));
        session.apply_settings(&SettingsPatch::show_stats(false));
        session.start_session();
        type_str(&mut session, "a b");
        assert_eq!(session.request_reset(), ResetRequest::NeedsConfirmation);
        assert!(session.confirm_reset());
    }

    let session = load(&db, &time);
    assert_eq!(session.text(), "");
    assert_eq!(session.phase(), Phase::Configuring);
    assert!(session.settings_open());
    assert!(!session.is_locked());
    assert!(!session.settings().session_started);
    assert_eq!(session.settings().daily_word_goal.get(), 3);
    assert!(!session.settings().show_stats);
    assert_eq!(session.stats().session_duration, 0);
}

#[test]
fn reaching_the_goal_is_not_celebrated_again_after_reload() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    let time = ManualTime::new(T0);
    {
        let mut session = load(&db, &time);
        session.apply_settings(&SettingsPatch::word_goal(NonZeroU32::new(2).unwrap()));
        session.start_session();
        type_str(&mut session, "one two three");
        let events = session.take_events();
        assert!(events.contains(&SessionEvent::GoalReached { laps: 1 }));
        assert!(events.contains(&SessionEvent::SettingsUnlocked));
    }

    time.advance_secs(60);
    let mut session = load(&db, &time);
    assert!(!session.is_locked());
    assert_eq!(session.phase(), Phase::Active { goal_met: true });
    type_str(&mut session, " four");
    assert!(!session
        .take_events()
        .iter()
        .any(|e| matches!(e, SessionEvent::GoalReached { .. })));
}

#[test]
fn forgetting_settings_keeps_the_draft() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    let time = ManualTime::new(T0);
    {
        let mut session = load(&db, &time);
        session.apply_settings(&SettingsPatch::word_goal(NonZeroU32::new(7).unwrap()));
        session.start_session();
        type_str(&mut session, "keep me");
    }

    Persistence::open_sqlite(&db).clear_settings();
    let session = load(&db, &time);
    assert_eq!(session.text(), "keep me");
    assert_eq!(session.phase(), Phase::FirstVisitSetup);
    assert_eq!(session.settings().daily_word_goal.get(), 500);
    assert!(!session.is_locked());
}

#[test]
fn malformed_records_are_treated_as_missing() {
    let dir = tempdir().unwrap();
    let db = dir.path().join("writeflow.db");
    {
        let store = SqliteStore::open(&db).unwrap();
        store.set(SETTINGS_KEY, "{not json").unwrap();
        store.set(SESSION_KEY, "[1, 2, 3]").unwrap();
    }

    let time = ManualTime::new(T0);
    let session = load(&db, &time);
    assert_eq!(session.phase(), Phase::FirstVisitSetup);
    assert_eq!(session.settings().daily_word_goal.get(), 500);
    assert!(!session.is_locked());
}

#[test]
fn unavailable_storage_still_runs_a_full_session() {
    let time = ManualTime::new(T0);
    let persistence = Persistence::probe(Box::new(UnavailableStore {
        reason: "quota exceeded".into(),
    }));
    assert!(!persistence.is_available());

    let mut session = WritingSession::load(persistence, Arc::new(time.clone()), &AppConfig::default());
    session.apply_settings(&SettingsPatch::word_goal(NonZeroU32::new(1).unwrap()));
    session.start_session();
    type_str(&mut session, "hello");
    assert_eq!(session.stats().word_count, 1);
    assert!(!session.is_locked());
    session.shutdown();
    assert!(session.is_torn_down());
}
