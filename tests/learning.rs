use std::fmt::Arguments;
use std::sync::{Arc, Mutex};
use bson::{doc, Bson, DateTime};
use tempfile::tempdir;
use tutordb::error::Error;
use tutordb::obs::logger::{LogLevel, LoggerAndTracer};
use tutordb::learning::{
    Learner, LearningService, NewLearner, QuizOutcome, SectionProgress, SectionUpdate, SessionProgress,
};
use tutordb::options::{LearningOptions, Options};
use tutordb::TutorDB;

const EMAIL: &str = "ada@example.com";

fn setup() -> (TutorDB, LearningService) {
    let db = TutorDB::in_memory();
    let service = LearningService::new(&db, LearningOptions::default());
    service
        .sign_up(NewLearner {
            name: "Ada".to_string(),
            email: EMAIL.to_string(),
            phone: Some("555-0100".to_string()),
        })
        .unwrap();
    (db, service)
}

fn achievements(service: &LearningService) -> Vec<String> {
    service.dashboard(EMAIL).unwrap().achievements
}

#[test]
fn test_sign_up_creates_learner_and_parent() {
    let (db, service) = setup();

    let learner = service.find_learner(EMAIL).unwrap().unwrap();
    assert_eq!(
        *learner.get_document("progress").unwrap(),
        doc! { "Reading": 0, "Mathematics": 0, "Science": 0, "Problem Solving": 0 }
    );
    assert_eq!(learner.get_document("grades").unwrap().get_str("Science").unwrap(), "N/A");
    assert_eq!(learner.get("last_activity"), Some(&Bson::Null));
    assert_eq!(learner.get_i32("login_count").unwrap(), 0);

    let parent = db.collection("parents").find_one(doc! { "child_email": EMAIL }).unwrap().unwrap();
    assert_eq!(parent.get_str("email").unwrap(), "parent_ada@example.com");
    assert_eq!(parent.get_str("child_name").unwrap(), "Ada");
}

#[test]
fn test_sign_up_rejects_duplicate_email() {
    let (db, service) = setup();

    let result = service.sign_up(NewLearner {
        name: "Other Ada".to_string(),
        email: EMAIL.to_string(),
        phone: None,
    });
    assert!(matches!(result, Err(Error::DuplicateEmail(email)) if email == EMAIL));
    assert_eq!(db.collection("users").count().unwrap(), 1);
    assert_eq!(db.collection("parents").count().unwrap(), 1);
}

#[test]
fn test_login_counts_and_grants_first_steps_once() {
    let (_db, service) = setup();

    for _ in 0..4 {
        service.record_login(EMAIL).unwrap().unwrap();
    }
    assert!(achievements(&service).is_empty());

    let session = service.record_login(EMAIL).unwrap().unwrap();
    assert_eq!(session.name, "Ada");
    assert_eq!(achievements(&service), vec!["First Steps"]);

    assert!(service.award_achievements(EMAIL).unwrap().is_empty());
    assert_eq!(achievements(&service), vec!["First Steps"]);

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.login_count, 5);
    assert_eq!(dashboard.last_activity, Some(session.started_at));
}

#[test]
fn test_login_unknown_learner() {
    let (_db, service) = setup();
    assert!(service.record_login("nobody@example.com").unwrap().is_none());
}

#[test]
fn test_logout_adds_whole_minutes() {
    let (_db, service) = setup();
    let session = service.record_login(EMAIL).unwrap().unwrap();

    let ended_at = DateTime::from_millis(session.started_at.timestamp_millis() + 150_000);
    assert_eq!(service.record_logout_at(&session, ended_at).unwrap(), 2);
    service.add_time_spent(EMAIL, 2998).unwrap();

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.time_spent, 3000);
    assert_eq!(dashboard.achievements, vec!["Dedicated Learner"]);
    assert!(matches!(service.add_time_spent(EMAIL, -1), Err(Error::InvalidRequest(_))));
}

#[test]
fn test_record_activity_clamps_progress() {
    let (_db, service) = setup();

    assert_eq!(service.record_activity(EMAIL, "Reading", None, "Phonics 1").unwrap(), Some(5.0));
    assert_eq!(service.record_activity(EMAIL, "Reading", Some(70), "Phonics 2").unwrap(), Some(75.0));
    assert_eq!(service.record_activity(EMAIL, "Reading", Some(30), "Phonics 3").unwrap(), Some(100.0));

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.progress["Reading"], 100.0);
    assert_eq!(dashboard.completed_works, vec!["Phonics 1", "Phonics 2", "Phonics 3"]);
    assert_eq!(dashboard.achievements, vec!["Reading Master", "Reading Champion"]);
    assert!(dashboard.last_activity.is_some());
}

#[test]
fn test_record_activity_on_new_subject_and_unknown_learner() {
    let (_db, service) = setup();

    assert_eq!(service.record_activity(EMAIL, "Art", Some(3), "Drawing").unwrap(), Some(3.0));
    assert_eq!(service.record_activity("nobody@example.com", "Art", None, "Drawing").unwrap(), None);
}

#[test]
fn test_record_activity_validation() {
    let (_db, service) = setup();

    for (subject, activity) in [("", "Drawing"), ("Art", "  "), ("Art.Painting", "Drawing"), ("$set", "Drawing")] {
        let result = service.record_activity(EMAIL, subject, None, activity);
        assert!(matches!(result, Err(Error::InvalidRequest(_))), "{} / {}", subject, activity);
    }
}

#[test]
fn test_learning_explorer_after_ten_activities() {
    let (_db, service) = setup();

    for i in 0..10 {
        service.record_activity(EMAIL, "Science", Some(1), &format!("Experiment {}", i)).unwrap();
    }
    assert_eq!(achievements(&service), vec!["Learning Explorer"]);
}

#[test]
fn test_history_quiz_unlocks_next_video() {
    let (_db, service) = setup();
    let learner = || Learner::Account(EMAIL);

    let view = service.history_view(&learner()).unwrap();
    assert_eq!(view.playlist.len(), 9);
    assert_eq!(view.unlocked, 0);

    assert_eq!(service.submit_history_quiz(learner(), 0, 70).unwrap(), QuizOutcome::Passed { unlocked: 1 });
    // Passing the same video again does not move the frontier.
    assert_eq!(service.submit_history_quiz(learner(), 0, 70).unwrap(), QuizOutcome::Passed { unlocked: 1 });
    assert_eq!(service.history_view(&learner()).unwrap().unlocked, 1);

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.history_progress, 1);
    assert_eq!(dashboard.progress["History"], 10.0);
    assert_eq!(dashboard.completed_works, vec!["History video 0 quiz", "History video 0 quiz"]);
}

#[test]
fn test_history_quiz_failure_keeps_frontier() {
    let (_db, service) = setup();
    let learner = || Learner::Account(EMAIL);

    service.submit_history_quiz(learner(), 0, 60).unwrap();
    service.submit_history_quiz(learner(), 1, 100).unwrap();

    let outcome = service.submit_history_quiz(learner(), 5, 40).unwrap();
    assert!(!outcome.is_passed());
    assert_eq!(outcome.unlocked(), 2);
    assert_eq!(service.history_view(&learner()).unwrap().unlocked, 2);
    assert_eq!(service.dashboard(EMAIL).unwrap().completed_works.len(), 2);
}

#[test]
fn test_history_quiz_invalid_index() {
    let (_db, service) = setup();

    for index in [-1, 9] {
        let result = service.submit_history_quiz(Learner::Account(EMAIL), index, 100);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
}

#[test]
fn test_history_quiz_unknown_account() {
    let (db, service) = setup();

    for score in [90, 10] {
        let result = service.submit_history_quiz(Learner::Account("nobody@example.com"), 2, score);
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }
    assert_eq!(service.history_view(&Learner::Account("nobody@example.com")).unwrap().unlocked, 0);
    assert_eq!(db.metrics()["documents_updated"], 0);
}

#[test]
fn test_anonymous_history_progress() {
    let (db, service) = setup();
    let mut session = SessionProgress::default();

    let outcome = service.submit_history_quiz(Learner::Anonymous(&mut session), 0, 90).unwrap();
    assert_eq!(outcome, QuizOutcome::Passed { unlocked: 1 });
    assert_eq!(session.history_unlocked, 1);

    service.submit_history_quiz(Learner::Anonymous(&mut session), 3, 90).unwrap();
    service.submit_history_quiz(Learner::Anonymous(&mut session), 1, 90).unwrap();
    assert_eq!(service.history_view(&Learner::Anonymous(&mut session)).unwrap().unlocked, 4);

    // Nothing is stored for anonymous visitors.
    assert_eq!(service.dashboard(EMAIL).unwrap().history_progress, 0);
    assert_eq!(db.metrics()["documents_updated"], 0);
}

#[test]
fn test_preprimary_section_update() {
    let (_db, service) = setup();

    let progress = service
        .update_preprimary_section(
            EMAIL,
            &SectionUpdate { section: " Colors ".to_string(), video_watched: true, games_played: 2, quiz_score: None },
        )
        .unwrap();
    assert!(progress.video_watched);
    assert_eq!(progress.games_played, 2);
    assert_eq!(progress.quiz_score, None);
    assert!(progress.last_updated.is_some());

    let progress = service
        .update_preprimary_section(
            EMAIL,
            &SectionUpdate { section: "colors".to_string(), quiz_score: Some(7), ..SectionUpdate::default() },
        )
        .unwrap();
    assert_eq!(progress.quiz_score, Some(4));
    assert_eq!(progress.games_played, 2);

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(
        dashboard.completed_works,
        vec!["Pre-Primary Colors: played 2 game(s)", "Pre-Primary Colors: quiz 4/4"]
    );
    assert_eq!(dashboard.preprimary_progress["colors"], progress);
}

#[test]
fn test_preprimary_section_without_activity_summary() {
    let (_db, service) = setup();

    let progress = service
        .update_preprimary_section(EMAIL, &SectionUpdate { section: "animals".to_string(), ..SectionUpdate::default() })
        .unwrap();
    assert_eq!(progress.games_played, 0);
    assert!(!progress.video_watched);
    assert!(service.dashboard(EMAIL).unwrap().completed_works.is_empty());

    let result = service
        .update_preprimary_section(EMAIL, &SectionUpdate { section: "planets".to_string(), ..SectionUpdate::default() });
    assert!(matches!(result, Err(Error::InvalidRequest(_))));

    let unknown = service
        .update_preprimary_section("nobody@example.com", &SectionUpdate { section: "fruits".to_string(), ..SectionUpdate::default() })
        .unwrap();
    assert_eq!(unknown, SectionProgress::default());
}

#[test]
fn test_parent_dashboard_and_feedback() {
    let (_db, service) = setup();

    let parent = service.parent_login("parent_ada@example.com").unwrap().unwrap();
    assert_eq!(parent.child_email, EMAIL);
    assert_eq!(parent.child_name, "Ada");
    assert!(service.parent_login("parent_nobody@example.com").unwrap().is_none());

    service.submit_feedback(&parent, "  Great week!  ").unwrap();
    assert!(matches!(service.submit_feedback(&parent, "   "), Err(Error::InvalidRequest(_))));

    let dashboard = service.dashboard(&parent.child_email).unwrap();
    assert_eq!(dashboard.name, "Ada");
    assert_eq!(dashboard.feedback.len(), 1);
    assert_eq!(dashboard.feedback[0].message, "Great week!");
    assert_eq!(dashboard.feedback[0].parent_email, "parent_ada@example.com");
}

#[test]
fn test_dashboard_of_missing_child_uses_defaults() {
    let (_db, service) = setup();

    let dashboard = service.dashboard("nobody@example.com").unwrap();
    assert_eq!(dashboard.name, "Child");
    assert_eq!(dashboard.progress.len(), 4);
    assert_eq!(dashboard.grades["Reading"], "N/A");
    assert!(dashboard.last_activity.is_none());
}

#[test]
fn test_dashboard_reads_fractional_progress() {
    let (db, service) = setup();

    db.collection("users")
        .update_one(doc! { "email": EMAIL }, doc! { "$inc": { "progress.Reading": 2.5 } })
        .unwrap();
    assert_eq!(service.dashboard(EMAIL).unwrap().progress["Reading"], 2.5);

    assert_eq!(service.record_activity(EMAIL, "Reading", None, "Phonics 1").unwrap(), Some(7.5));
    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.progress["Reading"], 7.5);
    assert_eq!(dashboard.progress["Science"], 0.0);
}

#[test]
fn test_dashboard_tolerates_mistyped_fields() {
    let (db, service) = setup();

    db.collection("users")
        .update_one(
            doc! { "email": EMAIL },
            doc! { "$set": { "time_spent": "a while", "login_count": 2.0, "progress.Science": "lots", "preprimary_progress.colors.games_played": 1.5 } },
        )
        .unwrap();

    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.name, "Ada");
    assert_eq!(dashboard.time_spent, 0);
    assert_eq!(dashboard.login_count, 2);
    assert!(!dashboard.progress.contains_key("Science"));
    assert_eq!(dashboard.progress["Reading"], 0.0);
    assert_eq!(dashboard.preprimary_progress["colors"].games_played, 1);
}

#[derive(Default)]
struct RecordingLogger {
    lines: Mutex<Vec<String>>,
}

impl LoggerAndTracer for RecordingLogger {
    fn log(&self, level: LogLevel, _context: &'static str, msg: Arguments) {
        self.lines.lock().unwrap().push(format!("{:?} {}", level, msg));
    }

    fn event(&self, _context: &'static str, event: Arguments) {
        self.lines.lock().unwrap().push(format!("EVENT {}", event));
    }

    fn is_tracing_enabled(&self) -> bool {
        true
    }

    fn level_enabled(&self, _level: LogLevel) -> bool {
        true
    }
}

#[test]
fn test_service_logs_through_database_logger() {
    let logger = Arc::new(RecordingLogger::default());
    let db = TutorDB::in_memory_with(Options::default(), logger.clone());
    let service = LearningService::new(&db, LearningOptions::default());
    service
        .sign_up(NewLearner { name: "Ada".to_string(), email: EMAIL.to_string(), phone: None })
        .unwrap();
    service.submit_history_quiz(Learner::Account(EMAIL), 0, 80).unwrap();

    let lines = logger.lines.lock().unwrap();
    assert!(lines.iter().any(|l| l == "Info signed up ada@example.com with parent account parent_ada@example.com"));
    assert!(lines.iter().any(|l| l == "Debug history quiz passed, video=0, unlocked=1"));
}

#[test]
fn test_progress_survives_restart() {
    let dir = tempdir().unwrap();

    {
        let db = TutorDB::open(dir.path()).unwrap();
        let service = LearningService::new(&db, LearningOptions::default());
        service
            .sign_up(NewLearner { name: "Ada".to_string(), email: EMAIL.to_string(), phone: None })
            .unwrap();
        service.record_activity(EMAIL, "Mathematics", Some(85), "Fractions").unwrap();
        service.submit_history_quiz(Learner::Account(EMAIL), 0, 75).unwrap();
    }

    let db = TutorDB::open(dir.path()).unwrap();
    let service = LearningService::new(&db, LearningOptions::default());
    let dashboard = service.dashboard(EMAIL).unwrap();
    assert_eq!(dashboard.progress["Mathematics"], 85.0);
    assert_eq!(dashboard.history_progress, 1);
    assert_eq!(dashboard.achievements, vec!["Mathematics Master"]);
    assert!(service.parent_login("parent_ada@example.com").unwrap().is_some());
}

#[test]
fn test_custom_learning_options() {
    let db = TutorDB::in_memory();
    let options = LearningOptions::default()
        .with_pass_score(90)
        .with_progress_cap(50)
        .with_history_playlist(vec!["a".to_string(), "b".to_string()]);
    let service = LearningService::new(&db, options);
    service
        .sign_up(NewLearner { name: "Ada".to_string(), email: EMAIL.to_string(), phone: None })
        .unwrap();

    assert!(!service.submit_history_quiz(Learner::Account(EMAIL), 0, 80).unwrap().is_passed());
    assert!(matches!(
        service.submit_history_quiz(Learner::Account(EMAIL), 2, 95),
        Err(Error::InvalidRequest(_))
    ));
    assert_eq!(service.record_activity(EMAIL, "Reading", Some(60), "Long read").unwrap(), Some(50.0));
}
