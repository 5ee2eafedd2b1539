use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use prepcoach_ai::{Executor, GenerationRequest, RetryPolicy, Transport, TransportError, TransportResponse};
use prepcoach_coach::ContentService;
use prepcoach_core::{
    aggregate, Event, ReportPolicy, Screen, SessionDriver, SessionLog, SessionState, Verdict,
};
use prepcoach_db::{Database, NewSessionLog, SessionArchive};
use prepcoach_logging::Logger;
use serde_json::json;

/// Answers each kind of prompt with a canned payload.
struct ScriptedCoach {
    question_count: usize,
    /// Briefing calls that fail with 503 before one succeeds
    briefing_outages: AtomicUsize,
    fail_briefing: bool,
    fail_recommended: bool,
    /// Holds every briefing response back this long
    briefing_delay: Option<Duration>,
    /// Answers containing this text get a client error instead of feedback
    reject_answers_with: Option<&'static str>,
    calls: Mutex<Vec<&'static str>>,
}

impl ScriptedCoach {
    fn new(question_count: usize) -> Self {
        Self {
            question_count,
            briefing_outages: AtomicUsize::new(0),
            fail_briefing: false,
            fail_recommended: false,
            briefing_delay: None,
            reject_answers_with: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn generated(payload: serde_json::Value) -> TransportResponse {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": payload.to_string() }] } }]
        });
        TransportResponse::new(200, body.to_string())
    }

    fn questions(n: usize, prefix: &str) -> serde_json::Value {
        let items: Vec<_> = (0..n)
            .map(|i| json!({"type": "experience", "text": format!("{} question {}", prefix, i + 1)}))
            .collect();
        serde_json::Value::Array(items)
    }
}

#[async_trait]
impl Transport for ScriptedCoach {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn send(&self, request: &GenerationRequest) -> Result<TransportResponse, TransportError> {
        let prompt = &request.prompt;

        if prompt.contains("preparing a candidate") {
            self.calls.lock().unwrap().push("briefing");
            if let Some(delay) = self.briefing_delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_briefing {
                return Ok(TransportResponse::new(403, "forbidden"));
            }
            let outages = self.briefing_outages.load(Ordering::SeqCst);
            if outages > 0 {
                self.briefing_outages.store(outages - 1, Ordering::SeqCst);
                return Ok(TransportResponse::new(503, "unavailable"));
            }
            return Ok(Self::generated(json!({
                "companySummary": "Acme builds anvils.",
                "industryTrends": ["Automation", "Sustainability", "Nearshoring"],
                "companyCulture": "Blunt and kind.",
                "recommendedTone": "Direct"
            })));
        }

        if prompt.contains("hiring for the role") {
            self.calls.lock().unwrap().push("questions");
            return Ok(Self::generated(Self::questions(self.question_count, "Role")));
        }

        if prompt.contains("reviewing a candidate's answer") {
            self.calls.lock().unwrap().push("feedback");
            if let Some(marker) = self.reject_answers_with {
                if prompt.contains(marker) {
                    return Ok(TransportResponse::new(400, "bad request"));
                }
            }
            let score = if prompt.contains("weak answer") { 50 } else { 90 };
            return Ok(Self::generated(json!({
                "logic": {"score": score, "comment": "Reasoning."},
                "clarity": {"score": score, "comment": "Delivery."},
                "vocalTone": {"score": score, "comment": "Tone."},
                "betterExample": "Lead with the result."
            })));
        }

        if prompt.contains("designing targeted practice") {
            self.calls.lock().unwrap().push("recommended");
            if self.fail_recommended {
                return Ok(TransportResponse::new(500, "boom"));
            }
            return Ok(Self::generated(Self::questions(3, "Targeted")));
        }

        Ok(TransportResponse::new(404, "unknown prompt"))
    }
}

struct FailingArchive;

impl SessionArchive for FailingArchive {
    fn append(&self, _log: &NewSessionLog) -> Result<String, rusqlite::Error> {
        Err(rusqlite::Error::InvalidQuery)
    }
}

fn content(coach: Arc<ScriptedCoach>) -> ContentService {
    ContentService::new(Executor::new(
        coach,
        RetryPolicy::new(3, Duration::from_millis(1000)),
    ))
}

fn start(n: usize) -> Event {
    Event::Start {
        company: "Acme".into(),
        role: "Engineer".into(),
        question_count: n,
    }
}

async fn answer(driver: &mut SessionDriver, text: &str) {
    driver.run(Event::AnswerChanged(text.into())).await;
    driver.run(Event::SubmitAnswer).await;
}

#[tokio::test]
async fn test_full_practice_saves_log() {
    let coach = Arc::new(ScriptedCoach::new(2));
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    let state = driver.run(start(2)).await;
    assert_eq!(state.screen, Screen::Briefing);
    assert_eq!(state.briefing.as_ref().unwrap().industry_trends.len(), 3);
    assert_eq!(state.questions.len(), 2);

    driver.run(Event::StartPractice).await;
    answer(&mut driver, "A strong answer").await;
    assert!(driver.state().current_feedback.as_ref().unwrap().valid().is_some());

    driver.run(Event::NextQuestion).await;
    answer(&mut driver, "A weak answer").await;
    let state = driver.run(Event::NextQuestion).await;

    assert_eq!(state.screen, Screen::Report);
    let log = state.report_log.clone().unwrap();
    assert_eq!(log.entries.len(), 2);
    assert_eq!(log.overall_score, Some(70));

    let stored = db.session_logs().list("user-1", None).unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(log.id.as_deref(), Some(stored[0].id.as_str()));
    assert_eq!(stored[0].company.as_deref(), Some("Acme"));

    let restored = SessionLog::from_record(&stored[0]).unwrap();
    let card = aggregate(&restored.entries, &ReportPolicy::default())
        .card()
        .cloned()
        .unwrap();
    assert_eq!(card.overall_score, 70);
    assert_eq!(card.verdict, Verdict::Fail);

    assert_eq!(
        coach.calls(),
        vec!["briefing", "questions", "feedback", "feedback"]
    );
}

#[tokio::test]
async fn test_feedback_errors_never_abort_and_are_not_saved() {
    let mut coach = ScriptedCoach::new(2);
    coach.reject_answers_with = Some("rambling");
    let coach = Arc::new(coach);
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    driver.run(start(2)).await;
    driver.run(Event::StartPractice).await;

    answer(&mut driver, "rambling one").await;
    let state = driver.state();
    assert!(state.current_feedback.as_ref().unwrap().is_error());
    assert!(state.notice.as_ref().unwrap().is_error());

    driver.run(Event::NextQuestion).await;
    answer(&mut driver, "rambling two").await;
    let state = driver.run(Event::NextQuestion).await;

    assert_eq!(state.screen, Screen::Report);
    let log = state.report_log.as_ref().unwrap();
    assert!(log.entries.iter().all(|e| e.feedback.is_error()));
    assert!(aggregate(&log.entries, &ReportPolicy::default()).card().is_none());
    assert!(db.session_logs().list("user-1", None).unwrap().is_empty());
}

#[tokio::test]
async fn test_save_failure_does_not_block_report() {
    let coach = Arc::new(ScriptedCoach::new(1));
    let service = content(coach);
    let mut driver = SessionDriver::new(
        service,
        Arc::new(FailingArchive),
        Arc::new(Logger::quiet()),
        "user-1",
    );

    driver.run(start(1)).await;
    driver.run(Event::StartPractice).await;
    answer(&mut driver, "Fine answer").await;
    let state = driver.run(Event::NextQuestion).await;

    assert_eq!(state.screen, Screen::Report);
    assert!(state.report_log.as_ref().unwrap().id.is_none());
    assert!(state.notice.is_none());
}

#[tokio::test]
async fn test_recommended_practice_loop() {
    let coach = Arc::new(ScriptedCoach::new(1));
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    driver.run(start(1)).await;
    driver.run(Event::StartPractice).await;
    answer(&mut driver, "A weak answer").await;
    driver.run(Event::NextQuestion).await;

    let entries = driver.state().report_log.as_ref().unwrap().entries.clone();
    let weakness = aggregate(&entries, driver.policy())
        .card()
        .unwrap()
        .primary_weakness
        .clone();

    let state = driver
        .run(Event::PracticeRecommended { weakness })
        .await;
    assert_eq!(state.screen, Screen::Practice);
    assert!(state.recommended);
    assert!(state.company.is_none());
    assert_eq!(state.questions.len(), 3);
    assert!(state.questions[0].text.starts_with("Targeted"));

    for _ in 0..3 {
        answer(&mut driver, "A strong answer").await;
        driver.run(Event::NextQuestion).await;
    }
    assert_eq!(driver.state().screen, Screen::Report);

    let stored = db.session_logs().list("user-1", None).unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].recommended);
    assert!(stored[0].company.is_none());
    assert_eq!(stored[0].overall_score, 90);
}

#[tokio::test(start_paused = true)]
async fn test_recommended_failure_returns_to_report() {
    let mut coach = ScriptedCoach::new(1);
    coach.fail_recommended = true;
    let coach = Arc::new(coach);
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    driver.run(start(1)).await;
    driver.run(Event::StartPractice).await;
    answer(&mut driver, "A weak answer").await;
    driver.run(Event::NextQuestion).await;

    let state = driver
        .run(Event::PracticeRecommended {
            weakness: "Structuring answers logically".into(),
        })
        .await;
    assert_eq!(state.screen, Screen::Report);
    assert!(state.pending.is_none());
    assert!(state.report_log.is_some());
    assert!(state.notice.as_ref().unwrap().is_error());

    // Transient failures were retried to the limit
    let recommended = coach.calls().iter().filter(|c| **c == "recommended").count();
    assert_eq!(recommended, 3);
}

#[tokio::test]
async fn test_prep_failure_stays_home() {
    let mut coach = ScriptedCoach::new(3);
    coach.fail_briefing = true;
    let coach = Arc::new(coach);
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    let state = driver.run(start(3)).await;
    assert_eq!(state.screen, Screen::Home);
    assert!(state.briefing.is_none());
    assert!(state.notice.as_ref().unwrap().is_error());

    // Client errors are not retried and questions are never requested
    assert_eq!(coach.calls(), vec!["briefing"]);
}

#[tokio::test(start_paused = true)]
async fn test_transient_outage_is_absorbed() {
    let coach = ScriptedCoach::new(2);
    coach.briefing_outages.store(2, Ordering::SeqCst);
    let coach = Arc::new(coach);
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    let started = tokio::time::Instant::now();
    let state = driver.run(start(2)).await;

    assert_eq!(state.screen, Screen::Briefing);
    assert_eq!(
        coach.calls(),
        vec!["briefing", "briefing", "briefing", "questions"]
    );
    // 1s then 2s of backoff
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(3000));
    assert!(elapsed < Duration::from_millis(3100));
}

#[tokio::test]
async fn test_restart_then_view_stored_log() {
    let coach = Arc::new(ScriptedCoach::new(1));
    let service = content(coach);
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    driver.run(start(1)).await;
    driver.run(Event::StartPractice).await;
    answer(&mut driver, "A strong answer").await;
    driver.run(Event::NextQuestion).await;

    let state = driver.run(Event::Restart).await;
    assert_eq!(state.screen, Screen::Home);
    assert_eq!(state.generation, 1);
    assert!(state.report_log.is_none());

    let record = db.session_logs().list("user-1", Some(1)).unwrap().remove(0);
    let log = SessionLog::from_record(&record).unwrap();
    let state = driver.run(Event::ViewLog(log)).await;
    assert_eq!(state.screen, Screen::Report);
    assert_eq!(
        state.report_log.as_ref().unwrap().id.as_deref(),
        Some(record.id.as_str())
    );
}

#[tokio::test(start_paused = true)]
async fn test_restart_abandons_outstanding_call() {
    let mut coach = ScriptedCoach::new(2);
    coach.briefing_delay = Some(Duration::from_secs(5));
    let coach = Arc::new(coach);
    let service = content(coach.clone());
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    let state = driver.dispatch(start(2));
    assert!(state.is_busy());
    assert!(!driver.is_settled());

    // Accepted while the briefing call is still outstanding
    let state = driver.dispatch(Event::Restart);
    assert_eq!(state.screen, Screen::Home);
    assert_eq!(state.generation, 1);
    assert!(driver.is_settled());

    // The late result arrives and leaves the new session untouched
    assert!(driver.next_result().await);
    let expected = SessionState {
        generation: 1,
        ..SessionState::default()
    };
    assert_eq!(driver.state(), &expected);
    assert!(!driver.next_result().await);
    assert_eq!(coach.calls(), vec!["briefing", "questions"]);

    // A fresh session still runs normally
    let state = driver.run(start(2)).await;
    assert_eq!(state.screen, Screen::Briefing);
    assert_eq!(state.generation, 1);
    assert_eq!(state.questions.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_results_apply_as_they_arrive() {
    let mut coach = ScriptedCoach::new(1);
    coach.briefing_delay = Some(Duration::from_secs(2));
    let coach = Arc::new(coach);
    let service = content(coach);
    let db = Arc::new(Database::open_in_memory().unwrap());
    let mut driver = SessionDriver::new(service, db.clone(), Arc::new(Logger::quiet()), "user-1");

    driver.dispatch(start(1));
    assert_eq!(driver.poll_results(), 0);
    assert!(driver.state().is_busy());

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(driver.poll_results(), 1);
    assert_eq!(driver.state().screen, Screen::Briefing);
    assert!(driver.is_settled());
}
