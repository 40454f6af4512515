use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use pretty_assertions::assert_eq;
use tempfile::{NamedTempFile, TempDir};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use studyplan_engine::{
    AnalysisOutcome, ApiError, ApiSettings, EngineConfig, EngineEvent, EngineHandle, FailureKind,
    PlanDay, PlanOutcome, PollPolicy, StudyApi, StudyPlan,
};

/// Backend double for whole-engine tests. Status probes follow a per-job
/// script and fall back to "analyzing"; the other calls answer with fixed
/// payloads.
struct ScriptedWorkflow {
    statuses: Mutex<HashMap<String, VecDeque<String>>>,
    fail_export: bool,
}

impl ScriptedWorkflow {
    fn with_statuses(job_id: &str, phases: &[&str]) -> Arc<Self> {
        let mut statuses = HashMap::new();
        statuses.insert(
            job_id.to_string(),
            phases.iter().map(|phase| phase.to_string()).collect(),
        );
        Arc::new(Self {
            statuses: Mutex::new(statuses),
            fail_export: false,
        })
    }

    fn failing_export() -> Arc<Self> {
        Arc::new(Self {
            statuses: Mutex::new(HashMap::new()),
            fail_export: true,
        })
    }
}

#[async_trait::async_trait]
impl StudyApi for ScriptedWorkflow {
    async fn upload(&self, _source: &Path) -> Result<String, ApiError> {
        Ok("job-1".to_string())
    }

    async fn request_analysis(&self, _job_id: &str) -> Result<AnalysisOutcome, ApiError> {
        Ok(AnalysisOutcome {
            document_type: "textbook".to_string(),
            level: Some("intermediate".to_string()),
            topics: vec!["Ownership".to_string(), "Borrowing".to_string()],
            summary: Some("A tour of the borrow checker.".to_string()),
            recommended_days: Some(7),
            language: Some("en".to_string()),
        })
    }

    async fn fetch_status(&self, job_id: &str) -> Result<String, ApiError> {
        let mut statuses = self.statuses.lock().unwrap();
        Ok(statuses
            .get_mut(job_id)
            .and_then(|phases| phases.pop_front())
            .unwrap_or_else(|| "analyzing".to_string()))
    }

    async fn generate_plan(
        &self,
        _job_id: &str,
        days: u32,
        language: &str,
    ) -> Result<PlanOutcome, ApiError> {
        Ok(PlanOutcome {
            plan: StudyPlan {
                requested_days: days,
                language: language.to_string(),
                days: vec![PlanDay {
                    day_number: 1,
                    title: Some("Kick-off".to_string()),
                    ..PlanDay::default()
                }],
            },
            plan_text: Some("Day 1: Kick-off".to_string()),
        })
    }

    async fn export_pdf(&self, _job_id: &str, _text: &str, _days: u32) -> Result<Vec<u8>, ApiError> {
        if self.fail_export {
            Err(ApiError {
                kind: FailureKind::HttpStatus(500),
                message: "renderer crashed".to_string(),
            })
        } else {
            Ok(b"%PDF-1.4 scripted".to_vec())
        }
    }
}

fn config_for(dir: &TempDir) -> EngineConfig {
    EngineConfig {
        api: ApiSettings::default(),
        poll: PollPolicy {
            cadence: Duration::from_millis(20),
            ..PollPolicy::default()
        },
        output_dir: dir.path().join("exports"),
    }
}

/// Collects events until `want` arrived or patience ran out.
fn wait_for(engine: &EngineHandle, want: usize, patience: Duration) -> Vec<EngineEvent> {
    let deadline = Instant::now() + patience;
    let mut events = Vec::new();
    while events.len() < want && Instant::now() < deadline {
        match engine.try_recv() {
            Some(event) => events.push(event),
            None => thread::sleep(Duration::from_millis(10)),
        }
    }
    events
}

fn drain(engine: &EngineHandle) {
    while engine.try_recv().is_some() {}
}

/// `wait_for` with awaits instead of blocking sleeps, so a mock server
/// sharing the test runtime keeps serving while we wait.
async fn collect_events(engine: &EngineHandle, want: usize, patience: Duration) -> Vec<EngineEvent> {
    let deadline = tokio::time::Instant::now() + patience;
    let mut events = Vec::new();
    while events.len() < want && tokio::time::Instant::now() < deadline {
        match engine.try_recv() {
            Some(event) => events.push(event),
            None => tokio::time::sleep(Duration::from_millis(10)).await,
        }
    }
    events
}

#[test]
fn a_full_workflow_travels_through_every_stage() {
    let tmp = TempDir::new().unwrap();
    let api = ScriptedWorkflow::with_statuses("job-1", &["extracting_text", "ready"]);
    let engine = EngineHandle::with_api(api, config_for(&tmp));

    engine.upload("handbook.pdf");
    let events = wait_for(&engine, 1, Duration::from_secs(2));
    assert_eq!(
        events,
        vec![EngineEvent::UploadCompleted {
            result: Ok("job-1".to_string())
        }]
    );

    engine.request_analysis("job-1");
    engine.start_polling("job-1");
    // The analysis answer and the status reports race; only the reports
    // among themselves have a fixed order.
    let events = wait_for(&engine, 3, Duration::from_secs(2));
    assert_eq!(events.len(), 3);
    let phases: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            EngineEvent::StatusReported { job_id, phase } => {
                assert_eq!(job_id, "job-1");
                Some(phase.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(phases, vec!["extracting_text", "ready"]);
    let analysis = events
        .iter()
        .find_map(|event| match event {
            EngineEvent::AnalysisCompleted { job_id, result } => {
                assert_eq!(job_id, "job-1");
                Some(result.clone())
            }
            _ => None,
        })
        .expect("analysis event");
    assert_eq!(analysis.unwrap().recommended_days, Some(7));

    engine.generate("job-1", 7, "en");
    let events = wait_for(&engine, 1, Duration::from_secs(2));
    match &events[0] {
        EngineEvent::PlanCompleted { job_id, result } => {
            assert_eq!(job_id, "job-1");
            let outcome = result.clone().unwrap();
            assert_eq!(outcome.plan.requested_days, 7);
            assert_eq!(outcome.plan.language, "en");
            assert_eq!(outcome.plan_text.as_deref(), Some("Day 1: Kick-off"));
        }
        other => panic!("expected a plan event, got {other:?}"),
    }

    engine.export("job-1", "Day 1: Kick-off", 7);
    let events = wait_for(&engine, 1, Duration::from_secs(2));
    match &events[0] {
        EngineEvent::ExportCompleted { job_id, result } => {
            assert_eq!(job_id, "job-1");
            let path = result.clone().unwrap();
            assert_eq!(path, tmp.path().join("exports").join("study-plan--job-1.pdf"));
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 scripted");
        }
        other => panic!("expected an export event, got {other:?}"),
    }
}

#[test]
fn starting_a_new_job_replaces_the_previous_poller() {
    let tmp = TempDir::new().unwrap();
    let api = ScriptedWorkflow::with_statuses("job-1", &[]);
    let engine = EngineHandle::with_api(api, config_for(&tmp));

    engine.start_polling("job-1");
    thread::sleep(Duration::from_millis(100));
    engine.start_polling("job-2");

    // Give the replaced loop time to observe its cancellation, then throw
    // away everything reported so far.
    thread::sleep(Duration::from_millis(100));
    drain(&engine);

    let events = wait_for(&engine, 3, Duration::from_secs(1));
    assert!(!events.is_empty());
    for event in &events {
        match event {
            EngineEvent::StatusReported { job_id, .. } => assert_eq!(job_id, "job-2"),
            other => panic!("unexpected event {other:?}"),
        }
    }

    engine.stop_polling();
    thread::sleep(Duration::from_millis(100));
    drain(&engine);
    thread::sleep(Duration::from_millis(150));
    assert!(engine.try_recv().is_none());
}

#[test]
fn stopping_without_an_active_poller_is_harmless() {
    let tmp = TempDir::new().unwrap();
    let api = ScriptedWorkflow::with_statuses("job-1", &[]);
    let engine = EngineHandle::with_api(api, config_for(&tmp));

    engine.stop_polling();
    engine.upload("notes.pdf");
    let events = wait_for(&engine, 1, Duration::from_secs(2));
    assert_eq!(
        events,
        vec![EngineEvent::UploadCompleted {
            result: Ok("job-1".to_string())
        }]
    );
}

#[tokio::test]
async fn the_real_client_drives_the_whole_workflow() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/upload/"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "file_id": "job-9" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/analyze/status/job-9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({ "status": "ready" })),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/analyze/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "analysis": { "document_type": "textbook", "main_topics": ["sets"], "recommended_days": 3 }
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/studyplan/study"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "plan": { "days": [{ "day_number": 1, "title": "Sets" }] },
            "plan_text": "Day 1: Sets\n"
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/plan/pdf/job-9"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(&b"%PDF-1.4 full loop"[..], "application/pdf"),
        )
        .mount(&server)
        .await;

    let source = NamedTempFile::new().unwrap();
    fs::write(source.path(), b"%PDF-1.4 source").unwrap();
    let tmp = TempDir::new().unwrap();
    let config = EngineConfig {
        api: ApiSettings {
            base_url: server.uri(),
            ..ApiSettings::default()
        },
        poll: PollPolicy {
            cadence: Duration::from_millis(20),
            ..PollPolicy::default()
        },
        output_dir: tmp.path().join("exports"),
    };
    let engine = EngineHandle::new(config).expect("engine");

    engine.upload(source.path().display().to_string());
    let events = collect_events(&engine, 1, Duration::from_secs(2)).await;
    assert_eq!(
        events,
        vec![EngineEvent::UploadCompleted {
            result: Ok("job-9".to_string())
        }]
    );

    engine.request_analysis("job-9");
    engine.start_polling("job-9");
    let events = collect_events(&engine, 2, Duration::from_secs(2)).await;
    assert!(events.iter().any(|event| matches!(
        event,
        EngineEvent::StatusReported { phase, .. } if phase == "ready"
    )));
    let analysis = events
        .iter()
        .find_map(|event| match event {
            EngineEvent::AnalysisCompleted { result, .. } => Some(result.clone()),
            _ => None,
        })
        .expect("analysis event");
    assert_eq!(analysis.unwrap().recommended_days, Some(3));

    engine.generate("job-9", 3, "en");
    let events = collect_events(&engine, 1, Duration::from_secs(2)).await;
    match &events[0] {
        EngineEvent::PlanCompleted { result, .. } => {
            let outcome = result.clone().unwrap();
            assert_eq!(outcome.plan.days[0].title.as_deref(), Some("Sets"));
            assert_eq!(outcome.plan_text.as_deref(), Some("Day 1: Sets\n"));
        }
        other => panic!("expected a plan event, got {other:?}"),
    }

    engine.export("job-9", "Day 1: Sets\n", 3);
    let events = collect_events(&engine, 1, Duration::from_secs(2)).await;
    match &events[0] {
        EngineEvent::ExportCompleted { result, .. } => {
            let path = result.clone().unwrap();
            assert_eq!(fs::read(&path).unwrap(), b"%PDF-1.4 full loop");
        }
        other => panic!("expected an export event, got {other:?}"),
    }
}

#[test]
fn a_failed_export_reports_the_error_and_writes_nothing() {
    let tmp = TempDir::new().unwrap();
    let api = ScriptedWorkflow::failing_export();
    let engine = EngineHandle::with_api(api, config_for(&tmp));

    engine.export("job-9", "whatever", 5);
    let events = wait_for(&engine, 1, Duration::from_secs(2));
    match &events[0] {
        EngineEvent::ExportCompleted { job_id, result } => {
            assert_eq!(job_id, "job-9");
            assert_eq!(result.clone().unwrap_err().kind, FailureKind::HttpStatus(500));
        }
        other => panic!("expected an export event, got {other:?}"),
    }
    assert!(!tmp.path().join("exports").exists());
}
