use std::path::{Path, PathBuf};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use engine_logging::{engine_debug, engine_info};

use crate::api::{ApiSettings, HttpStudyApi, StudyApi};
use crate::filename::artifact_filename;
use crate::persist::AtomicFileWriter;
use crate::poll::{PollPolicy, StatusPoller};
use crate::types::{ApiError, EngineEvent, FailureKind, JobId};

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub api: ApiSettings,
    pub poll: PollPolicy,
    /// Directory PDF artifacts are written into.
    pub output_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api: ApiSettings::default(),
            poll: PollPolicy::default(),
            output_dir: PathBuf::from("exports"),
        }
    }
}

impl EngineConfig {
    /// Default settings with artifacts going to `output_dir`.
    pub fn default_with_output(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            ..Self::default()
        }
    }
}

enum EngineCommand {
    Upload {
        source: String,
    },
    RequestAnalysis {
        job_id: JobId,
    },
    StartPolling {
        job_id: JobId,
    },
    StopPolling,
    Generate {
        job_id: JobId,
        days: u32,
        language: String,
    },
    Export {
        job_id: JobId,
        text: String,
        days: u32,
    },
}

/// Owns the engine thread: commands go in, events come back out.
///
/// The thread runs a tokio runtime; request commands are spawned onto it
/// while the status poller is owned by the thread itself, which is what
/// keeps it at one poller per job. Clones share the same engine thread and
/// event stream.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(config: EngineConfig) -> Result<Self, ApiError> {
        let api: Arc<dyn StudyApi> = Arc::new(HttpStudyApi::new(config.api.clone())?);
        Ok(Self::with_api(api, config))
    }

    /// Runs the engine against any `StudyApi`; tests script their own.
    pub fn with_api(api: Arc<dyn StudyApi>, config: EngineConfig) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = tokio::runtime::Runtime::new().expect("tokio runtime");
            let writer = Arc::new(AtomicFileWriter::new(config.output_dir.clone()));
            let mut active_poll: Option<StatusPoller> = None;

            while let Ok(command) = cmd_rx.recv() {
                match command {
                    EngineCommand::StartPolling { job_id } => {
                        if let Some(previous) = active_poll.take() {
                            engine_debug!(
                                "poller for job {} replaced by job {}",
                                previous.job_id(),
                                job_id
                            );
                            previous.stop();
                        }
                        let _guard = runtime.enter();
                        active_poll = Some(StatusPoller::spawn(
                            api.clone(),
                            job_id,
                            config.poll.clone(),
                            event_tx.clone(),
                        ));
                    }
                    EngineCommand::StopPolling => {
                        // Idempotent: stopping without an active poller is fine.
                        if let Some(poller) = active_poll.take() {
                            poller.stop();
                        }
                    }
                    request => {
                        let api = api.clone();
                        let events = event_tx.clone();
                        let writer = writer.clone();
                        runtime.spawn(async move {
                            handle_request(api, request, events, writer).await;
                        });
                    }
                }
            }
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn upload(&self, source: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Upload {
            source: source.into(),
        });
    }

    pub fn request_analysis(&self, job_id: impl Into<JobId>) {
        let _ = self.cmd_tx.send(EngineCommand::RequestAnalysis {
            job_id: job_id.into(),
        });
    }

    pub fn start_polling(&self, job_id: impl Into<JobId>) {
        let _ = self.cmd_tx.send(EngineCommand::StartPolling {
            job_id: job_id.into(),
        });
    }

    pub fn stop_polling(&self) {
        let _ = self.cmd_tx.send(EngineCommand::StopPolling);
    }

    pub fn generate(&self, job_id: impl Into<JobId>, days: u32, language: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::Generate {
            job_id: job_id.into(),
            days,
            language: language.into(),
        });
    }

    pub fn export(&self, job_id: impl Into<JobId>, text: impl Into<String>, days: u32) {
        let _ = self.cmd_tx.send(EngineCommand::Export {
            job_id: job_id.into(),
            text: text.into(),
            days,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }
}

async fn handle_request(
    api: Arc<dyn StudyApi>,
    command: EngineCommand,
    events: mpsc::Sender<EngineEvent>,
    writer: Arc<AtomicFileWriter>,
) {
    match command {
        EngineCommand::Upload { source } => {
            let result = api.upload(Path::new(&source)).await;
            let _ = events.send(EngineEvent::UploadCompleted { result });
        }
        EngineCommand::RequestAnalysis { job_id } => {
            let result = api.request_analysis(&job_id).await;
            let _ = events.send(EngineEvent::AnalysisCompleted { job_id, result });
        }
        EngineCommand::Generate {
            job_id,
            days,
            language,
        } => {
            let result = api.generate_plan(&job_id, days, &language).await;
            let _ = events.send(EngineEvent::PlanCompleted { job_id, result });
        }
        EngineCommand::Export { job_id, text, days } => {
            let result = run_export(api.as_ref(), &writer, &job_id, &text, days).await;
            let _ = events.send(EngineEvent::ExportCompleted { job_id, result });
        }
        // Polling commands never reach here; the engine thread owns them.
        EngineCommand::StartPolling { .. } | EngineCommand::StopPolling => {}
    }
}

async fn run_export(
    api: &dyn StudyApi,
    writer: &AtomicFileWriter,
    job_id: &str,
    text: &str,
    days: u32,
) -> Result<PathBuf, ApiError> {
    let bytes = api.export_pdf(job_id, text, days).await?;
    let path = writer
        .write(&artifact_filename(job_id), &bytes)
        .map_err(|err| ApiError::new(FailureKind::Persist, err.to_string()))?;
    engine_info!("wrote study plan artifact {:?}", path);
    Ok(path)
}
