use std::fmt;
use std::path::PathBuf;

pub type JobId = String;

/// Phases after which the backend reports no further progress for a job.
pub fn is_terminal_phase(tag: &str) -> bool {
    tag == "ready" || tag == "error"
}

/// Analysis findings for an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub document_type: String,
    pub level: Option<String>,
    pub topics: Vec<String>,
    pub summary: Option<String>,
    pub recommended_days: Option<u32>,
    pub language: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizItem {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PlanDay {
    pub day_number: u32,
    pub title: Option<String>,
    pub source_pages: Vec<u32>,
    pub goals: Vec<String>,
    pub theory: Option<String>,
    pub practice: Vec<String>,
    pub summary: Option<String>,
    pub quiz: Vec<QuizItem>,
}

/// Canonical plan shape after wire normalization.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StudyPlan {
    pub requested_days: u32,
    pub language: String,
    pub days: Vec<PlanDay>,
}

/// Successful generation payload: the normalized plan and the preformatted
/// text the backend may send alongside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    pub plan: StudyPlan,
    pub plan_text: Option<String>,
}

/// Everything the engine pushes back to the UI thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    UploadCompleted {
        result: Result<JobId, ApiError>,
    },
    StatusReported {
        job_id: JobId,
        phase: String,
    },
    StatusPollFailed {
        job_id: JobId,
        error: ApiError,
    },
    WatchExpired {
        job_id: JobId,
    },
    AnalysisCompleted {
        job_id: JobId,
        result: Result<AnalysisOutcome, ApiError>,
    },
    PlanCompleted {
        job_id: JobId,
        result: Result<PlanOutcome, ApiError>,
    },
    ExportCompleted {
        job_id: JobId,
        result: Result<PathBuf, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            write!(f, "{}", self.kind)
        } else {
            write!(f, "{}: {}", self.kind, self.message)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    Network,
    Decode,
    MalformedPlan,
    File,
    Persist,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::TooLarge { max_bytes, actual } => {
                write!(f, "response too large (max {max_bytes}, actual {actual:?})")
            }
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "undecodable response"),
            FailureKind::MalformedPlan => write!(f, "malformed plan response"),
            FailureKind::File => write!(f, "file error"),
            FailureKind::Persist => write!(f, "could not write artifact"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}
