//! Studyplan engine: remote API access, status polling and effect execution.
mod engine;
mod api;
mod normalize;
mod poll;
mod filename;
mod persist;
mod types;

pub use api::{ApiSettings, HttpStudyApi, StudyApi};
pub use engine::{EngineConfig, EngineHandle};
pub use filename::artifact_filename;
pub use normalize::normalize_plan;
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use poll::{PollPolicy, StatusPoller};
pub use types::{
    is_terminal_phase, AnalysisOutcome, ApiError, EngineEvent, FailureKind, JobId, PlanDay,
    PlanOutcome, QuizItem, StudyPlan,
};
