//! Studyplan core: pure workflow state machine and view-model helpers.
mod effect;
mod msg;
mod phase;
mod plan;
mod progress;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use msg::Msg;
pub use phase::{
    display_label, lookup, next_weight_above, weight_of, Phase, PhaseInfo, PHASES, PHASE_ANALYZING,
    PHASE_ERROR, PHASE_GENERATING, PHASE_READY, PHASE_UPLOADED, PHASE_UPLOADING,
};
pub use plan::{
    render_plan_text, AnalysisSummary, GeneratedPlan, PlanDay, QuizItem, StudyPlan,
};
pub use progress::{
    ProgressTracker, ProgressView, DOT_TICK_PERIOD, FILL_TICK_PERIOD, SOFT_FILL_CEILING,
    SOFT_FILL_STEP, START_FLOOR,
};
pub use state::{
    AppState, JobId, SessionSnapshot, Step, DEFAULT_LANGUAGE, DEFAULT_PLAN_DAYS,
};
pub use update::update;
pub use view_model::AppViewModel;
