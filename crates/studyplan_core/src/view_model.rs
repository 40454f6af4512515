use crate::plan::{AnalysisSummary, StudyPlan};
use crate::progress::ProgressView;
use crate::state::Step;

/// Snapshot of everything a frontend needs to render the workflow.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppViewModel {
    pub step: Step,
    pub source: Option<String>,
    pub progress: ProgressView,
    pub analysis: Option<AnalysisSummary>,
    pub plan: Option<StudyPlan>,
    pub editable_text: String,
    pub language: String,
    pub day_count: u32,
    pub error: Option<String>,
    pub exporting: bool,
    pub last_export: Option<String>,
    pub can_generate: bool,
    pub can_export: bool,
    pub busy: bool,
    pub dirty: bool,
}
