use std::fmt;

use crate::phase::{Phase, PHASE_ANALYZING, PHASE_GENERATING, PHASE_UPLOADED, PHASE_UPLOADING};
use crate::plan::{render_plan_text, AnalysisSummary, GeneratedPlan, StudyPlan};
use crate::progress::ProgressTracker;
use crate::view_model::AppViewModel;

/// Fallback plan length when the analysis recommends nothing usable.
pub const DEFAULT_PLAN_DAYS: u32 = 10;

/// Plan language assumed until the user picks one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// Opaque identifier the remote service assigns to an uploaded document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Position in the upload, analyze, generate, export workflow.
///
/// `Ready` is reached twice: after analysis (a summary is present and a plan
/// can be requested) and again after generation (a plan is present and the
/// edited text can be exported). The two are told apart by which result is
/// populated, not by the step name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Step {
    #[default]
    Idle,
    Uploading,
    Analyzing,
    Ready,
    Generating,
    Error,
}

impl Step {
    /// True while a remote request is in flight and the progress clocks run.
    pub fn is_busy(self) -> bool {
        matches!(self, Step::Uploading | Step::Analyzing | Step::Generating)
    }
}

/// Everything a restored session needs to resume editing and exporting a
/// previously generated plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub job: Option<JobId>,
    pub analysis: Option<AnalysisSummary>,
    pub plan: StudyPlan,
    pub editable_text: String,
    pub language: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppState {
    step: Step,
    job: Option<JobId>,
    source: Option<String>,
    progress: ProgressTracker,
    analysis: Option<AnalysisSummary>,
    plan: Option<StudyPlan>,
    editable_text: String,
    language: String,
    day_override: Option<u32>,
    error: Option<String>,
    exporting: bool,
    last_export: Option<String>,
    dirty: bool,
}

impl Default for AppState {
    fn default() -> Self {
        Self {
            step: Step::Idle,
            job: None,
            source: None,
            progress: ProgressTracker::new(),
            analysis: None,
            plan: None,
            editable_text: String::new(),
            language: DEFAULT_LANGUAGE.to_string(),
            day_override: None,
            error: None,
            exporting: false,
            last_export: None,
            dirty: false,
        }
    }
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(&self) -> Step {
        self.step
    }

    pub fn job(&self) -> Option<&JobId> {
        self.job.as_ref()
    }

    pub fn analysis(&self) -> Option<&AnalysisSummary> {
        self.analysis.as_ref()
    }

    pub fn plan(&self) -> Option<&StudyPlan> {
        self.plan.as_ref()
    }

    pub fn editable_text(&self) -> &str {
        &self.editable_text
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn is_exporting(&self) -> bool {
        self.exporting
    }

    /// Day count the next generation request would use: the user's override
    /// if set, else the analysis recommendation, else the fallback.
    pub fn effective_day_count(&self) -> u32 {
        if let Some(days) = self.day_override {
            return days;
        }
        self.analysis
            .as_ref()
            .and_then(|summary| summary.recommended_days)
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_PLAN_DAYS)
    }

    /// Snapshot of the generated plan for persistence, if one exists.
    pub fn session_snapshot(&self) -> Option<SessionSnapshot> {
        let plan = self.plan.clone()?;
        Some(SessionSnapshot {
            job: self.job.clone(),
            analysis: self.analysis.clone(),
            plan,
            editable_text: self.editable_text.clone(),
            language: self.language.clone(),
        })
    }

    pub fn view(&self) -> AppViewModel {
        let has_job = self.job.is_some();
        let can_generate = self.step == Step::Ready && self.analysis.is_some() && has_job;
        let can_export = self.step == Step::Ready
            && self.plan.is_some()
            && has_job
            && !self.exporting
            && !self.editable_text.trim().is_empty();
        AppViewModel {
            step: self.step,
            source: self.source.clone(),
            progress: self.progress.view(),
            analysis: self.analysis.clone(),
            plan: self.plan.clone(),
            editable_text: self.editable_text.clone(),
            language: self.language.clone(),
            day_count: self.effective_day_count(),
            error: self.error.clone(),
            exporting: self.exporting,
            last_export: self.last_export.clone(),
            can_generate,
            can_export,
            busy: self.step.is_busy(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Full reset for a new document. Results and errors from the previous
    /// job are discarded; the language and day override survive.
    pub(crate) fn begin_upload(&mut self, source: String) {
        self.step = Step::Uploading;
        self.job = None;
        self.source = Some(source);
        self.analysis = None;
        self.plan = None;
        self.editable_text.clear();
        self.error = None;
        self.exporting = false;
        self.last_export = None;
        self.progress.restart(Phase::new(PHASE_UPLOADING));
        self.mark_dirty();
    }

    /// Upload succeeded: remember the job and move to analysis.
    pub(crate) fn attach_job(&mut self, job: JobId) {
        self.job = Some(job);
        self.step = Step::Analyzing;
        self.progress.apply_phase(Phase::new(PHASE_UPLOADED));
        self.progress.apply_phase(Phase::new(PHASE_ANALYZING));
        self.mark_dirty();
    }

    /// One non-terminal phase report from the poller.
    pub(crate) fn apply_status(&mut self, reported: Phase) {
        if self.progress.apply_phase(reported) {
            self.mark_dirty();
        }
    }

    pub(crate) fn fill_tick(&mut self) {
        let before = self.progress.percent();
        self.progress.fill_tick();
        if self.progress.percent() != before {
            self.mark_dirty();
        }
    }

    pub(crate) fn dot_tick(&mut self) {
        self.progress.dot_tick();
        self.mark_dirty();
    }

    pub(crate) fn store_analysis(&mut self, summary: AnalysisSummary) {
        self.analysis = Some(summary);
        self.step = Step::Ready;
        self.progress.complete();
        self.mark_dirty();
    }

    pub(crate) fn begin_generation(&mut self) {
        self.step = Step::Generating;
        self.progress.restart(Phase::new(PHASE_GENERATING));
        self.mark_dirty();
    }

    /// Generation succeeded: adopt the plan and seed the editor, preferring
    /// the backend's preformatted text over the local rendering.
    pub(crate) fn store_plan(&mut self, generated: GeneratedPlan) {
        self.editable_text = generated
            .plan_text
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| render_plan_text(&generated.plan));
        self.plan = Some(generated.plan);
        self.step = Step::Ready;
        self.progress.complete();
        self.mark_dirty();
    }

    /// Terminal failure for the current step. The progress bar freezes at
    /// its last value; only a new upload leaves this state.
    pub(crate) fn fail(&mut self, message: String) {
        self.step = Step::Error;
        self.error = Some(message);
        self.exporting = false;
        self.progress.fail();
        self.mark_dirty();
    }

    pub(crate) fn set_language(&mut self, language: String) {
        if language != self.language {
            self.language = language;
            self.mark_dirty();
        }
    }

    /// Zero clears the override and falls back to the recommendation.
    pub(crate) fn set_day_override(&mut self, days: u32) {
        self.day_override = (days > 0).then_some(days);
        self.mark_dirty();
    }

    pub(crate) fn set_editable_text(&mut self, text: String) {
        self.editable_text = text;
        self.mark_dirty();
    }

    pub(crate) fn begin_export(&mut self) {
        self.exporting = true;
        self.mark_dirty();
    }

    pub(crate) fn finish_export(&mut self, path: String) {
        self.exporting = false;
        self.last_export = Some(path);
        self.mark_dirty();
    }

    pub(crate) fn restore_snapshot(&mut self, snapshot: SessionSnapshot) {
        self.job = snapshot.job;
        self.analysis = snapshot.analysis;
        self.editable_text = snapshot.editable_text;
        self.language = snapshot.language;
        self.plan = Some(snapshot.plan);
        self.step = Step::Ready;
        self.progress.complete();
        self.mark_dirty();
    }
}
