#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// User picked a document to upload.
    FileChosen { source: String },
    /// Upload finished with the assigned job id or a user-facing error.
    UploadFinished {
        result: Result<crate::JobId, String>,
    },
    /// One phase report from the status poller.
    StatusReported { job: crate::JobId, phase: String },
    /// A single status request failed; polling continues.
    PollFailed { job: crate::JobId },
    /// The poll watchdog gave up waiting for a terminal phase.
    WatchTimedOut { job: crate::JobId },
    /// The long-running analysis call finished.
    AnalysisFinished {
        job: crate::JobId,
        result: Result<crate::AnalysisSummary, String>,
    },
    /// Soft-fill clock tick.
    FillTick,
    /// Dot-animation clock tick.
    DotTick,
    /// User changed the target plan language.
    LanguageChanged { language: String },
    /// User overrode the plan day count; zero clears the override.
    DayCountChanged { days: u32 },
    /// User asked for a study plan.
    GenerateClicked,
    /// Plan generation finished with a normalized plan or an error.
    GenerationFinished {
        job: crate::JobId,
        result: Result<crate::GeneratedPlan, String>,
    },
    /// User edited the plan text.
    EditorChanged { text: String },
    /// User asked for the PDF export of the edited text.
    ExportClicked,
    /// Export finished with the artifact path or an error.
    ExportFinished {
        job: crate::JobId,
        result: Result<String, String>,
    },
    /// Restore a previously generated plan from disk.
    SessionRestored { snapshot: crate::SessionSnapshot },
    /// Fallback for placeholder wiring.
    NoOp,
}
