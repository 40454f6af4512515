/// Side effects requested by `update`; the shell owns their execution.
///
/// Ticker starts and stops are explicit effects so the two animation clocks
/// are owned, individually cancellable resources rather than ambient timers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Upload { source: String },
    RequestAnalysis { job: crate::JobId },
    StartPolling { job: crate::JobId },
    StopPolling,
    Generate {
        job: crate::JobId,
        days: u32,
        language: String,
    },
    Export {
        job: crate::JobId,
        text: String,
        days: u32,
    },
    StartFillTicker,
    StopFillTicker,
    StartDotTicker,
    StopDotTicker,
}
