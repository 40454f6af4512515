use std::time::Duration;

use crate::phase::{self, Phase};

/// Percent shown the instant a new track starts. Never zero, so the bar
/// gives immediate feedback even before the first phase report.
pub const START_FLOOR: u8 = 5;

/// Ceiling for synthetic progress between real phase reports.
pub const SOFT_FILL_CEILING: u8 = 85;

/// Synthetic percent added per fill tick.
pub const SOFT_FILL_STEP: u8 = 2;

/// Recommended cadence for the soft-fill clock.
pub const FILL_TICK_PERIOD: Duration = Duration::from_millis(700);

/// Recommended cadence for the label dot animation.
pub const DOT_TICK_PERIOD: Duration = Duration::from_millis(400);

const DOT_CYCLE: u8 = 4;

/// User-facing progress for the in-flight step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressView {
    pub phase: String,
    pub percent: u8,
    pub label: String,
}

/// Monotonic progress estimator for one workflow step.
///
/// Real phase reports jump the percent to the registered weight. Between
/// reports a soft fill crawls toward the next known weight to mask poll
/// latency. Success pins the percent at 100; failure freezes it where it
/// was. Within a track the displayed percent never decreases.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProgressTracker {
    phase: Option<Phase>,
    percent: u8,
    fill_cap: u8,
    dots: u8,
    finished: bool,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a fresh track for a step entered via `entry`.
    ///
    /// The only place the percent is allowed to move backwards: a new step
    /// restarts the bar at the floor (or the entry phase's weight, if
    /// higher).
    pub fn restart(&mut self, entry: Phase) {
        self.percent = START_FLOOR;
        self.fill_cap = fill_cap_for(&entry);
        self.dots = 0;
        self.finished = false;
        if let Some(weight) = phase::weight_of(entry.as_str()) {
            self.percent = self.percent.max(weight);
        }
        self.phase = Some(entry);
    }

    /// Applies one reported phase.
    ///
    /// Returns false when the report was discarded: the track already ended,
    /// or the tag's weight sits below the displayed percent (an out-of-order
    /// report from the pipeline). Unknown tags are adopted for display but
    /// leave the percent untouched.
    pub fn apply_phase(&mut self, reported: Phase) -> bool {
        if self.finished {
            return false;
        }
        if reported.is_error() {
            self.fail();
            return true;
        }
        if reported.is_ready() {
            self.complete();
            return true;
        }
        match phase::weight_of(reported.as_str()) {
            Some(weight) if weight < self.percent => false,
            Some(weight) => {
                self.percent = weight;
                self.fill_cap = fill_cap_for(&reported);
                self.phase = Some(reported);
                true
            }
            None => {
                self.phase = Some(reported);
                true
            }
        }
    }

    /// One soft-fill tick. No-op once the track ended or the cap is reached.
    pub fn fill_tick(&mut self) {
        if self.finished {
            return;
        }
        let cap = self.fill_cap.min(SOFT_FILL_CEILING);
        if self.percent < cap {
            self.percent = (self.percent + SOFT_FILL_STEP).min(cap);
        }
    }

    /// One dot-animation tick. Cosmetic only; stops with the track.
    pub fn dot_tick(&mut self) {
        if self.finished {
            return;
        }
        self.dots = (self.dots + 1) % DOT_CYCLE;
    }

    /// Terminal success: pin the percent at 100.
    pub fn complete(&mut self) {
        self.phase = Some(Phase::new(phase::PHASE_READY));
        self.percent = 100;
        self.dots = 0;
        self.finished = true;
    }

    /// Terminal failure: freeze the percent at its last value.
    pub fn fail(&mut self) {
        self.phase = Some(Phase::new(phase::PHASE_ERROR));
        self.dots = 0;
        self.finished = true;
    }

    pub fn percent(&self) -> u8 {
        self.percent
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn phase_tag(&self) -> &str {
        self.phase.as_ref().map(Phase::as_str).unwrap_or("")
    }

    pub fn view(&self) -> ProgressView {
        let tag = self.phase_tag();
        let mut label = phase::display_label(tag).to_string();
        if !self.finished {
            for _ in 0..self.dots {
                label.push('.');
            }
        }
        ProgressView {
            phase: tag.to_string(),
            percent: self.percent,
            label,
        }
    }
}

fn fill_cap_for(entry: &Phase) -> u8 {
    match phase::weight_of(entry.as_str()) {
        Some(weight) => phase::next_weight_above(weight)
            .unwrap_or(SOFT_FILL_CEILING)
            .min(SOFT_FILL_CEILING),
        None => SOFT_FILL_CEILING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::{PHASE_ANALYZING, PHASE_ERROR, PHASE_GENERATING, PHASE_READY, PHASE_UPLOADING};

    fn started() -> ProgressTracker {
        let mut tracker = ProgressTracker::new();
        tracker.restart(Phase::new(PHASE_UPLOADING));
        tracker
    }

    #[test]
    fn restart_applies_the_floor_and_entry_weight() {
        let mut tracker = ProgressTracker::new();
        tracker.restart(Phase::new(PHASE_UPLOADING));
        assert_eq!(tracker.percent(), START_FLOOR);
        tracker.restart(Phase::new(PHASE_ANALYZING));
        assert_eq!(tracker.percent(), 20);
    }

    #[test]
    fn restart_without_a_weight_starts_at_the_floor() {
        let mut tracker = ProgressTracker::new();
        tracker.restart(Phase::new(PHASE_GENERATING));
        assert_eq!(tracker.percent(), START_FLOOR);
        assert_eq!(tracker.view().label, "Generating study plan");
    }

    #[test]
    fn phase_reports_jump_to_their_weight() {
        let mut tracker = started();
        assert!(tracker.apply_phase(Phase::new("extracting_text")));
        assert_eq!(tracker.percent(), 50);
        assert!(tracker.apply_phase(Phase::new("classifying")));
        assert_eq!(tracker.percent(), 80);
    }

    #[test]
    fn out_of_order_reports_are_discarded() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("chunking"));
        assert_eq!(tracker.percent(), 70);
        assert!(!tracker.apply_phase(Phase::new("extracting")));
        assert_eq!(tracker.percent(), 70);
        assert_eq!(tracker.view().phase, "chunking");
    }

    #[test]
    fn unknown_phases_keep_the_percent_but_change_the_label() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("cleaning"));
        assert!(tracker.apply_phase(Phase::new("ocr_pass")));
        assert_eq!(tracker.percent(), 60);
        assert_eq!(tracker.view().label, "ocr_pass");
    }

    #[test]
    fn soft_fill_advances_toward_the_next_weight_only() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("extracting"));
        assert_eq!(tracker.percent(), 35);
        for _ in 0..20 {
            tracker.fill_tick();
        }
        // Next registered weight above 35 is 50.
        assert_eq!(tracker.percent(), 50);
    }

    #[test]
    fn soft_fill_never_exceeds_the_ceiling() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("structure"));
        assert_eq!(tracker.percent(), 90);
        tracker.fill_tick();
        assert_eq!(tracker.percent(), 90);

        let mut generation = ProgressTracker::new();
        generation.restart(Phase::new(PHASE_GENERATING));
        for _ in 0..200 {
            generation.fill_tick();
        }
        assert_eq!(generation.percent(), SOFT_FILL_CEILING);
    }

    #[test]
    fn percent_is_monotonic_across_reports_and_ticks() {
        let reports = ["uploaded", "analyzing", "bogus", "extracting", "extracting", "cleaning", "structure"];
        let mut tracker = started();
        let mut last = tracker.percent();
        for tag in reports {
            tracker.apply_phase(Phase::new(tag));
            assert!(tracker.percent() >= last);
            last = tracker.percent();
            for _ in 0..3 {
                tracker.fill_tick();
                assert!(tracker.percent() >= last);
                last = tracker.percent();
            }
        }
    }

    #[test]
    fn ready_pins_the_percent_at_one_hundred() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("cleaning"));
        tracker.apply_phase(Phase::new(PHASE_READY));
        assert_eq!(tracker.percent(), 100);
        assert!(tracker.is_finished());
        tracker.fill_tick();
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn error_freezes_the_percent_where_it_was() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new("chunking"));
        tracker.apply_phase(Phase::new(PHASE_ERROR));
        assert_eq!(tracker.percent(), 70);
        assert!(tracker.is_finished());
        assert_eq!(tracker.view().label, "Error");
        tracker.fill_tick();
        tracker.dot_tick();
        assert_eq!(tracker.percent(), 70);
        assert_eq!(tracker.view().label, "Error");
    }

    #[test]
    fn reports_after_a_terminal_phase_are_ignored() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new(PHASE_READY));
        assert!(!tracker.apply_phase(Phase::new("cleaning")));
        assert_eq!(tracker.percent(), 100);
    }

    #[test]
    fn dots_cycle_through_four_states() {
        let mut tracker = started();
        tracker.apply_phase(Phase::new(PHASE_ANALYZING));
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(tracker.view().label);
            tracker.dot_tick();
        }
        assert_eq!(
            seen,
            vec![
                "Analyzing".to_string(),
                "Analyzing.".to_string(),
                "Analyzing..".to_string(),
                "Analyzing...".to_string(),
                "Analyzing".to_string(),
            ]
        );
    }
}
