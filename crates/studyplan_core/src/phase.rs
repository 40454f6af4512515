use std::fmt;

pub const PHASE_UPLOADING: &str = "uploading";
pub const PHASE_UPLOADED: &str = "uploaded";
pub const PHASE_ANALYZING: &str = "analyzing";
pub const PHASE_GENERATING: &str = "generating";
pub const PHASE_READY: &str = "ready";
pub const PHASE_ERROR: &str = "error";

/// A phase tag reported by the remote analysis pipeline.
///
/// The tag set is open-ended: the backend renames and adds phases between
/// releases, so unknown tags must flow through without failing.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Phase(String);

impl Phase {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True for the two phases after which no further progress occurs.
    pub fn is_terminal(&self) -> bool {
        self.0 == PHASE_READY || self.0 == PHASE_ERROR
    }

    pub fn is_ready(&self) -> bool {
        self.0 == PHASE_READY
    }

    pub fn is_error(&self) -> bool {
        self.0 == PHASE_ERROR
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Phase {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

/// One registry row: a known tag, its display label, and, for phases that
/// position the progress bar, a percent weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseInfo {
    pub tag: &'static str,
    pub weight: Option<u8>,
    pub label: &'static str,
}

/// Known backend phases. Pure lookup table: rows are not ordered by weight
/// and monotonicity is the progress tracker's job, not the registry's.
///
/// `error` carries no weight so a failure freezes the displayed percent
/// instead of jumping it; `generating` carries no weight because the
/// generation step has no intermediate phase reports at all.
#[rustfmt::skip]
pub const PHASES: &[PhaseInfo] = &[
    PhaseInfo { tag: PHASE_UPLOADING,   weight: Some(5),   label: "Uploading file" },
    PhaseInfo { tag: PHASE_UPLOADED,    weight: Some(10),  label: "File uploaded" },
    PhaseInfo { tag: PHASE_ANALYZING,   weight: Some(20),  label: "Analyzing" },
    PhaseInfo { tag: "extracting",      weight: Some(35),  label: "Extracting pages" },
    PhaseInfo { tag: "extracting_pages", weight: Some(35), label: "Extracting pages" },
    PhaseInfo { tag: "extracting_text", weight: Some(50),  label: "Extracting text" },
    PhaseInfo { tag: "text_extracting", weight: Some(50),  label: "Extracting text" },
    PhaseInfo { tag: "cleaning",        weight: Some(60),  label: "Cleaning text" },
    PhaseInfo { tag: "chunking",        weight: Some(70),  label: "Chunking content" },
    PhaseInfo { tag: "classifying",     weight: Some(80),  label: "Classifying document" },
    PhaseInfo { tag: "structure",       weight: Some(90),  label: "Extracting structure" },
    PhaseInfo { tag: PHASE_READY,       weight: Some(100), label: "Analysis complete" },
    PhaseInfo { tag: PHASE_ERROR,       weight: None,      label: "Error" },
    PhaseInfo { tag: PHASE_GENERATING,  weight: None,      label: "Generating study plan" },
];

pub fn lookup(tag: &str) -> Option<&'static PhaseInfo> {
    PHASES.iter().find(|info| info.tag == tag)
}

/// Registered weight for a tag, if any.
pub fn weight_of(tag: &str) -> Option<u8> {
    lookup(tag).and_then(|info| info.weight)
}

/// Display label for a tag; unknown tags are shown as-is.
pub fn display_label(tag: &str) -> &str {
    match lookup(tag) {
        Some(info) => info.label,
        None => tag,
    }
}

/// Smallest registered weight strictly above `weight`. Caps the soft fill
/// so synthetic progress never overtakes the next real phase jump.
pub fn next_weight_above(weight: u8) -> Option<u8> {
    PHASES
        .iter()
        .filter_map(|info| info.weight)
        .filter(|w| *w > weight)
        .min()
}
