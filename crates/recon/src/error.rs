use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconError {
    /// TOML parse / deserialization error.
    #[error("config parse error: {0}")]
    ConfigParse(String),

    /// Config validation error (bad bounds, bad column, duplicate source, etc.).
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Candidate label count disagrees with the expected count under strict checking.
    #[error("expected {expected} candidate label(s), found {found}")]
    LabelCountMismatch { expected: usize, found: usize },

    /// Reference sources that could not be tied to a label, with no fallback to absorb them.
    #[error("{}", unresolved_message(.sources))]
    UnresolvedMapping { sources: Vec<String> },

    /// The main source produced zero valid identifiers.
    #[error("no valid identifiers found in the main source (check column, start row and digit bounds)")]
    NoIdentifiers,

    /// The main source offers no candidate labels at all.
    #[error("no candidate labels found for the status column")]
    EmptyCandidateLabels,
}

fn unresolved_message(sources: &[String]) -> String {
    if sources.is_empty() {
        "no fallback label could be determined (configure `labels.fallback`)".into()
    } else {
        format!(
            "cannot map source(s) to a label and no fallback label is available: {}",
            sources.join(", ")
        )
    }
}
