use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::Serialize;

use crate::classify::{classify, ClassificationSummary, ReferenceSet, RowAssignment};
use crate::error::ReconError;
use crate::events::{EventLog, RunEvent};
use crate::mapper::{map_with_fallback, reserve_no_match_label, MappingOutcome};

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// Identifiers gathered from one reference source.
#[derive(Debug, Clone)]
pub struct ReferenceInput {
    /// Source name used for label matching (usually the file stem).
    pub name: String,
    pub priority: u32,
    pub members: BTreeSet<String>,
}

/// Pre-loaded snapshot of everything a run needs.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// Row → normalized, validated identifier from the main source.
    pub main: BTreeMap<u32, String>,
    /// Candidate labels of the status column, in list order.
    pub candidate_labels: Vec<String>,
    pub references: Vec<ReferenceInput>,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Source name → label. Never overridden by name matching.
    pub manual_mappings: BTreeMap<String, String>,
    pub fallback_label: Option<String>,
    pub expected_label_count: Option<usize>,
    /// Upgrade an expected-count disagreement from a warning to an error.
    pub strict_label_count: bool,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct RunMeta {
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunOutput {
    pub meta: RunMeta,
    pub candidate_labels: Vec<String>,
    pub mapping: MappingOutcome,
    pub fallback_label: String,
    pub summary: ClassificationSummary,
    pub assignment: RowAssignment,
    pub events: Vec<RunEvent>,
}

/// A failed run: the error plus every event emitted before it.
#[derive(Debug)]
pub struct RunFailure {
    pub error: ReconError,
    pub events: Vec<RunEvent>,
}

impl std::fmt::Display for RunFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

/// Run one reconciliation pass: map sources to labels, pick the fallback,
/// classify every main row.
pub fn run(input: &RunInput, options: &RunOptions) -> Result<RunOutput, RunFailure> {
    let mut log = EventLog::new();
    match run_inner(input, options, &mut log) {
        Ok(mut output) => {
            output.events = log.into_events();
            Ok(output)
        }
        Err(error) => {
            log.error(error.to_string());
            Err(RunFailure { error, events: log.into_events() })
        }
    }
}

fn run_inner(input: &RunInput, options: &RunOptions, log: &mut EventLog) -> Result<RunOutput, ReconError> {
    let labels = dedupe_labels(&input.candidate_labels, log);
    if labels.is_empty() {
        return Err(ReconError::EmptyCandidateLabels);
    }
    log.info(format!("{} candidate label(s): {}", labels.len(), labels.join(", ")));

    if let Some(expected) = options.expected_label_count {
        if expected != labels.len() {
            if options.strict_label_count {
                return Err(ReconError::LabelCountMismatch { expected, found: labels.len() });
            }
            log.warn(format!("expected {expected} candidate label(s), found {}", labels.len()));
        }
    }

    if input.main.is_empty() {
        return Err(ReconError::NoIdentifiers);
    }
    log.info(format!("{} identifier(s) in main source", input.main.len()));

    let mut names = HashSet::new();
    for reference in &input.references {
        if !names.insert(reference.name.to_lowercase()) {
            return Err(ReconError::ConfigValidation(format!(
                "two reference sources share the name '{}'",
                reference.name
            )));
        }
        if reference.members.is_empty() {
            log.warn(format!("reference '{}' has no valid identifiers", reference.name));
        }
    }

    for (source, label) in &options.manual_mappings {
        if !labels.iter().any(|l| l.eq_ignore_ascii_case(label)) {
            log.warn(format!(
                "manual label '{label}' for '{source}' is not a candidate label"
            ));
        }
    }

    let reserved = reserve_fallback(&labels, options)?;
    let source_names: Vec<String> = input.references.iter().map(|r| r.name.clone()).collect();
    let (mapping, fallback) = map_with_fallback(
        &source_names,
        &labels,
        &options.manual_mappings,
        reserved.as_deref(),
    );
    for m in &mapping.mapped {
        log.info(format!("'{}' → '{}' ({})", m.source, m.label, m.method));
    }

    if !mapping.unmapped.is_empty() {
        match &fallback {
            Some(_) => {
                for source in &mapping.unmapped {
                    log.warn(format!("'{source}' matches no label; its identifiers are ignored"));
                }
            }
            None => {
                return Err(ReconError::UnresolvedMapping { sources: mapping.unmapped.clone() });
            }
        }
    }
    let fallback = fallback.ok_or(ReconError::UnresolvedMapping { sources: Vec::new() })?;
    log.info(format!("fallback label: '{fallback}'"));

    let reference_sets: Vec<ReferenceSet> = input
        .references
        .iter()
        .filter_map(|r| {
            let label = mapping.label_for(&r.name)?;
            Some(ReferenceSet::new(&r.name, r.priority, label, &r.members))
        })
        .collect();

    let assignment = classify(&input.main, &reference_sets, &fallback);
    let summary = ClassificationSummary::from_assignment(&assignment);
    log.info(format!(
        "classified {} row(s): {} matched, {} fallback",
        summary.total_rows, summary.matched_rows, summary.fallback_rows
    ));

    Ok(RunOutput {
        meta: RunMeta {
            engine_version: env!("CARGO_PKG_VERSION").into(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        candidate_labels: labels,
        mapping,
        fallback_label: fallback,
        summary,
        assignment,
        events: Vec::new(),
    })
}

/// Trim labels, drop empties and case-insensitive duplicates, keep order.
fn dedupe_labels(labels: &[String], log: &mut EventLog) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for label in labels {
        let label = label.trim();
        if label.is_empty() {
            continue;
        }
        if seen.insert(label.to_lowercase()) {
            out.push(label.to_string());
        } else {
            log.warn(format!("duplicate candidate label '{label}' ignored"));
        }
    }
    out
}

/// The fallback label known before mapping: the configured one, or a
/// no-match label among the candidates.
fn reserve_fallback(labels: &[String], options: &RunOptions) -> Result<Option<String>, ReconError> {
    let Some(configured) = &options.fallback_label else {
        return Ok(reserve_no_match_label(labels, &options.manual_mappings));
    };

    let label = labels
        .iter()
        .find(|l| l.eq_ignore_ascii_case(configured.trim()))
        .ok_or_else(|| {
            ReconError::ConfigValidation(format!("fallback label '{configured}' is not a candidate label"))
        })?;
    if options
        .manual_mappings
        .values()
        .any(|m| m.trim().eq_ignore_ascii_case(label))
    {
        return Err(ReconError::ConfigValidation(format!(
            "fallback label '{label}' is also mapped manually to a reference source"
        )));
    }
    Ok(Some(label.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLevel;

    fn labels(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn reference(name: &str, priority: u32, members: &[&str]) -> ReferenceInput {
        ReferenceInput {
            name: name.into(),
            priority,
            members: members.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn input() -> RunInput {
        RunInput {
            main: [(3, "12345678901234"), (4, "99999999999999")]
                .into_iter()
                .map(|(r, id)| (r, id.to_string()))
                .collect(),
            candidate_labels: labels(&["Received - Vendor A", "Received - Vendor B", "Missing"]),
            references: vec![
                reference("Vendor A", 1, &["12345678901234"]),
                reference("Vendor B", 2, &[]),
            ],
        }
    }

    #[test]
    fn end_to_end_assignment() {
        let out = run(&input(), &RunOptions::default()).unwrap();
        assert_eq!(out.fallback_label, "Missing");
        assert_eq!(out.assignment.label(3), Some("Received - Vendor A"));
        assert_eq!(out.assignment.label(4), Some("Missing"));
        assert_eq!(out.assignment.len(), 2);
        // Vendor B has no identifiers.
        assert!(out.events.iter().any(|e| e.level == EventLevel::Warning));
    }

    #[test]
    fn empty_labels_fail() {
        let mut i = input();
        i.candidate_labels = labels(&["", "  "]);
        let err = run(&i, &RunOptions::default()).unwrap_err();
        assert!(matches!(err.error, ReconError::EmptyCandidateLabels));
        assert_eq!(err.events.last().map(|e| e.level), Some(EventLevel::Error));
    }

    #[test]
    fn empty_main_fails() {
        let mut i = input();
        i.main.clear();
        let err = run(&i, &RunOptions::default()).unwrap_err();
        assert!(matches!(err.error, ReconError::NoIdentifiers));
    }

    #[test]
    fn label_count_warns_unless_strict() {
        let mut options = RunOptions { expected_label_count: Some(4), ..Default::default() };
        let out = run(&input(), &options).unwrap();
        assert!(out.events.iter().any(|e| e.message.contains("expected 4")));

        options.strict_label_count = true;
        let err = run(&input(), &options).unwrap_err();
        assert!(matches!(err.error, ReconError::LabelCountMismatch { expected: 4, found: 3 }));
    }

    #[test]
    fn duplicate_labels_are_collapsed() {
        let mut i = input();
        i.candidate_labels.push("missing".into());
        let out = run(&i, &RunOptions::default()).unwrap();
        assert_eq!(out.candidate_labels.len(), 3);
    }

    #[test]
    fn unmapped_source_without_fallback_is_fatal() {
        let i = RunInput {
            main: [(1, "12345678".to_string())].into_iter().collect(),
            candidate_labels: labels(&["Vendor A", "Open", "Pending"]),
            references: vec![reference("Vendor A", 1, &[]), reference("scan", 2, &[])],
        };
        let err = run(&i, &RunOptions::default()).unwrap_err();
        match err.error {
            ReconError::UnresolvedMapping { sources } => assert_eq!(sources, vec!["scan".to_string()]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unmapped_source_with_fallback_is_skipped() {
        let mut i = input();
        i.references.push(reference("scan", 3, &["99999999999999"]));
        let out = run(&i, &RunOptions::default()).unwrap();
        assert_eq!(out.mapping.unmapped, vec!["scan".to_string()]);
        assert_eq!(out.assignment.label(4), Some("Missing"));
    }

    #[test]
    fn manual_mapping_and_configured_fallback() {
        let mut options = RunOptions {
            fallback_label: Some("missing".into()),
            ..Default::default()
        };
        options
            .manual_mappings
            .insert("Vendor A".into(), "Received - Vendor B".into());
        let mut i = input();
        i.references.truncate(1);
        let out = run(&i, &options).unwrap();
        assert_eq!(out.fallback_label, "Missing");
        assert_eq!(out.assignment.label(3), Some("Received - Vendor B"));
    }

    #[test]
    fn configured_fallback_cannot_be_a_manual_target() {
        let mut options = RunOptions {
            fallback_label: Some("Missing".into()),
            ..Default::default()
        };
        options.manual_mappings.insert("Vendor A".into(), "missing".into());
        let err = run(&input(), &options).unwrap_err();
        assert!(matches!(err.error, ReconError::ConfigValidation(_)));
    }

    fn acme_input() -> RunInput {
        RunInput {
            main: [(2, "12345678901234"), (3, "99999999999999")]
                .into_iter()
                .map(|(r, id)| (r, id.to_string()))
                .collect(),
            candidate_labels: labels(&["Missing", "Received - ACME2024"]),
            references: vec![reference("ACME2024 missing items", 1, &["12345678901234"])],
        }
    }

    #[test]
    fn inferred_no_match_label_is_not_given_to_a_source() {
        let out = run(&acme_input(), &RunOptions::default()).unwrap();
        assert_eq!(out.fallback_label, "Missing");
        assert_eq!(out.mapping.label_for("ACME2024 missing items"), Some("Received - ACME2024"));
        assert_eq!(out.assignment.label(2), Some("Received - ACME2024"));
        assert_eq!(out.assignment.label(3), Some("Missing"));
    }

    #[test]
    fn configured_fallback_is_held_out_of_mapping() {
        let options = RunOptions {
            fallback_label: Some("Missing".into()),
            ..Default::default()
        };
        let out = run(&acme_input(), &options).unwrap();
        assert_eq!(out.fallback_label, "Missing");
        assert_eq!(out.assignment.label(2), Some("Received - ACME2024"));
        assert_eq!(out.assignment.label(3), Some("Missing"));
    }

    #[test]
    fn configured_fallback_leaves_its_source_unmapped() {
        let options = RunOptions {
            fallback_label: Some("Received - Vendor A".into()),
            ..Default::default()
        };
        let out = run(&input(), &options).unwrap();
        assert_eq!(out.fallback_label, "Received - Vendor A");
        assert!(out.mapping.mapped.iter().all(|m| m.label != "Received - Vendor A"));
    }

    #[test]
    fn duplicate_source_names_are_rejected() {
        let mut i = input();
        i.references.push(reference("vendor a", 3, &[]));
        let err = run(&i, &RunOptions::default()).unwrap_err();
        assert!(matches!(err.error, ReconError::ConfigValidation(_)));
    }
}
