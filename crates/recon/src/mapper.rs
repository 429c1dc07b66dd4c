//! Source → label mapping.
//!
//! Reference sources carry no explicit category. Their names (usually file
//! stems) are matched against the candidate labels of the status column in
//! three passes of decreasing strictness. A label claimed by one source is
//! unavailable to every later source in the same call.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

/// Words that mark a label as the "no-match" outcome.
const NO_MATCH_WORDS: [&str; 6] = ["missing", "not", "none", "unmatched", "absent", "nomatch"];

/// How a source got its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    Manual,
    Exact,
    Contains,
    Token,
}

impl std::fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Manual => write!(f, "manual"),
            Self::Exact => write!(f, "exact"),
            Self::Contains => write!(f, "contains"),
            Self::Token => write!(f, "token"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceMapping {
    pub source: String,
    pub label: String,
    pub method: MatchMethod,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MappingOutcome {
    /// Resolved sources, in input order.
    pub mapped: Vec<SourceMapping>,
    /// Sources no pass could resolve, in input order.
    pub unmapped: Vec<String>,
}

impl MappingOutcome {
    pub fn label_for(&self, source: &str) -> Option<&str> {
        self.mapped
            .iter()
            .find(|m| m.source == source)
            .map(|m| m.label.as_str())
    }

    /// Labels claimed by any source, lowercased.
    pub fn claimed_labels(&self) -> HashSet<String> {
        self.mapped.iter().map(|m| m.label.trim().to_lowercase()).collect()
    }

    pub fn as_map(&self) -> BTreeMap<String, String> {
        self.mapped
            .iter()
            .map(|m| (m.source.clone(), m.label.clone()))
            .collect()
    }
}

fn token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[A-Za-z]{1,10}[0-9]{1,10}|[0-9]{1,10}[A-Za-z]{1,10}")
            .expect("token pattern is valid")
    })
}

/// Letter+digit tokens of `s`, lowercased. Tokens shorter than 3 chars are dropped.
pub fn extract_tokens(s: &str) -> BTreeSet<String> {
    token_regex()
        .find_iter(s)
        .map(|m| m.as_str())
        .filter(|t| t.len() >= 3)
        .map(str::to_lowercase)
        .collect()
}

/// Map each source name to at most one candidate label.
///
/// `manual` entries (source → label) are applied first, claim their labels,
/// and are never revisited by the heuristic passes.
pub fn map_sources_to_labels(
    source_names: &[String],
    candidate_labels: &[String],
    manual: &BTreeMap<String, String>,
) -> MappingOutcome {
    let mut outcome = MappingOutcome::default();
    let mut claimed: HashSet<String> = HashSet::new();
    let mut resolved: HashMap<&str, SourceMapping> = HashMap::new();

    for source in source_names {
        if let Some(label) = manual.get(source) {
            claimed.insert(label.trim().to_lowercase());
            resolved.insert(
                source.as_str(),
                SourceMapping {
                    source: source.clone(),
                    label: label.clone(),
                    method: MatchMethod::Manual,
                },
            );
        }
    }

    for source in source_names {
        if resolved.contains_key(source.as_str()) {
            continue;
        }
        if let Some((label, method)) = match_one(source, candidate_labels, &claimed) {
            claimed.insert(label.trim().to_lowercase());
            resolved.insert(
                source.as_str(),
                SourceMapping {
                    source: source.clone(),
                    label: label.to_string(),
                    method,
                },
            );
        }
    }

    for source in source_names {
        match resolved.remove(source.as_str()) {
            Some(mapping) => outcome.mapped.push(mapping),
            None => {
                if !outcome.mapped.iter().any(|m| &m.source == source) {
                    outcome.unmapped.push(source.clone());
                }
            }
        }
    }

    outcome
}

fn match_one<'a>(
    source: &str,
    labels: &'a [String],
    claimed: &HashSet<String>,
) -> Option<(&'a str, MatchMethod)> {
    let source_lc = source.trim().to_lowercase();
    if source_lc.is_empty() {
        return None;
    }

    let open: Vec<(&'a str, String)> = labels
        .iter()
        .map(|l| (l.as_str(), l.trim().to_lowercase()))
        .filter(|(_, lc)| !lc.is_empty() && !claimed.contains(lc))
        .collect();

    // Pass 1: exact
    if let Some((label, _)) = open.iter().find(|(_, lc)| *lc == source_lc) {
        return Some((*label, MatchMethod::Exact));
    }

    // Pass 2: containment either way
    if let Some((label, _)) = open
        .iter()
        .find(|(_, lc)| lc.contains(&source_lc) || source_lc.contains(lc.as_str()))
    {
        return Some((*label, MatchMethod::Contains));
    }

    // Pass 3: shared letter+digit token
    let source_tokens = extract_tokens(source);
    if source_tokens.is_empty() {
        return None;
    }
    open.iter()
        .find(|(label, _)| !extract_tokens(label).is_disjoint(&source_tokens))
        .map(|(label, _)| (*label, MatchMethod::Token))
}

fn is_no_match_label(label: &str) -> bool {
    let lc = label.to_lowercase();
    if lc.contains("no match") {
        return true;
    }
    lc.split(|c: char| !c.is_alphanumeric())
        .any(|word| NO_MATCH_WORDS.contains(&word))
}

/// A candidate label that reads like a no-match outcome and that no manual
/// mapping targets. It is held out of the heuristic passes.
pub fn reserve_no_match_label(
    candidate_labels: &[String],
    manual: &BTreeMap<String, String>,
) -> Option<String> {
    let manual_targets: HashSet<String> = manual.values().map(|l| l.trim().to_lowercase()).collect();
    candidate_labels
        .iter()
        .find(|l| is_no_match_label(l) && !manual_targets.contains(&l.trim().to_lowercase()))
        .cloned()
}

/// Pick the fallback label among labels no source claimed.
///
/// A label that reads like a no-match outcome wins; otherwise a single
/// remaining label is taken. Several unclaimed, neutral labels give `None`.
pub fn infer_fallback_label(candidate_labels: &[String], outcome: &MappingOutcome) -> Option<String> {
    let claimed = outcome.claimed_labels();
    let unclaimed: Vec<&String> = candidate_labels
        .iter()
        .filter(|l| !claimed.contains(&l.trim().to_lowercase()))
        .collect();

    if let Some(label) = unclaimed.iter().find(|l| is_no_match_label(l)) {
        return Some((*label).clone());
    }
    match unclaimed.as_slice() {
        [only] => Some((*only).clone()),
        _ => None,
    }
}

/// Map sources with the fallback label kept out of reach of every source.
///
/// `reserved` is the fallback when known up front (configured, or found by
/// [`reserve_no_match_label`]). Without it the fallback is inferred from the
/// labels left over after mapping.
pub fn map_with_fallback(
    source_names: &[String],
    candidate_labels: &[String],
    manual: &BTreeMap<String, String>,
    reserved: Option<&str>,
) -> (MappingOutcome, Option<String>) {
    let reserved_lc = reserved.map(|l| l.trim().to_lowercase());
    let pool: Vec<String> = candidate_labels
        .iter()
        .filter(|l| reserved_lc.as_deref() != Some(l.trim().to_lowercase().as_str()))
        .cloned()
        .collect();

    let outcome = map_sources_to_labels(source_names, &pool, manual);
    let fallback = match reserved {
        Some(label) => Some(label.to_string()),
        None => infer_fallback_label(&pool, &outcome),
    };
    (outcome, fallback)
}
