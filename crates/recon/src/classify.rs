use std::collections::{BTreeMap, HashSet};

use serde::Serialize;

use crate::identifier::match_key;

// ---------------------------------------------------------------------------
// Reference sets
// ---------------------------------------------------------------------------

/// Identifiers from one reference source, tied to the label they confirm.
#[derive(Debug, Clone)]
pub struct ReferenceSet {
    pub name: String,
    /// Lower is checked first. Ties keep insertion order.
    pub priority: u32,
    pub label: String,
    members: HashSet<String>,
}

impl ReferenceSet {
    pub fn new<I, S>(name: impl Into<String>, priority: u32, label: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            name: name.into(),
            priority,
            label: label.into(),
            members: members.into_iter().map(|m| match_key(m.as_ref())).collect(),
        }
    }

    pub fn contains(&self, identifier: &str) -> bool {
        self.members.contains(&match_key(identifier))
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Assignment {
    pub identifier: String,
    pub label: String,
    /// Reference set that confirmed the identifier; `None` for the fallback.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// Row (1-based) → label, one entry per classified row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RowAssignment {
    rows: BTreeMap<u32, Assignment>,
}

impl RowAssignment {
    pub fn label(&self, row: u32) -> Option<&str> {
        self.rows.get(&row).map(|a| a.label.as_str())
    }

    pub fn get(&self, row: u32) -> Option<&Assignment> {
        self.rows.get(&row)
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &Assignment)> {
        self.rows.iter().map(|(row, a)| (*row, a))
    }

    /// Plain row → label view, as consumed by writers and the comparator.
    pub fn labels(&self) -> BTreeMap<u32, String> {
        self.rows.iter().map(|(row, a)| (*row, a.label.clone())).collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ClassificationSummary {
    pub total_rows: usize,
    pub matched_rows: usize,
    pub fallback_rows: usize,
    pub label_counts: BTreeMap<String, usize>,
}

impl ClassificationSummary {
    pub fn from_assignment(assignment: &RowAssignment) -> Self {
        let mut summary = Self {
            total_rows: assignment.len(),
            ..Default::default()
        };
        for (_, a) in assignment.iter() {
            *summary.label_counts.entry(a.label.clone()).or_insert(0) += 1;
            if a.source.is_some() {
                summary.matched_rows += 1;
            } else {
                summary.fallback_rows += 1;
            }
        }
        summary
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Label every row of `main` with the first reference set (by priority) that
/// contains its identifier, or with `fallback_label`.
pub fn classify(
    main: &BTreeMap<u32, String>,
    reference_sets: &[ReferenceSet],
    fallback_label: &str,
) -> RowAssignment {
    let mut ordered: Vec<&ReferenceSet> = reference_sets.iter().collect();
    // sort_by_key is stable: equal priorities keep configuration order.
    ordered.sort_by_key(|s| s.priority);

    let rows = main
        .iter()
        .map(|(row, identifier)| {
            let hit = ordered.iter().find(|s| s.contains(identifier));
            let assignment = match hit {
                Some(set) => Assignment {
                    identifier: identifier.clone(),
                    label: set.label.clone(),
                    source: Some(set.name.clone()),
                },
                None => Assignment {
                    identifier: identifier.clone(),
                    label: fallback_label.to_string(),
                    source: None,
                },
            };
            (*row, assignment)
        })
        .collect();

    RowAssignment { rows }
}
