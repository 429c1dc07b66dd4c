//! Identifier extraction from free text (document paragraphs, text files).
//!
//! Three additive passes feed one deduplicated result:
//! 1. bare digit runs of the allowed length,
//! 2. a loose window that tolerates spaces/hyphens between digits,
//! 3. the whole fragment taken as a single candidate.
//!
//! Every candidate is normalized and validated before acceptance.

use std::collections::HashSet;

use regex::Regex;
use serde::Serialize;

use crate::error::ReconError;
use crate::identifier::{normalize_valid, IdentifierBounds};

/// Extra raw characters the loose pass allows for embedded separators.
const LOOSE_WINDOW_SLACK: usize = 10;

/// An extracted identifier and the text it was found in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EanInfo {
    pub ean: String,
    pub context: String,
}

/// Compiled extraction patterns for one set of bounds.
#[derive(Debug, Clone)]
pub struct Extractor {
    bounds: IdentifierBounds,
    digit_run: Regex,
    formatted_run: Regex,
    digit_group: Regex,
    alnum_word: Regex,
}

impl Extractor {
    pub fn new(bounds: IdentifierBounds) -> Result<Self, ReconError> {
        if bounds.min_digits == 0 || bounds.min_digits > bounds.max_digits {
            return Err(ReconError::ConfigValidation(format!(
                "invalid digit bounds {}..{}",
                bounds.min_digits, bounds.max_digits
            )));
        }

        let compile = |pattern: String| {
            Regex::new(&pattern).map_err(|e| ReconError::ConfigValidation(e.to_string()))
        };

        let digit_run = compile(format!(
            r"\b[0-9]{{{},{}}}\b",
            bounds.min_digits, bounds.max_digits
        ))?;
        // Digit groups joined by spaces/hyphens; windows are cut from it later.
        let formatted_run = compile(r"[0-9]+(?:[ \-]+[0-9]+)*".to_string())?;
        let digit_group = compile(r"[0-9]+".to_string())?;
        let alnum_word = compile(r"[A-Za-z0-9][A-Za-z0-9\-]*[A-Za-z0-9]".to_string())?;

        Ok(Self { bounds, digit_run, formatted_run, digit_group, alnum_word })
    }

    pub fn bounds(&self) -> &IdentifierBounds {
        &self.bounds
    }

    /// Extract identifiers from one text block.
    pub fn extract(&self, text: &str) -> Vec<EanInfo> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        self.extract_into(text, &mut seen, &mut out);
        out
    }

    /// Extract from a sequence of fragments, deduplicating across all of them.
    pub fn extract_fragments<S: AsRef<str>>(&self, fragments: &[S]) -> Vec<EanInfo> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for fragment in fragments {
            self.extract_into(fragment.as_ref(), &mut seen, &mut out);
        }
        out
    }

    fn extract_into(&self, text: &str, seen: &mut HashSet<String>, out: &mut Vec<EanInfo>) {
        let context = text.trim();
        if context.is_empty() {
            return;
        }

        let mut accept = |candidate: &str| {
            if let Some(ean) = normalize_valid(candidate, &self.bounds) {
                if seen.insert(ean.to_lowercase()) {
                    out.push(EanInfo { ean, context: context.to_string() });
                }
            }
        };

        // Pass 1: pure digit runs
        for m in self.digit_run.find_iter(text) {
            accept(m.as_str());
        }

        // Pass 2: formatted digit runs, plus alphanumeric words when allowed
        for run in self.formatted_run.find_iter(text) {
            for candidate in self.loose_windows(run.as_str()) {
                accept(candidate);
            }
        }
        if self.bounds.allow_non_numeric {
            for m in self.alnum_word.find_iter(text) {
                let word = m.as_str();
                let has_digit = word.chars().any(|c| c.is_ascii_digit());
                let has_alpha = word.chars().any(|c| c.is_ascii_alphabetic());
                if has_digit && has_alpha {
                    accept(word);
                }
            }
        }

        // Pass 3: the whole fragment as one code. Fragments with inner whitespace
        // are prose and were already scanned by passes 1 and 2.
        let whole = crate::identifier::normalize(context);
        if !whole.chars().any(char::is_whitespace) {
            accept(&whole);
        }
    }

    /// Candidate windows inside one run of separated digit groups.
    ///
    /// A window starts and ends on group boundaries, holds at most
    /// `max_digits` digits and `max_digits + LOOSE_WINDOW_SLACK` raw chars.
    /// From each start the longest window with enough digits is taken and the
    /// scan resumes after it; a start with no such window is skipped.
    fn loose_windows<'t>(&self, run: &'t str) -> Vec<&'t str> {
        let groups: Vec<(usize, usize)> = self
            .digit_group
            .find_iter(run)
            .map(|m| (m.start(), m.end()))
            .collect();
        let max_raw = self.bounds.max_digits + LOOSE_WINDOW_SLACK;

        let mut windows = Vec::new();
        let mut i = 0;
        while i < groups.len() {
            let mut digits = 0;
            let mut best = None;
            for (j, &(start, end)) in groups.iter().enumerate().skip(i) {
                digits += end - start;
                if digits > self.bounds.max_digits || end - groups[i].0 > max_raw {
                    break;
                }
                if digits >= self.bounds.min_digits {
                    best = Some(j);
                }
            }
            match best {
                Some(j) => {
                    windows.push(&run[groups[i].0..groups[j].1]);
                    i = j + 1;
                }
                None => i += 1,
            }
        }
        windows
    }
}

/// One-shot extraction with freshly compiled patterns.
pub fn extract(text: &str, bounds: &IdentifierBounds) -> Result<Vec<EanInfo>, ReconError> {
    Ok(Extractor::new(*bounds)?.extract(text))
}
