// WHY: Offset debugging for upstream annotations
// Reports claimed vs actual marker locations using the same resolution the engine applies

use anyhow::Result;
use regex_automata::meta::Regex;
use serde::Serialize;
use tracing::{debug, info};

use crate::annotation::Annotation;
use crate::engine::{resolve_each, Resolution, ResolveOptions, SpanOutcome};

/// Default pattern for bracketed citation markers such as `【4:0†source】`
/// Nested opening brackets are excluded so an unbalanced `【` never swallows a cited marker
pub const DEFAULT_MARKER_PATTERN: &str = r"【[^【】]*】";

/// What the normalizer did with one annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OffsetOutcome {
    Exact { start: usize, end: usize },
    Searched { start: usize, end: usize },
    Dropped,
    Filtered,
}

/// Diagnostic record for one annotation, in input order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetEntry {
    pub index: usize,
    pub kind: String,
    pub marker: String,
    pub claimed_start: Option<usize>,
    pub claimed_end: Option<usize>,
    /// Text at the claimed byte range, when that range is valid
    pub claimed_text: Option<String>,
    /// Every byte offset where the marker occurs
    pub occurrences: Vec<usize>,
    /// Claimed offsets bound the marker when read as character indices
    pub matches_as_char_indices: bool,
    pub outcome: OffsetOutcome,
}

/// Marker-shaped substring not covered by any resolved annotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanMarker {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OffsetReport {
    pub entries: Vec<OffsetEntry>,
    pub orphan_markers: Vec<OrphanMarker>,
}

impl OffsetReport {
    /// Count of citation annotations whose claimed offsets were wrong
    pub fn mismatched(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e.outcome, OffsetOutcome::Searched { .. } | OffsetOutcome::Dropped))
            .count()
    }
}

/// Offset diagnostics with a compiled marker scanner
pub struct OffsetDiagnostics {
    marker_regex: Regex,
    options: ResolveOptions,
}

impl OffsetDiagnostics {
    /// Create diagnostics using the default `【…】` marker pattern
    pub fn new(options: ResolveOptions) -> Result<Self> {
        Self::with_marker_pattern(DEFAULT_MARKER_PATTERN, options)
    }

    pub fn with_marker_pattern(pattern: &str, options: ResolveOptions) -> Result<Self> {
        debug!("Compiling marker pattern: {}", pattern);
        let marker_regex = Regex::new(pattern)?;
        Ok(Self {
            marker_regex,
            options,
        })
    }

    /// Build the report for one buffered response
    pub fn diagnose(&self, text: &str, annotations: &[Annotation]) -> OffsetReport {
        let outcomes = resolve_each(text, annotations, &self.options);
        let mut covered: Vec<(usize, usize)> = Vec::new();

        let entries: Vec<OffsetEntry> = annotations
            .iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (annotation, outcome))| {
                let outcome = match outcome {
                    SpanOutcome::Resolved(span) => {
                        covered.push((span.start, span.end));
                        match span.resolution {
                            Resolution::Exact => OffsetOutcome::Exact { start: span.start, end: span.end },
                            Resolution::Searched => OffsetOutcome::Searched { start: span.start, end: span.end },
                        }
                    }
                    SpanOutcome::Dropped => OffsetOutcome::Dropped,
                    SpanOutcome::Filtered => OffsetOutcome::Filtered,
                };
                entry(index, text, annotation, outcome)
            })
            .collect();

        let orphan_markers: Vec<OrphanMarker> = self
            .marker_regex
            .find_iter(text)
            .filter(|m| !covered.iter().any(|&(s, e)| s == m.start() && e == m.end()))
            .map(|m| OrphanMarker {
                start: m.start(),
                end: m.end(),
                text: text[m.start()..m.end()].to_string(),
            })
            .collect();

        let report = OffsetReport {
            entries,
            orphan_markers,
        };
        info!(
            annotations = annotations.len(),
            mismatched = report.mismatched(),
            orphans = report.orphan_markers.len(),
            "Offset diagnosis complete"
        );
        report
    }
}

fn entry(index: usize, text: &str, annotation: &Annotation, outcome: OffsetOutcome) -> OffsetEntry {
    let marker = annotation.marker();
    let claimed = annotation.claimed();

    let occurrences = if marker.is_empty() {
        Vec::new()
    } else {
        text.match_indices(marker).map(|(pos, _)| pos).collect()
    };

    let matches_as_char_indices = !marker.is_empty()
        && claimed
            .and_then(|c| Some((char_to_byte(text, c.start)?, char_to_byte(text, c.end)?)))
            .is_some_and(|(start, end)| text.get(start..end) == Some(marker));

    OffsetEntry {
        index,
        kind: annotation.kind().to_string(),
        marker: marker.to_string(),
        claimed_start: claimed.map(|c| c.start),
        claimed_end: claimed.map(|c| c.end),
        claimed_text: claimed.and_then(|c| text.get(c.start..c.end)).map(str::to_string),
        occurrences,
        matches_as_char_indices,
        outcome,
    }
}

/// Byte offset of the `char_index`-th character; the text length for one past the end
fn char_to_byte(text: &str, char_index: usize) -> Option<usize> {
    text.char_indices()
        .map(|(byte, _)| byte)
        .chain(std::iter::once(text.len()))
        .nth(char_index)
}
