// WHY: Resolves untrusted upstream offsets against the actual response text
// Exact claim first, then forward search from the last accepted span, else drop

use serde::Serialize;
use tracing::debug;

use super::ResolveOptions;
use crate::annotation::{Annotation, FileCitation};

/// How a span was located in the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Claimed offsets bounded the marker exactly
    Exact,
    /// Claimed offsets were stale; marker re-located by forward search
    Searched,
}

/// Span verified to bound exactly the marker text of its source annotation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSpan<'a> {
    pub start: usize,
    pub end: usize,
    /// Position of the source annotation in the input list
    pub input_index: usize,
    pub resolution: Resolution,
    pub citation: &'a FileCitation,
}

/// Per-annotation result of normalization, in input order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpanOutcome<'a> {
    /// Not a citation annotation; never counted
    Filtered,
    /// Citation whose marker could not be located
    Dropped,
    Resolved(ResolvedSpan<'a>),
}

/// Resolve every annotation and report what happened to each one
/// WHY: diagnostics need the dropped/filtered outcomes that `normalize` discards
pub fn resolve_each<'a>(
    text: &str,
    annotations: &'a [Annotation],
    options: &ResolveOptions,
) -> Vec<SpanOutcome<'a>> {
    // Accepted regions sorted by start; non-overlapping so ends are sorted too
    let mut accepted: Vec<(usize, usize)> = Vec::new();
    // End of the most recently accepted span
    let mut cursor = 0usize;

    annotations
        .iter()
        .enumerate()
        .map(|(input_index, annotation)| {
            let Some(citation) = annotation.as_file_citation() else {
                return SpanOutcome::Filtered;
            };

            match locate(text, citation, cursor, &accepted, options) {
                Some((start, resolution)) => {
                    let end = start + citation.marker.len();
                    let pos = accepted.partition_point(|&(s, _)| s < start);
                    accepted.insert(pos, (start, end));
                    cursor = end;
                    SpanOutcome::Resolved(ResolvedSpan {
                        start,
                        end,
                        input_index,
                        resolution,
                        citation,
                    })
                }
                None => {
                    debug!(
                        input_index,
                        marker = %citation.marker,
                        "Dropping unresolvable citation annotation"
                    );
                    SpanOutcome::Dropped
                }
            }
        })
        .collect()
}

/// Resolve citation annotations to verified spans sorted by start offset
pub fn normalize<'a>(
    text: &str,
    annotations: &'a [Annotation],
    options: &ResolveOptions,
) -> Vec<ResolvedSpan<'a>> {
    let mut spans: Vec<ResolvedSpan<'a>> = resolve_each(text, annotations, options)
        .into_iter()
        .filter_map(|outcome| match outcome {
            SpanOutcome::Resolved(span) => Some(span),
            SpanOutcome::Filtered | SpanOutcome::Dropped => None,
        })
        .collect();

    // WHY: stable sort keeps input order for equal starts
    spans.sort_by_key(|span| span.start);
    spans
}

fn locate(
    text: &str,
    citation: &FileCitation,
    cursor: usize,
    accepted: &[(usize, usize)],
    options: &ResolveOptions,
) -> Option<(usize, Resolution)> {
    let marker = citation.marker.as_str();
    if marker.is_empty() {
        return None;
    }

    if let Some(claimed) = citation.claimed {
        // get() rejects out-of-range claims and claims splitting a UTF-8 character
        if text.get(claimed.start..claimed.end) == Some(marker)
            && !overlaps(accepted, claimed.start, claimed.end)
        {
            return Some((claimed.start, Resolution::Exact));
        }
    }

    if !options.fallback_search {
        return None;
    }

    search_forward(text, marker, cursor, accepted).map(|start| (start, Resolution::Searched))
}

/// First occurrence of `marker` at or after `from` that overlaps no accepted region
fn search_forward(text: &str, marker: &str, from: usize, accepted: &[(usize, usize)]) -> Option<usize> {
    let mut pos = from;
    loop {
        let found = pos + text.get(pos..)?.find(marker)?;
        if !overlaps(accepted, found, found + marker.len()) {
            return Some(found);
        }
        // Step one character so overlapping occurrences are still considered
        pos = found + text[found..].chars().next().map_or(1, char::len_utf8);
    }
}

fn overlaps(accepted: &[(usize, usize)], start: usize, end: usize) -> bool {
    let idx = accepted.partition_point(|&(_, e)| e <= start);
    accepted.get(idx).is_some_and(|&(s, _)| s < end)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cite(marker: &str, start: usize, end: usize, file_id: &str) -> Annotation {
        Annotation::file_citation(marker, start, end, file_id, "")
    }

    fn starts(spans: &[ResolvedSpan<'_>]) -> Vec<usize> {
        spans.iter().map(|s| s.start).collect()
    }

    #[test]
    fn test_exact_offsets_accepted_as_is() {
        let text = "A 【x】 B";
        let start = text.find('【').unwrap();
        let end = start + "【x】".len();
        let annotations = vec![cite("【x】", start, end, "file-x")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(spans.len(), 1);
        assert_eq!((spans[0].start, spans[0].end), (start, end));
        assert_eq!(spans[0].resolution, Resolution::Exact);
    }

    #[test]
    fn test_stale_offsets_fall_back_to_search() {
        let text = "intro text 【m】 tail";
        let annotations = vec![cite("【m】", 0, 5, "file-m")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, text.find("【m】").unwrap());
        assert_eq!(spans[0].resolution, Resolution::Searched);
    }

    #[test]
    fn test_search_disabled_drops_mismatch() {
        let text = "intro text 【m】 tail";
        let annotations = vec![cite("【m】", 0, 5, "file-m")];
        let options = ResolveOptions { fallback_search: false };

        assert!(normalize(text, &annotations, &options).is_empty());
    }

    #[test]
    fn test_unresolvable_annotation_dropped_rest_kept() {
        let text = "only 【a】 here";
        let a = text.find("【a】").unwrap();
        let annotations = vec![
            cite("【missing】", 0, 3, "file-0"),
            cite("【a】", a, a + "【a】".len(), "file-a"),
        ];

        let outcomes = resolve_each(text, &annotations, &ResolveOptions::default());
        assert_eq!(outcomes[0], SpanOutcome::Dropped);
        assert!(matches!(outcomes[1], SpanOutcome::Resolved(_)));
    }

    #[test]
    fn test_identical_markers_with_stale_offsets_take_successive_occurrences() {
        let text = "x 【s】 y 【s】 z";
        let annotations = vec![cite("【s】", 900, 905, "file-1"), cite("【s】", 900, 905, "file-2")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        let first = text.find("【s】").unwrap();
        let second = text.rfind("【s】").unwrap();
        assert_eq!(starts(&spans), vec![first, second]);
        assert_eq!(spans[0].citation.file_id, "file-1");
        assert_eq!(spans[1].citation.file_id, "file-2");
    }

    #[test]
    fn test_exact_claim_on_reused_region_searches_forward() {
        let text = "【s】 and 【s】";
        let len = "【s】".len();
        // Both claim the first occurrence; the second must not reuse it
        let annotations = vec![cite("【s】", 0, len, "file-1"), cite("【s】", 0, len, "file-2")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(starts(&spans), vec![0, text.rfind("【s】").unwrap()]);
        assert_eq!(spans[1].resolution, Resolution::Searched);
    }

    #[test]
    fn test_adjacent_markers_resolve_independently() {
        let text = "【a】【b】";
        let len = "【a】".len();
        let annotations = vec![cite("【a】", 0, len, "file-a"), cite("【b】", len, 2 * len, "file-b")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(starts(&spans), vec![0, len]);
        assert_eq!(spans[0].end, spans[1].start);
    }

    #[test]
    fn test_out_of_order_exact_claims_are_sorted_by_start() {
        let text = "【a】 then 【b】";
        let a = 0;
        let b = text.find("【b】").unwrap();
        let len = "【a】".len();
        let annotations = vec![cite("【b】", b, b + len, "file-b"), cite("【a】", a, a + len, "file-a")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(starts(&spans), vec![a, b]);
        assert_eq!(spans[0].input_index, 1);
    }

    #[test]
    fn test_search_never_looks_before_last_accepted_span() {
        let text = "【dup】 【b】";
        let b = text.find("【b】").unwrap();
        let annotations = vec![
            cite("【b】", b, b + "【b】".len(), "file-b"),
            // Stale claim for a marker that only occurs before the cursor
            cite("【dup】", 50, 60, "file-dup"),
        ];

        let outcomes = resolve_each(text, &annotations, &ResolveOptions::default());
        assert!(matches!(outcomes[0], SpanOutcome::Resolved(_)));
        assert_eq!(outcomes[1], SpanOutcome::Dropped);
    }

    #[test]
    fn test_claim_splitting_utf8_character_is_mismatch() {
        let text = "é【c】";
        // Offsets counted in characters rather than bytes
        let annotations = vec![cite("【c】", 1, 4, "file-c")];

        let spans = normalize(text, &annotations, &ResolveOptions::default());
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].start, "é".len());
        assert_eq!(spans[0].resolution, Resolution::Searched);
    }

    #[test]
    fn test_non_citation_kinds_filtered() {
        let text = "a 【x】";
        let annotations = vec![Annotation::other("file_path", "【x】", 2, 7)];

        let outcomes = resolve_each(text, &annotations, &ResolveOptions::default());
        assert_eq!(outcomes, vec![SpanOutcome::Filtered]);
    }

    #[test]
    fn test_empty_marker_dropped() {
        let annotations = vec![cite("", 0, 0, "file-e")];
        let outcomes = resolve_each("text", &annotations, &ResolveOptions::default());
        assert_eq!(outcomes, vec![SpanOutcome::Dropped]);
    }

    #[test]
    fn test_overlap_check() {
        let accepted = vec![(0, 4), (10, 14)];
        assert!(overlaps(&accepted, 2, 6));
        assert!(overlaps(&accepted, 12, 20));
        assert!(!overlaps(&accepted, 4, 10));
        assert!(!overlaps(&accepted, 14, 18));
    }
}
