use super::normalizer::ResolvedSpan;

/// Resolved span carrying its 1-based reference number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NumberedSpan<'a> {
    pub id: usize,
    pub span: ResolvedSpan<'a>,
}

/// Assign contiguous ids `1..=n` in left-to-right text order
/// Ties on `start` fall back to input order (unreachable for normalizer output)
pub fn assign(mut spans: Vec<ResolvedSpan<'_>>) -> Vec<NumberedSpan<'_>> {
    spans.sort_by_key(|span| (span.start, span.input_index));
    spans
        .into_iter()
        .enumerate()
        .map(|(idx, span)| NumberedSpan { id: idx + 1, span })
        .collect()
}
