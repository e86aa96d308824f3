// WHY: Display text is built in one pass so bytes outside markers are copied untouched

use super::assigner::NumberedSpan;

/// Replace each numbered span with `[id]`, copying all other bytes verbatim
///
/// # Panics
/// Panics if `spans` are not sorted by start and non-overlapping, as produced
/// by [`assign`](super::assigner::assign) from normalizer output.
pub fn rewrite(text: &str, spans: &[NumberedSpan<'_>]) -> String {
    let mut output = String::with_capacity(text.len() + spans.len() * 4);
    let mut cursor = 0;

    for numbered in spans {
        debug_assert!(
            numbered.span.start >= cursor,
            "span {} starts at {} before previous end {}",
            numbered.id,
            numbered.span.start,
            cursor
        );
        output.push_str(&text[cursor..numbered.span.start]);
        output.push('[');
        output.push_str(&numbered.id.to_string());
        output.push(']');
        cursor = numbered.span.end;
    }

    output.push_str(&text[cursor..]);
    output
}
