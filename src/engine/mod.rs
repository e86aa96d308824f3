// WHY: Pipeline façade over the five pure citation stages
// Normalizer -> Assigner -> {Rewriter, RecordBuilder}; Formatter is applied on demand by callers

use serde::{Deserialize, Serialize};
use tracing::debug;

pub mod assigner;
pub mod formatter;
pub mod normalizer;
pub mod record;
pub mod rewriter;

pub use assigner::{assign, NumberedSpan};
pub use formatter::{extract_source_info, format_citation, FormattedCitation, SourceInfo};
pub use normalizer::{normalize, resolve_each, Resolution, ResolvedSpan, SpanOutcome};
pub use record::{build, build_validated, validate, Citation, CitationValidationError};
pub use rewriter::rewrite;

use crate::annotation::GeneratedResponse;

/// Configuration for offset resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolveOptions {
    /// Re-locate markers whose claimed offsets do not match the text
    pub fallback_search: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            fallback_search: true,
        }
    }
}

/// Display text plus the ordered citation records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub text: String,
    pub citations: Vec<Citation>,
}

impl ParsedResponse {
    /// Render every citation for display
    pub fn formatted(&self) -> Vec<FormattedCitation> {
        self.citations.iter().map(format_citation).collect()
    }
}

/// Stateless citation engine; safe to share across threads
#[derive(Debug, Clone, Copy, Default)]
pub struct CitationEngine {
    options: ResolveOptions,
}

impl CitationEngine {
    pub fn new(options: ResolveOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Parse a fully buffered response into display text and citations
    ///
    /// Unresolvable annotations are dropped silently. A record that fails
    /// validation aborts the whole parse.
    pub fn parse(&self, response: &GeneratedResponse) -> Result<ParsedResponse, CitationValidationError> {
        let text = response.text.as_str();
        let spans = normalize(text, &response.annotations, &self.options);

        let searched = spans
            .iter()
            .filter(|span| span.resolution == Resolution::Searched)
            .count();
        let candidates = response
            .annotations
            .iter()
            .filter(|annotation| annotation.as_file_citation().is_some())
            .count();
        debug!(
            annotations = response.annotations.len(),
            filtered = response.annotations.len() - candidates,
            resolved = spans.len(),
            searched,
            dropped = candidates - spans.len(),
            "Resolved citation spans"
        );

        let numbered = assign(spans);
        let citations = numbered
            .iter()
            .map(build_validated)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(ParsedResponse {
            text: rewrite(text, &numbered),
            citations,
        })
    }
}

/// Parse with default resolution options
pub fn parse_response(response: &GeneratedResponse) -> Result<ParsedResponse, CitationValidationError> {
    CitationEngine::default().parse(response)
}
