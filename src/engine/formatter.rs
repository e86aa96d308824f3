use serde::{Deserialize, Serialize};

use super::record::Citation;

/// Source details decodable from a file identifier
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceInfo {
    pub filename: Option<String>,
    pub page_number: Option<u32>,
}

/// Rendered citation for presentation code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormattedCitation {
    pub id: usize,
    pub display: String,
    pub quote: String,
    pub source: String,
}

/// Decode a filename and page number embedded in a file identifier
///
/// Current identifiers are opaque generated strings carrying neither, so this
/// always returns both fields absent. It is the hook for a future structured
/// identifier format and must not guess at metadata it cannot derive.
pub fn extract_source_info(_file_id: &str) -> SourceInfo {
    SourceInfo::default()
}

/// Render a citation record for display. Pure and deterministic.
pub fn format_citation(citation: &Citation) -> FormattedCitation {
    let display = match (&citation.filename, citation.page_number) {
        (Some(filename), Some(page)) => format!("[{}] {}, page {}", citation.id, filename, page),
        (Some(filename), None) => format!("[{}] {}", citation.id, filename),
        (None, _) => format!("[{}] {}", citation.id, citation.file_id),
    };

    FormattedCitation {
        id: citation.id,
        display,
        quote: citation.quote.clone(),
        source: citation
            .filename
            .clone()
            .unwrap_or_else(|| citation.file_id.clone()),
    }
}
