// WHY: Structured citation records plus the hard validation gate
// A validation failure signals an engine defect, so it is a typed error and never swallowed

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::assigner::NumberedSpan;
use super::formatter::extract_source_info;

/// Validated, numbered record describing one resolved reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub id: usize,
    pub file_id: String,
    pub quote: String,
    /// Literal marker text, kept for audit rather than display
    pub original_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_number: Option<u32>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CitationValidationError {
    #[error("citation id must be at least 1, got {id}")]
    NonPositiveId { id: usize },

    #[error("citation {id} has an empty file id")]
    EmptyFileId { id: usize },
}

/// Build the record for a numbered span
pub fn build(numbered: &NumberedSpan<'_>) -> Citation {
    let citation = numbered.span.citation;
    let source = extract_source_info(&citation.file_id);

    Citation {
        id: numbered.id,
        file_id: citation.file_id.clone(),
        quote: citation.quote.clone(),
        original_text: citation.marker.clone(),
        filename: source.filename,
        page_number: source.page_number,
    }
}

pub fn validate(citation: &Citation) -> Result<(), CitationValidationError> {
    if citation.id < 1 {
        return Err(CitationValidationError::NonPositiveId { id: citation.id });
    }
    if citation.file_id.is_empty() {
        return Err(CitationValidationError::EmptyFileId { id: citation.id });
    }
    Ok(())
}

/// Build then validate in one step
pub fn build_validated(numbered: &NumberedSpan<'_>) -> Result<Citation, CitationValidationError> {
    let citation = build(numbered);
    validate(&citation)?;
    Ok(citation)
}
