// WHY: Boundary types for the generation collaborator's response object
// Loosely typed upstream annotations are narrowed to a tagged enum on deserialization

use serde::{Deserialize, Serialize};

/// Kind tag of the only annotation variant that carries a citation payload
pub const FILE_CITATION_KIND: &str = "file_citation";

/// Buffered response from the generation collaborator
/// WHY: the engine needs the complete text and annotation list up front, so
/// partial/streaming responses are never represented here
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratedResponse {
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
}

impl GeneratedResponse {
    pub fn new(text: impl Into<String>, annotations: Vec<Annotation>) -> Self {
        Self {
            text: text.into(),
            annotations,
        }
    }
}

/// Half-open byte range `[start, end)` claimed by upstream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimedOffsets {
    pub start: usize,
    pub end: usize,
}

/// Citation annotation payload after boundary validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCitation {
    /// Literal marker text as it should appear in the response
    pub marker: String,
    /// `None` when upstream sent negative or inverted offsets
    pub claimed: Option<ClaimedOffsets>,
    /// Empty ids survive deserialization and fail record validation
    pub file_id: String,
    pub quote: String,
}

/// One upstream annotation
///
/// Only `file_citation` annotations carry a payload; every other kind
/// (and citations missing their payload) collapses to `Other` and is dropped
/// by the normalizer without consuming a sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawAnnotation", into = "RawAnnotation")]
pub enum Annotation {
    FileCitation(FileCitation),
    Other(OtherAnnotation),
}

/// Payload-less annotation, kept only so diagnostics can report what was filtered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtherAnnotation {
    pub kind: String,
    pub marker: String,
    pub claimed: Option<ClaimedOffsets>,
}

impl Annotation {
    /// Convenience constructor for a citation annotation with well-formed offsets
    pub fn file_citation(
        marker: impl Into<String>,
        start: usize,
        end: usize,
        file_id: impl Into<String>,
        quote: impl Into<String>,
    ) -> Self {
        Annotation::FileCitation(FileCitation {
            marker: marker.into(),
            claimed: Some(ClaimedOffsets { start, end }),
            file_id: file_id.into(),
            quote: quote.into(),
        })
    }

    /// Convenience constructor for a non-citation annotation
    pub fn other(kind: impl Into<String>, marker: impl Into<String>, start: usize, end: usize) -> Self {
        Annotation::Other(OtherAnnotation {
            kind: kind.into(),
            marker: marker.into(),
            claimed: Some(ClaimedOffsets { start, end }),
        })
    }

    pub fn kind(&self) -> &str {
        match self {
            Annotation::FileCitation(_) => FILE_CITATION_KIND,
            Annotation::Other(other) => &other.kind,
        }
    }

    pub fn marker(&self) -> &str {
        match self {
            Annotation::FileCitation(citation) => &citation.marker,
            Annotation::Other(other) => &other.marker,
        }
    }

    pub fn claimed(&self) -> Option<ClaimedOffsets> {
        match self {
            Annotation::FileCitation(citation) => citation.claimed,
            Annotation::Other(other) => other.claimed,
        }
    }

    pub fn as_file_citation(&self) -> Option<&FileCitation> {
        match self {
            Annotation::FileCitation(citation) => Some(citation),
            Annotation::Other(_) => None,
        }
    }
}

/// Wire shape of an annotation as sent by the generation service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawAnnotation {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    start_index: Option<i64>,
    #[serde(default)]
    end_index: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    file_citation: Option<RawFileCitation>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RawFileCitation {
    #[serde(default)]
    file_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    quote: Option<String>,
}

fn claimed_offsets(start: Option<i64>, end: Option<i64>) -> Option<ClaimedOffsets> {
    let start = usize::try_from(start?).ok()?;
    let end = usize::try_from(end?).ok()?;
    (start <= end).then_some(ClaimedOffsets { start, end })
}

impl From<RawAnnotation> for Annotation {
    fn from(raw: RawAnnotation) -> Self {
        let claimed = claimed_offsets(raw.start_index, raw.end_index);

        if raw.kind == FILE_CITATION_KIND {
            // WHY: an empty file id is kept so record validation rejects it loudly
            if let Some(payload) = raw.file_citation {
                return Annotation::FileCitation(FileCitation {
                    marker: raw.text,
                    claimed,
                    file_id: payload.file_id,
                    quote: payload.quote.unwrap_or_default(),
                });
            }
        }

        Annotation::Other(OtherAnnotation {
            kind: raw.kind,
            marker: raw.text,
            claimed,
        })
    }
}

impl From<Annotation> for RawAnnotation {
    fn from(annotation: Annotation) -> Self {
        let (start_index, end_index) = match annotation.claimed() {
            Some(offsets) => (Some(offsets.start as i64), Some(offsets.end as i64)),
            None => (None, None),
        };

        match annotation {
            Annotation::FileCitation(citation) => RawAnnotation {
                kind: FILE_CITATION_KIND.to_string(),
                text: citation.marker,
                start_index,
                end_index,
                file_citation: Some(RawFileCitation {
                    file_id: citation.file_id,
                    quote: Some(citation.quote),
                }),
            },
            Annotation::Other(other) => RawAnnotation {
                kind: other.kind,
                text: other.marker,
                start_index,
                end_index,
                file_citation: None,
            },
        }
    }
}
