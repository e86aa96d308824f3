pub mod annotation;
pub mod diagnostics;
pub mod discovery;
pub mod engine;
pub mod incremental;
pub mod parallel_processing;

// Re-export main types for convenient access
pub use annotation::{Annotation, FileCitation, GeneratedResponse};
pub use engine::{
    format_citation, parse_response, Citation, CitationEngine, CitationValidationError,
    FormattedCitation, ParsedResponse, ResolveOptions,
};

// Re-export diagnostics for the offset debugging command
pub use diagnostics::{OffsetDiagnostics, OffsetReport};

// Re-export batch processing types and functions for benchmarking
pub use parallel_processing::{
    BatchConfig, FileStats, RunStats,
    process_files_parallel, should_process_file
};
