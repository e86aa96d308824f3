// WHY: Output file naming for batch runs
// Lets a rerun skip responses that already have a parsed output next to them

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::discovery::RESPONSE_SUFFIX;

/// Suffix of the parsed output written next to each response dump
pub const OUTPUT_SUFFIX: &str = ".cited.json";

/// Generate the output path for a response dump
/// `chat-1.response.json` -> `chat-1.cited.json`; other names get the suffix appended to their stem
pub fn generate_output_path(source_path: &Path) -> PathBuf {
    let file_name = source_path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown");
    let stem = file_name
        .strip_suffix(RESPONSE_SUFFIX)
        .or_else(|| source_path.file_stem().and_then(|s| s.to_str()))
        .unwrap_or("unknown");

    source_path.with_file_name(format!("{stem}{OUTPUT_SUFFIX}"))
}

/// Check if the parsed output already exists for a response dump
pub fn output_exists<P: AsRef<Path>>(source_path: P) -> bool {
    generate_output_path(source_path.as_ref()).exists()
}

/// Read the parsed output for a response dump
///
/// # Example
/// ```no_run
/// use citemark::incremental::read_output_file;
/// let content = read_output_file("dumps/chat-1.response.json").expect("Failed to read output");
/// ```
pub fn read_output_file<P: AsRef<Path>>(source_path: P) -> Result<String, io::Error> {
    fs::read_to_string(generate_output_path(source_path.as_ref()))
}
