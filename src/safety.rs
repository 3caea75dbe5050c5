//! Guards against overwriting a source database with a report.
//!
//! The CLI removes an existing output file before writing, so the output path
//! is checked first: it must look like a report and must not be the database
//! the run reads from.

use anyhow::{bail, Result};
use std::path::Path;

/// Marker every report filename must carry (case-insensitive).
pub const REPORT_MARKER: &str = "accountplan";

fn same_file(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// Validates that `output` is safe to delete and recreate.
///
/// The filename must contain [`REPORT_MARKER`] ignoring case and underscores,
/// and the path must not resolve to any of `sources`.
pub fn validate_output_path(output: &Path, sources: &[&Path]) -> Result<()> {
    let output_name = output
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("")
        .to_lowercase()
        .replace(['_', '-'], "");

    if !output_name.contains(REPORT_MARKER) {
        bail!(
            "Safety check failed: output file '{}' must contain '{}' in the name",
            output.display(),
            REPORT_MARKER
        );
    }

    for source in sources {
        if same_file(output, source) {
            bail!(
                "Safety check failed: output '{}' cannot be the same as source '{}'",
                output.display(),
                source.display()
            );
        }
    }

    Ok(())
}
