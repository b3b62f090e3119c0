//! Maps compiler line numbers in assembled sources back to template files.
//!
//! Compiler failures arrive as a block of the form
//!
//! ```text
//! GLSL Compiler failed
//!
//! fragment_shader
//! ===============
//! ERROR: 0:5: 'warp_offset' : undeclared identifier
//! ```
//!
//! where the line number is a zero-based index into the assembled source,
//! which is also the index into the stage's provenance sequence.
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use templates::SourceInfo;

use crate::device::Stage;

const FAILURE_HEADER: &str = "GLSL Compiler failed";

static ERROR_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^ERROR:\s*(\d+):(\d+):\s*(.*)$").expect("error line pattern is valid")
});

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub stage: Stage,
    /// Line as reported against the assembled source.
    pub reported_line: usize,
    /// `None` when the reported line is outside the provenance sequence.
    pub location: Option<SourceInfo>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(origin) => match origin.line() {
                Some(line) => write!(
                    f,
                    "File \"{}\", line {line}, in {}: {}",
                    origin.filename(),
                    self.stage,
                    self.message
                ),
                None => write!(
                    f,
                    "File \"{}\", line ?, in {}: {}",
                    origin.filename(),
                    self.stage,
                    self.message
                ),
            },
            None => write!(
                f,
                "File unknown, line {} of assembled source, in {}: {}",
                self.reported_line, self.stage, self.message
            ),
        }
    }
}

/// Parses a compiler failure block and resolves each error through the
/// provenance of its stage.
///
/// Returns `None` when `raw` is not a compiler failure or names no errors, so
/// the caller can pass its original error through.
pub fn map_compile_error(
    raw: &str,
    vertex_provenance: &[SourceInfo],
    fragment_provenance: &[SourceInfo],
) -> Option<Vec<Diagnostic>> {
    if !raw.trim_start().starts_with(FAILURE_HEADER) {
        return None;
    }

    let mut stage = None;
    let mut diagnostics = Vec::new();
    for line in raw.lines() {
        let line = line.trim();
        if let Some(section) = Stage::from_label(line) {
            stage = Some(section);
            continue;
        }
        let Some(captures) = ERROR_LINE.captures(line) else {
            // Any other header starts a section this mapper has no provenance for.
            if is_section_header(line) {
                stage = None;
            }
            continue;
        };
        let Some(current) = stage else {
            continue;
        };
        let Ok(reported_line) = captures[2].parse::<usize>() else {
            continue;
        };
        let provenance = match current {
            Stage::Vertex => vertex_provenance,
            Stage::Fragment => fragment_provenance,
        };
        diagnostics.push(Diagnostic {
            stage: current,
            reported_line,
            location: provenance.get(reported_line).cloned(),
            message: captures[3].trim().to_string(),
        });
    }

    if diagnostics.is_empty() {
        None
    } else {
        Some(diagnostics)
    }
}

fn is_section_header(line: &str) -> bool {
    !line.is_empty()
        && line != FAILURE_HEADER
        && !line.starts_with('=')
        && !line.starts_with("WARNING:")
}

/// Renders `(line, message)` errors for one stage in the block shape that
/// [`map_compile_error`] understands.
pub fn format_compile_failure(stage: Stage, errors: &[(usize, String)]) -> String {
    let label = stage.label();
    let mut out = format!("{FAILURE_HEADER}\n\n{label}\n{}\n", "=".repeat(label.len()));
    for (line, message) in errors {
        out.push_str(&format!("ERROR: 0:{line}: {message}\n"));
    }
    out
}
