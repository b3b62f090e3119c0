use std::fmt;

use templates::TemplateError;
use thiserror::Error;

use crate::device::DeviceError;
use crate::diagnostics::Diagnostic;

/// A compile failure whose errors were mapped back to template files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileFailure {
    pub diagnostics: Vec<Diagnostic>,
    /// Compiler output as received from the device.
    pub raw: String,
}

impl fmt::Display for CompileFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, diagnostic) in self.diagnostics.iter().enumerate() {
            if index > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{diagnostic}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum VariantError {
    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("shader compilation failed:\n{0}")]
    Compile(CompileFailure),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
