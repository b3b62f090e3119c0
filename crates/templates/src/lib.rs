//! GLSL template assembly: `#include` / `#apply_template` directives,
//! `<PLACEHOLDER>` substitution and per-line provenance.
mod args;
mod directive;
mod error;
mod glob;
mod provenance;
mod resolver;
mod source;

pub use args::TemplateArgs;
pub use error::{TemplateError, TemplateErrorKind};
pub use provenance::{ResolvedLine, ResolvedShader, SourceInfo};
pub use resolver::{ResolverOptions, TemplateResolver, DEFAULT_MAX_INCLUDE_DEPTH};
pub use source::{DirectorySources, MemorySources, SourceError, SourceProvider};
