use thiserror::Error;

use crate::source::SourceError;

/// Broad failure category, for callers that branch on the kind of mistake
/// rather than the exact variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateErrorKind {
    SourceNotFound,
    DirectiveMisuse,
    CircularInclude,
    DepthExceeded,
    PlaceholderMismatch,
}

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("error loading source from \"{name}\": not found")]
    SourceNotFound { name: String },

    #[error("error loading source from \"{name}\": {source}")]
    SourceUnavailable {
        name: String,
        #[source]
        source: SourceError,
    },

    #[error("error in \"{file}\": template arguments are not allowed for #include directive\n  {directive}")]
    ArgumentsOnInclude { file: String, directive: String },

    #[error("error in \"{file}\": missing template arguments for #apply_template directive\n  {directive}")]
    MissingTemplateArguments { file: String, directive: String },

    #[error(
        "error in \"{file}\": circular include of \"{target}\" ({})\n  {directive}",
        .chain.join(" -> ")
    )]
    CircularInclude {
        file: String,
        target: String,
        directive: String,
        chain: Vec<String>,
    },

    #[error("maximum include depth of {limit} exceeded while including \"{name}\"")]
    DepthExceeded { limit: usize, name: String },

    #[error("error applying template arguments in \"{file}\": unmatched placeholder <{placeholder}> on line {line}")]
    UnmatchedPlaceholder {
        file: String,
        placeholder: String,
        line: usize,
    },

    #[error("error applying template arguments in \"{file}\": unused argument keys {}", .keys.join(", "))]
    UnusedArguments { file: String, keys: Vec<String> },

    #[error("error applying template arguments in \"{file}\": argument keys \"{first}\" and \"{second}\" differ only in case")]
    AmbiguousArgument {
        file: String,
        first: String,
        second: String,
    },
}

impl TemplateError {
    pub fn kind(&self) -> TemplateErrorKind {
        match self {
            Self::SourceNotFound { .. } | Self::SourceUnavailable { .. } => {
                TemplateErrorKind::SourceNotFound
            }
            Self::ArgumentsOnInclude { .. } | Self::MissingTemplateArguments { .. } => {
                TemplateErrorKind::DirectiveMisuse
            }
            Self::CircularInclude { .. } => TemplateErrorKind::CircularInclude,
            Self::DepthExceeded { .. } => TemplateErrorKind::DepthExceeded,
            Self::UnmatchedPlaceholder { .. }
            | Self::UnusedArguments { .. }
            | Self::AmbiguousArgument { .. } => TemplateErrorKind::PlaceholderMismatch,
        }
    }

    pub(crate) fn from_source(name: &str, err: SourceError) -> Self {
        match err {
            SourceError::NotFound(_) => Self::SourceNotFound {
                name: name.to_string(),
            },
            other => Self::SourceUnavailable {
                name: name.to_string(),
                source: other,
            },
        }
    }
}
