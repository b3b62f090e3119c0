use std::fmt;
use std::sync::Arc;

/// Originating template and zero-based line index for one resolved line.
///
/// `line` is `None` for synthetic lines such as the debug markers wrapped
/// around each inlined file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceInfo {
    filename: Arc<str>,
    line: Option<usize>,
}

impl SourceInfo {
    pub fn new(filename: impl Into<Arc<str>>, line: usize) -> Self {
        Self {
            filename: filename.into(),
            line: Some(line),
        }
    }

    pub fn synthetic(filename: impl Into<Arc<str>>) -> Self {
        Self {
            filename: filename.into(),
            line: None,
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn is_synthetic(&self) -> bool {
        self.line.is_none()
    }
}

impl fmt::Display for SourceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{}:{line}", self.filename),
            None => write!(f, "{}:?", self.filename),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLine {
    pub content: String,
    pub origin: SourceInfo,
}

/// Output of one resolution pass: compilable source plus per-line provenance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedShader {
    lines: Vec<ResolvedLine>,
}

impl ResolvedShader {
    pub(crate) fn from_lines(lines: Vec<ResolvedLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[ResolvedLine] {
        &self.lines
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Newline-joined content, ready for the shader compiler.
    pub fn source(&self) -> String {
        let mut source = String::with_capacity(self.lines.iter().map(|l| l.content.len() + 1).sum());
        for (index, line) in self.lines.iter().enumerate() {
            if index > 0 {
                source.push('\n');
            }
            source.push_str(&line.content);
        }
        source
    }

    pub fn provenance(&self) -> Vec<SourceInfo> {
        self.lines.iter().map(|line| line.origin.clone()).collect()
    }

    pub fn into_parts(self) -> (String, Vec<SourceInfo>) {
        let source = self.source();
        let provenance = self.lines.into_iter().map(|line| line.origin).collect();
        (source, provenance)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_lines_without_trailing_newline() {
        let shader = ResolvedShader::from_lines(vec![
            ResolvedLine {
                content: "A".into(),
                origin: SourceInfo::new("main.glsl", 0),
            },
            ResolvedLine {
                content: "B".into(),
                origin: SourceInfo::new("base.glsl", 0),
            },
        ]);

        let (source, provenance) = shader.into_parts();
        assert_eq!(source, "A\nB");
        assert_eq!(provenance[1].to_string(), "base.glsl:0");
    }

    #[test]
    fn synthetic_origin_has_no_line() {
        let info = SourceInfo::synthetic("noise.glsl");
        assert!(info.is_synthetic());
        assert_eq!(info.to_string(), "noise.glsl:?");
    }
}
