//! Assembles one GLSL source from template fragments.
//!
//! Every file is processed line by line: provenance is assigned to the raw
//! lines, placeholders are substituted, then directive lines are replaced by
//! the lines of the nested resolution. Directive lines see substituted text,
//! which is how a template forwards its own arguments
//! (`#apply_template "x.glsl", KEY=<KEY>`).
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::args::TemplateArgs;
use crate::directive::{parse_directive, Substitution};
use crate::error::TemplateError;
use crate::glob::{is_wildcard, normalize_separators, GlobPattern};
use crate::provenance::{ResolvedLine, ResolvedShader, SourceInfo};
use crate::source::SourceProvider;

pub const DEFAULT_MAX_INCLUDE_DEPTH: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverOptions {
    pub max_include_depth: usize,
    /// Bracket every inlined file with `// FILE:` / `// END FILE:` comments.
    pub debug_markers: bool,
    /// Directory receiving a copy of each resolved source.
    pub dump_dir: Option<PathBuf>,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            max_include_depth: DEFAULT_MAX_INCLUDE_DEPTH,
            debug_markers: false,
            dump_dir: None,
        }
    }
}

/// State scoped to a single `resolve` call.
#[derive(Default)]
struct Pass {
    /// `(name, sorted args)` invocations already inlined.
    included: HashSet<(String, Vec<(String, String)>)>,
    /// Files currently open, outermost first.
    stack: Vec<String>,
}

pub struct TemplateResolver<'a, S: ?Sized> {
    sources: &'a S,
    options: ResolverOptions,
}

impl<'a, S: SourceProvider + ?Sized> TemplateResolver<'a, S> {
    pub fn new(sources: &'a S, options: ResolverOptions) -> Self {
        Self { sources, options }
    }

    /// Resolves `name` with `args` applied to its placeholders.
    ///
    /// Nothing is returned on failure; every error is fatal to the call.
    pub fn resolve(&self, name: &str, args: &TemplateArgs) -> Result<ResolvedShader, TemplateError> {
        let mut pass = Pass::default();
        let mut lines = Vec::new();
        self.include(name, 1, args, "", &mut pass, &mut lines)?;
        let shader = ResolvedShader::from_lines(lines);

        if let Some(dir) = &self.options.dump_dir {
            dump_resolved(dir, name, &shader);
        }

        Ok(shader)
    }

    fn include(
        &self,
        name: &str,
        depth: usize,
        args: &TemplateArgs,
        directive: &str,
        pass: &mut Pass,
        out: &mut Vec<ResolvedLine>,
    ) -> Result<(), TemplateError> {
        debug!(template = name, depth, args = %args, "processing template");

        if pass.stack.iter().any(|open| open == name) {
            let mut chain = pass.stack.clone();
            chain.push(name.to_string());
            return Err(TemplateError::CircularInclude {
                file: pass.stack.last().cloned().unwrap_or_default(),
                target: name.to_string(),
                directive: directive.to_string(),
                chain,
            });
        }

        if depth > self.options.max_include_depth {
            return Err(TemplateError::DepthExceeded {
                limit: self.options.max_include_depth,
                name: name.to_string(),
            });
        }

        let key = (name.to_string(), args.sorted_pairs());
        if pass.included.contains(&key) {
            debug!(template = name, args = %args, "skipping already included template");
            return Ok(());
        }

        if is_wildcard(name) {
            return self.include_wildcard(name, depth, args, directive, pass, out);
        }

        let content = self
            .sources
            .load(name)
            .map_err(|err| TemplateError::from_source(name, err))?;

        let mut substitution = Substitution::new(name, args)?;
        let mut substituted = Vec::new();
        for (index, raw) in content.split('\n').enumerate() {
            substituted.push((index, substitution.apply(raw, index)?));
        }
        substitution.finish()?;

        let filename: Arc<str> = Arc::from(name);
        pass.stack.push(name.to_string());
        pass.included.insert(key);

        if self.options.debug_markers {
            out.push(marker(&filename, format!("// FILE: \"{name}\"")));
            if !args.is_empty() {
                out.push(marker(&filename, format!("// ARGS: {args}")));
            }
        }

        for (index, text) in substituted {
            // A multi-line argument value keeps the provenance of the line
            // that held its placeholder.
            for piece in text.split('\n') {
                match parse_directive(piece, name)? {
                    Some(nested) => {
                        debug!(
                            template = name,
                            target = %nested.target,
                            args = %nested.args,
                            "found directive"
                        );
                        self.include(&nested.target, depth + 1, &nested.args, &nested.text, pass, out)?;
                    }
                    None => out.push(ResolvedLine {
                        content: piece.to_string(),
                        origin: SourceInfo::new(Arc::clone(&filename), index),
                    }),
                }
            }
        }

        pass.stack.pop();

        if self.options.debug_markers {
            out.push(marker(&filename, format!("// END FILE: \"{name}\"")));
        }

        debug!(template = name, "finished template");
        Ok(())
    }

    fn include_wildcard(
        &self,
        pattern: &str,
        depth: usize,
        args: &TemplateArgs,
        directive: &str,
        pass: &mut Pass,
        out: &mut Vec<ResolvedLine>,
    ) -> Result<(), TemplateError> {
        let names = self
            .sources
            .list()
            .map_err(|err| TemplateError::from_source(pattern, err))?;
        let glob = GlobPattern::new(pattern);
        let matches: Vec<String> = names
            .into_iter()
            .filter(|candidate| glob.matches(candidate))
            .collect();
        debug!(pattern, matches = ?matches, "expanded wildcard include");

        for matched in matches {
            let name = normalize_separators(&matched);
            self.include(&name, depth, args, directive, pass, out)?;
        }
        Ok(())
    }
}

fn marker(filename: &Arc<str>, content: String) -> ResolvedLine {
    ResolvedLine {
        content,
        origin: SourceInfo::synthetic(Arc::clone(filename)),
    }
}

fn dump_resolved(dir: &Path, name: &str, shader: &ResolvedShader) {
    let file_name: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '.' || ch == '-' { ch } else { '_' })
        .collect();
    let path = dir.join(file_name);
    let result = fs::create_dir_all(dir).and_then(|()| fs::write(&path, shader.source()));
    match result {
        Ok(()) => debug!(template = name, path = %path.display(), "dumped resolved template"),
        Err(err) => warn!(template = name, error = %err, "failed to dump resolved template"),
    }
}
