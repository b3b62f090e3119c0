use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::args::TemplateArgs;
use crate::error::TemplateError;

static DIRECTIVE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*(#include|#apply_template)\s+"([^"]+)"\s*(?:,\s*(.+))?"#)
        .expect("directive pattern is valid")
});

static ARGUMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"([A-Za-z0-9_]+)\s*=\s*([A-Za-z0-9_]+)").expect("argument pattern is valid")
});

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<([A-Za-z0-9_]+)>").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DirectiveKind {
    Include,
    ApplyTemplate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Directive {
    pub kind: DirectiveKind,
    pub target: String,
    pub args: TemplateArgs,
    /// The matched directive text, quoted back in error messages.
    pub text: String,
}

/// Recognises an `#include` / `#apply_template` directive at the start of
/// `line` and checks it is used correctly.
pub(crate) fn parse_directive(line: &str, file: &str) -> Result<Option<Directive>, TemplateError> {
    let Some(captures) = DIRECTIVE.captures(line) else {
        return Ok(None);
    };
    let text = captures[0].trim().to_string();
    let kind = if captures[1].eq_ignore_ascii_case("#include") {
        DirectiveKind::Include
    } else {
        DirectiveKind::ApplyTemplate
    };
    let target = captures[2].trim().to_string();
    let raw_args = captures.get(3).map(|m| m.as_str().trim()).unwrap_or("");

    let args: TemplateArgs = ARGUMENT
        .captures_iter(raw_args)
        .map(|pair| (pair[1].to_string(), pair[2].to_string()))
        .collect();

    match kind {
        DirectiveKind::Include if !raw_args.is_empty() => Err(TemplateError::ArgumentsOnInclude {
            file: file.to_string(),
            directive: text,
        }),
        DirectiveKind::ApplyTemplate if args.is_empty() => {
            Err(TemplateError::MissingTemplateArguments {
                file: file.to_string(),
                directive: text,
            })
        }
        _ => Ok(Some(Directive {
            kind,
            target,
            args,
            text,
        })),
    }
}

/// Case-insensitive placeholder table for one file.
///
/// Tracks which keys were referenced so the caller can reject arguments that
/// no placeholder consumed.
pub(crate) struct Substitution<'a> {
    file: &'a str,
    values: BTreeMap<String, (&'a str, &'a str)>,
    used: BTreeSet<String>,
}

impl<'a> Substitution<'a> {
    pub fn new(file: &'a str, args: &'a TemplateArgs) -> Result<Self, TemplateError> {
        let mut values: BTreeMap<String, (&str, &str)> = BTreeMap::new();
        for (key, value) in args.iter() {
            if let Some((previous, _)) = values.insert(key.to_lowercase(), (key, value)) {
                return Err(TemplateError::AmbiguousArgument {
                    file: file.to_string(),
                    first: previous.to_string(),
                    second: key.to_string(),
                });
            }
        }
        Ok(Self {
            file,
            values,
            used: BTreeSet::new(),
        })
    }

    /// Replaces every `<NAME>` in `line`; `index` is the zero-based line
    /// reported on failure.
    pub fn apply(&mut self, line: &str, index: usize) -> Result<String, TemplateError> {
        if !line.contains('<') {
            return Ok(line.to_string());
        }
        let mut missing = None;
        let replaced = PLACEHOLDER.replace_all(line, |caps: &Captures<'_>| {
            let lowered = caps[1].to_lowercase();
            match self.values.get(&lowered) {
                Some((_, value)) => {
                    self.used.insert(lowered);
                    (*value).to_string()
                }
                None => {
                    missing.get_or_insert_with(|| caps[1].to_string());
                    caps[0].to_string()
                }
            }
        });
        if let Some(placeholder) = missing {
            return Err(TemplateError::UnmatchedPlaceholder {
                file: self.file.to_string(),
                placeholder,
                line: index,
            });
        }
        Ok(replaced.into_owned())
    }

    /// Fails with every supplied key that no placeholder referenced, in the
    /// casing the caller supplied.
    pub fn finish(self) -> Result<(), TemplateError> {
        let unused: Vec<String> = self
            .values
            .iter()
            .filter(|(lowered, _)| !self.used.contains(*lowered))
            .map(|(_, (original, _))| (*original).to_string())
            .collect();
        if unused.is_empty() {
            Ok(())
        } else {
            Err(TemplateError::UnusedArguments {
                file: self.file.to_string(),
                keys: unused,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TemplateErrorKind;

    #[test]
    fn parses_include_case_insensitively() {
        let directive = parse_directive("   #INCLUDE \"noise/perlin.glsl\"", "main.glsl")
            .unwrap()
            .unwrap();
        assert_eq!(directive.kind, DirectiveKind::Include);
        assert_eq!(directive.target, "noise/perlin.glsl");
        assert!(directive.args.is_empty());
    }

    #[test]
    fn parses_apply_template_arguments() {
        let directive = parse_directive(
            "#apply_template \"fractal.glsl\", NOISE_FUNC=perlin,  OCTAVES = 4",
            "main.glsl",
        )
        .unwrap()
        .unwrap();
        assert_eq!(directive.kind, DirectiveKind::ApplyTemplate);
        assert_eq!(directive.args.get("NOISE_FUNC"), Some("perlin"));
        assert_eq!(directive.args.get("OCTAVES"), Some("4"));
    }

    #[test]
    fn ignores_non_directive_lines() {
        assert!(parse_directive("float x = 1.0; // #include \"a.glsl\"", "main.glsl")
            .unwrap()
            .is_none());
        assert!(parse_directive("#version 450", "main.glsl").unwrap().is_none());
    }

    #[test]
    fn rejects_directive_misuse() {
        let err = parse_directive("#include \"a.glsl\", X=1", "main.glsl").unwrap_err();
        assert_eq!(err.kind(), TemplateErrorKind::DirectiveMisuse);
        assert!(err.to_string().contains("#include \"a.glsl\", X=1"));

        let err = parse_directive("#apply_template \"a.glsl\"", "main.glsl").unwrap_err();
        assert!(matches!(err, TemplateError::MissingTemplateArguments { .. }));

        let err = parse_directive("#apply_template \"a.glsl\", nonsense", "main.glsl").unwrap_err();
        assert!(matches!(err, TemplateError::MissingTemplateArguments { .. }));
    }

    #[test]
    fn tolerates_whitespace_before_argument_comma() {
        let directive = parse_directive("#apply_template \"t.glsl\" , X=1", "main.glsl")
            .unwrap()
            .unwrap();
        assert_eq!(directive.target, "t.glsl");
        assert_eq!(directive.args.get("X"), Some("1"));

        let err = parse_directive("#include \"t.glsl\" , X=1", "main.glsl").unwrap_err();
        assert!(matches!(err, TemplateError::ArgumentsOnInclude { .. }));
    }

    #[test]
    fn placeholders_are_ascii_identifiers() {
        let args = TemplateArgs::new();
        let mut substitution = Substitution::new("t.glsl", &args).unwrap();
        assert_eq!(substitution.apply("a <é> b", 0).unwrap(), "a <é> b");
        substitution.finish().unwrap();

        let err = parse_directive("#apply_template \"t.glsl\", é=1", "main.glsl").unwrap_err();
        assert!(matches!(err, TemplateError::MissingTemplateArguments { .. }));
    }

    #[test]
    fn substitutes_case_insensitively() {
        let args = TemplateArgs::from([("light", "POINT")]);
        let mut substitution = Substitution::new("t.glsl", &args).unwrap();
        assert_eq!(substitution.apply("L=<LIGHT>, <Light>", 0).unwrap(), "L=POINT, POINT");
        substitution.finish().unwrap();
    }

    #[test]
    fn reports_unmatched_placeholder() {
        let args = TemplateArgs::new();
        let mut substitution = Substitution::new("t.glsl", &args).unwrap();
        let err = substitution.apply("x = <COLOR>;", 3).unwrap_err();
        match err {
            TemplateError::UnmatchedPlaceholder {
                placeholder, line, ..
            } => {
                assert_eq!(placeholder, "COLOR");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn reports_unused_keys_in_original_casing() {
        let args = TemplateArgs::from([("X", "1"), ("Yellow", "2")]);
        let mut substitution = Substitution::new("t.glsl", &args).unwrap();
        substitution.apply("value = <x>", 0).unwrap();
        match substitution.finish().unwrap_err() {
            TemplateError::UnusedArguments { keys, .. } => assert_eq!(keys, vec!["Yellow"]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn rejects_keys_differing_only_in_case() {
        let args = TemplateArgs::from([("mode", "a"), ("MODE", "b")]);
        assert!(matches!(
            Substitution::new("t.glsl", &args),
            Err(TemplateError::AmbiguousArgument { .. })
        ));
    }
}
