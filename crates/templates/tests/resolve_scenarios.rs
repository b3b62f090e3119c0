use std::cell::RefCell;
use std::fs;

use templates::{
    DirectorySources, MemorySources, ResolverOptions, SourceError, SourceInfo, SourceProvider,
    TemplateArgs, TemplateError, TemplateErrorKind, TemplateResolver,
};

/// Wraps a provider and records every name it was asked to load.
struct RecordingSources {
    inner: MemorySources,
    loads: RefCell<Vec<String>>,
}

impl RecordingSources {
    fn new(inner: MemorySources) -> Self {
        Self {
            inner,
            loads: RefCell::new(Vec::new()),
        }
    }
}

impl SourceProvider for RecordingSources {
    fn load(&self, name: &str) -> Result<String, SourceError> {
        self.loads.borrow_mut().push(name.to_string());
        self.inner.load(name)
    }

    fn list(&self) -> Result<Vec<String>, SourceError> {
        self.inner.list()
    }
}

fn default_resolver(sources: &MemorySources) -> TemplateResolver<'_, MemorySources> {
    TemplateResolver::new(sources, ResolverOptions::default())
}

#[test]
fn nested_includes_keep_provenance() {
    let sources: MemorySources = [
        ("main.glsl", "A\n#include \"base.glsl\""),
        ("base.glsl", "B\n#include \"common.glsl\""),
        ("common.glsl", "C"),
    ]
    .into_iter()
    .collect();

    let shader = default_resolver(&sources)
        .resolve("main.glsl", &TemplateArgs::new())
        .unwrap();
    let listed = shader.provenance();
    let (source, provenance) = shader.into_parts();

    assert_eq!(source, "A\nB\nC");
    assert_eq!(listed, provenance);
    assert_eq!(
        provenance,
        vec![
            SourceInfo::new("main.glsl", 0),
            SourceInfo::new("base.glsl", 0),
            SourceInfo::new("common.glsl", 0),
        ]
    );
}

#[test]
fn template_arguments_replace_placeholders() {
    let sources: MemorySources = [
        ("main.glsl", "#apply_template \"t.glsl\", LIGHT=POINT"),
        ("t.glsl", "L=<LIGHT>"),
    ]
    .into_iter()
    .collect();

    let shader = default_resolver(&sources)
        .resolve("main.glsl", &TemplateArgs::new())
        .unwrap();
    assert_eq!(shader.source(), "L=POINT");
    assert_eq!(shader.lines()[0].origin, SourceInfo::new("t.glsl", 0));
}

#[test]
fn resolution_is_repeatable() {
    let sources: MemorySources = [
        ("main.glsl", "#include \"a.glsl\"\n#apply_template \"b.glsl\", N=3\nvoid main() {}"),
        ("a.glsl", "float a;"),
        ("b.glsl", "float b<N>;"),
    ]
    .into_iter()
    .collect();
    let resolver = default_resolver(&sources);

    let first = resolver.resolve("main.glsl", &TemplateArgs::new()).unwrap();
    let second = resolver.resolve("main.glsl", &TemplateArgs::new()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.source(), "float a;\nfloat b3;\nvoid main() {}");
}

#[test]
fn argument_order_does_not_matter() {
    let sources: MemorySources = [("t.glsl", "<A> <B>")].into_iter().collect();
    let resolver = default_resolver(&sources);

    let mut forward = TemplateArgs::new();
    forward.insert("A", "1");
    forward.insert("B", "2");
    let mut backward = TemplateArgs::new();
    backward.insert("B", "2");
    backward.insert("A", "1");

    assert_eq!(
        resolver.resolve("t.glsl", &forward).unwrap(),
        resolver.resolve("t.glsl", &backward).unwrap()
    );
}

#[test]
fn circular_include_names_both_files() {
    let sources: MemorySources = [
        ("a.glsl", "#include \"b.glsl\""),
        ("b.glsl", "#include \"a.glsl\""),
    ]
    .into_iter()
    .collect();

    let err = default_resolver(&sources)
        .resolve("a.glsl", &TemplateArgs::new())
        .unwrap_err();
    assert_eq!(err.kind(), TemplateErrorKind::CircularInclude);

    let message = err.to_string();
    assert!(message.contains("a.glsl"), "{message}");
    assert!(message.contains("b.glsl"), "{message}");
    assert!(message.contains("#include \"a.glsl\""), "{message}");
}

#[test]
fn self_include_is_circular() {
    let sources: MemorySources = [("a.glsl", "#include \"a.glsl\"")].into_iter().collect();
    let err = default_resolver(&sources)
        .resolve("a.glsl", &TemplateArgs::new())
        .unwrap_err();
    assert_eq!(err.kind(), TemplateErrorKind::CircularInclude);
}

#[test]
fn depth_limit_stops_before_loading_deepest_file() {
    let chain: MemorySources = (0..5)
        .map(|index| {
            let text = if index == 4 {
                "leaf".to_string()
            } else {
                format!("#include \"f{}.glsl\"", index + 1)
            };
            (format!("f{index}.glsl"), text)
        })
        .collect();
    let sources = RecordingSources::new(chain);
    let options = ResolverOptions {
        max_include_depth: 4,
        ..ResolverOptions::default()
    };

    let err = TemplateResolver::new(&sources, options)
        .resolve("f0.glsl", &TemplateArgs::new())
        .unwrap_err();
    match err {
        TemplateError::DepthExceeded { limit, name } => {
            assert_eq!(limit, 4);
            assert_eq!(name, "f4.glsl");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!sources.loads.borrow().iter().any(|name| name == "f4.glsl"));
}

#[test]
fn depth_limit_allows_exact_depth() {
    let sources: MemorySources = [("f0.glsl", "#include \"f1.glsl\""), ("f1.glsl", "leaf")]
        .into_iter()
        .collect();
    let options = ResolverOptions {
        max_include_depth: 2,
        ..ResolverOptions::default()
    };
    let shader = TemplateResolver::new(&sources, options)
        .resolve("f0.glsl", &TemplateArgs::new())
        .unwrap();
    assert_eq!(shader.source(), "leaf");
}

#[test]
fn unused_argument_is_rejected() {
    let sources: MemorySources = [("t.glsl", "value = <X>;")].into_iter().collect();
    let args = TemplateArgs::from([("X", "1"), ("Y", "2")]);

    let err = default_resolver(&sources).resolve("t.glsl", &args).unwrap_err();
    assert_eq!(err.kind(), TemplateErrorKind::PlaceholderMismatch);
    assert!(err.to_string().contains('Y'));
}

#[test]
fn unmatched_placeholder_is_rejected() {
    let sources: MemorySources = [("t.glsl", "ok\nvalue = <COLOR>;")].into_iter().collect();
    let err = default_resolver(&sources)
        .resolve("t.glsl", &TemplateArgs::new())
        .unwrap_err();
    assert!(matches!(
        err,
        TemplateError::UnmatchedPlaceholder { ref placeholder, line: 1, .. } if placeholder == "COLOR"
    ));
}

#[test]
fn missing_source_is_reported_by_name() {
    let sources: MemorySources = [("main.glsl", "#include \"gone.glsl\"")].into_iter().collect();
    let err = default_resolver(&sources)
        .resolve("main.glsl", &TemplateArgs::new())
        .unwrap_err();
    assert_eq!(err.kind(), TemplateErrorKind::SourceNotFound);
    assert!(err.to_string().contains("gone.glsl"));
}

#[test]
fn include_with_arguments_is_misuse() {
    let sources: MemorySources = [("main.glsl", "#include \"a.glsl\", X=1"), ("a.glsl", "<X>")]
        .into_iter()
        .collect();
    let err = default_resolver(&sources)
        .resolve("main.glsl", &TemplateArgs::new())
        .unwrap_err();
    assert_eq!(err.kind(), TemplateErrorKind::DirectiveMisuse);
}

#[test]
fn empty_wildcard_contributes_nothing() {
    let sources: MemorySources = [("main.glsl", "#include \"extras/*.glsl\"\nvoid main() {}")]
        .into_iter()
        .collect();
    let shader = default_resolver(&sources)
        .resolve("main.glsl", &TemplateArgs::new())
        .unwrap();
    assert_eq!(shader.source(), "void main() {}");
}

#[test]
fn resolves_from_directory_tree() {
    let temp = tempfile::tempdir().unwrap();
    fs::create_dir_all(temp.path().join("noise")).unwrap();
    fs::write(
        temp.path().join("fragment_shader.glsl"),
        "#version 450\n#include \"noise/*.glsl\"\n#apply_template \"noise/octaves.tmpl\", COUNT=4",
    )
    .unwrap();
    fs::write(temp.path().join("noise/perlin.glsl"), "float perlin(vec2 p);").unwrap();
    fs::write(temp.path().join("noise/octaves.tmpl"), "const int OCTAVES = <COUNT>;").unwrap();

    let sources = DirectorySources::new(temp.path());
    let shader = TemplateResolver::new(&sources, ResolverOptions::default())
        .resolve("fragment_shader.glsl", &TemplateArgs::new())
        .unwrap();

    assert_eq!(
        shader.source(),
        "#version 450\nfloat perlin(vec2 p);\nconst int OCTAVES = 4;"
    );
    assert_eq!(shader.lines()[1].origin, SourceInfo::new("noise/perlin.glsl", 0));
}
