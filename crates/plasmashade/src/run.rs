use std::collections::BTreeMap;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{bail, Context, Result};
use functions::{glsl, FunctionRegistry, ParamKind};
use plasmaconfig::{PlasmaConfig, ShaderSettings, VariantConfig};
use templates::{DirectorySources, MemorySources, SourceProvider, TemplateArgs, TemplateResolver};
use tracing::level_filters::LevelFilter;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use variants::{NagaDevice, VariantError, VariantShaderCache, FULLSCREEN_QUAD};

use crate::cli::{CheckArgs, Cli, Command, FunctionsArgs, ResolveArgs};
use crate::paths::AppPaths;

/// Vertex input the fullscreen quad feeds.
const POSITION_ATTRIBUTE: &str = "in_pos";

pub fn run(cli: Cli) -> Result<()> {
    initialise_tracing(cli.verbose);
    let debug_logging = LevelFilter::current() >= LevelFilter::DEBUG;

    let config = load_config(&cli)?;
    debug!(
        root = %config.shaders.root.display(),
        variants = config.variants.len(),
        "configuration ready"
    );

    match &cli.command {
        Command::Resolve(args) => resolve(&config, args, debug_logging),
        Command::Check(args) => check(&config, args, debug_logging),
        Command::Functions(args) => list_functions(&config, args),
    }
}

fn initialise_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn load_config(cli: &Cli) -> Result<PlasmaConfig> {
    let path = match &cli.config {
        Some(path) => Some(path.clone()),
        None => {
            let paths = AppPaths::discover()?;
            let candidate = paths.config_file();
            if !candidate.is_file() {
                debug!(dir = %paths.config_dir().display(), "no configuration file found");
            }
            candidate.is_file().then_some(candidate)
        }
    };

    let mut config = match path {
        Some(path) => PlasmaConfig::load(&path)
            .with_context(|| format!("failed to load configuration {}", path.display()))?,
        None => PlasmaConfig::default(),
    };

    if let Some(root) = &cli.shaders {
        config.shaders.root = root.clone();
    }
    Ok(config)
}

fn open_sources(settings: &ShaderSettings) -> Result<Box<dyn SourceProvider>> {
    let root = &settings.root;
    if !root.is_dir() {
        bail!("shader root {} is not a directory", root.display());
    }
    if settings.preload {
        let sources = MemorySources::from_directory(root, &settings.pattern)
            .with_context(|| format!("failed to preload shaders from {}", root.display()))?;
        info!(root = %root.display(), templates = sources.len(), "preloaded shader templates");
        Ok(Box::new(sources))
    } else {
        let sources = DirectorySources::new(root);
        info!(root = %sources.root().display(), "reading shader templates on demand");
        Ok(Box::new(sources))
    }
}

fn resolve(config: &PlasmaConfig, args: &ResolveArgs, debug_logging: bool) -> Result<()> {
    let sources = open_sources(&config.shaders)?;
    let mut options = config.resolver.options(debug_logging);
    if args.debug_markers {
        options.debug_markers = true;
    }

    let template_args: TemplateArgs = args.args.iter().cloned().collect();
    let shader = TemplateResolver::new(&*sources, options)
        .resolve(&args.template, &template_args)
        .with_context(|| format!("failed to resolve {}", args.template))?;

    let mut out = io::stdout().lock();
    for line in shader.lines() {
        if args.provenance {
            writeln!(out, "{:<32} | {}", line.origin.to_string(), line.content)?;
        } else {
            writeln!(out, "{}", line.content)?;
        }
    }
    Ok(())
}

fn check(config: &PlasmaConfig, args: &CheckArgs, debug_logging: bool) -> Result<()> {
    let registries = load_registries(config)?;
    let sources = open_sources(&config.shaders)?;
    let mut cache = VariantShaderCache::new(
        NagaDevice::new(),
        &*sources,
        config.shaders.vertex.as_str(),
        config.shaders.fragment.as_str(),
        config.resolver.options(debug_logging),
    );
    let quad = cache.device_mut().create_buffer(&FULLSCREEN_QUAD);

    let variants = config.effective_variants();
    let selected = select_variants(&variants, &args.variants)?;

    let mut failed = Vec::new();
    for variant in &selected {
        let vertex_args = variant.vertex_args();
        let fragment_args = fragment_args(variant, &registries)?;

        let outcome = cache
            .get_or_create_program(&vertex_args, &fragment_args)
            .and_then(|(program, created)| {
                cache
                    .get_or_create_vao(program, quad, &[POSITION_ATTRIBUTE])
                    .map(|_| (program, created))
            });

        match outcome {
            Ok((program, created)) => {
                let note = if created { "" } else { ", shared" };
                println!("ok      {} (program {program}{note})", variant.name);
            }
            Err(VariantError::Compile(failure)) => {
                println!("FAILED  {}", variant.name);
                for diagnostic in &failure.diagnostics {
                    println!("  {diagnostic}");
                }
                failed.push(variant.name.clone());
            }
            Err(err) => {
                println!("FAILED  {}", variant.name);
                for line in err.to_string().lines() {
                    println!("  {line}");
                }
                failed.push(variant.name.clone());
            }
        }
    }

    info!(
        checked = selected.len(),
        programs = cache.program_count(),
        failed = failed.len(),
        "variant check finished"
    );
    cache.release_all();

    if !failed.is_empty() {
        bail!(
            "{} of {} variants failed: {}",
            failed.len(),
            selected.len(),
            failed.join(", ")
        );
    }
    Ok(())
}

fn select_variants<'a>(variants: &'a [VariantConfig], names: &[String]) -> Result<Vec<&'a VariantConfig>> {
    if names.is_empty() {
        return Ok(variants.iter().collect());
    }
    names
        .iter()
        .map(|name| {
            variants
                .iter()
                .find(|variant| &variant.name == name)
                .with_context(|| format!("unknown variant '{name}'"))
        })
        .collect()
}

fn load_registries(config: &PlasmaConfig) -> Result<BTreeMap<String, FunctionRegistry>> {
    let mut registries = BTreeMap::new();
    for (category, path) in &config.registries {
        let registry = FunctionRegistry::load(category, path)
            .with_context(|| format!("failed to load {category} function registry"))?;
        registries.insert(category.clone(), registry);
    }
    Ok(registries)
}

fn fragment_args(
    variant: &VariantConfig,
    registries: &BTreeMap<String, FunctionRegistry>,
) -> Result<TemplateArgs> {
    let mut args = variant.fragment_args();
    for selection in &variant.functions {
        let registry = registries
            .get(&selection.registry)
            .with_context(|| format!("unknown function registry '{}'", selection.registry))?;
        let generated = registry
            .template_args(&selection.function, &selection.prefix)
            .with_context(|| format!("variant '{}'", variant.name))?;
        for (key, _) in generated.iter() {
            if args.get(key).is_some() {
                warn!(variant = %variant.name, key, "function selection overrides explicit argument");
            }
        }
        args.extend(generated);
    }
    Ok(args)
}

fn list_functions(config: &PlasmaConfig, args: &FunctionsArgs) -> Result<()> {
    let registry = match config.registries.get(&args.registry) {
        Some(path) => FunctionRegistry::load(&args.registry, path)?,
        None => {
            let path = Path::new(&args.registry);
            let category = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .with_context(|| format!("'{}' is neither a registry nor a file", args.registry))?;
            FunctionRegistry::load(category, path)
                .with_context(|| format!("'{}' is neither a configured registry nor a readable file", args.registry))?
        }
    };

    let mut out = io::stdout().lock();
    match registry.description() {
        Some(description) => writeln!(out, "{}: {description}", registry.category())?,
        None => writeln!(out, "{}", registry.category())?,
    }
    for function in registry.functions() {
        writeln!(out, "  {} ({})", function.name, function.display_name)?;
        for param in &function.params {
            writeln!(
                out,
                "    {:<16} {:<6} {:<16} default {}",
                param.name,
                param.kind.type_name(),
                describe_range(&param.kind),
                param.kind.default_value()
            )?;
        }
        for declaration in glsl::uniform_declarations(function, None).lines() {
            writeln!(out, "    {declaration}")?;
        }
    }
    Ok(())
}

fn describe_range(kind: &ParamKind) -> String {
    match kind {
        ParamKind::Int { min, max, .. } => format!("[{min}, {max}]"),
        ParamKind::Float {
            min,
            max,
            logarithmic: true,
            ..
        } => format!("[{min}, {max}] log"),
        ParamKind::Float { min, max, .. } => format!("[{min}, {max}]"),
        ParamKind::Color { .. } => "rgba".to_string(),
    }
}
