use std::borrow::Cow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use templates::{ResolverOptions, TemplateArgs, DEFAULT_MAX_INCLUDE_DEPTH};

pub const CONFIG_FILE_NAME: &str = "plasmashade.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read configuration {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlasmaConfig {
    pub version: u32,
    #[serde(default)]
    pub shaders: ShaderSettings,
    #[serde(default)]
    pub resolver: ResolverSettings,
    /// Function category → JSON registry path.
    #[serde(default)]
    pub registries: BTreeMap<String, PathBuf>,
    #[serde(default)]
    pub variants: Vec<VariantConfig>,
}

impl Default for PlasmaConfig {
    fn default() -> Self {
        Self {
            version: 1,
            shaders: ShaderSettings::default(),
            resolver: ResolverSettings::default(),
            registries: BTreeMap::new(),
            variants: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ShaderSettings {
    #[serde(default = "default_root")]
    pub root: PathBuf,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// Read every matching file once up front instead of on each lookup.
    #[serde(default = "default_preload")]
    pub preload: bool,
    #[serde(default = "default_vertex")]
    pub vertex: String,
    #[serde(default = "default_fragment")]
    pub fragment: String,
}

impl Default for ShaderSettings {
    fn default() -> Self {
        Self {
            root: default_root(),
            pattern: default_pattern(),
            preload: default_preload(),
            vertex: default_vertex(),
            fragment: default_fragment(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("shaders")
}

fn default_pattern() -> String {
    "*.glsl".to_string()
}

fn default_preload() -> bool {
    true
}

fn default_vertex() -> String {
    "vertex_shader.glsl".to_string()
}

fn default_fragment() -> String {
    "fragment_shader.glsl".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ResolverSettings {
    #[serde(default = "default_max_include_depth")]
    pub max_include_depth: usize,
    /// Unset follows the log level: markers are on when debug logging is.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug_markers: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dump_dir: Option<PathBuf>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_include_depth: default_max_include_depth(),
            debug_markers: None,
            dump_dir: None,
        }
    }
}

fn default_max_include_depth() -> usize {
    DEFAULT_MAX_INCLUDE_DEPTH
}

impl ResolverSettings {
    pub fn options(&self, debug_logging: bool) -> ResolverOptions {
        ResolverOptions {
            max_include_depth: self.max_include_depth,
            debug_markers: self.debug_markers.unwrap_or(debug_logging),
            dump_dir: self.dump_dir.clone(),
        }
    }
}

/// A template argument value. TOML scalars are accepted and rendered the way
/// they would be written in GLSL.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl fmt::Display for ArgValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                write!(f, "{value:.1}")
            }
            Self::Float(value) => write!(f, "{value}"),
            Self::Bool(value) => write!(f, "{value}"),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct VariantConfig {
    pub name: String,
    #[serde(default)]
    pub vertex: BTreeMap<String, ArgValue>,
    #[serde(default)]
    pub fragment: BTreeMap<String, ArgValue>,
    #[serde(default)]
    pub functions: Vec<FunctionSelection>,
}

impl VariantConfig {
    pub fn vertex_args(&self) -> TemplateArgs {
        to_args(&self.vertex)
    }

    /// Fragment arguments as written. Function selections are expanded by
    /// the caller, which owns the loaded registries.
    pub fn fragment_args(&self) -> TemplateArgs {
        to_args(&self.fragment)
    }
}

fn to_args(values: &BTreeMap<String, ArgValue>) -> TemplateArgs {
    values
        .iter()
        .map(|(key, value)| (key.clone(), value.to_string()))
        .collect()
}

/// Picks `function` from the registry of category `registry` and feeds it
/// to the fragment template under `prefix` (`FB_WARP` → `FB_WARP_FUNC`, ...).
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FunctionSelection {
    pub prefix: String,
    pub registry: String,
    pub function: String,
}

impl PlasmaConfig {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: PlasmaConfig = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads and validates `path`; relative paths inside the file are taken
    /// relative to its directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    pub fn rebase(&mut self, base: &Path) {
        self.shaders.root = rebased(base, &self.shaders.root);
        for path in self.registries.values_mut() {
            *path = rebased(base, path);
        }
        if let Some(dump_dir) = &self.resolver.dump_dir {
            self.resolver.dump_dir = Some(rebased(base, dump_dir));
        }
    }

    /// Configured variants, or a single `default` variant without arguments.
    pub fn effective_variants(&self) -> Cow<'_, [VariantConfig]> {
        if self.variants.is_empty() {
            Cow::Owned(vec![VariantConfig {
                name: "default".to_string(),
                ..VariantConfig::default()
            }])
        } else {
            Cow::Borrowed(&self.variants)
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported config version {}; expected 1",
                self.version
            )));
        }

        if self.shaders.root.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("shaders.root may not be empty".into()));
        }
        if self.shaders.pattern.trim().is_empty() {
            return Err(ConfigError::Invalid("shaders.pattern may not be empty".into()));
        }
        if self.shaders.vertex.trim().is_empty() || self.shaders.fragment.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "shaders.vertex and shaders.fragment must name templates".into(),
            ));
        }

        if self.resolver.max_include_depth == 0 {
            return Err(ConfigError::Invalid(
                "resolver.max_include_depth must be at least 1".into(),
            ));
        }

        for category in self.registries.keys() {
            if category.trim().is_empty() {
                return Err(ConfigError::Invalid(
                    "registry category may not be empty".into(),
                ));
            }
        }

        let mut names = BTreeSet::new();
        for variant in &self.variants {
            if variant.name.trim().is_empty() {
                return Err(ConfigError::Invalid("variant name may not be empty".into()));
            }
            if !names.insert(variant.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "variant '{}' is defined more than once",
                    variant.name
                )));
            }

            for selection in &variant.functions {
                if !is_identifier(&selection.prefix) {
                    return Err(ConfigError::Invalid(format!(
                        "variant '{}' function prefix '{}' must be letters, digits or '_'",
                        variant.name, selection.prefix
                    )));
                }
                if !self.registries.contains_key(&selection.registry) {
                    return Err(ConfigError::Invalid(format!(
                        "variant '{}' references unknown registry '{}'",
                        variant.name, selection.registry
                    )));
                }
                if selection.function.trim().is_empty() {
                    return Err(ConfigError::Invalid(format!(
                        "variant '{}' has an empty function name for prefix '{}'",
                        variant.name, selection.prefix
                    )));
                }
            }
        }

        Ok(())
    }
}

fn rebased(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

fn is_identifier(text: &str) -> bool {
    !text.is_empty() && text.chars().all(|ch| ch.is_alphanumeric() || ch == '_')
}
