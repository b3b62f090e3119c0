//! Function registries describe the selectable noise, blend and warp
//! functions of the fragment shader, loaded from JSON files such as
//!
//! ```json
//! {
//!   "description": "Feedback warp functions",
//!   "functions": {
//!     "swirl": {
//!       "display_name": "Swirl",
//!       "params": [
//!         {"name": "strength", "display_name": "Strength", "param_type": "float",
//!          "min": 0.0, "max": 1.0, "default": 0.5}
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! Types:
//!
//! - `FunctionRegistry` owns every function of one category and turns a
//!   chosen function into template arguments for the fragment shader.
//! - `FunctionInfo` lists the parameters of one function, grouped for display.
//! - `RegistryError` names the category, function and parameter at fault.
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use templates::TemplateArgs;
use thiserror::Error;
use tracing::debug;

use crate::glsl;
use crate::param::{FunctionParam, ParamValue, RawParam};

const UNGROUPED: &str = "Parameters";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read function registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to parse function registry \"{category}\": {source}")]
    Parse {
        category: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{category} function \"{function}\", parameter \"{param}\": {reason}")]
    InvalidParam {
        category: String,
        function: String,
        param: String,
        reason: String,
    },

    #[error("{category} function \"{function}\" declares parameter \"{param}\" twice")]
    DuplicateParam {
        category: String,
        function: String,
        param: String,
    },

    #[error("{category} function \"{function}\": group \"{group}\" lists unknown parameter \"{param}\"")]
    UnknownGroupParam {
        category: String,
        function: String,
        group: String,
        param: String,
    },

    #[error("unknown {category} function \"{name}\"")]
    UnknownFunction { category: String, name: String },
}

#[derive(Debug, Deserialize)]
struct RegistryFile {
    #[serde(default)]
    description: Option<String>,
    functions: BTreeMap<String, RawFunction>,
}

#[derive(Debug, Deserialize)]
struct RawFunction {
    display_name: String,
    params: Vec<RawParam>,
    #[serde(default)]
    param_groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    display_name: String,
    params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamGroup {
    pub display_name: String,
    pub params: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInfo {
    pub name: String,
    pub display_name: String,
    /// Registry category, part of every uniform name.
    pub category: String,
    pub params: Vec<FunctionParam>,
    /// Declared groups, then a trailing "Parameters" group holding anything
    /// left ungrouped.
    pub groups: Vec<ParamGroup>,
}

impl FunctionInfo {
    pub fn param(&self, name: &str) -> Option<&FunctionParam> {
        self.params.iter().find(|param| param.name == name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FunctionRegistry {
    category: String,
    description: Option<String>,
    functions: BTreeMap<String, FunctionInfo>,
}

impl FunctionRegistry {
    pub fn load(category: &str, path: impl AsRef<Path>) -> Result<Self, RegistryError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| RegistryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let registry = Self::from_json_str(category, &text)?;
        debug!(
            category,
            path = %path.display(),
            functions = registry.len(),
            "loaded function registry"
        );
        Ok(registry)
    }

    pub fn from_json_str(category: &str, json: &str) -> Result<Self, RegistryError> {
        let file: RegistryFile =
            serde_json::from_str(json).map_err(|source| RegistryError::Parse {
                category: category.to_string(),
                source,
            })?;

        let mut functions = BTreeMap::new();
        for (name, raw) in file.functions {
            let info = build_function(category, &name, raw)?;
            functions.insert(name, info);
        }

        Ok(Self {
            category: category.to_string(),
            description: file.description,
            functions,
        })
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&FunctionInfo> {
        self.functions.get(name)
    }

    pub fn function(&self, name: &str) -> Result<&FunctionInfo, RegistryError> {
        self.get(name).ok_or_else(|| RegistryError::UnknownFunction {
            category: self.category.clone(),
            name: name.to_string(),
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.functions.keys().map(String::as_str).collect()
    }

    pub fn functions(&self) -> impl Iterator<Item = &FunctionInfo> {
        self.functions.values()
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    /// Largest parameter count of any function; sizes the shader's
    /// parameter arrays.
    pub fn max_param_count(&self) -> usize {
        self.functions
            .values()
            .map(|info| info.params.len())
            .max()
            .unwrap_or(0)
    }

    pub fn param_defaults(&self) -> BTreeMap<&str, BTreeMap<&str, ParamValue>> {
        self.functions
            .iter()
            .map(|(name, info)| {
                let defaults = info
                    .params
                    .iter()
                    .map(|param| (param.name.as_str(), param.kind.default_value()))
                    .collect();
                (name.as_str(), defaults)
            })
            .collect()
    }

    /// Template arguments selecting `function` for the `prefix` slot of the
    /// fragment shader: `{prefix}_FUNC`, `{prefix}_FUNC_UNIFORMS`,
    /// `{prefix}_FUNC_ARGS` and `MAX_{prefix}_PARAMS`.
    pub fn template_args(&self, function: &str, prefix: &str) -> Result<TemplateArgs, RegistryError> {
        let info = self.function(function)?;
        let mut args = TemplateArgs::new();
        args.insert(format!("{prefix}_FUNC"), info.name.clone());
        args.insert(
            format!("{prefix}_FUNC_UNIFORMS"),
            glsl::uniform_declarations(info, None),
        );
        args.insert(
            format!("{prefix}_FUNC_ARGS"),
            glsl::call_arguments(info, false, None),
        );
        args.insert(
            format!("MAX_{prefix}_PARAMS"),
            self.max_param_count().to_string(),
        );
        Ok(args)
    }
}

fn build_function(category: &str, name: &str, raw: RawFunction) -> Result<FunctionInfo, RegistryError> {
    let mut params = Vec::with_capacity(raw.params.len());
    let mut seen = BTreeSet::new();
    for raw_param in raw.params {
        let param_name = raw_param.name.clone();
        if !seen.insert(param_name.clone()) {
            return Err(RegistryError::DuplicateParam {
                category: category.to_string(),
                function: name.to_string(),
                param: param_name,
            });
        }
        let param = raw_param
            .into_param()
            .map_err(|reason| RegistryError::InvalidParam {
                category: category.to_string(),
                function: name.to_string(),
                param: param_name,
                reason,
            })?;
        params.push(param);
    }

    let mut groups = Vec::with_capacity(raw.param_groups.len() + 1);
    let mut grouped = BTreeSet::new();
    for group in raw.param_groups {
        for param in &group.params {
            if !seen.contains(param) {
                return Err(RegistryError::UnknownGroupParam {
                    category: category.to_string(),
                    function: name.to_string(),
                    group: group.display_name.clone(),
                    param: param.clone(),
                });
            }
            grouped.insert(param.clone());
        }
        groups.push(ParamGroup {
            display_name: group.display_name,
            params: group.params,
        });
    }

    let ungrouped: Vec<String> = params
        .iter()
        .filter(|param: &&FunctionParam| !grouped.contains(&param.name))
        .map(|param| param.name.clone())
        .collect();
    if !ungrouped.is_empty() || groups.is_empty() {
        groups.push(ParamGroup {
            display_name: UNGROUPED.to_string(),
            params: ungrouped,
        });
    }

    Ok(FunctionInfo {
        name: name.to_string(),
        display_name: raw.display_name,
        category: category.to_string(),
        params,
        groups,
    })
}
