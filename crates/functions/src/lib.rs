//! Metadata for the selectable shader functions and the GLSL glue generated
//! from it.
pub mod glsl;
mod param;
mod registry;

pub use param::{FunctionParam, ParamKind, ParamValue, Rgba};
pub use registry::{FunctionInfo, FunctionRegistry, ParamGroup, RegistryError};
