//! Variant program cache over a pluggable shader device, with compile
//! errors mapped back to template coordinates.
mod cache;
mod device;
mod diagnostics;
mod error;
mod handles;
mod naga_device;

pub use cache::VariantShaderCache;
pub use device::{DeviceError, ShaderDevice, Stage};
pub use diagnostics::{format_compile_failure, map_compile_error, Diagnostic};
pub use error::{CompileFailure, VariantError};
pub use handles::{BufferId, ProgramId, VertexArrayId};
pub use naga_device::{AttributeLayout, NagaDevice, VertexArrayLayout, VertexInput};

/// Two triangles covering clip space, as `vec2` positions.
pub const FULLSCREEN_QUAD: [f32; 12] = [
    -1.0, -1.0, 1.0, -1.0, -1.0, 1.0, //
    -1.0, 1.0, 1.0, -1.0, 1.0, 1.0,
];
