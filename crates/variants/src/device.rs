use std::fmt;

use thiserror::Error;

use crate::handles::{BufferId, ProgramId, VertexArrayId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Vertex,
    Fragment,
}

impl Stage {
    /// Section name used in compiler failure blocks.
    pub fn label(self) -> &'static str {
        match self {
            Self::Vertex => "vertex_shader",
            Self::Fragment => "fragment_shader",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "vertex_shader" => Some(Self::Vertex),
            "fragment_shader" => Some(Self::Fragment),
            _ => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Error)]
pub enum DeviceError {
    /// Raw compiler output: `GLSL Compiler failed`, a stage section, then
    /// `ERROR: <column>:<line>: <message>` lines.
    #[error("{0}")]
    Compile(String),

    #[error("program link failed: {0}")]
    Link(String),

    #[error("unknown program {0}")]
    UnknownProgram(ProgramId),

    #[error("unknown buffer {0}")]
    UnknownBuffer(BufferId),

    #[error("cannot bind attribute \"{name}\": {reason}")]
    Attribute { name: String, reason: String },
}

/// The GPU driver as seen by the variant cache.
pub trait ShaderDevice {
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, DeviceError>;

    fn create_vertex_array(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        attributes: &[&str],
    ) -> Result<VertexArrayId, DeviceError>;

    fn release_program(&mut self, _program: ProgramId) {}

    fn release_vertex_array(&mut self, _vertex_array: VertexArrayId) {}
}
