//! Headless `ShaderDevice` backed by naga's GLSL frontend.
//!
//! Types:
//!
//! - `NagaDevice` parses and validates both stages, checks that every
//!   fragment input location is written by the vertex stage, and keeps the
//!   vertex interface of each linked program so vertex arrays can be laid
//!   out against it.
//! - `VertexInput` is one `layout(location = N) in` declaration of a linked
//!   vertex stage.
//! - `VertexArrayLayout` records how a buffer's `f32` components feed the
//!   requested attributes (interleaved, in request order).
//!
//! Parse and validation errors are rendered in the compiler failure block
//! shape with zero-based lines, so they map straight onto provenance.
use std::collections::{BTreeSet, HashMap};

use naga::front::glsl::{Frontend, Options};
use naga::valid::{Capabilities, ValidationFlags, Validator};
use naga::{Binding, Module, ShaderStage, Span, TypeInner};
use tracing::debug;

use crate::device::{DeviceError, ShaderDevice, Stage};
use crate::diagnostics::format_compile_failure;
use crate::handles::{BufferId, ProgramId, VertexArrayId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexInput {
    pub name: String,
    pub location: u32,
    /// Scalar components per vertex; zero for types a buffer cannot feed.
    pub components: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeLayout {
    pub name: String,
    pub location: u32,
    pub components: u32,
    /// Offset in `f32` components from the start of a vertex.
    pub offset: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VertexArrayLayout {
    pub program: ProgramId,
    pub buffer: BufferId,
    pub attributes: Vec<AttributeLayout>,
    /// Components per vertex.
    pub stride: u32,
    pub vertex_count: usize,
}

#[derive(Debug, Clone)]
struct LinkedProgram {
    inputs: Vec<VertexInput>,
}

#[derive(Debug, Default)]
pub struct NagaDevice {
    programs: HashMap<ProgramId, LinkedProgram>,
    buffers: HashMap<BufferId, Vec<f32>>,
    vertex_arrays: HashMap<VertexArrayId, VertexArrayLayout>,
    next_id: u32,
    compiled: usize,
}

impl NagaDevice {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_buffer(&mut self, data: &[f32]) -> BufferId {
        let id = BufferId::new(self.allocate());
        self.buffers.insert(id, data.to_vec());
        id
    }

    /// Number of successful `compile_program` calls so far.
    pub fn compile_count(&self) -> usize {
        self.compiled
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn live_vertex_arrays(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn vertex_inputs(&self, program: ProgramId) -> Option<&[VertexInput]> {
        self.programs.get(&program).map(|linked| linked.inputs.as_slice())
    }

    pub fn vertex_array(&self, vertex_array: VertexArrayId) -> Option<&VertexArrayLayout> {
        self.vertex_arrays.get(&vertex_array)
    }

    fn allocate(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl ShaderDevice for NagaDevice {
    fn compile_program(
        &mut self,
        vertex_source: &str,
        fragment_source: &str,
    ) -> Result<ProgramId, DeviceError> {
        let vertex = compile_stage(Stage::Vertex, vertex_source)?;
        let fragment = compile_stage(Stage::Fragment, fragment_source)?;

        let vertex_outputs = output_locations(&vertex, ShaderStage::Vertex)?;
        let fragment_inputs = input_declarations(&fragment, ShaderStage::Fragment)?;
        for input in &fragment_inputs {
            if !vertex_outputs.contains(&input.location) {
                return Err(DeviceError::Link(format!(
                    "fragment input \"{}\" at location {} is not written by the vertex shader",
                    input.name, input.location
                )));
            }
        }

        let inputs = input_declarations(&vertex, ShaderStage::Vertex)?;
        let id = ProgramId::new(self.allocate());
        debug!(program = %id, inputs = inputs.len(), "linked program");
        self.programs.insert(id, LinkedProgram { inputs });
        self.compiled += 1;
        Ok(id)
    }

    fn create_vertex_array(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        attributes: &[&str],
    ) -> Result<VertexArrayId, DeviceError> {
        let linked = self
            .programs
            .get(&program)
            .ok_or(DeviceError::UnknownProgram(program))?;
        let data = self
            .buffers
            .get(&buffer)
            .ok_or(DeviceError::UnknownBuffer(buffer))?;

        let mut layout = Vec::with_capacity(attributes.len());
        let mut offset = 0;
        for name in attributes {
            let input = linked
                .inputs
                .iter()
                .find(|input| input.name == *name)
                .ok_or_else(|| DeviceError::Attribute {
                    name: name.to_string(),
                    reason: "not a vertex input of the program".to_string(),
                })?;
            if input.components == 0 {
                return Err(DeviceError::Attribute {
                    name: name.to_string(),
                    reason: "input type cannot be fed from a float buffer".to_string(),
                });
            }
            layout.push(AttributeLayout {
                name: input.name.clone(),
                location: input.location,
                components: input.components,
                offset,
            });
            offset += input.components;
        }

        let stride = offset;
        if stride == 0 {
            return Err(DeviceError::Attribute {
                name: String::new(),
                reason: "no attributes requested".to_string(),
            });
        }
        if data.len() % stride as usize != 0 {
            return Err(DeviceError::Attribute {
                name: attributes.join(", "),
                reason: format!(
                    "buffer holds {} floats, not a multiple of the {stride}-float vertex stride",
                    data.len()
                ),
            });
        }

        let vertex_count = data.len() / stride as usize;
        let id = VertexArrayId::new(self.allocate());
        debug!(vertex_array = %id, program = %program, buffer = %buffer, vertex_count, "created vertex array");
        self.vertex_arrays.insert(
            id,
            VertexArrayLayout {
                program,
                buffer,
                attributes: layout,
                stride,
                vertex_count,
            },
        );
        Ok(id)
    }

    fn release_program(&mut self, program: ProgramId) {
        self.programs.remove(&program);
    }

    fn release_vertex_array(&mut self, vertex_array: VertexArrayId) {
        self.vertex_arrays.remove(&vertex_array);
    }
}

fn naga_stage(stage: Stage) -> ShaderStage {
    match stage {
        Stage::Vertex => ShaderStage::Vertex,
        Stage::Fragment => ShaderStage::Fragment,
    }
}

fn compile_stage(stage: Stage, source: &str) -> Result<Module, DeviceError> {
    let mut frontend = Frontend::default();
    let module = frontend
        .parse(&Options::from(naga_stage(stage)), source)
        .map_err(|errors| {
            let entries: Vec<(usize, String)> = errors
                .errors
                .iter()
                .map(|error| (zero_based_line(error.meta, source), error.kind.to_string()))
                .collect();
            DeviceError::Compile(format_compile_failure(stage, &entries))
        })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(error) = validator.validate(&module) {
        let line = error
            .spans()
            .next()
            .map(|(span, _)| zero_based_line(*span, source))
            .unwrap_or(0);
        let message = error.as_inner().to_string();
        return Err(DeviceError::Compile(format_compile_failure(stage, &[(line, message)])));
    }

    Ok(module)
}

fn zero_based_line(span: Span, source: &str) -> usize {
    if !span.is_defined() {
        return 0;
    }
    (span.location(source).line_number as usize).saturating_sub(1)
}

fn input_declarations(module: &Module, stage: ShaderStage) -> Result<Vec<VertexInput>, DeviceError> {
    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage)
        .ok_or_else(|| DeviceError::Link(format!("no {stage:?} entry point")))?;

    let mut inputs = Vec::new();
    for argument in &entry.function.arguments {
        if let Some(Binding::Location { location, .. }) = &argument.binding {
            inputs.push(VertexInput {
                name: argument.name.clone().unwrap_or_default(),
                location: *location,
                components: components(&module.types[argument.ty].inner),
            });
        }
    }
    inputs.sort_by_key(|input| input.location);
    Ok(inputs)
}

fn output_locations(module: &Module, stage: ShaderStage) -> Result<BTreeSet<u32>, DeviceError> {
    let entry = module
        .entry_points
        .iter()
        .find(|entry| entry.stage == stage)
        .ok_or_else(|| DeviceError::Link(format!("no {stage:?} entry point")))?;

    let mut locations = BTreeSet::new();
    let Some(result) = &entry.function.result else {
        return Ok(locations);
    };
    match &result.binding {
        Some(Binding::Location { location, .. }) => {
            locations.insert(*location);
        }
        Some(_) => {}
        None => {
            if let TypeInner::Struct { members, .. } = &module.types[result.ty].inner {
                for member in members {
                    if let Some(Binding::Location { location, .. }) = &member.binding {
                        locations.insert(*location);
                    }
                }
            }
        }
    }
    Ok(locations)
}

fn components(inner: &TypeInner) -> u32 {
    match inner {
        TypeInner::Scalar(_) => 1,
        TypeInner::Vector { size, .. } => *size as u32,
        _ => 0,
    }
}
