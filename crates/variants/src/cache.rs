use std::collections::HashMap;

use templates::{ResolverOptions, SourceProvider, TemplateArgs, TemplateResolver};
use tracing::debug;

use crate::device::{DeviceError, ShaderDevice};
use crate::diagnostics::map_compile_error;
use crate::error::{CompileFailure, VariantError};
use crate::handles::{BufferId, ProgramId, VertexArrayId};

type ProgramKey = (TemplateArgs, TemplateArgs);
type VertexArrayKey = (ProgramId, BufferId, Vec<String>);

/// Compiles each distinct pair of vertex/fragment template arguments once.
///
/// Entries are never evicted or invalidated; the set of variants is bounded
/// by the combinations the user can select. `release_all` hands every handle
/// back to the device at teardown.
pub struct VariantShaderCache<D, S> {
    device: D,
    sources: S,
    vertex_template: String,
    fragment_template: String,
    options: ResolverOptions,
    programs: HashMap<ProgramKey, ProgramId>,
    vertex_arrays: HashMap<VertexArrayKey, VertexArrayId>,
}

impl<D: ShaderDevice, S: SourceProvider> VariantShaderCache<D, S> {
    pub fn new(
        device: D,
        sources: S,
        vertex_template: impl Into<String>,
        fragment_template: impl Into<String>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            device,
            sources,
            vertex_template: vertex_template.into(),
            fragment_template: fragment_template.into(),
            options,
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
        }
    }

    /// Returns the program for this argument pair and whether it was compiled
    /// by this call. Failures are not cached.
    pub fn get_or_create_program(
        &mut self,
        vertex_args: &TemplateArgs,
        fragment_args: &TemplateArgs,
    ) -> Result<(ProgramId, bool), VariantError> {
        let key = (vertex_args.clone(), fragment_args.clone());
        if let Some(&program) = self.programs.get(&key) {
            return Ok((program, false));
        }

        debug!(
            vertex_args = %vertex_args,
            fragment_args = %fragment_args,
            "creating shaders for new variant"
        );
        let resolver = TemplateResolver::new(&self.sources, self.options.clone());
        let (vertex_source, vertex_provenance) = resolver
            .resolve(&self.vertex_template, vertex_args)?
            .into_parts();
        let (fragment_source, fragment_provenance) = resolver
            .resolve(&self.fragment_template, fragment_args)?
            .into_parts();

        let program = match self.device.compile_program(&vertex_source, &fragment_source) {
            Ok(program) => program,
            Err(DeviceError::Compile(raw)) => {
                return Err(
                    match map_compile_error(&raw, &vertex_provenance, &fragment_provenance) {
                        Some(diagnostics) => VariantError::Compile(CompileFailure { diagnostics, raw }),
                        None => VariantError::Device(DeviceError::Compile(raw)),
                    },
                );
            }
            Err(other) => return Err(other.into()),
        };

        debug!(program = %program, variants = self.programs.len() + 1, "cached new variant");
        self.programs.insert(key, program);
        Ok((program, true))
    }

    pub fn get_or_create_vao(
        &mut self,
        program: ProgramId,
        buffer: BufferId,
        attributes: &[&str],
    ) -> Result<VertexArrayId, VariantError> {
        let key = (
            program,
            buffer,
            attributes.iter().map(|name| name.to_string()).collect(),
        );
        if let Some(&vertex_array) = self.vertex_arrays.get(&key) {
            return Ok(vertex_array);
        }

        debug!(program = %program, buffer = %buffer, attributes = ?attributes, "creating vertex array");
        let vertex_array = self.device.create_vertex_array(program, buffer, attributes)?;
        self.vertex_arrays.insert(key, vertex_array);
        Ok(vertex_array)
    }

    pub fn program_count(&self) -> usize {
        self.programs.len()
    }

    pub fn vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    /// Releases vertex arrays before the programs they reference, then
    /// forgets every entry.
    pub fn release_all(&mut self) {
        for (_, vertex_array) in self.vertex_arrays.drain() {
            self.device.release_vertex_array(vertex_array);
        }
        for (_, program) in self.programs.drain() {
            self.device.release_program(program);
        }
        debug!("released cached shader variants");
    }
}
