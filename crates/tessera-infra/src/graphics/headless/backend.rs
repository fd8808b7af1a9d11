// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use super::call::BackendCall;
use std::collections::{HashMap, HashSet};
use tessera_core::renderer::api::{
    BlendStateDescriptor, BufferKind, BufferUsage, DepthStencilStateDescriptor, DrawCall,
    DrawKind, GraphicsBackendType, LinkedProgram, ProgramId, RasterizerStateDescriptor,
    RawBufferDescriptor, RawBufferId, RawShaderId, RawTextureId, SamplerDescriptor, ShaderStage,
    TextureDescriptor, VertexAttribute, VertexLayoutId, VertexStepMode, Viewport,
};
use tessera_core::renderer::{GraphicsBackend, ResourceError, ShaderError};

/// Switches that make the next matching calls fail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FailureInjection {
    /// Buffer, layout and texture creation fail.
    pub allocation: bool,
    /// Mapped writes fail.
    pub map: bool,
    /// Program links report failure.
    pub link: bool,
    /// Draw calls fail.
    pub draw: bool,
}

#[derive(Debug)]
struct HeadlessBuffer {
    kind: BufferKind,
    usage: BufferUsage,
    data: Vec<u8>,
}

#[derive(Debug)]
struct HeadlessShader {
    stage: ShaderStage,
    identifiers: HashSet<String>,
}

#[derive(Debug, Default)]
struct HeadlessProgram {
    linked: bool,
    identifiers: HashSet<String>,
    uniform_blocks: HashMap<String, u32>,
    sampler_units: HashMap<String, u32>,
}

#[derive(Debug)]
struct HeadlessTexture {
    mip_levels: u32,
}

#[derive(Debug, Default)]
struct BoundState {
    program: Option<ProgramId>,
    layout: Option<VertexLayoutId>,
    index_buffer: Option<RawBufferId>,
    textures: HashMap<u32, (RawTextureId, u32)>,
    constant_buffers: HashMap<(ShaderStage, u32), RawBufferId>,
}

/// A [`GraphicsBackend`] living entirely in host memory.
#[derive(Debug)]
pub struct HeadlessBackend {
    next_id: u64,
    max_anisotropy: f32,
    calls: Vec<BackendCall>,
    buffers: HashMap<RawBufferId, HeadlessBuffer>,
    shaders: HashMap<RawShaderId, HeadlessShader>,
    programs: HashMap<ProgramId, HeadlessProgram>,
    layouts: HashMap<VertexLayoutId, Vec<VertexAttribute>>,
    textures: HashMap<RawTextureId, HeadlessTexture>,
    bound: BoundState,
    /// Failure switches, checked on every call.
    pub failures: FailureInjection,
}

impl Default for HeadlessBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessBackend {
    /// Creates an empty backend reporting 16x maximum anisotropy.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            max_anisotropy: 16.0,
            calls: Vec::new(),
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            layouts: HashMap::new(),
            textures: HashMap::new(),
            bound: BoundState::default(),
            failures: FailureInjection::default(),
        }
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Every call received since creation or the last [`Self::clear_calls`].
    pub fn calls(&self) -> &[BackendCall] {
        &self.calls
    }

    /// Forgets the recorded calls. Objects and bindings are kept.
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Counts recorded calls matching `pred`.
    pub fn count(&self, pred: impl Fn(&BackendCall) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    /// Draw calls that passed validation.
    pub fn draws(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BackendCall::Draw(d) => Some(*d),
                _ => None,
            })
            .collect()
    }

    /// The bytes held by a buffer object.
    pub fn buffer_contents(&self, id: RawBufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|b| b.data.as_slice())
    }

    /// Number of buffer objects alive.
    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    /// Number of program objects alive.
    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    /// The program made current last.
    pub fn current_program(&self) -> Option<ProgramId> {
        self.bound.program
    }

    /// The buffer feeding the first per-vertex attribute of the bound layout.
    pub fn bound_vertex_buffer(&self) -> Option<RawBufferId> {
        let layout = self.layouts.get(&self.bound.layout?)?;
        layout
            .iter()
            .find(|a| a.step_mode == VertexStepMode::Vertex)
            .map(|a| a.buffer)
    }

    /// The attributes recorded in the bound vertex layout object.
    pub fn bound_layout(&self) -> Option<&[VertexAttribute]> {
        self.layouts.get(&self.bound.layout?).map(Vec::as_slice)
    }

    /// The texture and max sampled level bound to `unit`.
    pub fn bound_texture(&self, unit: u32) -> Option<(RawTextureId, u32)> {
        self.bound.textures.get(&unit).copied()
    }

    /// The buffer bound to a stage's constant slot.
    pub fn bound_constant_buffer(&self, stage: ShaderStage, slot: u32) -> Option<RawBufferId> {
        self.bound.constant_buffers.get(&(stage, slot)).copied()
    }

    /// Binding point assigned to a program's uniform block.
    pub fn uniform_block_binding(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.uniform_blocks.get(name).copied()
    }

    /// Texture unit assigned to a program's sampler uniform.
    pub fn sampler_unit(&self, program: ProgramId, name: &str) -> Option<u32> {
        self.programs.get(&program)?.sampler_units.get(name).copied()
    }

    fn buffer_len(&self, id: RawBufferId) -> Result<u64, ResourceError> {
        self.buffers
            .get(&id)
            .map(|b| b.data.len() as u64)
            .ok_or(ResourceError::NotFound)
    }

    fn validate_draw(&self, call: &DrawCall) -> Result<(), ResourceError> {
        let program = self
            .bound
            .program
            .and_then(|p| self.programs.get(&p))
            .ok_or_else(|| ResourceError::BackendError("draw without a program".to_string()))?;
        if !program.linked {
            log::warn!("Drawing with a program that failed to link");
        }

        match call.kind {
            DrawKind::Draw => {
                let Some(attributes) = self.bound.layout.and_then(|l| self.layouts.get(&l)) else {
                    return Ok(());
                };
                let last = u64::from(call.start_vertex) + u64::from(call.element_count);
                for attribute in attributes
                    .iter()
                    .filter(|a| a.step_mode == VertexStepMode::Vertex)
                {
                    let needed = if last == 0 {
                        0
                    } else {
                        (last - 1) * u64::from(attribute.stride)
                            + u64::from(attribute.offset)
                            + u64::from(attribute.format.size())
                    };
                    if needed > self.buffer_len(attribute.buffer)? {
                        return Err(ResourceError::BackendError(format!(
                            "vertex range {}..{} exceeds buffer {:?}",
                            call.start_vertex, last, attribute.buffer
                        )));
                    }
                }
                Ok(())
            }
            DrawKind::DrawIndexed | DrawKind::DrawIndexedInstanced => {
                let index_buffer = self.bound.index_buffer.ok_or_else(|| {
                    ResourceError::BackendError("indexed draw without an index buffer".to_string())
                })?;
                let end = (u64::from(call.start_index) + u64::from(call.element_count)) * 4;
                if end > self.buffer_len(index_buffer)? {
                    return Err(ResourceError::BackendError(format!(
                        "index range ends at byte {end}, past the index buffer"
                    )));
                }
                Ok(())
            }
        }
    }
}

/// Splits GLSL-like source into identifier tokens.
fn identifiers(source: &str) -> HashSet<String> {
    source
        .split(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

impl GraphicsBackend for HeadlessBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn max_anisotropy(&self) -> f32 {
        self.max_anisotropy
    }

    fn create_buffer(
        &mut self,
        descriptor: &RawBufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<RawBufferId, ResourceError> {
        if self.failures.allocation {
            return Err(ResourceError::AllocationFailed(
                "injected allocation failure".to_string(),
            ));
        }
        let mut storage = vec![0u8; descriptor.size as usize];
        if let Some(data) = data {
            let len = data.len().min(storage.len());
            storage[..len].copy_from_slice(&data[..len]);
        }
        let id = RawBufferId(self.next_id());
        self.buffers.insert(
            id,
            HeadlessBuffer {
                kind: descriptor.kind,
                usage: descriptor.usage,
                data: storage,
            },
        );
        self.calls.push(BackendCall::CreateBuffer {
            id,
            size: descriptor.size,
        });
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        self.buffers.remove(&id).ok_or(ResourceError::NotFound)?;
        if self.bound.index_buffer == Some(id) {
            self.bound.index_buffer = None;
        }
        self.calls.push(BackendCall::DestroyBuffer(id));
        Ok(())
    }

    fn write_buffer_mapped(
        &mut self,
        id: RawBufferId,
        kind: BufferKind,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if self.failures.map {
            return Err(ResourceError::MapFailed("injected map failure".to_string()));
        }
        let buffer = self.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        if buffer.usage == BufferUsage::Immutable {
            return Err(ResourceError::MapFailed(format!(
                "{id:?} is immutable"
            )));
        }
        if data.len() > buffer.data.len() {
            return Err(ResourceError::MapFailed(format!(
                "write of {} bytes into a {} byte buffer",
                data.len(),
                buffer.data.len()
            )));
        }
        if buffer.kind != kind {
            log::warn!("{id:?} created as {:?} but written as {:?}", buffer.kind, kind);
        }
        // Invalidate-on-map discards the previous contents.
        buffer.data.fill(0);
        buffer.data[..data.len()].copy_from_slice(data);
        self.calls.push(BackendCall::WriteBuffer {
            id,
            kind,
            len: data.len(),
        });
        Ok(())
    }

    fn bind_index_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        self.buffer_len(id)?;
        self.bound.index_buffer = Some(id);
        self.calls.push(BackendCall::BindIndexBuffer(id));
        Ok(())
    }

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        id: RawBufferId,
    ) -> Result<(), ResourceError> {
        self.buffer_len(id)?;
        self.bound.constant_buffers.insert((stage, slot), id);
        self.calls
            .push(BackendCall::BindConstantBuffer { stage, slot, id });
        Ok(())
    }

    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> Result<VertexLayoutId, ResourceError> {
        if self.failures.allocation {
            return Err(ResourceError::AllocationFailed(
                "injected allocation failure".to_string(),
            ));
        }
        for attribute in attributes {
            self.buffer_len(attribute.buffer)?;
        }
        let id = VertexLayoutId(self.next_id());
        self.layouts.insert(id, attributes.to_vec());
        self.calls.push(BackendCall::CreateVertexLayout(id));
        Ok(id)
    }

    fn destroy_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        self.layouts.remove(&id).ok_or(ResourceError::NotFound)?;
        if self.bound.layout == Some(id) {
            self.bound.layout = None;
        }
        self.calls.push(BackendCall::DestroyVertexLayout(id));
        Ok(())
    }

    fn bind_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        if !self.layouts.contains_key(&id) {
            return Err(ResourceError::NotFound);
        }
        self.bound.layout = Some(id);
        self.calls.push(BackendCall::BindVertexLayout(id));
        Ok(())
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<RawShaderId, ResourceError> {
        if let Some((line, directive)) = source
            .lines()
            .enumerate()
            .find(|(_, l)| l.trim_start().starts_with("#error"))
        {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: format!("0:{}: {}", line + 1, directive.trim()),
            }
            .into());
        }
        let id = RawShaderId(self.next_id());
        self.shaders.insert(
            id,
            HeadlessShader {
                stage,
                identifiers: identifiers(source),
            },
        );
        self.calls.push(BackendCall::CompileShader(id));
        Ok(id)
    }

    fn destroy_shader(&mut self, id: RawShaderId) -> Result<(), ResourceError> {
        self.shaders.remove(&id).ok_or(ResourceError::NotFound)?;
        self.calls.push(BackendCall::DestroyShader(id));
        Ok(())
    }

    fn link_program(&mut self, shaders: &[RawShaderId]) -> Result<LinkedProgram, ResourceError> {
        let mut program = HeadlessProgram::default();
        let mut errors = Vec::new();
        let mut has_vertex = false;
        for id in shaders {
            match self.shaders.get(id) {
                Some(shader) => {
                    has_vertex |= shader.stage == ShaderStage::Vertex;
                    program.identifiers.extend(shader.identifiers.iter().cloned());
                }
                None => errors.push(format!("{id:?} is not a shader object")),
            }
        }
        if !has_vertex {
            errors.push("no vertex stage attached".to_string());
        }
        if self.failures.link {
            errors.push("injected link failure".to_string());
        }
        program.linked = errors.is_empty();

        let id = ProgramId(self.next_id());
        self.programs.insert(id, program);
        self.calls.push(BackendCall::LinkProgram {
            program: id,
            shaders: shaders.to_vec(),
        });
        Ok(LinkedProgram {
            program: id,
            linked: errors.is_empty(),
            info_log: errors.join("\n"),
        })
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.programs.remove(&id).ok_or(ResourceError::NotFound)?;
        if self.bound.program == Some(id) {
            self.bound.program = None;
        }
        self.calls.push(BackendCall::DestroyProgram(id));
        Ok(())
    }

    fn use_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        if !self.programs.contains_key(&id) {
            return Err(ResourceError::NotFound);
        }
        self.bound.program = Some(id);
        self.calls.push(BackendCall::UseProgram(id));
        Ok(())
    }

    fn bind_uniform_block(
        &mut self,
        program: ProgramId,
        name: &str,
        binding: u32,
    ) -> Result<bool, ResourceError> {
        let entry = self.programs.get_mut(&program).ok_or(ResourceError::NotFound)?;
        if !entry.identifiers.contains(name) {
            return Ok(false);
        }
        entry.uniform_blocks.insert(name.to_string(), binding);
        self.calls.push(BackendCall::BindUniformBlock {
            program,
            name: name.to_string(),
            binding,
        });
        Ok(true)
    }

    fn bind_sampler_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<bool, ResourceError> {
        let entry = self.programs.get_mut(&program).ok_or(ResourceError::NotFound)?;
        if !entry.identifiers.contains(name) {
            return Ok(false);
        }
        entry.sampler_units.insert(name.to_string(), unit);
        self.calls.push(BackendCall::BindSamplerUniform {
            program,
            name: name.to_string(),
            unit,
        });
        Ok(true)
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<RawTextureId, ResourceError> {
        if self.failures.allocation {
            return Err(ResourceError::AllocationFailed(
                "injected allocation failure".to_string(),
            ));
        }
        let id = RawTextureId(self.next_id());
        self.textures.insert(
            id,
            HeadlessTexture {
                mip_levels: descriptor.mip_levels.max(1),
            },
        );
        self.calls.push(BackendCall::CreateTexture(id));
        Ok(id)
    }

    fn destroy_texture(&mut self, id: RawTextureId) -> Result<(), ResourceError> {
        self.textures.remove(&id).ok_or(ResourceError::NotFound)?;
        self.bound.textures.retain(|_, (bound, _)| *bound != id);
        self.calls.push(BackendCall::DestroyTexture(id));
        Ok(())
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        id: RawTextureId,
        mip_levels: u32,
    ) -> Result<(), ResourceError> {
        let texture = self.textures.get(&id).ok_or(ResourceError::NotFound)?;
        if mip_levels > texture.mip_levels {
            log::warn!(
                "{id:?} sampled with {mip_levels} levels but has {}",
                texture.mip_levels
            );
        }
        let max_level = mip_levels.max(1) - 1;
        self.bound.textures.insert(unit, (id, max_level));
        self.calls.push(BackendCall::BindTexture {
            unit,
            id,
            max_level,
        });
        Ok(())
    }

    fn apply_sampler(&mut self, sampler: &SamplerDescriptor) -> Result<(), ResourceError> {
        self.calls.push(BackendCall::ApplySampler(*sampler));
        Ok(())
    }

    fn set_rasterizer_state(
        &mut self,
        state: &RasterizerStateDescriptor,
    ) -> Result<(), ResourceError> {
        self.calls.push(BackendCall::SetRasterizerState(*state));
        Ok(())
    }

    fn set_blend_state(&mut self, state: &BlendStateDescriptor) -> Result<(), ResourceError> {
        self.calls.push(BackendCall::SetBlendState(*state));
        Ok(())
    }

    fn set_depth_stencil_state(
        &mut self,
        state: &DepthStencilStateDescriptor,
    ) -> Result<(), ResourceError> {
        self.calls.push(BackendCall::SetDepthStencilState(*state));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), ResourceError> {
        self.calls.push(BackendCall::SetViewport(*viewport));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError> {
        if self.failures.draw {
            return Err(ResourceError::BackendError("injected draw failure".to_string()));
        }
        self.validate_draw(call)?;
        self.calls.push(BackendCall::Draw(*call));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::renderer::api::PrimitiveTopology;

    fn buffer(backend: &mut HeadlessBackend, kind: BufferKind, size: u64) -> RawBufferId {
        backend
            .create_buffer(
                &RawBufferDescriptor {
                    kind,
                    usage: BufferUsage::Dynamic,
                    size,
                },
                None,
            )
            .unwrap()
    }

    #[test]
    fn mapped_write_replaces_contents() {
        let mut backend = HeadlessBackend::new();
        let id = buffer(&mut backend, BufferKind::Vertex, 8);
        backend
            .write_buffer_mapped(id, BufferKind::Vertex, &[1, 2, 3, 4, 5, 6, 7, 8])
            .unwrap();
        backend
            .write_buffer_mapped(id, BufferKind::Vertex, &[9, 9])
            .unwrap();
        assert_eq!(backend.buffer_contents(id), Some(&[9, 9, 0, 0, 0, 0, 0, 0][..]));
        assert!(backend
            .write_buffer_mapped(id, BufferKind::Vertex, &[0; 9])
            .is_err());
    }

    #[test]
    fn discovery_follows_source_identifiers() {
        let mut backend = HeadlessBackend::new();
        let vs = backend
            .compile_shader(
                ShaderStage::Vertex,
                "vs",
                "layout(std140) uniform buffer0 { mat4 mvp; };",
            )
            .unwrap();
        let ps = backend
            .compile_shader(ShaderStage::Pixel, "ps", "uniform sampler2D texture0;")
            .unwrap();
        let linked = backend.link_program(&[vs, ps]).unwrap();
        assert!(linked.linked, "{}", linked.info_log);

        assert!(backend.bind_uniform_block(linked.program, "buffer0", 0).unwrap());
        assert!(!backend.bind_uniform_block(linked.program, "buffer1", 1).unwrap());
        assert!(backend.bind_sampler_uniform(linked.program, "texture0", 0).unwrap());
        assert_eq!(backend.uniform_block_binding(linked.program, "buffer0"), Some(0));
        assert_eq!(backend.sampler_unit(linked.program, "texture0"), Some(0));
    }

    #[test]
    fn error_directive_fails_compilation() {
        let mut backend = HeadlessBackend::new();
        let err = backend
            .compile_shader(ShaderStage::Pixel, "broken", "void main() {}\n#error nope")
            .unwrap_err();
        match err {
            ResourceError::Shader(ShaderError::CompilationError { label, details }) => {
                assert_eq!(label, "broken");
                assert!(details.starts_with("0:2:"), "{details}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn link_without_vertex_stage_fails() {
        let mut backend = HeadlessBackend::new();
        let ps = backend
            .compile_shader(ShaderStage::Pixel, "ps", "void main() {}")
            .unwrap();
        let linked = backend.link_program(&[ps]).unwrap();
        assert!(!linked.linked);
        assert!(linked.info_log.contains("vertex"));
    }

    #[test]
    fn draws_are_validated() {
        let mut backend = HeadlessBackend::new();
        let draw = DrawCall::indexed(PrimitiveTopology::TriangleList, 6, 0);
        assert!(backend.draw(&draw).is_err(), "no program bound");

        let vs = backend
            .compile_shader(ShaderStage::Vertex, "vs", "void main() {}")
            .unwrap();
        let program = backend.link_program(&[vs]).unwrap().program;
        backend.use_program(program).unwrap();
        assert!(backend.draw(&draw).is_err(), "no index buffer bound");

        let ib = buffer(&mut backend, BufferKind::Index, 12);
        backend.bind_index_buffer(ib).unwrap();
        assert!(backend.draw(&draw).is_err(), "6 indices need 24 bytes");
        backend
            .draw(&DrawCall::indexed(PrimitiveTopology::TriangleList, 3, 0))
            .unwrap();
        assert_eq!(backend.draws().len(), 1);

        let past_end = DrawCall::indexed(PrimitiveTopology::TriangleList, 3, u32::MAX);
        assert!(backend.draw(&past_end).is_err(), "index range wraps u32");
        assert_eq!(backend.draws().len(), 1);
    }

    #[test]
    fn texture_binding_clamps_max_level() {
        let mut backend = HeadlessBackend::new();
        let texture = backend
            .create_texture(&TextureDescriptor {
                label: None,
                width: 1,
                height: 1,
                mip_levels: 1,
            })
            .unwrap();
        backend.bind_texture(2, texture, 0).unwrap();
        assert_eq!(backend.bound_texture(2), Some((texture, 0)));
        backend.destroy_texture(texture).unwrap();
        assert_eq!(backend.bound_texture(2), None);
    }
}
