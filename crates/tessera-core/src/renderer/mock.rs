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

//! An in-memory backend for unit tests.

use crate::renderer::api::*;
use crate::renderer::error::{ResourceError, ShaderError};
use crate::renderer::traits::GraphicsBackend;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    CreateBuffer(RawBufferId, u64),
    DestroyBuffer(RawBufferId),
    WriteBuffer(RawBufferId, usize),
    BindIndexBuffer(RawBufferId),
    BindConstantBuffer(ShaderStage, u32, RawBufferId),
    CreateVertexLayout(VertexLayoutId, Vec<VertexAttribute>),
    DestroyVertexLayout(VertexLayoutId),
    BindVertexLayout(VertexLayoutId),
    CompileShader(RawShaderId),
    DestroyShader(RawShaderId),
    LinkProgram(ProgramId, Vec<RawShaderId>),
    DestroyProgram(ProgramId),
    UseProgram(ProgramId),
    BindUniformBlock(ProgramId, String, u32),
    BindSamplerUniform(ProgramId, String, u32),
    CreateTexture(RawTextureId),
    DestroyTexture(RawTextureId),
    BindTexture(u32, RawTextureId, u32),
    ApplySampler(SamplerDescriptor),
    SetRasterizer(RasterizerStateDescriptor),
    SetBlend(BlendStateDescriptor),
    SetDepthStencil(DepthStencilStateDescriptor),
    SetViewport(Viewport),
    Draw(DrawCall),
}

#[derive(Debug, Default)]
pub(crate) struct MockBackend {
    next: u64,
    pub calls: Vec<Call>,
    pub buffers: HashMap<RawBufferId, Vec<u8>>,
    /// Uniform block names every linked program exposes.
    pub uniform_blocks: Vec<String>,
    /// Sampler uniform names every linked program exposes.
    pub sampler_uniforms: Vec<String>,
    pub fail_link: bool,
    pub fail_map: bool,
    pub fail_bind_index: bool,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn next(&mut self) -> u64 {
        self.next += 1;
        self.next
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.calls.iter().filter(|c| pred(c)).count()
    }

    pub fn draws(&self) -> Vec<DrawCall> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                Call::Draw(d) => Some(*d),
                _ => None,
            })
            .collect()
    }
}

impl GraphicsBackend for MockBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Unknown
    }

    fn max_anisotropy(&self) -> f32 {
        16.0
    }

    fn create_buffer(
        &mut self,
        descriptor: &RawBufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<RawBufferId, ResourceError> {
        let id = RawBufferId(self.next());
        let mut storage = vec![0u8; descriptor.size as usize];
        if let Some(data) = data {
            storage[..data.len()].copy_from_slice(data);
        }
        self.buffers.insert(id, storage);
        self.calls.push(Call::CreateBuffer(id, descriptor.size));
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        self.buffers.remove(&id).ok_or(ResourceError::NotFound)?;
        self.calls.push(Call::DestroyBuffer(id));
        Ok(())
    }

    fn write_buffer_mapped(
        &mut self,
        id: RawBufferId,
        _kind: BufferKind,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if self.fail_map {
            return Err(ResourceError::MapFailed("mock map failure".to_string()));
        }
        let storage = self.buffers.get_mut(&id).ok_or(ResourceError::NotFound)?;
        storage[..data.len()].copy_from_slice(data);
        self.calls.push(Call::WriteBuffer(id, data.len()));
        Ok(())
    }

    fn bind_index_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        self.calls.push(Call::BindIndexBuffer(id));
        if self.fail_bind_index {
            return Err(ResourceError::BackendError("mock index bind".to_string()));
        }
        Ok(())
    }

    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        id: RawBufferId,
    ) -> Result<(), ResourceError> {
        self.calls.push(Call::BindConstantBuffer(stage, slot, id));
        Ok(())
    }

    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> Result<VertexLayoutId, ResourceError> {
        let id = VertexLayoutId(self.next());
        self.calls.push(Call::CreateVertexLayout(id, attributes.to_vec()));
        Ok(id)
    }

    fn destroy_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        self.calls.push(Call::DestroyVertexLayout(id));
        Ok(())
    }

    fn bind_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        self.calls.push(Call::BindVertexLayout(id));
        Ok(())
    }

    fn compile_shader(
        &mut self,
        _stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<RawShaderId, ResourceError> {
        if source.contains("#error") {
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details: "mock compile error".to_string(),
            }
            .into());
        }
        let id = RawShaderId(self.next());
        self.calls.push(Call::CompileShader(id));
        Ok(id)
    }

    fn destroy_shader(&mut self, id: RawShaderId) -> Result<(), ResourceError> {
        self.calls.push(Call::DestroyShader(id));
        Ok(())
    }

    fn link_program(&mut self, shaders: &[RawShaderId]) -> Result<LinkedProgram, ResourceError> {
        let program = ProgramId(self.next());
        self.calls.push(Call::LinkProgram(program, shaders.to_vec()));
        Ok(LinkedProgram {
            program,
            linked: !self.fail_link,
            info_log: if self.fail_link {
                "mock link failure".to_string()
            } else {
                String::new()
            },
        })
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.calls.push(Call::DestroyProgram(id));
        Ok(())
    }

    fn use_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        self.calls.push(Call::UseProgram(id));
        Ok(())
    }

    fn bind_uniform_block(
        &mut self,
        program: ProgramId,
        name: &str,
        binding: u32,
    ) -> Result<bool, ResourceError> {
        if !self.uniform_blocks.iter().any(|n| n == name) {
            return Ok(false);
        }
        self.calls
            .push(Call::BindUniformBlock(program, name.to_string(), binding));
        Ok(true)
    }

    fn bind_sampler_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<bool, ResourceError> {
        if !self.sampler_uniforms.iter().any(|n| n == name) {
            return Ok(false);
        }
        self.calls
            .push(Call::BindSamplerUniform(program, name.to_string(), unit));
        Ok(true)
    }

    fn create_texture(
        &mut self,
        _descriptor: &TextureDescriptor,
    ) -> Result<RawTextureId, ResourceError> {
        let id = RawTextureId(self.next());
        self.calls.push(Call::CreateTexture(id));
        Ok(id)
    }

    fn destroy_texture(&mut self, id: RawTextureId) -> Result<(), ResourceError> {
        self.calls.push(Call::DestroyTexture(id));
        Ok(())
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        id: RawTextureId,
        mip_levels: u32,
    ) -> Result<(), ResourceError> {
        self.calls.push(Call::BindTexture(unit, id, mip_levels));
        Ok(())
    }

    fn apply_sampler(&mut self, sampler: &SamplerDescriptor) -> Result<(), ResourceError> {
        self.calls.push(Call::ApplySampler(*sampler));
        Ok(())
    }

    fn set_rasterizer_state(
        &mut self,
        state: &RasterizerStateDescriptor,
    ) -> Result<(), ResourceError> {
        self.calls.push(Call::SetRasterizer(*state));
        Ok(())
    }

    fn set_blend_state(&mut self, state: &BlendStateDescriptor) -> Result<(), ResourceError> {
        self.calls.push(Call::SetBlend(*state));
        Ok(())
    }

    fn set_depth_stencil_state(
        &mut self,
        state: &DepthStencilStateDescriptor,
    ) -> Result<(), ResourceError> {
        self.calls.push(Call::SetDepthStencil(*state));
        Ok(())
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), ResourceError> {
        self.calls.push(Call::SetViewport(*viewport));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError> {
        self.calls.push(Call::Draw(*call));
        Ok(())
    }
}
