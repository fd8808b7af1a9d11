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

use tessera_core::renderer::api::{
    BlendStateDescriptor, BufferKind, DepthStencilStateDescriptor, DrawCall, ProgramId,
    RasterizerStateDescriptor, RawBufferId, RawShaderId, RawTextureId, SamplerDescriptor,
    ShaderStage, VertexLayoutId, Viewport,
};

/// One call received by a [`HeadlessBackend`](super::HeadlessBackend).
#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    /// A buffer object was created with this size.
    CreateBuffer {
        /// The new object.
        id: RawBufferId,
        /// Its size in bytes.
        size: u64,
    },
    /// A buffer object was destroyed.
    DestroyBuffer(RawBufferId),
    /// A mapped write of `len` bytes.
    WriteBuffer {
        /// The written object.
        id: RawBufferId,
        /// What the buffer is bound as.
        kind: BufferKind,
        /// Bytes written.
        len: usize,
    },
    /// An index buffer was bound.
    BindIndexBuffer(RawBufferId),
    /// A constant buffer was bound to a stage slot.
    BindConstantBuffer {
        /// The stage.
        stage: ShaderStage,
        /// The binding slot.
        slot: u32,
        /// The buffer object.
        id: RawBufferId,
    },
    /// A vertex layout object was created.
    CreateVertexLayout(VertexLayoutId),
    /// A vertex layout object was destroyed.
    DestroyVertexLayout(VertexLayoutId),
    /// A vertex layout object was bound.
    BindVertexLayout(VertexLayoutId),
    /// A shader compiled successfully.
    CompileShader(RawShaderId),
    /// A shader object was destroyed.
    DestroyShader(RawShaderId),
    /// A program was linked, successfully or not.
    LinkProgram {
        /// The program object.
        program: ProgramId,
        /// The attached shaders.
        shaders: Vec<RawShaderId>,
    },
    /// A program was destroyed.
    DestroyProgram(ProgramId),
    /// A program was made current.
    UseProgram(ProgramId),
    /// A uniform block was assigned a binding point.
    BindUniformBlock {
        /// The program.
        program: ProgramId,
        /// The block name.
        name: String,
        /// The binding point.
        binding: u32,
    },
    /// A sampler uniform was assigned a texture unit.
    BindSamplerUniform {
        /// The program.
        program: ProgramId,
        /// The uniform name.
        name: String,
        /// The texture unit.
        unit: u32,
    },
    /// A texture object was created.
    CreateTexture(RawTextureId),
    /// A texture object was destroyed.
    DestroyTexture(RawTextureId),
    /// A texture was bound to a unit.
    BindTexture {
        /// The texture unit.
        unit: u32,
        /// The texture object.
        id: RawTextureId,
        /// The highest mip level sampling may use.
        max_level: u32,
    },
    /// Sampling parameters were applied to the active texture.
    ApplySampler(SamplerDescriptor),
    /// Rasterizer state was applied.
    SetRasterizerState(RasterizerStateDescriptor),
    /// Blend state was applied.
    SetBlendState(BlendStateDescriptor),
    /// Depth-stencil state was applied.
    SetDepthStencilState(DepthStencilStateDescriptor),
    /// The viewport was set.
    SetViewport(Viewport),
    /// A draw call passed validation.
    Draw(DrawCall),
}

impl BackendCall {
    /// Returns `true` for calls that change which objects are bound.
    pub fn is_binding(&self) -> bool {
        matches!(
            self,
            BackendCall::BindIndexBuffer(_)
                | BackendCall::BindConstantBuffer { .. }
                | BackendCall::BindVertexLayout(_)
                | BackendCall::UseProgram(_)
                | BackendCall::BindTexture { .. }
        )
    }
}
