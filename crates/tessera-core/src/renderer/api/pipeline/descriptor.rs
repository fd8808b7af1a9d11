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

//! The per-draw pipeline state descriptor.

use super::enums::{DrawKind, PrimitiveTopology};
use super::state::{BlendStateId, DepthStencilStateId, RasterizerStateId, Viewport};
use crate::renderer::api::buffer::BufferId;
use crate::renderer::api::common::{
    ShaderStage, MAX_CONSTANT_BUFFERS, MAX_TEXTURE_SLOTS, MAX_VERTEX_BUFFERS, SHADER_STAGE_COUNT,
};
use crate::renderer::api::layout::InputLayoutId;
use crate::renderer::api::shader::ShaderStageId;
use crate::renderer::api::texture::{SamplerStateId, TextureId};

/// Draw parameters for one draw call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawCall {
    /// Which draw entry point to use.
    pub kind: DrawKind,
    /// How vertices are assembled into primitives.
    pub topology: PrimitiveTopology,
    /// Number of vertices (non-indexed) or indices (indexed) to draw.
    pub element_count: u32,
    /// First vertex of a non-indexed draw.
    pub start_vertex: u32,
    /// First index of an indexed draw.
    pub start_index: u32,
    /// Number of instances of an instanced draw.
    pub instance_count: u32,
    /// First instance of an instanced draw.
    pub start_instance: u32,
}

impl DrawCall {
    /// A non-indexed draw of `vertex_count` vertices from vertex 0.
    pub fn vertices(topology: PrimitiveTopology, vertex_count: u32) -> Self {
        Self {
            kind: DrawKind::Draw,
            topology,
            element_count: vertex_count,
            instance_count: 1,
            ..Default::default()
        }
    }

    /// An indexed draw of `index_count` indices starting at `start_index`.
    pub fn indexed(topology: PrimitiveTopology, index_count: u32, start_index: u32) -> Self {
        Self {
            kind: DrawKind::DrawIndexed,
            topology,
            element_count: index_count,
            start_index,
            instance_count: 1,
            ..Default::default()
        }
    }

    /// An indexed draw repeated for `instance_count` instances.
    pub fn indexed_instanced(
        topology: PrimitiveTopology,
        index_count: u32,
        start_index: u32,
        instance_count: u32,
        start_instance: u32,
    ) -> Self {
        Self {
            kind: DrawKind::DrawIndexedInstanced,
            topology,
            element_count: index_count,
            start_index,
            instance_count,
            start_instance,
            ..Default::default()
        }
    }
}

/// The full set of bindings and draw parameters requested for one draw call.
///
/// Caller-constructed per draw and read-only to the core. Every binding is
/// referenced by handle; two states bind the same resource in a slot iff the
/// handles are equal.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineState {
    /// Slot 0 is the primary vertex stream, slots 1.. carry per-instance data.
    pub vertex_buffers: [Option<BufferId>; MAX_VERTEX_BUFFERS],
    /// The 32-bit index buffer.
    pub index_buffer: Option<BufferId>,
    /// The input layout describing the vertex streams.
    pub input_layout: Option<InputLayoutId>,
    /// Stage objects, indexed by [`ShaderStage::index`].
    pub shaders: [Option<ShaderStageId>; SHADER_STAGE_COUNT],
    /// Textures per stage, indexed by binding slot.
    pub textures: [[Option<TextureId>; MAX_TEXTURE_SLOTS]; SHADER_STAGE_COUNT],
    /// Constant buffers per stage, indexed by binding slot.
    pub constant_buffers: [[Option<BufferId>; MAX_CONSTANT_BUFFERS]; SHADER_STAGE_COUNT],
    /// Rasterizer state object.
    pub rasterizer_state: Option<RasterizerStateId>,
    /// Blend state object.
    pub blend_state: Option<BlendStateId>,
    /// Depth-stencil state object.
    pub depth_stencil_state: Option<DepthStencilStateId>,
    /// Sampler state object.
    pub sampler_state: Option<SamplerStateId>,
    /// The viewport, compared by value.
    pub viewport: Option<Viewport>,
    /// Draw parameters; not tracked between draws.
    pub draw: DrawCall,
}

impl PipelineState {
    /// Returns the stage object bound for `stage`.
    pub fn shader(&self, stage: ShaderStage) -> Option<ShaderStageId> {
        self.shaders[stage.index()]
    }

    /// Binds a stage object.
    pub fn set_shader(&mut self, stage: ShaderStage, shader: Option<ShaderStageId>) -> &mut Self {
        self.shaders[stage.index()] = shader;
        self
    }

    /// Binds a texture to a slot of a stage.
    pub fn set_texture(
        &mut self,
        stage: ShaderStage,
        slot: usize,
        texture: Option<TextureId>,
    ) -> &mut Self {
        self.textures[stage.index()][slot] = texture;
        self
    }

    /// Binds a constant buffer to a slot of a stage.
    pub fn set_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: usize,
        buffer: Option<BufferId>,
    ) -> &mut Self {
        self.constant_buffers[stage.index()][slot] = buffer;
        self
    }

    /// Returns `true` if any slot of this state references `buffer`.
    pub fn references_buffer(&self, buffer: BufferId) -> bool {
        self.vertex_buffers.contains(&Some(buffer))
            || self.index_buffer == Some(buffer)
            || self
                .constant_buffers
                .iter()
                .any(|stage| stage.contains(&Some(buffer)))
    }
}
