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

//! Tracks the pipeline state currently applied to the backend and computes
//! the minimal set of slots a new request changes.

use crate::renderer::api::{
    BufferId, PipelineState, ShaderStage, ShaderStageId, TextureId, MAX_VERTEX_BUFFERS,
    SHADER_STAGE_COUNT,
};

/// One flag per trackable binding slot, set when the slot must be re-applied.
///
/// Texture slots are tracked per stage so the pixel stage's group can be
/// queried on its own through [`ChangeSet::main_texture`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChangeSet {
    /// Per vertex stream slot.
    pub vertex_buffers: [bool; MAX_VERTEX_BUFFERS],
    /// The index buffer slot.
    pub index_buffer: bool,
    /// The input layout slot.
    pub input_layout: bool,
    /// Per pipeline stage.
    pub shaders: [bool; SHADER_STAGE_COUNT],
    /// Per stage texture group; set if any texture slot of the stage changed.
    pub textures: [bool; SHADER_STAGE_COUNT],
    /// Per stage constant buffer group.
    pub constant_buffers: [bool; SHADER_STAGE_COUNT],
    /// The rasterizer state slot.
    pub rasterizer_state: bool,
    /// The blend state slot.
    pub blend_state: bool,
    /// The depth-stencil state slot.
    pub depth_stencil_state: bool,
    /// The sampler state slot.
    pub sampler_state: bool,
    /// The viewport.
    pub viewport: bool,
}

impl ChangeSet {
    /// A change set with every flag raised.
    pub fn all() -> Self {
        Self {
            vertex_buffers: [true; MAX_VERTEX_BUFFERS],
            index_buffer: true,
            input_layout: true,
            shaders: [true; SHADER_STAGE_COUNT],
            textures: [true; SHADER_STAGE_COUNT],
            constant_buffers: [true; SHADER_STAGE_COUNT],
            rasterizer_state: true,
            blend_state: true,
            depth_stencil_state: true,
            sampler_state: true,
            viewport: true,
        }
    }

    /// Returns `true` if no flag is raised.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// The pixel stage's texture group, the one the binder applies.
    pub fn main_texture(&self) -> bool {
        self.textures[ShaderStage::Pixel.index()]
    }

    /// Returns `true` if any vertex stream or the input layout changed.
    pub fn vertex_input(&self) -> bool {
        self.input_layout || self.vertex_buffers.iter().any(|&b| b)
    }

    /// Returns `true` if any stage object changed.
    pub fn any_shader(&self) -> bool {
        self.shaders.iter().any(|&b| b)
    }

    fn merge(&mut self, other: &ChangeSet) {
        for (a, b) in self.vertex_buffers.iter_mut().zip(other.vertex_buffers) {
            *a |= b;
        }
        self.index_buffer |= other.index_buffer;
        self.input_layout |= other.input_layout;
        for stage in 0..SHADER_STAGE_COUNT {
            self.shaders[stage] |= other.shaders[stage];
            self.textures[stage] |= other.textures[stage];
            self.constant_buffers[stage] |= other.constant_buffers[stage];
        }
        self.rasterizer_state |= other.rasterizer_state;
        self.blend_state |= other.blend_state;
        self.depth_stencil_state |= other.depth_stencil_state;
        self.sampler_state |= other.sampler_state;
        self.viewport |= other.viewport;
    }
}

/// The diff machine.
///
/// Holds the last applied state plus a set of slots whose applied binding is
/// no longer trusted. A fresh machine trusts nothing, so the first request
/// reports every slot. After each [`compute_changes`](Self::compute_changes)
/// the tracked state equals the request, making a repeated request report an
/// empty set.
#[derive(Debug, Clone)]
pub struct StateMachine {
    current: PipelineState,
    stale: ChangeSet,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    /// Creates a machine with no trusted bindings.
    pub fn new() -> Self {
        Self {
            current: PipelineState::default(),
            stale: ChangeSet::all(),
        }
    }

    /// The state most recently recorded as applied.
    pub fn current(&self) -> &PipelineState {
        &self.current
    }

    /// Compares `requested` against the tracked state, returns the differing
    /// slots and records `requested` as the new tracked state.
    ///
    /// Draw parameters are never compared.
    pub fn compute_changes(&mut self, requested: &PipelineState) -> ChangeSet {
        let cur = &self.current;
        let mut changes = ChangeSet::default();

        for slot in 0..MAX_VERTEX_BUFFERS {
            changes.vertex_buffers[slot] = cur.vertex_buffers[slot] != requested.vertex_buffers[slot];
        }
        changes.index_buffer = cur.index_buffer != requested.index_buffer;
        changes.input_layout = cur.input_layout != requested.input_layout;
        for stage in 0..SHADER_STAGE_COUNT {
            changes.shaders[stage] = cur.shaders[stage] != requested.shaders[stage];
            changes.textures[stage] = cur.textures[stage] != requested.textures[stage];
            changes.constant_buffers[stage] =
                cur.constant_buffers[stage] != requested.constant_buffers[stage];
        }
        changes.rasterizer_state = cur.rasterizer_state != requested.rasterizer_state;
        changes.blend_state = cur.blend_state != requested.blend_state;
        changes.depth_stencil_state = cur.depth_stencil_state != requested.depth_stencil_state;
        changes.sampler_state = cur.sampler_state != requested.sampler_state;
        changes.viewport = cur.viewport != requested.viewport;

        changes.merge(&self.stale);
        self.stale = ChangeSet::default();
        self.current = requested.clone();
        changes
    }

    /// Forces every slot currently holding `buffer` to be re-applied on the
    /// next request that still references it.
    ///
    /// Called when a buffer's backing object changes under a stable handle.
    pub fn invalidate_buffer(&mut self, buffer: BufferId) {
        let target = Some(buffer);
        for slot in 0..MAX_VERTEX_BUFFERS {
            if self.current.vertex_buffers[slot] == target {
                self.stale.vertex_buffers[slot] = true;
            }
        }
        if self.current.index_buffer == target {
            self.stale.index_buffer = true;
        }
        for stage in 0..SHADER_STAGE_COUNT {
            if self.current.constant_buffers[stage].contains(&target) {
                self.stale.constant_buffers[stage] = true;
            }
        }
    }

    /// Forces every stage group holding `texture` to be re-applied.
    pub fn invalidate_texture(&mut self, texture: TextureId) {
        let target = Some(texture);
        for stage in 0..SHADER_STAGE_COUNT {
            if self.current.textures[stage].contains(&target) {
                self.stale.textures[stage] = true;
            }
        }
    }

    /// Forces the stage slot holding `shader` to be re-applied, e.g. after a
    /// recompile replaced the backend object.
    pub fn invalidate_shader(&mut self, shader: ShaderStageId) {
        for stage in 0..SHADER_STAGE_COUNT {
            if self.current.shaders[stage] == Some(shader) {
                self.stale.shaders[stage] = true;
            }
        }
    }

    /// Forgets every tracked binding.
    pub fn invalidate_all(&mut self) {
        self.stale = ChangeSet::all();
    }
}
