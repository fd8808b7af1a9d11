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

//! Realizes a change set through backend calls and issues the draw.

use crate::renderer::{
    api::{
        compute_layout, BufferId, PipelineState, ProgramId, RawBufferId, RawShaderId,
        RendererSettings, RenderStats, ShaderStage, ShaderStageId, VertexStream,
        MAX_VERTEX_BUFFERS, SHADER_STAGE_COUNT,
    },
    error::ResourceError,
    resource::{CachedLayout, ResourceRegistry, ResourceTable},
    shader::{ProgramCache, ProgramKey, ShaderStageObject, StageIdentity},
    state::ChangeSet,
    traits::GraphicsBackend,
};

/// What [`RenderContext::bind_and_draw`](crate::renderer::RenderContext::bind_and_draw) did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// The draw call reached the backend.
    Issued,
    /// Bindings were applied but draw calls are disabled.
    Suppressed,
    /// No program could be resolved; nothing was drawn.
    Skipped,
    /// The backend rejected the draw call.
    Failed,
}

impl DrawOutcome {
    /// Returns `true` for an issued or deliberately suppressed draw.
    pub fn is_success(&self) -> bool {
        matches!(self, DrawOutcome::Issued | DrawOutcome::Suppressed)
    }
}

/// Builds the program key and the backend objects of the occupied stage slots.
///
/// Returns `Ok(None)` when no slot is occupied.
pub(crate) fn program_inputs(
    shaders: &ResourceTable<ShaderStageObject>,
    stages: &[Option<ShaderStageId>; SHADER_STAGE_COUNT],
) -> Result<Option<(ProgramKey, Vec<RawShaderId>)>, ResourceError> {
    let mut identities = [None; SHADER_STAGE_COUNT];
    let mut raw = Vec::with_capacity(SHADER_STAGE_COUNT);
    for (slot, id) in stages.iter().enumerate() {
        let Some(id) = *id else { continue };
        let shader = shaders.get(id.0).ok_or(ResourceError::NotFound)?;
        identities[slot] = Some(StageIdentity {
            id,
            generation: shader.generation(),
        });
        raw.push(shader.raw());
    }
    if raw.is_empty() {
        return Ok(None);
    }
    Ok(Some((ProgramKey::new(identities), raw)))
}

/// One binding pass over borrowed render-context state.
pub(crate) struct Binder<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub resources: &'a mut ResourceRegistry,
    pub programs: &'a mut ProgramCache,
    pub settings: &'a RendererSettings,
    pub stats: &'a mut RenderStats,
}

impl Binder<'_> {
    /// Applies every changed slot of `state`, then draws.
    ///
    /// Backend failures are logged and counted; the pass continues. Only a
    /// missing program turns the draw into a no-op.
    pub fn apply(mut self, changes: &ChangeSet, state: &PipelineState) -> DrawOutcome {
        self.bind_fixed_function(changes, state);
        if changes.sampler_state {
            self.bind_sampler_state(state);
        }
        if changes.vertex_input() {
            self.bind_vertex_input(state);
        }
        if changes.index_buffer {
            self.bind_index_buffer(state);
        }
        let program = self.bind_program(state);
        if changes.main_texture() {
            self.bind_textures(state);
        }
        self.bind_constant_buffers(changes, state);

        if program.is_none() {
            self.stats.draws_skipped += 1;
            return DrawOutcome::Skipped;
        }
        if !self.settings.draw_calls_enabled {
            self.stats.draws_suppressed += 1;
            return DrawOutcome::Suppressed;
        }
        match self.backend.draw(&state.draw) {
            Ok(()) => {
                self.stats.draw_calls += 1;
                DrawOutcome::Issued
            }
            Err(e) => {
                self.report("draw", e);
                DrawOutcome::Failed
            }
        }
    }

    fn report(&mut self, operation: &str, error: ResourceError) {
        log::warn!("{operation} failed: {error}");
        self.stats.backend_errors += 1;
    }

    fn check(&mut self, operation: &str, result: Result<(), ResourceError>) {
        if let Err(e) = result {
            self.report(operation, e);
        }
    }

    fn bind_fixed_function(&mut self, changes: &ChangeSet, state: &PipelineState) {
        if changes.rasterizer_state {
            if let Some(desc) = state
                .rasterizer_state
                .and_then(|id| self.resources.rasterizer_states.get(id.0))
                .copied()
            {
                let result = self.backend.set_rasterizer_state(&desc);
                self.check("set_rasterizer_state", result);
            }
        }
        if changes.blend_state {
            if let Some(desc) = state
                .blend_state
                .and_then(|id| self.resources.blend_states.get(id.0))
                .copied()
            {
                let result = self.backend.set_blend_state(&desc);
                self.check("set_blend_state", result);
            }
        }
        if changes.depth_stencil_state {
            if let Some(desc) = state
                .depth_stencil_state
                .and_then(|id| self.resources.depth_stencil_states.get(id.0))
                .copied()
            {
                let result = self.backend.set_depth_stencil_state(&desc);
                self.check("set_depth_stencil_state", result);
            }
        }
        if changes.viewport {
            if let Some(viewport) = state.viewport {
                let result = self.backend.set_viewport(&viewport);
                self.check("set_viewport", result);
            }
        }
    }

    fn bind_sampler_state(&mut self, state: &PipelineState) {
        if let Some(desc) = state
            .sampler_state
            .and_then(|id| self.resources.sampler_states.get(id.0))
            .copied()
        {
            let result = self.backend.apply_sampler(&desc);
            self.check("apply_sampler", result);
        }
    }

    fn current_raw(&self, id: BufferId) -> Option<RawBufferId> {
        self.resources.buffers.get(id.0)?.current()
    }

    fn bind_vertex_input(&mut self, state: &PipelineState) {
        let Some(primary) = state.vertex_buffers[0] else {
            return;
        };
        let Some(layout_id) = state.input_layout else {
            log::debug!("Vertex buffer {:?} bound without an input layout", primary);
            return;
        };

        let mut streams: [Option<VertexStream>; MAX_VERTEX_BUFFERS] = [None; MAX_VERTEX_BUFFERS];
        for (slot, id) in state.vertex_buffers.iter().enumerate() {
            streams[slot] = id
                .and_then(|id| self.resources.buffers.get(id.0))
                .and_then(|buffer| {
                    buffer.current().map(|raw| VertexStream {
                        buffer: raw,
                        stride: buffer.stride(),
                    })
                });
        }
        if streams[0].is_none() {
            log::debug!("Vertex buffer {:?} has no storage yet", primary);
            return;
        }
        let raw_streams = streams.map(|s| s.map(|s| s.buffer));

        let cached = self
            .resources
            .buffers
            .get(primary.0)
            .and_then(|buffer| buffer.cached_layout())
            .filter(|layout| layout.matches(layout_id, &raw_streams))
            .map(|layout| layout.id);
        if let Some(id) = cached {
            let result = self.backend.bind_vertex_layout(id);
            self.check("bind_vertex_layout", result);
            return;
        }

        let Some(entry) = self.resources.input_layouts.get(layout_id.0) else {
            log::warn!("Unknown input layout {:?}", layout_id);
            return;
        };
        let attributes = match compute_layout(&entry.elements).and_then(|l| l.resolve(&streams)) {
            Ok(attributes) => attributes,
            Err(e) => {
                log::error!("Vertex layout build aborted for {:?}: {}", primary, e);
                return;
            }
        };
        let id = match self.backend.create_vertex_layout(&attributes) {
            Ok(id) => id,
            Err(e) => {
                self.report("create_vertex_layout", e);
                return;
            }
        };

        let replaced = self.resources.buffers.get_mut(primary.0).and_then(|buffer| {
            buffer.set_cached_layout(CachedLayout {
                id,
                input_layout: layout_id,
                streams: raw_streams,
            })
        });
        if let Some(old) = replaced {
            let result = self.backend.destroy_vertex_layout(old.id);
            self.check("destroy_vertex_layout", result);
        }
        let result = self.backend.bind_vertex_layout(id);
        self.check("bind_vertex_layout", result);
    }

    fn bind_index_buffer(&mut self, state: &PipelineState) {
        let Some(raw) = state.index_buffer.and_then(|id| self.current_raw(id)) else {
            return;
        };
        let result = self.backend.bind_index_buffer(raw);
        self.check("bind_index_buffer", result);
    }

    fn bind_program(&mut self, state: &PipelineState) -> Option<ProgramId> {
        let (key, raw) = match program_inputs(&self.resources.shaders, &state.shaders) {
            Ok(Some(inputs)) => inputs,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Cannot resolve program: {e}");
                return None;
            }
        };
        let program = match self.programs.resolve(&mut *self.backend, key, &raw) {
            Ok(cached) => cached.program,
            Err(e) => {
                self.report("link_program", e);
                return None;
            }
        };
        let result = self.backend.use_program(program);
        self.check("use_program", result);
        Some(program)
    }

    fn bind_textures(&mut self, state: &PipelineState) {
        let sampling = self.settings.texture_sampling;
        for (unit, texture) in state.textures[ShaderStage::Pixel.index()].iter().enumerate() {
            let Some(texture) = texture else { continue };
            let Some(entry) = self.resources.textures.get(texture.0) else {
                log::warn!("Unknown texture {:?} in unit {}", texture, unit);
                continue;
            };
            let (raw, mip_levels) = (entry.raw, entry.mip_levels);
            let result = self.backend.bind_texture(unit as u32, raw, mip_levels);
            self.check("bind_texture", result);
            let result = self.backend.apply_sampler(&sampling);
            self.check("apply_sampler", result);
        }
    }

    fn bind_constant_buffers(&mut self, changes: &ChangeSet, state: &PipelineState) {
        for stage in ShaderStage::ALL {
            let index = stage.index();
            if !changes.constant_buffers[index] || state.shaders[index].is_none() {
                continue;
            }
            for (slot, buffer) in state.constant_buffers[index].iter().enumerate() {
                let Some(raw) = buffer.and_then(|id| self.current_raw(id)) else {
                    continue;
                };
                let result = self.backend.bind_constant_buffer(stage, slot as u32, raw);
                self.check("bind_constant_buffer", result);
            }
        }
    }
}
