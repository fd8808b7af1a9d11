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

//! The per-render-context owner of the backend and every piece of binding state.

use crate::renderer::{
    api::*,
    binder::{program_inputs, Binder},
    error::ResourceError,
    resource::{GpuBuffer, InputLayoutEntry, ResourceRegistry, TextureEntry, WriteOutcome},
    shader::{CachedProgram, ProgramCache, ShaderStageObject},
    state::StateMachine,
    traits::GraphicsBackend,
};

pub use crate::renderer::binder::DrawOutcome;

/// Owns a backend together with the resources, tracked state, program cache
/// and frame counter that drive it.
///
/// A context is meant for one render thread. Contexts never share tracked
/// state; give each thread its own.
#[derive(Debug)]
pub struct RenderContext<B: GraphicsBackend> {
    backend: B,
    settings: RendererSettings,
    resources: ResourceRegistry,
    state: StateMachine,
    programs: ProgramCache,
    frame_index: u64,
    stats: RenderStats,
}

impl<B: GraphicsBackend> RenderContext<B> {
    /// Creates a context around `backend`.
    pub fn new(backend: B, settings: RendererSettings) -> Self {
        log::info!(
            "Creating render context on {:?} backend (rotation depth {}, double buffering {})",
            backend.backend_type(),
            settings.effective_rotation_depth(),
            settings.double_buffering
        );
        Self {
            backend,
            settings,
            resources: ResourceRegistry::default(),
            state: StateMachine::new(),
            programs: ProgramCache::new(),
            frame_index: 0,
            stats: RenderStats::default(),
        }
    }

    /// The backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Mutable access to the backend. Call [`Self::invalidate_state`] after
    /// changing bindings behind the context's back.
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// The active settings.
    pub fn settings(&self) -> &RendererSettings {
        &self.settings
    }

    // --- Buffers ---

    /// Creates a logical buffer. Dynamic buffers get one backing buffer per
    /// rotation slot; a zero size with no data defers allocation to the
    /// first write.
    pub fn create_buffer(
        &mut self,
        descriptor: &BufferDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<BufferId, ResourceError> {
        let buffer = GpuBuffer::new(
            &mut self.backend,
            descriptor,
            self.settings.effective_rotation_depth(),
            self.settings.double_buffering,
            initial_data,
        )?;
        Ok(BufferId(self.resources.buffers.insert(buffer)))
    }

    /// Releases a buffer and all of its backing storage.
    pub fn destroy_buffer(&mut self, id: BufferId) -> Result<(), ResourceError> {
        let mut buffer = self
            .resources
            .buffers
            .remove(id.0)
            .ok_or(ResourceError::NotFound)?;
        buffer.release(&mut self.backend);
        self.state.invalidate_buffer(id);
        Ok(())
    }

    /// Writes `data` to a buffer at the current frame index.
    ///
    /// If the write moved the buffer to another backend object, every tracked
    /// slot holding the buffer is rebound on the next draw.
    pub fn write_buffer(&mut self, id: BufferId, data: &[u8]) -> Result<WriteOutcome, ResourceError> {
        let buffer = self
            .resources
            .buffers
            .get_mut(id.0)
            .ok_or(ResourceError::NotFound)?;
        let outcome = buffer.write(&mut self.backend, data, self.frame_index)?;
        match outcome {
            WriteOutcome::Rotated => self.stats.buffer_rotations += 1,
            WriteOutcome::Reallocated => self.stats.buffer_reallocations += 1,
            WriteOutcome::InPlace | WriteOutcome::Empty => {}
        }
        if outcome.replaced_backing() {
            self.state.invalidate_buffer(id);
        }
        Ok(outcome)
    }

    /// Writes a slice of plain-old-data values to a buffer.
    pub fn write_buffer_pod<T: bytemuck::Pod>(
        &mut self,
        id: BufferId,
        data: &[T],
    ) -> Result<WriteOutcome, ResourceError> {
        self.write_buffer(id, bytemuck::cast_slice(data))
    }

    /// Looks up a buffer.
    pub fn buffer(&self, id: BufferId) -> Option<&GpuBuffer> {
        self.resources.buffers.get(id.0)
    }

    // --- Shaders ---

    /// Loads and compiles a shader stage object.
    pub fn create_shader(
        &mut self,
        descriptor: &ShaderStageDescriptor,
    ) -> Result<ShaderStageId, ResourceError> {
        let shader = ShaderStageObject::compile(&mut self.backend, descriptor)?;
        Ok(ShaderStageId(self.resources.shaders.insert(shader)))
    }

    /// Recompiles a stage object from `source`, or from its own source when
    /// `None`.
    ///
    /// On success every cached program linked from the stage is evicted. On
    /// failure the previous compile stays active.
    pub fn recompile_shader(
        &mut self,
        id: ShaderStageId,
        source: Option<ShaderSource>,
    ) -> Result<(), ResourceError> {
        let shader = self
            .resources
            .shaders
            .get_mut(id.0)
            .ok_or(ResourceError::NotFound)?;
        shader.recompile(&mut self.backend, source)?;
        let evicted = self.programs.invalidate_stage(&mut self.backend, id);
        log::debug!("Evicted {evicted} programs using {:?}", id);
        self.state.invalidate_shader(id);
        Ok(())
    }

    /// Destroys a stage object and every program linked from it.
    pub fn destroy_shader(&mut self, id: ShaderStageId) -> Result<(), ResourceError> {
        let shader = self
            .resources
            .shaders
            .remove(id.0)
            .ok_or(ResourceError::NotFound)?;
        self.programs.invalidate_stage(&mut self.backend, id);
        shader.destroy(&mut self.backend);
        self.state.invalidate_shader(id);
        Ok(())
    }

    /// Looks up a stage object.
    pub fn shader(&self, id: ShaderStageId) -> Option<&ShaderStageObject> {
        self.resources.shaders.get(id.0)
    }

    /// Returns the program linked from the given stage slots, linking it on
    /// first use. Returns `Ok(None)` if no slot is occupied.
    ///
    /// A program that failed to link is still returned, flagged by
    /// [`CachedProgram::linked`].
    pub fn resolve_program(
        &mut self,
        stages: &[Option<ShaderStageId>; SHADER_STAGE_COUNT],
    ) -> Result<Option<CachedProgram>, ResourceError> {
        let Some((key, raw)) = program_inputs(&self.resources.shaders, stages)? else {
            return Ok(None);
        };
        self.programs.resolve(&mut self.backend, key, &raw).map(Some)
    }

    /// The program cache.
    pub fn programs(&self) -> &ProgramCache {
        &self.programs
    }

    // --- Textures and fixed-function state ---

    /// Creates a texture object.
    pub fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<TextureId, ResourceError> {
        let raw = self.backend.create_texture(descriptor)?;
        let entry = TextureEntry {
            raw,
            mip_levels: descriptor.mip_levels,
            label: descriptor.label.as_deref().unwrap_or("unnamed texture").to_string(),
        };
        Ok(TextureId(self.resources.textures.insert(entry)))
    }

    /// Destroys a texture object.
    pub fn destroy_texture(&mut self, id: TextureId) -> Result<(), ResourceError> {
        let entry = self
            .resources
            .textures
            .remove(id.0)
            .ok_or(ResourceError::NotFound)?;
        self.state.invalidate_texture(id);
        self.backend.destroy_texture(entry.raw)
    }

    /// Registers an input layout. Element placement is computed when a
    /// vertex layout object is first built from it.
    pub fn create_input_layout(&mut self, elements: &[InputElementDescriptor]) -> InputLayoutId {
        let entry = InputLayoutEntry {
            elements: elements.to_vec(),
        };
        InputLayoutId(self.resources.input_layouts.insert(entry))
    }

    /// Registers a rasterizer state object.
    pub fn create_rasterizer_state(&mut self, descriptor: RasterizerStateDescriptor) -> RasterizerStateId {
        RasterizerStateId(self.resources.rasterizer_states.insert(descriptor))
    }

    /// Registers a blend state object.
    pub fn create_blend_state(&mut self, descriptor: BlendStateDescriptor) -> BlendStateId {
        BlendStateId(self.resources.blend_states.insert(descriptor))
    }

    /// Registers a depth-stencil state object.
    pub fn create_depth_stencil_state(
        &mut self,
        descriptor: DepthStencilStateDescriptor,
    ) -> DepthStencilStateId {
        DepthStencilStateId(self.resources.depth_stencil_states.insert(descriptor))
    }

    /// Registers a sampler state object.
    pub fn create_sampler_state(&mut self, descriptor: SamplerDescriptor) -> SamplerStateId {
        SamplerStateId(self.resources.sampler_states.insert(descriptor))
    }

    // --- Drawing ---

    /// Diffs `state` against the tracked state, applies the changed slots
    /// and issues the draw.
    pub fn bind_and_draw(&mut self, state: &PipelineState) -> DrawOutcome {
        let changes = self.state.compute_changes(state);
        Binder {
            backend: &mut self.backend,
            resources: &mut self.resources,
            programs: &mut self.programs,
            settings: &self.settings,
            stats: &mut self.stats,
        }
        .apply(&changes, state)
    }

    /// Advances the frame counter. Call once per presented frame.
    pub fn end_frame(&mut self) {
        self.frame_index += 1;
        log::trace!("Frame {} begins", self.frame_index);
    }

    /// The current frame index.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Toggles draw issuance. Bindings are applied either way.
    pub fn set_draw_calls_enabled(&mut self, enabled: bool) {
        self.settings.draw_calls_enabled = enabled;
    }

    /// Forgets every tracked binding so the next draw re-applies all slots.
    pub fn invalidate_state(&mut self) {
        self.state.invalidate_all();
    }

    /// Counters since creation or the last [`Self::reset_stats`].
    pub fn stats(&self) -> RenderStats {
        RenderStats {
            frame_number: self.frame_index,
            program_cache_hits: self.programs.hits(),
            program_cache_misses: self.programs.misses(),
            ..self.stats.clone()
        }
    }

    /// Zeroes the binding counters. Program cache counters are cumulative.
    pub fn reset_stats(&mut self) {
        self.stats = RenderStats::default();
    }

    /// Destroys every resource and cached program the context owns.
    pub fn release_all(&mut self) {
        self.programs.clear(&mut self.backend);
        for (_, mut buffer) in self.resources.buffers.drain() {
            buffer.release(&mut self.backend);
        }
        for (_, shader) in self.resources.shaders.drain() {
            shader.destroy(&mut self.backend);
        }
        for (_, texture) in self.resources.textures.drain() {
            if let Err(e) = self.backend.destroy_texture(texture.raw) {
                log::warn!("Failed to destroy texture '{}': {}", texture.label, e);
            }
        }
        self.state.invalidate_all();
    }
}
