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

use crate::renderer::api::*;
use crate::renderer::error::ResourceError;
use std::fmt::Debug;

/// The set of driver operations the binding engine needs from a backend.
///
/// The state machine, binder, program cache and dynamic buffers depend only
/// on this trait. One implementation exists per native API. All calls happen
/// on the render thread that owns the context; a backend checks for driver
/// errors right after each call and reports them as
/// [`ResourceError::BackendError`].
pub trait GraphicsBackend: Debug {
    /// Identifies the native API behind this backend.
    fn backend_type(&self) -> GraphicsBackendType;

    /// Queries the device's maximum anisotropic filtering level, `1.0` if unsupported.
    fn max_anisotropy(&self) -> f32;

    // --- Buffers ---

    /// Allocates one backend buffer object, optionally initialized with `data`.
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the driver could not create the object.
    fn create_buffer(
        &mut self,
        descriptor: &RawBufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<RawBufferId, ResourceError>;

    /// Releases a backend buffer object.
    fn destroy_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError>;

    /// Writes `data` to the start of the buffer by mapping it for writing,
    /// invalidating its previous contents.
    /// ## Errors
    /// * `ResourceError::MapFailed` - If no CPU-visible pointer could be obtained.
    fn write_buffer_mapped(
        &mut self,
        id: RawBufferId,
        kind: BufferKind,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Binds a buffer as the 32-bit index buffer.
    fn bind_index_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError>;

    /// Binds a buffer to a constant buffer slot of a stage.
    fn bind_constant_buffer(
        &mut self,
        stage: ShaderStage,
        slot: u32,
        id: RawBufferId,
    ) -> Result<(), ResourceError>;

    // --- Vertex layouts ---

    /// Records the attribute bindings into a new layout binding object.
    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> Result<VertexLayoutId, ResourceError>;

    /// Releases a layout binding object.
    fn destroy_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError>;

    /// Makes a layout binding object current.
    fn bind_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError>;

    // --- Shaders ---

    /// Compiles source text into a stage object.
    /// ## Errors
    /// * `ResourceError::Shader(ShaderError::CompilationError)` - With the compiler log.
    ///   The failed object is released by the backend.
    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<RawShaderId, ResourceError>;

    /// Releases a stage object.
    fn destroy_shader(&mut self, id: RawShaderId) -> Result<(), ResourceError>;

    /// Creates a program, attaches every stage object and links it.
    ///
    /// A failed link still yields a program handle; see [`LinkedProgram::linked`].
    /// ## Errors
    /// * `ResourceError::AllocationFailed` - If the program object could not be created.
    fn link_program(&mut self, shaders: &[RawShaderId]) -> Result<LinkedProgram, ResourceError>;

    /// Releases a program object.
    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError>;

    /// Makes a program current.
    fn use_program(&mut self, id: ProgramId) -> Result<(), ResourceError>;

    /// Binds the uniform block called `name` to `binding`.
    ///
    /// Returns `Ok(false)` if the program has no block with that name.
    fn bind_uniform_block(
        &mut self,
        program: ProgramId,
        name: &str,
        binding: u32,
    ) -> Result<bool, ResourceError>;

    /// Points the sampler uniform called `name` at texture unit `unit`.
    ///
    /// Returns `Ok(false)` if the program has no uniform with that name.
    fn bind_sampler_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<bool, ResourceError>;

    // --- Textures ---

    /// Allocates a texture object with storage for its mip chain.
    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<RawTextureId, ResourceError>;

    /// Releases a texture object.
    fn destroy_texture(&mut self, id: RawTextureId) -> Result<(), ResourceError>;

    /// Binds a texture to a texture unit and limits sampling to its `mip_levels`.
    fn bind_texture(
        &mut self,
        unit: u32,
        id: RawTextureId,
        mip_levels: u32,
    ) -> Result<(), ResourceError>;

    /// Applies sampling parameters to the texture bound on the active unit.
    fn apply_sampler(&mut self, sampler: &SamplerDescriptor) -> Result<(), ResourceError>;

    // --- Fixed-function state ---

    /// Applies culling and winding state.
    fn set_rasterizer_state(
        &mut self,
        state: &RasterizerStateDescriptor,
    ) -> Result<(), ResourceError>;

    /// Applies blending state.
    fn set_blend_state(&mut self, state: &BlendStateDescriptor) -> Result<(), ResourceError>;

    /// Applies depth test state.
    fn set_depth_stencil_state(
        &mut self,
        state: &DepthStencilStateDescriptor,
    ) -> Result<(), ResourceError>;

    /// Sets the viewport transform.
    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), ResourceError>;

    // --- Drawing ---

    /// Issues a draw with the currently bound state.
    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError>;
}
