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

use super::conversions::{self, IntoGl};
use anyhow::{bail, Context as _};
use glow::HasContext;
use std::collections::HashMap;
use std::fmt;
use tessera_core::renderer::api::{
    BlendStateDescriptor, BufferKind, DepthStencilStateDescriptor, DrawCall, DrawKind,
    GraphicsBackendType, LinkedProgram, ProgramId, RasterizerStateDescriptor,
    RawBufferDescriptor, RawBufferId, RawShaderId, RawTextureId, SamplerDescriptor, ShaderStage,
    TextureDescriptor, VertexAttribute, VertexLayoutId, VertexStepMode, Viewport,
};
use tessera_core::renderer::{GraphicsBackend, ResourceError, ShaderError};

// EXT_texture_filter_anisotropic / GL 4.6 core.
const TEXTURE_MAX_ANISOTROPY: u32 = 0x84FE;
const MAX_TEXTURE_MAX_ANISOTROPY: u32 = 0x84FF;

const EXPLICIT_UNIFORM_LOCATION: &str = "GL_ARB_explicit_uniform_location";

#[derive(Debug)]
struct GlBufferEntry {
    buffer: glow::Buffer,
    size: u64,
}

/// A [`GraphicsBackend`] driving a current OpenGL 4.x context.
///
/// Backend handles map to GL object names through per-kind tables. Every
/// state-mutating call is followed by a drain of the GL error queue; pending
/// errors are turned into [`ResourceError::BackendError`].
pub struct GlBackend {
    gl: glow::Context,
    max_anisotropy: f32,
    next_id: u64,
    buffers: HashMap<RawBufferId, GlBufferEntry>,
    shaders: HashMap<RawShaderId, glow::Shader>,
    programs: HashMap<ProgramId, glow::Program>,
    vertex_arrays: HashMap<VertexLayoutId, glow::VertexArray>,
    textures: HashMap<RawTextureId, glow::Texture>,
    current_program: Option<glow::Program>,
    index_buffer: Option<glow::Buffer>,
}

impl fmt::Debug for GlBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlBackend")
            .field("max_anisotropy", &self.max_anisotropy)
            .field("buffers", &self.buffers.len())
            .field("shaders", &self.shaders.len())
            .field("programs", &self.programs.len())
            .field("vertex_arrays", &self.vertex_arrays.len())
            .field("textures", &self.textures.len())
            .finish()
    }
}

impl GlBackend {
    /// Wraps a context that is current on the calling thread.
    ///
    /// Logs the driver's renderer and version strings and checks the
    /// extensions the shader conventions rely on.
    ///
    /// # Errors
    ///
    /// Fails if the context reports a GL version below 3.3.
    pub fn new(gl: glow::Context) -> anyhow::Result<Self> {
        let version = gl.version();
        let (renderer, version_string) = unsafe {
            (
                gl.get_parameter_string(glow::RENDERER),
                gl.get_parameter_string(glow::VERSION),
            )
        };
        log::info!("OpenGL renderer: {renderer}");
        log::info!("OpenGL version: {version_string}");

        if version.is_embedded || (version.major, version.minor) < (3, 3) {
            bail!(
                "OpenGL 3.3 core or newer is required, context reports {}.{}{}",
                version.major,
                version.minor,
                if version.is_embedded { " ES" } else { "" }
            );
        }
        if !gl.supported_extensions().contains(EXPLICIT_UNIFORM_LOCATION) {
            log::error!("{EXPLICIT_UNIFORM_LOCATION} is not supported by this driver");
        }

        let max_anisotropy = if gl
            .supported_extensions()
            .contains("GL_EXT_texture_filter_anisotropic")
            || (version.major, version.minor) >= (4, 6)
        {
            unsafe { gl.get_parameter_f32(MAX_TEXTURE_MAX_ANISOTROPY) }
        } else {
            1.0
        };
        conversions::drain_errors(&gl);
        log::info!("Max anisotropy: {max_anisotropy}");

        Ok(Self {
            gl,
            max_anisotropy,
            next_id: 0,
            buffers: HashMap::new(),
            shaders: HashMap::new(),
            programs: HashMap::new(),
            vertex_arrays: HashMap::new(),
            textures: HashMap::new(),
            current_program: None,
            index_buffer: None,
        })
    }

    /// Loads GL entry points through `loader` and wraps the resulting context.
    ///
    /// # Safety
    ///
    /// A GL context must be current on the calling thread, and `loader` must
    /// return valid function pointers for it.
    pub unsafe fn from_loader_function<F>(loader: F) -> anyhow::Result<Self>
    where
        F: FnMut(&str) -> *const std::os::raw::c_void,
    {
        let gl = unsafe { glow::Context::from_loader_function(loader) };
        Self::new(gl).context("Failed to initialize the OpenGL backend")
    }

    /// The wrapped context, for calls the backend does not cover (clears,
    /// presentation).
    pub fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Drains the error queue after `operation`.
    fn check(&self, operation: &str) -> Result<(), ResourceError> {
        let codes = conversions::drain_errors(&self.gl);
        if codes.is_empty() {
            return Ok(());
        }
        let names: Vec<_> = codes
            .iter()
            .map(|&c| format!("{} (0x{c:04X})", conversions::error_name(c)))
            .collect();
        Err(ResourceError::BackendError(format!(
            "{operation}: {}",
            names.join(", ")
        )))
    }

    fn buffer(&self, id: RawBufferId) -> Result<&GlBufferEntry, ResourceError> {
        self.buffers.get(&id).ok_or(ResourceError::NotFound)
    }

    fn program(&self, id: ProgramId) -> Result<glow::Program, ResourceError> {
        self.programs.get(&id).copied().ok_or(ResourceError::NotFound)
    }
}

impl GraphicsBackend for GlBackend {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::OpenGl
    }

    fn max_anisotropy(&self) -> f32 {
        self.max_anisotropy
    }

    fn create_buffer(
        &mut self,
        descriptor: &RawBufferDescriptor,
        data: Option<&[u8]>,
    ) -> Result<RawBufferId, ResourceError> {
        let size = i32::try_from(descriptor.size).map_err(|_| {
            ResourceError::AllocationFailed(format!("{} bytes exceeds GL limits", descriptor.size))
        })?;
        let usage = descriptor.usage.into_gl();
        let buffer = unsafe {
            let buffer = self
                .gl
                .create_buffer()
                .map_err(ResourceError::AllocationFailed)?;
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));
            match data {
                Some(data) if data.len() as u64 == descriptor.size => {
                    self.gl
                        .buffer_data_u8_slice(glow::COPY_WRITE_BUFFER, data, usage);
                }
                Some(data) => {
                    self.gl.buffer_data_size(glow::COPY_WRITE_BUFFER, size, usage);
                    let len = data.len().min(descriptor.size as usize);
                    self.gl
                        .buffer_sub_data_u8_slice(glow::COPY_WRITE_BUFFER, 0, &data[..len]);
                }
                None => self.gl.buffer_data_size(glow::COPY_WRITE_BUFFER, size, usage),
            }
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
            buffer
        };
        if let Err(e) = self.check("create_buffer") {
            unsafe { self.gl.delete_buffer(buffer) };
            return Err(ResourceError::AllocationFailed(e.to_string()));
        }

        let id = RawBufferId(self.next_id());
        self.buffers.insert(
            id,
            GlBufferEntry {
                buffer,
                size: descriptor.size,
            },
        );
        Ok(id)
    }

    fn destroy_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        let entry = self.buffers.remove(&id).ok_or(ResourceError::NotFound)?;
        if self.index_buffer == Some(entry.buffer) {
            self.index_buffer = None;
        }
        unsafe { self.gl.delete_buffer(entry.buffer) };
        self.check("destroy_buffer")
    }

    fn write_buffer_mapped(
        &mut self,
        id: RawBufferId,
        _kind: BufferKind,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let entry = self.buffer(id)?;
        if data.len() as u64 > entry.size {
            return Err(ResourceError::MapFailed(format!(
                "write of {} bytes into a {} byte buffer",
                data.len(),
                entry.size
            )));
        }
        let buffer = entry.buffer;
        unsafe {
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, Some(buffer));
            let ptr = self.gl.map_buffer_range(
                glow::COPY_WRITE_BUFFER,
                0,
                data.len() as i32,
                glow::MAP_WRITE_BIT | glow::MAP_INVALIDATE_BUFFER_BIT,
            );
            if ptr.is_null() {
                self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
                let detail = self.check("map_buffer_range").err();
                return Err(ResourceError::MapFailed(format!(
                    "glMapBufferRange returned null for {id:?}{}",
                    detail.map(|e| format!(": {e}")).unwrap_or_default()
                )));
            }
            std::ptr::copy_nonoverlapping(data.as_ptr(), ptr, data.len());
            self.gl.unmap_buffer(glow::COPY_WRITE_BUFFER);
            self.gl.bind_buffer(glow::COPY_WRITE_BUFFER, None);
        }
        self.check("write_buffer_mapped")
    }

    fn bind_index_buffer(&mut self, id: RawBufferId) -> Result<(), ResourceError> {
        let buffer = self.buffer(id)?.buffer;
        unsafe {
            self.gl
                .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(buffer));
        }
        self.index_buffer = Some(buffer);
        self.check("bind_index_buffer")
    }

    fn bind_constant_buffer(
        &mut self,
        _stage: ShaderStage,
        slot: u32,
        id: RawBufferId,
    ) -> Result<(), ResourceError> {
        let buffer = self.buffer(id)?.buffer;
        unsafe {
            self.gl
                .bind_buffer_base(glow::UNIFORM_BUFFER, slot, Some(buffer));
        }
        self.check("bind_constant_buffer")
    }

    fn create_vertex_layout(
        &mut self,
        attributes: &[VertexAttribute],
    ) -> Result<VertexLayoutId, ResourceError> {
        let vao = unsafe { self.gl.create_vertex_array() }
            .map_err(ResourceError::AllocationFailed)?;
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
        }
        for attribute in attributes {
            let Some((count, ty, normalized)) = conversions::vertex_attrib(attribute.format) else {
                unsafe {
                    self.gl.bind_vertex_array(None);
                    self.gl.delete_vertex_array(vao);
                }
                return Err(ResourceError::UnsupportedFormat(attribute.format));
            };
            let buffer = match self.buffer(attribute.buffer) {
                Ok(entry) => entry.buffer,
                Err(e) => {
                    unsafe {
                        self.gl.bind_vertex_array(None);
                        self.gl.delete_vertex_array(vao);
                    }
                    return Err(e);
                }
            };
            let divisor = match attribute.step_mode {
                VertexStepMode::Vertex => 0,
                VertexStepMode::Instance => 1,
            };
            unsafe {
                self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                self.gl.enable_vertex_attrib_array(attribute.location);
                self.gl.vertex_attrib_pointer_f32(
                    attribute.location,
                    count,
                    ty,
                    normalized,
                    attribute.stride as i32,
                    attribute.offset as i32,
                );
                self.gl.vertex_attrib_divisor(attribute.location, divisor);
            }
        }
        unsafe {
            self.gl.bind_vertex_array(None);
            self.gl.bind_buffer(glow::ARRAY_BUFFER, None);
        }
        self.check("create_vertex_layout")?;

        let id = VertexLayoutId(self.next_id());
        self.vertex_arrays.insert(id, vao);
        Ok(id)
    }

    fn destroy_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        let vao = self.vertex_arrays.remove(&id).ok_or(ResourceError::NotFound)?;
        unsafe { self.gl.delete_vertex_array(vao) };
        self.check("destroy_vertex_layout")
    }

    fn bind_vertex_layout(&mut self, id: VertexLayoutId) -> Result<(), ResourceError> {
        let vao = *self.vertex_arrays.get(&id).ok_or(ResourceError::NotFound)?;
        unsafe {
            self.gl.bind_vertex_array(Some(vao));
            // The element buffer binding is vertex array state.
            if let Some(index_buffer) = self.index_buffer {
                self.gl
                    .bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(index_buffer));
            }
        }
        self.check("bind_vertex_layout")
    }

    fn compile_shader(
        &mut self,
        stage: ShaderStage,
        label: &str,
        source: &str,
    ) -> Result<RawShaderId, ResourceError> {
        let shader = unsafe { self.gl.create_shader(stage.into_gl()) }
            .map_err(ResourceError::AllocationFailed)?;
        let compiled = unsafe {
            self.gl.shader_source(shader, source);
            self.gl.compile_shader(shader);
            self.gl.get_shader_compile_status(shader)
        };
        if !compiled {
            let details = unsafe { self.gl.get_shader_info_log(shader) };
            unsafe { self.gl.delete_shader(shader) };
            return Err(ShaderError::CompilationError {
                label: label.to_string(),
                details,
            }
            .into());
        }
        self.check("compile_shader")?;

        let id = RawShaderId(self.next_id());
        self.shaders.insert(id, shader);
        Ok(id)
    }

    fn destroy_shader(&mut self, id: RawShaderId) -> Result<(), ResourceError> {
        let shader = self.shaders.remove(&id).ok_or(ResourceError::NotFound)?;
        unsafe { self.gl.delete_shader(shader) };
        self.check("destroy_shader")
    }

    fn link_program(&mut self, shaders: &[RawShaderId]) -> Result<LinkedProgram, ResourceError> {
        let objects = shaders
            .iter()
            .map(|id| self.shaders.get(id).copied().ok_or(ResourceError::NotFound))
            .collect::<Result<Vec<_>, _>>()?;
        let program = unsafe { self.gl.create_program() }
            .map_err(ResourceError::AllocationFailed)?;
        let (linked, info_log) = unsafe {
            for &shader in &objects {
                self.gl.attach_shader(program, shader);
            }
            self.gl.link_program(program);
            let linked = self.gl.get_program_link_status(program);
            let info_log = self.gl.get_program_info_log(program);
            for &shader in &objects {
                self.gl.detach_shader(program, shader);
            }
            (linked, info_log)
        };
        if let Err(e) = self.check("link_program") {
            log::warn!("{e}");
        }

        let id = ProgramId(self.next_id());
        self.programs.insert(id, program);
        Ok(LinkedProgram {
            program: id,
            linked,
            info_log,
        })
    }

    fn destroy_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        let program = self.programs.remove(&id).ok_or(ResourceError::NotFound)?;
        if self.current_program == Some(program) {
            self.current_program = None;
        }
        unsafe { self.gl.delete_program(program) };
        self.check("destroy_program")
    }

    fn use_program(&mut self, id: ProgramId) -> Result<(), ResourceError> {
        let program = self.program(id)?;
        unsafe { self.gl.use_program(Some(program)) };
        self.current_program = Some(program);
        self.check("use_program")
    }

    fn bind_uniform_block(
        &mut self,
        program: ProgramId,
        name: &str,
        binding: u32,
    ) -> Result<bool, ResourceError> {
        let program = self.program(program)?;
        let Some(index) = (unsafe { self.gl.get_uniform_block_index(program, name) }) else {
            return Ok(false);
        };
        unsafe { self.gl.uniform_block_binding(program, index, binding) };
        self.check("uniform_block_binding")?;
        Ok(true)
    }

    fn bind_sampler_uniform(
        &mut self,
        program: ProgramId,
        name: &str,
        unit: u32,
    ) -> Result<bool, ResourceError> {
        let program = self.program(program)?;
        let Some(location) = (unsafe { self.gl.get_uniform_location(program, name) }) else {
            return Ok(false);
        };
        unsafe {
            self.gl.use_program(Some(program));
            self.gl.uniform_1_i32(Some(&location), unit as i32);
            self.gl.use_program(self.current_program);
        }
        self.check("bind_sampler_uniform")?;
        Ok(true)
    }

    fn create_texture(&mut self, descriptor: &TextureDescriptor) -> Result<RawTextureId, ResourceError> {
        let texture = unsafe { self.gl.create_texture() }
            .map_err(ResourceError::AllocationFailed)?;
        unsafe {
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_storage_2d(
                glow::TEXTURE_2D,
                descriptor.mip_levels.max(1) as i32,
                glow::RGBA8,
                descriptor.width as i32,
                descriptor.height as i32,
            );
            self.gl.bind_texture(glow::TEXTURE_2D, None);
        }
        if let Err(e) = self.check("create_texture") {
            unsafe { self.gl.delete_texture(texture) };
            return Err(ResourceError::AllocationFailed(e.to_string()));
        }

        let id = RawTextureId(self.next_id());
        self.textures.insert(id, texture);
        Ok(id)
    }

    fn destroy_texture(&mut self, id: RawTextureId) -> Result<(), ResourceError> {
        let texture = self.textures.remove(&id).ok_or(ResourceError::NotFound)?;
        unsafe { self.gl.delete_texture(texture) };
        self.check("destroy_texture")
    }

    fn bind_texture(
        &mut self,
        unit: u32,
        id: RawTextureId,
        mip_levels: u32,
    ) -> Result<(), ResourceError> {
        let texture = *self.textures.get(&id).ok_or(ResourceError::NotFound)?;
        unsafe {
            self.gl.active_texture(glow::TEXTURE0 + unit);
            self.gl.bind_texture(glow::TEXTURE_2D, Some(texture));
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAX_LEVEL,
                (mip_levels.max(1) - 1) as i32,
            );
        }
        self.check("bind_texture")
    }

    fn apply_sampler(&mut self, sampler: &SamplerDescriptor) -> Result<(), ResourceError> {
        let wrap = sampler.address_mode.into_gl() as i32;
        unsafe {
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_S, wrap);
            self.gl
                .tex_parameter_i32(glow::TEXTURE_2D, glow::TEXTURE_WRAP_T, wrap);
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MAG_FILTER,
                sampler.mag_filter.into_gl() as i32,
            );
            self.gl.tex_parameter_i32(
                glow::TEXTURE_2D,
                glow::TEXTURE_MIN_FILTER,
                conversions::min_filter(sampler) as i32,
            );
            if sampler.anisotropy_scale > 0.0 && self.max_anisotropy > 1.0 {
                let anisotropy = (self.max_anisotropy * sampler.anisotropy_scale).max(1.0);
                self.gl
                    .tex_parameter_f32(glow::TEXTURE_2D, TEXTURE_MAX_ANISOTROPY, anisotropy);
            }
        }
        self.check("apply_sampler")
    }

    fn set_rasterizer_state(
        &mut self,
        state: &RasterizerStateDescriptor,
    ) -> Result<(), ResourceError> {
        unsafe {
            match conversions::cull_face(state.cull_mode) {
                Some(face) => {
                    self.gl.enable(glow::CULL_FACE);
                    self.gl.cull_face(face);
                }
                None => self.gl.disable(glow::CULL_FACE),
            }
            self.gl.front_face(state.front_face.into_gl());
        }
        self.check("set_rasterizer_state")
    }

    fn set_blend_state(&mut self, state: &BlendStateDescriptor) -> Result<(), ResourceError> {
        unsafe {
            if state.enabled {
                self.gl.enable(glow::BLEND);
                self.gl
                    .blend_func(state.src_factor.into_gl(), state.dst_factor.into_gl());
            } else {
                self.gl.disable(glow::BLEND);
            }
        }
        self.check("set_blend_state")
    }

    fn set_depth_stencil_state(
        &mut self,
        state: &DepthStencilStateDescriptor,
    ) -> Result<(), ResourceError> {
        unsafe {
            if state.depth_test_enabled {
                self.gl.enable(glow::DEPTH_TEST);
                self.gl.depth_func(state.depth_compare.into_gl());
            } else {
                self.gl.disable(glow::DEPTH_TEST);
            }
            self.gl.depth_mask(state.depth_write_enabled);
        }
        self.check("set_depth_stencil_state")
    }

    fn set_viewport(&mut self, viewport: &Viewport) -> Result<(), ResourceError> {
        unsafe {
            self.gl.viewport(
                viewport.x as i32,
                viewport.y as i32,
                viewport.width as i32,
                viewport.height as i32,
            );
            self.gl.depth_range_f32(viewport.min_depth, viewport.max_depth);
        }
        self.check("set_viewport")
    }

    fn draw(&mut self, call: &DrawCall) -> Result<(), ResourceError> {
        let mode = call.topology.into_gl();
        let count = draw_param(u64::from(call.element_count), "element count")?;
        let first_vertex = draw_param(u64::from(call.start_vertex), "start vertex")?;
        let index_offset = draw_param(u64::from(call.start_index) * 4, "index offset")?;
        let instances = draw_param(u64::from(call.instance_count), "instance count")?;
        unsafe {
            match call.kind {
                DrawKind::Draw => {
                    self.gl.draw_arrays(mode, first_vertex, count);
                }
                DrawKind::DrawIndexed => {
                    self.gl
                        .draw_elements(mode, count, glow::UNSIGNED_INT, index_offset);
                }
                DrawKind::DrawIndexedInstanced => {
                    self.gl.draw_elements_instanced_base_vertex_base_instance(
                        mode,
                        count,
                        glow::UNSIGNED_INT,
                        index_offset,
                        instances,
                        first_vertex,
                        call.start_instance,
                    );
                }
            }
        }
        self.check("draw")
    }
}

/// Narrows a draw parameter to the `GLint`/`GLsizei` the entry points take.
fn draw_param(value: u64, what: &str) -> Result<i32, ResourceError> {
    i32::try_from(value)
        .map_err(|_| ResourceError::BackendError(format!("draw {what} {value} exceeds GL limits")))
}
