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

//! Conversions from the core's API enums to OpenGL enum values.

use glow::HasContext;
use tessera_core::renderer::api::{
    AddressMode, BlendFactor, BufferUsage, CompareFunction, CullMode, FilterMode, FrontFace,
    PrimitiveTopology, SamplerDescriptor, ShaderStage, VertexFormat,
};

/// A local extension trait to convert the core's enums into GL enum values.
pub trait IntoGl {
    /// Returns the matching GL enum.
    fn into_gl(self) -> u32;
}

impl IntoGl for PrimitiveTopology {
    fn into_gl(self) -> u32 {
        match self {
            PrimitiveTopology::LineList => glow::LINES,
            PrimitiveTopology::LineStrip => glow::LINE_STRIP,
            PrimitiveTopology::TriangleList => glow::TRIANGLES,
            PrimitiveTopology::TriangleStrip => glow::TRIANGLE_STRIP,
        }
    }
}

impl IntoGl for ShaderStage {
    fn into_gl(self) -> u32 {
        match self {
            ShaderStage::Vertex => glow::VERTEX_SHADER,
            ShaderStage::Pixel => glow::FRAGMENT_SHADER,
            ShaderStage::Geometry => glow::GEOMETRY_SHADER,
            ShaderStage::Hull => glow::TESS_CONTROL_SHADER,
            ShaderStage::Domain => glow::TESS_EVALUATION_SHADER,
        }
    }
}

impl IntoGl for BufferUsage {
    fn into_gl(self) -> u32 {
        match self {
            BufferUsage::Default | BufferUsage::Immutable => glow::STATIC_DRAW,
            BufferUsage::Dynamic => glow::DYNAMIC_DRAW,
            BufferUsage::Staging => glow::STREAM_DRAW,
        }
    }
}

impl IntoGl for FrontFace {
    fn into_gl(self) -> u32 {
        match self {
            FrontFace::Ccw => glow::CCW,
            FrontFace::Cw => glow::CW,
        }
    }
}

impl IntoGl for CompareFunction {
    fn into_gl(self) -> u32 {
        match self {
            CompareFunction::Never => glow::NEVER,
            CompareFunction::Less => glow::LESS,
            CompareFunction::Equal => glow::EQUAL,
            CompareFunction::LessEqual => glow::LEQUAL,
            CompareFunction::Greater => glow::GREATER,
            CompareFunction::NotEqual => glow::NOTEQUAL,
            CompareFunction::GreaterEqual => glow::GEQUAL,
            CompareFunction::Always => glow::ALWAYS,
        }
    }
}

impl IntoGl for BlendFactor {
    fn into_gl(self) -> u32 {
        match self {
            BlendFactor::Zero => glow::ZERO,
            BlendFactor::One => glow::ONE,
            BlendFactor::SrcAlpha => glow::SRC_ALPHA,
            BlendFactor::OneMinusSrcAlpha => glow::ONE_MINUS_SRC_ALPHA,
            BlendFactor::DstAlpha => glow::DST_ALPHA,
            BlendFactor::OneMinusDstAlpha => glow::ONE_MINUS_DST_ALPHA,
            BlendFactor::SrcColor => glow::SRC_COLOR,
            BlendFactor::OneMinusSrcColor => glow::ONE_MINUS_SRC_COLOR,
        }
    }
}

impl IntoGl for AddressMode {
    fn into_gl(self) -> u32 {
        match self {
            AddressMode::Repeat => glow::REPEAT,
            AddressMode::MirrorRepeat => glow::MIRRORED_REPEAT,
            AddressMode::ClampToEdge => glow::CLAMP_TO_EDGE,
        }
    }
}

impl IntoGl for FilterMode {
    fn into_gl(self) -> u32 {
        match self {
            FilterMode::Nearest => glow::NEAREST,
            FilterMode::Linear => glow::LINEAR,
        }
    }
}

/// The face `glCullFace` should discard, `None` when culling is disabled.
pub fn cull_face(mode: CullMode) -> Option<u32> {
    match mode {
        CullMode::None => None,
        CullMode::Front => Some(glow::FRONT),
        CullMode::Back => Some(glow::BACK),
    }
}

/// The minification filter combining texel and mip filtering.
pub fn min_filter(sampler: &SamplerDescriptor) -> u32 {
    match (sampler.min_filter, sampler.mipmap_filter) {
        (FilterMode::Nearest, None) => glow::NEAREST,
        (FilterMode::Linear, None) => glow::LINEAR,
        (FilterMode::Nearest, Some(FilterMode::Nearest)) => glow::NEAREST_MIPMAP_NEAREST,
        (FilterMode::Nearest, Some(FilterMode::Linear)) => glow::NEAREST_MIPMAP_LINEAR,
        (FilterMode::Linear, Some(FilterMode::Nearest)) => glow::LINEAR_MIPMAP_NEAREST,
        (FilterMode::Linear, Some(FilterMode::Linear)) => glow::LINEAR_MIPMAP_LINEAR,
    }
}

/// Component count, component type and normalization for
/// `glVertexAttribPointer`, `None` for formats the layout builder rejects.
pub fn vertex_attrib(format: VertexFormat) -> Option<(i32, u32, bool)> {
    use tessera_core::renderer::api::ComponentType;

    let components = format.components()?;
    let ty = match components.ty {
        ComponentType::Float32 => glow::FLOAT,
        ComponentType::Uint8 => glow::UNSIGNED_BYTE,
    };
    Some((components.count as i32, ty, components.normalized))
}

/// Drains the GL error queue, returning every pending code.
pub fn drain_errors(gl: &glow::Context) -> Vec<u32> {
    let mut codes = Vec::new();
    loop {
        let code = unsafe { gl.get_error() };
        if code == glow::NO_ERROR {
            return codes;
        }
        codes.push(code);
    }
}

/// A readable name for a GL error code.
pub fn error_name(code: u32) -> &'static str {
    match code {
        glow::INVALID_ENUM => "GL_INVALID_ENUM",
        glow::INVALID_VALUE => "GL_INVALID_VALUE",
        glow::INVALID_OPERATION => "GL_INVALID_OPERATION",
        glow::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        glow::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        glow::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        glow::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        _ => "unknown GL error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trilinear_sampling_uses_mipmapped_min_filter() {
        assert_eq!(
            min_filter(&SamplerDescriptor::default()),
            glow::LINEAR_MIPMAP_LINEAR
        );
        let point = SamplerDescriptor {
            min_filter: FilterMode::Nearest,
            mipmap_filter: None,
            ..SamplerDescriptor::default()
        };
        assert_eq!(min_filter(&point), glow::NEAREST);
    }

    #[test]
    fn normalized_bytes_map_to_unsigned_byte() {
        assert_eq!(
            vertex_attrib(VertexFormat::Unorm8x4),
            Some((4, glow::UNSIGNED_BYTE, true))
        );
        assert_eq!(vertex_attrib(VertexFormat::Float32x3), Some((3, glow::FLOAT, false)));
        assert_eq!(vertex_attrib(VertexFormat::Uint32), None);
    }

    #[test]
    fn stages_map_to_shader_types() {
        assert_eq!(ShaderStage::Pixel.into_gl(), glow::FRAGMENT_SHADER);
        assert_eq!(ShaderStage::Hull.into_gl(), glow::TESS_CONTROL_SHADER);
        assert_eq!(cull_face(CullMode::None), None);
    }
}
