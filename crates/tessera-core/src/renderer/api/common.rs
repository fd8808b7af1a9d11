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

//! Constants and small enums shared across the rendering API.

/// Number of vertex buffer slots tracked per draw. Slot 0 is the primary
/// vertex stream, slots 1.. carry per-instance data.
pub const MAX_VERTEX_BUFFERS: usize = 4;

/// Number of texture binding slots tracked per shader stage.
pub const MAX_TEXTURE_SLOTS: usize = 8;

/// Number of constant (uniform) buffer binding slots tracked per shader stage.
pub const MAX_CONSTANT_BUFFERS: usize = 8;

/// Default number of backing allocations behind a dynamic buffer.
pub const DEFAULT_BUFFER_ROTATION_DEPTH: usize = 2;

/// Name prefix of uniform blocks discovered after a program links (`buffer0`, `buffer1`, ...).
pub const UNIFORM_BLOCK_PREFIX: &str = "buffer";

/// Name prefix of sampler uniforms discovered after a program links (`texture0`, `texture1`, ...).
pub const SAMPLER_UNIFORM_PREFIX: &str = "texture";

/// A programmable pipeline stage.
///
/// The discriminant is the stage's fixed index into per-stage arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShaderStage {
    /// Per-vertex processing.
    Vertex = 0,
    /// Per-fragment processing (fragment shader in GL terms).
    Pixel = 1,
    /// Primitive-level processing.
    Geometry = 2,
    /// Tessellation control (hull) stage.
    Hull = 3,
    /// Tessellation evaluation (domain) stage.
    Domain = 4,
}

/// The number of [`ShaderStage`] variants.
pub const SHADER_STAGE_COUNT: usize = 5;

impl ShaderStage {
    /// All stages in stage-index order.
    pub const ALL: [ShaderStage; SHADER_STAGE_COUNT] = [
        ShaderStage::Vertex,
        ShaderStage::Pixel,
        ShaderStage::Geometry,
        ShaderStage::Hull,
        ShaderStage::Domain,
    ];

    /// The stage's index into per-stage arrays.
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Identifies which native API a backend drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBackendType {
    /// An OpenGL 4.x style driver.
    OpenGl,
    /// A backend that executes nothing on a GPU and records calls instead.
    Headless,
    /// Any other backend.
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_indices_follow_declaration_order() {
        for (i, stage) in ShaderStage::ALL.iter().enumerate() {
            assert_eq!(stage.index(), i);
        }
        assert_eq!(ShaderStage::ALL.len(), SHADER_STAGE_COUNT);
    }
}
