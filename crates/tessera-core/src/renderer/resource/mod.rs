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

//! Backend-object ownership behind the opaque handles a render context hands out.

mod buffer;

pub use self::buffer::{BufferState, CachedLayout, GpuBuffer, WriteOutcome};

use crate::renderer::api::{
    BlendStateDescriptor, DepthStencilStateDescriptor, InputElementDescriptor,
    RasterizerStateDescriptor, RawTextureId, SamplerDescriptor,
};
use crate::renderer::shader::ShaderStageObject;
use std::collections::HashMap;

/// A texture object and the metadata the binder needs.
#[derive(Debug, Clone)]
pub struct TextureEntry {
    /// The backend texture.
    pub raw: RawTextureId,
    /// Number of mip levels uploaded.
    pub mip_levels: u32,
    /// Debug label.
    pub label: String,
}

/// A registered input layout; placement is computed when a layout object is built.
#[derive(Debug, Clone)]
pub struct InputLayoutEntry {
    /// Element descriptors in declaration order.
    pub elements: Vec<InputElementDescriptor>,
}

/// Every resource table of one render context.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    /// Logical buffers.
    pub buffers: ResourceTable<GpuBuffer>,
    /// Shader stage objects.
    pub shaders: ResourceTable<ShaderStageObject>,
    /// Textures.
    pub textures: ResourceTable<TextureEntry>,
    /// Input layouts.
    pub input_layouts: ResourceTable<InputLayoutEntry>,
    /// Rasterizer state objects.
    pub rasterizer_states: ResourceTable<RasterizerStateDescriptor>,
    /// Blend state objects.
    pub blend_states: ResourceTable<BlendStateDescriptor>,
    /// Depth-stencil state objects.
    pub depth_stencil_states: ResourceTable<DepthStencilStateDescriptor>,
    /// Sampler state objects.
    pub sampler_states: ResourceTable<SamplerDescriptor>,
}

/// Maps handle values to owned resources.
///
/// Handle values are never reused within one table.
#[derive(Debug)]
pub struct ResourceTable<T> {
    entries: HashMap<usize, T>,
    next_id: usize,
}

impl<T> Default for ResourceTable<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            next_id: 0,
        }
    }
}

impl<T> ResourceTable<T> {
    /// Stores `value` and returns its handle value.
    pub fn insert(&mut self, value: T) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.insert(id, value);
        id
    }

    /// Looks up an entry.
    pub fn get(&self, id: usize) -> Option<&T> {
        self.entries.get(&id)
    }

    /// Looks up an entry mutably.
    pub fn get_mut(&mut self, id: usize) -> Option<&mut T> {
        self.entries.get_mut(&id)
    }

    /// Removes an entry, returning it.
    pub fn remove(&mut self, id: usize) -> Option<T> {
        self.entries.remove(&id)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the table holds nothing.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates live entries in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &T)> {
        self.entries.iter().map(|(id, value)| (*id, value))
    }

    /// Removes and yields every entry.
    pub fn drain(&mut self) -> impl Iterator<Item = (usize, T)> + '_ {
        self.entries.drain()
    }
}
