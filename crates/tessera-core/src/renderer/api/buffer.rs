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

//! Defines data structures related to GPU buffer resources.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// What a buffer is bound as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferKind {
    /// Vertex attribute data (primary or per-instance stream).
    Vertex,
    /// 32-bit index data.
    Index,
    /// Constant (uniform) data bound to a shader stage slot.
    Constant,
}

/// The update frequency class of a buffer.
///
/// Only [`BufferUsage::Dynamic`] buffers are multi-buffered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Written occasionally, read by the GPU every frame.
    #[default]
    Default,
    /// Rewritten by the CPU frequently, typically every frame.
    Dynamic,
    /// Written once at creation.
    Immutable,
    /// Used to move data between CPU and GPU.
    Staging,
}

/// A descriptor used to create a logical buffer through the render context.
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// What the buffer is bound as.
    pub kind: BufferKind,
    /// The update frequency class.
    pub usage: BufferUsage,
    /// The initial capacity in bytes. Zero leaves the buffer unallocated until
    /// its first write.
    pub size: u64,
    /// The byte size of one element (the vertex stride for vertex buffers).
    pub stride: u32,
}

impl<'a> BufferDescriptor<'a> {
    /// A dynamic vertex buffer with no storage yet.
    pub fn dynamic_vertex(label: &'a str, stride: u32) -> Self {
        Self {
            label: Some(Cow::Borrowed(label)),
            kind: BufferKind::Vertex,
            usage: BufferUsage::Dynamic,
            size: 0,
            stride,
        }
    }
}

/// The parameters a backend needs to allocate one backing buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawBufferDescriptor {
    /// What the buffer is bound as.
    pub kind: BufferKind,
    /// The update frequency class, used as an allocation hint.
    pub usage: BufferUsage,
    /// The size of the allocation in bytes.
    pub size: u64,
}

/// An opaque handle to a logical buffer owned by a render context.
///
/// The handle stays stable across reallocation and multi-buffer rotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);

/// An opaque handle to one backend buffer object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RawBufferId(pub u64);
