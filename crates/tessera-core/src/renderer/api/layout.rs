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

//! Vertex input descriptions and byte-offset computation for vertex layouts.

use crate::renderer::api::buffer::RawBufferId;
use crate::renderer::api::common::MAX_VERTEX_BUFFERS;
use crate::renderer::error::ResourceError;
use std::borrow::Cow;

/// The data format of a single vertex element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexFormat {
    /// One 32-bit float component.
    Float32,
    /// Two 32-bit float components.
    Float32x2,
    /// Three 32-bit float components.
    Float32x3,
    /// Four 32-bit float components.
    Float32x4,
    /// Four 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x4,
    /// Four 8-bit unsigned integer components.
    Uint8x4,
    /// Two 16-bit float components.
    Float16x2,
    /// One 32-bit unsigned integer component.
    Uint32,
    /// Four 32-bit unsigned integer components.
    Uint32x4,
}

/// The scalar type of a vertex component as the backend reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit IEEE float.
    Float32,
    /// 8-bit unsigned integer.
    Uint8,
}

/// How a backend feeds one attribute: component count, scalar type and normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeComponents {
    /// Number of components, 1 to 4.
    pub count: u32,
    /// Scalar type of each component.
    pub ty: ComponentType,
    /// Whether integer components are normalized to `[0, 1]`.
    pub normalized: bool,
}

impl VertexFormat {
    /// Returns the size in bytes of this vertex format.
    pub fn size(&self) -> u32 {
        match self {
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Unorm8x4 => 4,
            VertexFormat::Uint8x4 => 4,
            VertexFormat::Float16x2 => 4,
            VertexFormat::Uint32 => 4,
            VertexFormat::Uint32x4 => 16,
        }
    }

    /// Returns how the layout builder feeds this format, or `None` if the
    /// format is not supported as a vertex element.
    pub fn components(&self) -> Option<AttributeComponents> {
        let (count, ty, normalized) = match self {
            VertexFormat::Float32x4 => (4, ComponentType::Float32, false),
            VertexFormat::Float32x3 => (3, ComponentType::Float32, false),
            VertexFormat::Float32x2 => (2, ComponentType::Float32, false),
            VertexFormat::Unorm8x4 => (4, ComponentType::Uint8, true),
            _ => return None,
        };
        Some(AttributeComponents {
            count,
            ty,
            normalized,
        })
    }
}

/// How often a vertex stream advances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexStepMode {
    /// The GPU advances to the next element for each vertex.
    Vertex,
    /// The GPU advances to the next element only for each new instance being rendered.
    Instance,
}

/// One element of an input layout, as declared by the asset/layout layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputElementDescriptor {
    /// The semantic name, for diagnostics (`POSITION`, `TEXCOORD`, ...).
    pub semantic: Cow<'static, str>,
    /// The element's data format.
    pub format: VertexFormat,
    /// The vertex buffer slot this element is read from. Slot 0 is per-vertex,
    /// any other slot is per-instance.
    pub input_slot: u32,
}

impl InputElementDescriptor {
    /// Creates an element read from the given slot.
    pub fn new(semantic: &'static str, format: VertexFormat, input_slot: u32) -> Self {
        Self {
            semantic: Cow::Borrowed(semantic),
            format,
            input_slot,
        }
    }
}

/// An opaque handle to an input layout registered with a render context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InputLayoutId(pub usize);

/// An opaque handle to a backend vertex layout binding object (a VAO in GL terms).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexLayoutId(pub u64);

/// The position of one element after offset computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementPlacement {
    /// The attribute location, equal to the element's index in the layout.
    pub location: u32,
    /// The vertex buffer slot the element is read from.
    pub input_slot: u32,
    /// The byte offset within one element of that slot's buffer.
    pub offset: u32,
    /// The element's data format.
    pub format: VertexFormat,
    /// Per-vertex for slot 0, per-instance otherwise.
    pub step_mode: VertexStepMode,
}

/// The result of walking an input layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputedLayout {
    /// Placement of every element, in declaration order.
    pub elements: Vec<ElementPlacement>,
    /// Packed byte stride per input slot (sum of its element sizes).
    pub strides: [u32; MAX_VERTEX_BUFFERS],
}

/// Walks the input elements in order and assigns byte offsets.
///
/// The running offset is shared between slots and only resets when the
/// sequence moves from a slot-0 element to an instance-slot element after
/// the offset has advanced.
///
/// # Errors
///
/// Returns [`ResourceError::UnsupportedFormat`] for the first element whose
/// format has no attribute mapping, and [`ResourceError::MissingVertexStream`]
/// for a slot outside the tracked vertex buffer range.
pub fn compute_layout(elements: &[InputElementDescriptor]) -> Result<ComputedLayout, ResourceError> {
    let mut placements = Vec::with_capacity(elements.len());
    let mut strides = [0u32; MAX_VERTEX_BUFFERS];
    let mut offset = 0u32;

    for (i, element) in elements.iter().enumerate() {
        if element.format.components().is_none() {
            return Err(ResourceError::UnsupportedFormat(element.format));
        }
        let slot = element.input_slot as usize;
        if slot >= MAX_VERTEX_BUFFERS {
            return Err(ResourceError::MissingVertexStream {
                slot: element.input_slot,
            });
        }

        if i > 0 && offset != 0 && element.input_slot != 0 && elements[i - 1].input_slot == 0 {
            offset = 0;
        }

        placements.push(ElementPlacement {
            location: i as u32,
            input_slot: element.input_slot,
            offset,
            format: element.format,
            step_mode: if element.input_slot > 0 {
                VertexStepMode::Instance
            } else {
                VertexStepMode::Vertex
            },
        });

        offset += element.format.size();
        strides[slot] += element.format.size();
    }

    Ok(ComputedLayout {
        elements: placements,
        strides,
    })
}

/// A backend buffer feeding one vertex slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexStream {
    /// The backing buffer object currently holding the stream's data.
    pub buffer: RawBufferId,
    /// The element stride declared on the buffer, `0` if undeclared.
    pub stride: u32,
}

/// A fully resolved attribute, ready for the backend to record into a layout object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexAttribute {
    /// The attribute location.
    pub location: u32,
    /// The buffer object the attribute is sourced from.
    pub buffer: RawBufferId,
    /// The element's data format.
    pub format: VertexFormat,
    /// Byte offset within one element.
    pub offset: u32,
    /// Byte distance between consecutive elements.
    pub stride: u32,
    /// Per-vertex or per-instance stepping.
    pub step_mode: VertexStepMode,
}

impl ComputedLayout {
    /// Binds every placement to the stream of its slot.
    ///
    /// A stream's declared stride wins; streams without one use the packed
    /// stride of their slot.
    pub fn resolve(
        &self,
        streams: &[Option<VertexStream>; MAX_VERTEX_BUFFERS],
    ) -> Result<Vec<VertexAttribute>, ResourceError> {
        self.elements
            .iter()
            .map(|placement| {
                let slot = placement.input_slot as usize;
                let stream = streams[slot].ok_or(ResourceError::MissingVertexStream {
                    slot: placement.input_slot,
                })?;
                let stride = if stream.stride > 0 {
                    stream.stride
                } else {
                    self.strides[slot]
                };
                Ok(VertexAttribute {
                    location: placement.location,
                    buffer: stream.buffer,
                    format: placement.format,
                    offset: placement.offset,
                    stride,
                    step_mode: placement.step_mode,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn element(format: VertexFormat, slot: u32) -> InputElementDescriptor {
        InputElementDescriptor::new("TEST", format, slot)
    }

    #[test]
    fn offsets_accumulate_on_primary_slot() {
        let layout = compute_layout(&[
            element(VertexFormat::Float32x4, 0),
            element(VertexFormat::Float32x3, 0),
            element(VertexFormat::Unorm8x4, 0),
        ])
        .unwrap();

        let offsets: Vec<u32> = layout.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 16, 28]);
        assert_eq!(layout.strides[0], 32);
        assert!(layout
            .elements
            .iter()
            .all(|e| e.step_mode == VertexStepMode::Vertex));
    }

    #[test]
    fn offset_resets_when_moving_to_instance_slot() {
        let layout = compute_layout(&[
            element(VertexFormat::Float32x3, 0),
            element(VertexFormat::Float32x2, 0),
            element(VertexFormat::Float32x4, 1),
            element(VertexFormat::Float32x4, 1),
        ])
        .unwrap();

        let offsets: Vec<u32> = layout.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 12, 0, 16]);
        assert_eq!(layout.strides[0], 20);
        assert_eq!(layout.strides[1], 32);
        assert_eq!(layout.elements[2].step_mode, VertexStepMode::Instance);
        assert_eq!(layout.elements[3].location, 3);
    }

    #[test]
    fn offset_does_not_reset_for_leading_instance_element() {
        let layout = compute_layout(&[
            element(VertexFormat::Float32x4, 1),
            element(VertexFormat::Float32x2, 1),
        ])
        .unwrap();
        let offsets: Vec<u32> = layout.elements.iter().map(|e| e.offset).collect();
        assert_eq!(offsets, vec![0, 16]);
    }

    #[test]
    fn unsupported_format_aborts_layout() {
        let result = compute_layout(&[
            element(VertexFormat::Float32x3, 0),
            element(VertexFormat::Uint32, 0),
        ]);
        assert!(matches!(
            result,
            Err(ResourceError::UnsupportedFormat(VertexFormat::Uint32))
        ));
    }

    #[test]
    fn resolve_prefers_declared_stride() {
        let layout = compute_layout(&[
            element(VertexFormat::Float32x3, 0),
            element(VertexFormat::Float32x4, 1),
        ])
        .unwrap();
        let mut streams = [None; MAX_VERTEX_BUFFERS];
        streams[0] = Some(VertexStream {
            buffer: RawBufferId(7),
            stride: 24,
        });
        streams[1] = Some(VertexStream {
            buffer: RawBufferId(9),
            stride: 0,
        });

        let attributes = layout.resolve(&streams).unwrap();
        assert_eq!(attributes[0].buffer, RawBufferId(7));
        assert_eq!(attributes[0].stride, 24);
        assert_eq!(attributes[1].buffer, RawBufferId(9));
        assert_eq!(attributes[1].stride, 16);
        assert_eq!(attributes[1].step_mode, VertexStepMode::Instance);
    }

    #[test]
    fn resolve_requires_instance_stream() {
        let layout = compute_layout(&[
            element(VertexFormat::Float32x3, 0),
            element(VertexFormat::Float32x4, 1),
        ])
        .unwrap();
        let mut streams = [None; MAX_VERTEX_BUFFERS];
        streams[0] = Some(VertexStream {
            buffer: RawBufferId(1),
            stride: 12,
        });
        assert!(matches!(
            layout.resolve(&streams),
            Err(ResourceError::MissingVertexStream { slot: 1 })
        ));
    }
}
