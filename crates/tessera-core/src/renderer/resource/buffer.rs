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

//! Rotating backing storage for one logical GPU buffer.
//!
//! A [`GpuBuffer`] owns `K` backend buffers for dynamic usage and one for
//! every other usage. Writes landing on the same frame as the previous write,
//! or on the frame right after it, move to the next backing buffer so the CPU
//! never overwrites storage the GPU may still be reading:
//!
//! ```text
//! frame F:    write -> backing 0
//! frame F+1:  write -> backing 1   (rotated, F is recent)
//! frame F+4:  write -> backing 1   (in place, nothing in flight)
//! ```
//!
//! A write larger than the current capacity releases every backing buffer and
//! recreates them sized to the data. That path always wins over rotation.

use crate::renderer::{
    api::{
        BufferDescriptor, BufferKind, BufferUsage, InputLayoutId, RawBufferDescriptor,
        RawBufferId, VertexLayoutId, MAX_VERTEX_BUFFERS,
    },
    error::ResourceError,
    traits::GraphicsBackend,
};

/// A vertex layout object built for one backing buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachedLayout {
    /// The backend layout object.
    pub id: VertexLayoutId,
    /// The input layout the object was built from.
    pub input_layout: InputLayoutId,
    /// The backing buffers sourced per slot, slot 0 included.
    pub streams: [Option<RawBufferId>; MAX_VERTEX_BUFFERS],
}

impl CachedLayout {
    /// Returns `true` if this object was built for exactly these inputs.
    pub fn matches(
        &self,
        input_layout: InputLayoutId,
        streams: &[Option<RawBufferId>; MAX_VERTEX_BUFFERS],
    ) -> bool {
        self.input_layout == input_layout && &self.streams == streams
    }
}

#[derive(Debug)]
struct Backing {
    raw: RawBufferId,
    layout: Option<CachedLayout>,
}

/// The allocation state of a [`GpuBuffer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferState {
    /// No backend storage exists yet.
    Unallocated,
    /// One backing buffer, written in place.
    SingleBuffered,
    /// Several backing buffers rotated between writes.
    MultiBuffered,
}

/// What a successful [`GpuBuffer::write`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The data was empty, nothing was touched.
    Empty,
    /// The current backing buffer was overwritten.
    InPlace,
    /// The write moved to the next backing buffer.
    Rotated,
    /// Every backing buffer was recreated to fit the data.
    Reallocated,
}

impl WriteOutcome {
    /// Returns `true` if the current backend object changed.
    pub fn replaced_backing(&self) -> bool {
        matches!(self, WriteOutcome::Rotated | WriteOutcome::Reallocated)
    }
}

/// One logical buffer backed by `depth` backend buffers.
#[derive(Debug)]
pub struct GpuBuffer {
    label: String,
    kind: BufferKind,
    usage: BufferUsage,
    stride: u32,
    capacity: u64,
    depth: usize,
    double_buffering: bool,
    backings: Vec<Backing>,
    rotation: usize,
    last_frame_updated: Option<u64>,
}

impl GpuBuffer {
    /// Creates a buffer and, if `descriptor.size` or `initial_data` is
    /// non-zero, allocates its backing storage.
    ///
    /// `depth` is the number of backing buffers for dynamic usage; other
    /// usages always get one. `double_buffering` gates rotation.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if a backing buffer cannot be created. No
    /// partially created storage is left behind.
    pub fn new(
        backend: &mut dyn GraphicsBackend,
        descriptor: &BufferDescriptor,
        depth: usize,
        double_buffering: bool,
        initial_data: Option<&[u8]>,
    ) -> Result<Self, ResourceError> {
        let depth = match descriptor.usage {
            BufferUsage::Dynamic => depth.max(1),
            _ => 1,
        };
        let mut buffer = Self {
            label: descriptor
                .label
                .as_deref()
                .unwrap_or("unnamed buffer")
                .to_string(),
            kind: descriptor.kind,
            usage: descriptor.usage,
            stride: descriptor.stride,
            capacity: 0,
            depth,
            double_buffering,
            backings: Vec::with_capacity(depth),
            rotation: 0,
            last_frame_updated: None,
        };

        let size = descriptor
            .size
            .max(initial_data.map_or(0, |data| data.len() as u64));
        if size > 0 {
            buffer.allocate(backend, size, initial_data)?;
        }
        Ok(buffer)
    }

    /// Writes `data` at offset 0 following the rotation rules, using
    /// `frame` as the current frame index.
    ///
    /// # Errors
    ///
    /// Returns a [`ResourceError`] if reallocation or the mapped write fails.
    /// A failed reallocation leaves the buffer unallocated; a failed mapped
    /// write leaves the current backing unchanged.
    pub fn write(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: &[u8],
        frame: u64,
    ) -> Result<WriteOutcome, ResourceError> {
        if data.is_empty() {
            return Ok(WriteOutcome::Empty);
        }

        let size = data.len() as u64;
        if size > self.capacity || self.backings.is_empty() {
            log::debug!(
                "Reallocating buffer '{}' from {} to {} bytes ({} backing)",
                self.label,
                self.capacity,
                size,
                self.depth
            );
            self.release(backend);
            self.allocate(backend, size, Some(data))?;
            self.last_frame_updated = Some(frame);
            return Ok(WriteOutcome::Reallocated);
        }

        let recent = self
            .last_frame_updated
            .is_some_and(|last| last == frame || last + 1 == frame);
        let (target, outcome) = if self.rotates() && recent {
            ((self.rotation + 1) % self.backings.len(), WriteOutcome::Rotated)
        } else {
            (self.rotation, WriteOutcome::InPlace)
        };

        // A failed map leaves the current backing and frame untouched.
        backend.write_buffer_mapped(self.backings[target].raw, self.kind, data)?;
        self.rotation = target;
        if outcome == WriteOutcome::InPlace {
            self.last_frame_updated = Some(frame);
        }
        Ok(outcome)
    }

    /// Destroys every backing buffer and the layout objects built for them.
    ///
    /// Failures are logged; the buffer ends up unallocated either way.
    pub fn release(&mut self, backend: &mut dyn GraphicsBackend) {
        for backing in self.backings.drain(..) {
            if let Some(layout) = backing.layout {
                if let Err(e) = backend.destroy_vertex_layout(layout.id) {
                    log::warn!("Failed to destroy vertex layout of '{}': {}", self.label, e);
                }
            }
            if let Err(e) = backend.destroy_buffer(backing.raw) {
                log::warn!("Failed to destroy backing of '{}': {}", self.label, e);
            }
        }
        self.capacity = 0;
        self.rotation = 0;
    }

    fn allocate(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        size: u64,
        data: Option<&[u8]>,
    ) -> Result<(), ResourceError> {
        let raw_descriptor = RawBufferDescriptor {
            kind: self.kind,
            usage: self.usage,
            size,
        };
        for _ in 0..self.depth {
            match backend.create_buffer(&raw_descriptor, data) {
                Ok(raw) => self.backings.push(Backing { raw, layout: None }),
                Err(e) => {
                    log::error!("Failed to allocate buffer '{}': {}", self.label, e);
                    self.release(backend);
                    return Err(e);
                }
            }
        }
        self.capacity = size;
        self.rotation = 0;
        Ok(())
    }

    fn rotates(&self) -> bool {
        self.usage == BufferUsage::Dynamic && self.double_buffering && self.backings.len() > 1
    }

    /// The backing buffer the next bind should use.
    pub fn current(&self) -> Option<RawBufferId> {
        self.backings.get(self.rotation).map(|b| b.raw)
    }

    /// The layout object cached on the current backing buffer.
    pub fn cached_layout(&self) -> Option<&CachedLayout> {
        self.backings.get(self.rotation)?.layout.as_ref()
    }

    /// Stores `layout` on the current backing buffer and returns the layout it
    /// replaced, which the caller must destroy.
    pub fn set_cached_layout(&mut self, layout: CachedLayout) -> Option<CachedLayout> {
        let backing = self.backings.get_mut(self.rotation)?;
        backing.layout.replace(layout)
    }

    /// The allocation state.
    pub fn state(&self) -> BufferState {
        match self.backings.len() {
            0 => BufferState::Unallocated,
            1 => BufferState::SingleBuffered,
            _ => BufferState::MultiBuffered,
        }
    }

    /// Capacity of each backing buffer in bytes.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Index of the current backing buffer, always below [`Self::backing_count`]
    /// once allocated.
    pub fn rotation_index(&self) -> usize {
        self.rotation
    }

    /// Number of allocated backing buffers.
    pub fn backing_count(&self) -> usize {
        self.backings.len()
    }

    /// The frame of the last non-rotating write.
    pub fn last_frame_updated(&self) -> Option<u64> {
        self.last_frame_updated
    }

    /// The declared element stride, `0` if undeclared.
    pub fn stride(&self) -> u32 {
        self.stride
    }

    /// What the buffer is bound as.
    pub fn kind(&self) -> BufferKind {
        self.kind
    }

    /// The usage class.
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// The debug label.
    pub fn label(&self) -> &str {
        &self.label
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::mock::{Call, MockBackend};

    fn dynamic_buffer(backend: &mut MockBackend, depth: usize) -> GpuBuffer {
        let descriptor = BufferDescriptor::dynamic_vertex("test", 16);
        GpuBuffer::new(backend, &descriptor, depth, true, None).unwrap()
    }

    #[test]
    fn zero_sized_buffer_starts_unallocated() {
        let mut backend = MockBackend::new();
        let buffer = dynamic_buffer(&mut backend, 2);
        assert_eq!(buffer.state(), BufferState::Unallocated);
        assert_eq!(buffer.current(), None);
        assert!(backend.calls.is_empty());
    }

    #[test]
    fn first_write_allocates_every_backing() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);

        let outcome = buffer.write(&mut backend, &[7u8; 64], 0).unwrap();
        assert_eq!(outcome, WriteOutcome::Reallocated);
        assert_eq!(buffer.state(), BufferState::MultiBuffered);
        assert_eq!(buffer.capacity(), 64);
        assert_eq!(buffer.rotation_index(), 0);
        let raw = buffer.current().unwrap();
        assert_eq!(backend.buffers[&raw], vec![7u8; 64]);
        assert_eq!(backend.count(|c| matches!(c, Call::CreateBuffer(..))), 2);
    }

    #[test]
    fn writes_on_recent_frames_rotate() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 32], 10).unwrap();
        let first = buffer.current().unwrap();

        // Same frame.
        assert_eq!(buffer.write(&mut backend, &[1u8; 32], 10).unwrap(), WriteOutcome::Rotated);
        let second = buffer.current().unwrap();
        assert_ne!(first, second);

        // Next frame, relative to the last non-rotating write.
        assert_eq!(buffer.write(&mut backend, &[2u8; 32], 11).unwrap(), WriteOutcome::Rotated);
        assert_eq!(buffer.current().unwrap(), first);
        assert_eq!(backend.buffers[&first], vec![2u8; 32]);
        assert_eq!(backend.buffers[&second], vec![1u8; 32]);
    }

    #[test]
    fn write_after_a_gap_stays_in_place() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 32], 3).unwrap();
        let before = buffer.current();

        assert_eq!(buffer.write(&mut backend, &[5u8; 8], 5).unwrap(), WriteOutcome::InPlace);
        assert_eq!(buffer.current(), before);
        assert_eq!(buffer.last_frame_updated(), Some(5));
        assert_eq!(&backend.buffers[&before.unwrap()][..8], &[5u8; 8]);
    }

    #[test]
    fn rotation_wraps_at_depth() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 3);
        buffer.write(&mut backend, &[0u8; 4], 0).unwrap();
        let mut seen = Vec::new();
        for _ in 0..4 {
            buffer.write(&mut backend, &[1u8; 4], 0).unwrap();
            seen.push(buffer.rotation_index());
        }
        assert_eq!(seen, vec![1, 2, 0, 1]);
    }

    #[test]
    fn growing_write_reallocates_and_resets_rotation() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 16], 0).unwrap();
        buffer.write(&mut backend, &[0u8; 16], 0).unwrap();
        assert_eq!(buffer.rotation_index(), 1);

        let big = [9u8; 128];
        assert_eq!(buffer.write(&mut backend, &big, 0).unwrap(), WriteOutcome::Reallocated);
        assert_eq!(buffer.rotation_index(), 0);
        assert!(buffer.capacity() >= 128);
        assert_eq!(backend.buffers[&buffer.current().unwrap()], big.to_vec());
        assert_eq!(backend.count(|c| matches!(c, Call::DestroyBuffer(_))), 2);
        assert_eq!(backend.buffers.len(), 2);
    }

    #[test]
    fn static_buffers_never_rotate() {
        let mut backend = MockBackend::new();
        let descriptor = BufferDescriptor {
            label: None,
            kind: BufferKind::Index,
            usage: BufferUsage::Default,
            size: 0,
            stride: 4,
        };
        let mut buffer = GpuBuffer::new(&mut backend, &descriptor, 2, true, Some(&[1u8; 12])).unwrap();
        assert_eq!(buffer.state(), BufferState::SingleBuffered);
        let raw = buffer.current();
        assert_eq!(buffer.write(&mut backend, &[2u8; 12], 0).unwrap(), WriteOutcome::InPlace);
        assert_eq!(buffer.write(&mut backend, &[3u8; 12], 0).unwrap(), WriteOutcome::InPlace);
        assert_eq!(buffer.current(), raw);
    }

    #[test]
    fn disabled_double_buffering_writes_in_place() {
        let mut backend = MockBackend::new();
        let descriptor = BufferDescriptor::dynamic_vertex("plain", 0);
        let mut buffer = GpuBuffer::new(&mut backend, &descriptor, 2, false, None).unwrap();
        buffer.write(&mut backend, &[0u8; 4], 0).unwrap();
        assert_eq!(buffer.write(&mut backend, &[0u8; 4], 0).unwrap(), WriteOutcome::InPlace);
        assert_eq!(buffer.rotation_index(), 0);
    }

    #[test]
    fn empty_write_is_a_no_op() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        assert_eq!(buffer.write(&mut backend, &[], 0).unwrap(), WriteOutcome::Empty);
        assert_eq!(buffer.state(), BufferState::Unallocated);
    }

    #[test]
    fn map_failure_is_reported() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 8], 0).unwrap();
        backend.fail_map = true;
        assert!(matches!(
            buffer.write(&mut backend, &[0u8; 8], 5),
            Err(ResourceError::MapFailed(_))
        ));
    }

    #[test]
    fn failed_rotating_write_keeps_current_backing() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 8], 0).unwrap();
        let before = buffer.current();

        backend.fail_map = true;
        assert!(buffer.write(&mut backend, &[1u8; 8], 1).is_err());
        assert_eq!(buffer.current(), before);
        assert_eq!(buffer.rotation_index(), 0);
        assert_eq!(buffer.last_frame_updated(), Some(0));

        backend.fail_map = false;
        assert_eq!(
            buffer.write(&mut backend, &[2u8; 8], 3).unwrap(),
            WriteOutcome::InPlace
        );
        assert_eq!(buffer.current(), before);
    }

    #[test]
    fn release_destroys_cached_layouts() {
        let mut backend = MockBackend::new();
        let mut buffer = dynamic_buffer(&mut backend, 2);
        buffer.write(&mut backend, &[0u8; 8], 0).unwrap();
        let layout = CachedLayout {
            id: VertexLayoutId(99),
            input_layout: InputLayoutId(0),
            streams: [buffer.current(), None, None, None],
        };
        assert_eq!(buffer.set_cached_layout(layout), None);
        assert!(buffer.cached_layout().unwrap().matches(InputLayoutId(0), &layout.streams));

        buffer.release(&mut backend);
        assert_eq!(buffer.state(), BufferState::Unallocated);
        assert!(backend.calls.contains(&Call::DestroyVertexLayout(VertexLayoutId(99))));
        assert!(backend.buffers.is_empty());
    }
}
