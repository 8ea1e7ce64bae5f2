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

//! Device buffers with CPU-side bookkeeping.
//!
//! A vertex domain stores each attribute, and its indices, in a [`BufferObject`].
//! [`MappableBuffer`] stages writes in a mirror and uploads the dirty bytes once per
//! draw; [`ImmediateBuffer`] uploads every write as it happens.

mod immediate;
mod mappable;

pub use self::immediate::ImmediateBuffer;
pub use self::mappable::MappableBuffer;

use std::fmt::Debug;
use std::ops::Range;

use strata_core::renderer::{
    BufferDescriptor, BufferId, GraphicsDevice, IndexFormat, ResourceError, VertexAttribute,
};

/// What a buffer is bound as before drawing.
#[derive(Debug, Clone, Copy)]
pub enum BufferBinding<'a> {
    /// A vertex attribute source.
    Vertex(&'a VertexAttribute),
    /// The index source.
    Index(IndexFormat),
}

/// A device buffer whose contents are also kept on the CPU.
///
/// Offsets and lengths are in bytes.
pub trait BufferObject: Debug {
    /// The device handle of the buffer.
    fn id(&self) -> BufferId;

    /// The size of the buffer in bytes.
    fn size(&self) -> usize;

    /// Writes `data` at byte offset `start`.
    fn set_region(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Returns the current contents of `[start, start + len)`.
    fn read_region(&self, start: usize, len: usize) -> &[u8];

    /// Returns a writable view over `[start, start + len)` if the buffer stages
    /// writes, marking the range for upload.
    fn region_mut(&mut self, _start: usize, _len: usize) -> Option<&mut [u8]> {
        None
    }

    /// Copies the bytes in `src` to byte offset `dest` within the buffer.
    fn copy_within_region(
        &mut self,
        device: &dyn GraphicsDevice,
        src: Range<usize>,
        dest: usize,
    ) -> Result<(), ResourceError>;

    /// Makes the device copy match every write made so far.
    fn commit(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError>;

    /// Changes the size of the buffer, keeping the first `min(old, new)` bytes.
    fn resize(&mut self, device: &dyn GraphicsDevice, new_size: usize)
        -> Result<(), ResourceError>;

    /// Releases the device buffer.
    fn destroy(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError>;

    /// Commits pending writes and binds the buffer for drawing.
    fn bind(
        &mut self,
        device: &dyn GraphicsDevice,
        binding: BufferBinding<'_>,
    ) -> Result<(), ResourceError> {
        self.commit(device)?;
        match binding {
            BufferBinding::Vertex(attribute) => device.bind_vertex_buffer(self.id(), attribute),
            BufferBinding::Index(format) => device.bind_index_buffer(self.id(), format),
        }
    }
}

/// Creates a [`MappableBuffer`] when `mapped` is set and an [`ImmediateBuffer`] otherwise.
pub fn create_buffer(
    device: &dyn GraphicsDevice,
    descriptor: &BufferDescriptor,
    mapped: bool,
) -> Result<Box<dyn BufferObject>, ResourceError> {
    Ok(if mapped {
        Box::new(MappableBuffer::new(device, descriptor)?)
    } else {
        Box::new(ImmediateBuffer::new(device, descriptor)?)
    })
}
