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
use crate::renderer::group::StateKey;
use std::fmt::Debug;

/// The boundary between the batched vertex renderer and a concrete graphics backend.
///
/// Every call is synchronous and issued from the rendering thread. Implementations
/// typically wrap a context with interior mutability, which is why all methods take
/// `&self`.
pub trait GraphicsDevice: Debug {
    /// Creates a new GPU buffer.
    /// ## Arguments
    /// * `descriptor` - A reference to a `BufferDescriptor` containing the buffer configuration.
    /// ## Returns
    /// A `Result` containing the ID of the created buffer or an error if the creation fails.
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError>;

    /// Destroys a GPU buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to be destroyed.
    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError>;

    /// Replaces the whole contents of a buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `data` - The new contents; its length must equal the buffer size.
    fn upload_buffer(&self, id: BufferId, data: &[u8]) -> Result<(), ResourceError>;

    /// Writes a sub-range of a buffer.
    /// ## Arguments
    /// * `id` - The ID of the buffer to write to.
    /// * `offset` - The byte offset in the buffer where the data will be written.
    /// * `data` - A slice of bytes containing the data to be written.
    fn upload_buffer_range(&self, id: BufferId, offset: u64, data: &[u8])
        -> Result<(), ResourceError>;

    /// Reallocates the storage of a buffer to `new_size` bytes.
    ///
    /// The leading `min(old, new)` bytes are preserved.
    fn resize_buffer(&self, id: BufferId, new_size: u64) -> Result<(), ResourceError>;

    /// Binds a vertex buffer as the source of `attribute`.
    fn bind_vertex_buffer(
        &self,
        id: BufferId,
        attribute: &VertexAttribute,
    ) -> Result<(), ResourceError>;

    /// Binds the index buffer used by subsequent indexed draws.
    fn bind_index_buffer(&self, id: BufferId, format: IndexFormat) -> Result<(), ResourceError>;

    /// Draws `count` vertices starting at vertex `first`.
    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize)
        -> Result<(), ResourceError>;

    /// Draws several vertex ranges in a single call.
    /// ## Arguments
    /// * `firsts` - The first vertex of every range.
    /// * `counts` - The vertex count of every range, parallel to `firsts`.
    fn draw_arrays_multi(
        &self,
        mode: DrawMode,
        firsts: &[usize],
        counts: &[usize],
    ) -> Result<(), ResourceError>;

    /// Draws `instances` instances of a vertex range.
    fn draw_arrays_instanced(
        &self,
        mode: DrawMode,
        first: usize,
        count: usize,
        instances: usize,
    ) -> Result<(), ResourceError>;

    /// Draws `count` indices read from the bound index buffer at `byte_offset`.
    fn draw_elements(
        &self,
        mode: DrawMode,
        count: usize,
        format: IndexFormat,
        byte_offset: u64,
    ) -> Result<(), ResourceError>;

    /// Draws several index ranges in a single call.
    /// ## Arguments
    /// * `counts` - The index count of every range.
    /// * `byte_offsets` - The byte offset of every range in the index buffer, parallel to `counts`.
    fn draw_elements_multi(
        &self,
        mode: DrawMode,
        counts: &[usize],
        format: IndexFormat,
        byte_offsets: &[u64],
    ) -> Result<(), ResourceError>;

    /// Applies one piece of render state (binds a program, a texture, enables blending...).
    fn apply_state(&self, state: &StateKey) -> Result<(), ResourceError>;

    /// Restores one piece of render state to its default.
    fn reset_state(&self, state: &StateKey) -> Result<(), ResourceError>;
}
