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

//! The in-memory [`GraphicsDevice`] implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use strata_core::renderer::{
    BufferDescriptor, BufferId, BufferTarget, DrawMode, GraphicsDevice, IndexFormat,
    ResourceError, StateKey, VertexAttribute,
};

/// One call received by a [`HeadlessDevice`], in the order it was received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCommand {
    /// A buffer was created.
    CreateBuffer {
        /// The id handed out for the buffer.
        id: BufferId,
        /// Its size in bytes.
        size: u64,
        /// Its binding point.
        target: BufferTarget,
    },
    /// A buffer was destroyed.
    DestroyBuffer(BufferId),
    /// A whole buffer was uploaded.
    UploadBuffer {
        /// The uploaded buffer.
        id: BufferId,
        /// The number of bytes uploaded.
        len: usize,
    },
    /// A byte range of a buffer was uploaded.
    UploadBufferRange {
        /// The uploaded buffer.
        id: BufferId,
        /// The first byte written.
        offset: u64,
        /// The number of bytes written.
        len: usize,
    },
    /// A buffer changed size.
    ResizeBuffer {
        /// The resized buffer.
        id: BufferId,
        /// The new size in bytes.
        size: u64,
    },
    /// A buffer was bound as a vertex attribute source.
    BindVertexBuffer {
        /// The bound buffer.
        id: BufferId,
        /// The shader location it feeds.
        location: u32,
    },
    /// A buffer was bound as the index source.
    BindIndexBuffer {
        /// The bound buffer.
        id: BufferId,
        /// The format of its indices.
        format: IndexFormat,
    },
    /// A non-indexed draw of one or more vertex ranges.
    DrawArrays {
        /// The primitive topology.
        mode: DrawMode,
        /// `(first, count)` for every range drawn by the call.
        ranges: Vec<(usize, usize)>,
        /// The number of instances, 1 for non-instanced draws.
        instances: usize,
    },
    /// An indexed draw of one or more index ranges.
    DrawElements {
        /// The primitive topology.
        mode: DrawMode,
        /// The index format.
        format: IndexFormat,
        /// `(first index, count)` for every range drawn by the call.
        ranges: Vec<(usize, usize)>,
    },
    /// A render state was applied.
    ApplyState(StateKey),
    /// A render state was reset.
    ResetState(StateKey),
}

impl DeviceCommand {
    /// Returns `true` for the draw variants.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            DeviceCommand::DrawArrays { .. } | DeviceCommand::DrawElements { .. }
        )
    }
}

/// A draw call together with the render state that was active when it ran.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDraw {
    /// The draw command itself.
    pub command: DeviceCommand,
    /// Every state applied at the time of the draw, in application order.
    pub states: Vec<StateKey>,
}

#[derive(Debug)]
struct HeadlessBufferEntry {
    data: Vec<u8>,
    target: BufferTarget,
}

#[derive(Debug, Default)]
struct Bindings {
    vertex: HashMap<u32, (BufferId, usize)>,
    index: Option<(BufferId, IndexFormat)>,
    // Set by a draw; the next bind starts a fresh vertex binding set.
    consumed: bool,
}

/// A [`GraphicsDevice`] that keeps everything in memory.
///
/// Buffers are plain byte vectors, render state is a stack of [`StateKey`]s, and every
/// call is appended to a command log. Draws are validated against the bound buffers so
/// that a draw reading past the end of a buffer fails the same way a strict driver would.
#[derive(Debug, Default)]
pub struct HeadlessDevice {
    buffers: Mutex<HashMap<BufferId, HeadlessBufferEntry>>,
    bindings: Mutex<Bindings>,
    states: Mutex<Vec<StateKey>>,
    commands: Mutex<Vec<DeviceCommand>>,
    draws: Mutex<Vec<RecordedDraw>>,
    next_buffer_id: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl HeadlessDevice {
    /// Creates an empty device.
    pub fn new() -> Self {
        Self::default()
    }

    fn record(&self, command: DeviceCommand) {
        log::trace!("HeadlessDevice: {command:?}");
        if command.is_draw() {
            let states = lock(&self.states).clone();
            lock(&self.draws).push(RecordedDraw {
                command: command.clone(),
                states,
            });
            lock(&self.bindings).consumed = true;
        }
        lock(&self.commands).push(command);
    }

    /// Returns a copy of a buffer's current contents.
    pub fn buffer_contents(&self, id: BufferId) -> Option<Vec<u8>> {
        lock(&self.buffers).get(&id).map(|entry| entry.data.clone())
    }

    /// Returns the number of live buffers.
    pub fn buffer_count(&self) -> usize {
        lock(&self.buffers).len()
    }

    /// Returns the ids of the live buffers created for `target`, in ascending order.
    pub fn buffers_for(&self, target: BufferTarget) -> Vec<BufferId> {
        let mut ids: Vec<BufferId> = lock(&self.buffers)
            .iter()
            .filter(|(_, entry)| entry.target == target)
            .map(|(id, _)| *id)
            .collect();
        ids.sort();
        ids
    }

    /// Returns every call received since the log was last cleared.
    pub fn commands(&self) -> Vec<DeviceCommand> {
        lock(&self.commands).clone()
    }

    /// Returns every draw received since the log was last cleared.
    pub fn draws(&self) -> Vec<RecordedDraw> {
        lock(&self.draws).clone()
    }

    /// Returns the states that are currently applied, in application order.
    pub fn active_states(&self) -> Vec<StateKey> {
        lock(&self.states).clone()
    }

    /// Clears the command and draw logs. Buffers and state are kept.
    pub fn clear_commands(&self) {
        lock(&self.commands).clear();
        lock(&self.draws).clear();
    }

    fn check_vertex_range(&self, first: usize, count: usize) -> Result<(), ResourceError> {
        let bindings = lock(&self.bindings);
        let buffers = lock(&self.buffers);
        for (id, stride) in bindings.vertex.values() {
            let entry = buffers.get(id).ok_or(ResourceError::BufferNotFound(*id))?;
            let offset = (first * stride) as u64;
            let len = (count * stride) as u64;
            if offset + len > entry.data.len() as u64 {
                return Err(ResourceError::OutOfBounds {
                    offset,
                    len,
                    size: entry.data.len() as u64,
                });
            }
        }
        Ok(())
    }

    fn check_index_range(
        &self,
        format: IndexFormat,
        byte_offset: u64,
        count: usize,
    ) -> Result<(), ResourceError> {
        let bindings = lock(&self.bindings);
        let (id, bound_format) = bindings.index.ok_or_else(|| {
            ResourceError::BackendError("indexed draw without an index buffer".to_string())
        })?;
        if bound_format != format {
            return Err(ResourceError::BackendError(format!(
                "index buffer bound as {bound_format:?} but drawn as {format:?}"
            )));
        }
        let buffers = lock(&self.buffers);
        let entry = buffers.get(&id).ok_or(ResourceError::BufferNotFound(id))?;
        let len = (count * format.size()) as u64;
        if byte_offset + len > entry.data.len() as u64 {
            return Err(ResourceError::OutOfBounds {
                offset: byte_offset,
                len,
                size: entry.data.len() as u64,
            });
        }
        Ok(())
    }

    fn element_ranges(
        format: IndexFormat,
        counts: &[usize],
        byte_offsets: &[u64],
    ) -> Vec<(usize, usize)> {
        byte_offsets
            .iter()
            .zip(counts)
            .map(|(&offset, &count)| (offset as usize / format.size(), count))
            .collect()
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn create_buffer(&self, descriptor: &BufferDescriptor) -> Result<BufferId, ResourceError> {
        let id = BufferId(self.next_buffer_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.buffers).insert(
            id,
            HeadlessBufferEntry {
                data: vec![0; descriptor.size as usize],
                target: descriptor.target,
            },
        );
        log::debug!(
            "HeadlessDevice: Created buffer {:?} ({:?}, {} bytes, label: {:?})",
            id,
            descriptor.target,
            descriptor.size,
            descriptor.label
        );
        self.record(DeviceCommand::CreateBuffer {
            id,
            size: descriptor.size,
            target: descriptor.target,
        });
        Ok(id)
    }

    fn destroy_buffer(&self, id: BufferId) -> Result<(), ResourceError> {
        if lock(&self.buffers).remove(&id).is_none() {
            return Err(ResourceError::BufferNotFound(id));
        }
        log::debug!("HeadlessDevice: Destroyed buffer {id:?}");
        self.record(DeviceCommand::DestroyBuffer(id));
        Ok(())
    }

    fn upload_buffer(&self, id: BufferId, data: &[u8]) -> Result<(), ResourceError> {
        {
            let mut buffers = lock(&self.buffers);
            let entry = buffers
                .get_mut(&id)
                .ok_or(ResourceError::BufferNotFound(id))?;
            if data.len() != entry.data.len() {
                return Err(ResourceError::OutOfBounds {
                    offset: 0,
                    len: data.len() as u64,
                    size: entry.data.len() as u64,
                });
            }
            entry.data.copy_from_slice(data);
        }
        self.record(DeviceCommand::UploadBuffer {
            id,
            len: data.len(),
        });
        Ok(())
    }

    fn upload_buffer_range(
        &self,
        id: BufferId,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        {
            let mut buffers = lock(&self.buffers);
            let entry = buffers
                .get_mut(&id)
                .ok_or(ResourceError::BufferNotFound(id))?;
            let end = offset + data.len() as u64;
            if end > entry.data.len() as u64 {
                return Err(ResourceError::OutOfBounds {
                    offset,
                    len: data.len() as u64,
                    size: entry.data.len() as u64,
                });
            }
            entry.data[offset as usize..end as usize].copy_from_slice(data);
        }
        self.record(DeviceCommand::UploadBufferRange {
            id,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn resize_buffer(&self, id: BufferId, size: u64) -> Result<(), ResourceError> {
        {
            let mut buffers = lock(&self.buffers);
            let entry = buffers
                .get_mut(&id)
                .ok_or(ResourceError::BufferNotFound(id))?;
            entry.data.resize(size as usize, 0);
        }
        log::debug!("HeadlessDevice: Resized buffer {id:?} to {size} bytes");
        self.record(DeviceCommand::ResizeBuffer { id, size });
        Ok(())
    }

    fn bind_vertex_buffer(
        &self,
        id: BufferId,
        attribute: &VertexAttribute,
    ) -> Result<(), ResourceError> {
        if !lock(&self.buffers).contains_key(&id) {
            return Err(ResourceError::BufferNotFound(id));
        }
        {
            let mut bindings = lock(&self.bindings);
            if bindings.consumed {
                bindings.vertex.clear();
                bindings.consumed = false;
            }
            bindings
                .vertex
                .insert(attribute.shader_location, (id, attribute.stride()));
        }
        self.record(DeviceCommand::BindVertexBuffer {
            id,
            location: attribute.shader_location,
        });
        Ok(())
    }

    fn bind_index_buffer(&self, id: BufferId, format: IndexFormat) -> Result<(), ResourceError> {
        if !lock(&self.buffers).contains_key(&id) {
            return Err(ResourceError::BufferNotFound(id));
        }
        lock(&self.bindings).index = Some((id, format));
        self.record(DeviceCommand::BindIndexBuffer { id, format });
        Ok(())
    }

    fn draw_arrays(&self, mode: DrawMode, first: usize, count: usize) -> Result<(), ResourceError> {
        self.check_vertex_range(first, count)?;
        self.record(DeviceCommand::DrawArrays {
            mode,
            ranges: vec![(first, count)],
            instances: 1,
        });
        Ok(())
    }

    fn draw_arrays_multi(
        &self,
        mode: DrawMode,
        firsts: &[usize],
        counts: &[usize],
    ) -> Result<(), ResourceError> {
        if firsts.len() != counts.len() {
            return Err(ResourceError::BackendError(
                "multi-draw with mismatched first/count arrays".to_string(),
            ));
        }
        for (&first, &count) in firsts.iter().zip(counts) {
            self.check_vertex_range(first, count)?;
        }
        self.record(DeviceCommand::DrawArrays {
            mode,
            ranges: firsts.iter().copied().zip(counts.iter().copied()).collect(),
            instances: 1,
        });
        Ok(())
    }

    fn draw_arrays_instanced(
        &self,
        mode: DrawMode,
        first: usize,
        count: usize,
        instances: usize,
    ) -> Result<(), ResourceError> {
        self.check_vertex_range(first, count)?;
        self.record(DeviceCommand::DrawArrays {
            mode,
            ranges: vec![(first, count)],
            instances,
        });
        Ok(())
    }

    fn draw_elements(
        &self,
        mode: DrawMode,
        count: usize,
        format: IndexFormat,
        byte_offset: u64,
    ) -> Result<(), ResourceError> {
        self.check_index_range(format, byte_offset, count)?;
        self.record(DeviceCommand::DrawElements {
            mode,
            format,
            ranges: Self::element_ranges(format, &[count], &[byte_offset]),
        });
        Ok(())
    }

    fn draw_elements_multi(
        &self,
        mode: DrawMode,
        counts: &[usize],
        format: IndexFormat,
        byte_offsets: &[u64],
    ) -> Result<(), ResourceError> {
        if byte_offsets.len() != counts.len() {
            return Err(ResourceError::BackendError(
                "multi-draw with mismatched count/offset arrays".to_string(),
            ));
        }
        for (&offset, &count) in byte_offsets.iter().zip(counts) {
            self.check_index_range(format, offset, count)?;
        }
        self.record(DeviceCommand::DrawElements {
            mode,
            format,
            ranges: Self::element_ranges(format, counts, byte_offsets),
        });
        Ok(())
    }

    fn apply_state(&self, state: &StateKey) -> Result<(), ResourceError> {
        lock(&self.states).push(*state);
        self.record(DeviceCommand::ApplyState(*state));
        Ok(())
    }

    fn reset_state(&self, state: &StateKey) -> Result<(), ResourceError> {
        {
            let mut states = lock(&self.states);
            let position = states.iter().rposition(|s| s == state).ok_or_else(|| {
                ResourceError::BackendError(format!("reset of inactive state {state:?}"))
            })?;
            states.remove(position);
        }
        self.record(DeviceCommand::ResetState(*state));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::{BufferUsageHint, StateKind, VertexFormat};

    fn vertex_buffer(device: &HeadlessDevice, size: u64) -> BufferId {
        device
            .create_buffer(&BufferDescriptor {
                label: Some("test".into()),
                size,
                target: BufferTarget::Vertex,
                usage: BufferUsageHint::Dynamic,
            })
            .unwrap()
    }

    #[test]
    fn uploads_land_in_buffer_contents() {
        let device = HeadlessDevice::new();
        let id = vertex_buffer(&device, 8);
        device.upload_buffer_range(id, 2, &[1, 2, 3]).unwrap();
        assert_eq!(device.buffer_contents(id).unwrap(), vec![0, 0, 1, 2, 3, 0, 0, 0]);

        device.resize_buffer(id, 4).unwrap();
        assert_eq!(device.buffer_contents(id).unwrap(), vec![0, 0, 1, 2]);
        assert!(matches!(
            device.upload_buffer_range(id, 3, &[9, 9]),
            Err(ResourceError::OutOfBounds { offset: 3, len: 2, size: 4 })
        ));
    }

    #[test]
    fn destroying_twice_fails() {
        let device = HeadlessDevice::new();
        let id = vertex_buffer(&device, 4);
        device.destroy_buffer(id).unwrap();
        assert!(matches!(
            device.destroy_buffer(id),
            Err(ResourceError::BufferNotFound(_))
        ));
        assert_eq!(device.buffer_count(), 0);
    }

    #[test]
    fn draws_are_checked_against_bound_buffers() {
        let device = HeadlessDevice::new();
        let id = vertex_buffer(&device, 24);
        let position = VertexAttribute::new("position", 0, VertexFormat::Float32x2);
        device.bind_vertex_buffer(id, &position).unwrap();
        device.draw_arrays(DrawMode::TriangleList, 0, 3).unwrap();
        assert!(device.draw_arrays(DrawMode::TriangleList, 1, 3).is_err());
    }

    #[test]
    fn indexed_draws_need_an_index_buffer() {
        let device = HeadlessDevice::new();
        assert!(device
            .draw_elements(DrawMode::TriangleList, 3, IndexFormat::Uint16, 0)
            .is_err());
    }

    #[test]
    fn draws_capture_the_active_states() {
        let device = HeadlessDevice::new();
        let program = StateKey::new(StateKind::Program, 7);
        device.apply_state(&program).unwrap();
        device.draw_arrays(DrawMode::PointList, 0, 0).unwrap();
        device.reset_state(&program).unwrap();
        assert!(device.reset_state(&program).is_err());

        let draws = device.draws();
        assert_eq!(draws.len(), 1);
        assert_eq!(draws[0].states, vec![program]);
        assert!(device.active_states().is_empty());
    }
}
