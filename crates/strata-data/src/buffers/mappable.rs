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

//! A buffer that stages writes in a CPU mirror.

use std::ops::Range;

use strata_core::renderer::{BufferDescriptor, BufferId, GraphicsDevice, ResourceError};

use super::BufferObject;

/// A device buffer with a full CPU mirror and a dirty byte range.
///
/// Writes only touch the mirror. [`commit`](BufferObject::commit) then uploads
/// nothing if nothing changed, the whole buffer if everything changed, and otherwise
/// exactly the bytes between the lowest and highest write.
#[derive(Debug)]
pub struct MappableBuffer {
    id: BufferId,
    data: Vec<u8>,
    dirty: Option<Range<usize>>,
}

impl MappableBuffer {
    /// Creates the device buffer and a zeroed mirror of the same size.
    pub fn new(
        device: &dyn GraphicsDevice,
        descriptor: &BufferDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_buffer(descriptor)?;
        Ok(Self {
            id,
            data: vec![0; descriptor.size as usize],
            dirty: None,
        })
    }

    /// Returns the byte range that the next commit will upload.
    pub fn dirty_range(&self) -> Option<Range<usize>> {
        self.dirty.clone()
    }

    /// Returns `true` if the mirror holds writes the device has not seen.
    pub fn is_dirty(&self) -> bool {
        self.dirty.is_some()
    }

    /// Returns a read-only view over the mirror.
    pub fn region(&self, start: usize, len: usize) -> &[u8] {
        &self.data[start..start + len]
    }

    fn mark_dirty(&mut self, start: usize, end: usize) {
        if start == end {
            return;
        }
        self.dirty = Some(match self.dirty.take() {
            Some(range) => range.start.min(start)..range.end.max(end),
            None => start..end,
        });
    }
}

impl BufferObject for MappableBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> usize {
        self.data.len()
    }

    fn set_region(
        &mut self,
        _device: &dyn GraphicsDevice,
        start: usize,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let end = start + data.len();
        if end > self.data.len() {
            return Err(ResourceError::OutOfBounds {
                offset: start as u64,
                len: data.len() as u64,
                size: self.data.len() as u64,
            });
        }
        self.data[start..end].copy_from_slice(data);
        self.mark_dirty(start, end);
        Ok(())
    }

    fn read_region(&self, start: usize, len: usize) -> &[u8] {
        self.region(start, len)
    }

    fn region_mut(&mut self, start: usize, len: usize) -> Option<&mut [u8]> {
        self.mark_dirty(start, start + len);
        Some(&mut self.data[start..start + len])
    }

    fn copy_within_region(
        &mut self,
        _device: &dyn GraphicsDevice,
        src: Range<usize>,
        dest: usize,
    ) -> Result<(), ResourceError> {
        let len = src.len();
        self.data.copy_within(src, dest);
        self.mark_dirty(dest, dest + len);
        Ok(())
    }

    fn commit(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        let Some(range) = self.dirty.take() else {
            return Ok(());
        };
        let result = if range.start == 0 && range.end == self.data.len() {
            device.upload_buffer(self.id, &self.data)
        } else {
            device.upload_buffer_range(self.id, range.start as u64, &self.data[range.clone()])
        };
        if result.is_err() {
            self.dirty = Some(range);
        }
        result
    }

    fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        new_size: usize,
    ) -> Result<(), ResourceError> {
        device.resize_buffer(self.id, new_size as u64)?;
        self.data.resize(new_size, 0);
        self.dirty = None;
        device.upload_buffer(self.id, &self.data)
    }

    fn destroy(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        device.destroy_buffer(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::renderer::{BufferTarget, BufferUsageHint};
    use strata_infra::{DeviceCommand, HeadlessDevice};

    fn buffer(device: &HeadlessDevice, size: u64) -> MappableBuffer {
        MappableBuffer::new(
            device,
            &BufferDescriptor {
                label: None,
                size,
                target: BufferTarget::Vertex,
                usage: BufferUsageHint::Dynamic,
            },
        )
        .unwrap()
    }

    fn uploads(device: &HeadlessDevice) -> Vec<DeviceCommand> {
        device
            .commands()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    DeviceCommand::UploadBuffer { .. } | DeviceCommand::UploadBufferRange { .. }
                )
            })
            .collect()
    }

    #[test]
    fn clean_commit_uploads_nothing() {
        let device = HeadlessDevice::new();
        let mut buffer = buffer(&device, 16);
        buffer.commit(&device).unwrap();
        assert!(uploads(&device).is_empty());
    }

    #[test]
    fn commit_uploads_the_span_of_all_writes() {
        let device = HeadlessDevice::new();
        let mut buffer = buffer(&device, 16);
        buffer.set_region(&device, 2, &[1, 1]).unwrap();
        buffer.set_region(&device, 9, &[2]).unwrap();
        assert_eq!(buffer.dirty_range(), Some(2..10));

        buffer.commit(&device).unwrap();
        assert!(!buffer.is_dirty());
        assert_eq!(
            uploads(&device),
            vec![DeviceCommand::UploadBufferRange {
                id: buffer.id(),
                offset: 2,
                len: 8
            }]
        );
        assert_eq!(device.buffer_contents(buffer.id()).unwrap()[9], 2);
    }

    #[test]
    fn commit_of_the_whole_buffer_is_a_full_upload() {
        let device = HeadlessDevice::new();
        let mut buffer = buffer(&device, 4);
        buffer.region_mut(0, 4).unwrap().copy_from_slice(&[4, 3, 2, 1]);
        buffer.commit(&device).unwrap();
        assert_eq!(
            uploads(&device),
            vec![DeviceCommand::UploadBuffer {
                id: buffer.id(),
                len: 4
            }]
        );
        assert_eq!(device.buffer_contents(buffer.id()).unwrap(), vec![4, 3, 2, 1]);
    }

    #[test]
    fn resize_keeps_the_prefix_and_reuploads() {
        let device = HeadlessDevice::new();
        let mut buffer = buffer(&device, 4);
        buffer.set_region(&device, 0, &[1, 2, 3, 4]).unwrap();
        buffer.resize(&device, 6).unwrap();
        assert!(!buffer.is_dirty());
        assert_eq!(buffer.size(), 6);
        assert_eq!(device.buffer_contents(buffer.id()).unwrap(), vec![1, 2, 3, 4, 0, 0]);
    }

    #[test]
    fn writes_past_the_end_are_rejected() {
        let device = HeadlessDevice::new();
        let mut buffer = buffer(&device, 4);
        assert!(matches!(
            buffer.set_region(&device, 3, &[0, 0]),
            Err(ResourceError::OutOfBounds { .. })
        ));
    }
}
