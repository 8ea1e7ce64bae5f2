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

//! A buffer that uploads every write as it happens.

use std::ops::Range;

use strata_core::renderer::{BufferDescriptor, BufferId, GraphicsDevice, ResourceError};

use super::BufferObject;

/// A device buffer whose writes go straight to the device.
///
/// A shadow copy is kept so that regions can be read back and moved, but there is
/// never anything left to commit.
#[derive(Debug)]
pub struct ImmediateBuffer {
    id: BufferId,
    shadow: Vec<u8>,
}

impl ImmediateBuffer {
    /// Creates the device buffer.
    pub fn new(
        device: &dyn GraphicsDevice,
        descriptor: &BufferDescriptor,
    ) -> Result<Self, ResourceError> {
        let id = device.create_buffer(descriptor)?;
        Ok(Self {
            id,
            shadow: vec![0; descriptor.size as usize],
        })
    }
}

impl BufferObject for ImmediateBuffer {
    fn id(&self) -> BufferId {
        self.id
    }

    fn size(&self) -> usize {
        self.shadow.len()
    }

    fn set_region(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        if data.is_empty() {
            return Ok(());
        }
        device.upload_buffer_range(self.id, start as u64, data)?;
        self.shadow[start..start + data.len()].copy_from_slice(data);
        Ok(())
    }

    fn read_region(&self, start: usize, len: usize) -> &[u8] {
        &self.shadow[start..start + len]
    }

    fn copy_within_region(
        &mut self,
        device: &dyn GraphicsDevice,
        src: Range<usize>,
        dest: usize,
    ) -> Result<(), ResourceError> {
        let len = src.len();
        if len == 0 {
            return Ok(());
        }
        self.shadow.copy_within(src, dest);
        device.upload_buffer_range(self.id, dest as u64, &self.shadow[dest..dest + len])
    }

    fn commit(&mut self, _device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        Ok(())
    }

    fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        new_size: usize,
    ) -> Result<(), ResourceError> {
        device.resize_buffer(self.id, new_size as u64)?;
        self.shadow.resize(new_size, 0);
        device.upload_buffer(self.id, &self.shadow)
    }

    fn destroy(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        device.destroy_buffer(self.id)
    }
}
