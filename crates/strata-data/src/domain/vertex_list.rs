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

//! Handles and borrowed views onto the vertex lists of a domain.

use bytemuck::Pod;
use strata_core::renderer::{GraphicsDevice, GroupId, ResourceError};

use super::{signed, VertexDomain};

/// A handle to one vertex list inside a [`VertexDomain`].
///
/// The domain owns the list's bookkeeping; the id is only valid for the domain that
/// created it and stops resolving once the list is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexListId {
    pub(crate) index: u32,
    pub(crate) generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct VertexListRecord {
    pub(crate) start: usize,
    pub(crate) count: usize,
    pub(crate) index_start: usize,
    pub(crate) index_count: usize,
    pub(crate) group: GroupId,
}

/// A read-only view of a vertex list.
#[derive(Debug, Clone, Copy)]
pub struct VertexList<'a> {
    pub(crate) domain: &'a VertexDomain,
    pub(crate) id: VertexListId,
    pub(crate) record: VertexListRecord,
}

impl<'a> VertexList<'a> {
    /// The list's handle.
    pub fn id(&self) -> VertexListId {
        self.id
    }

    /// The first vertex of the list in the domain's buffers.
    pub fn start(&self) -> usize {
        self.record.start
    }

    /// The number of vertices in the list.
    pub fn count(&self) -> usize {
        self.record.count
    }

    /// The first index of the list in the domain's index buffer.
    pub fn index_start(&self) -> usize {
        self.record.index_start
    }

    /// The number of indices in the list; 0 for non-indexed domains.
    pub fn index_count(&self) -> usize {
        self.record.index_count
    }

    /// The group the list is drawn with.
    pub fn group(&self) -> GroupId {
        self.record.group
    }

    /// Returns the raw bytes of one attribute for every vertex of the list.
    ///
    /// # Panics
    ///
    /// Panics if the layout has no attribute called `name`.
    pub fn attribute_bytes(&self, name: &str) -> &'a [u8] {
        let (index, stride) = self.domain.attribute_slot(name);
        self.domain.buffers[index].read_region(self.record.start * stride, self.record.count * stride)
    }

    /// Returns one attribute for every vertex of the list, reinterpreted as `T`.
    pub fn attribute<T: Pod>(&self, name: &str) -> Vec<T> {
        self.attribute_bytes(name)
            .chunks_exact(std::mem::size_of::<T>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }

    /// Returns the list's indices relative to its first vertex.
    pub fn indices(&self) -> Vec<u32> {
        match &self.domain.indices {
            Some(indices) => indices
                .read(self.record.index_start, self.record.index_count)
                .into_iter()
                .map(|index| (index as usize).saturating_sub(self.record.start) as u32)
                .collect(),
            None => Vec::new(),
        }
    }
}

/// A writable view of a vertex list.
///
/// Writes to staged attributes land in the domain's CPU mirrors and reach the device
/// on the next draw; writes to static attributes are uploaded immediately, which is
/// why the view carries the device.
#[derive(Debug)]
pub struct VertexListMut<'a> {
    pub(crate) domain: &'a mut VertexDomain,
    pub(crate) device: &'a dyn GraphicsDevice,
    pub(crate) id: VertexListId,
    pub(crate) record: VertexListRecord,
}

impl VertexListMut<'_> {
    /// Returns a read-only view of the same list.
    pub fn as_view(&self) -> VertexList<'_> {
        VertexList {
            domain: &*self.domain,
            id: self.id,
            record: self.record,
        }
    }

    /// Overwrites one attribute for every vertex of the list.
    ///
    /// # Panics
    ///
    /// Panics if the layout has no attribute called `name` or if `data` does not hold
    /// exactly one element per vertex.
    pub fn set_attribute_bytes(&mut self, name: &str, data: &[u8]) -> Result<(), ResourceError> {
        let (index, stride) = self.domain.attribute_slot(name);
        assert_eq!(
            data.len(),
            self.record.count * stride,
            "attribute '{name}' expects {} bytes for {} vertices",
            self.record.count * stride,
            self.record.count
        );
        self.domain.buffers[index].set_region(self.device, self.record.start * stride, data)
    }

    /// Overwrites one attribute for every vertex of the list from typed data.
    pub fn set_attribute<T: Pod>(&mut self, name: &str, data: &[T]) -> Result<(), ResourceError> {
        self.set_attribute_bytes(name, bytemuck::cast_slice(data))
    }

    /// Returns a writable view over one attribute of the list if that attribute is
    /// staged in a CPU mirror. Static attributes return `None`.
    pub fn attribute_bytes_mut(&mut self, name: &str) -> Option<&mut [u8]> {
        let (index, stride) = self.domain.attribute_slot(name);
        self.domain.buffers[index]
            .region_mut(self.record.start * stride, self.record.count * stride)
    }

    /// Writes the list's indices, given relative to its first vertex.
    ///
    /// Fails with [`ResourceError::IndexOutOfRange`] if an absolute index does not fit
    /// the domain's index format.
    ///
    /// # Panics
    ///
    /// Panics if the domain is not indexed, if `indices` does not hold exactly
    /// `index_count` values, or if an index points past the list's last vertex.
    pub fn set_indices(&mut self, indices: &[u32]) -> Result<(), ResourceError> {
        let record = self.record;
        let Some(data) = self.domain.indices.as_mut() else {
            panic!("set_indices called on a non-indexed domain");
        };
        assert_eq!(
            indices.len(),
            record.index_count,
            "vertex list holds {} indices",
            record.index_count
        );
        let base = signed(record.start);
        let absolute: Vec<i64> = indices
            .iter()
            .map(|&index| {
                assert!(
                    (index as usize) < record.count,
                    "index {index} is out of range for a list of {} vertices",
                    record.count
                );
                base + i64::from(index)
            })
            .collect();
        data.write(self.device, record.index_start, &absolute)
    }
}
