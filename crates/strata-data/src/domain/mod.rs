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

//! Vertex domains: shared storage for many vertex lists with one layout.
//!
//! A [`VertexDomain`] owns a [`RangeAllocator`] that places vertices, one buffer per
//! attribute, and for indexed domains a second allocator and an index buffer. Every
//! list created in the domain is a contiguous run of vertices (and indices) in that
//! storage, tagged with the [`GroupId`] it is drawn with.
//!
//! Allocations never fail for lack of space: when the allocator reports that a
//! request does not fit, the domain grows the allocator and every buffer in lockstep
//! and retries.

mod vertex_list;

pub use self::vertex_list::{VertexList, VertexListId, VertexListMut};

use std::borrow::Cow;
use std::collections::BTreeMap;

use strata_core::renderer::{
    AllocationSettings, BufferDescriptor, BufferId, BufferTarget, BufferUsageHint, DrawMode,
    GraphicsDevice, GroupId, GrowthPolicy, IndexFormat, IndexStorage, ResourceError,
    VertexLayout,
};

use self::vertex_list::VertexListRecord;
use crate::allocators::RangeAllocator;
use crate::buffers::{create_buffer, BufferBinding, BufferObject};

#[derive(Debug)]
pub(crate) struct IndexData {
    format: IndexFormat,
    allocator: RangeAllocator,
    buffer: Box<dyn BufferObject>,
}

impl IndexData {
    fn grow(
        &mut self,
        device: &dyn GraphicsDevice,
        growth: GrowthPolicy,
        requested: usize,
    ) -> Result<(), ResourceError> {
        let capacity = growth.grow(requested).max(requested);
        log::debug!(
            "Growing index storage from {} to {} indices",
            self.allocator.capacity(),
            capacity
        );
        self.buffer.resize(device, capacity * self.format.size())?;
        self.allocator.set_capacity(capacity);
        Ok(())
    }

    fn safe_alloc(
        &mut self,
        device: &dyn GraphicsDevice,
        growth: GrowthPolicy,
        count: usize,
    ) -> Result<usize, ResourceError> {
        loop {
            match self.allocator.alloc(count) {
                Ok(start) => return Ok(start),
                Err(err) => self.grow(device, growth, err.requested_capacity)?,
            }
        }
    }

    fn safe_realloc(
        &mut self,
        device: &dyn GraphicsDevice,
        growth: GrowthPolicy,
        start: usize,
        count: usize,
        new_count: usize,
    ) -> Result<usize, ResourceError> {
        loop {
            match self.allocator.realloc(start, count, new_count) {
                Ok(new_start) => return Ok(new_start),
                Err(err) => self.grow(device, growth, err.requested_capacity)?,
            }
        }
    }

    pub(crate) fn read(&self, start: usize, count: usize) -> Vec<u32> {
        let size = self.format.size();
        self.format
            .decode(self.buffer.read_region(start * size, count * size))
    }

    /// Writes absolute indices starting at index slot `start`.
    ///
    /// Fails without writing anything if a value does not fit the index format.
    pub(crate) fn write(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        indices: &[i64],
    ) -> Result<(), ResourceError> {
        let max = i64::from(self.format.max_value());
        let mut values = Vec::with_capacity(indices.len());
        for &index in indices {
            if !(0..=max).contains(&index) {
                return Err(ResourceError::IndexOutOfRange {
                    index,
                    format: self.format,
                });
            }
            values.push(index as u32);
        }
        let mut bytes = vec![0; values.len() * self.format.size()];
        self.format.encode_into(&values, &mut bytes);
        self.buffer
            .set_region(device, start * self.format.size(), &bytes)
    }

    /// Reads `count` stored indices and moves them from one vertex base to another.
    fn rebased(&self, start: usize, count: usize, old_base: usize, new_base: usize) -> Vec<i64> {
        let delta = signed(new_base) - signed(old_base);
        self.read(start, count)
            .into_iter()
            .map(|index| i64::from(index) + delta)
            .collect()
    }

    /// Shifts `count` stored indices from one vertex base to another.
    fn rebase(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        count: usize,
        old_base: usize,
        new_base: usize,
    ) -> Result<(), ResourceError> {
        let rebased = self.rebased(start, count, old_base, new_base);
        self.write(device, start, &rebased)
    }

    /// Points `count` index slots at the list's first vertex.
    fn fill(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        count: usize,
        vertex: usize,
    ) -> Result<(), ResourceError> {
        if count == 0 {
            return Ok(());
        }
        self.write(device, start, &vec![signed(vertex); count])
    }
}

/// Converts a slot position for index arithmetic. Positions past `i64::MAX` saturate
/// and are then rejected by [`IndexData::write`].
pub(crate) fn signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[derive(Debug)]
struct ListSlot {
    generation: u32,
    record: Option<VertexListRecord>,
}

/// Shared vertex (and index) storage for every list with one layout and draw mode.
#[derive(Debug)]
pub struct VertexDomain {
    layout: VertexLayout,
    mode: DrawMode,
    growth: GrowthPolicy,
    allocator: RangeAllocator,
    buffers: Vec<Box<dyn BufferObject>>,
    indices: Option<IndexData>,
    lists: Vec<ListSlot>,
    free_slots: Vec<u32>,
    group_lists: BTreeMap<GroupId, Vec<VertexListId>>,
}

impl VertexDomain {
    /// Creates a non-indexed domain.
    pub fn new(
        device: &dyn GraphicsDevice,
        layout: VertexLayout,
        mode: DrawMode,
        settings: &AllocationSettings,
    ) -> Result<Self, ResourceError> {
        Self::build(device, layout, mode, None, settings)
    }

    /// Creates an indexed domain whose indices are stored as `index_format`.
    pub fn new_indexed(
        device: &dyn GraphicsDevice,
        layout: VertexLayout,
        mode: DrawMode,
        index_format: IndexFormat,
        settings: &AllocationSettings,
    ) -> Result<Self, ResourceError> {
        Self::build(device, layout, mode, Some(index_format), settings)
    }

    fn build(
        device: &dyn GraphicsDevice,
        layout: VertexLayout,
        mode: DrawMode,
        index_format: Option<IndexFormat>,
        settings: &AllocationSettings,
    ) -> Result<Self, ResourceError> {
        let capacity = settings.initial_vertex_capacity;
        let mut buffers = Vec::with_capacity(layout.len());
        for attribute in layout.attributes() {
            let descriptor = BufferDescriptor {
                label: Some(Cow::Owned(format!("{} vertex buffer", attribute.name))),
                size: (capacity * attribute.stride()) as u64,
                target: BufferTarget::Vertex,
                usage: attribute.usage,
            };
            buffers.push(create_buffer(device, &descriptor, attribute.usage.is_mapped())?);
        }

        let indices = match index_format {
            Some(format) => {
                let capacity = settings.initial_index_capacity;
                let mapped = settings.index_storage == IndexStorage::Mapped;
                let descriptor = BufferDescriptor {
                    label: Some(Cow::Borrowed("index buffer")),
                    size: (capacity * format.size()) as u64,
                    target: BufferTarget::Index,
                    usage: if mapped {
                        BufferUsageHint::Dynamic
                    } else {
                        BufferUsageHint::Static
                    },
                };
                Some(IndexData {
                    format,
                    allocator: RangeAllocator::new(capacity),
                    buffer: create_buffer(device, &descriptor, mapped)?,
                })
            }
            None => None,
        };

        log::debug!(
            "Created vertex domain: {} attributes, {:?}, indexed: {:?}",
            layout.len(),
            mode,
            index_format
        );

        Ok(Self {
            layout,
            mode,
            growth: settings.growth,
            allocator: RangeAllocator::new(capacity),
            buffers,
            indices,
            lists: Vec::new(),
            free_slots: Vec::new(),
            group_lists: BTreeMap::new(),
        })
    }

    // --- Allocation ---

    fn grow_vertices(
        &mut self,
        device: &dyn GraphicsDevice,
        requested: usize,
    ) -> Result<(), ResourceError> {
        let capacity = self.growth.grow(requested).max(requested);
        log::debug!(
            "Growing vertex domain from {} to {} vertices",
            self.allocator.capacity(),
            capacity
        );
        for (buffer, attribute) in self.buffers.iter_mut().zip(self.layout.attributes()) {
            buffer.resize(device, capacity * attribute.stride())?;
        }
        self.allocator.set_capacity(capacity);
        Ok(())
    }

    fn safe_alloc(
        &mut self,
        device: &dyn GraphicsDevice,
        count: usize,
    ) -> Result<usize, ResourceError> {
        loop {
            match self.allocator.alloc(count) {
                Ok(start) => return Ok(start),
                Err(err) => self.grow_vertices(device, err.requested_capacity)?,
            }
        }
    }

    fn safe_realloc(
        &mut self,
        device: &dyn GraphicsDevice,
        start: usize,
        count: usize,
        new_count: usize,
    ) -> Result<usize, ResourceError> {
        loop {
            match self.allocator.realloc(start, count, new_count) {
                Ok(new_start) => return Ok(new_start),
                Err(err) => self.grow_vertices(device, err.requested_capacity)?,
            }
        }
    }

    fn insert_record(&mut self, record: VertexListRecord) -> VertexListId {
        if let Some(index) = self.free_slots.pop() {
            let slot = &mut self.lists[index as usize];
            slot.record = Some(record);
            VertexListId {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.lists.len() as u32;
            self.lists.push(ListSlot {
                generation: 0,
                record: Some(record),
            });
            VertexListId {
                index,
                generation: 0,
            }
        }
    }

    fn record(&self, id: VertexListId) -> VertexListRecord {
        self.lists
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record)
            .unwrap_or_else(|| panic!("vertex list {id:?} does not belong to this domain"))
    }

    fn record_mut(&mut self, id: VertexListId) -> &mut VertexListRecord {
        self.lists
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.record.as_mut())
            .unwrap_or_else(|| panic!("vertex list {id:?} does not belong to this domain"))
    }

    fn unregister(&mut self, id: VertexListId, group: GroupId) {
        if let Some(lists) = self.group_lists.get_mut(&group) {
            lists.retain(|list| *list != id);
            if lists.is_empty() {
                self.group_lists.remove(&group);
            }
        }
    }

    /// Allocates a list of `count` vertices (and `index_count` indices) drawn with
    /// `group`.
    ///
    /// # Panics
    ///
    /// Panics if `index_count` is non-zero for a non-indexed domain.
    pub fn create(
        &mut self,
        device: &dyn GraphicsDevice,
        count: usize,
        group: GroupId,
        index_count: usize,
    ) -> Result<VertexListId, ResourceError> {
        assert!(
            self.indices.is_some() || index_count == 0,
            "indices requested from a non-indexed domain"
        );
        let start = self.safe_alloc(device, count)?;
        let growth = self.growth;
        let index_start = match self.indices.as_mut() {
            Some(indices) => match indices.safe_alloc(device, growth, index_count) {
                Ok(index_start) => index_start,
                Err(err) => {
                    self.allocator.dealloc(start, count);
                    return Err(err);
                }
            },
            None => 0,
        };
        if let Some(indices) = self.indices.as_mut() {
            if let Err(err) = indices.fill(device, index_start, index_count, start) {
                indices.allocator.dealloc(index_start, index_count);
                self.allocator.dealloc(start, count);
                return Err(err);
            }
        }

        let id = self.insert_record(VertexListRecord {
            start,
            count,
            index_start,
            index_count,
            group,
        });
        self.group_lists.entry(group).or_default().push(id);
        Ok(id)
    }

    /// Changes the number of vertices (and indices) of a list.
    ///
    /// Data is kept for the vertices and indices that survive. If the vertices move,
    /// the list's stored indices are shifted so they keep pointing at the same
    /// vertices.
    pub fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        id: VertexListId,
        new_count: usize,
        new_index_count: usize,
    ) -> Result<(), ResourceError> {
        let record = self.record(id);
        assert!(
            self.indices.is_some() || new_index_count == 0,
            "indices requested from a non-indexed domain"
        );

        let new_start = self.safe_realloc(device, record.start, record.count, new_count)?;
        {
            let slot = self.record_mut(id);
            slot.start = new_start;
            slot.count = new_count;
        }
        let moved = new_start != record.start;
        if moved {
            let kept = record.count.min(new_count);
            for (buffer, attribute) in self.buffers.iter_mut().zip(self.layout.attributes()) {
                let stride = attribute.stride();
                buffer.copy_within_region(
                    device,
                    record.start * stride..(record.start + kept) * stride,
                    new_start * stride,
                )?;
            }
        }

        let growth = self.growth;
        let Some(indices) = self.indices.as_mut() else {
            return Ok(());
        };
        let new_index_start = indices.safe_realloc(
            device,
            growth,
            record.index_start,
            record.index_count,
            new_index_count,
        )?;
        {
            let slot = self.record_mut(id);
            slot.index_start = new_index_start;
            slot.index_count = new_index_count;
        }
        let Some(indices) = self.indices.as_mut() else {
            return Ok(());
        };
        let kept = record.index_count.min(new_index_count);
        let size = indices.format.size();
        if new_index_start != record.index_start && kept > 0 {
            indices.buffer.copy_within_region(
                device,
                record.index_start * size..(record.index_start + kept) * size,
                new_index_start * size,
            )?;
        }
        if moved && kept > 0 {
            indices.rebase(device, new_index_start, kept, record.start, new_start)?;
        }
        indices.fill(
            device,
            new_index_start + kept,
            new_index_count - kept,
            new_start,
        )
    }

    /// Frees a list's vertices and indices. The id stops resolving.
    pub fn delete(&mut self, id: VertexListId) {
        let record = self.record(id);
        self.allocator.dealloc(record.start, record.count);
        if let Some(indices) = self.indices.as_mut() {
            indices
                .allocator
                .dealloc(record.index_start, record.index_count);
        }
        self.unregister(id, record.group);

        let slot = &mut self.lists[id.index as usize];
        slot.record = None;
        slot.generation += 1;
        self.free_slots.push(id.index);
    }

    /// Moves a list into `target`, drawn with `group`, and returns its new id.
    ///
    /// # Panics
    ///
    /// Panics if the two domains do not share the same layout and index format.
    pub fn migrate(
        &mut self,
        device: &dyn GraphicsDevice,
        id: VertexListId,
        target: &mut VertexDomain,
        group: GroupId,
    ) -> Result<VertexListId, ResourceError> {
        assert_eq!(
            self.layout, target.layout,
            "vertex lists can only migrate between domains with the same layout"
        );
        assert_eq!(
            self.index_format(),
            target.index_format(),
            "vertex lists can only migrate between domains with the same index format"
        );

        let record = self.record(id);
        let new_id = target.create(device, record.count, group, record.index_count)?;
        let new_record = target.record(new_id);

        let mut copied = Ok(());
        for ((source, destination), attribute) in self
            .buffers
            .iter()
            .zip(target.buffers.iter_mut())
            .zip(self.layout.attributes())
        {
            let stride = attribute.stride();
            let bytes = source.read_region(record.start * stride, record.count * stride);
            copied = destination.set_region(device, new_record.start * stride, bytes);
            if copied.is_err() {
                break;
            }
        }
        if let Err(err) = copied {
            target.delete(new_id);
            return Err(err);
        }

        if let (Some(source), Some(destination)) = (self.indices.as_ref(), target.indices.as_mut())
        {
            let rebased = source.rebased(
                record.index_start,
                record.index_count,
                record.start,
                new_record.start,
            );
            if let Err(err) = destination.write(device, new_record.index_start, &rebased) {
                target.delete(new_id);
                return Err(err);
            }
        }

        self.delete(id);
        Ok(new_id)
    }

    /// Moves a list to another group without touching its storage.
    pub fn set_group(&mut self, id: VertexListId, group: GroupId) {
        let old = self.record(id).group;
        if old == group {
            return;
        }
        self.unregister(id, old);
        self.record_mut(id).group = group;
        self.group_lists.entry(group).or_default().push(id);
    }

    // --- Views ---

    /// Returns `true` if `id` is a live list of this domain.
    pub fn contains(&self, id: VertexListId) -> bool {
        self.lists
            .get(id.index as usize)
            .is_some_and(|slot| slot.generation == id.generation && slot.record.is_some())
    }

    /// Returns a read-only view of a list.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live list of this domain.
    pub fn vertex_list(&self, id: VertexListId) -> VertexList<'_> {
        VertexList {
            domain: self,
            id,
            record: self.record(id),
        }
    }

    /// Returns a writable view of a list.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a live list of this domain.
    pub fn vertex_list_mut<'a>(
        &'a mut self,
        device: &'a dyn GraphicsDevice,
        id: VertexListId,
    ) -> VertexListMut<'a> {
        let record = self.record(id);
        VertexListMut {
            domain: self,
            device,
            id,
            record,
        }
    }

    pub(crate) fn attribute_slot(&self, name: &str) -> (usize, usize) {
        match self.layout.find(name) {
            Some((index, attribute)) => (index, attribute.stride()),
            None => panic!("the vertex layout has no attribute named '{name}'"),
        }
    }

    // --- Drawing ---

    fn bind(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        for (buffer, attribute) in self.buffers.iter_mut().zip(self.layout.attributes()) {
            buffer.bind(device, BufferBinding::Vertex(attribute))?;
        }
        if let Some(indices) = self.indices.as_mut() {
            indices
                .buffer
                .bind(device, BufferBinding::Index(indices.format))?;
        }
        Ok(())
    }

    /// Issues one draw call for `ranges`, which are index ranges for indexed domains
    /// and vertex ranges otherwise. Returns the number of calls made.
    fn submit(
        &self,
        device: &dyn GraphicsDevice,
        ranges: &[(usize, usize)],
    ) -> Result<usize, ResourceError> {
        match (&self.indices, ranges) {
            (_, []) => return Ok(0),
            (None, [(first, count)]) => device.draw_arrays(self.mode, *first, *count)?,
            (None, _) => {
                let (firsts, counts): (Vec<usize>, Vec<usize>) = ranges.iter().copied().unzip();
                device.draw_arrays_multi(self.mode, &firsts, &counts)?;
            }
            (Some(indices), [(first, count)]) => device.draw_elements(
                self.mode,
                *count,
                indices.format,
                (first * indices.format.size()) as u64,
            )?,
            (Some(indices), _) => {
                let size = indices.format.size();
                let counts: Vec<usize> = ranges.iter().map(|(_, count)| *count).collect();
                let offsets: Vec<u64> = ranges
                    .iter()
                    .map(|(first, _)| (first * size) as u64)
                    .collect();
                device.draw_elements_multi(self.mode, &counts, indices.format, &offsets)?;
            }
        }
        Ok(1)
    }

    fn draw_ranges(
        &mut self,
        device: &dyn GraphicsDevice,
        ranges: &[(usize, usize)],
    ) -> Result<usize, ResourceError> {
        if ranges.is_empty() {
            return Ok(0);
        }
        self.bind(device)?;
        self.submit(device, ranges)
    }

    /// Draws every allocated region of the domain, whatever group it belongs to.
    ///
    /// Returns the number of draw calls issued: 0 for an empty domain, 1 otherwise.
    pub fn draw(&mut self, device: &dyn GraphicsDevice) -> Result<usize, ResourceError> {
        let allocator = match &self.indices {
            Some(indices) => &indices.allocator,
            None => &self.allocator,
        };
        let (starts, sizes) = allocator.allocated_regions();
        let ranges: Vec<(usize, usize)> = starts.iter().copied().zip(sizes.iter().copied()).collect();
        self.draw_ranges(device, &ranges)
    }

    /// Draws the lists registered to `groups`.
    ///
    /// For list topologies, ranges that touch are submitted as one range.
    pub fn draw_groups(
        &mut self,
        device: &dyn GraphicsDevice,
        groups: &[GroupId],
    ) -> Result<usize, ResourceError> {
        let mut ranges = Vec::new();
        for &group in groups {
            if self.indices.is_some() {
                ranges.extend(self.group_index_ranges(group));
            } else {
                ranges.extend(self.group_vertex_ranges(group));
            }
        }
        if self.mode.is_list() {
            ranges = coalesce(ranges);
        }
        self.draw_ranges(device, &ranges)
    }

    /// Draws a single list.
    pub fn draw_list(
        &mut self,
        device: &dyn GraphicsDevice,
        id: VertexListId,
    ) -> Result<usize, ResourceError> {
        let record = self.record(id);
        let range = if self.indices.is_some() {
            (record.index_start, record.index_count)
        } else {
            (record.start, record.count)
        };
        if range.1 == 0 {
            return Ok(0);
        }
        self.draw_ranges(device, &[range])
    }

    /// Draws every allocated region `instances` times, one call per region.
    ///
    /// # Panics
    ///
    /// Panics if the domain is indexed.
    pub fn draw_instanced(
        &mut self,
        device: &dyn GraphicsDevice,
        instances: usize,
    ) -> Result<usize, ResourceError> {
        assert!(
            self.indices.is_none(),
            "instanced drawing is only supported for non-indexed domains"
        );
        if self.allocator.is_empty() {
            return Ok(0);
        }
        self.bind(device)?;
        let (starts, sizes) = self.allocator.allocated_regions();
        for (&first, &count) in starts.iter().zip(sizes) {
            device.draw_arrays_instanced(self.mode, first, count, instances)?;
        }
        Ok(starts.len())
    }

    /// Releases every device buffer owned by the domain.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) -> Result<(), ResourceError> {
        for buffer in &mut self.buffers {
            buffer.destroy(device)?;
        }
        if let Some(indices) = self.indices.as_mut() {
            indices.buffer.destroy(device)?;
        }
        log::debug!("Destroyed vertex domain ({:?})", self.mode);
        Ok(())
    }

    // --- Queries ---

    /// Returns `true` if no vertices or indices are allocated.
    pub fn is_empty(&self) -> bool {
        self.allocator.is_empty()
            && self
                .indices
                .as_ref()
                .map_or(true, |indices| indices.allocator.is_empty())
    }

    /// Returns the `(start, count)` vertex ranges of the lists drawn with `group`.
    pub fn group_vertex_ranges(&self, group: GroupId) -> Vec<(usize, usize)> {
        self.group_records(group)
            .map(|record| (record.start, record.count))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    /// Returns the `(start, count)` index ranges of the lists drawn with `group`.
    pub fn group_index_ranges(&self, group: GroupId) -> Vec<(usize, usize)> {
        if self.indices.is_none() {
            return Vec::new();
        }
        self.group_records(group)
            .map(|record| (record.index_start, record.index_count))
            .filter(|(_, count)| *count > 0)
            .collect()
    }

    fn group_records(&self, group: GroupId) -> impl Iterator<Item = VertexListRecord> + '_ {
        self.group_lists
            .get(&group)
            .into_iter()
            .flatten()
            .map(|&id| self.record(id))
    }

    /// Returns the lists drawn with `group`, in creation order.
    pub fn group_lists(&self, group: GroupId) -> &[VertexListId] {
        self.group_lists.get(&group).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if at least one list is drawn with `group`.
    pub fn has_group(&self, group: GroupId) -> bool {
        self.group_lists.contains_key(&group)
    }

    /// Returns every group that has lists in this domain.
    pub fn groups(&self) -> impl Iterator<Item = GroupId> + '_ {
        self.group_lists.keys().copied()
    }

    /// Returns the number of live lists.
    pub fn list_count(&self) -> usize {
        self.lists.len() - self.free_slots.len()
    }

    /// The vertex layout shared by every list.
    pub fn layout(&self) -> &VertexLayout {
        &self.layout
    }

    /// The primitive topology the domain draws with.
    pub fn mode(&self) -> DrawMode {
        self.mode
    }

    /// The index format, or `None` for non-indexed domains.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.indices.as_ref().map(|indices| indices.format)
    }

    /// The vertex allocator.
    pub fn allocator(&self) -> &RangeAllocator {
        &self.allocator
    }

    /// The index allocator of an indexed domain.
    pub fn index_allocator(&self) -> Option<&RangeAllocator> {
        self.indices.as_ref().map(|indices| &indices.allocator)
    }

    /// The number of vertex slots currently reserved.
    pub fn vertex_capacity(&self) -> usize {
        self.allocator.capacity()
    }

    /// The fraction of vertex slots in use.
    pub fn vertex_usage(&self) -> f32 {
        self.allocator.usage()
    }

    /// The device buffer holding attribute `name`.
    pub fn attribute_buffer(&self, name: &str) -> Option<BufferId> {
        self.layout
            .find(name)
            .map(|(index, _)| self.buffers[index].id())
    }

    /// The device buffer holding the indices of an indexed domain.
    pub fn index_buffer(&self) -> Option<BufferId> {
        self.indices.as_ref().map(|indices| indices.buffer.id())
    }
}

/// Sorts ranges and joins the ones that touch.
fn coalesce(mut ranges: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    ranges.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(ranges.len());
    for (start, count) in ranges {
        match merged.last_mut() {
            Some((last_start, last_count)) if *last_start + *last_count == start => {
                *last_count += count;
            }
            _ => merged.push((start, count)),
        }
    }
    merged
}
