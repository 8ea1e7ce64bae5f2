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

//! A free-list allocator over a single linear range of slots.
//!
//! The allocator only does bookkeeping: it hands out offsets into a range of
//! `capacity` slots and never touches the memory those slots describe. Vertex domains
//! use one to place vertices and another to place indices, and size their buffers
//! from its capacity.

use thiserror::Error;

/// Returned when an allocation does not fit in the current capacity.
///
/// `requested_capacity` is the smallest capacity that makes the identical request
/// succeed. Growing the allocator to at least that value with
/// [`RangeAllocator::set_capacity`] and retrying always succeeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("allocation does not fit; a capacity of at least {requested_capacity} slots is required")]
pub struct AllocatorMemoryError {
    /// The minimum capacity that satisfies the failed request.
    pub requested_capacity: usize,
}

/// Tracks which sub-ranges of `[0, capacity)` are in use.
///
/// Allocated space is stored as sorted, non-overlapping blocks. Space allocated
/// directly next to an existing block is folded into that block, so two blocks are
/// always separated by at least one free slot.
///
/// Freeing a region that was never allocated, and shrinking the capacity, are
/// programmer errors and panic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeAllocator {
    capacity: usize,
    starts: Vec<usize>,
    sizes: Vec<usize>,
}

impl RangeAllocator {
    /// Creates an allocator with nothing allocated.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            starts: Vec::new(),
            sizes: Vec::new(),
        }
    }

    /// Returns the total number of slots.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Grows the allocator. Existing allocations are unaffected.
    ///
    /// # Panics
    ///
    /// Panics unless `new_capacity` is larger than the current capacity.
    pub fn set_capacity(&mut self, new_capacity: usize) {
        assert!(
            new_capacity > self.capacity,
            "allocator capacity can only grow ({} -> {new_capacity})",
            self.capacity
        );
        self.capacity = new_capacity;
    }

    /// Allocates `size` contiguous slots and returns the first one.
    ///
    /// A free range at the very start is used when it is large enough. Otherwise the
    /// gaps between blocks are scanned left to right and the first one that fits is
    /// taken, and finally the space after the last block.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorMemoryError`] if no free range is large enough.
    pub fn alloc(&mut self, size: usize) -> Result<usize, AllocatorMemoryError> {
        if size == 0 {
            return Ok(0);
        }

        if self.starts.is_empty() {
            if size <= self.capacity {
                self.starts.push(0);
                self.sizes.push(size);
                return Ok(0);
            }
            return Err(AllocatorMemoryError {
                requested_capacity: size,
            });
        }

        let leading = self.starts[0];
        if leading == size {
            self.starts[0] = 0;
            self.sizes[0] += size;
            return Ok(0);
        } else if leading > size {
            self.starts.insert(0, 0);
            self.sizes.insert(0, size);
            return Ok(0);
        }

        let mut free_start = self.starts[0] + self.sizes[0];
        for i in 1..self.starts.len() {
            let free_size = self.starts[i] - free_start;
            if free_size == size {
                // Fill the gap and join the blocks on either side.
                self.sizes[i - 1] += free_size + self.sizes[i];
                self.starts.remove(i);
                self.sizes.remove(i);
                return Ok(free_start);
            } else if free_size > size {
                self.sizes[i - 1] += size;
                return Ok(free_start);
            }
            free_start = self.starts[i] + self.sizes[i];
        }

        let tail_free = self.capacity - free_start;
        if tail_free >= size {
            if let Some(last) = self.sizes.last_mut() {
                *last += size;
            }
            return Ok(free_start);
        }

        Err(AllocatorMemoryError {
            requested_capacity: self.capacity + size - tail_free,
        })
    }

    /// Resizes the region `[start, start + size)` to `new_size` slots and returns its
    /// (possibly new) start.
    ///
    /// Shrinking always happens in place. Growing happens in place when the region
    /// ends its block and enough free space follows it; otherwise a new region is
    /// allocated before the old one is released, so on failure the old region is
    /// still allocated and unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`AllocatorMemoryError`] if the region must move and no free range is
    /// large enough.
    ///
    /// # Panics
    ///
    /// Panics if `[start, start + size)` is not allocated.
    pub fn realloc(
        &mut self,
        start: usize,
        size: usize,
        new_size: usize,
    ) -> Result<usize, AllocatorMemoryError> {
        if new_size == 0 {
            self.dealloc(start, size);
            return Ok(0);
        }
        if size == 0 {
            return self.alloc(new_size);
        }
        if new_size < size {
            self.dealloc(start + new_size, size - new_size);
            return Ok(start);
        }

        let i = self.find_block(start, size);
        if new_size == size {
            return Ok(start);
        }

        let extra = new_size - size;
        if start + size == self.starts[i] + self.sizes[i] {
            let is_final_block = i + 1 == self.starts.len();
            if is_final_block {
                if self.capacity - (start + size) >= extra {
                    self.sizes[i] += extra;
                    return Ok(start);
                }
            } else {
                let free_size = self.starts[i + 1] - (start + size);
                if free_size == extra {
                    self.sizes[i] += free_size + self.sizes[i + 1];
                    self.starts.remove(i + 1);
                    self.sizes.remove(i + 1);
                    return Ok(start);
                } else if free_size > extra {
                    self.sizes[i] += extra;
                    return Ok(start);
                }
            }
        }

        let new_start = self.alloc(new_size)?;
        self.dealloc(start, size);
        Ok(new_start)
    }

    /// Frees the region `[start, start + size)`.
    ///
    /// The region may be any part of an allocated block: the whole block, its head,
    /// its tail, or its middle, in which case the block is split in two.
    ///
    /// # Panics
    ///
    /// Panics if the region is not entirely allocated.
    pub fn dealloc(&mut self, start: usize, size: usize) {
        if size == 0 {
            return;
        }

        let i = self.find_block(start, size);
        let block_start = self.starts[i];
        let block_size = self.sizes[i];
        let p = start - block_start;

        if p == 0 && size == block_size {
            self.starts.remove(i);
            self.sizes.remove(i);
        } else if p == 0 {
            self.starts[i] += size;
            self.sizes[i] -= size;
        } else if p + size == block_size {
            self.sizes[i] -= size;
        } else {
            self.sizes[i] = p;
            self.starts.insert(i + 1, start + size);
            self.sizes.insert(i + 1, block_size - (p + size));
        }
    }

    /// Returns the index of the block containing `[start, start + size)`.
    fn find_block(&self, start: usize, size: usize) -> usize {
        let candidate = self.starts.partition_point(|&s| s <= start);
        assert!(
            candidate > 0 && start + size <= self.starts[candidate - 1] + self.sizes[candidate - 1],
            "region [{start}, {}) is not allocated",
            start + size
        );
        candidate - 1
    }

    /// Returns the start offsets and sizes of the allocated blocks, in ascending order.
    pub fn allocated_regions(&self) -> (&[usize], &[usize]) {
        (&self.starts, &self.sizes)
    }

    /// Returns `true` if nothing is allocated.
    pub fn is_empty(&self) -> bool {
        self.starts.is_empty()
    }

    /// Returns the number of unallocated slots.
    pub fn free_size(&self) -> usize {
        self.capacity - self.sizes.iter().sum::<usize>()
    }

    /// Returns the number of unallocated slots that lie before the last block.
    ///
    /// This is the free space that a growing tail cannot use: the leading gap and
    /// the holes between blocks.
    pub fn fragmented_free_size(&self) -> usize {
        let Some(&first) = self.starts.first() else {
            return 0;
        };
        let mut total = first;
        let mut free_start = first + self.sizes[0];
        for (&start, &size) in self.starts.iter().zip(&self.sizes).skip(1) {
            total += start - free_start;
            free_start = start + size;
        }
        total
    }

    /// Returns the fraction of the capacity that is allocated, between 0 and 1.
    pub fn usage(&self) -> f32 {
        if self.capacity == 0 {
            return 0.0;
        }
        1.0 - self.free_size() as f32 / self.capacity as f32
    }

    /// Returns the fraction of the free space that is fragmented, between 0 and 1.
    pub fn fragmentation(&self) -> f32 {
        let free = self.free_size();
        if free == 0 {
            return 0.0;
        }
        self.fragmented_free_size() as f32 / free as f32
    }
}
