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

//! Settings that control how vertex domains size and grow their storage.

use serde::{Deserialize, Serialize};

/// How a domain picks its new capacity after an allocation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum GrowthPolicy {
    /// Round the requested capacity up to the next power of two, amortising
    /// repeated small growths.
    #[default]
    NextPowerOfTwo,
    /// Grow to exactly the requested capacity.
    Exact,
}

impl GrowthPolicy {
    /// Returns the capacity to grow to so that a request needing `requested`
    /// slots succeeds.
    pub fn grow(&self, requested: usize) -> usize {
        match self {
            GrowthPolicy::NextPowerOfTwo => requested.max(1).next_power_of_two(),
            GrowthPolicy::Exact => requested,
        }
    }
}

/// Which buffer variant stores the indices of indexed domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum IndexStorage {
    /// Indices are staged in a CPU mirror and flushed before each draw.
    #[default]
    Mapped,
    /// Indices are uploaded as soon as they are written.
    Immediate,
}

/// Allocation settings applied to every domain created with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationSettings {
    /// The number of vertex slots a new domain reserves.
    pub initial_vertex_capacity: usize,
    /// The number of index slots a new indexed domain reserves.
    pub initial_index_capacity: usize,
    /// How capacity grows when an allocation does not fit.
    pub growth: GrowthPolicy,
    /// The storage used for index buffers.
    pub index_storage: IndexStorage,
}

impl Default for AllocationSettings {
    fn default() -> Self {
        Self {
            initial_vertex_capacity: 16,
            initial_index_capacity: 16,
            growth: GrowthPolicy::NextPowerOfTwo,
            index_storage: IndexStorage::Mapped,
        }
    }
}
