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

//! # Strata Data
//!
//! The storage layer of the batched renderer: a free-list [`RangeAllocator`] that
//! places vertices and indices, device buffers that stage or immediately upload
//! writes, and the [`VertexDomain`] that ties one allocator and one buffer per
//! attribute together into shared storage for many vertex lists.
//!
//! [`RangeAllocator`]: allocators::RangeAllocator
//! [`VertexDomain`]: domain::VertexDomain

#![warn(missing_docs)]

pub mod allocators;
pub mod buffers;
pub mod domain;
