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

//! Defines data structures related to GPU buffer resources.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;

/// The binding point a buffer is created for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BufferTarget {
    /// The buffer holds per-vertex attribute data.
    Vertex,
    /// The buffer holds element indices.
    Index,
}

/// A hint describing how often the contents of a buffer are expected to change.
///
/// The hint decides which storage strategy a vertex domain uses for an attribute:
/// `Static` data is uploaded as soon as it is written, while `Dynamic` and `Stream`
/// data is staged in a CPU mirror and flushed once per draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsageHint {
    /// Written once, drawn many times.
    Static,
    /// Rewritten occasionally, drawn many times.
    #[default]
    Dynamic,
    /// Rewritten every frame.
    Stream,
}

impl BufferUsageHint {
    /// Returns `true` if writes to a buffer with this hint should be staged in a
    /// CPU-side mirror instead of being uploaded immediately.
    pub fn is_mapped(&self) -> bool {
        !matches!(self, BufferUsageHint::Static)
    }
}

/// A descriptor used to create a [`BufferId`].
#[derive(Debug, Clone)]
pub struct BufferDescriptor<'a> {
    /// An optional debug label for the buffer.
    pub label: Option<Cow<'a, str>>,
    /// The total size of the buffer in bytes.
    pub size: u64,
    /// The binding point the buffer is used with.
    pub target: BufferTarget,
    /// How often the buffer contents are expected to change.
    pub usage: BufferUsageHint,
}

/// An opaque handle to a GPU buffer resource.
///
/// This ID is returned by [`GraphicsDevice::create_buffer`](crate::renderer::GraphicsDevice::create_buffer)
/// and is used to reference the buffer in all subsequent operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferId(pub usize);
