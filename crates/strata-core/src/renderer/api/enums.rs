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

//! Enums shared by draw calls.

use serde::{Deserialize, Serialize};

/// Defines how vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DrawMode {
    /// Vertices are rendered as a list of isolated points.
    PointList,
    /// Vertices are rendered as a list of isolated lines (every two vertices form a line).
    LineList,
    /// Vertices are rendered as a connected line strip.
    LineStrip,
    /// Vertices are rendered as a closed line loop.
    LineLoop,
    /// Vertices are rendered as a list of isolated triangles (every three vertices form a triangle).
    TriangleList,
    /// Vertices are rendered as a connected triangle strip.
    TriangleStrip,
    /// Vertices are rendered as a fan around the first vertex.
    TriangleFan,
}

impl DrawMode {
    /// Returns `true` if every primitive is built from its own vertices.
    ///
    /// Only list topologies allow two contiguous vertex ranges to be submitted as a
    /// single range; joining two strips, loops or fans would connect them.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            DrawMode::PointList | DrawMode::LineList | DrawMode::TriangleList
        )
    }
}

/// The format of indices in an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexFormat {
    /// Indices are 16-bit unsigned integers.
    Uint16,
    /// Indices are 32-bit unsigned integers.
    Uint32,
}

impl IndexFormat {
    /// Returns the size in bytes of one index.
    pub fn size(&self) -> usize {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }

    /// Returns the largest index value representable in this format.
    pub fn max_value(&self) -> u32 {
        match self {
            IndexFormat::Uint16 => u16::MAX as u32,
            IndexFormat::Uint32 => u32::MAX,
        }
    }

    /// Decodes packed little-endian indices into `u32` values.
    pub fn decode(&self, bytes: &[u8]) -> Vec<u32> {
        match self {
            IndexFormat::Uint16 => bytes
                .chunks_exact(2)
                .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
                .collect(),
            IndexFormat::Uint32 => bytes
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
                .collect(),
        }
    }

    /// Encodes `indices` into `out`, which must hold exactly `indices.len() * self.size()` bytes.
    ///
    /// # Panics
    ///
    /// Panics if an index does not fit in this format or if `out` has the wrong length.
    pub fn encode_into(&self, indices: &[u32], out: &mut [u8]) {
        assert_eq!(
            out.len(),
            indices.len() * self.size(),
            "index byte length mismatch"
        );
        match self {
            IndexFormat::Uint16 => {
                for (chunk, &index) in out.chunks_exact_mut(2).zip(indices) {
                    let value = u16::try_from(index)
                        .unwrap_or_else(|_| panic!("index {index} does not fit in Uint16"));
                    chunk.copy_from_slice(&value.to_le_bytes());
                }
            }
            IndexFormat::Uint32 => {
                for (chunk, &index) in out.chunks_exact_mut(4).zip(indices) {
                    chunk.copy_from_slice(&index.to_le_bytes());
                }
            }
        }
    }
}
