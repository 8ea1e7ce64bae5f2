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

//! Defines the hierarchy of error types for the rendering subsystem.

use crate::renderer::api::{BufferId, IndexFormat, LayoutError};
use std::fmt;

/// An error related to the creation or use of a GPU resource.
#[derive(Debug)]
pub enum ResourceError {
    /// The referenced buffer does not exist on the device.
    BufferNotFound(BufferId),
    /// The handle or ID used to reference a resource is invalid.
    InvalidHandle,
    /// A vertex layout was rejected.
    Layout(LayoutError),
    /// An error originating from the specific graphics backend implementation.
    BackendError(String),
    /// An attempt was made to access a resource out of its bounds (e.g., in a buffer).
    OutOfBounds {
        /// The first byte of the attempted access.
        offset: u64,
        /// The length of the attempted access.
        len: u64,
        /// The size of the resource.
        size: u64,
    },
    /// An index cannot be stored in the index format of its buffer.
    IndexOutOfRange {
        /// The absolute index that was rejected.
        index: i64,
        /// The format of the index buffer.
        format: IndexFormat,
    },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::BufferNotFound(id) => write!(f, "Buffer not found for ID: {id:?}"),
            ResourceError::InvalidHandle => write!(f, "Invalid resource handle or ID."),
            ResourceError::Layout(err) => write!(f, "Vertex layout error: {err}"),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
            ResourceError::OutOfBounds { offset, len, size } => {
                write!(
                    f,
                    "Resource access out of bounds: {len} bytes at offset {offset} in a {size}-byte resource."
                )
            }
            ResourceError::IndexOutOfRange { index, format } => {
                write!(f, "Index {index} does not fit in a {format:?} index buffer.")
            }
        }
    }
}

impl std::error::Error for ResourceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResourceError::Layout(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LayoutError> for ResourceError {
    fn from(err: LayoutError) -> Self {
        ResourceError::Layout(err)
    }
}

/// A high-level error raised while drawing a batch or a domain.
#[derive(Debug)]
pub enum RenderError {
    /// An error occurred while managing a GPU resource.
    ResourceError(ResourceError),
    /// A group failed to apply or remove its render state.
    StateError {
        /// The label of the group that failed.
        group: String,
        /// A description of the failure.
        reason: String,
    },
    /// An unexpected or internal error occurred.
    Internal(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RenderError::ResourceError(err) => {
                write!(f, "Graphics resource operation failed: {err}")
            }
            RenderError::StateError { group, reason } => {
                write!(f, "Group '{group}' failed to change render state: {reason}")
            }
            RenderError::Internal(msg) => {
                write!(f, "An internal or unexpected error occurred: {msg}")
            }
        }
    }
}

impl std::error::Error for RenderError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RenderError::ResourceError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for RenderError {
    fn from(err: ResourceError) -> Self {
        RenderError::ResourceError(err)
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error;

    use super::*;

    #[test]
    fn resource_error_display() {
        let err = ResourceError::OutOfBounds {
            offset: 8,
            len: 16,
            size: 12,
        };
        assert_eq!(
            format!("{err}"),
            "Resource access out of bounds: 16 bytes at offset 8 in a 12-byte resource."
        );
        assert_eq!(
            format!("{}", ResourceError::BufferNotFound(BufferId(7))),
            "Buffer not found for ID: BufferId(7)"
        );
        let err = ResourceError::IndexOutOfRange {
            index: 70_000,
            format: IndexFormat::Uint16,
        };
        assert_eq!(
            format!("{err}"),
            "Index 70000 does not fit in a Uint16 index buffer."
        );
    }

    #[test]
    fn render_error_display_wrapping_layout_error() {
        let res_err: ResourceError = LayoutError::Empty.into();
        let render_err: RenderError = res_err.into();
        assert_eq!(
            format!("{render_err}"),
            "Graphics resource operation failed: Vertex layout error: A vertex layout needs at least one attribute."
        );
        assert!(render_err.source().is_some());
        assert!(render_err.source().unwrap().source().is_some());
    }

    #[test]
    fn state_error_has_no_source() {
        let err = RenderError::StateError {
            group: "sprites".to_string(),
            reason: "program not linked".to_string(),
        };
        assert_eq!(
            format!("{err}"),
            "Group 'sprites' failed to change render state: program not linked"
        );
        assert!(err.source().is_none());
    }
}
