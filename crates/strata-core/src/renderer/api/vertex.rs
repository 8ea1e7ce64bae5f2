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

//! Vertex formats, attribute descriptors and the layouts that key vertex domains.

use super::buffer::BufferUsageHint;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Describes the data type and component count of a single vertex attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VertexFormat {
    /// Four 8-bit unsigned integer components.
    Uint8x4,
    /// Four 8-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm8x4,
    /// Two 16-bit signed integer components.
    Sint16x2,
    /// Four 16-bit signed integer components.
    Sint16x4,
    /// Two 16-bit unsigned integer components normalized to `[0.0, 1.0]`.
    Unorm16x2,
    /// One 32-bit float component.
    Float32,
    /// Two 32-bit float components.
    Float32x2,
    /// Three 32-bit float components.
    Float32x3,
    /// Four 32-bit float components.
    Float32x4,
    /// One 32-bit unsigned integer component.
    Uint32,
    /// Two 32-bit unsigned integer components.
    Uint32x2,
    /// Four 32-bit unsigned integer components.
    Uint32x4,
    /// One 32-bit signed integer component.
    Sint32,
    /// Two 32-bit signed integer components.
    Sint32x2,
}

impl VertexFormat {
    /// Returns the size in bytes of this vertex format
    pub fn size(&self) -> usize {
        match self {
            VertexFormat::Uint8x4 => 4,
            VertexFormat::Unorm8x4 => 4,
            VertexFormat::Sint16x2 => 4,
            VertexFormat::Sint16x4 => 8,
            VertexFormat::Unorm16x2 => 4,
            VertexFormat::Float32 => 4,
            VertexFormat::Float32x2 => 8,
            VertexFormat::Float32x3 => 12,
            VertexFormat::Float32x4 => 16,
            VertexFormat::Uint32 => 4,
            VertexFormat::Uint32x2 => 8,
            VertexFormat::Uint32x4 => 16,
            VertexFormat::Sint32 => 4,
            VertexFormat::Sint32x2 => 8,
        }
    }

    /// Returns the number of components of this vertex format.
    pub fn components(&self) -> usize {
        match self {
            VertexFormat::Float32 | VertexFormat::Uint32 | VertexFormat::Sint32 => 1,
            VertexFormat::Sint16x2
            | VertexFormat::Unorm16x2
            | VertexFormat::Float32x2
            | VertexFormat::Uint32x2
            | VertexFormat::Sint32x2 => 2,
            VertexFormat::Float32x3 => 3,
            VertexFormat::Uint8x4
            | VertexFormat::Unorm8x4
            | VertexFormat::Sint16x4
            | VertexFormat::Float32x4
            | VertexFormat::Uint32x4 => 4,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            VertexFormat::Uint8x4 => "uint8x4",
            VertexFormat::Unorm8x4 => "unorm8x4",
            VertexFormat::Sint16x2 => "sint16x2",
            VertexFormat::Sint16x4 => "sint16x4",
            VertexFormat::Unorm16x2 => "unorm16x2",
            VertexFormat::Float32 => "float32",
            VertexFormat::Float32x2 => "float32x2",
            VertexFormat::Float32x3 => "float32x3",
            VertexFormat::Float32x4 => "float32x4",
            VertexFormat::Uint32 => "uint32",
            VertexFormat::Uint32x2 => "uint32x2",
            VertexFormat::Uint32x4 => "uint32x4",
            VertexFormat::Sint32 => "sint32",
            VertexFormat::Sint32x2 => "sint32x2",
        }
    }
}

impl fmt::Display for VertexFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VertexFormat {
    type Err = LayoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format = match s {
            "uint8x4" => VertexFormat::Uint8x4,
            "unorm8x4" => VertexFormat::Unorm8x4,
            "sint16x2" => VertexFormat::Sint16x2,
            "sint16x4" => VertexFormat::Sint16x4,
            "unorm16x2" => VertexFormat::Unorm16x2,
            "float32" => VertexFormat::Float32,
            "float32x2" => VertexFormat::Float32x2,
            "float32x3" => VertexFormat::Float32x3,
            "float32x4" => VertexFormat::Float32x4,
            "uint32" => VertexFormat::Uint32,
            "uint32x2" => VertexFormat::Uint32x2,
            "uint32x4" => VertexFormat::Uint32x4,
            "sint32" => VertexFormat::Sint32,
            "sint32x2" => VertexFormat::Sint32x2,
            other => return Err(LayoutError::UnknownFormat(other.to_string())),
        };
        Ok(format)
    }
}

/// Describes a single vertex attribute stored in its own buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexAttribute {
    /// The name the attribute is looked up by (e.g. `"position"`).
    pub name: String,
    /// The input location of this attribute in the vertex shader.
    pub shader_location: u32,
    /// The format of the attribute's data.
    pub format: VertexFormat,
    /// How often the attribute's data is expected to change.
    pub usage: BufferUsageHint,
}

impl VertexAttribute {
    /// Creates a dynamic attribute.
    pub fn new(name: impl Into<String>, shader_location: u32, format: VertexFormat) -> Self {
        Self {
            name: name.into(),
            shader_location,
            format,
            usage: BufferUsageHint::Dynamic,
        }
    }

    /// Returns a copy of this attribute with a different usage hint.
    pub fn with_usage(mut self, usage: BufferUsageHint) -> Self {
        self.usage = usage;
        self
    }

    /// Returns the byte size of one element of this attribute.
    pub fn stride(&self) -> usize {
        self.format.size()
    }
}

/// An error produced while building or parsing a [`VertexLayout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// The layout has no attributes.
    Empty,
    /// Two attributes share the same name.
    DuplicateAttribute(String),
    /// Two attributes share the same shader location.
    DuplicateLocation(u32),
    /// A format name could not be recognised.
    UnknownFormat(String),
    /// A usage name could not be recognised.
    UnknownUsage(String),
    /// An attribute entry did not follow the `name:format[/usage]` syntax.
    Malformed(String),
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::Empty => write!(f, "A vertex layout needs at least one attribute."),
            LayoutError::DuplicateAttribute(name) => {
                write!(f, "Attribute '{name}' appears more than once in the layout.")
            }
            LayoutError::DuplicateLocation(location) => {
                write!(f, "Shader location {location} is used by more than one attribute.")
            }
            LayoutError::UnknownFormat(name) => write!(f, "Unknown vertex format '{name}'."),
            LayoutError::UnknownUsage(name) => write!(f, "Unknown buffer usage '{name}'."),
            LayoutError::Malformed(entry) => {
                write!(f, "Malformed attribute entry '{entry}', expected name:format[/usage].")
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// The ordered set of attributes stored by a vertex domain.
///
/// Two domains can exchange vertex lists only if their layouts compare equal, and
/// the layout is part of the key a batch uses to share domains between groups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VertexLayout {
    attributes: Vec<VertexAttribute>,
}

impl VertexLayout {
    /// Builds a layout from a list of attributes.
    ///
    /// # Errors
    ///
    /// Returns a [`LayoutError`] if the list is empty or if names or shader
    /// locations are repeated.
    pub fn new(attributes: Vec<VertexAttribute>) -> Result<Self, LayoutError> {
        if attributes.is_empty() {
            return Err(LayoutError::Empty);
        }
        for (i, attribute) in attributes.iter().enumerate() {
            for other in &attributes[..i] {
                if other.name == attribute.name {
                    return Err(LayoutError::DuplicateAttribute(attribute.name.clone()));
                }
                if other.shader_location == attribute.shader_location {
                    return Err(LayoutError::DuplicateLocation(attribute.shader_location));
                }
            }
        }
        Ok(Self { attributes })
    }

    /// Parses a compact layout description such as
    /// `"position:float32x3, colors:unorm8x4/static"`.
    ///
    /// Shader locations are assigned in declaration order starting at 0. The usage
    /// suffix is one of `static`, `dynamic` or `stream` and defaults to `dynamic`.
    pub fn parse(description: &str) -> Result<Self, LayoutError> {
        let mut attributes = Vec::new();
        for (location, entry) in description
            .split(',')
            .map(str::trim)
            .filter(|e| !e.is_empty())
            .enumerate()
        {
            let (name, rest) = entry
                .split_once(':')
                .ok_or_else(|| LayoutError::Malformed(entry.to_string()))?;
            let (format, usage) = match rest.split_once('/') {
                Some((format, usage)) => (format, Some(usage)),
                None => (rest, None),
            };
            let name = name.trim();
            if name.is_empty() {
                return Err(LayoutError::Malformed(entry.to_string()));
            }
            let usage = match usage.map(str::trim) {
                None | Some("dynamic") => BufferUsageHint::Dynamic,
                Some("static") => BufferUsageHint::Static,
                Some("stream") => BufferUsageHint::Stream,
                Some(other) => return Err(LayoutError::UnknownUsage(other.to_string())),
            };
            attributes.push(
                VertexAttribute::new(name, location as u32, format.trim().parse()?)
                    .with_usage(usage),
            );
        }
        Self::new(attributes)
    }

    /// Returns the attributes in declaration order.
    pub fn attributes(&self) -> &[VertexAttribute] {
        &self.attributes
    }

    /// Returns the index and descriptor of the attribute called `name`.
    pub fn find(&self, name: &str) -> Option<(usize, &VertexAttribute)> {
        self.attributes
            .iter()
            .enumerate()
            .find(|(_, attribute)| attribute.name == name)
    }

    /// Returns the number of attributes.
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Always `false`; a layout cannot be built without attributes.
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Returns the total number of bytes one vertex occupies across all attribute buffers.
    pub fn vertex_size(&self) -> usize {
        self.attributes.iter().map(VertexAttribute::stride).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_assigns_locations_in_order() {
        let layout = VertexLayout::parse("position:float32x3, colors:unorm8x4/static").unwrap();
        assert_eq!(layout.len(), 2);
        let (index, colors) = layout.find("colors").unwrap();
        assert_eq!(index, 1);
        assert_eq!(colors.shader_location, 1);
        assert_eq!(colors.format, VertexFormat::Unorm8x4);
        assert_eq!(colors.usage, BufferUsageHint::Static);
        assert_eq!(layout.vertex_size(), 16);
    }

    #[test]
    fn parse_rejects_bad_entries() {
        assert_eq!(
            VertexLayout::parse("position"),
            Err(LayoutError::Malformed("position".to_string()))
        );
        assert_eq!(
            VertexLayout::parse("position:float64x3"),
            Err(LayoutError::UnknownFormat("float64x3".to_string()))
        );
        assert_eq!(
            VertexLayout::parse("position:float32x3/sometimes"),
            Err(LayoutError::UnknownUsage("sometimes".to_string()))
        );
        assert_eq!(VertexLayout::parse(""), Err(LayoutError::Empty));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let result = VertexLayout::new(vec![
            VertexAttribute::new("position", 0, VertexFormat::Float32x2),
            VertexAttribute::new("position", 1, VertexFormat::Float32x3),
        ]);
        assert_eq!(
            result,
            Err(LayoutError::DuplicateAttribute("position".to_string()))
        );
    }

    #[test]
    fn format_names_round_trip_through_display() {
        for format in [VertexFormat::Float32x4, VertexFormat::Unorm8x4, VertexFormat::Sint32x2] {
            assert_eq!(format.to_string().parse::<VertexFormat>(), Ok(format));
        }
    }
}
