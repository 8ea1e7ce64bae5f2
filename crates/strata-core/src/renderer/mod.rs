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

//! Provides the public, backend-agnostic rendering contracts.
//!
//! This module defines the "common language" shared by the vertex storage in
//! `strata-data`, the batch compiler in `strata-lanes`, and any concrete device in
//! `strata-infra`. It contains the abstract [`GraphicsDevice`] trait, the data
//! structures that describe buffers and vertex layouts, the render-state
//! [`Group`] capability, and the error types.

pub mod api;
pub mod error;
pub mod group;
pub mod traits;

// Re-export the most important traits and types for easier use.
pub use self::api::*;
pub use self::error::{RenderError, ResourceError};
pub use self::group::{Group, GroupArena, GroupId, StateGroup, StateKey, StateKind};
pub use self::traits::GraphicsDevice;
