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

//! # Strata Lanes
//!
//! The hot path of the batched renderer. A [`Batch`](batch::Batch) collects vertex
//! lists from many groups, shares vertex domains between them, and compiles the group
//! tree into a short list of state changes and draw calls that it replays every frame.

#![warn(missing_docs)]

pub mod batch;

pub use batch::{
    Batch, BatchConfigError, BatchSettings, BatchStats, DomainId, DrawCommand, ListHandle,
};
