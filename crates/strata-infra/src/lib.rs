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

//! # Strata Infra
//!
//! Concrete implementations of the contracts defined in `strata-core`.
//!
//! The only backend shipped here is the [`HeadlessDevice`], an in-memory
//! [`GraphicsDevice`](strata_core::renderer::GraphicsDevice) that stores buffer
//! contents, tracks applied render state and records every call it receives. It lets
//! the whole batching stack run, and be asserted on, without a GPU.

#![warn(missing_docs)]

pub mod graphics;

pub use graphics::headless::{DeviceCommand, HeadlessDevice, RecordedDraw};
