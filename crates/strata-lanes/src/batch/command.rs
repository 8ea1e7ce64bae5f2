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

//! The compiled form of a batch.

use strata_core::renderer::GroupId;

use super::DomainId;

/// One step of a compiled draw list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DrawCommand {
    /// Apply the render state of a group.
    SetState(GroupId),
    /// Remove the render state of a group.
    UnsetState(GroupId),
    /// Draw the lists of `groups` stored in `domain`.
    Draw {
        /// The domain holding the geometry.
        domain: DomainId,
        /// The groups whose lists are drawn, in one call.
        groups: Vec<GroupId>,
    },
}

impl DrawCommand {
    /// Returns `true` for [`DrawCommand::Draw`].
    pub fn is_draw(&self) -> bool {
        matches!(self, DrawCommand::Draw { .. })
    }
}
