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

//! Statistics gathered while executing a batch.

/// What the last [`Batch::draw`](super::Batch::draw) did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    /// The number of commands in the compiled draw list.
    pub commands: usize,
    /// The number of device draw calls issued.
    pub draw_calls: usize,
    /// The number of group `set_state`/`unset_state` calls made.
    pub state_changes: usize,
    /// The number of live vertex domains.
    pub domains: usize,
    /// The number of groups the batch knows about.
    pub groups: usize,
    /// Whether the draw list was recompiled for this draw.
    pub recompiled: bool,
}
