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

//! Configuration of a batch.

use serde::{Deserialize, Serialize};
use strata_core::renderer::AllocationSettings;
use thiserror::Error;

/// An error raised while loading [`BatchSettings`].
#[derive(Debug, Error)]
pub enum BatchConfigError {
    /// The text is not valid RON for the settings.
    #[error("invalid batch settings: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Settings that control how a batch stores and schedules geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchSettings {
    /// Settings for every domain the batch creates.
    pub allocation: AllocationSettings,
    /// Skip state changes that the draw list already has in effect.
    pub elide_redundant_states: bool,
    /// Join consecutive draws from the same domain into one call.
    pub merge_draws: bool,
}

impl Default for BatchSettings {
    fn default() -> Self {
        Self {
            allocation: AllocationSettings::default(),
            elide_redundant_states: true,
            merge_draws: true,
        }
    }
}

impl BatchSettings {
    /// Parses settings from RON. Missing fields take their default values.
    ///
    /// ```ron
    /// (
    ///     allocation: (initial_vertex_capacity: 1024, growth: Exact),
    ///     merge_draws: false,
    /// )
    /// ```
    pub fn from_ron_str(text: &str) -> Result<Self, BatchConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Writes the settings as pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        let pretty_config = ron::ser::PrettyConfig::default().indentor("  ".to_string());
        ron::ser::to_string_pretty(self, pretty_config)
    }
}
