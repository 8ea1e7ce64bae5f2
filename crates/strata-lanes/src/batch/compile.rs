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

//! Compilation of the group tree into a draw list, and the passes that shorten it.
//!
//! The walk emits, for every visible group with geometry, `SetState`, one `Draw` per
//! domain the group has lists in, the sub-lists of its children in `(order, creation)`
//! order, and `UnsetState`. Three passes then remove work without changing what any
//! draw sees:
//!
//! 1. A group whose states are all already in effect, because the nearest open group
//!    setting each state kind set the same value, does not need its own
//!    `SetState`/`UnsetState`.
//! 2. An `UnsetState` directly followed by a `SetState` of a group with the same states
//!    cancels out, so sibling groups with equal state share one application.
//! 3. Consecutive draws from the same domain become one draw of several groups.

use strata_core::renderer::{GraphicsDevice, GroupArena, GroupId, StateKey, StateKind};

use super::{Batch, BatchSettings, DomainId, DrawCommand};

impl Batch {
    /// Rebuilds the draw list from the current group tree and geometry.
    ///
    /// Groups that have neither geometry nor surviving children are forgotten, groups
    /// removed from the arena are dropped, and domains without any list are destroyed.
    pub fn compile(&mut self, device: &dyn GraphicsDevice, arena: &GroupArena) {
        let mut top_groups = std::mem::take(&mut self.top_groups);
        top_groups.sort_by_key(|group| arena.sort_key(*group));

        let mut raw = Vec::new();
        let mut kept = Vec::with_capacity(top_groups.len());
        for group in top_groups {
            if self.visit(arena, group, &mut raw) {
                kept.push(group);
            }
        }
        self.top_groups = kept;
        self.prune_domains(device);

        let raw_len = raw.len();
        self.draw_list = optimize(raw, arena, &self.settings);
        self.dirty = false;
        self.compiled_revision = Some(arena.revision());
        log::trace!(
            "Batch: compiled {} commands with {} draws ({} before optimization)",
            self.draw_list.len(),
            self.draw_list.iter().filter(|c| c.is_draw()).count(),
            raw_len
        );
    }

    /// Appends the commands for `group` and its subtree to `out`.
    ///
    /// Returns `false` if the group was pruned from the batch.
    fn visit(&mut self, arena: &GroupArena, group: GroupId, out: &mut Vec<DrawCommand>) -> bool {
        if !arena.contains(group) {
            log::warn!("Batch: group {group:?} is no longer alive; its lists are not drawn");
            self.forget_group(group);
            return false;
        }
        if !arena.is_visible(group) {
            return true;
        }

        let mut body = Vec::new();
        let domains: Vec<DomainId> = self
            .group_map
            .remove(&group)
            .unwrap_or_default()
            .into_iter()
            .filter(|id| self.domain(*id).is_some_and(|domain| domain.has_group(group)))
            .collect();
        for &domain in &domains {
            body.push(DrawCommand::Draw {
                domain,
                groups: vec![group],
            });
        }
        let has_geometry = !domains.is_empty();
        if has_geometry {
            self.group_map.insert(group, domains);
        }

        let mut children = self.group_children.get(&group).cloned().unwrap_or_default();
        children.sort_by_key(|child| arena.sort_key(*child));
        let mut kept = Vec::with_capacity(children.len());
        for child in children {
            if self.visit(arena, child, &mut body) {
                kept.push(child);
            }
        }

        if kept.is_empty() && !has_geometry {
            self.group_children.remove(&group);
            log::debug!("Batch: pruned empty group {group:?}");
            return false;
        }
        self.group_children.insert(group, kept);

        out.push(DrawCommand::SetState(group));
        out.append(&mut body);
        out.push(DrawCommand::UnsetState(group));
        true
    }

    fn forget_group(&mut self, group: GroupId) {
        self.group_map.remove(&group);
        if let Some(children) = self.group_children.remove(&group) {
            for child in children {
                self.forget_group(child);
            }
        }
    }

    fn prune_domains(&mut self, device: &dyn GraphicsDevice) {
        for index in 0..self.domains.len() {
            let unused = self.domains[index]
                .as_ref()
                .is_some_and(|domain| domain.list_count() == 0);
            if !unused {
                continue;
            }
            let id = DomainId(index);
            if let Some(mut domain) = self.domains[index].take() {
                if let Err(e) = domain.destroy(device) {
                    log::warn!("Batch: failed to destroy domain {id:?}: {e}");
                }
            }
            self.domain_map.retain(|_, mapped| *mapped != id);
            for domains in self.group_map.values_mut() {
                domains.retain(|mapped| *mapped != id);
            }
            log::debug!("Batch: destroyed empty domain {id:?}");
        }
    }
}

fn states_of(arena: &GroupArena, group: GroupId) -> &[StateKey] {
    arena.get(group).map_or(&[], |g| g.states())
}

fn same_states(arena: &GroupArena, a: GroupId, b: GroupId) -> bool {
    let mut left = states_of(arena, a).to_vec();
    let mut right = states_of(arena, b).to_vec();
    left.sort_unstable();
    right.sort_unstable();
    left == right
}

/// Runs the enabled passes over a freshly compiled draw list.
pub(crate) fn optimize(
    commands: Vec<DrawCommand>,
    arena: &GroupArena,
    settings: &BatchSettings,
) -> Vec<DrawCommand> {
    let mut commands = commands;
    if settings.elide_redundant_states {
        commands = elide_provided_states(commands, arena);
        commands = cancel_equal_transitions(commands, arena);
    }
    if settings.merge_draws {
        commands = merge_draws(commands);
    }
    commands
}

/// The value of `kind` in effect inside the open groups: the last one applied wins.
fn current_value(open: &[(GroupId, bool)], arena: &GroupArena, kind: StateKind) -> Option<u64> {
    open.iter()
        .rev()
        .flat_map(|(group, _)| states_of(arena, *group).iter().rev())
        .find(|state| state.kind == kind)
        .map(|state| state.value)
}

fn elide_provided_states(commands: Vec<DrawCommand>, arena: &GroupArena) -> Vec<DrawCommand> {
    // Open groups and whether their SetState was kept.
    let mut open: Vec<(GroupId, bool)> = Vec::new();
    let mut out = Vec::with_capacity(commands.len());
    for command in commands {
        match command {
            DrawCommand::SetState(group) => {
                let redundant = states_of(arena, group)
                    .iter()
                    .all(|state| current_value(&open, arena, state.kind) == Some(state.value));
                open.push((group, !redundant));
                if !redundant {
                    out.push(command);
                }
            }
            DrawCommand::UnsetState(group) => {
                let kept = match open.pop() {
                    Some((g, kept)) if g == group => kept,
                    _ => true,
                };
                if kept {
                    out.push(command);
                }
            }
            draw => out.push(draw),
        }
    }
    out
}

fn cancel_equal_transitions(commands: Vec<DrawCommand>, arena: &GroupArena) -> Vec<DrawCommand> {
    let mut out: Vec<DrawCommand> = Vec::with_capacity(commands.len());
    for command in commands {
        if let DrawCommand::SetState(next) = command {
            if let Some(DrawCommand::UnsetState(previous)) = out.last() {
                if same_states(arena, *previous, next) {
                    out.pop();
                    continue;
                }
            }
        }
        out.push(command);
    }
    out
}

fn merge_draws(commands: Vec<DrawCommand>) -> Vec<DrawCommand> {
    let mut out: Vec<DrawCommand> = Vec::with_capacity(commands.len());
    for command in commands {
        if let DrawCommand::Draw { domain, groups } = &command {
            if let Some(DrawCommand::Draw {
                domain: last,
                groups: merged,
            }) = out.last_mut()
            {
                if last == domain {
                    merged.extend_from_slice(groups);
                    continue;
                }
            }
        }
        out.push(command);
    }
    out
}
