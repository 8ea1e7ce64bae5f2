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

//! The batch: shared vertex domains plus a compiled, replayable draw list.
//!
//! Geometry is added to a [`Batch`] for a group, a vertex layout and a draw mode. The
//! batch keeps one [`VertexDomain`] per distinct `(layout, mode, index format)` and
//! shares it between every group that uses that combination. Drawing walks the group
//! tree once, produces a flat list of [`DrawCommand`]s, and replays it until geometry
//! or the group tree changes.

mod command;
mod compile;
mod settings;
mod stats;

pub use self::command::DrawCommand;
pub use self::settings::{BatchConfigError, BatchSettings};
pub use self::stats::BatchStats;

use ahash::AHashMap;
use strata_core::renderer::{
    DrawMode, GraphicsDevice, Group, GroupArena, GroupId, IndexFormat, RenderError, ResourceError,
    VertexLayout,
};
use strata_data::domain::{VertexDomain, VertexList, VertexListId, VertexListMut};

/// Identifies a vertex domain inside one batch. Ids are never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DomainId(usize);

/// The combination of properties that decides which domain a list is stored in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DomainKey {
    layout: VertexLayout,
    mode: DrawMode,
    index_format: Option<IndexFormat>,
}

/// A vertex list owned by a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListHandle {
    domain: DomainId,
    list: VertexListId,
}

impl ListHandle {
    /// The domain the list is stored in.
    pub fn domain(&self) -> DomainId {
        self.domain
    }
}

/// Collects vertex lists from many groups and draws them with few state changes.
///
/// The batch never owns groups: it refers to them by [`GroupId`] and reads them from
/// the [`GroupArena`] passed to each call. The compiled draw list is rebuilt when
/// geometry is added or removed, when [`invalidate`](Batch::invalidate) is called, or
/// when the arena's revision changes (a group was added, removed, reordered or hidden).
#[derive(Debug, Default)]
pub struct Batch {
    settings: BatchSettings,
    domains: Vec<Option<VertexDomain>>,
    domain_map: AHashMap<DomainKey, DomainId>,
    group_map: AHashMap<GroupId, Vec<DomainId>>,
    group_children: AHashMap<GroupId, Vec<GroupId>>,
    top_groups: Vec<GroupId>,
    draw_list: Vec<DrawCommand>,
    dirty: bool,
    compiled_revision: Option<u64>,
    stats: BatchStats,
}

impl Batch {
    /// Creates an empty batch with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty batch with the given settings.
    pub fn with_settings(settings: BatchSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// The settings the batch was created with.
    pub fn settings(&self) -> &BatchSettings {
        &self.settings
    }

    /// Forces the draw list to be recompiled on the next draw.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    // --- Registration ---

    /// Makes `group` and all of its ancestors known to the batch.
    ///
    /// # Panics
    ///
    /// Panics if `group` is not alive in `arena`.
    fn register_group(&mut self, arena: &GroupArena, group: GroupId) {
        assert!(arena.contains(group), "group {group:?} is not alive");
        if self.group_children.contains_key(&group) {
            return;
        }
        self.group_children.insert(group, Vec::new());
        match arena.parent(group) {
            Some(parent) => {
                self.register_group(arena, parent);
                if let Some(siblings) = self.group_children.get_mut(&parent) {
                    siblings.push(group);
                }
            }
            None => self.top_groups.push(group),
        }
        self.dirty = true;
    }

    fn domain_for(
        &mut self,
        device: &dyn GraphicsDevice,
        key: DomainKey,
    ) -> Result<DomainId, RenderError> {
        if let Some(&id) = self.domain_map.get(&key) {
            return Ok(id);
        }
        let allocation = &self.settings.allocation;
        let domain = match key.index_format {
            Some(format) => VertexDomain::new_indexed(
                device,
                key.layout.clone(),
                key.mode,
                format,
                allocation,
            )?,
            None => VertexDomain::new(device, key.layout.clone(), key.mode, allocation)?,
        };
        let id = DomainId(self.domains.len());
        self.domains.push(Some(domain));
        self.domain_map.insert(key, id);
        log::debug!("Batch: created domain {id:?}");
        self.dirty = true;
        Ok(id)
    }

    fn link(&mut self, group: GroupId, domain: DomainId) {
        let domains = self.group_map.entry(group).or_default();
        if !domains.contains(&domain) {
            domains.push(domain);
        }
        self.dirty = true;
    }

    fn domain_mut(&mut self, id: DomainId) -> &mut VertexDomain {
        match self.domains.get_mut(id.0).and_then(Option::as_mut) {
            Some(domain) => domain,
            None => panic!("domain {id:?} does not belong to this batch"),
        }
    }

    /// Returns a domain of the batch.
    pub fn domain(&self, id: DomainId) -> Option<&VertexDomain> {
        self.domains.get(id.0).and_then(Option::as_ref)
    }

    #[allow(clippy::too_many_arguments)]
    fn create(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        count: usize,
        mode: DrawMode,
        group: GroupId,
        layout: &VertexLayout,
        index_format: Option<IndexFormat>,
        index_count: usize,
    ) -> Result<ListHandle, RenderError> {
        self.register_group(arena, group);
        let key = DomainKey {
            layout: layout.clone(),
            mode,
            index_format,
        };
        let domain = self.domain_for(device, key)?;
        let list = self.domain_mut(domain).create(device, count, group, index_count)?;
        self.link(group, domain);
        Ok(ListHandle { domain, list })
    }

    /// Adds a non-indexed list of `count` vertices drawn with `group`.
    pub fn add(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        count: usize,
        mode: DrawMode,
        group: GroupId,
        layout: &VertexLayout,
    ) -> Result<ListHandle, RenderError> {
        self.create(device, arena, count, mode, group, layout, None, 0)
    }

    /// Adds an indexed list of `count` vertices drawn with `group`.
    ///
    /// `indices` are relative to the list's first vertex.
    #[allow(clippy::too_many_arguments)]
    pub fn add_indexed(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        count: usize,
        mode: DrawMode,
        group: GroupId,
        layout: &VertexLayout,
        index_format: IndexFormat,
        indices: &[u32],
    ) -> Result<ListHandle, RenderError> {
        let handle = self.create(
            device,
            arena,
            count,
            mode,
            group,
            layout,
            Some(index_format),
            indices.len(),
        )?;
        self.vertex_list_mut(device, handle).set_indices(indices)?;
        Ok(handle)
    }

    /// Adds a non-indexed list and fills the named attributes with raw bytes.
    ///
    /// The vertex count is taken from the first attribute.
    ///
    /// # Panics
    ///
    /// Panics if `attributes` is empty, names an unknown attribute, or holds data of
    /// inconsistent length.
    pub fn add_with_data(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        mode: DrawMode,
        group: GroupId,
        layout: &VertexLayout,
        attributes: &[(&str, &[u8])],
    ) -> Result<ListHandle, RenderError> {
        let Some((first_name, first_data)) = attributes.first() else {
            panic!("add_with_data needs at least one attribute");
        };
        let Some((_, first)) = layout.find(first_name) else {
            panic!("the vertex layout has no attribute named '{first_name}'");
        };
        let count = first_data.len() / first.stride();

        let handle = self.add(device, arena, count, mode, group, layout)?;
        let mut view = self.vertex_list_mut(device, handle);
        for (name, data) in attributes {
            view.set_attribute_bytes(name, data)?;
        }
        Ok(handle)
    }

    // --- Lists ---

    /// Returns a read-only view of a list.
    pub fn vertex_list(&self, handle: ListHandle) -> VertexList<'_> {
        match self.domain(handle.domain) {
            Some(domain) => domain.vertex_list(handle.list),
            None => panic!("domain {:?} does not belong to this batch", handle.domain),
        }
    }

    /// Returns a writable view of a list.
    pub fn vertex_list_mut<'a>(
        &'a mut self,
        device: &'a dyn GraphicsDevice,
        handle: ListHandle,
    ) -> VertexListMut<'a> {
        self.domain_mut(handle.domain)
            .vertex_list_mut(device, handle.list)
    }

    /// Returns `true` if `handle` is a live list of this batch.
    pub fn contains(&self, handle: ListHandle) -> bool {
        self.domain(handle.domain)
            .is_some_and(|domain| domain.contains(handle.list))
    }

    /// Frees a list.
    pub fn delete(&mut self, handle: ListHandle) {
        self.domain_mut(handle.domain).delete(handle.list);
        self.dirty = true;
    }

    /// Changes the vertex and index counts of a list, keeping its data.
    ///
    /// Fails with [`ResourceError::InvalidHandle`] if the list was deleted or moved.
    pub fn resize(
        &mut self,
        device: &dyn GraphicsDevice,
        handle: ListHandle,
        new_count: usize,
        new_index_count: usize,
    ) -> Result<(), RenderError> {
        if !self.contains(handle) {
            return Err(ResourceError::InvalidHandle.into());
        }
        self.domain_mut(handle.domain)
            .resize(device, handle.list, new_count, new_index_count)?;
        self.dirty = true;
        Ok(())
    }

    /// Draws a list with another group from now on.
    pub fn set_group(&mut self, arena: &GroupArena, handle: ListHandle, group: GroupId) {
        self.register_group(arena, group);
        self.domain_mut(handle.domain).set_group(handle.list, group);
        self.link(group, handle.domain);
    }

    /// Moves a list into another batch, drawn with `group` and `mode`, and returns its
    /// new handle. Use [`relocate`](Batch::relocate) to move a list within one batch.
    pub fn migrate(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        handle: ListHandle,
        mode: DrawMode,
        group: GroupId,
        target: &mut Batch,
    ) -> Result<ListHandle, RenderError> {
        let source = self.domain(handle.domain).map(|domain| DomainKey {
            layout: domain.layout().clone(),
            mode,
            index_format: domain.index_format(),
        });
        let Some(key) = source else {
            panic!("domain {:?} does not belong to this batch", handle.domain);
        };

        target.register_group(arena, group);
        let domain_id = target.domain_for(device, key)?;
        let source_domain = self.domain_mut(handle.domain);
        let list = match target.domains.get_mut(domain_id.0).and_then(Option::as_mut) {
            Some(target_domain) => source_domain.migrate(device, handle.list, target_domain, group)?,
            None => panic!("domain {domain_id:?} does not belong to the target batch"),
        };
        target.link(group, domain_id);
        self.dirty = true;
        Ok(ListHandle {
            domain: domain_id,
            list,
        })
    }

    /// Moves a list to another group and draw mode within this batch.
    ///
    /// If the list already lives in the right domain only its group changes.
    pub fn relocate(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        handle: ListHandle,
        mode: DrawMode,
        group: GroupId,
    ) -> Result<ListHandle, RenderError> {
        let domain = match self.domain(handle.domain) {
            Some(domain) => domain,
            None => panic!("domain {:?} does not belong to this batch", handle.domain),
        };
        let key = DomainKey {
            layout: domain.layout().clone(),
            mode,
            index_format: domain.index_format(),
        };

        self.register_group(arena, group);
        let target_id = self.domain_for(device, key)?;
        if target_id == handle.domain {
            self.set_group(arena, handle, group);
            return Ok(handle);
        }

        // Both domains live in `self.domains`; take the target out while migrating.
        let mut target = self.domains[target_id.0].take();
        let result = match target.as_mut() {
            Some(target_domain) => self
                .domain_mut(handle.domain)
                .migrate(device, handle.list, target_domain, group),
            None => panic!("domain {target_id:?} does not belong to this batch"),
        };
        self.domains[target_id.0] = target;
        let list = result?;
        self.link(group, target_id);
        Ok(ListHandle {
            domain: target_id,
            list,
        })
    }

    // --- Drawing ---

    fn needs_compile(&self, arena: &GroupArena) -> bool {
        self.dirty || self.compiled_revision != Some(arena.revision())
    }

    /// Draws everything in the batch, recompiling the draw list first if needed.
    pub fn draw(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
    ) -> Result<BatchStats, RenderError> {
        let recompiled = self.needs_compile(arena);
        if recompiled {
            self.compile(device, arena);
        }

        let mut stats = BatchStats {
            commands: self.draw_list.len(),
            recompiled,
            ..BatchStats::default()
        };
        let domains = &mut self.domains;
        for command in &self.draw_list {
            match command {
                DrawCommand::SetState(group) => {
                    group_in(arena, *group)?.set_state(device)?;
                    stats.state_changes += 1;
                }
                DrawCommand::UnsetState(group) => {
                    group_in(arena, *group)?.unset_state(device)?;
                    stats.state_changes += 1;
                }
                DrawCommand::Draw { domain, groups } => {
                    let Some(domain) = domains.get_mut(domain.0).and_then(Option::as_mut) else {
                        log::error!("Batch: draw list refers to destroyed domain {domain:?}");
                        return Err(ResourceError::InvalidHandle.into());
                    };
                    stats.draw_calls += domain.draw_groups(device, groups)?;
                }
            }
        }
        stats.domains = self.domain_count();
        stats.groups = self.group_count();
        self.stats = stats;
        Ok(stats)
    }

    /// Draws only the given lists, each with the state of its group and ancestors.
    ///
    /// Lists whose group, or one of its ancestors, is hidden are skipped.
    pub fn draw_subset(
        &mut self,
        device: &dyn GraphicsDevice,
        arena: &GroupArena,
        handles: &[ListHandle],
    ) -> Result<BatchStats, RenderError> {
        let mut stats = BatchStats::default();
        for handle in handles {
            let group = self.vertex_list(*handle).group();
            let chain = arena.ancestry(group);
            if chain.is_empty() || !chain.iter().all(|&g| arena.is_visible(g)) {
                continue;
            }
            for &g in &chain {
                group_in(arena, g)?.set_state(device)?;
            }
            stats.draw_calls += self.domain_mut(handle.domain).draw_list(device, handle.list)?;
            for &g in chain.iter().rev() {
                group_in(arena, g)?.unset_state(device)?;
            }
            stats.state_changes += 2 * chain.len();
        }
        stats.domains = self.domain_count();
        stats.groups = self.group_count();
        Ok(stats)
    }

    // --- Queries ---

    /// Returns the compiled draw list. It may be stale until the next draw or compile.
    pub fn draw_commands(&self) -> &[DrawCommand] {
        &self.draw_list
    }

    /// Returns the statistics of the last [`draw`](Batch::draw).
    pub fn stats(&self) -> BatchStats {
        self.stats
    }

    /// Returns the number of live domains.
    pub fn domain_count(&self) -> usize {
        self.domains.iter().flatten().count()
    }

    /// Returns the ids of the live domains, in creation order.
    pub fn domain_ids(&self) -> impl Iterator<Item = DomainId> + '_ {
        self.domains
            .iter()
            .enumerate()
            .filter(|(_, domain)| domain.is_some())
            .map(|(index, _)| DomainId(index))
    }

    /// Returns the number of groups the batch knows about.
    pub fn group_count(&self) -> usize {
        self.group_children.len()
    }

    /// Returns `true` if the batch knows about `group`.
    pub fn has_group(&self, group: GroupId) -> bool {
        self.group_children.contains_key(&group)
    }

    /// Returns the root groups of the batch.
    pub fn top_groups(&self) -> &[GroupId] {
        &self.top_groups
    }

    /// Releases every domain's device buffers. The batch is empty afterwards.
    pub fn destroy(&mut self, device: &dyn GraphicsDevice) {
        for (index, slot) in self.domains.iter_mut().enumerate() {
            if let Some(mut domain) = slot.take() {
                if let Err(e) = domain.destroy(device) {
                    log::warn!("Batch: failed to destroy domain {index}: {e}");
                }
            }
        }
        self.domain_map.clear();
        self.group_map.clear();
        self.group_children.clear();
        self.top_groups.clear();
        self.draw_list.clear();
        self.dirty = true;
    }
}

fn group_in(arena: &GroupArena, group: GroupId) -> Result<&dyn Group, RenderError> {
    arena
        .get(group)
        .ok_or_else(|| RenderError::Internal(format!("group {group:?} is no longer alive")))
}
