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

//! The render-state tree shared by batches.
//!
//! A [`Group`] is a capability object: it knows which pieces of render state it needs
//! and how to apply and remove them. Groups are stored in a [`GroupArena`] and referred
//! to everywhere else by [`GroupId`], a generational handle. Batches and vertex domains
//! only ever hold ids, so a group is shared by any number of batches without reference
//! counting, and a removed group simply makes its stale ids resolve to nothing.

use crate::renderer::error::RenderError;
use crate::renderer::traits::GraphicsDevice;
use std::fmt::Debug;

/// A unique identifier for a group in a [`GroupArena`].
///
/// It combines an index with a generation count. When a group is removed its index
/// can be recycled, but the generation is incremented so that old ids pointing to the
/// recycled slot no longer resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GroupId {
    /// The index of the group's slot in the arena.
    pub index: u32,
    /// A generation counter that is incremented each time the index is recycled.
    pub generation: u32,
}

/// The category of a piece of render state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StateKind {
    /// A linked shader program.
    Program,
    /// A texture bound to the given texture unit.
    Texture(u32),
    /// A blend function configuration.
    Blend,
    /// Depth testing configuration.
    Depth,
    /// A scissor rectangle.
    Scissor,
    /// Application-defined state.
    Custom(u32),
}

/// One piece of render state a group requires, such as "program 3" or "texture 9 on unit 0".
///
/// Two groups whose state sets compare equal are interchangeable for the draw-list
/// optimizer, which lets it skip redundant state changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateKey {
    /// What kind of state this is.
    pub kind: StateKind,
    /// Backend-specific value, such as a program or texture name.
    pub value: u64,
}

impl StateKey {
    /// Creates a new state key.
    pub const fn new(kind: StateKind, value: u64) -> Self {
        Self { kind, value }
    }
}

/// A node of the render-state tree.
///
/// `set_state` must apply exactly the state listed by [`states`](Group::states) and
/// `unset_state` must restore what was active before `set_state`. The batch compiler
/// relies on this to skip redundant state changes. The default implementations forward
/// every state to the device in order and reset them in reverse order.
pub trait Group: Debug {
    /// A human-readable label used in logs and errors.
    fn label(&self) -> &str {
        "group"
    }

    /// The render state this group applies.
    fn states(&self) -> &[StateKey] {
        &[]
    }

    /// Applies this group's render state.
    fn set_state(&self, device: &dyn GraphicsDevice) -> Result<(), RenderError> {
        for state in self.states() {
            device
                .apply_state(state)
                .map_err(|e| RenderError::StateError {
                    group: self.label().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }

    /// Removes this group's render state, restoring what was active before.
    fn unset_state(&self, device: &dyn GraphicsDevice) -> Result<(), RenderError> {
        for state in self.states().iter().rev() {
            device
                .reset_state(state)
                .map_err(|e| RenderError::StateError {
                    group: self.label().to_string(),
                    reason: e.to_string(),
                })?;
        }
        Ok(())
    }
}

/// A group defined entirely by its list of states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateGroup {
    label: String,
    states: Vec<StateKey>,
}

impl StateGroup {
    /// Creates a group that applies `states` in order.
    pub fn new(label: impl Into<String>, states: Vec<StateKey>) -> Self {
        Self {
            label: label.into(),
            states,
        }
    }

    /// Creates a group that applies no state; useful for ordering only.
    pub fn ordering(label: impl Into<String>) -> Self {
        Self::new(label, Vec::new())
    }
}

impl Group for StateGroup {
    fn label(&self) -> &str {
        &self.label
    }

    fn states(&self) -> &[StateKey] {
        &self.states
    }
}

#[derive(Debug)]
struct GroupNode {
    group: Box<dyn Group>,
    parent: Option<GroupId>,
    order: i32,
    visible: bool,
    sequence: u64,
}

/// Owns every group and the tree structure between them.
///
/// The arena keeps a revision counter that increases on every structural or
/// ordering change, which lets a batch notice that its compiled draw list is out of
/// date without the group having to know which batches reference it.
#[derive(Debug, Default)]
pub struct GroupArena {
    slots: Vec<(GroupId, Option<GroupNode>)>,
    free: Vec<u32>,
    next_sequence: u64,
    revision: u64,
}

impl GroupArena {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a group with ordering key 0.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not refer to a live group.
    pub fn insert(&mut self, group: impl Group + 'static, parent: Option<GroupId>) -> GroupId {
        self.insert_ordered(group, 0, parent)
    }

    /// Inserts a group with the given ordering key.
    ///
    /// Siblings are drawn in ascending `order`; siblings with the same order are drawn
    /// in insertion order.
    ///
    /// # Panics
    ///
    /// Panics if `parent` does not refer to a live group.
    pub fn insert_ordered(
        &mut self,
        group: impl Group + 'static,
        order: i32,
        parent: Option<GroupId>,
    ) -> GroupId {
        if let Some(parent) = parent {
            assert!(self.contains(parent), "parent group {parent:?} is not alive");
        }
        let node = GroupNode {
            group: Box::new(group),
            parent,
            order,
            visible: true,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        self.revision += 1;

        if let Some(index) = self.free.pop() {
            let (id_slot, node_slot) = &mut self.slots[index as usize];
            id_slot.generation += 1;
            *node_slot = Some(node);
            *id_slot
        } else {
            let id = GroupId {
                index: self.slots.len() as u32,
                generation: 0,
            };
            self.slots.push((id, Some(node)));
            id
        }
    }

    /// Removes a group and returns it. Stale ids to it stop resolving.
    ///
    /// # Panics
    ///
    /// Panics if another live group still names this one as its parent.
    pub fn remove(&mut self, id: GroupId) -> Option<Box<dyn Group>> {
        self.node(id)?;
        assert!(
            !self
                .slots
                .iter()
                .any(|(_, node)| node.as_ref().is_some_and(|n| n.parent == Some(id))),
            "group {id:?} still has children"
        );
        let node = self.slots[id.index as usize].1.take()?;
        self.free.push(id.index);
        self.revision += 1;
        log::trace!("GroupArena: removed group '{}' ({id:?})", node.group.label());
        Some(node.group)
    }

    fn node(&self, id: GroupId) -> Option<&GroupNode> {
        self.slots
            .get(id.index as usize)
            .and_then(|(slot_id, node)| {
                if slot_id.generation == id.generation {
                    node.as_ref()
                } else {
                    None
                }
            })
    }

    fn node_mut(&mut self, id: GroupId) -> Option<&mut GroupNode> {
        self.slots
            .get_mut(id.index as usize)
            .and_then(|(slot_id, node)| {
                if slot_id.generation == id.generation {
                    node.as_mut()
                } else {
                    None
                }
            })
    }

    /// Returns `true` if `id` refers to a live group.
    pub fn contains(&self, id: GroupId) -> bool {
        self.node(id).is_some()
    }

    /// Returns the group behind `id`.
    pub fn get(&self, id: GroupId) -> Option<&dyn Group> {
        self.node(id).map(|n| n.group.as_ref())
    }

    /// Returns the parent of `id`, or `None` for a root or a stale id.
    pub fn parent(&self, id: GroupId) -> Option<GroupId> {
        self.node(id).and_then(|n| n.parent)
    }

    /// Returns the ordering key of `id`.
    pub fn order(&self, id: GroupId) -> Option<i32> {
        self.node(id).map(|n| n.order)
    }

    /// Returns the key siblings are sorted by: the ordering key, then insertion order.
    pub fn sort_key(&self, id: GroupId) -> Option<(i32, u64)> {
        self.node(id).map(|n| (n.order, n.sequence))
    }

    /// Returns `true` if the group is live and visible.
    pub fn is_visible(&self, id: GroupId) -> bool {
        self.node(id).is_some_and(|n| n.visible)
    }

    /// Changes the ordering key of a group. Returns `false` for a stale id.
    pub fn set_order(&mut self, id: GroupId, order: i32) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                if node.order != order {
                    node.order = order;
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Shows or hides a group and its descendants. Returns `false` for a stale id.
    pub fn set_visible(&mut self, id: GroupId, visible: bool) -> bool {
        match self.node_mut(id) {
            Some(node) => {
                if node.visible != visible {
                    node.visible = visible;
                    self.revision += 1;
                }
                true
            }
            None => false,
        }
    }

    /// Returns the chain from the root down to `id`, both included.
    pub fn ancestry(&self, id: GroupId) -> Vec<GroupId> {
        let mut chain = Vec::new();
        let mut current = self.contains(id).then_some(id);
        while let Some(group) = current {
            chain.push(group);
            current = self.parent(group);
        }
        chain.reverse();
        chain
    }

    /// Returns a counter that changes whenever groups are added, removed, reordered
    /// or shown/hidden.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Returns the number of live groups.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    /// Returns `true` if the arena holds no live group.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::renderer::api::*;
    use crate::renderer::error::ResourceError;
    use std::cell::RefCell;

    /// A mock graphics device that only records state changes.
    #[derive(Debug, Default)]
    struct MockGraphicsDevice {
        log: RefCell<Vec<String>>,
        fail_states: bool,
    }

    impl GraphicsDevice for MockGraphicsDevice {
        fn create_buffer(&self, _d: &BufferDescriptor) -> Result<BufferId, ResourceError> {
            Ok(BufferId(1))
        }
        fn destroy_buffer(&self, _id: BufferId) -> Result<(), ResourceError> {
            Ok(())
        }
        fn upload_buffer(&self, _id: BufferId, _data: &[u8]) -> Result<(), ResourceError> {
            Ok(())
        }
        fn upload_buffer_range(
            &self,
            _id: BufferId,
            _offset: u64,
            _data: &[u8],
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn resize_buffer(&self, _id: BufferId, _size: u64) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_vertex_buffer(
            &self,
            _id: BufferId,
            _a: &VertexAttribute,
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn bind_index_buffer(&self, _id: BufferId, _f: IndexFormat) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_arrays(&self, _m: DrawMode, _f: usize, _c: usize) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_arrays_multi(
            &self,
            _m: DrawMode,
            _f: &[usize],
            _c: &[usize],
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_arrays_instanced(
            &self,
            _m: DrawMode,
            _f: usize,
            _c: usize,
            _i: usize,
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_elements(
            &self,
            _m: DrawMode,
            _c: usize,
            _f: IndexFormat,
            _o: u64,
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn draw_elements_multi(
            &self,
            _m: DrawMode,
            _c: &[usize],
            _f: IndexFormat,
            _o: &[u64],
        ) -> Result<(), ResourceError> {
            Ok(())
        }
        fn apply_state(&self, state: &StateKey) -> Result<(), ResourceError> {
            if self.fail_states {
                return Err(ResourceError::BackendError("state rejected".to_string()));
            }
            self.log.borrow_mut().push(format!("apply {:?}", state.kind));
            Ok(())
        }
        fn reset_state(&self, state: &StateKey) -> Result<(), ResourceError> {
            self.log.borrow_mut().push(format!("reset {:?}", state.kind));
            Ok(())
        }
    }

    #[test]
    fn default_group_applies_in_order_and_resets_in_reverse() {
        let device = MockGraphicsDevice::default();
        let group = StateGroup::new(
            "sprites",
            vec![
                StateKey::new(StateKind::Program, 1),
                StateKey::new(StateKind::Texture(0), 4),
            ],
        );
        group.set_state(&device).unwrap();
        group.unset_state(&device).unwrap();
        assert_eq!(
            *device.log.borrow(),
            vec![
                "apply Program",
                "apply Texture(0)",
                "reset Texture(0)",
                "reset Program"
            ]
        );
    }

    #[test]
    fn state_failures_name_the_group() {
        let device = MockGraphicsDevice {
            fail_states: true,
            ..Default::default()
        };
        let group = StateGroup::new("hud", vec![StateKey::new(StateKind::Blend, 1)]);
        match group.set_state(&device) {
            Err(RenderError::StateError { group, .. }) => assert_eq!(group, "hud"),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn removed_ids_go_stale_and_slots_are_recycled() {
        let mut arena = GroupArena::new();
        let a = arena.insert(StateGroup::ordering("a"), None);
        assert!(arena.remove(a).is_some());
        assert!(!arena.contains(a));
        assert!(arena.get(a).is_none());

        let b = arena.insert(StateGroup::ordering("b"), None);
        assert_eq!(b.index, a.index);
        assert_ne!(b.generation, a.generation);
        assert_eq!(arena.get(b).unwrap().label(), "b");
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn ancestry_runs_from_root_to_leaf() {
        let mut arena = GroupArena::new();
        let root = arena.insert(StateGroup::ordering("root"), None);
        let mid = arena.insert(StateGroup::ordering("mid"), Some(root));
        let leaf = arena.insert(StateGroup::ordering("leaf"), Some(mid));
        assert_eq!(arena.ancestry(leaf), vec![root, mid, leaf]);
        assert_eq!(arena.parent(leaf), Some(mid));
    }

    #[test]
    fn mutations_bump_the_revision() {
        let mut arena = GroupArena::new();
        let a = arena.insert_ordered(StateGroup::ordering("a"), 3, None);
        let revision = arena.revision();
        assert!(arena.set_order(a, 3));
        assert_eq!(arena.revision(), revision);
        assert!(arena.set_order(a, 5));
        assert!(arena.set_visible(a, false));
        assert_eq!(arena.revision(), revision + 2);
        assert!(!arena.is_visible(a));
        assert_eq!(arena.sort_key(a), Some((5, 0)));
    }

    #[test]
    #[should_panic(expected = "still has children")]
    fn removing_a_parent_panics() {
        let mut arena = GroupArena::new();
        let root = arena.insert(StateGroup::ordering("root"), None);
        arena.insert(StateGroup::ordering("child"), Some(root));
        arena.remove(root);
    }
}
