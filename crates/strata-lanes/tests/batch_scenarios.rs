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

use std::collections::HashMap;

use strata_core::renderer::{
    DrawMode, GroupArena, GroupId, IndexFormat, RenderError, ResourceError, StateGroup, StateKey,
    StateKind, VertexLayout,
};
use strata_infra::{DeviceCommand, HeadlessDevice};
use strata_lanes::{Batch, BatchSettings, DrawCommand, ListHandle};

// --- HELPERS FOR THESE SCENARIOS ---

fn layout() -> VertexLayout {
    VertexLayout::parse("position:float32x2, colors:unorm8x4").unwrap()
}

fn program(value: u64) -> StateKey {
    StateKey::new(StateKind::Program, value)
}

fn texture(value: u64) -> StateKey {
    StateKey::new(StateKind::Texture(0), value)
}

fn triangle(
    batch: &mut Batch,
    device: &HeadlessDevice,
    arena: &GroupArena,
    group: GroupId,
    mode: DrawMode,
) -> ListHandle {
    let positions: [[f32; 2]; 3] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
    let colors: [[u8; 4]; 3] = [[255; 4]; 3];
    batch
        .add_with_data(
            device,
            arena,
            mode,
            group,
            &layout(),
            &[
                ("position", bytemuck::cast_slice(&positions)),
                ("colors", bytemuck::cast_slice(&colors)),
            ],
        )
        .unwrap()
}

/// Only the state changes and draws, in device order.
fn state_and_draws(device: &HeadlessDevice) -> Vec<DeviceCommand> {
    device
        .commands()
        .into_iter()
        .filter(|command| {
            command.is_draw()
                || matches!(
                    command,
                    DeviceCommand::ApplyState(_) | DeviceCommand::ResetState(_)
                )
        })
        .collect()
}

fn drawn_vertices(device: &HeadlessDevice) -> usize {
    device
        .draws()
        .iter()
        .map(|draw| match &draw.command {
            DeviceCommand::DrawArrays { ranges, .. } => ranges.iter().map(|(_, n)| n).sum(),
            _ => 0,
        })
        .sum()
}

#[test]
fn test_group_order_decides_state_and_draw_sequence() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let late = arena.insert_ordered(StateGroup::new("late", vec![program(2)]), 1, None);
    let early = arena.insert_ordered(StateGroup::new("early", vec![program(1)]), 0, None);
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, late, DrawMode::TriangleList);
    let first = triangle(&mut batch, &device, &arena, early, DrawMode::TriangleList);
    let domain = first.domain();

    // --- 2. ACT ---
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(
        batch.draw_commands(),
        &[
            DrawCommand::SetState(early),
            DrawCommand::Draw {
                domain,
                groups: vec![early]
            },
            DrawCommand::UnsetState(early),
            DrawCommand::SetState(late),
            DrawCommand::Draw {
                domain,
                groups: vec![late]
            },
            DrawCommand::UnsetState(late),
        ]
    );
    assert_eq!(
        state_and_draws(&device),
        vec![
            DeviceCommand::ApplyState(program(1)),
            DeviceCommand::DrawArrays {
                mode: DrawMode::TriangleList,
                ranges: vec![(3, 3)],
                instances: 1
            },
            DeviceCommand::ResetState(program(1)),
            DeviceCommand::ApplyState(program(2)),
            DeviceCommand::DrawArrays {
                mode: DrawMode::TriangleList,
                ranges: vec![(0, 3)],
                instances: 1
            },
            DeviceCommand::ResetState(program(2)),
        ]
    );
    assert!(stats.recompiled);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.state_changes, 4);
    assert!(device.active_states().is_empty());
}

#[test]
fn test_every_list_is_drawn_exactly_once() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let root = arena.insert(StateGroup::new("root", vec![program(1)]), None);
    let lines = arena.insert(StateGroup::new("lines", vec![texture(4)]), Some(root));
    let other = arena.insert(StateGroup::new("other", vec![program(2)]), None);
    let mut batch = Batch::new();
    for _ in 0..3 {
        triangle(&mut batch, &device, &arena, root, DrawMode::TriangleList);
    }
    triangle(&mut batch, &device, &arena, lines, DrawMode::LineList);
    triangle(&mut batch, &device, &arena, other, DrawMode::TriangleStrip);
    triangle(&mut batch, &device, &arena, other, DrawMode::TriangleStrip);

    // --- 2. ACT ---
    batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(batch.domain_count(), 3);
    assert_eq!(drawn_vertices(&device), 6 * 3);
    // Strips are never joined, so the two strip lists stay separate ranges.
    let strip_ranges: Vec<Vec<(usize, usize)>> = device
        .draws()
        .into_iter()
        .filter_map(|draw| match draw.command {
            DeviceCommand::DrawArrays {
                mode: DrawMode::TriangleStrip,
                ranges,
                ..
            } => Some(ranges),
            _ => None,
        })
        .collect();
    assert_eq!(strip_ranges, vec![vec![(0, 3), (3, 3)]]);
}

#[test]
fn test_every_draw_sees_the_state_of_its_group_chain() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let root = arena.insert(StateGroup::new("root", vec![program(1)]), None);
    let child = arena.insert(StateGroup::new("child", vec![texture(7)]), Some(root));
    let leaf = arena.insert(StateGroup::new("leaf", vec![program(1)]), Some(child));
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, root, DrawMode::TriangleList);
    triangle(&mut batch, &device, &arena, child, DrawMode::LineList);
    triangle(&mut batch, &device, &arena, leaf, DrawMode::PointList);

    // --- 2. ACT ---
    batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    let draws = device.draws();
    assert_eq!(draws.len(), 3);
    for draw in draws {
        let DeviceCommand::DrawArrays { mode, .. } = draw.command else {
            panic!("unexpected draw {:?}", draw.command);
        };
        let expected = match mode {
            DrawMode::TriangleList => vec![program(1)],
            _ => vec![program(1), texture(7)],
        };
        for state in expected {
            assert!(
                draw.states.contains(&state),
                "{mode:?} draw is missing {state:?}"
            );
        }
    }
    // The leaf's program is already applied by the root.
    let program_applications = device
        .commands()
        .into_iter()
        .filter(|c| *c == DeviceCommand::ApplyState(program(1)))
        .count();
    assert_eq!(program_applications, 1);
    assert!(device.active_states().is_empty());
}

/// The value in effect for every state kind: the last applied one wins.
fn effective_states(states: &[StateKey]) -> HashMap<StateKind, u64> {
    states.iter().map(|state| (state.kind, state.value)).collect()
}

#[test]
fn test_a_state_overridden_by_an_ancestor_is_restored_for_descendants() {
    // --- 1. ARRANGE ---
    // root sets program 1, mid switches to program 2, leaf needs program 1 again.
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let root = arena.insert(StateGroup::new("root", vec![program(1), texture(5)]), None);
    let mid = arena.insert_ordered(StateGroup::new("mid", vec![program(2)]), 0, Some(root));
    let leaf = arena.insert(StateGroup::new("leaf", vec![program(1)]), Some(mid));
    let late = arena.insert_ordered(StateGroup::new("late", vec![program(1)]), 1, Some(root));
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, root, DrawMode::TriangleList);
    triangle(&mut batch, &device, &arena, mid, DrawMode::LineList);
    triangle(&mut batch, &device, &arena, leaf, DrawMode::PointList);
    triangle(&mut batch, &device, &arena, late, DrawMode::LineStrip);

    // --- 2. ACT ---
    batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    let draws = device.draws();
    assert_eq!(draws.len(), 4);
    for draw in draws {
        let DeviceCommand::DrawArrays { mode, .. } = draw.command else {
            panic!("unexpected draw {:?}", draw.command);
        };
        let expected_program = match mode {
            DrawMode::LineList => 2,
            _ => 1,
        };
        let effective = effective_states(&draw.states);
        assert_eq!(
            effective.get(&StateKind::Program),
            Some(&expected_program),
            "{mode:?} draw runs with the wrong program"
        );
        assert_eq!(effective.get(&StateKind::Texture(0)), Some(&5));
    }
    // The leaf re-applies program 1; the late sibling finds it in effect again.
    assert!(batch.draw_commands().contains(&DrawCommand::SetState(leaf)));
    assert!(!batch.draw_commands().contains(&DrawCommand::SetState(late)));
    assert!(device.active_states().is_empty());
}

#[test]
fn test_siblings_with_equal_state_share_one_application_and_one_draw() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let a = arena.insert(StateGroup::new("a", vec![program(1), texture(2)]), None);
    let b = arena.insert(StateGroup::new("b", vec![program(1), texture(2)]), None);
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, a, DrawMode::TriangleList);
    triangle(&mut batch, &device, &arena, b, DrawMode::TriangleList);

    // --- 2. ACT ---
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.state_changes, 2);
    assert_eq!(batch.draw_commands().len(), 3);
    let draws = device.draws();
    assert_eq!(
        draws[0].command,
        DeviceCommand::DrawArrays {
            mode: DrawMode::TriangleList,
            ranges: vec![(0, 6)],
            instances: 1
        }
    );
    assert_eq!(draws[0].states, vec![program(1), texture(2)]);
}

#[test]
fn test_disabled_optimizations_keep_every_transition() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let a = arena.insert(StateGroup::new("a", vec![program(1)]), None);
    let b = arena.insert(StateGroup::new("b", vec![program(1)]), None);
    let settings = BatchSettings {
        elide_redundant_states: false,
        merge_draws: false,
        ..BatchSettings::default()
    };
    let mut batch = Batch::with_settings(settings);
    triangle(&mut batch, &device, &arena, a, DrawMode::TriangleList);
    triangle(&mut batch, &device, &arena, b, DrawMode::TriangleList);

    // --- 2. ACT ---
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(batch.draw_commands().len(), 6);
    assert_eq!(stats.draw_calls, 2);
    assert_eq!(stats.state_changes, 4);
}

#[test]
fn test_hidden_groups_draw_nothing_until_shown() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let root = arena.insert(StateGroup::new("root", vec![program(1)]), None);
    let child = arena.insert(StateGroup::new("child", vec![texture(1)]), Some(root));
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, child, DrawMode::TriangleList);
    batch.draw(&device, &arena).unwrap();
    device.clear_commands();

    // --- 2. ACT ---
    arena.set_visible(root, false);
    let hidden = batch.draw(&device, &arena).unwrap();
    let hidden_commands = state_and_draws(&device);
    arena.set_visible(root, true);
    let shown = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert!(hidden.recompiled);
    assert_eq!(hidden.draw_calls, 0);
    assert!(hidden_commands.is_empty());
    assert!(batch.has_group(child), "hidden groups stay registered");
    assert!(shown.recompiled);
    assert_eq!(shown.draw_calls, 1);
}

#[test]
fn test_groups_and_domains_without_lists_are_pruned() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let keep = arena.insert(StateGroup::new("keep", vec![program(1)]), None);
    let drop = arena.insert(StateGroup::new("drop", vec![program(2)]), None);
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, keep, DrawMode::TriangleList);
    let doomed = triangle(&mut batch, &device, &arena, drop, DrawMode::LineList);
    batch.draw(&device, &arena).unwrap();
    assert_eq!(batch.domain_count(), 2);

    // --- 2. ACT ---
    batch.delete(doomed);
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert!(!batch.has_group(drop));
    assert!(batch.has_group(keep));
    assert_eq!(batch.top_groups(), &[keep]);
    assert_eq!(batch.domain_count(), 1);
    assert_eq!(stats.draw_calls, 1);
    assert!(device
        .commands()
        .iter()
        .any(|c| matches!(c, DeviceCommand::DestroyBuffer(_))));
}

#[test]
fn test_resizing_a_deleted_list_reports_an_invalid_handle() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let group = arena.insert(StateGroup::new("group", vec![program(1)]), None);
    let mut batch = Batch::new();
    let handle = triangle(&mut batch, &device, &arena, group, DrawMode::TriangleList);
    batch.delete(handle);
    batch.draw(&device, &arena).unwrap();

    // --- 2. ACT ---
    let result = batch.resize(&device, handle, 6, 0);

    // --- 3. ASSERT ---
    assert!(matches!(
        result,
        Err(RenderError::ResourceError(ResourceError::InvalidHandle))
    ));
}

#[test]
fn test_lists_of_removed_groups_are_no_longer_drawn() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let alive = arena.insert(StateGroup::new("alive", vec![program(1)]), None);
    let removed = arena.insert(StateGroup::new("removed", vec![program(2)]), None);
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, alive, DrawMode::TriangleList);
    let orphan = triangle(&mut batch, &device, &arena, removed, DrawMode::TriangleList);

    // --- 2. ACT ---
    arena.remove(removed);
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 1);
    assert!(!batch.has_group(removed));
    assert!(batch.contains(orphan), "the list itself is still allocated");
    assert_eq!(drawn_vertices(&device), 3);
}

#[test]
fn test_draw_list_is_reused_until_something_changes() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let a = arena.insert(StateGroup::new("a", vec![program(1)]), None);
    let b = arena.insert(StateGroup::new("b", vec![program(2)]), None);
    let mut batch = Batch::new();
    triangle(&mut batch, &device, &arena, a, DrawMode::TriangleList);
    triangle(&mut batch, &device, &arena, b, DrawMode::TriangleList);

    // --- 2. ACT ---
    let first = batch.draw(&device, &arena).unwrap();
    let second = batch.draw(&device, &arena).unwrap();
    arena.set_order(a, 5);
    let reordered = batch.draw(&device, &arena).unwrap();
    triangle(&mut batch, &device, &arena, b, DrawMode::TriangleList);
    let grown = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert!(first.recompiled);
    assert!(!second.recompiled);
    assert!(reordered.recompiled);
    assert_eq!(batch.draw_commands()[0], DrawCommand::SetState(b));
    assert!(grown.recompiled);
    assert_eq!(batch.stats(), grown);
}

#[test]
fn test_migrate_moves_a_list_into_another_batch() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let from = arena.insert(StateGroup::new("from", vec![program(1)]), None);
    let to = arena.insert(StateGroup::new("to", vec![program(2)]), None);
    let mut source = Batch::new();
    let mut target = Batch::new();
    let handle = triangle(&mut source, &device, &arena, from, DrawMode::TriangleList);

    // --- 2. ACT ---
    let moved = source
        .migrate(&device, &arena, handle, DrawMode::TriangleList, to, &mut target)
        .unwrap();
    let source_stats = source.draw(&device, &arena).unwrap();
    let target_stats = target.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert!(!source.contains(handle));
    assert!(target.contains(moved));
    assert_eq!(source_stats.draw_calls, 0);
    assert_eq!(source.domain_count(), 0);
    assert_eq!(target_stats.draw_calls, 1);
    let list = target.vertex_list(moved);
    assert_eq!(list.group(), to);
    assert_eq!(
        list.attribute::<[f32; 2]>("position"),
        vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]
    );
}

#[test]
fn test_relocate_changes_draw_mode_within_a_batch() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let group = arena.insert(StateGroup::new("group", vec![program(1)]), None);
    let outline = arena.insert(StateGroup::new("outline", vec![program(3)]), None);
    let mut batch = Batch::new();
    let handle = triangle(&mut batch, &device, &arena, group, DrawMode::TriangleList);

    // --- 2. ACT ---
    let same_domain = batch
        .relocate(&device, &arena, handle, DrawMode::TriangleList, outline)
        .unwrap();
    let moved = batch
        .relocate(&device, &arena, same_domain, DrawMode::LineStrip, outline)
        .unwrap();
    batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(same_domain, handle);
    assert_ne!(moved.domain(), handle.domain());
    assert_eq!(batch.domain_count(), 1);
    assert!(!batch.has_group(group));
    assert_eq!(
        batch.vertex_list(moved).attribute::<[u8; 4]>("colors"),
        vec![[255; 4]; 3]
    );
    assert!(matches!(
        device.draws()[0].command,
        DeviceCommand::DrawArrays {
            mode: DrawMode::LineStrip,
            ..
        }
    ));
}

#[test]
fn test_draw_subset_applies_each_lists_own_chain() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let root = arena.insert(StateGroup::new("root", vec![program(1)]), None);
    let child = arena.insert(StateGroup::new("child", vec![texture(9)]), Some(root));
    let hidden = arena.insert(StateGroup::new("hidden", vec![program(4)]), None);
    arena.set_visible(hidden, false);
    let mut batch = Batch::new();
    let wanted = triangle(&mut batch, &device, &arena, child, DrawMode::TriangleList);
    let unwanted = triangle(&mut batch, &device, &arena, root, DrawMode::TriangleList);
    let invisible = triangle(&mut batch, &device, &arena, hidden, DrawMode::TriangleList);

    // --- 2. ACT ---
    let stats = batch
        .draw_subset(&device, &arena, &[wanted, invisible])
        .unwrap();

    // --- 3. ASSERT ---
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(stats.state_changes, 4);
    let draws = device.draws();
    assert_eq!(draws.len(), 1);
    assert_eq!(draws[0].states, vec![program(1), texture(9)]);
    let start = batch.vertex_list(wanted).start();
    assert_eq!(
        draws[0].command,
        DeviceCommand::DrawArrays {
            mode: DrawMode::TriangleList,
            ranges: vec![(start, 3)],
            instances: 1
        }
    );
    assert!(batch.contains(unwanted));
    assert!(device.active_states().is_empty());
}

#[test]
fn test_indexed_lists_share_one_index_buffer() {
    // --- 1. ARRANGE ---
    let device = HeadlessDevice::new();
    let mut arena = GroupArena::new();
    let group = arena.insert(StateGroup::new("quads", vec![program(1)]), None);
    let mut batch = Batch::new();
    let quad: [u32; 6] = [0, 1, 2, 0, 2, 3];

    // --- 2. ACT ---
    let first = batch
        .add_indexed(
            &device,
            &arena,
            4,
            DrawMode::TriangleList,
            group,
            &layout(),
            IndexFormat::Uint16,
            &quad,
        )
        .unwrap();
    let second = batch
        .add_indexed(
            &device,
            &arena,
            4,
            DrawMode::TriangleList,
            group,
            &layout(),
            IndexFormat::Uint16,
            &quad,
        )
        .unwrap();
    let stats = batch.draw(&device, &arena).unwrap();

    // --- 3. ASSERT ---
    assert_eq!(first.domain(), second.domain());
    assert_eq!(batch.vertex_list(second).indices(), quad.to_vec());
    assert_eq!(batch.vertex_list(second).start(), 4);
    assert_eq!(stats.draw_calls, 1);
    assert_eq!(
        device.draws()[0].command,
        DeviceCommand::DrawElements {
            mode: DrawMode::TriangleList,
            format: IndexFormat::Uint16,
            ranges: vec![(0, 12)],
        }
    );
}
