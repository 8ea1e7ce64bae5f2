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

// Strata Sandbox
// Builds a small scene, draws it on the headless device and logs what happened.

use anyhow::Result;
use strata_core::renderer::{
    DrawMode, GroupArena, IndexFormat, StateGroup, StateKey, StateKind, VertexLayout,
};
use strata_infra::HeadlessDevice;
use strata_lanes::{Batch, BatchSettings, BatchStats};

const QUAD_INDICES: &[u32] = &[0, 1, 2, 0, 2, 3];

const SETTINGS: &str = r#"(
    allocation: (
        initial_vertex_capacity: 8,
        growth: NextPowerOfTwo,
    ),
    merge_draws: true,
)"#;

fn quad(x: f32, y: f32) -> [[f32; 2]; 4] {
    [[x, y], [x + 1.0, y], [x + 1.0, y + 1.0], [x, y + 1.0]]
}

fn report(label: &str, stats: &BatchStats) {
    log::info!(
        "{label}: {} commands, {} draw calls, {} state changes, {} domains, {} groups (recompiled: {})",
        stats.commands,
        stats.draw_calls,
        stats.state_changes,
        stats.domains,
        stats.groups,
        stats.recompiled
    );
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let device = HeadlessDevice::new();
    let layout = VertexLayout::parse("position:float32x2, colors:unorm8x4/static")?;
    let settings = BatchSettings::from_ron_str(SETTINGS)?;
    let mut batch = Batch::with_settings(settings);

    let program = StateKey::new(StateKind::Program, 1);
    let mut arena = GroupArena::new();
    let background = arena.insert_ordered(StateGroup::ordering("background"), 0, None);
    let sprites = arena.insert_ordered(StateGroup::new("sprites", vec![program]), 1, None);
    let atlas_a = arena.insert(
        StateGroup::new("atlas-a", vec![StateKey::new(StateKind::Texture(0), 10)]),
        Some(sprites),
    );
    let atlas_b = arena.insert(
        StateGroup::new("atlas-b", vec![StateKey::new(StateKind::Texture(0), 11)]),
        Some(sprites),
    );

    let sky = batch.add(&device, &arena, 4, DrawMode::TriangleFan, background, &layout)?;
    batch
        .vertex_list_mut(&device, sky)
        .set_attribute("position", &quad(-1.0, -1.0))?;

    let mut handles = Vec::new();
    for i in 0..6 {
        let group = if i % 2 == 0 { atlas_a } else { atlas_b };
        let handle = batch.add_indexed(
            &device,
            &arena,
            4,
            DrawMode::TriangleList,
            group,
            &layout,
            IndexFormat::Uint16,
            QUAD_INDICES,
        )?;
        let mut list = batch.vertex_list_mut(&device, handle);
        list.set_attribute("position", &quad(i as f32, 0.0))?;
        list.set_attribute("colors", &[[255u8, 255, 255, 255]; 4])?;
        handles.push(handle);
    }

    let stats = batch.draw(&device, &arena)?;
    report("first frame", &stats);
    let stats = batch.draw(&device, &arena)?;
    report("second frame", &stats);

    arena.set_visible(atlas_b, false);
    let stats = batch.draw(&device, &arena)?;
    report("atlas-b hidden", &stats);

    batch.delete(sky);
    batch.resize(&device, handles[0], 8, 12)?;
    let stats = batch.draw(&device, &arena)?;
    report("sky removed", &stats);

    let stats = batch.draw_subset(&device, &arena, &handles[..2])?;
    report("subset", &stats);

    log::info!(
        "device recorded {} commands, {} buffers alive",
        device.commands().len(),
        device.buffer_count()
    );
    batch.destroy(&device);
    log::info!("after destroy: {} buffers alive", device.buffer_count());
    Ok(())
}
