use bevy::prelude::*;

use crate::assets::Textures;
use crate::camera::CameraState;
use crate::components::*;
use crate::game_runtime::{editor_systems_enabled, EditMode, SessionOutcome};
use crate::input::{self, VirtualInput};
use crate::parallax::BackgroundScroll;
use crate::persistence;
use crate::spawn;
use crate::tilemap::{Tilemap, MAX_DIMENSION};

/// Pointer press in viewport pixels, sent by whoever owns the window.
#[derive(Event, Clone, Copy, Debug)]
pub struct EditorClick {
    pub cursor_x: f32,
    pub cursor_y: f32,
}

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct ToggleEditMode;

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct SaveLevel;

#[derive(Event, Clone, Copy, Debug, Default)]
pub struct ReloadLevel;

pub struct EditorPlugin;

impl Plugin for EditorPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<EditorClick>()
            .add_event::<ToggleEditMode>()
            .add_event::<SaveLevel>()
            .add_event::<ReloadLevel>()
            .add_systems(
                Update,
                (
                    actions_to_events,
                    switch_edit_mode,
                    (editor_pan, apply_editor_clicks)
                        .chain()
                        .run_if(editor_systems_enabled),
                    save_level_on_request,
                    reload_level_on_request,
                )
                    .chain()
                    .in_set(crate::FrameSet::Editor),
            );
    }
}

/// Grid cell under a viewport cursor, as `(row, col)`. `None` when either
/// index would be negative or past the grid size cap, or the cell size is
/// unusable.
pub fn cell_at(cursor_x: f32, cursor_y: f32, camera_x: f32, cell_size: f32) -> Option<(i32, i32)> {
    if cell_size <= 0.0 || !cell_size.is_finite() {
        return None;
    }
    let col = ((cursor_x + camera_x) / cell_size).floor();
    let row = (cursor_y / cell_size).floor();
    if !col.is_finite() || !row.is_finite() || col < 0.0 || row < 0.0 {
        return None;
    }
    if col >= MAX_DIMENSION as f32 || row >= MAX_DIMENSION as f32 {
        return None;
    }
    Some((row as i32, col as i32))
}

/// Cycle the tile under the cursor, growing the grid when the cell lies
/// past its current edge. Returns the cell and its new id.
pub fn apply_click(
    tilemap: &mut Tilemap,
    cursor_x: f32,
    cursor_y: f32,
    camera_x: f32,
    cell_size: f32,
    cycle: TileCycle,
) -> Option<((i32, i32), u8)> {
    let (row, col) = cell_at(cursor_x, cursor_y, camera_x, cell_size)?;
    tilemap.ensure_capacity(row, col);
    let id = tilemap.toggle(row, col, cycle)?;
    Some(((row, col), id))
}

fn actions_to_events(
    vinput: Res<VirtualInput>,
    mut toggles: EventWriter<ToggleEditMode>,
    mut saves: EventWriter<SaveLevel>,
    mut reloads: EventWriter<ReloadLevel>,
) {
    if vinput.just_pressed(input::EDIT) {
        toggles.send(ToggleEditMode);
    }
    if vinput.just_pressed(input::SAVE) {
        saves.send(SaveLevel);
    }
    if vinput.just_pressed(input::LOAD) {
        reloads.send(ReloadLevel);
    }
}

/// Entering edit mode shows every waypoint as a spawn marker and pins the
/// editor camera where the game camera was. Leaving rebuilds the waypoint
/// list from the grid and replaces the live enemies with fresh ones.
#[allow(clippy::too_many_arguments)]
fn switch_edit_mode(
    mut commands: Commands,
    mut toggles: EventReader<ToggleEditMode>,
    config: Res<GameConfig>,
    outcome: Res<SessionOutcome>,
    mut edit: ResMut<EditMode>,
    mut tilemap: ResMut<Tilemap>,
    mut camera: ResMut<CameraState>,
    enemies: Query<Entity, With<Enemy>>,
) {
    let flips = toggles.read().count();
    if flips % 2 == 0 || outcome.is_over() {
        return;
    }
    edit.0 = !edit.0;
    if edit.0 {
        tilemap.stamp_spawn_markers();
        camera.editor_offset = camera.scroll_offset;
        info!("[Tilerun editor] Edit mode on");
    } else {
        tilemap.collect_spawn_markers();
        for entity in enemies.iter() {
            commands.entity(entity).despawn();
        }
        let count = spawn::spawn_enemies(&mut commands, &config, &tilemap);
        info!("[Tilerun editor] Edit mode off, {count} enemies placed");
    }
}

fn editor_pan(
    time: Res<Time>,
    config: Res<GameConfig>,
    vinput: Res<VirtualInput>,
    mut camera: ResMut<CameraState>,
) {
    let dir = crate::physics_core::horizontal_velocity(
        vinput.pressed(input::LEFT),
        vinput.pressed(input::RIGHT),
        1.0,
    );
    if dir == 0.0 {
        return;
    }
    let offset = camera.editor_offset + dir * config.editor.pan_speed * time.delta_secs();
    camera.editor_offset = offset.clamp(0.0, camera.max_scroll.max(0.0));
}

fn apply_editor_clicks(
    mut clicks: EventReader<EditorClick>,
    config: Res<GameConfig>,
    camera: Res<CameraState>,
    mut tilemap: ResMut<Tilemap>,
) {
    for click in clicks.read() {
        match apply_click(
            &mut tilemap,
            click.cursor_x,
            click.cursor_y,
            camera.editor_offset,
            config.tile_size,
            config.editor.cycle,
        ) {
            Some(((row, col), id)) => debug!("[Tilerun editor] Cell ({row}, {col}) -> {id}"),
            None => debug!(
                "[Tilerun editor] Ignored click at ({}, {})",
                click.cursor_x, click.cursor_y
            ),
        }
    }
}

fn save_level_on_request(
    mut requests: EventReader<SaveLevel>,
    config: Res<GameConfig>,
    mut tilemap: ResMut<Tilemap>,
) {
    if requests.read().count() == 0 {
        return;
    }
    match persistence::save_level(&mut tilemap, &config.level_path) {
        Ok(()) => info!("[Tilerun] Level saved to {}", config.level_path),
        Err(e) => warn!("[Tilerun] Level save failed: {e}"),
    }
}

/// Replace the level with the saved one. The current level stays in place
/// when the file is missing or invalid.
#[allow(clippy::too_many_arguments)]
fn reload_level_on_request(
    mut commands: Commands,
    mut requests: EventReader<ReloadLevel>,
    config: Res<GameConfig>,
    textures: Option<Res<Textures>>,
    mut tilemap: ResMut<Tilemap>,
    mut camera: ResMut<CameraState>,
    mut background: ResMut<BackgroundScroll>,
    mut players: Query<(&mut GamePosition, &mut Velocity, &mut Grounded), With<Player>>,
    actors: Query<Entity, Or<(With<Enemy>, With<Projectile>)>>,
) {
    if requests.read().count() == 0 {
        return;
    }
    let mut loaded = match persistence::load_level(&config.level_path) {
        Ok(map) => map,
        Err(e) => {
            warn!("[Tilerun] Level reload failed, keeping current level: {e}");
            return;
        }
    };
    loaded.stamp_spawn_markers();
    *tilemap = loaded;

    for entity in actors.iter() {
        commands.entity(entity).despawn();
    }
    spawn::spawn_enemies(&mut commands, &config, &tilemap);

    let (x, y) = spawn::player_spawn_point(&config, &tilemap);
    for (mut pos, mut vel, mut grounded) in players.iter_mut() {
        *pos = GamePosition { x, y };
        *vel = Velocity::default();
        grounded.0 = true;
    }
    camera.scroll_offset = 0.0;
    camera.editor_offset = 0.0;
    if let Some(textures) = textures {
        background.set_backdrop(textures.size_of(&tilemap.background));
    }
    background.invalidate();
    info!(
        "[Tilerun] Level reloaded from {} ({}x{})",
        config.level_path,
        tilemap.rows(),
        tilemap.cols()
    );
}
