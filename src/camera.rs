use bevy::prelude::*;

use crate::components::{Collider, GameConfig, GamePosition, Player};
use crate::game_runtime::EditMode;
use crate::tilemap::Tilemap;

/// Horizontal camera. `scroll_offset` is the world x of the viewport's left
/// edge; it is recomputed from the player every step and never eased.
#[derive(Resource, Clone, Default, Debug)]
pub struct CameraState {
    pub scroll_offset: f32,
    pub editor_offset: f32,
    pub max_scroll: f32,
}

impl CameraState {
    /// The offset that applies in the current mode.
    pub fn active_offset(&self, editing: bool) -> f32 {
        if editing {
            self.editor_offset
        } else {
            self.scroll_offset
        }
    }
}

pub fn max_scroll(level_width: f32, viewport_width: f32) -> f32 {
    (level_width - viewport_width).max(0.0)
}

/// Center the viewport on `actor_center_x`, clamped to the level. `None` for
/// an empty viewport or non-finite input.
pub fn follow_scroll(actor_center_x: f32, viewport_width: f32, level_width: f32) -> Option<f32> {
    if viewport_width <= 0.0 || !actor_center_x.is_finite() || !level_width.is_finite() {
        return None;
    }
    let target = actor_center_x - viewport_width * 0.5;
    Some(target.clamp(0.0, max_scroll(level_width, viewport_width)))
}

pub struct CameraPlugin;

impl Plugin for CameraPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(CameraState::default())
            .add_systems(Update, camera_follow.in_set(crate::FrameSet::Camera));
    }
}

fn camera_follow(
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    edit: Res<EditMode>,
    mut camera: ResMut<CameraState>,
    player_query: Query<(&GamePosition, &Collider), With<Player>>,
) {
    let level_width = tilemap.width_px(config.tile_size);
    camera.max_scroll = max_scroll(level_width, config.viewport_width);
    if edit.0 {
        camera.editor_offset = camera.editor_offset.clamp(0.0, camera.max_scroll);
        return;
    }
    let Ok((pos, collider)) = player_query.get_single() else {
        return;
    };
    let center = pos.x + collider.width * 0.5;
    if let Some(offset) = follow_scroll(center, config.viewport_width, level_width) {
        camera.scroll_offset = offset;
    }
}
