use bevy::prelude::*;

use crate::assets::{TextureSize, Textures};
use crate::camera::CameraState;
use crate::components::{BackgroundConfig, GameConfig};
use crate::game_runtime::EditMode;
use crate::tilemap::Tilemap;

/// Backdrops narrower than this once scaled are treated as missing.
const MIN_SCALED_WIDTH: f32 = 1.0;

pub struct ParallaxPlugin;

impl Plugin for ParallaxPlugin {
    fn build(&self, app: &mut App) {
        let scroll = app
            .world()
            .get_resource::<GameConfig>()
            .map(BackgroundScroll::from_config)
            .unwrap_or_default();
        app.insert_resource(scroll)
            .add_systems(
                PostStartup,
                resolve_backdrop.run_if(resource_exists::<Textures>),
            )
            .add_systems(Update, sync_background.in_set(crate::FrameSet::Background));
    }
}

/// Offset of the tiled backdrop image, driven by the camera through a
/// parallax factor or by a constant auto-scroll speed.
#[derive(Resource, Clone, Debug)]
pub struct BackgroundScroll {
    repeat: bool,
    parallax: f32,
    max_speed: f32,
    scroll_speed: f32,
    backdrop: Option<TextureSize>,
    viewport_width: f32,
    viewport_height: f32,
    offset: f32,
    previous_camera: f32,
    /// False until the first camera-driven update after a mode, texture or
    /// viewport change; that update snaps instead of accumulating.
    valid: bool,
}

impl Default for BackgroundScroll {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

impl BackgroundScroll {
    pub fn from_config(config: &GameConfig) -> Self {
        let BackgroundConfig {
            repeat,
            parallax,
            max_speed,
            scroll_speed,
        } = config.background;
        Self {
            repeat,
            parallax: parallax.clamp(0.0, 1.0),
            max_speed: max_speed.max(0.0),
            scroll_speed,
            backdrop: None,
            viewport_width: config.viewport_width,
            viewport_height: config.viewport_height,
            offset: 0.0,
            previous_camera: 0.0,
            valid: false,
        }
    }

    pub fn offset(&self) -> f32 {
        self.offset
    }

    pub fn set_backdrop(&mut self, backdrop: Option<TextureSize>) {
        if self.backdrop != backdrop {
            self.backdrop = backdrop;
            self.valid = false;
        }
    }

    /// Make the next camera-driven update snap. Needed whenever the camera
    /// jumps instead of moving, such as after a level reload.
    pub fn invalidate(&mut self) {
        self.valid = false;
    }

    /// Backdrop width once scaled so its height fills the viewport.
    pub fn scaled_width(&self) -> Option<f32> {
        let backdrop = self.backdrop?;
        if backdrop.height == 0 || self.viewport_height <= 0.0 {
            return None;
        }
        let scaled = backdrop.width as f32 * (self.viewport_height / backdrop.height as f32);
        (scaled >= MIN_SCALED_WIDTH && scaled.is_finite()).then_some(scaled)
    }

    pub fn max_offset(&self) -> f32 {
        self.scaled_width()
            .map_or(0.0, |w| (w - self.viewport_width).max(0.0))
    }

    /// Advance the offset for one step. Without a usable backdrop the offset
    /// keeps its last value.
    pub fn update(&mut self, camera_x: f32, max_camera: f32, dt: f32) {
        let Some(scaled) = self.scaled_width() else {
            return;
        };
        if !camera_x.is_finite() || !max_camera.is_finite() || !dt.is_finite() {
            return;
        }

        if self.scroll_speed != 0.0 {
            self.offset = self.settle(self.offset + self.scroll_speed * dt, scaled);
            self.valid = false;
            return;
        }

        if !self.valid {
            self.offset = if self.repeat {
                wrap(camera_x * self.parallax, scaled)
            } else {
                let ratio = if max_camera > 0.0 {
                    (camera_x / max_camera).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                ratio * self.max_offset()
            };
            self.previous_camera = camera_x;
            self.valid = true;
            return;
        }

        let delta = camera_x - self.previous_camera;
        self.previous_camera = camera_x;
        let background_delta = if self.repeat {
            delta * self.parallax
        } else if max_camera > 0.0 {
            delta * (self.max_offset() / max_camera)
        } else {
            0.0
        };
        let limited = self.limit_speed(background_delta, dt);
        self.offset = self.settle(self.offset + limited, scaled);
    }

    /// X positions (viewport space) where the renderer should draw backdrop
    /// copies this frame.
    pub fn copy_positions(&self) -> Vec<f32> {
        let Some(scaled) = self.scaled_width() else {
            return Vec::new();
        };
        let start = -self.offset;
        if !self.repeat {
            return vec![start];
        }
        let count = ((self.viewport_width - start) / scaled).ceil().max(0.0) as usize;
        (0..count).map(|i| start + i as f32 * scaled).collect()
    }

    fn limit_speed(&self, delta: f32, dt: f32) -> f32 {
        if self.max_speed <= 0.0 {
            return delta;
        }
        let limit = self.max_speed * dt.max(0.0);
        delta.clamp(-limit, limit)
    }

    fn settle(&self, offset: f32, scaled: f32) -> f32 {
        if self.repeat {
            wrap(offset, scaled)
        } else {
            offset.clamp(0.0, self.max_offset())
        }
    }
}

/// Wrap into `[0, width)`.
fn wrap(value: f32, width: f32) -> f32 {
    let wrapped = value.rem_euclid(width);
    if wrapped >= width || !wrapped.is_finite() {
        0.0
    } else {
        wrapped
    }
}

fn resolve_backdrop(
    textures: Res<Textures>,
    tilemap: Res<Tilemap>,
    mut scroll: ResMut<BackgroundScroll>,
) {
    let size = textures.size_of(&tilemap.background);
    if size.is_none() {
        warn!(
            "[Tilerun parallax] Backdrop '{}' unavailable; background stays put",
            tilemap.background
        );
    }
    scroll.set_backdrop(size);
}

pub(crate) fn sync_background(
    time: Res<Time>,
    camera: Res<CameraState>,
    edit: Res<EditMode>,
    mut scroll: ResMut<BackgroundScroll>,
) {
    let camera_x = camera.active_offset(edit.0);
    scroll.update(camera_x, camera.max_scroll, time.delta_secs());
}
