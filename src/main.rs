mod assets;
mod audio;
mod camera;
mod components;
mod editor;
mod events;
mod game_runtime;
mod input;
mod parallax;
mod persistence;
mod physics;
mod physics_core;
mod player;
mod render;
mod spawn;
mod tilemap;

use std::time::Duration;

use bevy::app::ScheduleRunnerPlugin;
use bevy::log::LogPlugin;
use bevy::prelude::*;
use components::GameConfig;

/// Per-frame ordering of the non-physics work in `Update`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameSet {
    Editor,
    Camera,
    Background,
    Publish,
}

fn env_override(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn load_game_config() -> GameConfig {
    let path = env_override("TILERUN_GAME_CONFIG").unwrap_or_else(|| "game.json".to_string());
    let mut config = match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str::<GameConfig>(&contents) {
            Ok(cfg) => {
                println!("[Tilerun] Loaded game config from {}", path);
                cfg
            }
            Err(e) => {
                eprintln!("[Tilerun] Failed to parse {}: {}", path, e);
                GameConfig::default()
            }
        },
        Err(_) => GameConfig::default(),
    };
    // Env vars override game.json values
    if let Some(dir) = env_override("TILERUN_ASSETS_DIR") {
        println!("[Tilerun] Using assets dir: {}", dir);
        config.assets_dir = dir;
    }
    if let Some(level) = env_override("TILERUN_LEVEL_PATH") {
        println!("[Tilerun] Using level file: {}", level);
        config.level_path = level;
    }
    config
}

fn main() {
    let config = load_game_config();
    let mut app = App::new();

    app.add_plugins(
        MinimalPlugins.set(ScheduleRunnerPlugin::run_loop(Duration::from_secs_f64(
            1.0 / 60.0,
        ))),
    )
    .add_plugins(LogPlugin::default())
    .add_plugins(bevy::input::InputPlugin);
    println!(
        "[Tilerun] Starting stage {}{}",
        config.stage,
        if config.boss_stage { " (boss)" } else { "" }
    );

    app.insert_resource(config)
        .insert_resource(Time::<Fixed>::from_hz(60.0))
        .configure_sets(
            Update,
            (
                FrameSet::Editor,
                FrameSet::Camera,
                FrameSet::Background,
                FrameSet::Publish,
            )
                .chain(),
        )
        .add_plugins(events::GameEventsPlugin)
        .add_plugins(game_runtime::RuntimeStatePlugin)
        .add_plugins(persistence::PersistencePlugin)
        .add_plugins(assets::AssetsPlugin)
        .add_plugins(input::InputPlugin)
        .add_plugins(tilemap::TilemapPlugin)
        .add_plugins(spawn::SpawnPlugin)
        .add_plugins(physics::PhysicsPlugin)
        .add_plugins(editor::EditorPlugin)
        .add_plugins(camera::CameraPlugin)
        .add_plugins(parallax::ParallaxPlugin)
        .add_plugins(audio::AudioPlugin)
        .add_plugins(render::RenderPlugin);

    app.run();
}
