use bevy::app::AppExit;
use bevy::prelude::*;
use serde::Serialize;

use crate::components::GameConfig;
use crate::events::GameEventBus;
use crate::persistence::Progress;

/// True while the editor owns input. Gameplay simulation is suspended.
#[derive(Resource, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct EditMode(pub bool);

#[derive(Resource, Clone, Copy, Default, Debug, PartialEq, Eq, Serialize)]
pub enum SessionOutcome {
    #[default]
    Playing,
    Won,
    Lost,
}

impl SessionOutcome {
    pub fn is_over(self) -> bool {
        self != SessionOutcome::Playing
    }
}

#[derive(Resource, Default)]
pub struct RuntimeState {
    pub frames: u64,
    finished: bool,
}

pub fn gameplay_systems_enabled(
    edit: Option<Res<EditMode>>,
    outcome: Option<Res<SessionOutcome>>,
) -> bool {
    let editing = edit.map(|e| e.0).unwrap_or(false);
    let over = outcome.map(|o| o.is_over()).unwrap_or(false);
    !editing && !over
}

pub fn editor_systems_enabled(edit: Option<Res<EditMode>>) -> bool {
    edit.map(|e| e.0).unwrap_or(false)
}

pub struct RuntimeStatePlugin;

impl Plugin for RuntimeStatePlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(EditMode::default())
            .insert_resource(SessionOutcome::default())
            .insert_resource(RuntimeState::default())
            .add_systems(Last, (finish_session, enforce_frame_cap).chain());
    }
}

/// Runs once when the outcome leaves `Playing`: records a win in the
/// progress file and ends the app.
fn finish_session(
    config: Res<GameConfig>,
    outcome: Res<SessionOutcome>,
    mut runtime: ResMut<RuntimeState>,
    mut progress: ResMut<Progress>,
    mut bus: ResMut<GameEventBus>,
    mut exit: EventWriter<AppExit>,
) {
    if runtime.finished || !outcome.is_over() {
        return;
    }
    runtime.finished = true;
    info!("[Tilerun] Session over: {:?}", *outcome);
    bus.emit(
        "session_over",
        serde_json::json!({ "outcome": *outcome, "stage": config.stage }),
        None,
    );
    if *outcome == SessionOutcome::Won {
        progress.mark_completed(config.stage);
        match progress.save(&config.progress_path) {
            Ok(()) => info!(
                "[Tilerun] Progress saved; highest stage now {}",
                progress.max_unlocked_level()
            ),
            Err(e) => warn!("[Tilerun] Could not save progress: {e}"),
        }
    }
    exit.send(AppExit::Success);
}

fn enforce_frame_cap(
    config: Res<GameConfig>,
    mut runtime: ResMut<RuntimeState>,
    mut exit: EventWriter<AppExit>,
) {
    runtime.frames = runtime.frames.saturating_add(1);
    if let Some(cap) = config.max_frames {
        if runtime.frames == cap {
            info!("[Tilerun] Frame cap {cap} reached");
            exit.send(AppExit::Success);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app(progress_path: String) -> App {
        let mut app = App::new();
        let config = GameConfig {
            stage: 3,
            progress_path,
            max_frames: Some(2),
            ..GameConfig::default()
        };
        app.add_event::<AppExit>()
            .insert_resource(config)
            .insert_resource(GameEventBus::default())
            .insert_resource(Progress::default())
            .add_plugins(RuntimeStatePlugin);
        app
    }

    #[test]
    fn run_conditions_follow_mode_and_outcome() {
        let mut world = World::new();
        world.insert_resource(EditMode(false));
        world.insert_resource(SessionOutcome::Playing);
        let gameplay = world
            .run_system_cached(gameplay_systems_enabled)
            .expect("condition runs");
        assert!(gameplay);

        world.insert_resource(EditMode(true));
        assert!(!world
            .run_system_cached(gameplay_systems_enabled)
            .expect("condition runs"));
        assert!(world
            .run_system_cached(editor_systems_enabled)
            .expect("condition runs"));

        world.insert_resource(EditMode(false));
        world.insert_resource(SessionOutcome::Lost);
        assert!(!world
            .run_system_cached(gameplay_systems_enabled)
            .expect("condition runs"));
    }

    #[test]
    fn win_saves_progress_and_exits_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");
        let mut app = app(path.to_string_lossy().into_owned());
        app.insert_resource(SessionOutcome::Won);

        app.update();

        let progress = app.world().resource::<Progress>();
        assert_eq!(progress.max_unlocked_level(), 4);
        let saved = Progress::load(&path.to_string_lossy()).expect("saved progress");
        assert_eq!(saved.completed_levels, 1 << 3);
        assert_eq!(app.world().resource::<GameEventBus>().count("session_over"), 1);

        app.update();
        assert_eq!(app.world().resource::<GameEventBus>().count("session_over"), 1);
    }

    #[test]
    fn loss_leaves_progress_untouched() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("progress.json");
        let mut app = app(path.to_string_lossy().into_owned());
        app.insert_resource(SessionOutcome::Lost);

        app.update();

        assert_eq!(app.world().resource::<Progress>().completed_levels, 0);
        assert!(!path.exists());
    }

    #[test]
    fn frame_cap_counts_frames() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut app = app(dir.path().join("p.json").to_string_lossy().into_owned());
        app.update();
        app.update();
        assert_eq!(app.world().resource::<RuntimeState>().frames, 2);
        let exits = app.world().resource::<Events<AppExit>>();
        assert!(!exits.is_empty());
    }
}
