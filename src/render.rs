use crate::camera::CameraState;
use crate::components::*;
use crate::game_runtime::EditMode;
use crate::parallax::BackgroundScroll;
use bevy::prelude::*;

pub struct RenderPlugin;

impl Plugin for RenderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<FrameView>()
            .add_systems(Update, publish_frame_view.in_set(crate::FrameSet::Publish));
    }
}

/// What an external renderer needs to draw the current frame. Tiles come from
/// the `Tilemap` resource and actors from their `GamePosition`s.
#[derive(Resource, Clone, Default, Debug, PartialEq)]
pub struct FrameView {
    pub scroll_offset: f32,
    pub background_offset: f32,
    /// Viewport x of every backdrop copy to draw.
    pub backdrop_copies: Vec<f32>,
    pub editing: bool,
    pub actors: Vec<ActorSprite>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ActorSprite {
    pub kind: ActorKind,
    /// Top-left corner in viewport pixels.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub facing_left: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActorKind {
    Player,
    Enemy,
    Boss,
    Projectile,
}

#[allow(clippy::type_complexity)]
fn publish_frame_view(
    camera: Res<CameraState>,
    edit: Res<EditMode>,
    background: Res<BackgroundScroll>,
    mut view: ResMut<FrameView>,
    actors: Query<(
        &GamePosition,
        &Collider,
        Option<&Facing>,
        Has<Player>,
        Has<Enemy>,
        Has<Boss>,
    )>,
) {
    let scroll = camera.active_offset(edit.0);
    view.scroll_offset = scroll;
    view.background_offset = background.offset();
    view.backdrop_copies = background.copy_positions();
    view.editing = edit.0;
    view.actors.clear();
    for (pos, collider, facing, is_player, is_enemy, is_boss) in actors.iter() {
        let kind = if is_player {
            ActorKind::Player
        } else if is_enemy {
            ActorKind::Enemy
        } else if is_boss {
            ActorKind::Boss
        } else {
            ActorKind::Projectile
        };
        let top = match collider.anchor {
            Anchor::BottomLeft => pos.y - collider.height,
            Anchor::TopLeft => pos.y,
        };
        view.actors.push(ActorSprite {
            kind,
            x: pos.x - scroll,
            y: top,
            width: collider.width,
            height: collider.height,
            facing_left: facing.is_some_and(|f| f.left),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_view_uses_active_camera() {
        let mut app = App::new();
        app.insert_resource(CameraState {
            scroll_offset: 100.0,
            editor_offset: 300.0,
            max_scroll: 4480.0,
        })
        .insert_resource(EditMode(true))
        .insert_resource(BackgroundScroll::default())
        .init_resource::<FrameView>()
        .add_systems(Update, publish_frame_view);
        app.world_mut().spawn((
            Player,
            GamePosition { x: 400.0, y: 256.0 },
            Collider {
                width: 32.0,
                height: 48.0,
                anchor: Anchor::BottomLeft,
            },
            Facing { left: true },
        ));

        app.update();

        let view = app.world().resource::<FrameView>();
        assert_eq!(view.scroll_offset, 300.0);
        assert!(view.editing);
        assert!(view.backdrop_copies.is_empty());
        assert_eq!(
            view.actors,
            vec![ActorSprite {
                kind: ActorKind::Player,
                x: 100.0,
                y: 208.0,
                width: 32.0,
                height: 48.0,
                facing_left: true,
            }]
        );
    }
}
