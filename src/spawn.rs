use crate::components::*;
use crate::tilemap::Tilemap;
use bevy::prelude::*;

pub const ENEMY_WIDTH: f32 = 32.0;
pub const ENEMY_HEIGHT: f32 = 48.0;
pub const BOSS_WIDTH: f32 = 64.0;
pub const BOSS_HEIGHT: f32 = 96.0;
/// Boss spawns this many tiles in from the left edge.
const BOSS_SPAWN_COLUMN: f32 = 8.0;
pub const BOSS_INVULNERABILITY_SECONDS: f32 = 0.5;
pub const BOSS_THROW_SECONDS: f32 = 2.0;
pub const PROJECTILE_SIZE: f32 = 16.0;
/// Straight-flying projectiles fade out after this long.
pub const PROJECTILE_LIFETIME: f32 = 3.0;
const PLAYER_SPAWN_X: f32 = 10.0;

pub struct SpawnPlugin;

impl Plugin for SpawnPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(PostStartup, spawn_level_actors);
    }
}

fn spawn_level_actors(
    mut commands: Commands,
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
) {
    spawn_player(&mut commands, &config, &tilemap);
    let enemies = spawn_enemies(&mut commands, &config, &tilemap);
    if config.boss_stage {
        spawn_boss(&mut commands, &config, &tilemap);
    }
    info!(
        "[Tilerun] Stage {} ready: {}x{} tiles, {} enemies{}",
        config.stage,
        tilemap.rows(),
        tilemap.cols(),
        enemies,
        if config.boss_stage { ", boss" } else { "" }
    );
}

/// Feet on the bottom of the level; the resolver settles the player onto
/// whatever floor it overlaps.
pub fn player_spawn_point(config: &GameConfig, tilemap: &Tilemap) -> (f32, f32) {
    let level_height = tilemap.height_px(config.tile_size);
    (PLAYER_SPAWN_X, (level_height - config.player_height).max(0.0))
}

pub fn spawn_player(commands: &mut Commands, config: &GameConfig, tilemap: &Tilemap) -> Entity {
    let (x, y) = player_spawn_point(config, tilemap);
    commands
        .spawn((
            Player,
            GamePosition { x, y },
            Velocity::default(),
            Grounded(true),
            Collider {
                width: config.player_width,
                height: config.player_height,
                anchor: Anchor::BottomLeft,
            },
            Health(config.player_health),
            Invulnerability {
                remaining: 0.0,
                duration: config.invulnerability_seconds,
            },
            Score::default(),
            Facing::default(),
            ThrowCooldown::default(),
            StepCooldown::default(),
        ))
        .id()
}

/// Enemy standing on the cell below its waypoint.
pub fn spawn_enemy(commands: &mut Commands, config: &GameConfig, row: i32, col: i32) -> Entity {
    let tile = config.tile_size;
    commands
        .spawn((
            Enemy,
            GamePosition {
                x: col as f32 * tile,
                y: (row + 1) as f32 * tile,
            },
            Velocity {
                x: config.enemy_speed,
                y: 0.0,
            },
            Grounded(true),
            Collider {
                width: ENEMY_WIDTH,
                height: ENEMY_HEIGHT,
                anchor: Anchor::BottomLeft,
            },
        ))
        .id()
}

/// One enemy per in-range waypoint. Returns how many were spawned.
pub fn spawn_enemies(commands: &mut Commands, config: &GameConfig, tilemap: &Tilemap) -> usize {
    let mut count = 0;
    for &(row, col) in &tilemap.spawn_waypoints {
        if row < 0 || col < 0 || row as usize >= tilemap.rows() || col as usize >= tilemap.cols() {
            continue;
        }
        spawn_enemy(commands, config, row, col);
        count += 1;
    }
    count
}

pub fn spawn_boss(commands: &mut Commands, config: &GameConfig, tilemap: &Tilemap) -> Entity {
    let feet = tilemap.rows().saturating_sub(2) as f32 * config.tile_size;
    commands
        .spawn((
            Boss,
            GamePosition {
                x: BOSS_SPAWN_COLUMN * config.tile_size,
                y: feet,
            },
            Velocity::default(),
            Grounded(true),
            Collider {
                width: BOSS_WIDTH,
                height: BOSS_HEIGHT,
                anchor: Anchor::BottomLeft,
            },
            Health(config.boss_health),
            Invulnerability {
                remaining: 0.0,
                duration: BOSS_INVULNERABILITY_SECONDS,
            },
            Facing { left: true },
            ThrowCooldown(BOSS_THROW_SECONDS),
        ))
        .id()
}

/// Arcing projectile thrown by the player from its chest height.
pub fn spawn_player_projectile(
    commands: &mut Commands,
    config: &GameConfig,
    pos: &GamePosition,
    collider: &Collider,
    facing_left: bool,
) -> Entity {
    let x = pos.x + collider.width / 2.0 - PROJECTILE_SIZE / 2.0;
    let y = pos.y - collider.height / 2.0 - PROJECTILE_SIZE / 2.0;
    let vx = if facing_left {
        -config.projectile_speed
    } else {
        config.projectile_speed
    };
    spawn_projectile(
        commands,
        Projectile {
            from_player: true,
            has_physics: true,
            lifetime: PROJECTILE_LIFETIME,
        },
        GamePosition { x, y },
        Velocity {
            x: vx,
            y: -config.projectile_lift,
        },
    )
}

pub fn spawn_projectile(
    commands: &mut Commands,
    projectile: Projectile,
    pos: GamePosition,
    vel: Velocity,
) -> Entity {
    commands
        .spawn((
            projectile,
            pos,
            vel,
            Collider {
                width: PROJECTILE_SIZE,
                height: PROJECTILE_SIZE,
                anchor: Anchor::TopLeft,
            },
        ))
        .id()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn player_starts_on_level_bottom() {
        let config = GameConfig::default();
        let map = Tilemap::stage_layout(10, 156);
        assert_eq!(player_spawn_point(&config, &map), (10.0, 272.0));
        let tiny = Tilemap::new(1, 4);
        assert_eq!(player_spawn_point(&config, &tiny).1, 0.0);
    }

    #[test]
    fn enemies_skip_out_of_range_waypoints() {
        let mut app = App::new();
        let mut map = Tilemap::stage_layout(10, 20);
        map.spawn_waypoints = vec![(7, 3), (7, 40), (-1, 2)];
        app.insert_resource(GameConfig::default())
            .insert_resource(map)
            .add_systems(Update, spawn_level_actors);

        app.update();

        let world = app.world_mut();
        let enemies: Vec<(f32, f32, f32)> = world
            .query_filtered::<(&GamePosition, &Velocity), With<Enemy>>()
            .iter(world)
            .map(|(p, v)| (p.x, p.y, v.x))
            .collect();
        assert_eq!(enemies, vec![(96.0, 256.0, 50.0)]);
        assert_eq!(world.query::<&Player>().iter(world).count(), 1);
        assert_eq!(world.query::<&Boss>().iter(world).count(), 0);
    }

    #[test]
    fn boss_stage_spawns_boss_on_ground() {
        let mut app = App::new();
        let config = GameConfig {
            boss_stage: true,
            ..GameConfig::default()
        };
        app.insert_resource(config)
            .insert_resource(Tilemap::stage_layout(10, 16))
            .add_systems(Update, spawn_level_actors);

        app.update();

        let world = app.world_mut();
        let (pos, health) = world
            .query_filtered::<(&GamePosition, &Health), With<Boss>>()
            .single(world);
        assert_eq!((pos.x, pos.y), (256.0, 256.0));
        assert_eq!(health.0, 10);
    }
}
