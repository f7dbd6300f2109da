use bevy::prelude::*;

use crate::components::*;
use crate::events::GameEventBus;
use crate::game_runtime::{gameplay_systems_enabled, SessionOutcome};
use crate::persistence::Progress;
use crate::physics_core::{self, ActorBody, Aabb, CellSize, ContactEffect, ContactRules};
use crate::player;
use crate::spawn;
use crate::tilemap::Tilemap;

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(
            FixedUpdate,
            (
                tick_timers,
                player::player_control,
                player::player_throw,
                enemy_patrol,
                boss_behaviour,
                integrate_actors,
                move_projectiles,
                resolve_actor_tiles,
                projectile_hits,
                actor_contacts,
                clamp_player_and_settle_outcome,
                player::step_sounds,
            )
                .chain()
                .run_if(gameplay_systems_enabled),
        );
    }
}

/// Boss projectiles fly straight at this speed.
const BOSS_PROJECTILE_SPEED: f32 = 200.0;

fn tick_timers(
    time: Res<Time>,
    mut invulnerable: Query<&mut Invulnerability>,
    mut throws: Query<&mut ThrowCooldown>,
    mut steps: Query<&mut StepCooldown>,
) {
    let dt = time.delta_secs();
    for mut inv in invulnerable.iter_mut() {
        physics_core::tick_timer(&mut inv.remaining, dt);
    }
    for mut cd in throws.iter_mut() {
        physics_core::tick_timer(&mut cd.0, dt);
    }
    for mut cd in steps.iter_mut() {
        physics_core::tick_timer(&mut cd.0, dt);
    }
}

/// Enemies walk at constant speed and fall under gravity. They turn around
/// after tile resolution, see `turn_at_obstacles`.
fn enemy_patrol(
    time: Res<Time>,
    config: Res<GameConfig>,
    mut query: Query<&mut Velocity, With<Enemy>>,
) {
    let dt = time.delta_secs();
    for mut vel in query.iter_mut() {
        if vel.x == 0.0 {
            vel.x = config.enemy_speed;
        }
        physics_core::apply_gravity(&mut vel.y, config.gravity, config.max_fall_speed, dt);
    }
}

/// The boss stands its ground, turns toward the player and lobs a
/// straight-flying projectile every few seconds.
fn boss_behaviour(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<GameConfig>,
    mut bosses: Query<(&GamePosition, &Collider, &mut Velocity, &mut Facing, &mut ThrowCooldown), With<Boss>>,
    players: Query<(&GamePosition, &Collider), With<Player>>,
) {
    let dt = time.delta_secs();
    let target = players
        .get_single()
        .ok()
        .map(|(pos, col)| pos.x + col.width * 0.5);
    for (pos, collider, mut vel, mut facing, mut cooldown) in bosses.iter_mut() {
        vel.x = 0.0;
        physics_core::apply_gravity(&mut vel.y, config.gravity, config.max_fall_speed, dt);
        let Some(target_x) = target else {
            continue;
        };
        facing.left = target_x < pos.x + collider.width * 0.5;
        if cooldown.0 > 0.0 {
            continue;
        }
        cooldown.0 = spawn::BOSS_THROW_SECONDS;
        let x = if facing.left {
            pos.x - spawn::PROJECTILE_SIZE
        } else {
            pos.x + collider.width
        };
        let speed = if facing.left {
            -BOSS_PROJECTILE_SPEED
        } else {
            BOSS_PROJECTILE_SPEED
        };
        spawn::spawn_projectile(
            &mut commands,
            Projectile {
                from_player: false,
                has_physics: false,
                lifetime: spawn::PROJECTILE_LIFETIME,
            },
            GamePosition {
                x,
                y: pos.y - collider.height * 0.5,
            },
            Velocity { x: speed, y: 0.0 },
        );
    }
}

fn integrate_actors(
    time: Res<Time>,
    mut query: Query<(&mut GamePosition, &Velocity), Without<Projectile>>,
) {
    let dt = time.delta_secs();
    for (mut pos, vel) in query.iter_mut() {
        let pos = &mut *pos;
        physics_core::integrate(&mut pos.x, &mut pos.y, vel.x, vel.y, dt);
    }
}

/// Advance projectiles and drop the ones that expired, left the level or
/// (for gravity projectiles) hit a solid cell.
fn move_projectiles(
    mut commands: Commands,
    time: Res<Time>,
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    mut query: Query<(Entity, &mut Projectile, &mut GamePosition, &mut Velocity, &Collider)>,
) {
    let dt = time.delta_secs();
    let cell = CellSize::square(config.tile_size);
    let level_w = tilemap.width_px(config.tile_size);
    let level_h = tilemap.height_px(config.tile_size);
    for (entity, mut projectile, mut pos, mut vel, collider) in query.iter_mut() {
        let mut alive = true;
        if projectile.has_physics {
            vel.y += config.gravity * dt;
        } else {
            projectile.lifetime -= dt;
            alive = projectile.lifetime > 0.0;
        }
        let p = &mut *pos;
        physics_core::integrate(&mut p.x, &mut p.y, vel.x, vel.y, dt);
        let aabb = Aabb::from_anchor(pos.x, pos.y, collider.width, collider.height, collider.anchor);
        if physics_core::outside_level(&aabb, level_w, level_h) {
            alive = false;
        }
        if alive && projectile.has_physics && physics_core::point_in_solid(&tilemap, pos.x, pos.y, cell) {
            alive = false;
        }
        if !alive {
            commands.entity(entity).despawn();
        }
    }
}

#[allow(clippy::type_complexity)]
fn resolve_actor_tiles(
    config: Res<GameConfig>,
    mut tilemap: ResMut<Tilemap>,
    mut bus: ResMut<GameEventBus>,
    mut progress: ResMut<Progress>,
    mut query: Query<
        (
            Entity,
            &mut GamePosition,
            &mut Velocity,
            &mut Grounded,
            &Collider,
            Option<&mut Health>,
            Option<&mut Invulnerability>,
            Option<&mut Score>,
            Has<Player>,
            Has<Enemy>,
        ),
        Without<Projectile>,
    >,
) {
    let cell = CellSize::square(config.tile_size);
    let level_w = tilemap.width_px(config.tile_size);
    for (entity, mut pos, mut vel, mut grounded, collider, health, invuln, score, is_player, is_enemy) in
        query.iter_mut()
    {
        let mut body = ActorBody::new(pos.x, pos.y, collider.width, collider.height, collider.anchor);
        body.vx = vel.x;
        body.vy = vel.y;
        body.grounded = grounded.0;
        body.health = health.as_ref().map_or(1, |h| h.0);
        body.invulnerability = invuln.as_ref().map_or(0.0, |i| i.remaining);
        let rules = if is_player {
            ContactRules::player(config.invulnerability_seconds)
        } else {
            ContactRules::SOLID_ONLY
        };

        let effects = physics_core::resolve_tile_collisions(
            &mut tilemap,
            &mut body,
            cell,
            rules,
        );

        if is_enemy {
            turn_at_obstacles(&tilemap, &mut body, cell, level_w);
        }

        pos.x = body.x;
        pos.y = body.y;
        vel.x = body.vx;
        vel.y = body.vy;
        grounded.0 = body.grounded;
        if let Some(mut h) = health {
            h.0 = body.health;
        }
        if let Some(mut i) = invuln {
            i.remaining = body.invulnerability;
        }

        let mut score = score;
        for effect in effects {
            match effect {
                ContactEffect::PickupConsumed {
                    row,
                    col,
                    effect: PickupEffect::Score(points),
                    ..
                } => {
                    if let Some(s) = score.as_mut() {
                        s.0 = s.0.saturating_add(points);
                    }
                    bus.emit(
                        "pickup_collected",
                        serde_json::json!({ "row": row, "col": col, "score": points }),
                        Some(entity),
                    );
                }
                ContactEffect::PickupConsumed {
                    row,
                    col,
                    effect: PickupEffect::Key,
                    ..
                } => {
                    progress.has_key = true;
                    if let Err(e) = progress.save(&config.progress_path) {
                        warn!("[Tilerun] Could not save progress: {e}");
                    }
                    bus.emit(
                        "key_collected",
                        serde_json::json!({ "row": row, "col": col }),
                        Some(entity),
                    );
                }
                ContactEffect::DamageApplied { row, col } => {
                    bus.emit(
                        "damage_taken",
                        serde_json::json!({ "row": row, "col": col, "health": body.health }),
                        Some(entity),
                    );
                }
            }
        }
    }
}

/// Reverse a patrolling body when the cell just past its leading edge, at
/// mid-height, blocks, or when it reaches either end of the level.
fn turn_at_obstacles(tilemap: &Tilemap, body: &mut ActorBody, cell: CellSize, level_w: f32) {
    if body.vx == 0.0 || cell.width <= 0.0 || cell.height <= 0.0 {
        return;
    }
    let aabb = body.aabb();
    let probe_x = if body.vx < 0.0 {
        aabb.min_x - 1.0
    } else {
        aabb.max_x + 1.0
    };
    let row = (aabb.center_y() / cell.height).floor() as i32;
    let col = (probe_x / cell.width).floor() as i32;
    if probe_x < 0.0 || probe_x > level_w || tilemap.is_blocking(row, col) {
        body.vx = -body.vx;
    }
    if body.x < 0.0 {
        body.x = 0.0;
    } else if body.x + body.width > level_w {
        body.x = (level_w - body.width).max(0.0);
    }
}

fn actor_box(pos: &GamePosition, collider: &Collider) -> Aabb {
    Aabb::from_anchor(pos.x, pos.y, collider.width, collider.height, collider.anchor)
}

/// Player projectiles kill the first enemy they touch, otherwise hurt the
/// boss. Hostile projectiles hurt the player.
#[allow(clippy::type_complexity)]
fn projectile_hits(
    mut commands: Commands,
    mut bus: ResMut<GameEventBus>,
    projectiles: Query<(Entity, &Projectile, &GamePosition, &Collider)>,
    enemies: Query<(Entity, &GamePosition, &Collider), With<Enemy>>,
    mut bosses: Query<(&GamePosition, &Collider, &mut Health), (With<Boss>, Without<Player>)>,
    mut players: Query<
        (Entity, &GamePosition, &Collider, &mut Health, &mut Invulnerability),
        (With<Player>, Without<Boss>),
    >,
) {
    let mut killed: Vec<Entity> = Vec::new();
    for (proj_entity, projectile, pos, collider) in projectiles.iter() {
        let proj_box = actor_box(pos, collider);
        if projectile.from_player {
            let hit = enemies.iter().find(|(e, epos, ecol)| {
                !killed.contains(e) && proj_box.overlaps(&actor_box(epos, ecol))
            });
            if let Some((enemy, _, _)) = hit {
                killed.push(enemy);
                commands.entity(enemy).despawn();
                commands.entity(proj_entity).despawn();
                bus.emit("enemy_killed", serde_json::Value::Null, Some(enemy));
                continue;
            }
            for (bpos, bcol, mut health) in bosses.iter_mut() {
                if proj_box.overlaps(&actor_box(bpos, bcol)) {
                    health.0 = (health.0 - 1).max(0);
                    commands.entity(proj_entity).despawn();
                    bus.emit(
                        "boss_hit",
                        serde_json::json!({ "health": health.0 }),
                        None,
                    );
                    break;
                }
            }
        } else {
            for (player, ppos, pcol, mut health, mut inv) in players.iter_mut() {
                if !proj_box.overlaps(&actor_box(ppos, pcol)) {
                    continue;
                }
                let window = inv.duration;
                if physics_core::apply_contact_damage(&mut health.0, &mut inv.remaining, window) {
                    bus.emit(
                        "damage_taken",
                        serde_json::json!({ "health": health.0 }),
                        Some(player),
                    );
                }
                commands.entity(proj_entity).despawn();
            }
        }
    }
}

/// Touching an enemy hurts the player; touching the boss hurts the boss.
/// Both are limited by the victim's invulnerability window.
#[allow(clippy::type_complexity)]
fn actor_contacts(
    mut bus: ResMut<GameEventBus>,
    mut players: Query<
        (Entity, &GamePosition, &Collider, &mut Health, &mut Invulnerability),
        (With<Player>, Without<Boss>),
    >,
    enemies: Query<(&GamePosition, &Collider), With<Enemy>>,
    mut bosses: Query<
        (&GamePosition, &Collider, &mut Health, &mut Invulnerability),
        (With<Boss>, Without<Player>),
    >,
) {
    for (player, ppos, pcol, mut health, mut inv) in players.iter_mut() {
        let player_box = actor_box(ppos, pcol);
        let touching_enemy = enemies
            .iter()
            .any(|(epos, ecol)| player_box.overlaps(&actor_box(epos, ecol)));
        if touching_enemy {
            let window = inv.duration;
            if physics_core::apply_contact_damage(&mut health.0, &mut inv.remaining, window) {
                bus.emit(
                    "damage_taken",
                    serde_json::json!({ "health": health.0 }),
                    Some(player),
                );
            }
        }
        for (bpos, bcol, mut boss_health, mut boss_inv) in bosses.iter_mut() {
            if !player_box.overlaps(&actor_box(bpos, bcol)) {
                continue;
            }
            let window = boss_inv.duration;
            if physics_core::apply_contact_damage(&mut boss_health.0, &mut boss_inv.remaining, window) {
                bus.emit(
                    "boss_hit",
                    serde_json::json!({ "health": boss_health.0 }),
                    None,
                );
            }
        }
    }
}

/// Keep the player inside the level horizontally, then decide whether the
/// session is over.
fn clamp_player_and_settle_outcome(
    config: Res<GameConfig>,
    tilemap: Res<Tilemap>,
    mut outcome: ResMut<SessionOutcome>,
    mut bus: ResMut<GameEventBus>,
    mut players: Query<(Entity, &mut GamePosition, &Collider, &mut Health), With<Player>>,
    bosses: Query<&Health, (With<Boss>, Without<Player>)>,
) {
    let level_w = tilemap.width_px(config.tile_size);
    let level_h = tilemap.height_px(config.tile_size);
    let Ok((player, mut pos, collider, mut health)) = players.get_single_mut() else {
        return;
    };

    if level_w > 0.0 {
        pos.x = pos.x.clamp(0.0, (level_w - collider.width).max(0.0));
    }
    if level_h > 0.0 {
        let max_y = (level_h - collider.height).max(0.0);
        if pos.y > max_y {
            health.0 = 0;
        } else if pos.y < 0.0 {
            pos.y = 0.0;
        }
    }

    let boss_defeated = config.boss_stage && bosses.iter().any(|h| h.0 <= 0);
    let reached_exit = !config.boss_stage && level_w > 0.0 && pos.x >= level_w - collider.width;

    if health.0 <= 0 {
        *outcome = SessionOutcome::Lost;
        bus.emit("player_died", serde_json::Value::Null, Some(player));
    } else if reached_exit || boss_defeated {
        *outcome = SessionOutcome::Won;
        bus.emit("level_won", serde_json::json!({ "stage": config.stage }), Some(player));
    }
}
