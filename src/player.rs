use crate::components::*;
use crate::events::GameEventBus;
use crate::input::{self, VirtualInput};
use crate::physics_core;
use crate::spawn;
use bevy::prelude::*;

/// Walk, jump and gravity for the player. Jumping needs the grounded flag the
/// resolver left from the previous step.
pub fn player_control(
    time: Res<Time>,
    config: Res<GameConfig>,
    vinput: Res<VirtualInput>,
    mut query: Query<(&mut Velocity, &Grounded, &mut Facing), With<Player>>,
) {
    let dt = time.delta_secs();
    for (mut vel, grounded, mut facing) in query.iter_mut() {
        let left = vinput.pressed(input::LEFT);
        let right = vinput.pressed(input::RIGHT);
        vel.x = physics_core::horizontal_velocity(left, right, config.move_speed);
        if vel.x < 0.0 {
            facing.left = true;
        } else if vel.x > 0.0 {
            facing.left = false;
        }
        physics_core::try_jump(
            grounded.0,
            vinput.pressed(input::JUMP),
            config.jump_velocity,
            &mut vel.y,
        );
        physics_core::apply_gravity(&mut vel.y, config.gravity, config.max_fall_speed, dt);
    }
}

pub fn player_throw(
    mut commands: Commands,
    config: Res<GameConfig>,
    vinput: Res<VirtualInput>,
    mut query: Query<(&GamePosition, &Collider, &Facing, &mut ThrowCooldown), With<Player>>,
) {
    if !vinput.pressed(input::THROW) {
        return;
    }
    for (pos, collider, facing, mut cooldown) in query.iter_mut() {
        if cooldown.0 > 0.0 {
            continue;
        }
        spawn::spawn_player_projectile(&mut commands, &config, pos, collider, facing.left);
        cooldown.0 = config.throw_cooldown_seconds;
    }
}

/// Footstep cue while the grounded player walks, at most once per cooldown.
pub fn step_sounds(
    config: Res<GameConfig>,
    mut bus: ResMut<GameEventBus>,
    mut query: Query<(Entity, &Velocity, &Grounded, &mut StepCooldown), With<Player>>,
) {
    for (entity, vel, grounded, mut cooldown) in query.iter_mut() {
        if grounded.0 && vel.x.abs() > 0.1 && cooldown.0 <= 0.0 {
            bus.emit("step", serde_json::Value::Null, Some(entity));
            cooldown.0 = config.step_cooldown_seconds;
        }
    }
}
