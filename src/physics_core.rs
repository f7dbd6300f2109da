use crate::components::{Anchor, PickupEffect, TileType};
use crate::tilemap::Tilemap;

/// Pulls the far edge back so a box exactly aligned to a cell boundary does
/// not register the next cell.
pub const EDGE_EPSILON: f32 = 0.001;

/// Projectiles further than this outside the level are discarded.
pub const OFFSCREEN_MARGIN: f32 = 100.0;

/// World-space box, y grows downward (`min_y` is the top edge).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Aabb {
    pub fn from_anchor(x: f32, y: f32, width: f32, height: f32, anchor: Anchor) -> Self {
        let top = match anchor {
            Anchor::BottomLeft => y - height,
            Anchor::TopLeft => y,
        };
        Self {
            min_x: x,
            min_y: top,
            max_x: x + width,
            max_y: top + height,
        }
    }

    pub fn center_x(&self) -> f32 {
        (self.min_x + self.max_x) * 0.5
    }

    pub fn center_y(&self) -> f32 {
        (self.min_y + self.max_y) * 0.5
    }

    /// Strict overlap; touching edges do not count.
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.max_x > other.min_x
            && self.min_x < other.max_x
            && self.max_y > other.min_y
            && self.min_y < other.max_y
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CellSize {
    pub width: f32,
    pub height: f32,
}

impl CellSize {
    pub fn square(size: f32) -> Self {
        Self {
            width: size,
            height: size,
        }
    }

    fn is_valid(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }
}

/// Everything the resolver reads and corrects about one actor.
#[derive(Clone, Copy, Debug)]
pub struct ActorBody {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    pub anchor: Anchor,
    pub vx: f32,
    pub vy: f32,
    pub grounded: bool,
    pub health: i32,
    pub invulnerability: f32,
}

impl ActorBody {
    pub fn new(x: f32, y: f32, width: f32, height: f32, anchor: Anchor) -> Self {
        Self {
            x,
            y,
            width,
            height,
            anchor,
            vx: 0.0,
            vy: 0.0,
            grounded: false,
            health: 1,
            invulnerability: 0.0,
        }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_anchor(self.x, self.y, self.width, self.height, self.anchor)
    }

    fn set_top(&mut self, top: f32) {
        self.y = match self.anchor {
            Anchor::BottomLeft => top + self.height,
            Anchor::TopLeft => top,
        };
    }
}

/// Which tile behaviours apply to an actor class.
#[derive(Clone, Copy, Debug)]
pub struct ContactRules {
    pub collect_pickups: bool,
    pub take_damage: bool,
    pub invulnerability_seconds: f32,
}

impl ContactRules {
    /// Blocking only: no pickups, no tile damage.
    pub const SOLID_ONLY: ContactRules = ContactRules {
        collect_pickups: false,
        take_damage: false,
        invulnerability_seconds: 0.0,
    };

    pub fn player(invulnerability_seconds: f32) -> Self {
        Self {
            collect_pickups: true,
            take_damage: true,
            invulnerability_seconds,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ContactEffect {
    PickupConsumed {
        row: i32,
        col: i32,
        tile: TileType,
        effect: PickupEffect,
    },
    DamageApplied {
        row: i32,
        col: i32,
    },
}

/// Reconcile one actor against the grid.
///
/// Cells overlapped by the actor's box are visited once, row-major, with the
/// overlap range fixed at entry. Each blocking cell is resolved on its own
/// along the axis of least penetration, so a correction made for one cell is
/// what the next cell sees. Grounded is cleared on entry and set only by a
/// landing.
pub fn resolve_tile_collisions(
    grid: &mut Tilemap,
    body: &mut ActorBody,
    cell: CellSize,
    rules: ContactRules,
) -> Vec<ContactEffect> {
    let mut effects = Vec::new();
    if !cell.is_valid() || grid.is_empty() {
        return effects;
    }
    body.grounded = false;

    let aabb = body.aabb();
    let last_row = grid.rows() as i32 - 1;
    let last_col = grid.cols() as i32 - 1;
    let min_col = ((aabb.min_x / cell.width).floor() as i32).max(0);
    let max_col = (((aabb.max_x - EDGE_EPSILON) / cell.width).floor() as i32).min(last_col);
    let min_row = ((aabb.min_y / cell.height).floor() as i32).max(0);
    let max_row = (((aabb.max_y - EDGE_EPSILON) / cell.height).floor() as i32).min(last_row);

    for row in min_row..=max_row {
        for col in min_col..=max_col {
            let tile = grid.get(row, col);
            if tile == TileType::Empty || tile == TileType::EnemySpawn {
                continue;
            }

            let box_now = body.aabb();
            let tile_box = Aabb {
                min_x: col as f32 * cell.width,
                min_y: row as f32 * cell.height,
                max_x: (col + 1) as f32 * cell.width,
                max_y: (row + 1) as f32 * cell.height,
            };
            let ix = box_now.max_x.min(tile_box.max_x) - box_now.min_x.max(tile_box.min_x);
            let iy = box_now.max_y.min(tile_box.max_y) - box_now.min_y.max(tile_box.min_y);
            if ix <= 0.0 || iy <= 0.0 {
                continue;
            }

            if let Some(effect) = tile.pickup_effect() {
                if rules.collect_pickups {
                    grid.write_cell(row, col, TileType::Empty as u8);
                    effects.push(ContactEffect::PickupConsumed {
                        row,
                        col,
                        tile,
                        effect,
                    });
                }
                continue;
            }

            if tile == TileType::Damaging && rules.take_damage && body.invulnerability <= 0.0 {
                body.health = (body.health - 1).max(0);
                body.invulnerability = rules.invulnerability_seconds;
                effects.push(ContactEffect::DamageApplied { row, col });
            }

            if !tile.is_blocking() {
                continue;
            }

            if ix < iy {
                if box_now.center_x() < tile_box.center_x() {
                    body.x -= ix;
                } else {
                    body.x += ix;
                }
            } else if box_now.center_y() < tile_box.center_y() {
                body.set_top(tile_box.min_y - body.height);
                body.vy = 0.0;
                body.grounded = true;
            } else {
                body.set_top(tile_box.max_y);
                if body.vy < 0.0 {
                    body.vy = 0.0;
                }
            }
        }
    }
    effects
}

/// Gravity is applied every step, grounded or not, so a resting actor keeps
/// pressing into the floor and the resolver keeps it grounded.
pub fn apply_gravity(vy: &mut f32, gravity: f32, max_fall_speed: f32, dt: f32) {
    *vy += gravity * dt;
    if max_fall_speed > 0.0 {
        *vy = vy.min(max_fall_speed);
    }
}

pub fn horizontal_velocity(left: bool, right: bool, speed: f32) -> f32 {
    let mut dir = 0.0;
    if left {
        dir -= 1.0;
    }
    if right {
        dir += 1.0;
    }
    dir * speed
}

pub fn try_jump(grounded: bool, jump_pressed: bool, jump_velocity: f32, vy: &mut f32) -> bool {
    if grounded && jump_pressed {
        *vy = -jump_velocity;
        return true;
    }
    false
}

pub fn integrate(x: &mut f32, y: &mut f32, vx: f32, vy: f32, dt: f32) {
    *x += vx * dt;
    *y += vy * dt;
}

pub fn tick_timer(timer: &mut f32, dt: f32) {
    if *timer > 0.0 {
        *timer = (*timer - dt).max(0.0);
    }
}

/// Rate-limited hit: returns true when a point of health was removed.
pub fn apply_contact_damage(health: &mut i32, invulnerability: &mut f32, window: f32) -> bool {
    if *invulnerability > 0.0 {
        return false;
    }
    *health = (*health - 1).max(0);
    *invulnerability = window;
    true
}

/// Point test used by gravity projectiles: does `(x, y)` sit in a solid cell?
pub fn point_in_solid(grid: &Tilemap, x: f32, y: f32, cell: CellSize) -> bool {
    if !cell.is_valid() || x < 0.0 || y < 0.0 {
        return false;
    }
    let col = (x / cell.width) as i32;
    let row = (y / cell.height) as i32;
    grid.get(row, col).is_solid()
}

pub fn outside_level(aabb: &Aabb, level_width: f32, level_height: f32) -> bool {
    aabb.min_x < -OFFSCREEN_MARGIN
        || aabb.min_x > level_width + OFFSCREEN_MARGIN
        || aabb.min_y < -OFFSCREEN_MARGIN
        || aabb.min_y > level_height + OFFSCREEN_MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;

    const CELL: CellSize = CellSize {
        width: 32.0,
        height: 32.0,
    };

    fn floor_map() -> Tilemap {
        let mut map = Tilemap::new(10, 16);
        for c in 0..16 {
            map.write_cell(8, c, TileType::Solid as u8);
        }
        map
    }

    fn player_body(x: f32, y: f32) -> ActorBody {
        let mut body = ActorBody::new(x, y, 32.0, 48.0, Anchor::BottomLeft);
        body.health = 3;
        body
    }

    #[test]
    fn landing_snaps_feet_to_tile_top() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(2, 1, TileType::Solid as u8);
        let mut body = ActorBody::new(36.0, 68.0, 24.0, 32.0, Anchor::BottomLeft);
        body.vy = 300.0;
        let effects = resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert!(effects.is_empty());
        assert!(body.grounded);
        assert_eq!(body.vy, 0.0);
        assert_eq!(body.y, 64.0);
    }

    #[test]
    fn top_left_anchor_lands_with_bottom_on_tile() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(2, 0, TileType::Solid as u8);
        let mut body = ActorBody::new(8.0, 50.0, 16.0, 16.0, Anchor::TopLeft);
        body.vy = 100.0;
        resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert!(body.grounded);
        assert_eq!(body.y + body.height, 64.0);
    }

    #[test]
    fn ceiling_hit_stops_upward_motion_without_grounding() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(1, 1, TileType::Solid as u8);
        let mut body = ActorBody::new(36.0, 100.0, 24.0, 40.0, Anchor::BottomLeft);
        body.vy = -200.0;
        resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert!(!body.grounded);
        assert_eq!(body.vy, 0.0);
        assert_eq!(body.aabb().min_y, 64.0);
    }

    #[test]
    fn shallow_side_overlap_pushes_horizontally() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(1, 2, TileType::Solid as u8);
        map.write_cell(2, 2, TileType::Solid as u8);
        let mut body = ActorBody::new(40.0, 90.0, 28.0, 40.0, Anchor::BottomLeft);
        body.vy = 50.0;
        resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert_eq!(body.x, 36.0);
        assert_eq!(body.vy, 50.0);
        assert!(!body.grounded);
    }

    #[test]
    fn pickup_is_consumed_once() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(1, 1, TileType::Mug as u8);
        let mut body = ActorBody::new(36.0, 60.0, 20.0, 20.0, Anchor::BottomLeft);
        let rules = ContactRules::player(0.5);
        let first = resolve_tile_collisions(&mut map, &mut body, CELL, rules);
        assert_eq!(
            first,
            vec![ContactEffect::PickupConsumed {
                row: 1,
                col: 1,
                tile: TileType::Mug,
                effect: PickupEffect::Score(2),
            }]
        );
        assert_eq!(map.read_cell(1, 1), 0);
        assert_eq!((body.x, body.y), (36.0, 60.0));
        let second = resolve_tile_collisions(&mut map, &mut body, CELL, rules);
        assert!(second.is_empty());
    }

    #[test]
    fn enemies_leave_pickups_in_place() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(1, 1, TileType::Beer as u8);
        let mut body = ActorBody::new(36.0, 60.0, 20.0, 20.0, Anchor::BottomLeft);
        let effects = resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert!(effects.is_empty());
        assert_eq!(map.read_cell(1, 1), TileType::Beer as u8);
    }

    #[test]
    fn damage_is_rate_limited_by_invulnerability() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(2, 1, TileType::Damaging as u8);
        let rules = ContactRules::player(0.5);
        let mut body = player_body(36.0, 68.0);
        body.height = 32.0;

        let hits = resolve_tile_collisions(&mut map, &mut body, CELL, rules);
        assert_eq!(hits, vec![ContactEffect::DamageApplied { row: 2, col: 1 }]);
        assert_eq!(body.health, 2);
        assert!(body.grounded, "damaging tiles still block");

        body.y = 68.0;
        tick_timer(&mut body.invulnerability, 0.2);
        let again = resolve_tile_collisions(&mut map, &mut body, CELL, rules);
        assert!(again.is_empty());
        assert_eq!(body.health, 2);

        body.y = 68.0;
        tick_timer(&mut body.invulnerability, 0.4);
        let later = resolve_tile_collisions(&mut map, &mut body, CELL, rules);
        assert_eq!(later.len(), 1);
        assert_eq!(body.health, 1);
    }

    #[test]
    fn spawn_markers_have_no_physics() {
        let mut map = Tilemap::new(4, 4);
        map.write_cell(2, 1, TileType::EnemySpawn as u8);
        let mut body = ActorBody::new(36.0, 68.0, 24.0, 32.0, Anchor::BottomLeft);
        resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert!(!body.grounded);
        assert_eq!(body.y, 68.0);
    }

    #[test]
    fn degenerate_geometry_is_a_no_op() {
        let mut map = floor_map();
        let mut body = player_body(10.0, 260.0);
        body.grounded = true;
        let effects = resolve_tile_collisions(
            &mut map,
            &mut body,
            CellSize::square(0.0),
            ContactRules::SOLID_ONLY,
        );
        assert!(effects.is_empty());
        assert_eq!(body.y, 260.0);
        assert!(body.grounded);

        let mut empty = Tilemap::new(0, 0);
        resolve_tile_collisions(
            &mut empty,
            &mut body,
            CELL,
            ContactRules::SOLID_ONLY,
        );
        assert_eq!(body.y, 260.0);
    }

    #[test]
    fn actor_outside_grid_is_untouched() {
        let mut map = floor_map();
        let mut body = player_body(-500.0, -200.0);
        let effects = resolve_tile_collisions(
            &mut map,
            &mut body,
            CELL,
            ContactRules::player(0.5),
        );
        assert!(effects.is_empty());
        assert_eq!((body.x, body.y), (-500.0, -200.0));
    }

    #[test]
    fn falling_actor_settles_on_ground_row() {
        let mut map = floor_map();
        let mut body = player_body(10.0, 48.0);
        let dt = 1.0 / 60.0;
        for _ in 0..120 {
            apply_gravity(&mut body.vy, 1200.0, 800.0, dt);
            integrate(&mut body.x, &mut body.y, body.vx, body.vy, dt);
            resolve_tile_collisions(
                &mut map,
                &mut body,
                CELL,
                ContactRules::player(0.5),
                );
        }
        assert!(body.grounded);
        assert_eq!(body.vy, 0.0);
        assert!((body.y - 8.0 * 32.0).abs() < 0.01);
        assert_eq!(body.x, 10.0);
    }

    #[test]
    fn jump_requires_ground() {
        let mut vy = 0.0;
        assert!(!try_jump(false, true, 450.0, &mut vy));
        assert_eq!(vy, 0.0);
        assert!(try_jump(true, true, 450.0, &mut vy));
        assert_eq!(vy, -450.0);
    }

    #[test]
    fn contact_damage_respects_window() {
        let mut health = 3;
        let mut invuln = 0.0;
        assert!(apply_contact_damage(&mut health, &mut invuln, 0.5));
        assert!(!apply_contact_damage(&mut health, &mut invuln, 0.5));
        assert_eq!(health, 2);
        tick_timer(&mut invuln, 0.6);
        assert!(apply_contact_damage(&mut health, &mut invuln, 0.5));
        assert_eq!(health, 1);
    }

    #[test]
    fn projectile_point_test_only_hits_solid() {
        let map = floor_map();
        assert!(point_in_solid(&map, 40.0, 260.0, CELL));
        assert!(!point_in_solid(&map, 40.0, 200.0, CELL));
        assert!(!point_in_solid(&map, -4.0, 260.0, CELL));
    }

    #[test]
    fn offscreen_margin() {
        let inside = Aabb::from_anchor(-50.0, 10.0, 16.0, 16.0, Anchor::TopLeft);
        let outside = Aabb::from_anchor(-150.0, 10.0, 16.0, 16.0, Anchor::TopLeft);
        assert!(!outside_level(&inside, 512.0, 320.0));
        assert!(outside_level(&outside, 512.0, 320.0));
    }
}
