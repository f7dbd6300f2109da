use bevy::prelude::*;

/// Marks the player entity
#[derive(Component)]
pub struct Player;

/// Patrolling enemy materialized from a spawn waypoint
#[derive(Component)]
pub struct Enemy;

/// Boss stage antagonist
#[derive(Component)]
pub struct Boss;

#[derive(Component, Clone, Copy)]
pub struct Projectile {
    pub from_player: bool,
    /// Gravity-affected projectiles die on solid cells; the others expire.
    pub has_physics: bool,
    pub lifetime: f32,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum TileType {
    Empty = 0,
    Solid = 1,
    Damaging = 2,
    Beer = 3,
    DarkBeer = 4,
    EnemySpawn = 5,
    Mug = 6,
    HalfLiter = 7,
    Bottle = 8,
    HalfLiterBottle = 9,
    Key = 10,
}

/// What consuming a pickup tile does.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PickupEffect {
    Score(u32),
    Key,
}

impl TileType {
    /// Highest id the editor cycles through before wrapping to empty.
    pub const MAX_ID: u8 = TileType::Key as u8;

    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => TileType::Solid,
            2 => TileType::Damaging,
            3 => TileType::Beer,
            4 => TileType::DarkBeer,
            5 => TileType::EnemySpawn,
            6 => TileType::Mug,
            7 => TileType::HalfLiter,
            8 => TileType::Bottle,
            9 => TileType::HalfLiterBottle,
            10 => TileType::Key,
            _ => TileType::Empty,
        }
    }

    pub fn is_solid(self) -> bool {
        self == TileType::Solid
    }

    /// Damaging tiles block like solid ones and hurt on contact.
    pub fn is_blocking(self) -> bool {
        matches!(self, TileType::Solid | TileType::Damaging)
    }

    pub fn pickup_effect(self) -> Option<PickupEffect> {
        match self {
            TileType::Beer | TileType::DarkBeer => Some(PickupEffect::Score(1)),
            TileType::Mug | TileType::Bottle => Some(PickupEffect::Score(2)),
            TileType::HalfLiter => Some(PickupEffect::Score(3)),
            TileType::HalfLiterBottle => Some(PickupEffect::Score(5)),
            TileType::Key => Some(PickupEffect::Key),
            _ => None,
        }
    }
}

/// Which corner of the box an actor's stored position refers to.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Anchor {
    /// x = left edge, y = feet. Player, enemies and the boss.
    #[default]
    BottomLeft,
    /// x = left edge, y = top edge. Projectiles.
    TopLeft,
}

/// Sub-tile precision position (world pixels, y grows downward)
#[derive(Component, Clone, Copy, Default)]
pub struct GamePosition {
    pub x: f32,
    pub y: f32,
}

/// Velocity in world pixels per second
#[derive(Component, Clone, Copy, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

/// Set and cleared only by tile collision resolution
#[derive(Component, Clone, Copy, Default)]
pub struct Grounded(pub bool);

#[derive(Component, Clone, Copy)]
pub struct Collider {
    pub width: f32,
    pub height: f32,
    pub anchor: Anchor,
}

#[derive(Component, Clone, Copy)]
pub struct Health(pub i32);

/// Seconds remaining during which damaging contact is ignored.
#[derive(Component, Clone, Copy, Default)]
pub struct Invulnerability {
    pub remaining: f32,
    pub duration: f32,
}

#[derive(Component, Default)]
pub struct Score(pub u32);

#[derive(Component, Default)]
pub struct Facing {
    pub left: bool,
}

#[derive(Component, Default)]
pub struct ThrowCooldown(pub f32);

#[derive(Component, Default)]
pub struct StepCooldown(pub f32);

/// Tuning and session parameters. Every field has a default so partial
/// `game.json` files are accepted.
#[derive(Resource, Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub tile_size: f32,
    pub viewport_width: f32,
    pub viewport_height: f32,
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_velocity: f32,
    pub max_fall_speed: f32,
    pub player_width: f32,
    pub player_height: f32,
    pub player_health: i32,
    pub invulnerability_seconds: f32,
    pub throw_cooldown_seconds: f32,
    pub projectile_speed: f32,
    pub projectile_lift: f32,
    pub step_cooldown_seconds: f32,
    pub enemy_speed: f32,
    pub boss_health: i32,
    pub level_columns: usize,
    pub stage: u32,
    pub boss_stage: bool,
    pub background: BackgroundConfig,
    pub editor: EditorConfig,
    pub assets_dir: String,
    pub level_path: String,
    pub progress_path: String,
    pub max_frames: Option<u64>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            tile_size: 32.0,
            viewport_width: 512.0,
            viewport_height: 288.0,
            gravity: 1200.0,
            move_speed: 220.0,
            jump_velocity: 450.0,
            max_fall_speed: 800.0,
            player_width: 32.0,
            player_height: 48.0,
            player_health: 3,
            invulnerability_seconds: 0.5,
            throw_cooldown_seconds: 0.5,
            projectile_speed: 250.0,
            projectile_lift: 400.0,
            step_cooldown_seconds: 0.75,
            enemy_speed: 50.0,
            boss_health: 10,
            level_columns: 156,
            stage: 1,
            boss_stage: false,
            background: BackgroundConfig::default(),
            editor: EditorConfig::default(),
            assets_dir: "assets".to_string(),
            level_path: "level_1.json".to_string(),
            progress_path: "progress.json".to_string(),
            max_frames: None,
        }
    }
}

impl GameConfig {
    pub fn level_rows(&self) -> usize {
        if self.tile_size <= 0.0 {
            return 0;
        }
        (self.viewport_height / self.tile_size) as usize + 1
    }
}

#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    pub repeat: bool,
    /// 0.0 = static backdrop, 1.0 = moves with the camera.
    pub parallax: f32,
    /// Pixels per second; 0 disables the limit.
    pub max_speed: f32,
    /// Constant auto-scroll in pixels per second; 0 means camera-driven.
    pub scroll_speed: f32,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            repeat: false,
            parallax: 0.25,
            max_speed: 50.0,
            scroll_speed: 0.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TileCycle {
    /// 0 <-> 1
    Binary,
    /// 0 -> 1 -> ... -> TileType::MAX_ID -> 0
    #[default]
    Full,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub cycle: TileCycle,
    pub pan_speed: f32,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            cycle: TileCycle::Full,
            pan_speed: 2000.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_ids_map_to_empty() {
        assert_eq!(TileType::from_u8(0), TileType::Empty);
        assert_eq!(TileType::from_u8(42), TileType::Empty);
        assert_eq!(TileType::from_u8(5), TileType::EnemySpawn);
    }

    #[test]
    fn damaging_tiles_block() {
        assert!(TileType::Damaging.is_blocking());
        assert!(!TileType::Damaging.is_solid());
        assert!(!TileType::EnemySpawn.is_blocking());
        assert!(TileType::EnemySpawn.pickup_effect().is_none());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let cfg: GameConfig =
            serde_json::from_str(r#"{"tile_size": 16.0, "background": {"repeat": true}}"#)
                .expect("config should parse");
        assert_eq!(cfg.tile_size, 16.0);
        assert!(cfg.background.repeat);
        assert_eq!(cfg.background.parallax, 0.25);
        assert_eq!(cfg.viewport_width, 512.0);
        assert_eq!(cfg.editor.cycle, TileCycle::Full);
    }

    #[test]
    fn default_rows_follow_viewport() {
        let cfg = GameConfig::default();
        assert_eq!(cfg.level_rows(), 10);
    }
}
