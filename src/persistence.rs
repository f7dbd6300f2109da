use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::tilemap::Tilemap;

const HIGHEST_REGULAR_STAGE: u32 = 9;
const BOSS_STAGE: u32 = 10;

/// On-disk level document.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LevelDocument {
    pub rows: usize,
    pub cols: usize,
    #[serde(default)]
    pub background_path: String,
    #[serde(default)]
    pub used_assets: Vec<String>,
    pub grid: Vec<Vec<u8>>,
    #[serde(default)]
    pub enemy_positions: Vec<[i32; 2]>,
}

impl LevelDocument {
    pub fn from_tilemap(tilemap: &Tilemap) -> Self {
        Self {
            rows: tilemap.rows(),
            cols: tilemap.cols(),
            background_path: tilemap.background.clone(),
            used_assets: tilemap.used_assets.clone(),
            grid: (0..tilemap.rows()).map(|r| tilemap.row(r).to_vec()).collect(),
            enemy_positions: tilemap
                .spawn_waypoints
                .iter()
                .map(|&(r, c)| [r, c])
                .collect(),
        }
    }

    pub fn into_tilemap(self) -> Result<Tilemap, String> {
        if self.grid.len() != self.rows {
            return Err(format!(
                "grid has {} rows, header says {}",
                self.grid.len(),
                self.rows
            ));
        }
        if let Some((r, row)) = self
            .grid
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != self.cols)
        {
            return Err(format!(
                "grid row {r} has {} cells, header says {}",
                row.len(),
                self.cols
            ));
        }
        let mut tilemap = if self.rows == 0 {
            Tilemap::new(0, self.cols)
        } else {
            Tilemap::from_rows(&self.grid)?
        };
        tilemap.background = self.background_path;
        tilemap.used_assets = self.used_assets;
        tilemap.spawn_waypoints = self
            .enemy_positions
            .into_iter()
            .map(|[r, c]| (r, c))
            .collect();
        Ok(tilemap)
    }
}

/// Write the level to `path`. Spawn markers currently in the grid become the
/// saved waypoint list.
pub fn save_level(tilemap: &mut Tilemap, path: &str) -> Result<(), String> {
    tilemap.collect_spawn_markers();
    let doc = LevelDocument::from_tilemap(tilemap);
    let json = serde_json::to_string_pretty(&doc).map_err(|e| format!("serialize level: {e}"))?;
    std::fs::write(path, json).map_err(|e| format!("write {path}: {e}"))
}

/// Read and validate a level. Nothing is modified on failure; the caller
/// keeps whatever level it already had.
pub fn load_level(path: &str) -> Result<Tilemap, String> {
    let contents = std::fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
    let doc: LevelDocument =
        serde_json::from_str(&contents).map_err(|e| format!("parse {path}: {e}"))?;
    doc.into_tilemap().map_err(|e| format!("{path}: {e}"))
}

/// Campaign progress: bit `n` of `completed_levels` is set once stage `n`
/// has been won.
#[derive(Resource, Serialize, Deserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    #[serde(default)]
    pub completed_levels: u32,
    #[serde(default)]
    pub has_key: bool,
}

impl Progress {
    pub fn mark_completed(&mut self, stage: u32) {
        if stage < 32 {
            self.completed_levels |= 1u32 << stage;
        }
    }

    /// Highest stage the player may select.
    pub fn max_unlocked_level(&self) -> u32 {
        if self.has_key {
            return BOSS_STAGE;
        }
        (1..32)
            .filter(|&i| self.completed_levels & (1u32 << i) != 0)
            .map(|i| (i + 1).min(HIGHEST_REGULAR_STAGE))
            .last()
            .unwrap_or(1)
    }

    pub fn load(path: &str) -> Result<Self, String> {
        let contents = std::fs::read_to_string(path).map_err(|e| format!("read {path}: {e}"))?;
        serde_json::from_str(&contents).map_err(|e| format!("parse {path}: {e}"))
    }

    pub fn save(&self, path: &str) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| format!("serialize progress: {e}"))?;
        std::fs::write(path, json).map_err(|e| format!("write {path}: {e}"))
    }
}

pub struct PersistencePlugin;

impl Plugin for PersistencePlugin {
    fn build(&self, app: &mut App) {
        let progress = app
            .world()
            .get_resource::<crate::components::GameConfig>()
            .map(|c| match Progress::load(&c.progress_path) {
                Ok(p) => p,
                Err(e) => {
                    debug!("[Tilerun] No progress record ({e})");
                    Progress::default()
                }
            })
            .unwrap_or_default();
        app.insert_resource(progress);
    }
}
