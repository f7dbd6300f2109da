use crate::components::*;
use bevy::prelude::*;

pub struct TilemapPlugin;

impl Plugin for TilemapPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<Tilemap>()
            .add_systems(Startup, setup_level);
    }
}

const DEFAULT_ROWS: usize = 10;
const DEFAULT_COLS: usize = 16;
/// Largest row or column count the grid grows to. Cells past it are ignored.
pub const MAX_DIMENSION: usize = 4096;

/// The level's tile matrix. Cells are stored row-major in one buffer so every
/// row always has exactly `cols` entries; growth reallocates, never shrinks.
#[derive(Resource, Clone, Debug, PartialEq)]
pub struct Tilemap {
    rows: usize,
    cols: usize,
    tiles: Vec<u8>,
    /// Opaque backdrop id resolved by the texture provider.
    pub background: String,
    pub used_assets: Vec<String>,
    /// (row, col) enemy spawn points waiting to become live actors.
    pub spawn_waypoints: Vec<(i32, i32)>,
}

impl Default for Tilemap {
    fn default() -> Self {
        Self::new(DEFAULT_ROWS, DEFAULT_COLS)
    }
}

impl Tilemap {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            tiles: vec![0u8; rows * cols],
            background: String::new(),
            used_assets: Vec::new(),
            spawn_waypoints: Vec::new(),
        }
    }

    /// Build from nested rows. Every row must have the same length.
    pub fn from_rows(grid: &[Vec<u8>]) -> Result<Self, String> {
        let rows = grid.len();
        let cols = grid.first().map_or(0, Vec::len);
        let mut tiles = Vec::with_capacity(rows * cols);
        for (r, row) in grid.iter().enumerate() {
            if row.len() != cols {
                return Err(format!(
                    "grid row {r} has {} cells, expected {cols}",
                    row.len()
                ));
            }
            tiles.extend_from_slice(row);
        }
        Ok(Self {
            rows,
            cols,
            tiles,
            ..Self::new(0, 0)
        })
    }

    /// Standard stage layout: one solid ground row two rows above the bottom.
    pub fn stage_layout(rows: usize, cols: usize) -> Self {
        let mut map = Self::new(rows, cols);
        if rows >= 2 {
            let ground = rows - 2;
            map.tiles[ground * cols..(ground + 1) * cols].fill(TileType::Solid as u8);
        }
        map
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0 || self.cols == 0
    }

    pub fn row(&self, row: usize) -> &[u8] {
        if row >= self.rows {
            return &[];
        }
        &self.tiles[row * self.cols..(row + 1) * self.cols]
    }

    pub fn width_px(&self, tile_w: f32) -> f32 {
        self.cols as f32 * tile_w
    }

    pub fn height_px(&self, tile_h: f32) -> f32 {
        self.rows as f32 * tile_h
    }

    fn index(&self, row: i32, col: i32) -> Option<usize> {
        if row < 0 || col < 0 || row as usize >= self.rows || col as usize >= self.cols {
            return None;
        }
        Some(row as usize * self.cols + col as usize)
    }

    /// Grow so `(row, col)` is addressable. Negative indices and indices at
    /// or past `MAX_DIMENSION` are ignored.
    pub fn ensure_capacity(&mut self, row: i32, col: i32) {
        if !within_limit(row, col) {
            return;
        }
        let rows = self.rows.max(row as usize + 1);
        let cols = self.cols.max(col as usize + 1);
        if rows == self.rows && cols == self.cols {
            return;
        }
        if cols == self.cols {
            self.tiles.resize(rows * cols, 0);
        } else {
            let mut tiles = vec![0u8; rows * cols];
            for r in 0..self.rows {
                let src = &self.tiles[r * self.cols..(r + 1) * self.cols];
                tiles[r * cols..r * cols + self.cols].copy_from_slice(src);
            }
            self.tiles = tiles;
        }
        self.rows = rows;
        self.cols = cols;
    }

    /// Out-of-range reads are empty.
    pub fn read_cell(&self, row: i32, col: i32) -> u8 {
        self.index(row, col)
            .map_or(TileType::Empty as u8, |i| self.tiles[i])
    }

    pub fn get(&self, row: i32, col: i32) -> TileType {
        TileType::from_u8(self.read_cell(row, col))
    }

    pub fn write_cell(&mut self, row: i32, col: i32, tile_id: u8) {
        self.ensure_capacity(row, col);
        if let Some(i) = self.index(row, col) {
            self.tiles[i] = tile_id;
        }
    }

    /// Advance the cell to its next id. Returns the new id, or `None` for
    /// coordinates the grid can never hold.
    pub fn toggle(&mut self, row: i32, col: i32, cycle: TileCycle) -> Option<u8> {
        if !within_limit(row, col) {
            return None;
        }
        let next = next_tile_id(self.read_cell(row, col), cycle);
        self.write_cell(row, col, next);
        Some(next)
    }

    pub fn is_blocking(&self, row: i32, col: i32) -> bool {
        self.get(row, col).is_blocking()
    }

    /// Write every in-range waypoint into the grid as a spawn marker.
    pub fn stamp_spawn_markers(&mut self) {
        for &(row, col) in &self.spawn_waypoints {
            if let Some(i) = self.index(row, col) {
                self.tiles[i] = TileType::EnemySpawn as u8;
            }
        }
    }

    /// Rebuild the waypoint list from the markers currently in the grid.
    pub fn collect_spawn_markers(&mut self) {
        let marker = TileType::EnemySpawn as u8;
        self.spawn_waypoints = self
            .tiles
            .iter()
            .enumerate()
            .filter(|(_, &id)| id == marker)
            .map(|(i, _)| ((i / self.cols) as i32, (i % self.cols) as i32))
            .collect();
    }
}

/// True when `(row, col)` is non-negative and below `MAX_DIMENSION`.
fn within_limit(row: i32, col: i32) -> bool {
    row >= 0 && col >= 0 && (row as usize) < MAX_DIMENSION && (col as usize) < MAX_DIMENSION
}

pub fn next_tile_id(current: u8, cycle: TileCycle) -> u8 {
    match cycle {
        TileCycle::Binary => {
            if current == 0 {
                1
            } else {
                0
            }
        }
        TileCycle::Full => {
            if current >= TileType::MAX_ID {
                0
            } else {
                current + 1
            }
        }
    }
}

fn setup_level(config: Res<GameConfig>, mut tilemap: ResMut<Tilemap>) {
    match crate::persistence::load_level(&config.level_path) {
        Ok(loaded) => {
            info!(
                "[Tilerun] Loaded level {} ({}x{})",
                config.level_path,
                loaded.rows(),
                loaded.cols()
            );
            *tilemap = loaded;
            tilemap.stamp_spawn_markers();
        }
        Err(e) => {
            debug!("[Tilerun] No saved level ({e}); using stage layout");
            let cols = if config.boss_stage { 16 } else { config.level_columns };
            let mut map = Tilemap::stage_layout(config.level_rows(), cols);
            map.background = if config.boss_stage {
                "boss_tlo.png".to_string()
            } else {
                format!("poziom_{}_tlo.jpg", config.stage)
            };
            *tilemap = map;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn out_of_range_reads_are_empty() {
        let map = Tilemap::new(4, 4);
        assert_eq!(map.read_cell(-1, 0), 0);
        assert_eq!(map.read_cell(0, -7), 0);
        assert_eq!(map.read_cell(4, 0), 0);
        assert_eq!(map.read_cell(0, 400), 0);
        assert_eq!(map.read_cell(i32::MIN, i32::MAX), 0);
    }

    #[test]
    fn write_grows_and_preserves_cells() {
        let mut map = Tilemap::new(2, 2);
        map.write_cell(1, 1, 7);
        map.write_cell(3, 5, 2);
        assert_eq!(map.rows(), 4);
        assert_eq!(map.cols(), 6);
        assert_eq!(map.read_cell(1, 1), 7);
        assert_eq!(map.read_cell(3, 5), 2);
        for r in 0..map.rows() {
            assert_eq!(map.row(r).len(), map.cols());
        }
    }

    #[test]
    fn ensure_capacity_never_shrinks_and_ignores_negative() {
        let mut map = Tilemap::new(5, 5);
        map.ensure_capacity(1, 1);
        map.ensure_capacity(-1, 10);
        assert_eq!((map.rows(), map.cols()), (5, 5));
        map.ensure_capacity(2, 9);
        assert_eq!((map.rows(), map.cols()), (5, 10));
    }

    #[test]
    fn writes_past_the_size_cap_are_ignored() {
        let mut map = Tilemap::new(10, 16);
        map.write_cell(i32::MAX, i32::MAX, 1);
        map.write_cell(MAX_DIMENSION as i32, 0, 1);
        assert_eq!(map.toggle(3, MAX_DIMENSION as i32, TileCycle::Full), None);
        assert_eq!((map.rows(), map.cols()), (10, 16));
        assert_eq!(map.read_cell(i32::MAX, i32::MAX), 0);

        let last = MAX_DIMENSION as i32 - 1;
        map.write_cell(0, last, 4);
        assert_eq!(map.cols(), MAX_DIMENSION);
        assert_eq!(map.read_cell(0, last), 4);
    }

    #[test]
    fn full_cycle_wraps_after_highest_id() {
        let mut map = Tilemap::new(2, 2);
        map.write_cell(0, 0, 2);
        assert_eq!(map.toggle(0, 0, TileCycle::Full), Some(3));
        map.write_cell(0, 1, TileType::MAX_ID);
        assert_eq!(map.toggle(0, 1, TileCycle::Full), Some(0));
    }

    #[test]
    fn binary_cycle_clears_any_tile() {
        let mut map = Tilemap::new(2, 2);
        assert_eq!(map.toggle(0, 0, TileCycle::Binary), Some(1));
        map.write_cell(1, 1, 6);
        assert_eq!(map.toggle(1, 1, TileCycle::Binary), Some(0));
        assert_eq!(map.toggle(-1, 0, TileCycle::Binary), None);
    }

    #[test]
    fn stage_layout_has_ground_row() {
        let map = Tilemap::stage_layout(10, 156);
        assert!(map.row(8).iter().all(|&id| id == 1));
        assert!(map.row(9).iter().all(|&id| id == 0));
        assert_eq!(map.width_px(32.0), 4992.0);
    }

    #[test]
    fn spawn_markers_round_trip_through_grid() {
        let mut map = Tilemap::new(4, 4);
        map.spawn_waypoints = vec![(1, 2), (3, 0), (9, 9)];
        map.stamp_spawn_markers();
        assert_eq!(map.read_cell(1, 2), 5);
        assert_eq!(map.read_cell(3, 0), 5);
        assert_eq!(map.rows(), 4);
        map.write_cell(1, 2, 0);
        map.collect_spawn_markers();
        assert_eq!(map.spawn_waypoints, vec![(3, 0)]);
    }

    #[test]
    fn ragged_rows_are_rejected() {
        let err = Tilemap::from_rows(&[vec![0, 1], vec![1]]).expect_err("ragged grid");
        assert!(err.contains("row 1"));
    }
}
