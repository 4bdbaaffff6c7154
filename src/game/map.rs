//! Tile Map
//!
//! Grid-based game layer with spawn points. Maps are authored as ASCII art
//! so tests and the demo driver can describe geometry inline.
//!
//! | char | tile          |
//! |------|---------------|
//! | `.`  | air           |
//! | `#`  | solid         |
//! | `-`  | unhookable    |
//! | `x`  | death         |
//! | `^`  | normal spike  |
//! | `G`  | gold spike    |
//! | `g`  | green spike   |
//! | `p`  | purple spike  |
//! | `S`  | air + spawn   |

use thiserror::Error;

use crate::core::fixed::{FIXED_HALF, FIXED_SCALE};
use crate::core::vec2::FixedVec2;
use crate::game::collision::{Collision, Tile};

/// Tiles outside the map before a character counts as having left the
/// game layer.
pub const GAME_LAYER_MARGIN: i32 = 200;

/// Map parsing errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MapError {
    /// No rows at all.
    #[error("map is empty")]
    Empty,
    /// Rows of different width.
    #[error("row {row} has width {width}, expected {expected}")]
    RaggedRow {
        /// Offending row
        row: usize,
        /// Its width
        width: usize,
        /// Width of the first row
        expected: usize,
    },
    /// Character with no tile meaning.
    #[error("unknown tile '{ch}' at ({x}, {y})")]
    UnknownTile {
        /// The character
        ch: char,
        /// Column
        x: usize,
        /// Row
        y: usize,
    },
}

/// Rectangular tile map.
#[derive(Clone, Debug)]
pub struct TileMap {
    name: String,
    width: i32,
    height: i32,
    tiles: Vec<Tile>,
    spawn_points: Vec<FixedVec2>,
}

impl TileMap {
    /// Parse a map from ASCII rows (see module docs for the legend).
    pub fn from_ascii(name: &str, text: &str) -> Result<Self, MapError> {
        let rows: Vec<&str> = text
            .lines()
            .map(str::trim_end)
            .filter(|l| !l.is_empty())
            .collect();

        let expected = rows.first().map(|r| r.chars().count()).ok_or(MapError::Empty)?;
        if expected == 0 {
            return Err(MapError::Empty);
        }

        let mut tiles = Vec::with_capacity(expected * rows.len());
        let mut spawn_points = Vec::new();

        for (y, row) in rows.iter().enumerate() {
            let width = row.chars().count();
            if width != expected {
                return Err(MapError::RaggedRow { row: y, width, expected });
            }

            for (x, ch) in row.chars().enumerate() {
                let tile = match ch {
                    '.' => Tile::Air,
                    '#' => Tile::Solid,
                    '-' => Tile::NoHook,
                    'x' => Tile::Death,
                    '^' => Tile::SpikeNormal,
                    'G' => Tile::SpikeGold,
                    'g' => Tile::SpikeGreen,
                    'p' => Tile::SpikePurple,
                    'S' => {
                        spawn_points.push(tile_centre(x as i32, y as i32));
                        Tile::Air
                    }
                    _ => return Err(MapError::UnknownTile { ch, x, y }),
                };
                tiles.push(tile);
            }
        }

        Ok(Self {
            name: name.to_string(),
            width: expected as i32,
            height: rows.len() as i32,
            tiles,
            spawn_points,
        })
    }

    /// Small arena used by the demo driver.
    pub fn arena() -> Self {
        const ARENA: &str = "\
##############################
#............................#
#..S......................S..#
#.......#####....#####.......#
#............................#
#....S..................S....#
#..######..............#######
#............................#
#..........S......S..........#
#.......----......----.......#
#............................#
#^^^GG^^^gg^^^^^^^^pp^^^GG^^^#
##############################";
        // The literal above is well-formed
        match Self::from_ascii("arena", ARENA) {
            Ok(map) => map,
            Err(_) => Self::empty("arena", 30, 13),
        }
    }

    /// Map of the given size with solid borders and no spawn points.
    pub fn empty(name: &str, width: i32, height: i32) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        let tiles = (0..height)
            .flat_map(|y| {
                (0..width).map(move |x| {
                    if x == 0 || y == 0 || x == width - 1 || y == height - 1 {
                        Tile::Solid
                    } else {
                        Tile::Air
                    }
                })
            })
            .collect();

        Self {
            name: name.to_string(),
            width,
            height,
            tiles,
            spawn_points: Vec::new(),
        }
    }

    /// Map name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width in tiles.
    pub fn width(&self) -> i32 {
        self.width
    }

    /// Height in tiles.
    pub fn height(&self) -> i32 {
        self.height
    }

    /// Spawn points in map order.
    pub fn spawn_points(&self) -> &[FixedVec2] {
        &self.spawn_points
    }

    /// Tile at grid coordinates, clamped to the map.
    pub fn tile(&self, x: i32, y: i32) -> Tile {
        let x = x.clamp(0, self.width - 1);
        let y = y.clamp(0, self.height - 1);
        self.tiles
            .get((y * self.width + x) as usize)
            .copied()
            .unwrap_or(Tile::Solid)
    }
}

impl Collision for TileMap {
    fn tile_at(&self, pos: FixedVec2) -> Tile {
        self.tile(pos.x >> FIXED_SCALE, pos.y >> FIXED_SCALE)
    }

    fn is_clipped(&self, pos: FixedVec2) -> bool {
        let x = pos.x >> FIXED_SCALE;
        let y = pos.y >> FIXED_SCALE;
        x < -GAME_LAYER_MARGIN
            || x > self.width + GAME_LAYER_MARGIN
            || y < -GAME_LAYER_MARGIN
            || y > self.height + GAME_LAYER_MARGIN
    }
}

/// World position of a tile's centre.
pub fn tile_centre(x: i32, y: i32) -> FixedVec2 {
    let corner = FixedVec2::from_ints(x, y);
    FixedVec2::new(corner.x + FIXED_HALF, corner.y + FIXED_HALF)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_legend() {
        let map = TileMap::from_ascii("t", "#S^\nGgp\n-x.").unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 3);
        assert_eq!(map.tile(0, 0), Tile::Solid);
        assert_eq!(map.tile(1, 0), Tile::Air);
        assert_eq!(map.tile(2, 0), Tile::SpikeNormal);
        assert_eq!(map.tile(0, 1), Tile::SpikeGold);
        assert_eq!(map.tile(1, 1), Tile::SpikeGreen);
        assert_eq!(map.tile(2, 1), Tile::SpikePurple);
        assert_eq!(map.tile(0, 2), Tile::NoHook);
        assert_eq!(map.tile(1, 2), Tile::Death);
        assert_eq!(map.spawn_points(), &[tile_centre(1, 0)]);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(TileMap::from_ascii("t", "").unwrap_err(), MapError::Empty);
        assert_eq!(
            TileMap::from_ascii("t", "###\n##").unwrap_err(),
            MapError::RaggedRow { row: 1, width: 2, expected: 3 }
        );
        assert_eq!(
            TileMap::from_ascii("t", "#?#").unwrap_err(),
            MapError::UnknownTile { ch: '?', x: 1, y: 0 }
        );
    }

    #[test]
    fn test_arena_is_valid() {
        let map = TileMap::arena();
        assert_eq!(map.width(), 30);
        assert_eq!(map.spawn_points().len(), 6);
        for &spawn in map.spawn_points() {
            assert_eq!(map.tile_at(spawn), Tile::Air);
        }
    }

    #[test]
    fn test_game_layer_clip() {
        let map = TileMap::empty("t", 10, 10);
        assert!(!map.is_clipped(FixedVec2::from_ints(5, 5)));
        assert!(!map.is_clipped(FixedVec2::from_ints(-100, 5)));
        assert!(map.is_clipped(FixedVec2::from_ints(-250, 5)));
        assert!(map.is_clipped(FixedVec2::from_ints(5, 300)));
    }
}
