//! Collision Primitive
//!
//! The deterministic move/collide primitive shared by the authoritative and
//! replica physics paths. Implementors only provide tile lookup and the
//! game-layer bounds; the sweeps below are built on top of those.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, PIXEL, fixed_mul};
use crate::core::vec2::FixedVec2;

// =============================================================================
// TILES
// =============================================================================

/// Map tile kinds relevant to the simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tile {
    /// Empty space
    #[default]
    Air = 0,
    /// Hookable wall
    Solid = 1,
    /// Kills on contact during movement
    Death = 2,
    /// Wall the hook bounces off
    NoHook = 3,
    /// Gold spike (highest normal bonus)
    SpikeGold = 7,
    /// Normal spike
    SpikeNormal = 8,
    /// Green spike
    SpikeGreen = 9,
    /// Purple spike
    SpikePurple = 10,
}

impl Tile {
    /// Walls block movement.
    #[inline]
    pub fn is_solid(self) -> bool {
        matches!(self, Tile::Solid | Tile::NoHook)
    }

    /// Numeric tile index as stored in map files.
    #[inline]
    pub fn index(self) -> i32 {
        self as i32
    }
}

/// Where a swept line first touched a wall.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LineHit {
    /// First point inside the wall
    pub pos: FixedVec2,
    /// Last point before the wall
    pub before: FixedVec2,
    /// The wall tile that was hit
    pub tile: Tile,
}

// =============================================================================
// COLLISION TRAIT
// =============================================================================

/// Static world geometry.
pub trait Collision {
    /// Tile under a world position. Out-of-map positions read the nearest
    /// border tile.
    fn tile_at(&self, pos: FixedVec2) -> Tile;

    /// Whether a position is far enough outside the map to count as having
    /// left the game layer.
    fn is_clipped(&self, pos: FixedVec2) -> bool;

    /// Point containment test against walls.
    #[inline]
    fn check_point(&self, pos: FixedVec2) -> bool {
        self.tile_at(pos).is_solid()
    }

    /// Line-of-sight test sampled once per pixel.
    fn intersect_line(&self, from: FixedVec2, to: FixedVec2) -> Option<LineHit> {
        let distance = from.distance(to);
        let steps = (distance / PIXEL) as i64 + 1;
        let mut last = from;

        for i in 0..=steps {
            let t = ((i * FIXED_ONE as i64) / steps) as Fixed;
            let pos = from.lerp(to, t);
            let tile = self.tile_at(pos);
            if tile.is_solid() {
                return Some(LineHit { pos, before: last, tile });
            }
            last = pos;
        }
        None
    }

    /// Whether an axis-aligned box of `size` centred on `pos` touches a wall.
    fn test_box(&self, pos: FixedVec2, size: FixedVec2) -> bool {
        box_corners(pos, size).iter().any(|&c| self.check_point(c))
    }

    /// Whether the box touches a death tile.
    fn test_box_death(&self, pos: FixedVec2, size: FixedVec2) -> bool {
        box_corners(pos, size).iter().any(|&c| self.tile_at(c) == Tile::Death)
    }

    /// Sweep a box along `vel`, sliding along walls.
    ///
    /// The sweep is split into one sub-step per whole pixel of travel. On a
    /// blocked sub-step each blocked axis is cancelled and its velocity
    /// component reflected by `elasticity`. Returns true if any visited
    /// position touched a death tile.
    fn move_box(
        &self,
        pos: &mut FixedVec2,
        vel: &mut FixedVec2,
        size: FixedVec2,
        elasticity: Fixed,
    ) -> bool {
        let distance = vel.length();
        if distance == 0 {
            return false;
        }

        let max = distance / PIXEL;
        let mut death = false;
        let mut current = *pos;

        for _ in 0..=max {
            let step = FixedVec2::new(vel.x / (max + 1), vel.y / (max + 1));
            let mut next = current + step;

            if self.test_box(next, size) {
                let mut hits = 0;

                if self.test_box(FixedVec2::new(current.x, next.y), size) {
                    next.y = current.y;
                    vel.y = fixed_mul(vel.y, -elasticity);
                    hits += 1;
                }

                if self.test_box(FixedVec2::new(next.x, current.y), size) {
                    next.x = current.x;
                    vel.x = fixed_mul(vel.x, -elasticity);
                    hits += 1;
                }

                // Corner hit: neither axis alone is blocked
                if hits == 0 {
                    next = current;
                    *vel = vel.scale(-elasticity);
                }
            }

            if self.test_box_death(next, size) {
                death = true;
            }
            current = next;
        }

        *pos = current;
        death
    }

    /// Move a point by `vel`, reflecting the blocked axes (scaled by
    /// `elasticity`) instead of moving when the target is inside a wall.
    fn move_point(&self, pos: &mut FixedVec2, vel: &mut FixedVec2, elasticity: Fixed) {
        let next = *pos + *vel;
        if !self.check_point(next) {
            *pos = next;
            return;
        }

        let mut affected = 0;
        if self.check_point(FixedVec2::new(pos.x + vel.x, pos.y)) {
            vel.x = fixed_mul(vel.x, -elasticity);
            affected += 1;
        }
        if self.check_point(FixedVec2::new(pos.x, pos.y + vel.y)) {
            vel.y = fixed_mul(vel.y, -elasticity);
            affected += 1;
        }
        if affected == 0 {
            *vel = vel.scale(-elasticity);
        }
    }
}

/// The four corners of a box of `size` centred on `pos`.
fn box_corners(pos: FixedVec2, size: FixedVec2) -> [FixedVec2; 4] {
    let hx = size.x / 2;
    let hy = size.y / 2;
    [
        FixedVec2::new(pos.x - hx, pos.y - hy),
        FixedVec2::new(pos.x + hx, pos.y - hy),
        FixedVec2::new(pos.x - hx, pos.y + hy),
        FixedVec2::new(pos.x + hx, pos.y + hy),
    ]
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::{px, FIXED_HALF};
    use crate::game::map::TileMap;

    fn room() -> TileMap {
        TileMap::from_ascii(
            "room",
            "\
#######
#.....#
#..x..#
#.....#
#######",
        )
        .unwrap()
    }

    fn centre(x: i32, y: i32) -> FixedVec2 {
        FixedVec2::new(x * FIXED_ONE + FIXED_HALF, y * FIXED_ONE + FIXED_HALF)
    }

    #[test]
    fn test_check_point() {
        let map = room();
        assert!(map.check_point(centre(0, 0)));
        assert!(!map.check_point(centre(1, 1)));
        // Out of bounds clamps to the border wall
        assert!(map.check_point(FixedVec2::from_ints(-5, 2)));
    }

    #[test]
    fn test_intersect_line_stops_at_wall() {
        let map = room();
        let hit = map.intersect_line(centre(1, 1), centre(8, 1)).unwrap();
        assert_eq!(hit.tile, Tile::Solid);
        assert!(hit.pos.x >= FixedVec2::from_ints(6, 0).x);
        assert!(hit.before.x < FixedVec2::from_ints(6, 0).x);

        assert!(map.intersect_line(centre(1, 1), centre(5, 3)).is_none());
    }

    #[test]
    fn test_move_box_slides_along_floor() {
        let map = room();
        let size = FixedVec2::new(px(28), px(28));
        // Resting just above the floor, moving down-right
        let mut pos = FixedVec2::new(centre(1, 3).x, FixedVec2::from_ints(4, 0).y - px(15));
        let mut vel = FixedVec2::new(px(5), px(10));

        map.move_box(&mut pos, &mut vel, size, 0);

        assert_eq!(vel.y, 0);
        assert_eq!(vel.x, px(5));
        assert!(!map.test_box(pos, size));
    }

    #[test]
    fn test_move_box_reports_death() {
        let map = room();
        let size = FixedVec2::new(px(28), px(28));
        let mut pos = centre(1, 2);
        let mut vel = FixedVec2::new(px(40), 0);

        assert!(map.move_box(&mut pos, &mut vel, size, 0));
    }

    #[test]
    fn test_move_box_zero_velocity() {
        let map = room();
        let mut pos = centre(1, 1);
        let mut vel = FixedVec2::ZERO;
        assert!(!map.move_box(&mut pos, &mut vel, FixedVec2::new(px(28), px(28)), 0));
        assert_eq!(pos, centre(1, 1));
    }

    #[test]
    fn test_move_point_reflects_off_wall() {
        let map = room();
        // One pixel from the left wall, moving left
        let mut pos = FixedVec2::new(FIXED_ONE + px(1), centre(1, 1).y);
        let mut vel = FixedVec2::new(-px(4), 0);
        map.move_point(&mut pos, &mut vel, FIXED_ONE);
        assert_eq!(pos, FixedVec2::new(FIXED_ONE + px(1), centre(1, 1).y));
        assert_eq!(vel, FixedVec2::new(px(4), 0));

        // Free space: plain move
        map.move_point(&mut pos, &mut vel, FIXED_ONE);
        assert_eq!(pos.x, FIXED_ONE + px(5));
    }
}
