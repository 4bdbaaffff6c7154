//! Projectiles, Lasers and Explosions
//!
//! Bullets follow a closed-form curved path evaluated from their launch
//! tick, so the server and every client place them identically. Lasers
//! bounce off walls and stop at the first character on the ray.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, FIXED_ONE, PIXEL, fixed_div, fixed_mul, fixed_clamp, px};
use crate::core::vec2::FixedVec2;
use crate::game::collision::Collision;
use crate::game::events::{GameEvent, GameEventData, Sound};
use crate::game::player::ClientId;
use crate::game::tuning::ms_to_ticks;
use crate::game::weapon::WeaponKind;
use crate::game::world::World;

/// Radius within which a projectile hits a character.
const PROJECTILE_RADIUS: Fixed = px(6);

/// Outer explosion radius.
pub const EXPLOSION_RADIUS: Fixed = px(135);

/// Explosion radius with full damage.
pub const EXPLOSION_INNER_RADIUS: Fixed = px(48);

/// Smallest knockback a projectile hit carries.
const MIN_PROJECTILE_FORCE: Fixed = PIXEL / 1000;

// =============================================================================
// PROJECTILES
// =============================================================================

/// A bullet, pellet or grenade in flight.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Projectile {
    /// Weapon that fired it
    pub kind: WeaponKind,
    /// Shooter
    pub owner: ClientId,
    /// Launch position
    pub pos: FixedVec2,
    /// Launch direction, scaled by the pellet speed factor
    pub dir: FixedVec2,
    /// Ticks left
    pub lifetime: i32,
    /// Knockback on a direct hit
    pub force: Fixed,
    /// Damage on a direct hit
    pub damage: i32,
    /// Explodes on impact
    pub explosive: bool,
    /// Sound on impact
    pub sound_impact: Option<Sound>,
    /// Launch tick
    pub start_tick: u32,
}

impl Projectile {
    /// Projectile fired by `owner` with `kind`.
    pub fn fire(kind: WeaponKind, owner: ClientId, pos: FixedVec2, dir: FixedVec2, world: &World) -> Self {
        let tuning = world.tuning();
        let lifetime_ms = match kind {
            WeaponKind::Shotgun => tuning.shotgun_lifetime_ms,
            WeaponKind::Grenade => tuning.grenade_lifetime_ms,
            _ => tuning.gun_lifetime_ms,
        };
        let explosive = kind == WeaponKind::Grenade;

        Self {
            kind,
            owner,
            pos,
            dir,
            lifetime: ms_to_ticks(lifetime_ms, world.config.tick_speed),
            force: 0,
            damage: world.weapons.spec(kind).damage,
            explosive,
            sound_impact: explosive.then_some(Sound::GrenadeExplode),
            start_tick: world.tick,
        }
    }

    /// Curvature and speed for this kind.
    fn ballistics(&self, world: &World) -> (Fixed, Fixed) {
        let tuning = world.tuning();
        match self.kind {
            WeaponKind::Shotgun => (tuning.shotgun_curvature, tuning.shotgun_speed),
            WeaponKind::Grenade => (tuning.grenade_curvature, tuning.grenade_speed),
            _ => (tuning.gun_curvature, tuning.gun_speed),
        }
    }

    /// Position `ticks` after launch.
    pub fn pos_at(&self, ticks: i32, world: &World) -> FixedVec2 {
        let (curvature, speed) = self.ballistics(world);
        let t = ticks * FIXED_ONE / world.config.tick_speed.max(1);
        let travelled = fixed_mul(t, speed);
        let drop = fixed_mul(curvature, fixed_mul(travelled, travelled));
        FixedVec2::new(
            self.pos.x + fixed_mul(self.dir.x, travelled),
            self.pos.y + fixed_mul(self.dir.y, travelled) + drop,
        )
    }

    /// Advance one tick. Returns false once the projectile is gone.
    pub fn tick(&mut self, world: &mut World) -> bool {
        let elapsed = world.tick.saturating_sub(self.start_tick) as i32;
        let prev = self.pos_at(elapsed - 1, world);
        let mut cur = self.pos_at(elapsed, world);

        let collided = match world.collision().intersect_line(prev, cur) {
            Some(hit) => {
                cur = hit.pos;
                true
            }
            None => false,
        };
        let target = world.intersect_character(prev, cur, PROJECTILE_RADIUS, Some(self.owner));

        self.lifetime -= 1;

        if target.is_none() && !collided && self.lifetime >= 0 && !world.collision().is_clipped(cur) {
            return true;
        }

        if self.lifetime >= 0 || self.kind == WeaponKind::Grenade {
            if let Some(sound) = self.sound_impact {
                world.emit(GameEvent::sound(world.tick, sound, cur));
            }
        }

        let hit_pos = target.map_or(cur, |(_, at)| at);
        if self.explosive {
            create_explosion(world, hit_pos, self.owner, self.kind, false);
        } else if let Some((id, _)) = target {
            let force = self.dir.scale(self.force.max(MIN_PROJECTILE_FORCE));
            world.damage_character(id, force, self.dir.negate(), self.damage, self.owner, self.kind);
        }
        false
    }
}

// =============================================================================
// LASERS
// =============================================================================

/// A bouncing laser beam segment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Laser {
    /// Shooter
    pub owner: ClientId,
    /// Current head
    pub pos: FixedVec2,
    /// Start of the visible segment
    pub from: FixedVec2,
    /// Travel direction
    pub dir: FixedVec2,
    /// Reach left; negative once spent
    pub energy: Fixed,
    /// Walls bounced off so far
    pub bounces: i32,
    /// Tick of the last bounce evaluation
    pub eval_tick: u32,
}

impl Laser {
    /// Fire a laser; the first segment is resolved immediately.
    pub fn new(pos: FixedVec2, dir: FixedVec2, reach: Fixed, owner: ClientId, world: &mut World) -> Self {
        let mut laser = Self {
            owner,
            pos,
            from: pos,
            dir,
            energy: reach,
            bounces: 0,
            eval_tick: world.tick,
        };
        laser.do_bounce(world);
        laser
    }

    fn hit_character(&mut self, from: FixedVec2, to: FixedVec2, world: &mut World) -> bool {
        // The shooter can only be hit by a reflected beam
        let exclude = (self.bounces == 0).then_some(self.owner);
        let Some((id, at)) = world.intersect_character(self.pos, to, 0, exclude) else {
            return false;
        };

        self.from = from;
        self.pos = at;
        self.energy = -1;
        let damage = world.weapons.spec(WeaponKind::Laser).damage;
        let dir = (to - from).normalize();
        world.damage_character(id, FixedVec2::ZERO, dir, damage, self.owner, WeaponKind::Laser);
        true
    }

    /// Resolve the next segment.
    pub fn do_bounce(&mut self, world: &mut World) {
        self.eval_tick = world.tick;

        let to = self.pos + self.dir.scale(self.energy);
        match world.collision().intersect_line(self.pos, to) {
            Some(hit) => {
                let to = hit.before;
                if self.hit_character(self.pos, to, world) {
                    return;
                }

                self.from = self.pos;
                self.pos = to;

                let mut pos = self.pos;
                let mut dir = self.dir.scale(px(4));
                world.collision().move_point(&mut pos, &mut dir, FIXED_ONE);
                self.pos = pos;
                self.dir = dir.normalize();

                let tuning = world.tuning();
                self.energy -= self.from.distance(self.pos) + tuning.laser_bounce_cost;
                self.bounces += 1;
                if self.bounces > tuning.laser_bounce_num {
                    self.energy = -1;
                }
                world.emit(GameEvent::sound(world.tick, Sound::LaserBounce, self.pos));
            }
            None => {
                if !self.hit_character(self.pos, to, world) {
                    self.from = self.pos;
                    self.pos = to;
                    self.energy = -1;
                }
            }
        }
    }

    /// Advance one tick. Returns false once the beam is spent.
    pub fn tick(&mut self, world: &mut World) -> bool {
        let delay = ms_to_ticks(world.tuning().laser_bounce_delay_ms, world.config.tick_speed) as u32;
        if world.tick > self.eval_tick + delay {
            if self.energy < 0 {
                return false;
            }
            self.do_bounce(world);
        }
        true
    }
}

// =============================================================================
// EXPLOSIONS
// =============================================================================

/// Explosion at `pos`: visual event plus distance-scaled knockback and
/// damage to every character in range.
pub fn create_explosion(world: &mut World, pos: FixedVec2, owner: ClientId, weapon: WeaponKind, no_damage: bool) {
    world.emit(GameEvent::broadcast(world.tick, GameEventData::Explosion { pos }));
    if no_damage {
        return;
    }

    let max_damage = world.weapons.spec(WeaponKind::Grenade).damage;
    for target in world.find_characters(pos, EXPLOSION_RADIUS) {
        let Some(target_pos) = world.character_pos(target) else {
            continue;
        };

        let diff = target_pos - pos;
        let distance = diff.length();
        let dir = if distance > 0 { diff.normalize() } else { FixedVec2::DOWN };

        let falloff = fixed_clamp(
            fixed_div(distance - EXPLOSION_INNER_RADIUS, EXPLOSION_RADIUS - EXPLOSION_INNER_RADIUS),
            0,
            FIXED_ONE,
        );
        let dmg = max_damage * (FIXED_ONE - falloff);
        if dmg >> 16 == 0 {
            continue;
        }

        let force = dir.scale(fixed_mul(dmg, 2 * PIXEL));
        world.damage_character(target, force, dir.negate(), dmg >> 16, owner, weapon);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::map::{TileMap, tile_centre};
    use crate::game::player::Team;

    fn world() -> World {
        let mut world = World::new(GameConfig::default(), TileMap::empty("entities", 40, 20));
        world.add_player(0, "shooter", Team::Red, 0x0705);
        world.add_player(1, "target", Team::Red, 0x0705);
        world
    }

    #[test]
    fn test_projectile_path_is_closed_form() {
        let world = world();
        let p = Projectile::fire(WeaponKind::Gun, 0, tile_centre(5, 5), FixedVec2::RIGHT, &world);
        assert_eq!(p.pos_at(0, &world), tile_centre(5, 5));
        let a = p.pos_at(10, &world);
        let b = p.pos_at(20, &world);
        assert!(b.x > a.x && a.x > p.pos.x);
        // Bullets drop
        assert!(b.y > a.y);
        assert_eq!(p.lifetime, ms_to_ticks(world.tuning().gun_lifetime_ms, 50));
    }

    #[test]
    fn test_projectile_dies_on_wall() {
        let mut world = world();
        let mut p = Projectile::fire(WeaponKind::Gun, 0, tile_centre(37, 5), FixedVec2::RIGHT, &world);
        let mut alive = true;
        for _ in 0..10 {
            world.tick += 1;
            alive = p.tick(&mut world);
            if !alive {
                break;
            }
        }
        assert!(!alive);
    }

    #[test]
    fn test_grenade_explodes_with_sound() {
        let mut world = world();
        let mut p = Projectile::fire(WeaponKind::Grenade, 0, tile_centre(37, 5), FixedVec2::RIGHT, &world);
        while p.tick(&mut world) {
            world.tick += 1;
        }
        let events = world.take_events();
        assert!(events.iter().any(|e| matches!(e.data, GameEventData::Explosion { .. })));
        assert!(events
            .iter()
            .any(|e| matches!(e.data, GameEventData::Sound { sound: Sound::GrenadeExplode, .. })));
    }

    #[test]
    fn test_laser_stops_without_wall_and_expires() {
        let mut world = world();
        let mut laser = Laser::new(tile_centre(5, 5), FixedVec2::RIGHT, px(100), 0, &mut world);
        assert_eq!(laser.energy, -1);
        assert_eq!(laser.pos, tile_centre(5, 5) + FixedVec2::RIGHT.scale(px(100)));

        let delay = ms_to_ticks(world.tuning().laser_bounce_delay_ms, 50) as u32;
        world.tick += delay;
        assert!(laser.tick(&mut world));
        world.tick += 1;
        assert!(!laser.tick(&mut world));
    }

    #[test]
    fn test_laser_bounces_off_wall() {
        let mut world = world();
        let laser = Laser::new(tile_centre(35, 5), FixedVec2::RIGHT, px(800), 0, &mut world);
        assert_eq!(laser.bounces, 1);
        assert!(laser.dir.x < 0);
        assert!(laser.energy > 0);
        assert!(world
            .events()
            .iter()
            .any(|e| matches!(e.data, GameEventData::Sound { sound: Sound::LaserBounce, .. })));
    }

    #[test]
    fn test_laser_freezes_first_character_on_ray() {
        let mut world = world();
        world.spawn_character(1, tile_centre(10, 5));
        let laser = Laser::new(tile_centre(5, 5), FixedVec2::RIGHT, px(800), 0, &mut world);
        assert_eq!(laser.energy, -1);
        let target = world.character(1).unwrap();
        assert!(target.freeze.is_frozen());
        assert_eq!(target.last_toucher, Some(0));
    }

    #[test]
    fn test_explosion_falloff() {
        let mut world = world();
        world.spawn_character(1, tile_centre(10, 5));
        let centre = world.character_pos(1).unwrap();

        // Far outside the radius: nothing
        create_explosion(&mut world, centre + FixedVec2::new(px(300), 0), 0, WeaponKind::Grenade, false);
        world.apply_impulses();
        assert_eq!(world.character(1).unwrap().core.vel, FixedVec2::ZERO);

        // Inside the inner radius: full damage pushes away from the blast
        create_explosion(&mut world, centre + FixedVec2::new(-px(20), 0), 0, WeaponKind::Grenade, false);
        world.apply_impulses();
        let target = world.character(1).unwrap();
        assert!(target.core.vel.x > 0);
        assert!(target.freeze.is_frozen());
    }
}
