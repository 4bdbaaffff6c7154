//! Freeze and Spike Status
//!
//! A frozen character cannot move, hook, jump or shoot. Frozen characters
//! touching a spike die, and the spike credits whoever froze (or last
//! touched) them.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::character::Character;
use crate::game::collision::{Collision, Tile};
use crate::game::damage::spike_code;
use crate::game::events::{GameEvent, GameEventData, mask_one};
use crate::game::physics::PHYS_SIZE;
use crate::game::weapon::WeaponKind;
use crate::game::world::World;

/// Freeze duration meaning "until explicitly released".
pub const FREEZE_PERMANENT: i32 = -1;

/// Spikes in the order they are checked.
const SPIKE_PRIORITY: [Tile; 4] = [
    Tile::SpikeNormal,
    Tile::SpikeGold,
    Tile::SpikeGreen,
    Tile::SpikePurple,
];

/// Freeze timer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeState {
    /// Ticks left; 0 = not frozen, -1 = permanent
    pub time: i32,
    /// Tick the current freeze started
    pub tick: Option<u32>,
}

impl FreezeState {
    /// Whether any freeze is active.
    #[inline]
    pub fn is_frozen(&self) -> bool {
        self.time != 0
    }

    /// Whether the freeze shows on the character (positive or permanent).
    #[inline]
    pub fn is_visible(&self) -> bool {
        self.time > 0 || self.time == FREEZE_PERMANENT
    }

    /// Whether a new freeze of `secs` seconds may replace the current one.
    ///
    /// Longer freezes override shorter ones once the one-second cooldown
    /// since the last freeze has passed; a permanent freeze always applies.
    pub fn accepts(&self, secs: i32, tick: u32, tick_speed: i32) -> bool {
        if secs != FREEZE_PERMANENT
            && (secs <= 0 || self.time == FREEZE_PERMANENT || self.time > secs.saturating_mul(tick_speed))
        {
            return false;
        }
        let cooled_down = self
            .tick
            .map_or(true, |t| (t as i64) < tick as i64 - tick_speed as i64);
        cooled_down || secs == FREEZE_PERMANENT
    }
}

impl Character {
    /// Freeze for `secs` seconds (or permanently with -1). Returns false if
    /// the request was rejected.
    pub fn freeze(&mut self, secs: i32, tick: u32, tick_speed: i32) -> bool {
        if !self.freeze.accepts(secs, tick, tick_speed) {
            return false;
        }

        for slot in self.weapons.slots.iter_mut().filter(|s| s.got) {
            slot.ammo = 0;
        }
        self.freeze.time = if secs == FREEZE_PERMANENT { secs } else { secs.saturating_mul(tick_speed) };
        self.freeze.tick = Some(tick);
        true
    }

    /// Release a timed freeze. Returns false if not frozen (permanent
    /// freezes are not released here).
    pub fn unfreeze(&mut self) -> bool {
        if self.freeze.time <= 0 {
            return false;
        }

        for slot in self.weapons.slots.iter_mut().filter(|s| s.got) {
            slot.ammo = -1;
        }
        if !self.weapons.slot(self.weapons.active).got {
            self.weapons.active = WeaponKind::Gun;
        }
        self.freeze = FreezeState::default();
        if self.weapons.active == WeaponKind::Hammer {
            self.weapons.reload_timer = 0;
        }
        true
    }

    /// Status pre-pass run before the physics step.
    pub fn freeze_pre_pass(&mut self, world: &mut World) {
        if let Some(hooked) = self.core.hooked_player {
            if let Some(target) = world.character_mut(hooked) {
                target.last_toucher = Some(self.id);
            }
        }

        if !self.freeze.is_visible() {
            return;
        }

        let tick_speed = world.config.tick_speed;
        if self.freeze.time % tick_speed == tick_speed - 1 || self.freeze.time == FREEZE_PERMANENT {
            let amount = (self.freeze.time + 1) / tick_speed;
            world.emit(GameEvent {
                tick: world.tick,
                mask: mask_one(self.id),
                data: GameEventData::Damage { pos: self.pos, amount },
            });
        }

        if self.freeze.time > 0 {
            self.freeze.time -= 1;
        } else {
            self.weapons.ninja.activation_tick = world.tick;
        }

        self.input.direction = 0;
        self.input.jump = 0;
        self.input.hook = 0;

        if self.freeze.time == 1 {
            self.unfreeze();
        }
    }

    /// Tile pass after the physics step: spikes under the centre or any of
    /// the four probe points kill.
    pub fn handle_tiles(&mut self, world: &mut World) {
        let r = PHYS_SIZE / 3;
        let probes = [
            self.pos,
            FixedVec2::new(self.pos.x + r, self.pos.y - r),
            FixedVec2::new(self.pos.x + r, self.pos.y + r),
            FixedVec2::new(self.pos.x - r, self.pos.y - r),
            FixedVec2::new(self.pos.x - r, self.pos.y + r),
        ];
        let tiles = probes.map(|p| world.collision().tile_at(p));

        if let Some(spike) = SPIKE_PRIORITY.iter().find(|s| tiles.contains(s)) {
            self.die(world, Some(self.id), spike_code(*spike));
        }
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

    fn frozen_world() -> (World, Character) {
        let world = World::new(GameConfig::default(), TileMap::empty("freeze", 20, 20));
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        chr.give_weapon(WeaponKind::Hammer, -1, &world);
        chr.give_weapon(WeaponKind::Laser, -1, &world);
        chr.weapons.active = WeaponKind::Laser;
        (world, chr)
    }

    #[test]
    fn test_freeze_zeroes_owned_ammo() {
        let (_, mut chr) = frozen_world();
        assert!(chr.freeze(3, 100, 50));
        assert_eq!(chr.freeze.time, 150);
        assert_eq!(chr.freeze.tick, Some(100));
        assert_eq!(chr.weapons.slot(WeaponKind::Laser).ammo, 0);
        assert_eq!(chr.weapons.slot(WeaponKind::Hammer).ammo, 0);
        // Unowned slots are untouched
        assert_eq!(chr.weapons.slot(WeaponKind::Gun).ammo, 0);
        assert!(!chr.weapons.slot(WeaponKind::Gun).got);
    }

    #[test]
    fn test_refreeze_shorter_is_noop() {
        let (_, mut chr) = frozen_world();
        assert!(chr.freeze(10, 100, 50));
        let before = chr.clone();

        // Shorter or equal, cooldown not elapsed
        assert!(!chr.freeze(5, 120, 50));
        assert!(!chr.freeze(10, 120, 50));
        assert_eq!(chr, before);

        // Longer, but still inside the cooldown
        assert!(!chr.freeze(20, 120, 50));
        assert_eq!(chr, before);

        // Permanent always applies
        assert!(chr.freeze(FREEZE_PERMANENT, 120, 50));
        assert_eq!(chr.freeze.time, FREEZE_PERMANENT);
        // And nothing timed overrides it
        assert!(!chr.freeze(30, 500, 50));
    }

    #[test]
    fn test_huge_freeze_saturates() {
        let (_, mut chr) = frozen_world();
        assert!(chr.freeze(i32::MAX, 100, 50));
        assert_eq!(chr.freeze.time, i32::MAX);
        assert!(!chr.freeze(1, 200, 50));
    }

    #[test]
    fn test_refreeze_longer_after_cooldown() {
        let (_, mut chr) = frozen_world();
        assert!(chr.freeze(2, 100, 50));
        assert!(chr.freeze(10, 151, 50));
        assert_eq!(chr.freeze.time, 500);
    }

    #[test]
    fn test_unfreeze_idempotent() {
        let (_, mut chr) = frozen_world();
        let before = chr.clone();
        assert!(!chr.unfreeze());
        assert_eq!(chr, before);

        assert!(chr.freeze(1, 100, 50));
        assert!(chr.unfreeze());
        assert_eq!(chr.weapons.slot(WeaponKind::Laser).ammo, -1);
        assert_eq!(chr.freeze, FreezeState::default());
        let after = chr.clone();
        assert!(!chr.unfreeze());
        assert_eq!(chr, after);
    }

    #[test]
    fn test_unfreeze_falls_back_to_gun_for_unowned_weapon() {
        let (_, mut chr) = frozen_world();
        chr.weapons.active = WeaponKind::Shotgun;
        chr.freeze(1, 100, 50);
        chr.unfreeze();
        assert_eq!(chr.weapons.active, WeaponKind::Gun);
    }

    #[test]
    fn test_pre_pass_counts_down_and_neutralizes() {
        let (mut world, mut chr) = frozen_world();
        chr.freeze(1, world.tick, 50);
        chr.input.direction = 1;
        chr.input.jump = 1;

        chr.freeze_pre_pass(&mut world);
        assert_eq!(chr.freeze.time, 49);
        assert_eq!(chr.input.direction, 0);
        assert_eq!(chr.input.jump, 0);
        assert!(world.events().is_empty());

        // Whole-second boundary: countdown indicator to the frozen player only
        chr.freeze_pre_pass(&mut world);
        let countdown = world.events().last().unwrap();
        assert!(countdown.is_for(0));
        assert!(!countdown.is_for(1));
        assert!(matches!(countdown.data, GameEventData::Damage { amount: 1, .. }));

        for _ in 0..46 {
            chr.freeze_pre_pass(&mut world);
        }
        assert_eq!(chr.freeze.time, 2);
        chr.freeze_pre_pass(&mut world);
        // Reaching one releases
        assert_eq!(chr.freeze.time, 0);
        assert_eq!(chr.weapons.slot(WeaponKind::Laser).ammo, -1);
    }
}
