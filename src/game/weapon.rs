//! Weapon System
//!
//! Per-character weapon state machine: selection, firing, ammo, reload,
//! regen and the ninja dash. Each weapon kind has one effect function;
//! dispatch is a `match` on [`WeaponKind`].

use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::core::fixed::{Fixed, FIXED_ONE, PIXEL, px, to_fixed};
use crate::core::vec2::FixedVec2;
use crate::game::character::Character;
use crate::game::collision::Collision;
use crate::game::entities::{Laser, Projectile};
use crate::game::events::{GameEvent, GameEventData, Sound};
use crate::game::input::{count_input, clamp_presses, PlayerInput};
use crate::game::physics::PHYS_SIZE;
use crate::game::player::ClientId;
use crate::game::tuning::ms_to_ticks;
use crate::game::world::World;

/// Number of weapon kinds.
pub const NUM_WEAPONS: usize = 6;

/// Max targets a single dash can hit.
pub const MAX_HITS: usize = 10;

/// Reload penalty for firing an empty weapon.
const NO_AMMO_RELOAD_MS: i32 = 125;

// =============================================================================
// WEAPON KINDS
// =============================================================================

/// Weapon kinds, in wire order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum WeaponKind {
    /// Melee knockback
    #[default]
    Hammer = 0,
    /// Single bullet
    Gun = 1,
    /// Five-pellet spread
    Shotgun = 2,
    /// Explosive projectile
    Grenade = 3,
    /// Bouncing beam
    Laser = 4,
    /// Dash melee
    Ninja = 5,
}

impl WeaponKind {
    /// All kinds in wire order.
    pub const ALL: [WeaponKind; NUM_WEAPONS] = [
        WeaponKind::Hammer,
        WeaponKind::Gun,
        WeaponKind::Shotgun,
        WeaponKind::Grenade,
        WeaponKind::Laser,
        WeaponKind::Ninja,
    ];

    /// Slot index.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Kind at a wire index.
    pub fn from_index(index: i32) -> Option<Self> {
        usize::try_from(index).ok().and_then(|i| Self::ALL.get(i).copied())
    }

    /// Whether holding fire keeps shooting.
    #[inline]
    pub fn is_full_auto(self) -> bool {
        matches!(self, WeaponKind::Grenade | WeaponKind::Shotgun | WeaponKind::Laser)
    }

    /// Kill feed code.
    #[inline]
    pub fn code(self) -> i32 {
        self as i32
    }

    fn fire_sound(self) -> Sound {
        match self {
            WeaponKind::Hammer => Sound::HammerFire,
            WeaponKind::Gun => Sound::GunFire,
            WeaponKind::Shotgun => Sound::ShotgunFire,
            WeaponKind::Grenade => Sound::GrenadeFire,
            WeaponKind::Laser => Sound::LaserFire,
            WeaponKind::Ninja => Sound::NinjaFire,
        }
    }
}

// =============================================================================
// WEAPON TABLE
// =============================================================================

/// Static per-kind weapon data.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSpec {
    /// Damage per hit
    pub damage: i32,
    /// Reload after a shot
    pub fire_delay_ms: i32,
    /// Ammo capacity
    pub max_ammo: i32,
    /// Interval between regenerated rounds (0 = no regen)
    pub ammo_regen_ms: i32,
}

/// Dash parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaSpec {
    /// How long the dash weapon stays equipped
    pub duration_ms: i32,
    /// Length of one dash
    pub movetime_ms: i32,
    /// Dash speed per tick
    pub velocity: Fixed,
}

/// Read-only weapon configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeaponTable {
    /// Per-kind data, indexed by [`WeaponKind::index`]
    pub specs: [WeaponSpec; NUM_WEAPONS],
    /// Dash data
    pub ninja: NinjaSpec,
}

impl Default for WeaponTable {
    fn default() -> Self {
        let spec = |damage, fire_delay_ms, ammo_regen_ms| WeaponSpec {
            damage,
            fire_delay_ms,
            max_ammo: 10,
            ammo_regen_ms,
        };
        Self {
            specs: [
                spec(0, 125, 0),
                spec(1, 125, 500),
                spec(1, 500, 0),
                spec(6, 500, 0),
                spec(5, 800, 0),
                spec(9, 800, 0),
            ],
            ninja: NinjaSpec {
                duration_ms: 15000,
                movetime_ms: 200,
                velocity: px(50),
            },
        }
    }
}

impl WeaponTable {
    /// Data for one kind.
    #[inline]
    pub fn spec(&self, kind: WeaponKind) -> &WeaponSpec {
        &self.specs[kind.index()]
    }
}

// =============================================================================
// PER-CHARACTER STATE
// =============================================================================

/// One weapon slot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponSlot {
    /// Owned
    pub got: bool,
    /// Rounds left; -1 is unlimited
    pub ammo: i32,
    /// Tick the current regen interval started
    pub regen_start: Option<u32>,
}

/// Dash progress.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NinjaState {
    /// Tick the dash weapon was granted (or last refreshed)
    pub activation_tick: u32,
    /// Direction of the current dash
    pub activation_dir: FixedVec2,
    /// Ticks left in the current dash; negative when idle
    pub current_move_time: i32,
    /// Speed before the dash started
    pub old_vel_amount: Fixed,
}

/// Targets already hit by the current activation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitList {
    hits: Vec<ClientId>,
}

impl HitList {
    /// Forget all hits.
    pub fn reset(&mut self) {
        self.hits.clear();
    }

    /// Whether `id` was already hit.
    pub fn contains(&self, id: ClientId) -> bool {
        self.hits.contains(&id)
    }

    /// Record a hit. Returns false for duplicates and once the list is
    /// full; the caller must not hit the target then.
    pub fn record(&mut self, id: ClientId) -> bool {
        if self.is_full() || self.contains(id) {
            return false;
        }
        self.hits.push(id);
        true
    }

    /// Whether no further target may be hit this activation.
    pub fn is_full(&self) -> bool {
        self.hits.len() >= MAX_HITS
    }

    /// Number of recorded hits.
    pub fn len(&self) -> usize {
        self.hits.len()
    }

    /// Whether nothing was hit.
    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}

/// A character's weapon state.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeaponState {
    /// Equipped weapon
    pub active: WeaponKind,
    /// Weapon to restore after the dash
    pub last: WeaponKind,
    /// Pending switch
    pub queued: Option<WeaponKind>,
    /// Ticks until the next shot
    pub reload_timer: i32,
    /// Slots indexed by [`WeaponKind::index`]
    pub slots: [WeaponSlot; NUM_WEAPONS],
    /// Dash progress
    pub ninja: NinjaState,
    /// Dash and hammer hit dedup
    pub hits: HitList,
    /// Tick of the last shot
    pub attack_tick: u32,
    /// Tick of the last dry-fire click
    pub last_no_ammo_sound: Option<u32>,
}

impl WeaponState {
    /// Slot of `kind`.
    #[inline]
    pub fn slot(&self, kind: WeaponKind) -> &WeaponSlot {
        &self.slots[kind.index()]
    }

    /// Mutable slot of `kind`.
    #[inline]
    pub fn slot_mut(&mut self, kind: WeaponKind) -> &mut WeaponSlot {
        &mut self.slots[kind.index()]
    }

    /// Owned flags in slot order.
    pub fn owned(&self) -> [bool; NUM_WEAPONS] {
        let mut owned = [false; NUM_WEAPONS];
        for (o, slot) in owned.iter_mut().zip(self.slots.iter()) {
            *o = slot.got;
        }
        owned
    }

    /// Equip `kind`. Returns false if it was already equipped.
    pub fn set_weapon(&mut self, kind: WeaponKind) -> bool {
        if kind == self.active {
            return false;
        }
        self.last = self.active;
        self.queued = None;
        self.active = kind;
        self.slot_mut(kind).regen_start = None;
        true
    }

    /// Drop the dash weapon and go back to the one held before it.
    pub fn end_ninja(&mut self) {
        self.slot_mut(WeaponKind::Ninja).got = false;
        self.active = self.last;
        self.queued = None;
        self.slot_mut(self.last).regen_start = None;
    }

    /// Grant a weapon with `ammo` rounds (capped at `max_ammo`). Refused if
    /// it is already owned with a full magazine.
    pub fn give_weapon(&mut self, kind: WeaponKind, ammo: i32, max_ammo: i32) -> bool {
        let slot = self.slot_mut(kind);
        if slot.ammo < max_ammo || !slot.got {
            slot.got = true;
            slot.ammo = max_ammo.min(ammo);
            return true;
        }
        false
    }

    /// Resolve next/prev/wanted input into the switch queue.
    pub fn queue_switch(&mut self, prev: &PlayerInput, latest: &PlayerInput) {
        let current = self.queued.unwrap_or(self.active).index();
        let next = count_input(prev.next_weapon, latest.next_weapon).presses;
        let back = count_input(prev.prev_weapon, latest.prev_weapon).presses;

        let mut wanted = cycle_weapon(current, next, back, &self.owned()) as i32;
        if latest.wanted_weapon != 0 {
            wanted = latest.wanted_weapon - 1;
        }

        if let Some(kind) = WeaponKind::from_index(wanted) {
            if kind != self.active && self.slot(kind).got {
                self.queued = Some(kind);
            }
        }
    }

    /// The queued weapon, if a switch is allowed right now.
    pub fn pending_switch(&self) -> Option<WeaponKind> {
        if self.reload_timer != 0 || self.slot(WeaponKind::Ninja).got {
            return None;
        }
        self.queued
    }
}

/// Walk the owned weapons `next` steps forward and then `prev` steps back
/// from `current`. Step counts are truncated to the sane-input bound.
pub fn cycle_weapon(current: usize, next: i32, prev: i32, owned: &[bool; NUM_WEAPONS]) -> usize {
    if !owned.iter().any(|&o| o) {
        return current;
    }

    let mut wanted = current % NUM_WEAPONS;
    let mut next = clamp_presses(next);
    while next > 0 {
        wanted = (wanted + 1) % NUM_WEAPONS;
        if owned[wanted] {
            next -= 1;
        }
    }

    let mut prev = clamp_presses(prev);
    while prev > 0 {
        wanted = if wanted == 0 { NUM_WEAPONS - 1 } else { wanted - 1 };
        if owned[wanted] {
            prev -= 1;
        }
    }
    wanted
}

// Shotgun pellet rotations as (cos, sin) of the spread angle
const SHOTGUN_SPREAD: [(Fixed, Fixed); 5] = [
    (64418, -12055),
    (65376, -4584),
    (FIXED_ONE, 0),
    (65376, 4584),
    (64418, 12055),
];

// =============================================================================
// CHARACTER WEAPON HANDLING
// =============================================================================

impl Character {
    /// Equip `kind`, with the switch sound.
    pub fn set_weapon(&mut self, kind: WeaponKind, world: &mut World) {
        if self.weapons.set_weapon(kind) {
            world.emit(GameEvent::sound(world.tick, Sound::WeaponSwitch, self.pos));
        }
    }

    /// Grant `kind` with `ammo` rounds.
    pub fn give_weapon(&mut self, kind: WeaponKind, ammo: i32, world: &World) -> bool {
        let max_ammo = world.weapons.spec(kind).max_ammo;
        self.weapons.give_weapon(kind, ammo, max_ammo)
    }

    /// Grant and equip the dash weapon.
    pub fn give_ninja(&mut self, world: &mut World) {
        let w = &mut self.weapons;
        w.ninja.activation_tick = world.tick;
        w.ninja.current_move_time = -1;
        let slot = w.slot_mut(WeaponKind::Ninja);
        slot.got = true;
        slot.ammo = -1;
        if w.active != WeaponKind::Ninja {
            w.last = w.active;
        }
        w.active = WeaponKind::Ninja;
        world.emit(GameEvent::sound(world.tick, Sound::PickupNinja, self.pos));
    }

    /// Apply a queued switch if allowed.
    pub fn do_weapon_switch(&mut self, world: &mut World) {
        if let Some(kind) = self.weapons.pending_switch() {
            self.set_weapon(kind, world);
        }
    }

    /// Decode switch input and apply it.
    pub fn handle_weapon_switch(&mut self, world: &mut World) {
        self.weapons.queue_switch(&self.latest_prev_input, &self.latest_input);
        self.do_weapon_switch(world);
    }

    /// Fire the active weapon if the input asks for it.
    pub fn fire_weapon(&mut self, world: &mut World) {
        if self.weapons.reload_timer != 0 {
            return;
        }

        self.do_weapon_switch(world);
        let direction = self.latest_input.target_direction();
        let active = self.weapons.active;
        let ammo = self.weapons.slot(active).ammo;

        let mut will_fire = count_input(self.latest_prev_input.fire, self.latest_input.fire).presses > 0;
        if active.is_full_auto() && self.latest_input.fire_held() && ammo != 0 {
            will_fire = true;
        }
        if !will_fire {
            return;
        }

        let tick = world.tick;
        let tick_speed = world.config.tick_speed;

        if ammo == 0 {
            self.weapons.reload_timer = ms_to_ticks(NO_AMMO_RELOAD_MS, tick_speed);
            let quiet = self
                .weapons
                .last_no_ammo_sound
                .map_or(true, |last| last + tick_speed as u32 <= tick);
            if quiet {
                world.emit(GameEvent::sound(tick, Sound::WeaponNoAmmo, self.pos));
                self.weapons.last_no_ammo_sound = Some(tick);
            }
            return;
        }

        let proj_start = self.pos + direction.scale(PHYS_SIZE * 3 / 4);

        debug!(
            "shot player={} team={} weapon={}",
            self.id,
            world.player(self.id).map_or(-1, |p| p.team.to_wire()),
            active.code()
        );

        match active {
            WeaponKind::Hammer => self.fire_hammer(world, proj_start),
            WeaponKind::Gun | WeaponKind::Grenade => {
                world.spawn_projectile(Projectile::fire(active, self.id, proj_start, direction, world));
            }
            WeaponKind::Shotgun => {
                let speeddiff = world.tuning().shotgun_speeddiff;
                for (i, &(cos, sin)) in SHOTGUN_SPREAD.iter().enumerate() {
                    // Outer pellets are slower
                    let offset = (i as i32 - 2).abs();
                    let speed = speeddiff + (FIXED_ONE - speeddiff) * (2 - offset) / 2;
                    let dir = direction.rotate(cos, sin).scale(speed);
                    world.spawn_projectile(Projectile::fire(active, self.id, proj_start, dir, world));
                }
            }
            WeaponKind::Laser => {
                let reach = world.tuning().laser_reach;
                let laser = Laser::new(self.pos, direction, reach, self.id, world);
                world.spawn_laser(laser);
                if let Some(player) = world.player_mut(self.id) {
                    player.add_shots();
                }
            }
            WeaponKind::Ninja => {
                let movetime = world.weapons.ninja.movetime_ms;
                self.weapons.hits.reset();
                let ninja = &mut self.weapons.ninja;
                ninja.activation_dir = direction;
                ninja.current_move_time = ms_to_ticks(movetime, tick_speed);
                ninja.old_vel_amount = self.core.vel.length();
            }
        }

        if active != WeaponKind::Hammer {
            world.emit(GameEvent::sound(tick, active.fire_sound(), self.pos));
        }

        self.weapons.attack_tick = tick;

        let slot = self.weapons.slot_mut(active);
        if slot.ammo > 0 {
            slot.ammo -= 1;
        }

        if self.weapons.reload_timer == 0 {
            let delay = world.weapons.spec(active).fire_delay_ms;
            self.weapons.reload_timer = ms_to_ticks(delay, tick_speed);
        }
    }

    fn fire_hammer(&mut self, world: &mut World, proj_start: FixedVec2) {
        self.weapons.hits.reset();
        world.emit(GameEvent::sound(world.tick, Sound::HammerFire, self.pos));

        let damage = world.weapons.spec(WeaponKind::Hammer).damage;
        let mut hits = 0;

        for target in world.find_characters(proj_start, PHYS_SIZE / 2) {
            if target == self.id {
                continue;
            }
            let Some(target_pos) = world.character_pos(target) else {
                continue;
            };
            if world.collision().intersect_line(proj_start, target_pos).is_some() {
                continue;
            }

            let to_target = target_pos - proj_start;
            let hit_pos = if to_target.length() > 0 {
                target_pos - to_target.normalize().scale(PHYS_SIZE / 2)
            } else {
                proj_start
            };
            world.emit(GameEvent::broadcast(world.tick, GameEventData::HammerHit { pos: hit_pos }));

            let dir = if (target_pos - self.pos).length() > 0 {
                (target_pos - self.pos).normalize()
            } else {
                FixedVec2::UP
            };
            let force = hammer_push(dir);
            world.damage_character(target, force, dir.negate(), damage, self.id, WeaponKind::Hammer);
            hits += 1;
        }

        // A hit has to wait for the reload
        if hits > 0 {
            self.weapons.reload_timer = world.config.tick_speed / 3;
        }
    }

    /// Drive the dash while the dash weapon is equipped.
    pub fn handle_ninja(&mut self, world: &mut World) {
        if self.weapons.active != WeaponKind::Ninja {
            return;
        }

        let tick_speed = world.config.tick_speed;
        let ninja_spec = world.weapons.ninja;
        let elapsed = world.tick.saturating_sub(self.weapons.ninja.activation_tick) as i32;

        if elapsed > ms_to_ticks(ninja_spec.duration_ms, tick_speed) {
            // Time's up
            let ninja = self.weapons.ninja;
            if ninja.current_move_time > 0 {
                self.core.vel = ninja.activation_dir.scale(ninja.old_vel_amount);
            }
            self.weapons.end_ninja();
            return;
        }

        self.set_weapon(WeaponKind::Ninja, world);
        self.weapons.ninja.current_move_time -= 1;
        let ninja = self.weapons.ninja;

        if ninja.current_move_time == 0 {
            // Dash over: restore the approach speed and the previous weapon
            self.core.vel = ninja.activation_dir.scale(ninja.old_vel_amount);
            self.weapons.end_ninja();
            return;
        }

        if ninja.current_move_time > 0 {
            let old_pos = self.core.pos;
            self.core.vel = ninja.activation_dir.scale(ninja_spec.velocity);
            let size = FixedVec2::new(PHYS_SIZE, PHYS_SIZE);
            world.collision().move_box(&mut self.core.pos, &mut self.core.vel, size, 0);

            // Clients must not extrapolate the dash
            self.core.vel = FixedVec2::ZERO;

            let new_pos = self.core.pos;
            let radius = PHYS_SIZE * 2;
            let damage = world.weapons.spec(WeaponKind::Ninja).damage;
            let candidates: Vec<(ClientId, FixedVec2)> = world
                .core
                .iter()
                .filter(|&(id, _)| id != self.id)
                .map(|(id, view)| (id, view.pos))
                .collect();

            for (target, target_pos) in candidates {
                if self.weapons.hits.is_full() {
                    break;
                }
                if self.weapons.hits.contains(target) {
                    continue;
                }
                let closest = old_pos.closest_point_on_segment(new_pos, target_pos);
                if closest.distance(target_pos) > radius || !self.weapons.hits.record(target) {
                    continue;
                }

                world.emit(GameEvent::sound(world.tick, Sound::NinjaHit, target_pos));
                world.damage_character(
                    target,
                    FixedVec2::new(0, -px(10)),
                    ninja.activation_dir.negate(),
                    damage,
                    self.id,
                    WeaponKind::Ninja,
                );
            }
        }
    }

    /// Per-tick weapon update: dash, reload, fire and regen.
    pub fn handle_weapons(&mut self, world: &mut World) {
        self.handle_ninja(world);

        if self.weapons.reload_timer != 0 {
            self.weapons.reload_timer -= 1;
            return;
        }

        self.fire_weapon(world);
        self.regen_ammo(world);
    }

    fn regen_ammo(&mut self, world: &World) {
        let active = self.weapons.active;
        let spec = *world.weapons.spec(active);
        let regen_ticks = ms_to_ticks(spec.ammo_regen_ms, world.config.tick_speed);
        let reloading = self.weapons.reload_timer > 0;
        let frozen = self.freeze.is_frozen();
        let tick = world.tick;

        let slot = self.weapons.slot_mut(active);
        if spec.ammo_regen_ms == 0 || slot.ammo < 0 {
            return;
        }
        if reloading || frozen || slot.ammo >= spec.max_ammo {
            slot.regen_start = None;
            return;
        }

        let start = *slot.regen_start.get_or_insert(tick);
        if tick.saturating_sub(start) as i32 >= regen_ticks {
            slot.ammo = (slot.ammo + 1).min(spec.max_ammo);
            slot.regen_start = Some(tick);
        }
    }
}

/// Hammer knockback for a target in direction `dir` from the attacker.
pub fn hammer_push(dir: FixedVec2) -> FixedVec2 {
    let lifted = (dir + FixedVec2::new(0, -to_fixed(1.1))).normalize();
    FixedVec2::new(0, -PIXEL) + lifted.scale(px(10))
}

// =============================================================================
// TESTS
// =============================================================================
