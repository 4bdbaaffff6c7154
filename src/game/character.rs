//! Character Simulation
//!
//! One live character: the two-phase tick, input handling, and the
//! per-observer snapshot. Weapons, freeze status and damage are
//! implemented in their own modules as further `impl Character` blocks.
//!
//! ## Tick Phases
//!
//! 1. `tick`: status pre-pass, physics step against the world as it was
//!    at phase start, weapons, tiles.
//! 2. `tick_defered`: replica step, authoritative move, hazard death,
//!    dead-reckoning decision.

use tracing::warn;

use crate::core::fixed::px;
use crate::core::vec2::FixedVec2;
use crate::game::collision::Collision;
use crate::game::damage::WEAPON_WORLD;
use crate::game::events::Emote;
use crate::game::freeze::FreezeState;
use crate::game::input::PlayerInput;
use crate::game::mode::{MAX_HEALTH, SoloFng};
use crate::game::physics::{CharacterCore, PHYS_SIZE, WorldCore};
use crate::game::player::ClientId;
use crate::game::reckoning::{DeadReckoning, ResyncCause};
use crate::game::tuning::ms_to_ticks;
use crate::game::weapon::{WeaponKind, WeaponState};
use crate::game::world::World;
use crate::network::snapshot::CharacterSnapshot;

/// Half-width of an observer's view rectangle.
const VIEW_CLIP_X: i32 = px(1000);
/// Half-height of an observer's view rectangle.
const VIEW_CLIP_Y: i32 = px(800);

/// Ticks in one idle blink cycle.
const BLINK_PERIOD: u32 = 250;
/// Ticks the eyes stay closed at the end of a cycle.
const BLINK_TICKS: u32 = 5;

/// A live character.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Character {
    /// Owning slot
    pub id: ClientId,
    /// Cleared by `die`; the owner reaps the character at the end of the tick
    pub alive: bool,
    /// Committed position
    pub pos: FixedVec2,
    /// Health, 0 to 10
    pub health: i32,
    /// Armor, 0 to 10
    pub armor: i32,
    /// Authoritative physics core
    pub core: CharacterCore,
    /// Replica and broadcast cores
    pub reckoning: DeadReckoning,
    /// Weapon state machine
    pub weapons: WeaponState,
    /// Freeze timer
    pub freeze: FreezeState,
    /// Last character to hit or hook this one
    pub last_toucher: Option<ClientId>,
    /// Predicted input, applied every physics step
    pub input: PlayerInput,
    /// Direct input before `latest_input`
    pub latest_prev_input: PlayerInput,
    /// Latest direct input
    pub latest_input: PlayerInput,
    /// Predicted inputs received since spawn
    pub num_inputs: u32,
    /// Current emote
    pub emote: Emote,
    /// Tick the emote ends
    pub emote_stop: Option<u32>,
    /// Tick the predicted input last changed
    pub last_action: Option<u32>,
    /// Core events since the last snapshot
    pub triggered_events: u32,
    /// Tick of spawn
    pub spawn_tick: u32,
}

impl Character {
    /// Character in slot `id` at `pos` with an empty loadout. The character
    /// is not registered with the world; see [`Character::spawn`].
    pub fn new(id: ClientId, pos: FixedVec2, world: &World) -> Self {
        let weapons = WeaponState {
            active: SoloFng::primary_weapon(world.config.game_type),
            last: WeaponKind::Hammer,
            ..Default::default()
        };

        Self {
            id,
            alive: true,
            pos,
            health: 0,
            armor: 0,
            core: CharacterCore::new(id, pos),
            reckoning: DeadReckoning::default(),
            weapons,
            freeze: FreezeState::default(),
            last_toucher: None,
            input: PlayerInput::default(),
            latest_prev_input: PlayerInput::default(),
            latest_input: PlayerInput::default(),
            num_inputs: 0,
            emote: Emote::Normal,
            emote_stop: None,
            last_action: None,
            triggered_events: 0,
            spawn_tick: world.tick,
        }
    }

    /// Spawn: register the core with the world and let the game mode hand
    /// out health and weapons.
    pub fn spawn(world: &mut World, id: ClientId, pos: FixedVec2) -> Self {
        let mut chr = Self::new(id, pos, world);
        world.core.set(id, chr.core.view());

        let mode = world.mode();
        mode.on_character_spawn(&mut chr, world);
        chr
    }

    // =========================================================================
    // PHASE 1
    // =========================================================================

    /// Phase 1: status, physics step with input, weapons, tiles.
    pub fn tick(&mut self, world: &mut World) {
        self.freeze_pre_pass(world);

        self.core.input = self.input;
        let impulses = self.core.tick(true, &world.core, world.collision());
        world.queue_impulses(impulses);

        if world.collision().is_clipped(self.pos) {
            self.die(world, Some(self.id), WEAPON_WORLD);
        }
        if !self.alive {
            return;
        }

        self.handle_weapons(world);
        self.handle_tiles(world);
    }

    // =========================================================================
    // PHASE 2
    // =========================================================================

    /// Phase 2: commit movement and decide whether clients need a fresh
    /// core. Returns the resync cause when one was sent.
    pub fn tick_defered(&mut self, world: &mut World) -> Option<ResyncCause> {
        // 1. Replica, as a client would extrapolate it
        let isolated = WorldCore::isolated(*world.tuning());
        self.reckoning.advance_replica(&isolated, world.collision());

        // 2. Authoritative move against the phase-start views
        let size = FixedVec2::new(PHYS_SIZE, PHYS_SIZE);
        let stuck_before = world.collision().test_box(self.core.pos, size);
        self.core.move_core(&world.core, world.collision());
        self.core.quantize();
        let stuck_after = world.collision().test_box(self.core.pos, size);
        if !stuck_before && stuck_after {
            warn!("character stuck id={} pos={}", self.id, self.core.pos);
        }

        self.pos = self.core.pos;
        self.triggered_events |= self.core.triggered_events;

        // 3. Spectators follow their camera; hazards kill
        let spectator = world.player(self.id).map_or(false, |p| p.is_spectator());
        if spectator {
            self.pos = self.input.target();
        } else if self.core.death {
            self.die(world, Some(self.id), WEAPON_WORLD);
        }

        // 4. Dead reckoning
        let stale_ticks = world.config.secs_to_ticks(world.config.reckoning_stale_secs).max(0) as u32;
        self.reckoning.reconcile(&self.core, world.tick, stale_ticks)
    }

    /// Shift every tick stamp forward while the world is paused.
    pub fn tick_paused(&mut self) {
        self.weapons.attack_tick += 1;
        self.weapons.ninja.activation_tick += 1;
        self.reckoning.tick_paused();

        let active = self.weapons.active;
        for stamp in [
            self.last_action.as_mut(),
            self.emote_stop.as_mut(),
        ]
        .into_iter()
        .flatten()
        {
            *stamp += 1;
        }
        if let Some(start) = self.weapons.slot_mut(active).regen_start.as_mut() {
            *start += 1;
        }
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Store a predicted input for the next physics step.
    pub fn on_predicted_input(&mut self, new_input: &PlayerInput, tick: u32) {
        if self.input != *new_input {
            self.last_action = Some(tick);
        }
        self.input = *new_input;
        self.num_inputs += 1;
        self.input.sanitize_aim();
    }

    /// Apply a direct input: weapon switch and fire happen right away.
    pub fn on_direct_input(&mut self, new_input: &PlayerInput, world: &mut World) {
        self.latest_prev_input = self.latest_input;
        self.latest_input = *new_input;
        self.latest_input.sanitize_aim();

        let spectator = world.player(self.id).map_or(false, |p| p.is_spectator());
        if self.num_inputs > 2 && !spectator {
            self.handle_weapon_switch(world);
            self.fire_weapon(world);
        }

        self.latest_prev_input = self.latest_input;
    }

    /// Drop movement and release fire, e.g. when the chat box opens.
    pub fn reset_input(&mut self) {
        self.input.neutralize();
        self.latest_prev_input = self.input;
        self.latest_input = self.input;
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    /// Show `emote` until `stop_tick`.
    pub fn set_emote(&mut self, emote: Emote, stop_tick: u32) {
        self.emote = emote;
        self.emote_stop = Some(stop_tick);
    }

    /// Add health. Returns false if already full.
    pub fn increase_health(&mut self, amount: i32) -> bool {
        if self.health >= MAX_HEALTH {
            return false;
        }
        self.health = (self.health + amount).clamp(0, MAX_HEALTH);
        true
    }

    /// Add armor. Returns false if already full.
    pub fn increase_armor(&mut self, amount: i32) -> bool {
        if self.armor >= MAX_HEALTH {
            return false;
        }
        self.armor = (self.armor + amount).clamp(0, MAX_HEALTH);
        true
    }

    // =========================================================================
    // SNAPSHOT
    // =========================================================================

    /// Snapshot of this character for `observer` (`None` for a recorder
    /// that sees everything). Returns `None` when the character is outside
    /// the observer's view.
    pub fn snap(&self, observer: Option<ClientId>, world: &World) -> Option<CharacterSnapshot> {
        let viewer = observer.and_then(|o| world.player(o));
        if let Some(viewer) = viewer {
            let d = self.pos - viewer.view_pos;
            if d.x.abs() > VIEW_CLIP_X || d.y.abs() > VIEW_CLIP_Y {
                return None;
            }
        }

        let (tick, core) = self.reckoning.snapshot_source(&self.core, world.paused);

        let mut emote = match self.emote_stop {
            Some(stop) if stop >= world.tick => self.emote,
            _ => Emote::Normal,
        };

        let full_view = match observer {
            None => true,
            Some(o) if o == self.id => true,
            Some(_) => {
                !world.config.strict_spectate_mode
                    && viewer.map_or(false, |v| v.is_spectator() && v.spectating == Some(self.id))
            }
        };

        let (mut health, mut armor, mut ammo) = (0, 0, 0);
        if full_view {
            health = self.health;
            armor = self.armor;
            let active = self.weapons.active;
            if active == WeaponKind::Ninja {
                let duration = ms_to_ticks(world.weapons.ninja.duration_ms, world.config.tick_speed);
                ammo = self.weapons.ninja.activation_tick as i32 + duration;
            } else if self.weapons.slot(active).ammo > 0 {
                ammo = self.weapons.slot(active).ammo;
            }
        }

        let mut weapon = self.weapons.active;
        if self.freeze.is_visible() {
            weapon = WeaponKind::Ninja;
            if emote == Emote::Normal {
                emote = Emote::Blink;
            }
        }

        if emote == Emote::Normal {
            let since = world.tick.wrapping_sub(self.last_action.unwrap_or(self.spawn_tick));
            if BLINK_PERIOD - since % BLINK_PERIOD < BLINK_TICKS {
                emote = Emote::Blink;
            }
        }

        Some(CharacterSnapshot {
            client_id: self.id,
            tick,
            core: core.write(),
            health,
            armor,
            ammo,
            weapon: weapon.code(),
            attack_tick: self.weapons.attack_tick,
            direction: self.input.direction,
            emote,
            triggered_events: self.triggered_events,
        })
    }

    /// Clear per-snapshot state once every observer was served.
    pub fn post_snap(&mut self, tick: u32) {
        self.triggered_events = 0;
        if self.emote_stop.map_or(false, |stop| stop < tick) {
            self.emote = Emote::Normal;
            self.emote_stop = None;
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{GameConfig, GameType};
    use crate::game::map::{TileMap, tile_centre};
    use crate::game::player::Team;

    fn world() -> World {
        let mut world = World::new(GameConfig::default(), TileMap::empty("character", 40, 20));
        world.add_player(0, "alice", Team::Red, 0x0705);
        world.add_player(1, "bob", Team::Red, 0x0705);
        world
    }

    #[test]
    fn test_spawn_loadout() {
        let mut world = world();
        let chr = Character::spawn(&mut world, 0, tile_centre(5, 5));
        assert!(chr.alive);
        assert_eq!(chr.health, 10);
        assert_eq!(chr.weapons.active, WeaponKind::Laser);
        assert_eq!(chr.weapons.last, WeaponKind::Hammer);
        assert!(chr.weapons.slot(WeaponKind::Hammer).got);
        assert!(chr.weapons.slot(WeaponKind::Laser).got);
        assert_eq!(chr.weapons.slot(WeaponKind::Laser).ammo, -1);
        assert_eq!(chr.reckoning.tick, None);
        assert!(world.core.contains(0));
    }

    #[test]
    fn test_bolofng_spawns_with_grenades() {
        let config = GameConfig { game_type: GameType::BoloFng, ..Default::default() };
        let mut world = World::new(config, TileMap::empty("bolo", 20, 20));
        world.add_player(0, "alice", Team::Red, 0x0705);
        let chr = Character::spawn(&mut world, 0, tile_centre(5, 5));
        assert_eq!(chr.weapons.active, WeaponKind::Grenade);
        assert!(chr.weapons.slot(WeaponKind::Grenade).got);
        assert!(!chr.weapons.slot(WeaponKind::Laser).got);
    }

    #[test]
    fn test_health_and_armor_clamp() {
        let world = world();
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        assert!(chr.increase_health(25));
        assert_eq!(chr.health, 10);
        assert!(!chr.increase_health(1));
        assert!(chr.increase_armor(3));
        assert_eq!(chr.armor, 3);
        assert!(chr.increase_armor(-20));
        assert_eq!(chr.armor, 0);
    }

    #[test]
    fn test_predicted_input_tracks_activity() {
        let world = world();
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        let input = PlayerInput { direction: 1, ..Default::default() };

        chr.on_predicted_input(&input, 10);
        assert_eq!(chr.last_action, Some(10));
        assert_eq!(chr.num_inputs, 1);
        // Centre aim is remapped
        assert_eq!(chr.input.target_y, -1);

        // Same input again (after remapping) is not activity
        let same = chr.input;
        chr.on_predicted_input(&same, 20);
        assert_eq!(chr.last_action, Some(10));
        assert_eq!(chr.num_inputs, 2);
    }

    #[test]
    fn test_direct_input_needs_warmup() {
        let mut world = world();
        let mut chr = Character::spawn(&mut world, 0, tile_centre(5, 5));
        let fire = PlayerInput { fire: 1, target_x: 10, ..Default::default() };

        chr.on_direct_input(&fire, &mut world);
        assert_eq!(world.laser_count(), 0);
        assert_eq!(chr.latest_prev_input, chr.latest_input);

        for _ in 0..3 {
            chr.on_predicted_input(&fire, world.tick);
        }
        let again = PlayerInput { fire: 3, target_x: 10, ..Default::default() };
        chr.on_direct_input(&again, &mut world);
        assert_eq!(world.laser_count(), 1);
        assert_eq!(world.player(0).unwrap().stats.shots, 1);
    }

    #[test]
    fn test_reset_input_releases_fire() {
        let world = world();
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        chr.input = PlayerInput { direction: -1, jump: 1, hook: 1, fire: 5, ..Default::default() };
        chr.reset_input();
        assert_eq!(chr.input.direction, 0);
        assert_eq!(chr.input.jump, 0);
        assert_eq!(chr.input.hook, 0);
        assert_eq!(chr.input.fire, 6);
        assert_eq!(chr.latest_input, chr.input);
        assert_eq!(chr.latest_prev_input, chr.input);
    }

    #[test]
    fn test_tick_paused_shifts_stamps() {
        let world = world();
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        chr.weapons.attack_tick = 10;
        chr.last_action = Some(20);
        chr.emote_stop = Some(30);
        chr.reckoning.tick = Some(40);
        chr.weapons.slot_mut(WeaponKind::Laser).regen_start = Some(50);

        chr.tick_paused();
        assert_eq!(chr.weapons.attack_tick, 11);
        assert_eq!(chr.last_action, Some(21));
        assert_eq!(chr.emote_stop, Some(31));
        assert_eq!(chr.reckoning.tick, Some(41));
        assert_eq!(chr.weapons.slot(WeaponKind::Laser).regen_start, Some(51));
    }

    #[test]
    fn test_snap_visibility_rules() {
        let mut world = world();
        world.add_player(2, "watcher", Team::Spectators, 0x0705);
        world.spawn_character(0, tile_centre(5, 5));
        let chr = world.character(0).unwrap().clone();

        let own = chr.snap(Some(0), &world).unwrap();
        assert_eq!(own.health, 10);
        // Unlimited ammo is not shown
        assert_eq!(own.ammo, 0);
        assert_eq!(own.tick, 0);

        let other = chr.snap(Some(1), &world).unwrap();
        assert_eq!(other.health, 0);

        world.player_mut(2).unwrap().spectating = Some(0);
        assert_eq!(chr.snap(Some(2), &world).unwrap().health, 10);
        world.config.strict_spectate_mode = true;
        assert_eq!(chr.snap(Some(2), &world).unwrap().health, 0);
    }

    #[test]
    fn test_snap_network_clipping() {
        let mut world = world();
        world.spawn_character(0, tile_centre(5, 5));
        let chr = world.character(0).unwrap().clone();

        world.player_mut(1).unwrap().view_pos = chr.pos + FixedVec2::new(px(999), 0);
        assert!(chr.snap(Some(1), &world).is_some());
        world.player_mut(1).unwrap().view_pos = chr.pos + FixedVec2::new(0, px(801));
        assert!(chr.snap(Some(1), &world).is_none());
        assert!(chr.snap(None, &world).is_some());
    }

    #[test]
    fn test_frozen_snap_shows_ninja_and_blink() {
        let mut world = world();
        world.spawn_character(0, tile_centre(5, 5));
        let mut chr = world.character(0).unwrap().clone();
        chr.freeze(3, world.tick, 50);

        let snap = chr.snap(None, &world).unwrap();
        assert_eq!(snap.weapon, WeaponKind::Ninja.code());
        assert_eq!(snap.emote, Emote::Blink);

        // Pain shows through the freeze
        chr.set_emote(Emote::Pain, world.tick + 10);
        assert_eq!(chr.snap(None, &world).unwrap().emote, Emote::Pain);
    }

    #[test]
    fn test_post_snap_clears_events_and_expired_emote() {
        let world = world();
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        chr.triggered_events = 0x3;
        chr.set_emote(Emote::Happy, 5);
        chr.post_snap(5);
        assert_eq!(chr.triggered_events, 0);
        assert_eq!(chr.emote, Emote::Happy);
        chr.post_snap(6);
        assert_eq!(chr.emote, Emote::Normal);
        assert_eq!(chr.emote_stop, None);
    }
}
