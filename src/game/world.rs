//! Game World
//!
//! Owns every player slot, the live projectiles and lasers, the per-tick
//! event queue and the shared core views that characters collide and hook
//! against.
//!
//! ## Taking Characters Out
//!
//! A character mutates the world (sounds, damage on others, projectiles)
//! while it runs. [`World::with_character`] moves it out of its slot for
//! the duration of a call and puts it back afterwards; its core view stays
//! registered so the others still see it.

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::GameConfig;
use crate::core::hash::{StateHash, compute_state_hash};
use crate::core::rng::{DeterministicRng, derive_round_seed};
use crate::core::vec2::FixedVec2;
use crate::game::character::Character;
use crate::game::collision::Collision;
use crate::game::damage::WEAPON_GAME;
use crate::game::entities::{Laser, Projectile};
use crate::game::events::{ClientMask, GameEvent, GameEventData, Sound, mask_one};
use crate::game::input::{PLAYERFLAG_CHATTING, PlayerInput};
use crate::game::map::TileMap;
use crate::game::mode::{GameMode, SoloFng};
use crate::game::physics::{Impulse, PHYS_SIZE, WorldCore};
use crate::game::player::{ClientId, MAX_CLIENTS, Player, Team};
use crate::game::tuning::Tuning;
use crate::game::weapon::{WeaponKind, WeaponTable};
use crate::network::snapshot::CharacterSnapshot;

/// The simulated world.
pub struct World {
    /// Server configuration
    pub config: GameConfig,
    /// Weapon table
    pub weapons: WeaponTable,
    /// Current tick
    pub tick: u32,
    /// Whether the game is paused
    pub paused: bool,
    /// Core views of every live character, plus the physics tuning
    pub core: WorldCore,
    map: TileMap,
    players: Vec<Option<Player>>,
    projectiles: Vec<Projectile>,
    lasers: Vec<Laser>,
    events: Vec<GameEvent>,
    impulses: Vec<Impulse>,
    mode: Arc<dyn GameMode>,
    rng: DeterministicRng,
    rng_seed: u64,
}

impl World {
    /// World on `map` running the freeze-and-spike mode.
    pub fn new(config: GameConfig, map: TileMap) -> Self {
        Self::with_mode(config, map, Arc::new(SoloFng))
    }

    /// World running a custom game mode.
    pub fn with_mode(config: GameConfig, map: TileMap, mode: Arc<dyn GameMode>) -> Self {
        let rng_seed = derive_round_seed(map.name(), 0);
        info!("world created map={} mode={} tick_speed={}", map.name(), mode.name(), config.tick_speed);

        Self {
            config,
            weapons: WeaponTable::default(),
            tick: 0,
            paused: false,
            core: WorldCore::new(Tuning::default()),
            map,
            players: (0..MAX_CLIENTS).map(|_| None).collect(),
            projectiles: Vec::new(),
            lasers: Vec::new(),
            events: Vec::new(),
            impulses: Vec::new(),
            mode,
            rng: DeterministicRng::new(rng_seed),
            rng_seed,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Physics tuning.
    #[inline]
    pub fn tuning(&self) -> &Tuning {
        &self.core.tuning
    }

    /// Static geometry.
    #[inline]
    pub fn collision(&self) -> &dyn Collision {
        &self.map
    }

    /// The loaded map.
    pub fn map(&self) -> &TileMap {
        &self.map
    }

    /// Shared handle to the game mode.
    pub fn mode(&self) -> Arc<dyn GameMode> {
        Arc::clone(&self.mode)
    }

    // =========================================================================
    // PLAYERS
    // =========================================================================

    /// Occupy slot `id`. Returns false if the slot is invalid or taken.
    pub fn add_player(&mut self, id: ClientId, name: &str, team: Team, client_version: i32) -> bool {
        let tick = self.tick;
        match self.players.get_mut(id) {
            Some(slot @ None) => {
                *slot = Some(Player::new(id, name, team, client_version, tick));
                info!("player joined id={} name={} team={:?}", id, name, team);
                true
            }
            _ => false,
        }
    }

    /// Free slot `id`, killing its character.
    pub fn remove_player(&mut self, id: ClientId) -> Option<Player> {
        self.with_character(id, |world, chr| chr.die(world, Some(id), WEAPON_GAME));
        self.core.clear(id);
        let player = self.players.get_mut(id)?.take();
        if player.is_some() {
            info!("player left id={}", id);
        }
        player
    }

    /// Move a player to another team. Joining the spectators kills the
    /// character.
    pub fn set_team(&mut self, id: ClientId, team: Team) {
        if team == Team::Spectators {
            self.with_character(id, |world, chr| chr.die(world, Some(id), WEAPON_GAME));
        }
        let tick = self.tick;
        if let Some(player) = self.player_mut(id) {
            player.team = team;
            player.spawning = false;
            player.die_tick = tick;
            player.respawn_tick = tick;
        }
    }

    /// Player in slot `id`.
    pub fn player(&self, id: ClientId) -> Option<&Player> {
        self.players.get(id)?.as_ref()
    }

    /// Mutable player in slot `id`.
    pub fn player_mut(&mut self, id: ClientId) -> Option<&mut Player> {
        self.players.get_mut(id)?.as_mut()
    }

    /// Occupied slots in slot order.
    pub fn players(&self) -> impl Iterator<Item = &Player> + '_ {
        self.players.iter().flatten()
    }

    /// Players that are not spectating.
    pub fn ingame_players(&self) -> usize {
        self.players().filter(|p| !p.is_spectator()).count()
    }

    /// Spectators currently watching `id`.
    pub fn spectators_of(&self, id: ClientId) -> ClientMask {
        self.players()
            .filter(|p| p.is_spectator() && p.spectating == Some(id))
            .fold(0, |mask, p| mask | mask_one(p.id))
    }

    // =========================================================================
    // CHARACTERS
    // =========================================================================

    /// Character of slot `id`, unless it is taken out.
    pub fn character(&self, id: ClientId) -> Option<&Character> {
        self.player(id)?.character.as_ref()
    }

    /// Mutable character of slot `id`, unless it is taken out.
    pub fn character_mut(&mut self, id: ClientId) -> Option<&mut Character> {
        self.player_mut(id)?.character.as_mut()
    }

    /// Run `f` with the character of slot `id` taken out of the world.
    /// Returns `None` if there is no such character.
    pub fn with_character<R>(
        &mut self,
        id: ClientId,
        f: impl FnOnce(&mut World, &mut Character) -> R,
    ) -> Option<R> {
        let mut chr = self.player_mut(id)?.character.take()?;
        let result = f(self, &mut chr);
        if let Some(player) = self.player_mut(id) {
            if player.character.is_none() {
                player.character = Some(chr);
            }
        }
        Some(result)
    }

    /// Position of a live character as of the last view refresh.
    pub fn character_pos(&self, id: ClientId) -> Option<FixedVec2> {
        self.core.get(id).map(|view| view.pos)
    }

    /// Live characters whose body overlaps a circle, in slot order.
    pub fn find_characters(&self, pos: FixedVec2, radius: i32) -> Vec<ClientId> {
        self.core
            .iter()
            .filter(|(_, view)| view.pos.distance(pos) < radius + PHYS_SIZE)
            .map(|(id, _)| id)
            .collect()
    }

    /// The live character closest to `from` whose body is within `radius`
    /// of the segment `from`..`to`, with the closest point on the segment.
    pub fn intersect_character(
        &self,
        from: FixedVec2,
        to: FixedVec2,
        radius: i32,
        exclude: Option<ClientId>,
    ) -> Option<(ClientId, FixedVec2)> {
        let mut closest: Option<(ClientId, FixedVec2)> = None;
        let mut closest_len = i32::MAX;

        for (id, view) in self.core.iter() {
            if Some(id) == exclude {
                continue;
            }
            let point = from.closest_point_on_segment(to, view.pos);
            if view.pos.distance(point) < PHYS_SIZE + radius {
                let len = from.distance(point);
                if len < closest_len {
                    closest = Some((id, point));
                    closest_len = len;
                }
            }
        }
        closest
    }

    /// Hit another character. Returns false if it is unavailable or the hit
    /// did not count.
    pub fn damage_character(
        &mut self,
        target: ClientId,
        force: FixedVec2,
        source: FixedVec2,
        dmg: i32,
        from: ClientId,
        weapon: WeaponKind,
    ) -> bool {
        self.with_character(target, |world, chr| {
            chr.alive && chr.take_damage(world, force, source, dmg, from, weapon)
        })
        .unwrap_or(false)
    }

    /// Ask the game mode how to classify a kill.
    pub fn classify_kill(&self, victim: ClientId, killer: Option<ClientId>, weapon: i32) -> i32 {
        self.mode.on_character_death(victim, killer, weapon, self)
    }

    /// Spawn a character for slot `id` at `pos`.
    pub fn spawn_character(&mut self, id: ClientId, pos: FixedVec2) -> bool {
        match self.player(id) {
            Some(p) if p.character.is_none() && !p.is_spectator() => {}
            _ => return false,
        }

        let chr = Character::spawn(self, id, pos);
        if let Some(player) = self.player_mut(id) {
            player.character = Some(chr);
            player.spawning = false;
            player.view_pos = pos;
        }

        let tick = self.tick;
        self.emit(GameEvent::broadcast(tick, GameEventData::Spawn { pos }));
        self.emit(GameEvent::sound(tick, Sound::PlayerSpawn, pos));
        debug!("spawn player={} pos={}", id, pos);
        true
    }

    /// Spawn at a random free spawn point. Returns false when every point
    /// is occupied.
    pub fn try_respawn(&mut self, id: ClientId) -> bool {
        let free: Vec<FixedVec2> = self
            .map
            .spawn_points()
            .iter()
            .copied()
            .filter(|&point| self.core.iter().all(|(_, view)| view.pos.distance(point) > PHYS_SIZE))
            .collect();

        match self.rng.choose(&free).copied() {
            Some(pos) => self.spawn_character(id, pos),
            None => false,
        }
    }

    /// Ids of every slot holding a character, in slot order.
    pub fn character_ids(&self) -> Vec<ClientId> {
        self.players()
            .filter(|p| p.character.is_some())
            .map(|p| p.id)
            .collect()
    }

    // =========================================================================
    // ENTITIES
    // =========================================================================

    /// Add a projectile. It is first advanced on the next tick.
    pub fn spawn_projectile(&mut self, projectile: Projectile) {
        self.projectiles.push(projectile);
    }

    /// Add a laser.
    pub fn spawn_laser(&mut self, laser: Laser) {
        self.lasers.push(laser);
    }

    /// Live projectiles.
    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }

    /// Live lasers.
    pub fn laser_count(&self) -> usize {
        self.lasers.len()
    }

    // =========================================================================
    // EVENTS
    // =========================================================================

    /// Queue an event.
    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Queue several events.
    pub fn emit_all(&mut self, events: Vec<GameEvent>) {
        self.events.extend(events);
    }

    /// Events queued since the last drain.
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    /// Drain the event queue.
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // TICK STAGES
    // =========================================================================

    /// Queue velocity changes for after phase 1.
    pub fn queue_impulses(&mut self, impulses: Vec<Impulse>) {
        self.impulses.extend(impulses);
    }

    /// Queue one velocity change (knockback) for after the current stage.
    pub fn queue_impulse(&mut self, impulse: Impulse) {
        self.impulses.push(impulse);
    }

    /// Velocity changes not applied yet.
    pub fn pending_impulses(&self) -> &[Impulse] {
        &self.impulses
    }

    /// Apply queued velocity changes to their targets.
    pub(crate) fn apply_impulses(&mut self) {
        for impulse in std::mem::take(&mut self.impulses) {
            if let Some(chr) = self.character_mut(impulse.target) {
                chr.core.vel = chr.core.vel + impulse.delta;
            }
        }
    }

    /// Publish the core of every live character.
    pub(crate) fn refresh_core_views(&mut self) {
        for id in 0..MAX_CLIENTS {
            let view = self
                .character(id)
                .filter(|chr| chr.alive)
                .map(|chr| chr.core.view());
            match view {
                Some(view) => self.core.set(id, view),
                None => self.core.clear(id),
            }
        }
    }

    /// Advance projectiles, then lasers, dropping the finished ones.
    pub(crate) fn tick_entities(&mut self) {
        let mut projectiles = std::mem::take(&mut self.projectiles);
        projectiles.retain_mut(|p| p.tick(self));
        projectiles.append(&mut self.projectiles);
        self.projectiles = projectiles;

        let mut lasers = std::mem::take(&mut self.lasers);
        lasers.retain_mut(|l| l.tick(self));
        lasers.append(&mut self.lasers);
        self.lasers = lasers;
    }

    /// Reap dead characters, respawn, follow the view.
    pub(crate) fn tick_players(&mut self) {
        let tick = self.tick;
        let auto_respawn = self.config.secs_to_ticks(self.config.auto_respawn_secs).max(0) as u32;

        for id in 0..MAX_CLIENTS {
            let Some(player) = self.player_mut(id) else {
                continue;
            };

            if player.character.is_none() && !player.is_spectator() && player.die_tick + auto_respawn <= tick {
                player.spawning = true;
            }

            match player.character.as_ref().map(|chr| (chr.alive, chr.pos)) {
                Some((true, pos)) => player.view_pos = pos,
                Some((false, _)) => player.character = None,
                None => {
                    if player.spawning && player.respawn_tick <= tick {
                        self.try_respawn(id);
                    }
                }
            }
        }

        // Spectators follow their target
        for id in 0..MAX_CLIENTS {
            let target = self
                .player(id)
                .filter(|p| p.is_spectator())
                .and_then(|p| p.spectating)
                .and_then(|t| self.character_pos(t));
            if let (Some(pos), Some(player)) = (target, self.player_mut(id)) {
                player.view_pos = pos;
            }
        }
    }

    /// Shift every tick stamp while paused.
    pub(crate) fn tick_paused(&mut self) {
        for player in self.players.iter_mut().flatten() {
            player.die_tick += 1;
            player.respawn_tick += 1;
            player.last_action_tick += 1;
            if let Some(chr) = player.character.as_mut() {
                chr.tick_paused();
            }
        }
        for projectile in &mut self.projectiles {
            projectile.start_tick += 1;
        }
        for laser in &mut self.lasers {
            laser.eval_tick += 1;
        }
    }

    // =========================================================================
    // INPUT
    // =========================================================================

    /// Input that arrived ahead of the physics step it applies to.
    pub fn on_predicted_input(&mut self, id: ClientId, input: &PlayerInput) {
        let tick = self.tick;
        let Some(player) = self.player(id) else {
            return;
        };
        // Chat still open
        if player.player_flags & PLAYERFLAG_CHATTING != 0 && input.is_chatting() {
            return;
        }
        if let Some(chr) = self.character_mut(id) {
            chr.on_predicted_input(input, tick);
        }
    }

    /// Input applied right away: weapon switching and firing.
    pub fn on_direct_input(&mut self, id: ClientId, input: &PlayerInput) {
        let paused = self.paused;
        let tick = self.tick;
        let Some(player) = self.player_mut(id) else {
            return;
        };

        if paused {
            player.player_flags = input.player_flags;
            return;
        }

        if input.is_chatting() {
            if player.player_flags & PLAYERFLAG_CHATTING != 0 {
                return;
            }
            player.player_flags = input.player_flags;
            if let Some(chr) = player.character.as_mut() {
                chr.reset_input();
            }
            return;
        }

        player.player_flags = input.player_flags;
        let has_character = self.with_character(id, |world, chr| chr.on_direct_input(input, world)).is_some();

        let Some(player) = self.player_mut(id) else {
            return;
        };
        if !has_character && !player.is_spectator() && input.fire_held() {
            player.spawning = true;
        }

        let target = (input.target_x, input.target_y);
        let may_act = has_character || player.is_spectator();
        let active = input.direction != 0
            || input.jump != 0
            || input.hook != 0
            || input.fire_held()
            || target != player.latest_activity;
        if may_act && active {
            player.latest_activity = target;
            player.last_action_tick = tick;
        }
    }

    // =========================================================================
    // SNAPSHOTS
    // =========================================================================

    /// Snapshots of every visible character for `observer`.
    pub fn snapshots_for(&self, observer: Option<ClientId>) -> Vec<CharacterSnapshot> {
        self.players()
            .filter_map(|p| p.character.as_ref())
            .filter(|chr| chr.alive)
            .filter_map(|chr| chr.snap(observer, self))
            .collect()
    }

    /// End the snapshot cycle.
    pub fn post_snap(&mut self) {
        let tick = self.tick;
        for chr in self.players.iter_mut().flatten().filter_map(|p| p.character.as_mut()) {
            chr.post_snap(tick);
        }
    }

    // =========================================================================
    // HASHING
    // =========================================================================

    /// Hash of everything that must match between two runs fed the same
    /// inputs.
    pub fn compute_hash(&self) -> StateHash {
        compute_state_hash(self.tick, self.rng_seed, |h| {
            let [s0, s1] = self.rng.state();
            h.update_u64(s0);
            h.update_u64(s1);

            for player in self.players() {
                h.update_u32(player.id as u32);
                h.update_i32(player.team.to_wire());
                h.update_i32(player.stats.score);
                h.update_u32(player.stats.kills);
                h.update_u32(player.stats.deaths);
                h.update_u32(player.stats.spree);

                let Some(chr) = player.character.as_ref() else {
                    h.update_bool(false);
                    continue;
                };
                h.update_bool(chr.alive);
                let core = chr.core.write();
                for value in [
                    core.x, core.y, core.vel_x, core.vel_y, core.angle, core.direction,
                    core.jumped, core.hooked_player, core.hook_state, core.hook_tick,
                    core.hook_x, core.hook_y, core.hook_dx, core.hook_dy,
                ] {
                    h.update_i32(value);
                }
                h.update_i32(chr.health);
                h.update_i32(chr.armor);
                h.update_i32(chr.freeze.time);
                h.update_i32(chr.weapons.active.code());
                for slot in &chr.weapons.slots {
                    h.update_bool(slot.got);
                    h.update_i32(slot.ammo);
                }
            }

            h.update_u32(self.projectiles.len() as u32);
            for projectile in &self.projectiles {
                h.update_vec2(projectile.pos);
                h.update_u32(projectile.start_tick);
            }
            h.update_u32(self.lasers.len() as u32);
            for laser in &self.lasers {
                h.update_vec2(laser.pos);
                h.update_fixed(laser.energy);
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
