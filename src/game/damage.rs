//! Damage and Death
//!
//! Knockback, freeze-on-hit, kill attribution including spike sacrifices,
//! and the kill feed.

use tracing::debug;

use crate::core::vec2::FixedVec2;
use crate::game::character::Character;
use crate::game::collision::Tile;
use crate::game::events::{Emote, GameEvent, GameEventData, Sound, mask_one};
use crate::game::physics::Impulse;
use crate::game::player::ClientId;
use crate::game::tuning::ms_to_ticks;
use crate::game::weapon::{WeaponKind, hammer_push};
use crate::game::world::World;

// =============================================================================
// KILL CODES
// =============================================================================

/// Killed by a game-mode decision.
pub const WEAPON_GAME: i32 = -3;
/// Self kill.
pub const WEAPON_SELF: i32 = -2;
/// Killed by the world (death tiles, leaving the map, failed sacrifice).
pub const WEAPON_WORLD: i32 = -1;

/// Hazard code of a spike tile: its tile index, negated.
#[inline]
pub fn spike_code(tile: Tile) -> i32 {
    -tile.index()
}

/// Normal spike code.
pub const WEAPON_SPIKE_NORMAL: i32 = -(Tile::SpikeNormal as i32);
/// Gold spike code.
pub const WEAPON_SPIKE_GOLD: i32 = -(Tile::SpikeGold as i32);
/// Green spike code.
pub const WEAPON_SPIKE_GREEN: i32 = -(Tile::SpikeGreen as i32);
/// Purple spike code.
pub const WEAPON_SPIKE_PURPLE: i32 = -(Tile::SpikePurple as i32);

/// Whether `code` is one of the spike hazard codes.
pub fn is_spike_code(code: i32) -> bool {
    matches!(
        code,
        WEAPON_SPIKE_NORMAL | WEAPON_SPIKE_GOLD | WEAPON_SPIKE_GREEN | WEAPON_SPIKE_PURPLE
    )
}

/// Base sacrifice score.
const SACRIFICE_SCORE: i32 = 3;

/// Extra score per spike colour.
fn spike_bonus(code: i32) -> i32 {
    match code {
        WEAPON_SPIKE_GOLD => 5,
        WEAPON_SPIKE_GREEN => 3,
        WEAPON_SPIKE_PURPLE => 7,
        _ => 0,
    }
}

// =============================================================================
// KILL FEED
// =============================================================================

/// Send a kill line to every player. Clients too old to understand an
/// unattributed kill get it as a world kill by slot 0.
pub fn broadcast_kill(
    world: &mut World,
    killer: Option<ClientId>,
    victim: ClientId,
    weapon: i32,
    mode_special: i32,
) {
    let tick = world.tick;
    let min_version = world.config.min_killmessage_client_version;
    let recipients: Vec<(ClientId, i32)> = world
        .players()
        .map(|p| (p.id, p.client_version))
        .collect();

    for (id, version) in recipients {
        let (killer, weapon) = if killer.is_none() && version < min_version {
            (Some(0), WEAPON_WORLD)
        } else {
            (killer, weapon)
        };
        world.emit(GameEvent {
            tick,
            mask: mask_one(id),
            data: GameEventData::KillMessage { killer, victim, weapon, mode_special },
        });
    }
}

impl Character {
    /// Apply a hit. Knockback always lands; returns whether the hit counted.
    ///
    /// Laser and grenade hits freeze the target instead of hurting it.
    pub fn take_damage(
        &mut self,
        world: &mut World,
        force: FixedVec2,
        _source: FixedVec2,
        dmg: i32,
        from: ClientId,
        weapon: WeaponKind,
    ) -> bool {
        let tick = world.tick;
        let mut force = force;

        // Configurable hammer knockback
        if weapon == WeaponKind::Hammer {
            let attacker = world
                .player(from)
                .filter(|p| !p.vanilla_hammer)
                .map(|p| p.team);
            if let (Some(attacker_team), Some(attacker_pos)) = (attacker, world.character_pos(from)) {
                let dir = if (self.pos - attacker_pos).length() > 0 {
                    (self.pos - attacker_pos).normalize()
                } else {
                    FixedVec2::UP
                };
                let push = hammer_push(dir);
                let same_team = world
                    .player(self.id)
                    .map_or(false, |p| p.team == attacker_team);
                let cfg = &world.config;
                let (sx, sy) = if cfg.teamplay && same_team && self.freeze.is_frozen() {
                    (cfg.melt_hammer_scale_x, cfg.melt_hammer_scale_y)
                } else {
                    (cfg.hammer_scale_x, cfg.hammer_scale_y)
                };
                force = FixedVec2::new(push.x * sx / 100, push.y * sy / 100);
            }
        }

        // Lands after phase 1 with the other cross-character pushes
        world.queue_impulse(Impulse { target: self.id, delta: force });

        if from == self.id || dmg < world.config.hit_box_dmg {
            return false;
        }

        self.last_toucher = Some(from);
        if self.freeze.is_frozen() {
            return false;
        }

        if matches!(weapon, WeaponKind::Laser | WeaponKind::Grenade) {
            if let Some(killer) = world.player_mut(from) {
                killer.stats.score += 1;
                killer.add_freezes();
            }
            if let Some(victim) = world.player_mut(self.id) {
                victim.add_frozen();
            }
            self.freeze(world.config.freeze_delay, tick, world.config.tick_speed);
            broadcast_kill(world, Some(from), self.id, weapon.code(), 0);
        }

        // Hit confirmation to the attacker and whoever watches them
        if weapon != WeaponKind::Hammer {
            if let Some(attacker) = world.player(from) {
                let mask = mask_one(from) | world.spectators_of(from);
                let pos = attacker.view_pos;
                world.emit(GameEvent::sound_masked(tick, Sound::Hit, pos, mask));
            }
        }

        if dmg > 2 {
            world.emit(GameEvent::sound(tick, Sound::PainLong, self.pos));
        } else if dmg > 0 {
            world.emit(GameEvent::sound(tick, Sound::PainShort, self.pos));
        }

        self.set_emote(Emote::Pain, tick + ms_to_ticks(500, world.config.tick_speed) as u32);
        true
    }

    /// Spike sacrifice: credit the last toucher of a frozen victim. Rewrites
    /// `killer` and `weapon` in place.
    pub fn spike_sacrifice(&mut self, world: &mut World, killer: &mut Option<ClientId>, weapon: &mut i32) {
        if !is_spike_code(*weapon) {
            return;
        }

        let Some(toucher) = self.last_toucher.filter(|_| self.freeze.is_frozen()) else {
            *weapon = WEAPON_WORLD;
            return;
        };

        let tick = world.tick;
        let tick_speed = world.config.tick_speed.max(0) as u32;
        let enough_players = world.config.spree_players <= world.ingame_players() as i32;
        let killer_name = world.player(toucher).map(|p| p.name.clone());

        let mut events = Vec::new();
        if let Some(victim) = world.player_mut(self.id) {
            victim.add_deaths();
            if enough_players {
                victim.handle_spree_death(killer_name.as_deref().unwrap_or("(invalid)"), tick, &mut events);
            }
        }
        *killer = Some(toucher);

        let Some(credited) = world.player_mut(toucher) else {
            world.emit_all(events);
            *killer = None;
            *weapon = WEAPON_WORLD;
            return;
        };

        if enough_players {
            credited.handle_spree_kill(tick, &mut events);
        } else {
            credited.invalid_sprees += 1;
            if credited.invalid_sprees % 5 == 0 {
                events.push(GameEvent::chat_to(tick, toucher, "Not enough players online to start a spree."));
            }
        }

        credited.add_kills(tick, tick_speed, &mut events);
        credited.stats.score += SACRIFICE_SCORE + spike_bonus(*weapon);
        match *weapon {
            WEAPON_SPIKE_GOLD => credited.stats.spike_gold += 1,
            WEAPON_SPIKE_GREEN => credited.stats.spike_green += 1,
            WEAPON_SPIKE_PURPLE => credited.stats.spike_purple += 1,
            _ => credited.stats.spike_normal += 1,
        }

        world.emit_all(events);
        *weapon = WeaponKind::Ninja.code();
    }

    /// Kill this character.
    pub fn die(&mut self, world: &mut World, killer: Option<ClientId>, weapon: i32) {
        if !self.alive {
            return;
        }

        let mut killer = killer;
        let mut weapon = weapon;
        self.spike_sacrifice(world, &mut killer, &mut weapon);

        let tick = world.tick;
        self.alive = false;
        let respawn_delay = ms_to_ticks(world.config.respawn_delay_ms, world.config.tick_speed) as u32;
        if let Some(player) = world.player_mut(self.id) {
            player.respawn_tick = tick + respawn_delay;
        }

        let mode_special = world.classify_kill(self.id, killer, weapon);

        debug!(
            "kill killer={:?} victim={} weapon={} special={}",
            killer, self.id, weapon, mode_special
        );

        broadcast_kill(world, killer, self.id, weapon, mode_special);
        world.emit(GameEvent::sound(tick, Sound::PlayerDie, self.pos));

        if let Some(player) = world.player_mut(self.id) {
            player.die_tick = tick;
        }

        world.core.clear(self.id);
        world.emit(GameEvent::broadcast(tick, GameEventData::Death { pos: self.pos, victim: self.id }));
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::events::GameEventData;
    use crate::game::map::{TileMap, tile_centre};
    use crate::game::player::Team;

    fn world_with(players: usize) -> World {
        let mut world = World::new(GameConfig::default(), TileMap::empty("damage", 30, 20));
        for i in 0..players {
            world.add_player(i, &format!("p{}", i), Team::Red, 0x0705);
        }
        world
    }

    fn kill_lines(world: &World) -> Vec<(Option<ClientId>, ClientId, i32)> {
        world
            .events()
            .iter()
            .filter_map(|e| match e.data {
                GameEventData::KillMessage { killer, victim, weapon, .. } if e.is_for(0) => {
                    Some((killer, victim, weapon))
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_spike_codes() {
        assert!(is_spike_code(spike_code(Tile::SpikeGold)));
        assert!(!is_spike_code(WEAPON_WORLD));
        assert!(!is_spike_code(WeaponKind::Laser.code()));
    }

    #[test]
    fn test_knockback_applies_even_to_self_damage() {
        let mut world = world_with(1);
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        let force = FixedVec2::new(1000, -2000);
        assert!(!chr.take_damage(&mut world, force, FixedVec2::ZERO, 5, 0, WeaponKind::Grenade));
        assert_eq!(chr.core.vel, FixedVec2::ZERO);
        assert_eq!(world.pending_impulses(), &[Impulse { target: 0, delta: force }][..]);
        assert!(!chr.freeze.is_frozen());
    }

    #[test]
    fn test_laser_hit_freezes_and_credits() {
        let mut world = world_with(2);
        let mut chr = Character::new(1, tile_centre(5, 5), &world);
        chr.give_weapon(WeaponKind::Laser, -1, &world);

        assert!(chr.take_damage(&mut world, FixedVec2::ZERO, FixedVec2::ZERO, 5, 0, WeaponKind::Laser));
        assert!(chr.freeze.is_frozen());
        assert_eq!(chr.last_toucher, Some(0));
        assert_eq!(world.player(0).unwrap().stats.score, 1);
        assert_eq!(world.player(0).unwrap().stats.freezes, 1);
        assert_eq!(world.player(1).unwrap().stats.frozen, 1);
        assert_eq!(kill_lines(&world), vec![(Some(0), 1, WeaponKind::Laser.code())]);

        // Frozen: records the toucher but nothing else
        let score = world.player(0).unwrap().stats.score;
        assert!(!chr.take_damage(&mut world, FixedVec2::ZERO, FixedVec2::ZERO, 5, 0, WeaponKind::Laser));
        assert_eq!(world.player(0).unwrap().stats.score, score);
    }

    #[test]
    fn test_spike_without_toucher_is_world_kill() {
        let mut world = world_with(1);
        let mut chr = Character::new(0, tile_centre(5, 5), &world);
        chr.die(&mut world, Some(0), WEAPON_SPIKE_GOLD);
        assert!(!chr.alive);
        assert_eq!(kill_lines(&world), vec![(Some(0), 0, WEAPON_WORLD)]);
        assert_eq!(world.player(0).unwrap().stats.deaths, 0);
    }

    #[test]
    fn test_sacrifice_credits_last_toucher_with_spree() {
        let mut world = world_with(4);
        world.player_mut(2).unwrap().stats.spree = 4;

        let mut victim = Character::new(1, tile_centre(5, 5), &world);
        victim.freeze(10, world.tick, 50);
        victim.last_toucher = Some(2);
        victim.die(&mut world, Some(1), WEAPON_SPIKE_GOLD);

        let killer = world.player(2).unwrap();
        assert_eq!(killer.stats.score, 8);
        assert_eq!(killer.stats.spike_gold, 1);
        assert_eq!(killer.stats.kills, 1);
        assert_eq!(killer.stats.spree, 5);
        assert_eq!(world.player(1).unwrap().stats.deaths, 1);
        assert_eq!(kill_lines(&world), vec![(Some(2), 1, WeaponKind::Ninja.code())]);

        let chats: Vec<_> = world
            .events()
            .iter()
            .filter_map(|e| match &e.data {
                GameEventData::Chat { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert!(chats.contains(&"'p2' is on a spree of 5 kills!"));
    }

    #[test]
    fn test_sacrifice_below_player_threshold_withholds_spree() {
        let mut world = world_with(2);
        let mut victim = Character::new(1, tile_centre(5, 5), &world);
        victim.freeze(10, world.tick, 50);
        victim.last_toucher = Some(0);
        world.player_mut(0).unwrap().invalid_sprees = 4;

        victim.die(&mut world, Some(1), WEAPON_SPIKE_PURPLE);

        let killer = world.player(0).unwrap();
        assert_eq!(killer.stats.spree, 0);
        assert_eq!(killer.stats.score, 10);
        assert_eq!(killer.stats.kills, 1);
        let warned = world.events().iter().any(|e| {
            e.is_for(0) && !e.is_for(1)
                && matches!(&e.data, GameEventData::Chat { text } if text.starts_with("Not enough players"))
        });
        assert!(warned);
    }

    #[test]
    fn test_old_clients_get_world_attribution() {
        let mut world = world_with(1);
        world.add_player(1, "old", Team::Red, 0x0703);
        broadcast_kill(&mut world, None, 0, WEAPON_SPIKE_NORMAL, 0);

        let to_old = world.events().iter().find(|e| e.is_for(1)).unwrap();
        assert!(matches!(
            to_old.data,
            GameEventData::KillMessage { killer: Some(0), weapon: WEAPON_WORLD, .. }
        ));
        assert_eq!(kill_lines(&world), vec![(None, 0, WEAPON_SPIKE_NORMAL)]);
    }
}
