//! Authoritative Simulation Tick
//!
//! The world loop. Every stage runs in slot order so two servers fed the
//! same inputs stay hash-identical.

use crate::config::GameConfig;
use crate::core::hash::StateHash;
use crate::game::events::GameEvent;
use crate::game::input::PlayerInput;
use crate::game::map::TileMap;
use crate::game::player::{ClientId, Team};
use crate::game::reckoning::ResyncCause;
use crate::game::world::World;

/// Client version assumed for replayed players.
const REPLAY_CLIENT_VERSION: i32 = 0x0705;

/// Result of a tick.
#[derive(Debug, Default)]
pub struct TickResult {
    /// Events generated this tick
    pub events: Vec<GameEvent>,
    /// Characters whose clients were sent a fresh core
    pub resyncs: Vec<(ClientId, ResyncCause)>,
}

/// Run one simulation tick.
///
/// # Order
///
/// 1. Projectiles, then lasers, then their knockback. Entities fired
///    during tick `T` first move at `T + 1`.
/// 2. Phase 1 for every character alive at tick start, then the queued
///    hook, collision and knockback impulses.
/// 3. Phase 2 for every character still alive.
/// 4. Players: reap, respawn, follow the view.
///
/// Each phase sees the core views as they were when the phase began.
///
/// While paused the tick counter still advances but only the tick stamps
/// move with it.
pub fn tick(world: &mut World) -> TickResult {
    let mut result = TickResult::default();

    // 0. Advance tick counter
    world.tick += 1;

    if world.paused {
        world.tick_paused();
        result.events = world.take_events();
        return result;
    }

    // 1. Entities
    world.refresh_core_views();
    world.tick_entities();
    world.apply_impulses();

    // 2. Phase 1
    world.refresh_core_views();
    let ids = world.character_ids();
    for &id in &ids {
        world.with_character(id, |world, chr| {
            if chr.alive {
                chr.tick(world);
            }
        });
    }
    world.apply_impulses();

    // 3. Phase 2
    world.refresh_core_views();
    for &id in &ids {
        let cause = world.with_character(id, |world, chr| {
            if chr.alive {
                chr.tick_defered(world)
            } else {
                None
            }
        });
        if let Some(Some(cause)) = cause {
            result.resyncs.push((id, cause));
        }
    }

    // 4. Players
    world.tick_players();

    result.events = world.take_events();
    result
}

/// Feed one tick's worth of input: direct first, then predicted.
pub fn apply_inputs(world: &mut World, inputs: &[(ClientId, PlayerInput)]) {
    for (id, input) in inputs {
        world.on_direct_input(*id, input);
    }
    for (id, input) in inputs {
        world.on_predicted_input(*id, input);
    }
}

/// Replay a recorded session.
///
/// Every roster entry joins the red team and spawns on the first tick.
/// Returns the final state hash and all events.
pub fn replay(
    config: GameConfig,
    map: TileMap,
    roster: &[(ClientId, &str)],
    inputs: &[Vec<(ClientId, PlayerInput)>],
) -> (StateHash, Vec<GameEvent>) {
    let mut world = World::new(config, map);
    for &(id, name) in roster {
        world.add_player(id, name, Team::Red, REPLAY_CLIENT_VERSION);
        if let Some(player) = world.player_mut(id) {
            player.spawning = true;
        }
    }

    let mut all_events = Vec::new();
    for frame in inputs {
        apply_inputs(&mut world, frame);
        let result = tick(&mut world);
        all_events.extend(result.events);
    }

    (world.compute_hash(), all_events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::px;
    use crate::core::vec2::FixedVec2;
    use crate::game::character::Character;
    use crate::game::damage::WEAPON_WORLD;
    use crate::game::events::GameEventData;
    use crate::game::map::tile_centre;
    use crate::game::weapon::WeaponKind;

    fn scripted_inputs(ticks: u32) -> Vec<Vec<(ClientId, PlayerInput)>> {
        (0..ticks)
            .map(|t| {
                (0..4)
                    .map(|id| {
                        let input = PlayerInput {
                            direction: [-1, 0, 1][((t / 20 + id as u32) % 3) as usize],
                            jump: ((t + id as u32) % 37 == 0) as i32,
                            hook: ((t / 15 + id as u32) % 4 == 0) as i32,
                            fire: (t / 10) as i32 & 0x3f,
                            target_x: 100 - id as i32 * 50,
                            target_y: -30,
                            ..Default::default()
                        };
                        (id, input)
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_tick_determinism() {
        let roster = [(0, "a"), (1, "b"), (2, "c"), (3, "d")];
        let inputs = scripted_inputs(300);

        let (hash1, events1) = replay(GameConfig::default(), TileMap::arena(), &roster, &inputs);
        let (hash2, events2) = replay(GameConfig::default(), TileMap::arena(), &roster, &inputs);

        assert_eq!(hash1, hash2);
        assert_eq!(events1, events2);
    }

    #[test]
    fn test_players_spawn_on_first_tick() {
        let mut world = World::new(GameConfig::default(), TileMap::arena());
        world.add_player(0, "a", Team::Red, 0x0705);
        world.on_direct_input(0, &PlayerInput { fire: 1, ..Default::default() });

        let result = tick(&mut world);
        assert!(world.character(0).is_some());
        assert!(result
            .events
            .iter()
            .any(|e| matches!(e.data, GameEventData::Spawn { .. })));
    }

    #[test]
    fn test_dead_reckoning_resyncs_only_on_change() {
        let mut world = World::new(GameConfig::default(), TileMap::arena());
        world.add_player(0, "a", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(5, 4));

        // First broadcast
        assert_eq!(tick(&mut world).resyncs, vec![(0, ResyncCause::Initial)]);

        // Falling and landing without input is predictable
        for _ in 0..60 {
            assert!(tick(&mut world).resyncs.is_empty());
        }

        // Starting to walk is not
        let walk = PlayerInput { direction: 1, ..Default::default() };
        world.on_predicted_input(0, &walk);
        assert_eq!(tick(&mut world).resyncs, vec![(0, ResyncCause::Diverged)]);
    }

    #[test]
    fn test_dead_reckoning_refreshes_stale_core() {
        let mut world = World::new(GameConfig::default(), TileMap::arena());
        world.add_player(0, "a", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(5, 4));

        let stale = world.config.secs_to_ticks(world.config.reckoning_stale_secs) as u32;
        let mut stale_at = None;
        for _ in 0..stale + 10 {
            let result = tick(&mut world);
            if result.resyncs.contains(&(0, ResyncCause::Stale)) {
                stale_at = Some(world.tick);
                break;
            }
        }
        assert_eq!(stale_at, Some(1 + stale + 1));
    }

    #[test]
    fn test_paused_tick_shifts_stamps() {
        let mut world = World::new(GameConfig::default(), TileMap::arena());
        world.add_player(0, "a", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(5, 4));
        tick(&mut world);
        let before = world.character(0).unwrap().clone();

        world.paused = true;
        let result = tick(&mut world);
        assert!(result.resyncs.is_empty());

        let after = world.character(0).unwrap();
        assert_eq!(after.pos, before.pos);
        assert_eq!(after.weapons.attack_tick, before.weapons.attack_tick + 1);
        assert_eq!(after.reckoning.tick, before.reckoning.tick.map(|t| t + 1));
    }

    #[test]
    fn test_spike_sacrifice_through_full_tick() {
        let map = TileMap::from_ascii(
            "pit",
            "\
##########
#........#
#........#
#...G....#
##########",
        )
        .unwrap();
        let mut world = World::new(GameConfig::default(), map);
        world.add_player(0, "victim", Team::Red, 0x0705);
        world.add_player(1, "hunter", Team::Blue, 0x0705);
        world.spawn_character(0, tile_centre(4, 3));
        world.spawn_character(1, tile_centre(1, 1));
        {
            let victim = world.character_mut(0).unwrap();
            victim.freeze(3, 0, 50);
            victim.last_toucher = Some(1);
        }

        let result = tick(&mut world);

        let hunter = world.player(1).unwrap();
        assert_eq!(hunter.stats.score, 8);
        assert_eq!(hunter.stats.spike_gold, 1);
        assert_eq!(hunter.stats.kills, 1);
        assert!(world.character(0).is_none());
        assert!(result.events.iter().any(|e| matches!(
            e.data,
            GameEventData::KillMessage { killer: Some(1), victim: 0, weapon, .. }
                if weapon == WeaponKind::Ninja.code()
        )));
    }

    #[test]
    fn test_unfrozen_spike_death_is_world_kill() {
        let map = TileMap::from_ascii(
            "pit",
            "\
######
#....#
#.^..#
######",
        )
        .unwrap();
        let mut world = World::new(GameConfig::default(), map);
        world.add_player(0, "victim", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(2, 2));
        world.character_mut(0).unwrap().last_toucher = Some(0);

        let result = tick(&mut world);
        assert!(result.events.iter().any(|e| matches!(
            e.data,
            GameEventData::KillMessage { victim: 0, weapon: WEAPON_WORLD, .. }
        )));
        assert_eq!(world.player(0).unwrap().stats.score, 0);
    }

    #[test]
    fn test_auto_respawn_after_death() {
        let mut world = World::new(GameConfig::default(), TileMap::arena());
        world.add_player(0, "a", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(5, 4));
        world.with_character(0, |world, chr| chr.die(world, Some(0), WEAPON_WORLD));

        let wait = world.config.secs_to_ticks(world.config.auto_respawn_secs) as u32;
        for _ in 0..wait - 1 {
            tick(&mut world);
            assert!(world.character(0).is_none());
        }
        tick(&mut world);
        assert!(world.character(0).is_some());
    }

    /// One tick where `attacker` hammers `victim` standing to its right.
    fn hammered(attacker: ClientId, victim: ClientId) -> Character {
        let mut world = World::new(GameConfig::default(), TileMap::empty("hammer", 40, 20));
        world.add_player(attacker, "attacker", Team::Red, 0x0705);
        world.add_player(victim, "victim", Team::Blue, 0x0705);
        let origin = tile_centre(10, 10);
        world.spawn_character(attacker, origin);
        world.spawn_character(victim, origin + FixedVec2::new(px(40), 0));
        {
            let chr = world.character_mut(attacker).unwrap();
            chr.weapons.active = WeaponKind::Hammer;
            chr.latest_input = PlayerInput { fire: 1, target_x: 40, ..Default::default() };
        }

        tick(&mut world);
        world.character(victim).unwrap().clone()
    }

    #[test]
    fn test_knockback_independent_of_slot_order() {
        let first = hammered(0, 1);
        let second = hammered(1, 0);

        assert_eq!(first.last_toucher, Some(0));
        assert_eq!(second.last_toucher, Some(1));
        assert!(first.core.vel.x > 0);
        assert!(first.core.vel.y < 0);
        assert_eq!(first.core.vel, second.core.vel);
        assert_eq!(first.pos, second.pos);
    }
}
