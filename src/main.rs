//! Solofng Game Server
//!
//! Demo driver: a few bots play on the built-in arena at the configured
//! tick rate, then the recorded inputs are replayed to check determinism.

use std::time::Duration;

use anyhow::{bail, Context};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use solofng::{
    VERSION,
    config::GameConfig,
    core::fixed::quantize_px,
    core::rng::DeterministicRng,
    game::{
        events::GameEventData,
        input::PlayerInput,
        map::TileMap,
        player::{ClientId, Team},
        tick::{apply_inputs, replay, tick},
        world::World,
    },
    network::protocol::outbound_for,
};

/// Bots in the demo.
const BOTS: ClientId = 4;

/// Default demo length in ticks.
const DEFAULT_DEMO_TICKS: u32 = 500;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GameConfig::from_env().context("loading SOLOFNG_* configuration")?;
    let ticks = match std::env::var("SOLOFNG_DEMO_TICKS") {
        Ok(raw) => raw.trim().parse().with_context(|| format!("SOLOFNG_DEMO_TICKS={}", raw))?,
        Err(_) => DEFAULT_DEMO_TICKS,
    };

    info!("Solofng Server v{}", VERSION);
    info!("Tick Rate: {} Hz", config.tick_speed);
    info!("Game Type: {:?}", config.game_type);

    demo_match(config, ticks).await
}

/// Bot input for one tick: run back and forth, hop now and then, aim at
/// the next bot and tap fire.
fn bot_input(world: &World, id: ClientId, rng: &mut DeterministicRng, prev: &PlayerInput) -> PlayerInput {
    let t = world.tick;
    let mut input = PlayerInput {
        direction: [-1, 0, 1][((t / 40 + id as u32) % 3) as usize],
        jump: rng.next_percent(3) as i32,
        hook: ((t / 25 + id as u32) % 5 == 0) as i32,
        fire: prev.fire,
        ..Default::default()
    };

    let target = (id + 1) % BOTS;
    if let (Some(me), Some(other)) = (world.character_pos(id), world.character_pos(target)) {
        let d = other - me;
        input.target_x = quantize_px(d.x);
        input.target_y = quantize_px(d.y);
    } else {
        input.target_x = 100;
    }

    // Press or release roughly every other tenth of a second
    if rng.next_percent(20) {
        input.fire = (input.fire + 1) & 0x3f;
    }
    input
}

/// Demo function to exercise the simulation.
async fn demo_match(config: GameConfig, ticks: u32) -> anyhow::Result<()> {
    info!("=== Starting Demo Match ===");

    let map = TileMap::arena();
    let mut world = World::new(config.clone(), map.clone());
    let roster: Vec<(ClientId, String)> = (0..BOTS).map(|id| (id, format!("bot{}", id))).collect();
    for (id, name) in &roster {
        world.add_player(*id, name, Team::Red, 0x0705);
        if let Some(player) = world.player_mut(*id) {
            player.spawning = true;
        }
    }

    let mut rng = DeterministicRng::new(0x5eed);
    let mut recorded: Vec<Vec<(ClientId, PlayerInput)>> = Vec::with_capacity(ticks as usize);
    let mut last_inputs = vec![PlayerInput::default(); BOTS];

    let period = Duration::from_millis(1000 / config.tick_speed.max(1) as u64);
    let mut timer = interval(period);
    timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    let mut total_events = 0;
    let mut resyncs = 0;
    let mut wire_bytes = 0usize;

    info!("Running {} ticks...", ticks);

    for _ in 0..ticks {
        timer.tick().await;

        let frame: Vec<(ClientId, PlayerInput)> = (0..BOTS)
            .map(|id| (id, bot_input(&world, id, &mut rng, &last_inputs[id])))
            .collect();
        for (id, input) in &frame {
            last_inputs[*id] = *input;
        }
        apply_inputs(&mut world, &frame);
        recorded.push(frame);

        let result = tick(&mut world);
        total_events += result.events.len();
        resyncs += result.resyncs.len();

        for id in 0..BOTS {
            for message in outbound_for(&world, &result.events, id) {
                match message.to_bytes() {
                    Ok(bytes) => wire_bytes += bytes.len(),
                    Err(err) => warn!("message encoding failed: {}", err),
                }
            }
        }
        world.post_snap();

        // Log important events
        for event in &result.events {
            match &event.data {
                GameEventData::KillMessage { killer, victim, weapon, .. } if event.is_for(0) => {
                    info!("Kill: {:?} -> {} (weapon {})", killer, victim, weapon);
                }
                GameEventData::Chat { text } if event.is_for(0) => info!("Chat: {}", text),
                _ => {}
            }
        }

        if world.tick % config.tick_speed.max(1) as u32 == 0 {
            debug!("Tick {}: {} events, {} resyncs so far", world.tick, total_events, resyncs);
        }
    }

    // Print final results
    info!("=== Match Results ===");
    for player in world.players() {
        info!(
            "{}: score {} kills {} deaths {} freezes {}",
            player.name, player.stats.score, player.stats.kills, player.stats.deaths, player.stats.freezes
        );
    }
    info!("Total events: {}", total_events);
    info!("Resyncs: {} over {} character-ticks", resyncs, ticks as usize * BOTS);
    info!("Wire bytes: {}", wire_bytes);

    let hash = world.compute_hash();
    info!("Final State Hash: {}", hex::encode(hash));

    // Verify determinism by replaying
    info!("=== Verifying Determinism ===");
    let names: Vec<(ClientId, &str)> = roster.iter().map(|(id, name)| (*id, name.as_str())).collect();
    let (replay_hash, _) = replay(config, map, &names, &recorded);
    info!("Replay State Hash: {}", hex::encode(replay_hash));

    if hash != replay_hash {
        bail!("determinism failure: replay hash differs");
    }
    info!("DETERMINISM VERIFIED: Hashes match!");
    Ok(())
}
