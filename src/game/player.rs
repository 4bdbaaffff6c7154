//! Players and Round Statistics
//!
//! A player is a connected slot. It owns at most one live character and
//! carries the per-round statistics and spree bookkeeping that kill
//! attribution feeds into.

use serde::{Serialize, Deserialize};

use crate::core::vec2::FixedVec2;
use crate::game::character::Character;
use crate::game::events::GameEvent;

/// Player slot index.
pub type ClientId = usize;

/// Number of player slots.
pub const MAX_CLIENTS: usize = 64;

/// Kills between spree announcements.
pub const SPREE_STEP: u32 = 5;

/// Seconds between kills that still count towards a multi-kill.
pub const MULTI_WINDOW_SECS: u32 = 5;

/// Highest multi-kill bucket tracked.
pub const MAX_MULTI_BUCKET: usize = 32;

/// Team membership.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Team {
    /// Red team (or the only team without team play)
    #[default]
    Red,
    /// Blue team
    Blue,
    /// Watching only
    Spectators,
}

impl Team {
    /// Wire code.
    pub fn to_wire(self) -> i32 {
        match self {
            Team::Red => 0,
            Team::Blue => 1,
            Team::Spectators => -1,
        }
    }

    /// Team from its wire code.
    pub fn from_wire(code: i32) -> Option<Self> {
        match code {
            0 => Some(Team::Red),
            1 => Some(Team::Blue),
            -1 => Some(Team::Spectators),
            _ => None,
        }
    }
}

/// Per-round counters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    /// Scoreboard score
    pub score: i32,
    /// Sacrifice kills credited
    pub kills: u32,
    /// Deaths on spikes
    pub deaths: u32,
    /// Normal spike kills
    pub spike_normal: u32,
    /// Gold spike kills
    pub spike_gold: u32,
    /// Green spike kills
    pub spike_green: u32,
    /// Purple spike kills
    pub spike_purple: u32,
    /// Laser shots fired
    pub shots: u32,
    /// Freezes dealt
    pub freezes: u32,
    /// Times frozen
    pub frozen: u32,
    /// Current spree
    pub spree: u32,
    /// Best spree this round
    pub best_spree: u32,
    /// Current multi-kill chain
    pub multi: u32,
    /// Best multi-kill chain
    pub best_multi: u32,
    /// Count of multi-kills by size (index 0 is a double)
    pub multis: Vec<u32>,
    /// Tick of the last credited kill
    pub last_kill_tick: Option<u32>,
}

impl Default for RoundStats {
    fn default() -> Self {
        Self {
            score: 0,
            kills: 0,
            deaths: 0,
            spike_normal: 0,
            spike_gold: 0,
            spike_green: 0,
            spike_purple: 0,
            shots: 0,
            freezes: 0,
            frozen: 0,
            spree: 0,
            best_spree: 0,
            multi: 0,
            best_multi: 0,
            multis: vec![0; MAX_MULTI_BUCKET + 1],
            last_kill_tick: None,
        }
    }
}

/// A connected player slot.
#[derive(Clone, Debug)]
pub struct Player {
    /// Slot
    pub id: ClientId,
    /// Display name
    pub name: String,
    /// Team
    pub team: Team,
    /// Client protocol version
    pub client_version: i32,
    /// Live character, if any
    pub character: Option<Character>,
    /// Round counters
    pub stats: RoundStats,
    /// Slot being watched while spectating
    pub spectating: Option<ClientId>,
    /// Camera position used for network clipping
    pub view_pos: FixedVec2,
    /// Tick of the last death
    pub die_tick: u32,
    /// Earliest tick a respawn may happen
    pub respawn_tick: u32,
    /// Waiting to respawn
    pub spawning: bool,
    /// Last reported client flags
    pub player_flags: i32,
    /// Last tick with any movement or aim activity
    pub last_action_tick: u32,
    /// Sprees refused for lack of players (for message throttling)
    pub invalid_sprees: u32,
    /// Client opted into the classic hammer knockback
    pub vanilla_hammer: bool,
    /// Aim target at the last detected activity
    pub latest_activity: (i32, i32),
}

impl Player {
    /// New player in slot `id`.
    pub fn new(id: ClientId, name: &str, team: Team, client_version: i32, tick: u32) -> Self {
        Self {
            id,
            name: name.to_string(),
            team,
            client_version,
            character: None,
            stats: RoundStats::default(),
            spectating: None,
            view_pos: FixedVec2::ZERO,
            die_tick: tick,
            respawn_tick: tick,
            spawning: false,
            player_flags: 0,
            last_action_tick: tick,
            invalid_sprees: 0,
            vanilla_hammer: false,
            latest_activity: (0, 0),
        }
    }

    /// Whether the player is watching rather than playing.
    #[inline]
    pub fn is_spectator(&self) -> bool {
        self.team == Team::Spectators
    }

    /// Credit a kill and track multi-kills.
    pub fn add_kills(&mut self, tick: u32, tick_speed: u32, events: &mut Vec<GameEvent>) {
        self.stats.kills += 1;
        self.handle_multi(tick, tick_speed, events);
    }

    /// Count a death.
    pub fn add_deaths(&mut self) {
        self.stats.deaths += 1;
    }

    /// Count a laser shot.
    pub fn add_shots(&mut self) {
        self.stats.shots += 1;
    }

    /// Count a freeze dealt.
    pub fn add_freezes(&mut self) {
        self.stats.freezes += 1;
    }

    /// Count being frozen.
    pub fn add_frozen(&mut self) {
        self.stats.frozen += 1;
    }

    fn handle_multi(&mut self, tick: u32, tick_speed: u32, events: &mut Vec<GameEvent>) {
        let window = MULTI_WINDOW_SECS * tick_speed;
        let chained = self
            .stats
            .last_kill_tick
            .map_or(false, |last| tick.saturating_sub(last) <= window);
        self.stats.last_kill_tick = Some(tick);

        if !chained {
            self.stats.multi = 1;
            return;
        }

        self.stats.multi += 1;
        self.stats.best_multi = self.stats.best_multi.max(self.stats.multi);
        let bucket = ((self.stats.multi - 2) as usize).min(MAX_MULTI_BUCKET);
        if let Some(count) = self.stats.multis.get_mut(bucket) {
            *count += 1;
        }
        events.push(GameEvent::chat(tick, format!("'{}' multi x{}!", self.name, self.stats.multi)));
    }

    /// Advance the spree after a credited kill.
    pub fn handle_spree_kill(&mut self, tick: u32, events: &mut Vec<GameEvent>) {
        self.stats.spree += 1;
        if self.stats.spree % SPREE_STEP == 0 {
            events.push(GameEvent::chat(
                tick,
                format!("'{}' is on a spree of {} kills!", self.name, self.stats.spree),
            ));
        }
    }

    /// End the spree on death.
    pub fn handle_spree_death(&mut self, killer_name: &str, tick: u32, events: &mut Vec<GameEvent>) {
        if self.stats.spree >= SPREE_STEP {
            events.push(GameEvent::chat(
                tick,
                format!(
                    "'{}' spree of {} kills ended by '{}'!",
                    self.name, self.stats.spree, killer_name
                ),
            ));
        }
        self.stats.best_spree = self.stats.best_spree.max(self.stats.spree);
        self.stats.spree = 0;
    }
}

// =============================================================================
// TESTS
// =============================================================================
