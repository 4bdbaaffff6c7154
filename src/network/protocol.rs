//! Protocol Messages
//!
//! Wire shapes exchanged with clients. Positions travel as whole pixels and
//! enums as their numeric codes. Messages serialize as JSON for debugging
//! and as bincode for production.

use serde::{Serialize, Deserialize};

use crate::core::fixed::quantize_px;
use crate::core::vec2::FixedVec2;
use crate::game::events::{GameEvent, GameEventData};
use crate::game::input::PlayerInput;
use crate::game::player::{ClientId, Team};
use crate::game::world::World;
use crate::network::snapshot::CharacterSnapshot;

/// Slot code for "nobody" (free-view spectating, unattributed kills,
/// server chat).
pub const NO_CLIENT: i32 = -1;

/// Wire code of an optional slot.
#[inline]
pub fn client_code(id: Option<ClientId>) -> i32 {
    id.map_or(NO_CLIENT, |id| id as i32)
}

/// Slot of a wire code, if it names one.
#[inline]
pub fn client_from_code(code: i32) -> Option<ClientId> {
    usize::try_from(code).ok()
}

// =============================================================================
// CLIENT -> SERVER MESSAGES
// =============================================================================

/// Messages sent from client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientMessage {
    /// Input for the next physics step.
    PredictedInput(PlayerInput),

    /// Input applied on receipt (weapon switch and fire).
    DirectInput(PlayerInput),

    /// Join a team (wire team code).
    SetTeam {
        /// Team code
        team: i32,
    },

    /// Follow a slot while spectating (`NO_CLIENT` for free view).
    Spectate {
        /// Slot code
        target: i32,
    },
}

impl ClientMessage {
    /// Hand the message to the world on behalf of `from`.
    pub fn apply(&self, world: &mut World, from: ClientId) {
        match self {
            ClientMessage::PredictedInput(input) => world.on_predicted_input(from, input),
            ClientMessage::DirectInput(input) => world.on_direct_input(from, input),
            ClientMessage::SetTeam { team } => {
                if let Some(team) = Team::from_wire(*team) {
                    world.set_team(from, team);
                }
            }
            ClientMessage::Spectate { target } => {
                let target = client_from_code(*target);
                if let Some(player) = world.player_mut(from) {
                    player.spectating = target;
                }
            }
        }
    }
}

// =============================================================================
// SERVER -> CLIENT MESSAGES
// =============================================================================

/// Messages sent from server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServerMessage {
    /// Characters visible to the receiver this snapshot.
    Snapshot(SnapshotFrame),

    /// Positional sound.
    Sound {
        /// Sound code
        sound: i32,
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
    },

    /// Damage indicator.
    Damage {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
        /// Number shown
        amount: i32,
    },

    /// Hammer spark.
    HammerHit {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
    },

    /// Explosion visual.
    Explosion {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
    },

    /// Spawn visual.
    Spawn {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
    },

    /// Death visual.
    Death {
        /// Pixel x
        x: i32,
        /// Pixel y
        y: i32,
        /// Victim slot
        client_id: i32,
    },

    /// Kill feed line.
    KillMessage {
        /// Killer slot code
        killer: i32,
        /// Victim slot
        victim: i32,
        /// Weapon or hazard code
        weapon: i32,
        /// Scoreboard classification
        mode_special: i32,
    },

    /// Server chat line.
    Chat {
        /// Always `NO_CLIENT` for server lines
        client_id: i32,
        /// Text
        message: String,
    },
}

/// One snapshot for one receiver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotFrame {
    /// Server tick
    pub tick: u32,
    /// Visible characters
    pub characters: Vec<CharacterSnapshot>,
}

fn pixels(pos: FixedVec2) -> (i32, i32) {
    (quantize_px(pos.x), quantize_px(pos.y))
}

impl ServerMessage {
    /// Wire form of an event payload.
    pub fn from_event(event: &GameEvent) -> Self {
        match &event.data {
            GameEventData::Sound { sound, pos } => {
                let (x, y) = pixels(*pos);
                ServerMessage::Sound { sound: *sound as i32, x, y }
            }
            GameEventData::Damage { pos, amount } => {
                let (x, y) = pixels(*pos);
                ServerMessage::Damage { x, y, amount: *amount }
            }
            GameEventData::HammerHit { pos } => {
                let (x, y) = pixels(*pos);
                ServerMessage::HammerHit { x, y }
            }
            GameEventData::Explosion { pos } => {
                let (x, y) = pixels(*pos);
                ServerMessage::Explosion { x, y }
            }
            GameEventData::Spawn { pos } => {
                let (x, y) = pixels(*pos);
                ServerMessage::Spawn { x, y }
            }
            GameEventData::Death { pos, victim } => {
                let (x, y) = pixels(*pos);
                ServerMessage::Death { x, y, client_id: *victim as i32 }
            }
            GameEventData::KillMessage { killer, victim, weapon, mode_special } => {
                ServerMessage::KillMessage {
                    killer: client_code(*killer),
                    victim: *victim as i32,
                    weapon: *weapon,
                    mode_special: *mode_special,
                }
            }
            GameEventData::Chat { text } => ServerMessage::Chat {
                client_id: NO_CLIENT,
                message: text.clone(),
            },
        }
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Serialize to binary.
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

impl ClientMessage {
    /// Deserialize from JSON string.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }

    /// Deserialize from binary.
    pub fn from_bytes(data: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(data)
    }
}

/// Everything `client` receives for one tick: its events in emission order,
/// then its snapshot.
pub fn outbound_for(world: &World, events: &[GameEvent], client: ClientId) -> Vec<ServerMessage> {
    let mut messages: Vec<ServerMessage> = events
        .iter()
        .filter(|e| e.is_for(client))
        .map(ServerMessage::from_event)
        .collect();

    messages.push(ServerMessage::Snapshot(SnapshotFrame {
        tick: world.tick,
        characters: world.snapshots_for(Some(client)),
    }));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::core::fixed::px;
    use crate::game::events::{Emote, Sound, mask_one};
    use crate::game::map::{TileMap, tile_centre};
    use crate::game::physics::CoreSnapshot;

    #[test]
    fn test_client_codes() {
        assert_eq!(client_code(None), NO_CLIENT);
        assert_eq!(client_code(Some(7)), 7);
        assert_eq!(client_from_code(NO_CLIENT), None);
        assert_eq!(client_from_code(3), Some(3));
    }

    #[test]
    fn test_event_conversion_uses_pixels_and_codes() {
        let event = GameEvent::sound(4, Sound::LaserBounce, FixedVec2::new(px(100), px(-20)));
        assert_eq!(
            ServerMessage::from_event(&event),
            ServerMessage::Sound { sound: 8, x: 100, y: -20 }
        );

        let kill = GameEvent::broadcast(
            4,
            GameEventData::KillMessage { killer: None, victim: 2, weapon: -1, mode_special: 0 },
        );
        assert_eq!(
            ServerMessage::from_event(&kill),
            ServerMessage::KillMessage { killer: -1, victim: 2, weapon: -1, mode_special: 0 }
        );
    }

    #[test]
    fn test_server_message_json_roundtrip() {
        let msg = ServerMessage::Snapshot(SnapshotFrame {
            tick: 42,
            characters: vec![CharacterSnapshot {
                client_id: 1,
                tick: 40,
                core: CoreSnapshot { x: 320, y: 96, ..Default::default() },
                health: 10,
                armor: 0,
                ammo: 0,
                weapon: 5,
                attack_tick: 12,
                direction: -1,
                emote: Emote::Blink,
                triggered_events: 1,
            }],
        });

        let json = msg.to_json().unwrap();
        assert!(json.contains("snapshot"));
        assert_eq!(ServerMessage::from_json(&json).unwrap(), msg);
        assert_eq!(ServerMessage::from_bytes(&msg.to_bytes().unwrap()).unwrap(), msg);
    }

    #[test]
    fn test_client_message_applies_input() {
        let mut world = World::new(GameConfig::default(), TileMap::empty("proto", 20, 10));
        world.add_player(0, "a", Team::Red, 0x0705);
        world.spawn_character(0, tile_centre(5, 5));

        let json = r#"{"predicted_input":{"direction":1,"target_x":10,"target_y":0,"jump":0,"fire":0,"hook":0,"player_flags":0,"wanted_weapon":0,"next_weapon":0,"prev_weapon":0}}"#;
        let msg = ClientMessage::from_json(json).unwrap();
        msg.apply(&mut world, 0);
        assert_eq!(world.character(0).unwrap().input.direction, 1);

        ClientMessage::SetTeam { team: -1 }.apply(&mut world, 0);
        assert!(world.player(0).unwrap().is_spectator());
        assert!(!world.character(0).map_or(false, |c| c.alive));
    }

    #[test]
    fn test_outbound_filters_by_mask() {
        let mut world = World::new(GameConfig::default(), TileMap::empty("proto", 20, 10));
        world.add_player(0, "a", Team::Red, 0x0705);
        world.add_player(1, "b", Team::Red, 0x0705);
        let events = vec![
            GameEvent::chat_to(0, 1, "only b"),
            GameEvent::sound_masked(0, Sound::Hit, FixedVec2::ZERO, mask_one(0)),
        ];

        let to_a = outbound_for(&world, &events, 0);
        assert_eq!(to_a.len(), 2);
        assert!(matches!(to_a[0], ServerMessage::Sound { sound: 13, .. }));
        assert!(matches!(to_a[1], ServerMessage::Snapshot(_)));

        let to_b = outbound_for(&world, &events, 1);
        assert!(matches!(&to_b[0], ServerMessage::Chat { message, .. } if message == "only b"));
    }
}
