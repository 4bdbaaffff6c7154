//! Game Events
//!
//! Everything the simulation wants the transport to tell clients about,
//! collected per tick in emission order. Each event carries a recipient
//! mask so the transport can route it without consulting game state.

use serde::{Serialize, Deserialize};
use crate::core::vec2::FixedVec2;
use crate::game::player::ClientId;

/// One bit per client slot.
pub type ClientMask = u64;

/// Every client.
pub const MASK_ALL: ClientMask = u64::MAX;

/// Mask addressing a single client.
#[inline]
pub fn mask_one(id: ClientId) -> ClientMask {
    if id < 64 { 1u64 << id } else { 0 }
}

/// Sound cues.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Sound {
    /// Hammer swing
    HammerFire = 0,
    /// Pistol shot
    GunFire = 1,
    /// Shotgun blast
    ShotgunFire = 2,
    /// Grenade launch
    GrenadeFire = 3,
    /// Laser shot
    LaserFire = 4,
    /// Ninja dash start
    NinjaFire = 5,
    /// Grenade explosion
    GrenadeExplode = 6,
    /// Ninja dash connected
    NinjaHit = 7,
    /// Laser bounce
    LaserBounce = 8,
    /// Weapon switched
    WeaponSwitch = 9,
    /// Short pain
    PainShort = 10,
    /// Long pain
    PainLong = 11,
    /// Hammer connected
    HammerHit = 12,
    /// Projectile hit confirmation for the attacker
    Hit = 13,
    /// Player died
    PlayerDie = 14,
    /// Player spawned
    PlayerSpawn = 15,
    /// Dry fire
    WeaponNoAmmo = 16,
    /// Ninja picked up
    PickupNinja = 17,
}

/// Character emotes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Emote {
    /// Neutral face
    #[default]
    Normal = 0,
    /// Hurt
    Pain = 1,
    /// Happy
    Happy = 2,
    /// Surprised
    Surprise = 3,
    /// Angry
    Angry = 4,
    /// Eyes closed
    Blink = 5,
}

/// Event payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEventData {
    /// Positional sound
    Sound {
        /// Which sound
        sound: Sound,
        /// Where
        pos: FixedVec2,
    },
    /// Damage indicator stars; also used for the freeze countdown
    Damage {
        /// Where
        pos: FixedVec2,
        /// Number shown
        amount: i32,
    },
    /// Hammer impact spark
    HammerHit {
        /// Where
        pos: FixedVec2,
    },
    /// Grenade explosion visual
    Explosion {
        /// Where
        pos: FixedVec2,
    },
    /// Character spawned
    Spawn {
        /// Where
        pos: FixedVec2,
    },
    /// Character death visual
    Death {
        /// Where
        pos: FixedVec2,
        /// Who died
        victim: ClientId,
    },
    /// Kill feed line
    KillMessage {
        /// Killer slot, or `None` for an unattributed kill
        killer: Option<ClientId>,
        /// Victim slot
        victim: ClientId,
        /// Weapon or hazard code
        weapon: i32,
        /// Scoreboard classification from the game mode
        mode_special: i32,
    },
    /// Server chat line
    Chat {
        /// Text
        text: String,
    },
}

/// An event with its routing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameEvent {
    /// Tick of emission
    pub tick: u32,
    /// Recipients
    pub mask: ClientMask,
    /// Payload
    pub data: GameEventData,
}

impl GameEvent {
    /// Sound heard by everyone.
    pub fn sound(tick: u32, sound: Sound, pos: FixedVec2) -> Self {
        Self::sound_masked(tick, sound, pos, MASK_ALL)
    }

    /// Sound heard by `mask` only.
    pub fn sound_masked(tick: u32, sound: Sound, pos: FixedVec2, mask: ClientMask) -> Self {
        Self { tick, mask, data: GameEventData::Sound { sound, pos } }
    }

    /// Broadcast chat line.
    pub fn chat(tick: u32, text: impl Into<String>) -> Self {
        Self { tick, mask: MASK_ALL, data: GameEventData::Chat { text: text.into() } }
    }

    /// Chat line to one client.
    pub fn chat_to(tick: u32, to: ClientId, text: impl Into<String>) -> Self {
        Self { tick, mask: mask_one(to), data: GameEventData::Chat { text: text.into() } }
    }

    /// Visual event heard by everyone.
    pub fn broadcast(tick: u32, data: GameEventData) -> Self {
        Self { tick, mask: MASK_ALL, data }
    }

    /// Whether `id` receives this event.
    #[inline]
    pub fn is_for(&self, id: ClientId) -> bool {
        self.mask & mask_one(id) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_masks() {
        assert_eq!(mask_one(0), 1);
        assert_eq!(mask_one(63), 1 << 63);
        assert_eq!(mask_one(64), 0);

        let e = GameEvent::chat_to(5, 3, "hi");
        assert!(e.is_for(3));
        assert!(!e.is_for(4));
        assert!(GameEvent::chat(5, "all").is_for(40));
    }
}
