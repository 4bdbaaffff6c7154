//! Character Snapshots
//!
//! Per-observer view of one character for one snapshot cycle, and the
//! binary encoding of the wire core that dead reckoning compares.

use serde::{Serialize, Deserialize};
use thiserror::Error;

use crate::game::events::Emote;
use crate::game::physics::CoreSnapshot;
use crate::game::player::ClientId;

/// Snapshot encoding errors.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The wire core could not be encoded.
    #[error("core encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// Encode a wire core to bytes.
///
/// Two cores are considered equal for dead reckoning exactly when their
/// encodings are equal.
pub fn encode_core(core: &CoreSnapshot) -> Result<Vec<u8>, SnapshotError> {
    Ok(bincode::serialize(core)?)
}

/// Decode a wire core.
pub fn decode_core(bytes: &[u8]) -> Result<CoreSnapshot, SnapshotError> {
    Ok(bincode::deserialize(bytes)?)
}

/// One character as seen by one observer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterSnapshot {
    /// Character slot
    pub client_id: ClientId,
    /// Tick the core was taken at; 0 means "do not extrapolate"
    pub tick: u32,
    /// Quantized physical state
    pub core: CoreSnapshot,
    /// Health (0 unless the observer may see it)
    pub health: i32,
    /// Armor (0 unless the observer may see it)
    pub armor: i32,
    /// Ammo (0 unless the observer may see it)
    pub ammo: i32,
    /// Displayed weapon
    pub weapon: i32,
    /// Tick of the last shot
    pub attack_tick: u32,
    /// Walk direction
    pub direction: i32,
    /// Displayed emote
    pub emote: Emote,
    /// Core event bits since the last snapshot
    pub triggered_events: u32,
}
