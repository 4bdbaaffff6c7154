//! Network Layer
//!
//! Wire shapes only: per-observer snapshots and the message conversions.
//! Transport is left to the embedding server; all game logic runs through
//! `game/`.

pub mod protocol;
pub mod snapshot;

pub use protocol::{ClientMessage, ServerMessage, SnapshotFrame, outbound_for};
pub use snapshot::{CharacterSnapshot, SnapshotError, encode_core, decode_core};
