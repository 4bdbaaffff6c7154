//! Core deterministic primitives.
//!
//! Everything the simulation computes goes through these types so that the
//! authoritative and replica physics paths stay bit-identical.

pub mod fixed;
pub mod vec2;
pub mod rng;
pub mod hash;

// Re-export core types
pub use fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE, PIXEL, px};
pub use vec2::FixedVec2;
pub use rng::DeterministicRng;
pub use hash::{compute_state_hash, StateHash, StateHasher};
