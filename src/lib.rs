//! # Solofng Game Server
//!
//! Authoritative character simulation and dead-reckoning core for a
//! freeze-and-spike multiplayer server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     SOLOFNG SERVER                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  core/           - Deterministic primitives                  │
//! │  ├── fixed.rs    - Q16.16 fixed-point arithmetic             │
//! │  ├── vec2.rs     - 2D vector with fixed-point                │
//! │  ├── rng.rs      - Deterministic Xorshift128+ PRNG           │
//! │  └── hash.rs     - State hashing for verification            │
//! │                                                              │
//! │  game/           - Game logic (deterministic)                │
//! │  ├── physics.rs  - Character physics core                    │
//! │  ├── character.rs- Two-phase character tick                  │
//! │  ├── weapon.rs   - Weapon state machine                      │
//! │  ├── freeze.rs   - Freeze status and spike tiles             │
//! │  ├── damage.rs   - Hits, deaths, sacrifices                  │
//! │  ├── reckoning.rs- Dead-reckoning resync decisions           │
//! │  ├── world.rs    - Player slots and shared state             │
//! │  └── tick.rs     - Authoritative simulation loop             │
//! │                                                              │
//! │  network/        - Wire shapes                               │
//! │  ├── snapshot.rs - Per-observer character snapshots          │
//! │  └── protocol.rs - Message types                             │
//! │                                                              │
//! │  config.rs       - Server variables                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Determinism Guarantee
//!
//! The `core/` and `game/` modules are **100% deterministic**:
//! - No floating-point arithmetic in game logic
//! - Slots are visited in index order
//! - No system time dependencies
//! - All randomness from seeded Xorshift128+
//!
//! This is what lets a client extrapolate a character from an old snapshot
//! with the same integrator and land on exactly the server's result.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod config;
pub mod core;
pub mod game;
pub mod network;

// Re-export commonly used types
pub use config::{ConfigError, GameConfig, GameType};
pub use core::fixed::{Fixed, FIXED_ONE, FIXED_HALF, FIXED_SCALE};
pub use core::vec2::FixedVec2;
pub use core::rng::DeterministicRng;
pub use game::{Character, PlayerInput, TileMap, World};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
