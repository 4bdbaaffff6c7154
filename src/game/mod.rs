//! Game Logic Module
//!
//! All game simulation code. 100% deterministic.
//!
//! ## Module Structure
//!
//! - `input`: Input samples and rolling button counters
//! - `collision`: Move/collide primitive
//! - `map`: Tile maps
//! - `tuning`: Physics and projectile tunables
//! - `physics`: Character physics core
//! - `weapon`: Weapon table and state machine
//! - `freeze`: Freeze status and the tile pass
//! - `damage`: Hits, deaths, kill attribution
//! - `character`: Per-character tick, input, snapshot
//! - `reckoning`: Dead-reckoning resync decisions
//! - `entities`: Projectiles, lasers, explosions
//! - `player`: Slots and round statistics
//! - `mode`: Game mode hooks
//! - `world`: Slot table and shared state
//! - `tick`: Authoritative simulation loop
//! - `events`: Game events routed to clients

pub mod input;
pub mod collision;
pub mod map;
pub mod tuning;
pub mod physics;
pub mod weapon;
pub mod freeze;
pub mod damage;
pub mod character;
pub mod reckoning;
pub mod entities;
pub mod player;
pub mod mode;
pub mod world;
pub mod tick;
pub mod events;

// Re-export key types
pub use character::Character;
pub use events::{GameEvent, GameEventData};
pub use input::PlayerInput;
pub use map::TileMap;
pub use player::{ClientId, Player, Team};
pub use reckoning::{DeadReckoning, ResyncCause};
pub use tick::{TickResult, tick, replay};
pub use world::World;
