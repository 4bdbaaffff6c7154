//! Game Mode Hooks
//!
//! The rules the simulation asks about at spawn and death time.

use crate::config::GameType;
use crate::game::character::Character;
use crate::game::player::ClientId;
use crate::game::weapon::WeaponKind;
use crate::game::world::World;

/// Health and armor cap.
pub const MAX_HEALTH: i32 = 10;

/// Spawn and death hooks of a game mode.
pub trait GameMode: Send + Sync {
    /// Mode name shown to clients.
    fn name(&self) -> &str;

    /// Grant the starting health and weapons to a freshly spawned character.
    fn on_character_spawn(&self, chr: &mut Character, world: &World);

    /// Classify a kill for the scoreboard. The result travels with the kill
    /// message.
    fn on_character_death(
        &self,
        victim: ClientId,
        killer: Option<ClientId>,
        weapon: i32,
        world: &World,
    ) -> i32;
}

/// Freeze-and-spike mode: hammer plus laser (or grenade launcher in the
/// bolofng variant).
#[derive(Clone, Copy, Debug, Default)]
pub struct SoloFng;

impl SoloFng {
    /// The weapon this variant spawns with besides the hammer.
    pub fn primary_weapon(game_type: GameType) -> WeaponKind {
        match game_type {
            GameType::SoloFng => WeaponKind::Laser,
            GameType::BoloFng => WeaponKind::Grenade,
        }
    }
}

impl GameMode for SoloFng {
    fn name(&self) -> &str {
        "solofng"
    }

    fn on_character_spawn(&self, chr: &mut Character, world: &World) {
        chr.increase_health(MAX_HEALTH);
        chr.give_weapon(WeaponKind::Hammer, -1, world);
        chr.give_weapon(Self::primary_weapon(world.config.game_type), -1, world);
    }

    // No kill is special in this mode
    fn on_character_death(
        &self,
        _victim: ClientId,
        _killer: Option<ClientId>,
        _weapon: i32,
        _world: &World,
    ) -> i32 {
        0
    }
}
