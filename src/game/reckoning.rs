//! Dead Reckoning
//!
//! Clients extrapolate other characters from the last core they were sent,
//! using the same integrator as the server. The server mirrors that
//! extrapolation in a private replica and only sends a fresh core when the
//! replica and the authoritative core stop serializing to the same bytes.

use serde::{Serialize, Deserialize};
use tracing::{trace, warn};

use crate::game::collision::Collision;
use crate::game::physics::{CharacterCore, WorldCore};
use crate::network::snapshot::encode_core;

/// Why the broadcast core was refreshed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResyncCause {
    /// Nothing had been broadcast yet
    Initial,
    /// The broadcast core was too old
    Stale,
    /// Replica and authoritative core no longer match
    Diverged,
}

/// Replica and broadcast state of one character.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeadReckoning {
    /// Extrapolated copy advanced in isolation
    pub replica: CharacterCore,
    /// Last core sent to clients
    pub broadcast: CharacterCore,
    /// Tick `broadcast` was taken at
    pub tick: Option<u32>,
}

impl DeadReckoning {
    /// Advance the replica one tick the way a client would: stored input
    /// ignored, no other characters.
    pub fn advance_replica(&mut self, isolated: &WorldCore, collision: &dyn Collision) {
        self.replica.tick(false, isolated, collision);
        self.replica.move_core(isolated, collision);
        self.replica.quantize();
    }

    /// Compare the replica with the authoritative core and reseed both
    /// copies if they disagree or the broadcast is older than `stale_ticks`.
    pub fn reconcile(&mut self, core: &CharacterCore, now: u32, stale_ticks: u32) -> Option<ResyncCause> {
        let cause = match self.tick {
            None => Some(ResyncCause::Initial),
            Some(tick) if tick.saturating_add(stale_ticks) < now => Some(ResyncCause::Stale),
            Some(_) if self.diverged(core) => Some(ResyncCause::Diverged),
            Some(_) => None,
        };

        if let Some(cause) = cause {
            trace!("reckoning resync id={} tick={} cause={:?}", core.id, now, cause);
            self.resync(core, now);
        }
        cause
    }

    /// Reseed replica and broadcast from `core`, stamped `now`.
    pub fn resync(&mut self, core: &CharacterCore, now: u32) {
        self.broadcast = core.clone();
        self.replica = core.clone();
        self.tick = Some(now);
    }

    fn diverged(&self, core: &CharacterCore) -> bool {
        match (encode_core(&self.replica.write()), encode_core(&core.write())) {
            (Ok(predicted), Ok(current)) => predicted != current,
            (Err(e), _) | (_, Err(e)) => {
                warn!("reckoning encode failed id={}: {}", core.id, e);
                true
            }
        }
    }

    /// Shift the broadcast stamp while the world is paused.
    pub fn tick_paused(&mut self) {
        if let Some(tick) = self.tick.as_mut() {
            *tick += 1;
        }
    }

    /// Tick stamp and core to put in a snapshot. Tick 0 tells the client
    /// not to extrapolate.
    pub fn snapshot_source<'a>(&'a self, live: &'a CharacterCore, paused: bool) -> (u32, &'a CharacterCore) {
        match self.tick {
            Some(tick) if !paused => (tick, &self.broadcast),
            _ => (0, live),
        }
    }

    /// Forget everything; the next reconcile reseeds.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

// =============================================================================
// TESTS
// =============================================================================
