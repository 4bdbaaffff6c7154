//! Player Input and Edge Decoding
//!
//! Clients send button state as rolling counters: every press and every
//! release bumps the counter by one, so an odd value means "held". Two
//! samples of such a counter are enough to recover how many presses and
//! releases happened in between, even when several clicks land inside a
//! single network update.

use serde::{Serialize, Deserialize};
use crate::core::fixed::px;
use crate::core::vec2::FixedVec2;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Bit window of the rolling button counters.
pub const INPUT_STATE_MASK: i32 = 0x3f;

/// Edge counts at or above this are treated as corrupted or replayed input.
pub const MAX_SANE_PRESSES: i32 = 128;

/// Player flag set while the chat box is open.
pub const PLAYERFLAG_CHATTING: i32 = 1 << 1;

// =============================================================================
// EDGE DECODER
// =============================================================================

/// Press and release counts between two counter samples.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputCount {
    /// Rising edges (counter became odd)
    pub presses: i32,
    /// Falling edges (counter became even)
    pub releases: i32,
}

impl InputCount {
    /// Presses bounded to the sanity limit.
    #[inline]
    pub fn sane_presses(self) -> i32 {
        clamp_presses(self.presses)
    }
}

/// Decode the edges between two samples of a rolling button counter.
///
/// Walks the masked counter forward one step at a time until it reaches
/// `cur`; each step landing on an odd value is a press, each even one a
/// release.
pub fn count_input(prev: i32, cur: i32) -> InputCount {
    let mut count = InputCount::default();
    let prev = prev & INPUT_STATE_MASK;
    let cur = cur & INPUT_STATE_MASK;

    let mut i = prev;
    while i != cur {
        i = (i + 1) & INPUT_STATE_MASK;
        if i & 1 != 0 {
            count.presses += 1;
        } else {
            count.releases += 1;
        }
    }
    count
}

/// Truncate an edge count to [`MAX_SANE_PRESSES`].
#[inline]
pub fn clamp_presses(presses: i32) -> i32 {
    presses.clamp(0, MAX_SANE_PRESSES)
}

// =============================================================================
// INPUT SAMPLE
// =============================================================================

/// One input sample as received from a client.
///
/// `target_x`/`target_y` is the aim offset from the character in world
/// pixels. Button fields other than `jump`/`hook`/`direction` are rolling
/// counters (see [`count_input`]).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerInput {
    /// Walk direction: -1 left, 0 none, 1 right
    pub direction: i32,
    /// Aim X offset in pixels
    pub target_x: i32,
    /// Aim Y offset in pixels
    pub target_y: i32,
    /// Jump held
    pub jump: i32,
    /// Fire counter
    pub fire: i32,
    /// Hook held
    pub hook: i32,
    /// Client state flags
    pub player_flags: i32,
    /// Direct weapon selection, 1-based (0 = none)
    pub wanted_weapon: i32,
    /// Next-weapon counter
    pub next_weapon: i32,
    /// Previous-weapon counter
    pub prev_weapon: i32,
}

impl PlayerInput {
    /// Aiming exactly at the character is not allowed; it is remapped to
    /// aiming one pixel up.
    #[inline]
    pub fn sanitize_aim(&mut self) {
        if self.target_x == 0 && self.target_y == 0 {
            self.target_y = -1;
        }
    }

    /// Whether the client reports the chat box open.
    #[inline]
    pub fn is_chatting(&self) -> bool {
        self.player_flags & PLAYERFLAG_CHATTING != 0
    }

    /// Whether the fire button is currently held.
    #[inline]
    pub fn fire_held(&self) -> bool {
        self.fire & 1 != 0
    }

    /// Clear movement, hook and jump, and advance the fire counter to a
    /// released state.
    pub fn neutralize(&mut self) {
        self.direction = 0;
        self.hook = 0;
        self.jump = 0;
        if self.fire_held() {
            self.fire += 1;
        }
        self.fire &= INPUT_STATE_MASK;
    }

    /// Normalized aim direction.
    pub fn target_direction(&self) -> FixedVec2 {
        FixedVec2::new(px(self.target_x), px(self.target_y)).normalize()
    }

    /// Aim offset as a world vector.
    pub fn target(&self) -> FixedVec2 {
        FixedVec2::new(px(self.target_x), px(self.target_y))
    }
}

// =============================================================================
// TESTS
// =============================================================================
