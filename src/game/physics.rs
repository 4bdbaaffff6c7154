//! Character Physics Core
//!
//! The serializable physical state of one character and its per-tick
//! integrator. Three copies exist per character: the authoritative core,
//! a replica used to predict what clients will extrapolate, and the last
//! broadcast core (see `reckoning`).
//!
//! ## Tick order
//!
//! ```text
//! tick(use_input)   gravity, walking, jumping, hook, player pushes
//! move()            swept box move + player-player blocking
//! quantize()        round-trip through the wire form (CoreSnapshot)
//! ```
//!
//! Cross-character effects produced during phase 1 (hook drag on the
//! grabbed character, hammer and dash knockback) become [`Impulse`]s and
//! are applied by the world after every character has ticked, so the
//! result never depends on iteration order.

use serde::{Serialize, Deserialize};

use crate::core::fixed::{
    Fixed, FIXED_ONE, FIXED_HALF, FIXED_PI, PIXEL, VEL_UNIT,
    px, to_fixed, fixed_mul, fixed_div, fixed_atan2, saturated_add,
    quantize_px, quantize_vel,
};
use crate::core::vec2::FixedVec2;
use crate::game::collision::{Collision, Tile};
use crate::game::input::PlayerInput;
use crate::game::player::{ClientId, MAX_CLIENTS};
use crate::game::tuning::Tuning;

/// Character collision box edge length.
pub const PHYS_SIZE: Fixed = px(28);

/// Velocity magnitude cap.
pub const MAX_VELOCITY: Fixed = px(6000);

// ===== TRIGGERED EVENTS (bitmask) =====

/// Jumped off the ground
pub const COREEVENT_GROUND_JUMP: u32 = 0x01;
/// Used the air jump
pub const COREEVENT_AIR_JUMP: u32 = 0x02;
/// Launched the hook
pub const COREEVENT_HOOK_LAUNCH: u32 = 0x04;
/// Hook grabbed a character
pub const COREEVENT_HOOK_ATTACH_PLAYER: u32 = 0x08;
/// Hook grabbed a wall
pub const COREEVENT_HOOK_ATTACH_GROUND: u32 = 0x10;
/// Hook bounced off an unhookable wall
pub const COREEVENT_HOOK_HIT_NOHOOK: u32 = 0x20;
/// Hook finished retracting
pub const COREEVENT_HOOK_RETRACT: u32 = 0x40;

// =============================================================================
// HOOK STATE
// =============================================================================

/// Hook state machine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum HookState {
    /// Fully retracted, waiting for the button to be released
    Retracted = -1,
    /// Not in use
    #[default]
    Idle = 0,
    /// Retraction animation, first step
    RetractStart = 1,
    /// Retraction animation, middle step
    Retracting = 2,
    /// Retraction animation, last step
    RetractEnd = 3,
    /// Travelling outwards
    Flying = 4,
    /// Attached to a wall or character
    Grabbed = 5,
}

impl HookState {
    /// Wire code.
    #[inline]
    pub fn to_wire(self) -> i32 {
        self as i32
    }

    /// Parse a wire code; unknown codes read as idle.
    pub fn from_wire(code: i32) -> Self {
        match code {
            -1 => HookState::Retracted,
            1 => HookState::RetractStart,
            2 => HookState::Retracting,
            3 => HookState::RetractEnd,
            4 => HookState::Flying,
            5 => HookState::Grabbed,
            _ => HookState::Idle,
        }
    }
}

// =============================================================================
// WORLD CORE (per-slot lookup table)
// =============================================================================

/// What other characters may observe of a core during a phase.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CoreView {
    /// Position at phase start
    pub pos: FixedVec2,
    /// Velocity at phase start
    pub vel: FixedVec2,
}

/// Fixed-size per-slot lookup of live character cores.
///
/// This is a lookup relation only: slots hold copies refreshed by the world
/// before each phase and are cleared the moment a character dies.
#[derive(Clone, Debug)]
pub struct WorldCore {
    /// Tuning in effect for this world
    pub tuning: Tuning,
    characters: Vec<Option<CoreView>>,
}

impl WorldCore {
    /// Empty table.
    pub fn new(tuning: Tuning) -> Self {
        Self {
            tuning,
            characters: vec![None; MAX_CLIENTS],
        }
    }

    /// A world with no other characters, used to advance replicas without
    /// any interaction.
    pub fn isolated(tuning: Tuning) -> Self {
        Self::new(tuning)
    }

    /// View of slot `id`.
    #[inline]
    pub fn get(&self, id: ClientId) -> Option<CoreView> {
        self.characters.get(id).copied().flatten()
    }

    /// Register or refresh slot `id`.
    pub fn set(&mut self, id: ClientId, view: CoreView) {
        if let Some(slot) = self.characters.get_mut(id) {
            *slot = Some(view);
        }
    }

    /// Clear slot `id`.
    pub fn clear(&mut self, id: ClientId) {
        if let Some(slot) = self.characters.get_mut(id) {
            *slot = None;
        }
    }

    /// Occupied slots in slot order.
    pub fn iter(&self) -> impl Iterator<Item = (ClientId, CoreView)> + '_ {
        self.characters
            .iter()
            .enumerate()
            .filter_map(|(id, v)| v.map(|v| (id, v)))
    }

    /// Whether slot `id` is occupied.
    pub fn contains(&self, id: ClientId) -> bool {
        self.get(id).is_some()
    }
}

/// Velocity change to apply to another character after phase 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Impulse {
    /// Receiving slot
    pub target: ClientId,
    /// Velocity delta
    pub delta: FixedVec2,
}

// =============================================================================
// WIRE CORE
// =============================================================================

/// Quantized core as it appears on the wire: whole pixels for positions,
/// 1/256 pixel for velocities and 1/256 for the hook direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CoreSnapshot {
    /// X in pixels
    pub x: i32,
    /// Y in pixels
    pub y: i32,
    /// Velocity X in 1/256 pixels per tick
    pub vel_x: i32,
    /// Velocity Y in 1/256 pixels per tick
    pub vel_y: i32,
    /// Aim angle in 1/256 radians
    pub angle: i32,
    /// Walk direction
    pub direction: i32,
    /// Jump state bits
    pub jumped: i32,
    /// Grabbed slot or -1
    pub hooked_player: i32,
    /// Hook state wire code
    pub hook_state: i32,
    /// Ticks the hook has been grabbed
    pub hook_tick: i32,
    /// Hook X in pixels
    pub hook_x: i32,
    /// Hook Y in pixels
    pub hook_y: i32,
    /// Hook direction X in 1/256
    pub hook_dx: i32,
    /// Hook direction Y in 1/256
    pub hook_dy: i32,
}

#[inline]
fn quantize_unit(v: Fixed) -> i32 {
    (((v as i64) + 128) >> 8) as i32
}

// =============================================================================
// CHARACTER CORE
// =============================================================================

/// Physical state of one character.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCore {
    /// Owning slot
    pub id: ClientId,
    /// Position (box centre)
    pub pos: FixedVec2,
    /// Velocity per tick
    pub vel: FixedVec2,
    /// Hook head position
    pub hook_pos: FixedVec2,
    /// Hook launch direction
    pub hook_dir: FixedVec2,
    /// Ticks spent grabbed
    pub hook_tick: i32,
    /// Hook state
    pub hook_state: HookState,
    /// Grabbed character
    pub hooked_player: Option<ClientId>,
    /// Bit 0: jump held since last jump. Bit 1: air jump used.
    pub jumped: i32,
    /// Walk direction
    pub direction: i32,
    /// Aim angle in 1/256 radians
    pub angle: i32,
    /// Input applied on the next `tick(true)`
    pub input: PlayerInput,
    /// Events since the last snapshot (bitmask)
    pub triggered_events: u32,
    /// Touched a death tile during the last move
    pub death: bool,
}

impl CharacterCore {
    /// Fresh core for slot `id` at `pos`.
    pub fn new(id: ClientId, pos: FixedVec2) -> Self {
        Self {
            id,
            pos,
            hook_pos: pos,
            ..Default::default()
        }
    }

    /// The view other characters get of this core.
    #[inline]
    pub fn view(&self) -> CoreView {
        CoreView { pos: self.pos, vel: self.vel }
    }

    /// Whether either bottom corner rests on a wall.
    pub fn is_grounded(&self, collision: &dyn Collision) -> bool {
        let half = PHYS_SIZE / 2;
        let below = self.pos.y + half + px(5);
        collision.check_point(FixedVec2::new(self.pos.x + half, below))
            || collision.check_point(FixedVec2::new(self.pos.x - half, below))
    }

    /// Advance one tick: gravity, control, jump, hook and player pushes.
    ///
    /// With `use_input == false` the stored input is ignored and the core
    /// keeps its previous direction, which is what a client does when
    /// extrapolating.
    pub fn tick(
        &mut self,
        use_input: bool,
        world: &WorldCore,
        collision: &dyn Collision,
    ) -> Vec<Impulse> {
        let tuning = &world.tuning;
        let mut impulses = Vec::new();

        self.triggered_events = 0;

        let grounded = self.is_grounded(collision);
        let target_direction = self.input.target_direction();

        self.vel.y = self.vel.y.saturating_add(tuning.gravity);

        let (max_speed, accel, friction) = if grounded {
            (tuning.ground_control_speed, tuning.ground_control_accel, tuning.ground_friction)
        } else {
            (tuning.air_control_speed, tuning.air_control_accel, tuning.air_friction)
        };

        if use_input {
            self.direction = self.input.direction;
            self.angle = aim_angle(&self.input);

            // Jump
            if self.input.jump != 0 {
                if self.jumped & 1 == 0 {
                    if grounded {
                        self.triggered_events |= COREEVENT_GROUND_JUMP;
                        self.vel.y = -tuning.ground_jump_impulse;
                        self.jumped |= 1;
                    } else if self.jumped & 2 == 0 {
                        self.triggered_events |= COREEVENT_AIR_JUMP;
                        self.vel.y = -tuning.air_jump_impulse;
                        self.jumped |= 3;
                    }
                }
            } else {
                self.jumped &= !1;
            }

            // Hook launch / release
            if self.input.hook != 0 {
                if self.hook_state == HookState::Idle {
                    self.hook_state = HookState::Flying;
                    self.hook_pos = self.pos + target_direction.scale(PHYS_SIZE * 3 / 2);
                    self.hook_dir = target_direction;
                    self.hooked_player = None;
                    self.hook_tick = 0;
                    self.triggered_events |= COREEVENT_HOOK_LAUNCH;
                }
            } else {
                self.hooked_player = None;
                self.hook_state = HookState::Idle;
                self.hook_pos = self.pos;
            }
        }

        if grounded {
            self.jumped &= !2;
        }

        // Horizontal control
        if self.direction < 0 {
            self.vel.x = saturated_add(-max_speed, max_speed, self.vel.x, -accel);
        } else if self.direction > 0 {
            self.vel.x = saturated_add(-max_speed, max_speed, self.vel.x, accel);
        } else {
            self.vel.x = fixed_mul(self.vel.x, friction);
        }

        self.tick_hook(world, collision);
        self.tick_player_interaction(world, &mut impulses);

        // Clamp to something sane
        if self.vel.length() > MAX_VELOCITY {
            self.vel = self.vel.normalize().scale(MAX_VELOCITY);
        }

        impulses
    }

    fn tick_hook(&mut self, world: &WorldCore, collision: &dyn Collision) {
        let tuning = &world.tuning;

        match self.hook_state {
            HookState::Idle => {
                self.hooked_player = None;
                self.hook_pos = self.pos;
            }
            HookState::RetractStart => self.hook_state = HookState::Retracting,
            HookState::Retracting => self.hook_state = HookState::RetractEnd,
            HookState::RetractEnd => {
                self.hook_state = HookState::Retracted;
                self.triggered_events |= COREEVENT_HOOK_RETRACT;
            }
            HookState::Flying => {
                let mut new_pos = self.hook_pos + self.hook_dir.scale(tuning.hook_fire_speed);
                if self.pos.distance(new_pos) > tuning.hook_length {
                    self.hook_state = HookState::RetractStart;
                    new_pos = self.pos + (new_pos - self.pos).normalize().scale(tuning.hook_length);
                }

                // The hook must not pass through walls
                let mut going_to_hit_ground = false;
                let mut going_to_retract = false;
                if let Some(hit) = collision.intersect_line(self.hook_pos, new_pos) {
                    new_pos = hit.pos;
                    if hit.tile == Tile::NoHook {
                        going_to_retract = true;
                    } else {
                        going_to_hit_ground = true;
                    }
                }

                // Characters are checked before walls
                if tuning.player_hooking {
                    let mut best: Option<(ClientId, Fixed)> = None;
                    for (id, other) in world.iter() {
                        if id == self.id {
                            continue;
                        }
                        let closest = self.hook_pos.closest_point_on_segment(new_pos, other.pos);
                        if other.pos.distance(closest) < PHYS_SIZE + px(2) {
                            let d = self.hook_pos.distance(other.pos);
                            if best.map_or(true, |(_, bd)| d < bd) {
                                best = Some((id, d));
                            }
                        }
                    }
                    if let Some((id, _)) = best {
                        self.triggered_events |= COREEVENT_HOOK_ATTACH_PLAYER;
                        self.hook_state = HookState::Grabbed;
                        self.hooked_player = Some(id);
                    }
                }

                if self.hook_state == HookState::Flying {
                    if going_to_hit_ground {
                        self.triggered_events |= COREEVENT_HOOK_ATTACH_GROUND;
                        self.hook_state = HookState::Grabbed;
                    } else if going_to_retract {
                        self.triggered_events |= COREEVENT_HOOK_HIT_NOHOOK;
                        self.hook_state = HookState::RetractStart;
                    }
                    self.hook_pos = new_pos;
                }
            }
            HookState::Retracted | HookState::Grabbed => {}
        }

        if self.hook_state == HookState::Grabbed {
            if let Some(hooked) = self.hooked_player {
                match world.get(hooked) {
                    Some(other) => self.hook_pos = other.pos,
                    None => self.release_hook(),
                }
            }

            // Wall hook drags the character; character hooks are handled
            // in the interaction pass
            if self.hooked_player.is_none()
                && self.hook_state == HookState::Grabbed
                && self.hook_pos.distance(self.pos) > px(46)
            {
                let mut hook_vel = (self.hook_pos - self.pos).normalize().scale(tuning.hook_drag_accel);

                // More power to drag up than down
                if hook_vel.y > 0 {
                    hook_vel.y = fixed_mul(hook_vel.y, to_fixed(0.3));
                }

                // Boost when the player walks along with the hook
                if (hook_vel.x < 0 && self.direction < 0) || (hook_vel.x > 0 && self.direction > 0) {
                    hook_vel.x = fixed_mul(hook_vel.x, to_fixed(0.95));
                } else {
                    hook_vel.x = fixed_mul(hook_vel.x, to_fixed(0.75));
                }

                let new_vel = self.vel + hook_vel;
                let new_len = new_vel.length();
                if new_len < tuning.hook_drag_speed || new_len < self.vel.length() {
                    self.vel = new_vel;
                }
            }

            if self.hook_state == HookState::Grabbed {
                self.hook_tick += 1;
                if let Some(hooked) = self.hooked_player {
                    if self.hook_tick > tuning.hook_duration_ticks || !world.contains(hooked) {
                        self.release_hook();
                    }
                }
            }
        }
    }

    fn release_hook(&mut self) {
        self.hooked_player = None;
        self.hook_state = HookState::Retracted;
        self.hook_pos = self.pos;
    }

    fn tick_player_interaction(&mut self, world: &WorldCore, impulses: &mut Vec<Impulse>) {
        let tuning = &world.tuning;

        for (id, other) in world.iter() {
            if id == self.id {
                continue;
            }

            let distance = self.pos.distance(other.pos);
            let dir = (self.pos - other.pos).normalize();

            // Push apart
            if tuning.player_collision && distance > 0 && distance < PHYS_SIZE * 5 / 4 {
                let a = fixed_mul(PHYS_SIZE, to_fixed(1.45)) - distance;
                let mut velocity = FIXED_HALF;

                // Do not add force along the current motion
                if self.vel.length() > 0 {
                    velocity = FIXED_ONE - (self.vel.normalize().dot(dir) + FIXED_ONE) / 2;
                }

                let push = fixed_mul(a, fixed_mul(velocity, to_fixed(0.75)));
                self.vel = (self.vel + dir.scale(push)).scale(to_fixed(0.85));
            }

            // Hook drag between characters
            if tuning.player_hooking
                && self.hooked_player == Some(id)
                && distance > PHYS_SIZE * 3 / 2
            {
                let accel = fixed_mul(tuning.hook_drag_accel, fixed_div(distance, tuning.hook_length));
                let drag = tuning.hook_drag_speed;

                let pull = FixedVec2::new(
                    fixed_mul(fixed_mul(accel, dir.x), to_fixed(1.5)),
                    fixed_mul(fixed_mul(accel, dir.y), to_fixed(1.5)),
                );
                let pulled = FixedVec2::new(
                    saturated_add(-drag, drag, other.vel.x, pull.x),
                    saturated_add(-drag, drag, other.vel.y, pull.y),
                );
                impulses.push(Impulse { target: id, delta: pulled - other.vel });

                // A little force for the one holding the hook
                self.vel.x = saturated_add(-drag, drag, self.vel.x, -fixed_mul(fixed_mul(accel, dir.x), to_fixed(0.25)));
                self.vel.y = saturated_add(-drag, drag, self.vel.y, -fixed_mul(fixed_mul(accel, dir.y), to_fixed(0.25)));
            }
        }
    }

    /// Move by the current velocity. Sets and returns the death flag.
    pub fn move_core(&mut self, world: &WorldCore, collision: &dyn Collision) -> bool {
        let size = FixedVec2::new(PHYS_SIZE, PHYS_SIZE);
        let mut new_pos = self.pos;
        self.death = collision.move_box(&mut new_pos, &mut self.vel, size, 0);

        if world.tuning.player_collision {
            let distance = self.pos.distance(new_pos);
            if distance > 0 {
                let end = distance / PIXEL + 1;
                let mut last = self.pos;

                for i in 0..end {
                    let t = fixed_div(i * PIXEL, distance);
                    let p = self.pos.lerp(new_pos, t);

                    for (id, other) in world.iter() {
                        if id == self.id {
                            continue;
                        }
                        let d = p.distance(other.pos);
                        if d < PHYS_SIZE {
                            if t > 0 {
                                self.pos = last;
                            } else if new_pos.distance(other.pos) > d {
                                self.pos = new_pos;
                            }
                            return self.death;
                        }
                    }
                    last = p;
                }
            }
        }

        self.pos = new_pos;
        self.death
    }

    /// Round-trip through the wire representation.
    pub fn quantize(&mut self) {
        let snapshot = self.write();
        self.read(&snapshot);
    }

    /// Wire form of this core.
    pub fn write(&self) -> CoreSnapshot {
        CoreSnapshot {
            x: quantize_px(self.pos.x),
            y: quantize_px(self.pos.y),
            vel_x: quantize_vel(self.vel.x),
            vel_y: quantize_vel(self.vel.y),
            angle: self.angle,
            direction: self.direction,
            jumped: self.jumped,
            hooked_player: self.hooked_player.map_or(-1, |id| id as i32),
            hook_state: self.hook_state.to_wire(),
            hook_tick: self.hook_tick,
            hook_x: quantize_px(self.hook_pos.x),
            hook_y: quantize_px(self.hook_pos.y),
            hook_dx: quantize_unit(self.hook_dir.x),
            hook_dy: quantize_unit(self.hook_dir.y),
        }
    }

    /// Load physical state from the wire form. Input, id and event bits are
    /// left untouched.
    pub fn read(&mut self, s: &CoreSnapshot) {
        self.pos = FixedVec2::new(px(s.x), px(s.y));
        self.vel = FixedVec2::new(s.vel_x * VEL_UNIT, s.vel_y * VEL_UNIT);
        self.angle = s.angle;
        self.direction = s.direction;
        self.jumped = s.jumped;
        self.hooked_player = usize::try_from(s.hooked_player).ok();
        self.hook_state = HookState::from_wire(s.hook_state);
        self.hook_tick = s.hook_tick;
        self.hook_pos = FixedVec2::new(px(s.hook_x), px(s.hook_y));
        self.hook_dir = FixedVec2::new(s.hook_dx << 8, s.hook_dy << 8);
    }
}

/// Aim angle in 1/256 radians, folded into [-pi/2, 3pi/2).
fn aim_angle(input: &PlayerInput) -> i32 {
    let mut a = fixed_atan2(px(input.target_y), px(input.target_x));
    if a < -(FIXED_PI / 2) {
        a += 2 * FIXED_PI;
    }
    ((a as i64 * 256) / FIXED_ONE as i64) as i32
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::map::{TileMap, tile_centre};

    fn flat() -> TileMap {
        TileMap::from_ascii(
            "flat",
            "\
##########
#........#
#........#
#........#
##########",
        )
        .unwrap()
    }

    /// A core resting on the floor of `flat()` in column `x`.
    fn resting(id: ClientId, x: i32) -> CharacterCore {
        let floor_y = FixedVec2::from_ints(0, 4).y;
        CharacterCore::new(id, FixedVec2::new(tile_centre(x, 3).x, floor_y - PHYS_SIZE / 2 - PIXEL))
    }

    #[test]
    fn test_gravity_and_ground() {
        let map = flat();
        let world = WorldCore::new(Tuning::default());

        let mut airborne = CharacterCore::new(0, tile_centre(4, 1));
        assert!(!airborne.is_grounded(&map));
        airborne.tick(true, &world, &map);
        assert_eq!(airborne.vel.y, world.tuning.gravity);

        let grounded = resting(0, 4);
        assert!(grounded.is_grounded(&map));
    }

    #[test]
    fn test_ground_jump_then_air_jump() {
        let map = flat();
        let world = WorldCore::new(Tuning::default());
        let mut core = resting(0, 4);

        core.input.jump = 1;
        core.tick(true, &world, &map);
        assert_ne!(core.triggered_events & COREEVENT_GROUND_JUMP, 0);
        assert_eq!(core.vel.y, -world.tuning.ground_jump_impulse);
        core.move_core(&world, &map);

        // Holding jump does not jump again
        core.tick(true, &world, &map);
        assert_eq!(core.triggered_events & (COREEVENT_GROUND_JUMP | COREEVENT_AIR_JUMP), 0);
        core.move_core(&world, &map);

        // Release and press again in the air: air jump
        core.input.jump = 0;
        core.tick(true, &world, &map);
        core.input.jump = 1;
        core.tick(true, &world, &map);
        assert_ne!(core.triggered_events & COREEVENT_AIR_JUMP, 0);
        assert_eq!(core.jumped, 3);
    }

    #[test]
    fn test_walking_saturates() {
        let map = flat();
        let world = WorldCore::new(Tuning::default());
        let mut core = resting(0, 2);
        core.input.direction = 1;

        for _ in 0..20 {
            core.tick(true, &world, &map);
            core.vel.y = 0;
        }
        assert_eq!(core.vel.x, world.tuning.ground_control_speed);
    }

    #[test]
    fn test_quantize_is_idempotent() {
        let mut core = CharacterCore::new(3, FixedVec2::new(px(100) + 700, px(50) - 1300));
        core.vel = FixedVec2::new(1234, -5678);
        core.hook_dir = FixedVec2::new(46341, -46341);
        core.quantize();
        let once = core.clone();
        core.quantize();
        assert_eq!(core, once);
        assert_eq!(core.write(), once.write());
    }

    #[test]
    fn test_hook_grabs_wall() {
        let map = flat();
        let world = WorldCore::new(Tuning::default());
        let mut core = resting(0, 4);
        core.input.hook = 1;
        core.input.target_y = -100;

        core.tick(true, &world, &map);
        assert_ne!(core.triggered_events & COREEVENT_HOOK_LAUNCH, 0);
        for _ in 0..4 {
            if core.hook_state == HookState::Grabbed {
                break;
            }
            core.tick(true, &world, &map);
        }
        assert_eq!(core.hook_state, HookState::Grabbed);
        assert!(core.hooked_player.is_none());
    }

    #[test]
    fn test_hook_on_player_yields_impulse() {
        let map = TileMap::empty("big", 40, 10);
        let mut world = WorldCore::new(Tuning::default());
        let mut hooker = CharacterCore::new(0, tile_centre(5, 5));
        let victim = CharacterCore::new(1, tile_centre(10, 5));
        world.set(0, hooker.view());
        world.set(1, victim.view());

        hooker.input.hook = 1;
        hooker.input.target_x = 100;

        let mut impulses = Vec::new();
        for _ in 0..4 {
            impulses = hooker.tick(true, &world, &map);
            if hooker.hooked_player.is_some() {
                break;
            }
        }
        assert_eq!(hooker.hooked_player, Some(1));
        // Next tick drags the victim towards the hooker
        if impulses.is_empty() {
            impulses = hooker.tick(true, &world, &map);
        }
        let pull = impulses.iter().find(|i| i.target == 1).unwrap();
        assert!(pull.delta.x < 0);
    }

    #[test]
    fn test_move_blocked_by_player() {
        let map = TileMap::empty("big", 40, 10);
        let mut world = WorldCore::new(Tuning::default());
        let mut mover = CharacterCore::new(0, tile_centre(5, 5));
        let wall = CharacterCore::new(1, tile_centre(6, 5));
        world.set(1, wall.view());

        mover.vel = FixedVec2::new(px(40), 0);
        mover.move_core(&world, &map);
        assert!(mover.pos.distance(wall.pos) >= PHYS_SIZE - PIXEL);
        assert!(mover.pos.x < wall.pos.x);

        // Isolated world: no blocking
        let mut ghost = CharacterCore::new(0, tile_centre(5, 5));
        ghost.vel = FixedVec2::new(px(40), 0);
        ghost.move_core(&WorldCore::isolated(Tuning::default()), &map);
        assert_eq!(ghost.pos.x, tile_centre(5, 5).x + px(40));
    }

    #[test]
    fn test_hook_state_wire_codes() {
        for state in [
            HookState::Retracted,
            HookState::Idle,
            HookState::RetractStart,
            HookState::Retracting,
            HookState::RetractEnd,
            HookState::Flying,
            HookState::Grabbed,
        ] {
            assert_eq!(HookState::from_wire(state.to_wire()), state);
        }
        assert_eq!(HookState::from_wire(99), HookState::Idle);
    }
}
