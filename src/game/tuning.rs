//! Physics and Projectile Tuning
//!
//! Read-only during a tick. Distances are in fixed-point tile units; the
//! defaults are the classic per-tick pixel values converted with [`pxf`].

use serde::{Serialize, Deserialize};

use crate::core::fixed::{Fixed, to_fixed, pxf, px};

/// Physics and projectile tunables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tuning {
    /// Max walking speed on ground (per tick)
    pub ground_control_speed: Fixed,
    /// Walking acceleration on ground (per tick)
    pub ground_control_accel: Fixed,
    /// Horizontal velocity factor on ground with no input
    pub ground_friction: Fixed,
    /// Jump impulse from ground
    pub ground_jump_impulse: Fixed,
    /// Jump impulse in air
    pub air_jump_impulse: Fixed,
    /// Max air control speed
    pub air_control_speed: Fixed,
    /// Air control acceleration
    pub air_control_accel: Fixed,
    /// Horizontal velocity factor in air with no input
    pub air_friction: Fixed,
    /// Max hook reach
    pub hook_length: Fixed,
    /// Hook head speed while flying
    pub hook_fire_speed: Fixed,
    /// Drag acceleration of a grabbed hook
    pub hook_drag_accel: Fixed,
    /// Speed limit the hook drags up to
    pub hook_drag_speed: Fixed,
    /// Ticks a player hook holds before it releases
    pub hook_duration_ticks: i32,
    /// Gravity (per tick)
    pub gravity: Fixed,
    /// Gun projectile curvature, in tiles per tile travelled squared
    pub gun_curvature: Fixed,
    /// Gun projectile speed in tiles per second
    pub gun_speed: Fixed,
    /// Gun projectile lifetime
    pub gun_lifetime_ms: i32,
    /// Shotgun projectile curvature
    pub shotgun_curvature: Fixed,
    /// Shotgun projectile speed in tiles per second
    pub shotgun_speed: Fixed,
    /// Speed factor of the outermost shotgun pellets
    pub shotgun_speeddiff: Fixed,
    /// Shotgun projectile lifetime
    pub shotgun_lifetime_ms: i32,
    /// Grenade curvature
    pub grenade_curvature: Fixed,
    /// Grenade speed in tiles per second
    pub grenade_speed: Fixed,
    /// Grenade lifetime
    pub grenade_lifetime_ms: i32,
    /// Laser reach
    pub laser_reach: Fixed,
    /// Delay between laser bounces
    pub laser_bounce_delay_ms: i32,
    /// Max laser bounces
    pub laser_bounce_num: i32,
    /// Reach lost per bounce
    pub laser_bounce_cost: Fixed,
    /// Characters push each other apart
    pub player_collision: bool,
    /// Hooks can grab characters
    pub player_hooking: bool,
}

/// Convert a curvature given per pixel to per tile.
const fn curvature(per_pixel: f64) -> Fixed {
    to_fixed(per_pixel * 32.0 / 10000.0)
}

impl Default for Tuning {
    fn default() -> Self {
        Self {
            ground_control_speed: px(10),
            ground_control_accel: pxf(2.0),
            ground_friction: to_fixed(0.5),
            ground_jump_impulse: pxf(13.2),
            air_jump_impulse: pxf(12.0),
            air_control_speed: pxf(5.0),
            air_control_accel: pxf(1.5),
            air_friction: to_fixed(0.95),
            hook_length: px(380),
            hook_fire_speed: px(80),
            hook_drag_accel: pxf(3.0),
            hook_drag_speed: pxf(15.0),
            hook_duration_ticks: 60,
            gravity: pxf(0.5),
            gun_curvature: curvature(1.25),
            gun_speed: pxf(2200.0),
            gun_lifetime_ms: 2000,
            shotgun_curvature: curvature(1.25),
            shotgun_speed: pxf(2750.0),
            shotgun_speeddiff: to_fixed(0.8),
            shotgun_lifetime_ms: 200,
            grenade_curvature: curvature(7.0),
            grenade_speed: pxf(1000.0),
            grenade_lifetime_ms: 2000,
            laser_reach: px(800),
            laser_bounce_delay_ms: 150,
            laser_bounce_num: 1,
            laser_bounce_cost: 0,
            player_collision: true,
            player_hooking: true,
        }
    }
}

/// Milliseconds to ticks at the given tick speed.
#[inline]
pub fn ms_to_ticks(ms: i32, tick_speed: i32) -> i32 {
    ms * tick_speed / 1000
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fixed::PIXEL;

    #[test]
    fn test_default_conversions() {
        let t = Tuning::default();
        assert_eq!(t.ground_control_speed, 10 * PIXEL);
        assert_eq!(t.gravity, PIXEL / 2);
        assert_eq!(t.hook_length, px(380));
        assert!(t.gun_curvature > 0 && t.gun_curvature < t.grenade_curvature);
    }

    #[test]
    fn test_ms_to_ticks() {
        assert_eq!(ms_to_ticks(125, 50), 6);
        assert_eq!(ms_to_ticks(500, 50), 25);
        assert_eq!(ms_to_ticks(15000, 50), 750);
    }
}
