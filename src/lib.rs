//! Magmag - a multiplayer magnetic ball toy
//!
//! Core modules:
//! - `sim`: Simulation world (bodies, pairwise interaction rule, growth policy, ambient spawner)
//! - `sync`: Presence store boundary, body registry and peer reconciliation
//! - `session`: The per-player game session tying the tick loop together
//! - `avatar`: Deterministic avatar images from identity seeds
//! - `tuning`: Data-driven game balance
//! - `settings`: Persisted player preferences

pub mod avatar;
pub mod error;
pub mod session;
pub mod settings;
pub mod sim;
pub mod sync;
pub mod tuning;

pub use error::{Error, Result};
pub use session::Session;
pub use settings::Settings;
pub use tuning::{ReconcileMode, Tuning};

use glam::Vec2;

/// Game configuration constants
pub mod consts {
    /// Engine step length in milliseconds (60 Hz)
    pub const SIM_DT_MS: f64 = 1000.0 / 60.0;
    /// Longest step the engine will take after a stalled frame
    pub const MAX_DT_MS: f64 = 100.0;

    /// Default viewport when the host has not reported one yet
    pub const DEFAULT_VIEWPORT_WIDTH: f32 = 1280.0;
    pub const DEFAULT_VIEWPORT_HEIGHT: f32 = 720.0;

    /// Player and remote peer balls
    pub const PLAYER_RADIUS: f32 = 40.0;
    pub const REMOTE_OPACITY: f32 = 0.7;

    /// Scale limits and per-contact steps
    pub const MIN_SCALE: f32 = 0.2;
    pub const MAX_SCALE: f32 = 3.0;
    pub const SHRINK_STEP: f32 = 0.001;
    pub const GROW_STEP: f32 = 0.01;
    pub const RECOVER_STEP: f32 = 0.01;
    /// Minimum gap between two recovery nudges of the same body
    pub const RECOVER_INTERVAL_MS: f64 = 200.0;
    /// Physical scale is applied at most once per this window
    pub const SCALE_DEBOUNCE_MS: f64 = 1000.0;

    /// Attraction constant (force per pixel of separation)
    pub const ATTRACTION_K: f32 = 1e-7;
    /// Fraction of the pointer gap closed per tick
    pub const STEER_GAIN: f32 = 0.05;

    /// Matter-style body density and air friction
    pub const BODY_DENSITY: f32 = 0.001;
    pub const AIR_FRICTION: f32 = 0.01;
    /// Fraction of an overlap resolved per step
    pub const OVERLAP_CORRECTION: f32 = 0.2;

    /// Ambient (decorative) bodies
    pub const AMBIENT_OPACITY: f32 = 0.9;
    pub const AMBIENT_RADIUS_MIN: f32 = 4.0;
    pub const AMBIENT_RADIUS_MAX: f32 = 10.0;
    pub const INITIAL_AMBIENT: usize = 10;
    pub const AMBIENT_BATCH: usize = 5;
    pub const AMBIENT_CAP: usize = 100;
    pub const AMBIENT_SPAWN_DELAY_MS: f64 = 50.0;

    /// Title/score text growth
    pub const TEXT_START_SIZE: f32 = 128.0;
    pub const TEXT_CEILING: f32 = 1024.0;
    pub const SCORE_TEXT_SIZE: f32 = 128.0;
    pub const SCORE_TEXT_GROWTH: f32 = 0.1;
    pub const SCORE_MILESTONE_SECS: u64 = 10;

    /// Length of generated identity tokens
    pub const PEER_ID_LEN: usize = 16;
}

/// Growth factor applied to attraction as the score climbs
#[inline]
pub fn score_growth_factor(score: u64) -> f32 {
    1.0 + ((score as f32) + 1.0).ln() / 10.0
}

/// Facing angle of a vector, radians in (-π, π]
#[inline]
pub fn heading(v: Vec2) -> f32 {
    v.y.atan2(v.x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_growth_factor_starts_at_one() {
        assert_eq!(score_growth_factor(0), 1.0);
        assert!(score_growth_factor(100) > score_growth_factor(10));
    }

    #[test]
    fn test_heading() {
        assert!((heading(Vec2::new(0.0, 1.0)) - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!(heading(Vec2::new(1.0, 0.0)).abs() < 1e-6);
    }
}
