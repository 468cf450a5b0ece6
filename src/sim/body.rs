//! Circle bodies living in the simulation world

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::Millis;
use super::schedule::{ScaleScheduler, Throttle};
use crate::consts::*;
use crate::heading;

/// Handle of a body inside a [`super::World`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BodyId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BodyKind {
    /// The local player's ball (exactly one per session)
    Player,
    /// Mirror of a remote peer's ball, driven by presence state
    Remote,
    /// Decorative ball with no owner
    Ambient,
}

/// A circular body
#[derive(Debug, Clone)]
pub struct Body {
    pub id: BodyId,
    pub kind: BodyKind,
    pub pos: Vec2,
    /// Velocity in pixels per step
    pub vel: Vec2,
    /// Force accumulated during the current step
    pub force: Vec2,
    /// Facing angle (radians)
    pub angle: f32,
    /// Radius at scale 1.0
    pub radius: f32,
    /// Visual scale, changes on every contact
    pub scale: f32,
    /// Scale the physics sees; trails `scale` through `scale_schedule`
    pub physical_scale: f32,
    pub opacity: f32,
    /// Avatar seed used for the texture
    pub texture_seed: String,
    /// Whether this body carries the pairwise interaction rule
    pub attractor: bool,
    pub scale_schedule: ScaleScheduler,
    pub recovery: Throttle,
}

impl Body {
    pub fn new(kind: BodyKind, pos: Vec2, radius: f32, texture_seed: impl Into<String>) -> Self {
        Self {
            id: BodyId(0),
            kind,
            pos,
            vel: Vec2::ZERO,
            force: Vec2::ZERO,
            angle: 0.0,
            radius,
            scale: 1.0,
            physical_scale: 1.0,
            opacity: 1.0,
            texture_seed: texture_seed.into(),
            attractor: false,
            scale_schedule: ScaleScheduler::new(SCALE_DEBOUNCE_MS),
            recovery: Throttle::new(RECOVER_INTERVAL_MS),
        }
    }

    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_attractor(mut self, attractor: bool) -> Self {
        self.attractor = attractor;
        self
    }

    /// Radius the collision test uses
    #[inline]
    pub fn physical_radius(&self) -> f32 {
        self.radius * self.physical_scale
    }

    /// Radius as drawn
    #[inline]
    pub fn visual_radius(&self) -> f32 {
        self.radius * self.scale
    }

    /// Mass from area, matching the engine's default density
    pub fn mass(&self) -> f32 {
        let r = self.physical_radius();
        BODY_DENSITY * std::f32::consts::PI * r * r
    }

    /// Change the visual scale now and queue the physical rescale
    pub fn set_scale(&mut self, scale: f32, now: Millis) {
        self.scale = scale;
        self.scale_schedule.request(scale, now);
    }

    /// Ease toward a target point and face it. The step is proportional to
    /// the visual scale, so relative to its own size every ball is equally quick.
    pub fn steer_toward(&mut self, target: Vec2, gain: f32) {
        self.pos += (target - self.pos) * gain * self.scale;
        self.angle = heading(target - self.pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_body_defaults() {
        let body = Body::new(BodyKind::Ambient, Vec2::new(1.0, 2.0), 5.0, "seed");
        assert_eq!(body.scale, 1.0);
        assert_eq!(body.physical_scale, 1.0);
        assert_eq!(body.opacity, 1.0);
        assert!(!body.attractor);
        assert_eq!(body.physical_radius(), 5.0);
    }

    #[test]
    fn test_set_scale_defers_physics() {
        let mut body = Body::new(BodyKind::Player, Vec2::ZERO, 40.0, "p");
        body.set_scale(1.5, 0.0);
        assert_eq!(body.scale, 1.5);
        assert_eq!(body.physical_scale, 1.0, "Physical scale waits for the scheduler");
        assert_eq!(body.visual_radius(), 60.0);
    }

    #[test]
    fn test_steer_toward_target() {
        let mut body = Body::new(BodyKind::Player, Vec2::ZERO, 40.0, "p");
        body.steer_toward(Vec2::new(100.0, 0.0), 0.05);
        assert!((body.pos.x - 5.0).abs() < 1e-5);
        assert_eq!(body.pos.y, 0.0);
        assert!(body.angle.abs() < 1e-6, "Facing +x");

        body.steer_toward(Vec2::new(5.0, 100.0), 0.05);
        assert!((body.angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5, "Facing +y");
    }

    #[test]
    fn test_bigger_body_steers_further() {
        let mut small = Body::new(BodyKind::Player, Vec2::ZERO, 40.0, "p");
        let mut big = small.clone();
        big.scale = 2.0;
        small.steer_toward(Vec2::new(100.0, 0.0), 0.05);
        big.steer_toward(Vec2::new(100.0, 0.0), 0.05);
        assert!(big.pos.x > small.pos.x);
    }

    #[test]
    fn test_mass_grows_with_physical_scale() {
        let mut body = Body::new(BodyKind::Ambient, Vec2::ZERO, 10.0, "a");
        let before = body.mass();
        body.physical_scale = 2.0;
        assert!((body.mass() - before * 4.0).abs() < 1e-4);
    }
}
