//! Pairwise attractor rule
//!
//! Evaluated by the world for body pairs where at least one side carries the
//! rule. A pair in contact exchanges scale (the ball drawn smaller feeds the
//! larger one) and gets no force; a pair apart is pulled together, more strongly as
//! the session score climbs.

use glam::Vec2;

use super::Millis;
use super::body::Body;
use crate::Tuning;
use crate::score_growth_factor;

/// Session capabilities the rule reads while evaluating
#[derive(Debug, Clone, Copy)]
pub struct InteractionContext {
    /// Current score (elapsed seconds once the score is showing)
    pub score: u64,
    /// Global toggle for the attraction term
    pub attraction: bool,
}

impl Default for InteractionContext {
    fn default() -> Self {
        Self {
            score: 0,
            attraction: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct InteractionRule {
    tuning: Tuning,
}

impl InteractionRule {
    pub fn new(tuning: Tuning) -> Self {
        Self { tuning }
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    /// Circle overlap test on the radii the physics currently knows
    pub fn in_contact(a: &Body, b: &Body) -> bool {
        let reach = a.physical_radius() + b.physical_radius();
        a.pos.distance_squared(b.pos) < reach * reach
    }

    /// Evaluate the rule owned by `a` against `b`.
    ///
    /// Returns the force to apply to `b` (and its negation to `a`), or `None`
    /// when the pair is touching and scale was exchanged instead.
    pub fn attractor(
        &self,
        ctx: &InteractionContext,
        a: &mut Body,
        b: &mut Body,
        now: Millis,
    ) -> Option<Vec2> {
        if Self::in_contact(a, b) {
            self.exchange(a, b, now);
            return None;
        }

        if a.scale < 1.0 && a.recovery.try_fire(now) {
            let recovered = (a.scale + self.tuning.recover_step).min(1.0);
            a.set_scale(recovered, now);
        }

        if !ctx.attraction {
            return Some(Vec2::ZERO);
        }
        Some(self.attraction(ctx, a, b))
    }

    /// Pull of `a` on `b`: proportional to separation, the target's scale and
    /// the score growth factor.
    pub fn attraction(&self, ctx: &InteractionContext, a: &Body, b: &Body) -> Vec2 {
        (a.pos - b.pos) * self.tuning.attraction_k * b.scale * score_growth_factor(ctx.score)
    }

    /// Larger eats smaller, by drawn radius. On a tie the rule owner gives way.
    fn exchange(&self, a: &mut Body, b: &mut Body, now: Millis) {
        let (loser, winner) = if a.visual_radius() <= b.visual_radius() {
            (a, b)
        } else {
            (b, a)
        };

        if loser.scale > self.tuning.min_scale {
            let shrunk = (loser.scale - self.tuning.shrink_step).max(self.tuning.min_scale);
            loser.set_scale(shrunk, now);
        }
        if winner.scale < self.tuning.max_scale {
            let grown = (winner.scale + self.tuning.grow_step).min(self.tuning.max_scale);
            winner.set_scale(grown, now);
        }
    }
}
