//! The physics world: body storage and the fixed step

use glam::Vec2;

use super::Millis;
use super::body::{Body, BodyId, BodyKind};
use super::interaction::{InteractionContext, InteractionRule};
use super::schedule::{ScaleScheduler, Throttle};
use crate::Tuning;
use crate::consts::*;

/// Bodies are kept sorted by id so every step visits pairs in the same order
#[derive(Debug, Clone)]
pub struct World {
    bodies: Vec<Body>,
    next_id: u32,
    rule: InteractionRule,
}

impl World {
    pub fn new(tuning: Tuning) -> Self {
        Self {
            bodies: Vec::new(),
            next_id: 1,
            rule: InteractionRule::new(tuning),
        }
    }

    pub fn rule(&self) -> &InteractionRule {
        &self.rule
    }

    /// Attach a body and return its id
    pub fn spawn(&mut self, mut body: Body) -> BodyId {
        let tuning = self.rule.tuning();
        body.id = BodyId(self.next_id);
        body.scale_schedule = ScaleScheduler::new(tuning.scale_debounce_ms);
        body.recovery = Throttle::new(tuning.recover_interval_ms);
        self.next_id += 1;
        let id = body.id;
        self.bodies.push(body);
        id
    }

    /// Detach a body. Unknown ids are ignored.
    pub fn remove(&mut self, id: BodyId) -> Option<Body> {
        let index = self.index_of(id)?;
        Some(self.bodies.remove(index))
    }

    pub fn get(&self, id: BodyId) -> Option<&Body> {
        self.index_of(id).map(|i| &self.bodies[i])
    }

    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut Body> {
        self.index_of(id).map(move |i| &mut self.bodies[i])
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.index_of(id).is_some()
    }

    pub fn bodies(&self) -> &[Body] {
        &self.bodies
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn count(&self, kind: BodyKind) -> usize {
        self.bodies.iter().filter(|b| b.kind == kind).count()
    }

    fn index_of(&self, id: BodyId) -> Option<usize> {
        self.bodies.binary_search_by_key(&id, |b| b.id).ok()
    }

    /// Advance the world by one step of `dt_ms`.
    ///
    /// Order: pairwise rule, integration, overlap correction, then pending
    /// physical rescales.
    pub fn step(&mut self, ctx: &InteractionContext, now: Millis, dt_ms: f64) {
        self.apply_interactions(ctx, now);
        self.integrate(dt_ms as f32);
        self.separate();

        for body in &mut self.bodies {
            body.force = Vec2::ZERO;
            if let Some(scale) = body.scale_schedule.poll(now) {
                body.physical_scale = scale;
            }
        }
    }

    fn apply_interactions(&mut self, ctx: &InteractionContext, now: Millis) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.bodies.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);
                if !a.attractor && !b.attractor {
                    continue;
                }

                // The first owner evaluates; a contact exchange ends the pair
                let (owner, other) = if a.attractor { (a, b) } else { (b, a) };
                let Some(force) = self.rule.attractor(ctx, owner, other, now) else {
                    continue;
                };
                owner.force -= force;
                other.force += force;

                if other.attractor
                    && let Some(force) = self.rule.attractor(ctx, other, owner, now)
                {
                    other.force -= force;
                    owner.force += force;
                }
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in &mut self.bodies {
            // Remote mirrors are positioned from presence, not by the solver
            if body.kind == BodyKind::Remote {
                continue;
            }
            let accel = body.force / body.mass();
            body.vel = body.vel * (1.0 - AIR_FRICTION) + accel * dt * dt;
            body.pos += body.vel;
        }
    }

    /// Push overlapping bodies partly apart, remote mirrors act as immovable
    fn separate(&mut self) {
        let n = self.bodies.len();
        for i in 0..n {
            for j in (i + 1)..n {
                let (left, right) = self.bodies.split_at_mut(j);
                let (a, b) = (&mut left[i], &mut right[0]);

                let inv_a = inverse_mass(a);
                let inv_b = inverse_mass(b);
                let total = inv_a + inv_b;
                if total == 0.0 {
                    continue;
                }

                let delta = b.pos - a.pos;
                let dist = delta.length();
                let depth = a.physical_radius() + b.physical_radius() - dist;
                if depth <= 0.0 || dist == 0.0 {
                    continue;
                }

                let correction = delta / dist * depth * OVERLAP_CORRECTION;
                a.pos -= correction * (inv_a / total);
                b.pos += correction * (inv_b / total);
            }
        }
    }
}

fn inverse_mass(body: &Body) -> f32 {
    match body.kind {
        BodyKind::Remote => 0.0,
        _ => 1.0 / body.mass(),
    }
}
