//! Paced spawning of ambient bodies
//!
//! Requests queue up and are released one every spawn delay of engine time,
//! so a batch never stalls a tick.

use glam::Vec2;
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg32;

use super::Millis;
use crate::Tuning;
use crate::consts::*;
use crate::sync::PeerId;

/// Everything needed to create one ambient body
#[derive(Debug, Clone, PartialEq)]
pub struct AmbientSpec {
    pub pos: Vec2,
    pub radius: f32,
    pub seed: String,
}

#[derive(Debug, Clone)]
pub struct AmbientSpawner {
    pending: usize,
    next_due: Millis,
    spawned: usize,
    delay: Millis,
    rng: Pcg32,
}

impl AmbientSpawner {
    pub fn new(tuning: &Tuning, seed: u64) -> Self {
        Self {
            pending: 0,
            next_due: 0.0,
            spawned: 0,
            delay: tuning.ambient_spawn_delay_ms,
            rng: Pcg32::seed_from_u64(seed),
        }
    }

    /// Queue `count` more spawns. The first one is due immediately if the
    /// queue was idle.
    pub fn request(&mut self, count: usize, now: Millis) {
        if count == 0 {
            return;
        }
        if self.pending == 0 {
            self.next_due = now;
        }
        self.pending += count;
    }

    /// Release every spawn that has come due by `now`
    pub fn poll(&mut self, now: Millis, viewport: Vec2) -> Vec<AmbientSpec> {
        let mut out = Vec::new();
        while self.pending > 0 && now >= self.next_due {
            out.push(self.roll(viewport));
            self.pending -= 1;
            self.spawned += 1;
            self.next_due += self.delay;
        }
        out
    }

    /// Drop everything still queued
    pub fn cancel(&mut self) {
        if self.pending > 0 {
            log::debug!("Cancelled {} queued ambient spawns", self.pending);
        }
        self.pending = 0;
    }

    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Total ambient bodies released so far
    pub fn spawned(&self) -> usize {
        self.spawned
    }

    fn roll(&mut self, viewport: Vec2) -> AmbientSpec {
        let max = viewport.x.max(viewport.y).max(1.0);
        let x = self.off_screen(max);
        let y = self.off_screen(max);
        AmbientSpec {
            pos: Vec2::new(x, y),
            radius: self.rng.random_range(AMBIENT_RADIUS_MIN..AMBIENT_RADIUS_MAX),
            seed: PeerId::generate(&mut self.rng).to_string(),
        }
    }

    /// One coordinate beyond the viewport on either side
    fn off_screen(&mut self, max: f32) -> f32 {
        if self.rng.random_bool(0.5) {
            self.rng.random_range(-max * 1.5..-max)
        } else {
            self.rng.random_range(max..max * 1.5)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Vec2 = Vec2::new(800.0, 600.0);

    #[test]
    fn test_batch_is_paced() {
        let mut spawner = AmbientSpawner::new(&Tuning::default(), 1);
        spawner.request(5, 0.0);
        assert_eq!(spawner.poll(0.0, VIEWPORT).len(), 1, "First is immediate");
        assert_eq!(spawner.poll(20.0, VIEWPORT).len(), 0);
        assert_eq!(spawner.poll(50.0, VIEWPORT).len(), 1);
        assert_eq!(spawner.poll(200.0, VIEWPORT).len(), 3, "Catches up after a long step");
        assert_eq!(spawner.pending(), 0);
        assert_eq!(spawner.spawned(), 5);
    }

    #[test]
    fn test_cancel_drops_queue() {
        let mut spawner = AmbientSpawner::new(&Tuning::default(), 1);
        spawner.request(10, 0.0);
        spawner.poll(0.0, VIEWPORT);
        spawner.cancel();
        assert_eq!(spawner.pending(), 0);
        assert!(spawner.poll(10_000.0, VIEWPORT).is_empty());
        assert_eq!(spawner.spawned(), 1);
    }

    #[test]
    fn test_specs_are_off_screen() {
        let mut spawner = AmbientSpawner::new(&Tuning::default(), 42);
        spawner.request(50, 0.0);
        let specs = spawner.poll(10_000.0, VIEWPORT);
        assert_eq!(specs.len(), 50);
        for spec in specs {
            for c in [spec.pos.x, spec.pos.y] {
                assert!(c.abs() >= 800.0 && c.abs() <= 1200.0, "Coordinate {} on screen", c);
            }
            assert!(spec.radius >= 4.0 && spec.radius < 10.0);
            assert_eq!(spec.seed.len(), PEER_ID_LEN);
        }
    }

    #[test]
    fn test_same_seed_same_layout() {
        let mut a = AmbientSpawner::new(&Tuning::default(), 7);
        let mut b = AmbientSpawner::new(&Tuning::default(), 7);
        a.request(3, 0.0);
        b.request(3, 0.0);
        assert_eq!(a.poll(1000.0, VIEWPORT), b.poll(1000.0, VIEWPORT));
    }
}
