//! One player's game session
//!
//! Owns the world, the body registry and the presence handle, and is the
//! single writer for all of them. The host drives two entry points:
//! [`Session::tick`] once per engine step and [`Session::on_presence_change`]
//! whenever the presence store reports a change.

use glam::Vec2;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::consts::*;
use crate::sim::{
    AmbientSpawner, Body, BodyId, BodyKind, GrowthPolicy, InteractionContext, Millis, World,
};
use crate::sync::{
    BodyRegistry, ChangeSet, ConnectionId, PeerId, PeerState, PresenceStore, Reconciler,
    SessionEvent, Snapshot, diff_snapshot,
};
use crate::{ReconcileMode, Tuning};

pub struct Session<P: PresenceStore> {
    presence: P,
    tuning: Tuning,
    world: World,
    registry: BodyRegistry,
    growth: GrowthPolicy,
    spawner: AmbientSpawner,
    peer_id: PeerId,
    player: Option<BodyId>,
    /// Last pointer position; `None` until the pointer has moved once
    pointer: Option<Vec2>,
    viewport: Vec2,
    attraction: bool,
    running: bool,
    /// Engine clock
    now: Millis,
    last_tick: Option<f64>,
    events: Vec<SessionEvent>,
    rng: Pcg32,
}

impl<P: PresenceStore> Session<P> {
    pub fn new(presence: P, tuning: Tuning, seed: u64) -> Self {
        if let Err(err) = tuning.validate() {
            log::warn!("Running with questionable tuning: {}", err);
        }
        let mut rng = Pcg32::seed_from_u64(seed);
        let peer_id = PeerId::generate(&mut rng);
        let spawner = AmbientSpawner::new(&tuning, rng.random());
        Self {
            presence,
            world: World::new(tuning.clone()),
            registry: BodyRegistry::new(),
            growth: GrowthPolicy::from_tuning(&tuning),
            spawner,
            tuning,
            peer_id,
            player: None,
            pointer: None,
            viewport: Vec2::new(DEFAULT_VIEWPORT_WIDTH, DEFAULT_VIEWPORT_HEIGHT),
            attraction: true,
            running: false,
            now: 0.0,
            last_tick: None,
            events: Vec::new(),
            rng,
        }
    }

    /// Use a stored identity instead of the generated one
    pub fn with_identity(mut self, peer_id: PeerId) -> Self {
        self.peer_id = peer_id;
        self
    }

    pub fn presence(&self) -> &P {
        &self.presence
    }

    pub fn presence_mut(&mut self) -> &mut P {
        &mut self.presence
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn growth(&self) -> &GrowthPolicy {
        &self.growth
    }

    pub fn spawner(&self) -> &AmbientSpawner {
        &self.spawner
    }

    pub fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    pub fn player(&self) -> Option<&Body> {
        self.player.and_then(|id| self.world.get(id))
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn attraction(&self) -> bool {
        self.attraction
    }

    pub fn set_attraction(&mut self, enabled: bool) {
        self.attraction = enabled;
    }

    pub fn set_pointer(&mut self, pos: Vec2) {
        self.pointer = Some(pos);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = Vec2::new(width.max(1.0), height.max(1.0));
    }

    /// Pick a new identity (new avatar). Only allowed while stopped.
    pub fn regenerate_identity(&mut self) -> bool {
        if self.running {
            log::warn!("Cannot change identity while running");
            return false;
        }
        self.peer_id = PeerId::generate(&mut self.rng);
        if let Some(body) = self.player.and_then(|id| self.world.get_mut(id)) {
            body.texture_seed = self.peer_id.to_string();
        }
        log::info!("New identity {}", self.peer_id);
        true
    }

    /// Join/leave notices since the last call
    pub fn take_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start (or resume) the session and sync with everyone already present
    pub fn start(&mut self) {
        if self.running {
            return;
        }

        if self.player.is_none() {
            let centre = self.viewport / 2.0;
            let body = Body::new(
                BodyKind::Player,
                centre,
                self.tuning.player_radius,
                self.peer_id.to_string(),
            )
            .with_attractor(true);
            self.player = Some(self.world.spawn(body));
            self.spawner.request(self.tuning.initial_ambient, self.now);
        }

        self.running = true;
        log::info!("Session {} started as {}", self.presence.client_id(), self.peer_id);

        let snapshot = self.presence.states();
        let others = Self::everyone_else(self.presence.client_id(), &snapshot);
        self.reconcile(&others, &snapshot);
    }

    /// Every peer in `snapshot` except ourselves, as additions
    fn everyone_else(local: ConnectionId, snapshot: &Snapshot) -> ChangeSet {
        ChangeSet::added(snapshot.keys().copied().filter(|id| *id != local))
    }

    /// Pause the session. Remote bodies are dropped silently and rebuilt on
    /// the next start.
    pub fn stop(&mut self) {
        if !self.running {
            return;
        }
        self.running = false;
        self.last_tick = None;
        self.spawner.cancel();
        for body in self.registry.clear() {
            self.world.remove(body);
        }
        log::info!("Session {} stopped", self.presence.client_id());
    }

    /// Stop and withdraw our state from the presence store
    pub fn leave(&mut self) {
        self.stop();
        self.presence.set_local_state(None);
    }

    /// Presence change callback
    pub fn on_presence_change(&mut self, changes: &ChangeSet) {
        if !self.running {
            return;
        }
        // The pull fallback diffs on every tick instead
        if self.tuning.reconcile_mode == ReconcileMode::Push {
            let snapshot = self.presence.states();
            self.reconcile(changes, &snapshot);
        }
    }

    /// Advance one engine step. `timestamp` is the host clock in ms.
    pub fn tick(&mut self, timestamp: f64) {
        if !self.running {
            return;
        }

        let dt = match self.last_tick {
            Some(last) => (timestamp - last).clamp(0.0, MAX_DT_MS),
            None => SIM_DT_MS,
        };
        self.last_tick = Some(timestamp);
        self.now += dt;

        self.advance_growth();
        self.publish();

        let snapshot = self.presence.states();
        self.pull_remote(&snapshot);

        if let Some(target) = self.pointer
            && let Some(body) = self.player.and_then(|id| self.world.get_mut(id))
        {
            body.steer_toward(target, self.tuning.steer_gain);
        }

        let ctx = InteractionContext {
            score: self.growth.score,
            attraction: self.attraction,
        };
        self.world.step(&ctx, self.now, dt);

        if self.tuning.reconcile_mode == ReconcileMode::Pull {
            let diff = diff_snapshot(self.presence.client_id(), &snapshot, &self.registry);
            if !diff.is_empty() {
                self.reconcile(&diff, &snapshot);
            }
        }
    }

    fn advance_growth(&mut self) {
        let request = self.growth.advance(self.now, self.spawner.spawned());
        self.spawner.request(request, self.now);

        for spec in self.spawner.poll(self.now, self.viewport) {
            let body = Body::new(BodyKind::Ambient, spec.pos, spec.radius, spec.seed)
                .with_opacity(AMBIENT_OPACITY);
            self.world.spawn(body);
        }
    }

    fn publish(&mut self) {
        let Some(state) = self.player().map(|body| {
            PeerState::full(
                self.presence.client_id(),
                self.peer_id.clone(),
                body.pos,
                body.scale,
                body.angle,
            )
        }) else {
            return;
        };
        self.presence.set_local_state(Some(state));
    }

    /// Remote truth always overwrites the local mirror. Peers missing from
    /// the snapshot are gone, notification or not.
    fn pull_remote(&mut self, snapshot: &Snapshot) {
        let vanished: Vec<ConnectionId> = self
            .registry
            .ids()
            .filter(|id| !snapshot.contains_key(id))
            .collect();
        if !vanished.is_empty() {
            log::debug!("{} peers vanished from the snapshot", vanished.len());
            self.reconcile(&ChangeSet::removed(vanished), snapshot);
        }

        for (connection, body_id) in self.registry.iter() {
            let Some(state) = snapshot.get(&connection) else {
                continue;
            };
            let Some(pos) = state.valid_position() else {
                continue;
            };
            let Some(body) = self.world.get_mut(body_id) else {
                continue;
            };

            body.pos = pos;
            body.vel = Vec2::ZERO;
            if let Some(scale) = state.scale.filter(|s| s.is_finite()) {
                let scale = self.tuning.clamp_scale(scale);
                if scale != body.scale {
                    body.set_scale(scale, self.now);
                }
            }
            if let Some(angle) = state.angle.filter(|a| a.is_finite()) {
                body.angle = angle;
            }
        }
    }

    fn reconcile(&mut self, changes: &ChangeSet, snapshot: &Snapshot) {
        let events = Reconciler {
            world: &mut self.world,
            registry: &mut self.registry,
            local: self.presence.client_id(),
            tuning: &self.tuning,
        }
        .apply(changes, snapshot);
        self.events.extend(events);
    }
}
