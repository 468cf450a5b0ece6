//! Property tests for peer reconciliation and the interaction rule

use std::collections::BTreeSet;

use glam::Vec2;
use proptest::prelude::*;

use magmag::consts::SIM_DT_MS;
use magmag::sim::{Body, BodyKind, GrowthPolicy, InteractionContext, World};
use magmag::sync::{
    BodyRegistry, ConnectionId, MemoryPresence, PeerState, PresenceHub, PresenceStore, Snapshot,
    diff_snapshot,
};
use magmag::{Session, Tuning};

const SLOTS: usize = 4;

#[derive(Debug, Clone)]
enum Op {
    /// Connect a peer and publish a full state
    Join(usize, f32, f32),
    /// Connect a peer that has not published a position yet
    Partial(usize),
    /// Publish a new position
    Move(usize, f32, f32),
    /// Withdraw the state and disconnect
    Leave(usize),
    /// Transport-side timeout
    Drop(usize),
    /// Local engine step (publishes our own state)
    Tick,
    /// Deliver queued notifications to the local session
    Pump,
}

fn op() -> impl Strategy<Value = Op> {
    let slot = 0..SLOTS;
    let coord = -2000.0f32..2000.0;
    prop_oneof![
        (slot.clone(), coord.clone(), coord.clone()).prop_map(|(s, x, y)| Op::Join(s, x, y)),
        slot.clone().prop_map(Op::Partial),
        (slot.clone(), coord.clone(), coord).prop_map(|(s, x, y)| Op::Move(s, x, y)),
        slot.clone().prop_map(Op::Leave),
        slot.prop_map(Op::Drop),
        Just(Op::Tick),
        Just(Op::Pump),
    ]
}

fn at(x: f32, y: f32) -> PeerState {
    PeerState {
        position: Some(Vec2::new(x, y).into()),
        ..Default::default()
    }
}

fn pump(session: &mut Session<MemoryPresence>) {
    for change in session.presence().drain_changes() {
        session.on_presence_change(&change);
    }
}

fn quiet() -> Tuning {
    Tuning {
        initial_ambient: 0,
        ..Default::default()
    }
}

/// Presence whose map is edited directly, with no change notifications
struct SilentStore {
    id: ConnectionId,
    states: Snapshot,
}

impl PresenceStore for SilentStore {
    fn client_id(&self) -> ConnectionId {
        self.id
    }

    fn states(&self) -> Snapshot {
        self.states.clone()
    }

    fn set_local_state(&mut self, state: Option<PeerState>) {
        match state {
            Some(state) => self.states.insert(self.id, state),
            None => self.states.remove(&self.id),
        };
    }
}

proptest! {
    #[test]
    fn prop_registry_converges_to_snapshot(ops in prop::collection::vec(op(), 1..60)) {
        let hub = PresenceHub::new();
        let mut session = Session::new(hub.connect(), quiet(), 9);
        let local = session.presence().client_id();
        session.start();

        let mut slots: Vec<Option<MemoryPresence>> = (0..SLOTS).map(|_| None).collect();
        let mut time = 0.0;

        for op in ops {
            match op {
                Op::Join(s, x, y) => {
                    if slots[s].is_none() {
                        let mut peer = hub.connect();
                        peer.set_local_state(Some(at(x, y)));
                        slots[s] = Some(peer);
                    }
                }
                Op::Partial(s) => {
                    if slots[s].is_none() {
                        let mut peer = hub.connect();
                        peer.set_local_state(Some(PeerState::default()));
                        slots[s] = Some(peer);
                    }
                }
                Op::Move(s, x, y) => {
                    if let Some(peer) = slots[s].as_mut() {
                        peer.set_local_state(Some(at(x, y)));
                    }
                }
                Op::Leave(s) => {
                    if let Some(mut peer) = slots[s].take() {
                        peer.set_local_state(None);
                    }
                }
                Op::Drop(s) => {
                    if let Some(peer) = slots[s].take() {
                        hub.drop_connection(peer.client_id());
                    }
                }
                Op::Tick => {
                    time += SIM_DT_MS;
                    session.tick(time);
                }
                Op::Pump => pump(&mut session),
            }

            prop_assert!(!session.registry().contains(local), "Local player registered as remote");
        }

        pump(&mut session);

        let expected: BTreeSet<ConnectionId> = hub
            .peers()
            .into_iter()
            .filter(|id| *id != local)
            .filter(|id| hub.state(*id).and_then(|s| s.valid_position()).is_some())
            .collect();
        let actual: BTreeSet<ConnectionId> = session.registry().ids().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(session.world().count(BodyKind::Remote), session.registry().len());
    }

    #[test]
    fn prop_silent_shrink_removes_vanished_peers(
        initial in prop::collection::btree_set(2u64..20, 0..10),
        kept in prop::collection::btree_set(2u64..20, 0..10),
    ) {
        let mut states = Snapshot::new();
        for id in &initial {
            states.insert(ConnectionId(*id), at(*id as f32, 0.0));
        }
        let store = SilentStore { id: ConnectionId(1), states };
        let mut session = Session::new(store, quiet(), 5);
        session.start();
        prop_assert_eq!(session.registry().len(), initial.len());

        session.presence_mut().states.retain(|id, _| kept.contains(&id.0));
        session.tick(0.0);

        let expected: BTreeSet<ConnectionId> =
            initial.intersection(&kept).map(|id| ConnectionId(*id)).collect();
        let actual: BTreeSet<ConnectionId> = session.registry().ids().collect();
        prop_assert_eq!(actual, expected);
        prop_assert_eq!(session.world().count(BodyKind::Remote), session.registry().len());
    }

    #[test]
    fn prop_scale_stays_within_limits(
        bodies in prop::collection::vec((-60.0f32..60.0, -60.0f32..60.0, 0.2f32..=3.0), 2..6),
        steps in 1usize..400,
    ) {
        let tuning = Tuning::default();
        let mut world = World::new(tuning.clone());
        for (x, y, scale) in bodies {
            let mut body =
                Body::new(BodyKind::Player, Vec2::new(x, y), 40.0, "p").with_attractor(true);
            body.scale = scale;
            world.spawn(body);
        }

        let ctx = InteractionContext::default();
        for step in 0..steps {
            world.step(&ctx, step as f64 * SIM_DT_MS, SIM_DT_MS);
            for body in world.bodies() {
                prop_assert!(body.scale >= tuning.min_scale, "Scale {} below min", body.scale);
                prop_assert!(body.scale <= tuning.max_scale, "Scale {} above max", body.scale);
                prop_assert!(body.physical_scale >= tuning.min_scale);
                prop_assert!(body.physical_scale <= tuning.max_scale);
            }
        }
    }

    #[test]
    fn prop_growth_is_monotonic(deltas in prop::collection::vec(0.0f64..2500.0, 1..300)) {
        let mut growth = GrowthPolicy::default();
        let mut time = 0.0;
        let mut was_showing = false;
        let mut last_score = 0;
        let mut last_size = growth.text_size;

        for dt in deltas {
            time += dt;
            growth.advance(time, 0);
            if was_showing {
                prop_assert!(growth.is_showing_score(), "Regressed to the title");
                prop_assert!(growth.score >= last_score);
                prop_assert!(growth.text_size >= last_size);
            }
            was_showing = growth.is_showing_score();
            last_score = growth.score;
            last_size = growth.text_size;
        }
    }

    #[test]
    fn prop_pull_diff_is_one_directional(
        snapshot_ids in prop::collection::btree_set(0u64..12, 0..8),
        registry_ids in prop::collection::btree_set(0u64..12, 0..8),
    ) {
        let local = ConnectionId(0);
        let snapshot: Snapshot = snapshot_ids
            .iter()
            .map(|id| (ConnectionId(*id), at(0.0, 0.0)))
            .collect();
        let mut registry = BodyRegistry::new();
        for (i, id) in registry_ids.iter().filter(|id| **id != 0).enumerate() {
            registry.add(ConnectionId(*id), magmag::sim::BodyId(i as u32)).expect("fresh id");
        }

        let diff = diff_snapshot(local, &snapshot, &registry);
        prop_assert!(diff.added.is_empty() || diff.removed.is_empty());
        prop_assert!(!diff.added.contains(&local));
        for id in &diff.added {
            prop_assert!(!registry.contains(*id));
        }
        for id in &diff.removed {
            prop_assert!(!snapshot.contains_key(id));
        }
    }
}
