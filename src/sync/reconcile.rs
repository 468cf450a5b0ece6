//! Peer reconciliation
//!
//! Keeps exactly one remote body per peer in the presence snapshot. The
//! canonical path consumes the added/removed lists carried by change
//! notifications; [`diff_snapshot`] is the older count-based fallback.

use glam::Vec2;

use super::presence::{ChangeSet, ConnectionId, PeerId, PeerState, Snapshot};
use super::registry::BodyRegistry;
use crate::Tuning;
use crate::sim::{Body, BodyKind, World};

/// Join/leave notices for the host to show
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    PeerJoined {
        connection: ConnectionId,
        peer: Option<PeerId>,
    },
    PeerLeft {
        connection: ConnectionId,
    },
}

/// Applies change sets to the world and registry of one session
pub struct Reconciler<'a> {
    pub world: &'a mut World,
    pub registry: &'a mut BodyRegistry,
    pub local: ConnectionId,
    pub tuning: &'a Tuning,
}

impl Reconciler<'_> {
    pub fn apply(&mut self, changes: &ChangeSet, snapshot: &Snapshot) -> Vec<SessionEvent> {
        let changes = changes.deduped();
        let mut events = Vec::new();

        for &id in &changes.added {
            if let Some(event) = self.join(id, snapshot.get(&id)) {
                events.push(event);
            }
        }

        for &id in &changes.removed {
            if let Some(event) = self.leave(id) {
                events.push(event);
            }
        }

        // Late joiners: their state was incomplete when they were added
        for &id in &changes.updated {
            if id == self.local || self.registry.contains(id) || changes.removed.contains(&id) {
                continue;
            }
            let Some(state) = snapshot.get(&id) else {
                continue;
            };
            if state.valid_position().is_some()
                && let Some(event) = self.join(id, Some(state))
            {
                events.push(event);
            }
        }

        events
    }

    /// Create the body for a newly seen peer
    pub fn join(&mut self, id: ConnectionId, state: Option<&PeerState>) -> Option<SessionEvent> {
        if id == self.local {
            log::debug!("Ignoring our own connection {}", id);
            return None;
        }
        let Some(state) = state else {
            log::debug!("Peer {} has no state yet", id);
            return None;
        };
        let Some(pos) = state.valid_position() else {
            log::debug!("Peer {} has not published a position yet", id);
            return None;
        };
        if self.registry.contains(id) {
            log::warn!("Peer {} already has a body, ignoring duplicate add", id);
            return None;
        }

        let body = self.world.spawn(remote_body(self.tuning, id, state, pos));
        if let Err(err) = self.registry.add(id, body) {
            log::warn!("{}", err);
            self.world.remove(body);
            return None;
        }

        log::info!("Peer {} joined", id);
        Some(SessionEvent::PeerJoined {
            connection: id,
            peer: state.peer_id.clone(),
        })
    }

    /// Detach a departed peer's body. Unknown ids are a no-op.
    pub fn leave(&mut self, id: ConnectionId) -> Option<SessionEvent> {
        let Some(body) = self.registry.remove(id) else {
            log::debug!("Peer {} left without a body", id);
            return None;
        };
        self.world.remove(body);
        log::info!("Peer {} left", id);
        Some(SessionEvent::PeerLeft { connection: id })
    }
}

fn remote_body(tuning: &Tuning, id: ConnectionId, state: &PeerState, pos: Vec2) -> Body {
    let seed = state
        .peer_id
        .as_ref()
        .map(PeerId::to_string)
        .unwrap_or_else(|| id.to_string());
    let mut body = Body::new(BodyKind::Remote, pos, tuning.player_radius, seed)
        .with_opacity(tuning.remote_opacity)
        .with_attractor(true);
    if let Some(scale) = state.scale.filter(|s| s.is_finite()) {
        let scale = tuning.clamp_scale(scale);
        body.scale = scale;
        body.physical_scale = scale;
    }
    if let Some(angle) = state.angle.filter(|a| a.is_finite()) {
        body.angle = angle;
    }
    body
}

/// Count-based diff of the snapshot against the registry.
///
/// Only one direction is synthesized per call: more peers than bodies yields
/// adds, fewer yields removes. A join and a leave landing in the same tick
/// leave the counts equal and go unnoticed.
pub fn diff_snapshot(
    local: ConnectionId,
    snapshot: &Snapshot,
    registry: &BodyRegistry,
) -> ChangeSet {
    let others: Vec<ConnectionId> = snapshot.keys().copied().filter(|id| *id != local).collect();

    match others.len().cmp(&registry.len()) {
        std::cmp::Ordering::Greater => {
            ChangeSet::added(others.into_iter().filter(|id| !registry.contains(*id)))
        }
        std::cmp::Ordering::Less => {
            ChangeSet::removed(registry.ids().filter(|id| !others.contains(id)))
        }
        std::cmp::Ordering::Equal => ChangeSet::default(),
    }
}
