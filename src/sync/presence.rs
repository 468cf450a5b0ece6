//! Presence (awareness) boundary
//!
//! Every participant owns one entry in a shared map keyed by its connection
//! id. Writes are full overwrites and the last writer wins per key. Readers
//! get the whole map plus change notifications listing which keys were
//! added, updated or removed.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use glam::Vec2;
use rand::Rng;
use rand::distr::Alphanumeric;
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::consts::PEER_ID_LEN;

/// Transport-level key of a presence entry, stable for the session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// User-facing identity seed (drives the avatar), independent of the connection
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Random alphanumeric token
    pub fn generate<R: Rng>(rng: &mut R) -> Self {
        let token = (0..PEER_ID_LEN)
            .map(|_| char::from(rng.sample(Alphanumeric)))
            .collect::<String>();
        Self(token)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn is_valid(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Self { x: v.x, y: v.y }
    }
}

impl From<Position> for Vec2 {
    fn from(p: Position) -> Self {
        Vec2::new(p.x, p.y)
    }
}

/// One participant's published state.
///
/// Every field is optional on the wire: older or partial writes may omit
/// any of them, and an absent field means "no change".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PeerState {
    #[serde(rename = "id", default, skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<ConnectionId>,
    #[serde(rename = "uid", default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<PeerId>,
    #[serde(rename = "pos", default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Position>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub angle: Option<f32>,
}

impl PeerState {
    /// A complete state as written by the local player every tick
    pub fn full(
        connection_id: ConnectionId,
        peer_id: PeerId,
        pos: Vec2,
        scale: f32,
        angle: f32,
    ) -> Self {
        Self {
            connection_id: Some(connection_id),
            peer_id: Some(peer_id),
            position: Some(pos.into()),
            scale: Some(scale),
            angle: Some(angle),
        }
    }

    /// Position, if present and finite
    pub fn valid_position(&self) -> Option<Vec2> {
        self.position.filter(Position::is_valid).map(Vec2::from)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Full presence map: connection id → last-written state
pub type Snapshot = BTreeMap<ConnectionId, PeerState>;

/// Change notification delivered after every presence mutation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChangeSet {
    pub added: Vec<ConnectionId>,
    pub removed: Vec<ConnectionId>,
    pub updated: Vec<ConnectionId>,
}

impl ChangeSet {
    pub fn added(ids: impl IntoIterator<Item = ConnectionId>) -> Self {
        Self {
            added: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn removed(ids: impl IntoIterator<Item = ConnectionId>) -> Self {
        Self {
            removed: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn updated(ids: impl IntoIterator<Item = ConnectionId>) -> Self {
        Self {
            updated: ids.into_iter().collect(),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.updated.is_empty()
    }

    /// Copy with every list sorted and free of repeats
    pub fn deduped(&self) -> Self {
        fn clean(ids: &[ConnectionId]) -> Vec<ConnectionId> {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids.dedup();
            ids
        }
        Self {
            added: clean(&self.added),
            removed: clean(&self.removed),
            updated: clean(&self.updated),
        }
    }
}

/// The shared presence map as seen by one participant
pub trait PresenceStore {
    /// This participant's own key
    fn client_id(&self) -> ConnectionId;

    /// Current snapshot of every participant's state (including our own)
    fn states(&self) -> Snapshot;

    /// Overwrite our own entry. `None` announces an intentional departure.
    fn set_local_state(&mut self, state: Option<PeerState>);
}

#[derive(Debug, Default)]
struct HubInner {
    states: Snapshot,
    inboxes: BTreeMap<ConnectionId, Vec<ChangeSet>>,
    next_id: u64,
}

impl HubInner {
    fn broadcast(&mut self, change: ChangeSet) {
        for inbox in self.inboxes.values_mut() {
            inbox.push(change.clone());
        }
    }

    fn write(&mut self, id: ConnectionId, state: Option<PeerState>) {
        let change = match state {
            Some(state) => match self.states.insert(id, state.clone()) {
                None => ChangeSet::added([id]),
                Some(previous) if previous != state => ChangeSet::updated([id]),
                Some(_) => return,
            },
            None => {
                if self.states.remove(&id).is_none() {
                    return;
                }
                ChangeSet::removed([id])
            }
        };
        self.broadcast(change);
    }
}

/// In-memory awareness document shared by several local participants
/// (one per simulated tab). Single-threaded, like the browser transport.
#[derive(Debug, Clone, Default)]
pub struct PresenceHub {
    inner: Rc<RefCell<HubInner>>,
}

impl PresenceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join the document with a fresh connection id
    pub fn connect(&self) -> MemoryPresence {
        let mut inner = self.inner.borrow_mut();
        inner.next_id += 1;
        let id = ConnectionId(inner.next_id);
        inner.inboxes.insert(id, Vec::new());
        MemoryPresence {
            id,
            hub: self.inner.clone(),
        }
    }

    /// Drop a participant as the transport would after a timeout
    pub fn drop_connection(&self, id: ConnectionId) {
        self.inner.borrow_mut().write(id, None);
    }

    /// Connection ids that currently have a state
    pub fn peers(&self) -> Vec<ConnectionId> {
        self.inner.borrow().states.keys().copied().collect()
    }

    pub fn state(&self, id: ConnectionId) -> Option<PeerState> {
        self.inner.borrow().states.get(&id).cloned()
    }
}

/// One participant's handle on a [`PresenceHub`]
#[derive(Debug)]
pub struct MemoryPresence {
    id: ConnectionId,
    hub: Rc<RefCell<HubInner>>,
}

impl MemoryPresence {
    /// Change notifications received since the last call, oldest first
    pub fn drain_changes(&self) -> Vec<ChangeSet> {
        self.hub
            .borrow_mut()
            .inboxes
            .get_mut(&self.id)
            .map(std::mem::take)
            .unwrap_or_default()
    }
}

impl PresenceStore for MemoryPresence {
    fn client_id(&self) -> ConnectionId {
        self.id
    }

    fn states(&self) -> Snapshot {
        self.hub.borrow().states.clone()
    }

    fn set_local_state(&mut self, state: Option<PeerState>) {
        self.hub.borrow_mut().write(self.id, state);
    }
}

impl Drop for MemoryPresence {
    fn drop(&mut self) {
        let mut hub = self.hub.borrow_mut();
        hub.inboxes.remove(&self.id);
        hub.write(self.id, None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_pcg::Pcg32;

    fn state_at(x: f32, y: f32) -> PeerState {
        PeerState {
            position: Some(Position { x, y }),
            ..Default::default()
        }
    }

    #[test]
    fn test_peer_id_generation() {
        let mut rng = Pcg32::seed_from_u64(7);
        let a = PeerId::generate(&mut rng);
        let b = PeerId::generate(&mut rng);
        assert_eq!(a.as_str().len(), PEER_ID_LEN);
        assert!(a.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b, "Consecutive tokens should differ");
    }

    #[test]
    fn test_partial_state_parses() {
        let state = PeerState::from_json(r#"{ "id": 4, "uid": "abc" }"#).expect("parse");
        assert_eq!(state.connection_id, Some(ConnectionId(4)));
        assert_eq!(state.valid_position(), None);
        assert_eq!(state.scale, None);
    }

    #[test]
    fn test_full_state_uses_wire_names() {
        let state = PeerState::full(
            ConnectionId(9),
            PeerId::new("seed"),
            Vec2::new(1.0, 2.0),
            1.5,
            0.25,
        );
        let json = state.to_json().expect("serialize");
        assert!(json.contains(r#""pos":{"x":1.0,"y":2.0}"#));
        assert!(json.contains(r#""uid":"seed""#));
        assert_eq!(PeerState::from_json(&json).expect("parse"), state);
    }

    #[test]
    fn test_malformed_state_is_an_error() {
        assert!(PeerState::from_json(r#"{ "pos": { "x": "left" } }"#).is_err());
    }

    #[test]
    fn test_changeset_dedup() {
        let changes = ChangeSet {
            added: vec![ConnectionId(3), ConnectionId(1), ConnectionId(3)],
            removed: vec![ConnectionId(2), ConnectionId(2)],
            updated: vec![],
        };
        let clean = changes.deduped();
        assert_eq!(clean.added, vec![ConnectionId(1), ConnectionId(3)]);
        assert_eq!(clean.removed, vec![ConnectionId(2)]);
    }

    #[test]
    fn test_hub_reports_added_updated_removed() {
        let hub = PresenceHub::new();
        let observer = hub.connect();
        let mut writer = hub.connect();
        let id = writer.client_id();

        writer.set_local_state(Some(state_at(1.0, 1.0)));
        writer.set_local_state(Some(state_at(2.0, 1.0)));
        // Identical write produces no notification
        writer.set_local_state(Some(state_at(2.0, 1.0)));
        writer.set_local_state(None);

        let changes = observer.drain_changes();
        assert_eq!(
            changes,
            vec![
                ChangeSet::added([id]),
                ChangeSet::updated([id]),
                ChangeSet::removed([id]),
            ]
        );
        assert!(observer.drain_changes().is_empty(), "Inbox drained");
    }

    #[test]
    fn test_writer_sees_its_own_changes() {
        let hub = PresenceHub::new();
        let mut writer = hub.connect();
        writer.set_local_state(Some(state_at(0.5, 0.5)));
        assert_eq!(
            writer.drain_changes(),
            vec![ChangeSet::added([writer.client_id()])]
        );
    }

    #[test]
    fn test_dropped_handle_leaves_the_document() {
        let hub = PresenceHub::new();
        let observer = hub.connect();
        let id = {
            let mut writer = hub.connect();
            writer.set_local_state(Some(state_at(3.0, 4.0)));
            writer.client_id()
        };
        assert!(hub.peers().is_empty());
        let changes = observer.drain_changes();
        assert_eq!(changes.last(), Some(&ChangeSet::removed([id])));
    }

    #[test]
    fn test_drop_connection_removes_state() {
        let hub = PresenceHub::new();
        let mut writer = hub.connect();
        writer.set_local_state(Some(state_at(3.0, 4.0)));
        hub.drop_connection(writer.client_id());
        assert!(writer.states().is_empty());
        assert_eq!(hub.state(writer.client_id()), None);
    }
}
