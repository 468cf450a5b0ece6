//! Peer synchronization
//!
//! The presence boundary, the connection → body registry and the
//! reconciliation that keeps the two in step.

pub mod presence;
pub mod reconcile;
pub mod registry;

pub use presence::{
    ChangeSet, ConnectionId, MemoryPresence, PeerId, PeerState, Position, PresenceHub,
    PresenceStore, Snapshot,
};
pub use reconcile::{Reconciler, SessionEvent, diff_snapshot};
pub use registry::BodyRegistry;
