//! Local physics simulation
//!
//! Everything the world does lives here. Like the rest of the crate it has no
//! rendering or platform dependencies:
//! - Time comes in as an argument (virtual clock in tests)
//! - Seeded RNG only
//! - Stable iteration order (by body ID)

pub mod body;
pub mod growth;
pub mod interaction;
pub mod schedule;
pub mod spawner;
pub mod world;

/// Engine clock in milliseconds
pub type Millis = f64;

pub use body::{Body, BodyId, BodyKind};
pub use growth::{GrowthPhase, GrowthPolicy};
pub use interaction::{InteractionContext, InteractionRule};
pub use schedule::{ScaleScheduler, Throttle};
pub use spawner::{AmbientSpawner, AmbientSpec};
pub use world::World;
