pub mod directory;
pub mod event;

pub use directory::{Group, Person};
pub use event::{ApproveEvent, EntitlementEvent, EventKind, RevokeEvent};
