pub mod metrics;
pub mod policy;
pub mod reconcile;

pub use metrics::{init_metrics, record_event, render_metrics};
pub use policy::GroupCreationPolicy;
pub use reconcile::{Outcome, Reconciler};
