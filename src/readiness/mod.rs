pub mod controller;
pub mod probe;
pub mod state;

pub use controller::{ReadinessController, ReadinessSnapshot};
pub use probe::{HealthCheck, HttpHealthProbe};
pub use state::{ProbeOutcome, ReadinessMachine, ReadinessStatus, TransitionError};
