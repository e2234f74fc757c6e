// ABOUTME: Live-update step declarations, validation, and the executable patch plan.
// ABOUTME: Declared steps are tracked per evaluation session until a live update consumes them.

mod error;
mod model;
mod path_set;
mod position;
mod session;
mod step;

pub use error::{LiveUpdateError, StepError};
pub use model::{FallBackOnStep, LiveUpdate, PlanViolation, RunStep, Step, SyncStep};
pub use path_set::PathSet;
pub use position::DeclarationPos;
pub use session::DeclarationSession;
pub use step::{LiveUpdateStep, StepSpec};
