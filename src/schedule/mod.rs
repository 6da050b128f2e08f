//! Watering schedule core: lookup tables, persisted state, the due-pump
//! evaluator and the remaining-duration projector.

pub mod evaluator;
pub mod projector;
pub mod state;
pub mod tables;

pub use evaluator::{Activation, EvaluationOutcome, EvaluationReport, run_due_pumps};
pub use projector::{Projection, project_remaining_days};
pub use state::{PumpSlot, ScheduleState, WaterBudget};
pub use tables::{Amount, Frequency};
