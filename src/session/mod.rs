mod controller;
mod state;

pub use controller::{FinalizeOutcome, KioskController, KioskEvent, StepOutcome};
pub use state::{visible_actions, Action, PendingBill, SessionSnapshot, SessionState, SessionStatus};
