//! Console and file logging built on [`tracing`].
//!
//! [`Logger`] turns engine progress into events under a few fixed targets;
//! [`init_subscriber`] decides how each target is rendered.

mod logger;
mod subscriber;
mod types;

pub use logger::Logger;
pub use subscriber::{LOG_ENV, init_subscriber, log_file_path};
pub use types::{
    Log, OUTCOME_TARGET, PhaseOutcome, PhaseStatus, SIMULATED_TARGET, STAGE_TARGET,
};
