//! psiwatch Core Library
//!
//! Registers Pressure Stall Information (PSI) triggers for CPU, IO and memory,
//! waits on all three at once, and reports each distress event the kernel signals.
//! Observation only: nothing here throttles or kills anything.

pub mod domain;
pub mod error;
pub mod kernel;
pub mod psi;
pub mod registrar;
pub mod reporter;
pub mod shutdown;
pub mod signals;
pub mod source;
pub mod waiter;

pub use domain::{Domain, Trigger, PRESSURE_ROOT};
pub use error::{exit_code, Error, Result};
pub use kernel::verify_interface;
pub use psi::{PressureRecord, PressureSnapshot};
pub use registrar::{Registration, ThresholdRegistrar};
pub use reporter::{Clock, EventRecord, EventReporter, LocalClock};
pub use shutdown::{Pause, RunState, ShutdownCoordinator, ShutdownState, ThreadPause};
pub use signals::TerminationSignals;
pub use source::{PressureContent, PressureSource, CONTENT_LIMIT};
pub use waiter::{PollWaiter, Readiness, Signal, Waiter, Wake};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
