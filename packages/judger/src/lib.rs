pub mod config;
pub mod error;
pub mod executor;
pub mod sandbox;
pub mod scheduler;

pub use config::{JudgerAppConfig, JudgerConfig};
pub use error::{JudgerError, Result};
pub use executor::{Execute, Executor};
pub use sandbox::{IsolateSandbox, Sandbox};
pub use scheduler::{Disposition, Scheduler, SlotPool};
