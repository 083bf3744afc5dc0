// Baduanjin Live - session coordinator for the Pi pose relay
// Main library entry point

pub mod analysis;
pub mod config;
pub mod error;
pub mod relay;
pub mod session;

pub use config::Config;
pub use error::{RelayError, SessionError, WorkflowError};
pub use relay::{DeviceRelay, RelayClient};
pub use session::{
    format_duration, LiveCoordinator, LiveSnapshot, PollSettings, SaveOutcome, SavePhase,
    SaveRequest, SaveWorkflow, SessionSummary,
};
