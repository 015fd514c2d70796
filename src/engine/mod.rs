//! The hunt engine: configuration, state machine, and worker lifecycle.

pub mod channel;
pub mod config;
pub mod events;
pub mod machine;
pub mod runner;
pub mod scan;
pub mod state;

pub use config::{load_config, HuntConfig};
pub use events::HuntEvent;
pub use runner::HuntBot;
pub use state::{HuntSnapshot, HuntState};
