pub mod config;
pub mod constants;
pub mod error;
pub mod graphdb;
pub mod logging;
pub mod metrics;
pub mod server;
pub mod state;
pub mod undl;

// Domain data shapes shared across layers
pub mod domain;

pub use config::Config;
pub use error::{ApiError, Result};
pub use state::AppState;
