pub mod classifier;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod io;
pub mod paths;
pub mod performance;
pub mod registry;
pub mod state;
pub mod store;
pub mod types;

pub use error::{LowcodeError, Result};
