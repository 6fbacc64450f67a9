pub mod config;
pub mod error;
pub mod gate;
pub mod io;
pub mod orchestrator;
pub mod paths;
pub mod poller;
pub mod probe;
pub mod retry;
pub mod rotation;
pub mod types;
pub mod watermark;

pub use error::{Result, SyncgateError};
