pub mod config;
pub mod error;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod process;
pub mod sheet;

pub use config::Config;
pub use error::EtlError;
pub use pipeline::{run, RunSummary};
