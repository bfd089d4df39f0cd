mod config;
mod error;
mod recorder;

pub use config::RecorderConfig;
pub use error::{Error, Result};
pub use recorder::Recorder;
