pub mod config;
pub mod error;
pub mod types;

pub use config::EngineConfig;
pub use error::{EvError, Result};
pub use types::{CellId, EvType, Step, Tick};
