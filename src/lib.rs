pub mod config;
pub mod error;
pub mod handlers;
pub mod index;
pub mod range;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
