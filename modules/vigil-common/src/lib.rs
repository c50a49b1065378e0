pub mod config;
pub mod display;
pub mod error;
pub mod types;

pub use config::{Config, DashboardContext, Theme};
pub use error::{Result, VigilError};
pub use types::*;
