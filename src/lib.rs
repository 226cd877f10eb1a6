pub mod app;
pub mod config;
pub mod error;
pub mod ml;
pub mod models;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;

pub use config::Config;
pub use error::{AdvisorError, ErrorResponse, Result};
