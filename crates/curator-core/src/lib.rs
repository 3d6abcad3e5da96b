pub mod clock;
pub mod config;
pub mod error;
pub mod gateway;
pub mod paths;
pub mod rules;
pub mod scanner;
pub mod scheduler;
pub mod shutdown;
pub mod store;
pub mod types;

#[cfg(test)]
mod test_support;

pub use error::{CuratorError, Result};
