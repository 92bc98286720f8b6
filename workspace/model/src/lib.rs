pub mod entities;
pub mod error;
pub mod follows;
pub mod messages;
pub mod users;

#[cfg(test)]
mod testing;

pub use error::ModelError;

// Re-export tracing for use in this crate
pub use tracing;
