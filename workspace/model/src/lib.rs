pub mod accounts;
pub mod entities;
pub mod sessions;

// Re-export tracing for use in this crate
pub use tracing;
