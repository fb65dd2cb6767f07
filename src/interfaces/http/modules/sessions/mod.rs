//! Charging sessions: start, progress, stop and history

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
