//! User management: profile edits, deactivation, admin listing and history

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
