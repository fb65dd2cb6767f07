//! Authentication module: register, login, logout, profile

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
