//! Parking reservations: booking, check-in/out, extension, cancellation

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
