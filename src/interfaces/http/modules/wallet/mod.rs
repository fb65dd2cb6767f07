//! Wallet balance, deposits and ledger history

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
