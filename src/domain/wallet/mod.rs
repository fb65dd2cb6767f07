//! Wallet ledger aggregate

pub mod model;
pub mod repository;

pub use model::{
    ChargeReference, LedgerAppend, LedgerTransaction, Payment, PaymentStatus, PaymentType,
    TransactionFilter, TransactionStatus, TransactionType, WalletInfo,
};
pub use repository::WalletRepository;
