//! Wallet ledger repository interface

use async_trait::async_trait;

use super::model::{LedgerAppend, LedgerTransaction, Payment, TransactionFilter, WalletInfo};
use crate::domain::DomainResult;
use crate::shared::{PageRequest, PaginatedResult};

#[async_trait]
pub trait WalletRepository: Send + Sync {
    /// Insert a wallet; `Conflict` if the user already has one.
    async fn create(&self, wallet: WalletInfo) -> DomainResult<()>;

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<WalletInfo>>;

    async fn find_by_user(&self, user_id: &str) -> DomainResult<Option<WalletInfo>>;

    /// Atomically write the wallet, the transaction and the payments.
    ///
    /// Fails with `Conflict` (and writes nothing) when the stored wallet
    /// version differs from `expected_version`.
    async fn append(&self, entry: LedgerAppend) -> DomainResult<()>;

    /// Transactions of a wallet, newest first.
    /// Insert a payment that moves no money, e.g. a `pending` charge left
    /// open when the wallet could not cover it.
    async fn record_payment(&self, payment: Payment) -> DomainResult<()>;

    async fn find_transactions(
        &self,
        wallet_id: &str,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<LedgerTransaction>>;

    /// Every transaction of a wallet in append order.
    async fn all_transactions(&self, wallet_id: &str) -> DomainResult<Vec<LedgerTransaction>>;

    async fn find_transaction(&self, id: &str) -> DomainResult<Option<LedgerTransaction>>;

    async fn find_payment(&self, id: &str) -> DomainResult<Option<Payment>>;

    /// Payments of a user, newest first.
    async fn find_payments_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Payment>>;

    /// Payments whose `reference_id` is the given reservation/session/payment id.
    async fn find_payments_by_reference(&self, reference_id: &str) -> DomainResult<Vec<Payment>>;
}
