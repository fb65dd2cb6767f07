//! Wallet ledger and payment processor
//!
//! The only writer of balances. Every balance change is one
//! [`LedgerAppend`]: new wallet state, exactly one transaction, and the
//! payments it creates or updates. Writes on a wallet are serialized by a
//! keyed mutex, and the repository rejects stale appends by version; a
//! rejected append is re-read and retried with backoff.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::application::caller::Caller;
use crate::application::events::{Event, LedgerEvent, SharedEventBus};
use crate::application::ports::SharedAnchorSource;
use crate::domain::wallet::{LedgerAppend, TransactionFilter};
use crate::domain::{
    ChargeReference, DomainError, DomainResult, LedgerTransaction, Payment, PaymentStatus,
    PaymentType, RepositoryProvider, TransactionStatus, TransactionType, WalletInfo,
};
use crate::shared::{
    retry_with_backoff, KeyedLocks, PageRequest, PaginatedResult, RetryConfig, SharedClock,
};

/// `[wallet]` config section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletSettings {
    pub currency: String,
    /// Largest single deposit in cents; 0 means unlimited
    pub max_deposit: i64,
}

impl Default for WalletSettings {
    fn default() -> Self {
        Self {
            currency: "USD".into(),
            max_deposit: 1_000_000,
        }
    }
}

/// A charge against a wallet.
#[derive(Debug, Clone)]
pub struct PaymentRequest {
    pub amount: i64,
    pub payment_type: PaymentType,
    pub reference: ChargeReference,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpendingSummary {
    pub total_spending: i64,
    pub total_refunds: i64,
    pub net_spending: i64,
}

#[derive(Debug, Clone)]
pub struct Receipt {
    pub receipt_number: String,
    pub payment: Payment,
    pub transaction: Option<LedgerTransaction>,
    pub refunds: Vec<Payment>,
    pub net_amount: i64,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReconciliationReport {
    pub wallet_id: String,
    pub balance: i64,
    pub computed_balance: i64,
    pub total_credits: i64,
    pub total_debits: i64,
    pub transaction_count: usize,
    /// Transactions whose amounts do not add up or that do not continue
    /// from the previous `balance_after`
    pub broken_links: Vec<String>,
    pub is_consistent: bool,
}

#[derive(Default)]
struct TxLinks {
    reservation_id: Option<String>,
    session_id: Option<String>,
    payment_id: Option<String>,
}

fn record_outcome<T>(op: &'static str, result: &DomainResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    metrics::counter!("ledger_operations_total", "op" => op, "outcome" => outcome).increment(1);
}

pub struct WalletLedger {
    repos: Arc<dyn RepositoryProvider>,
    events: SharedEventBus,
    anchors: SharedAnchorSource,
    clock: SharedClock,
    settings: WalletSettings,
    locks: KeyedLocks,
}

impl WalletLedger {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        events: SharedEventBus,
        anchors: SharedAnchorSource,
        clock: SharedClock,
        settings: WalletSettings,
    ) -> Self {
        Self {
            repos,
            events,
            anchors,
            clock,
            settings,
            locks: KeyedLocks::new(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.settings.currency
    }

    // ── Wallets ─────────────────────────────────────────────────

    pub async fn create_wallet(&self, user_id: &str) -> DomainResult<WalletInfo> {
        let wallet = WalletInfo::new(user_id, self.settings.currency.clone(), self.clock.now());
        self.repos.wallets().create(wallet.clone()).await?;
        info!(wallet_id = %wallet.id, user_id, "Wallet created");
        Ok(wallet)
    }

    pub async fn wallet_for_user(&self, user_id: &str) -> DomainResult<WalletInfo> {
        self.repos
            .wallets()
            .find_by_user(user_id)
            .await?
            .ok_or_else(|| DomainError::NotFound {
                entity: "Wallet",
                field: "user_id",
                value: user_id.to_string(),
            })
    }

    async fn load_wallet(&self, wallet_id: &str) -> DomainResult<WalletInfo> {
        self.repos
            .wallets()
            .find_by_id(wallet_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Wallet", wallet_id))
    }

    async fn load_payment(&self, payment_id: &str) -> DomainResult<Payment> {
        self.repos
            .wallets()
            .find_payment(payment_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Payment", payment_id))
    }

    /// Next wallet state plus the transaction that produces it.
    fn build_entry(
        &self,
        wallet: &WalletInfo,
        tx_type: TransactionType,
        amount: i64,
        links: TxLinks,
        description: String,
        now: DateTime<Utc>,
    ) -> DomainResult<(WalletInfo, LedgerTransaction)> {
        let balance_after = wallet.balance_after(tx_type, amount)?;
        let id = uuid::Uuid::new_v4().to_string();
        let anchor = self.anchors.anchor(
            "transaction",
            &id,
            &format!(
                "{}|{}|{}|{}|{}",
                wallet.id,
                tx_type.as_str(),
                amount,
                wallet.balance,
                balance_after
            ),
        );

        let transaction = LedgerTransaction {
            id,
            wallet_id: wallet.id.clone(),
            user_id: wallet.user_id.clone(),
            tx_type,
            amount,
            balance_before: wallet.balance,
            balance_after,
            status: TransactionStatus::Confirmed,
            reservation_id: links.reservation_id,
            session_id: links.session_id,
            payment_id: links.payment_id,
            description,
            anchor,
            created_at: now,
        };
        let next = WalletInfo {
            balance: balance_after,
            version: wallet.version + 1,
            updated_at: now,
            ..wallet.clone()
        };
        Ok((next, transaction))
    }

    fn publish(&self, event: fn(LedgerEvent) -> Event, tx: &LedgerTransaction) {
        self.events.publish(event(LedgerEvent {
            wallet_id: tx.wallet_id.clone(),
            user_id: tx.user_id.clone(),
            transaction_id: tx.id.clone(),
            payment_id: tx.payment_id.clone(),
            amount: tx.amount,
            balance_after: tx.balance_after,
            timestamp: tx.created_at,
        }));
    }

    // ── AddFunds ────────────────────────────────────────────────

    pub async fn add_funds(
        &self,
        user_id: &str,
        amount: i64,
        description: Option<String>,
    ) -> DomainResult<LedgerTransaction> {
        let result = self.deposit(user_id, amount, description).await;
        record_outcome("add_funds", &result);
        result
    }

    async fn deposit(
        &self,
        user_id: &str,
        amount: i64,
        description: Option<String>,
    ) -> DomainResult<LedgerTransaction> {
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "deposit must be positive, got {}",
                amount
            )));
        }
        if self.settings.max_deposit > 0 && amount > self.settings.max_deposit {
            return Err(DomainError::InvalidAmount(format!(
                "deposit {} exceeds the limit of {}",
                amount, self.settings.max_deposit
            )));
        }

        let wallet_id = self.wallet_for_user(user_id).await?.id;
        let description = description.unwrap_or_else(|| "Wallet top-up".to_string());

        let _guard = self.locks.lock(&wallet_id).await;
        let tx = retry_with_backoff(
            RetryConfig::contention(),
            || self.attempt_deposit(&wallet_id, amount, &description),
            |e: &DomainError| e.is_transient(),
            "add_funds",
        )
        .await?;

        info!(
            wallet_id = %tx.wallet_id,
            amount,
            balance = tx.balance_after,
            "Funds added"
        );
        self.publish(Event::FundsAdded, &tx);
        Ok(tx)
    }

    async fn attempt_deposit(
        &self,
        wallet_id: &str,
        amount: i64,
        description: &str,
    ) -> DomainResult<LedgerTransaction> {
        let wallet = self.load_wallet(wallet_id).await?;
        let (next, tx) = self.build_entry(
            &wallet,
            TransactionType::Deposit,
            amount,
            TxLinks::default(),
            description.to_string(),
            self.clock.now(),
        )?;
        self.repos
            .wallets()
            .append(LedgerAppend {
                wallet: next,
                expected_version: wallet.version,
                transaction: tx.clone(),
                payments: vec![],
            })
            .await?;
        Ok(tx)
    }

    // ── ProcessPayment ──────────────────────────────────────────

    /// Debit the user's wallet and record a completed payment.
    pub async fn process_payment(
        &self,
        user_id: &str,
        request: PaymentRequest,
    ) -> DomainResult<Payment> {
        let result = self.charge(user_id, request).await;
        record_outcome("process_payment", &result);
        result
    }

    async fn charge(&self, user_id: &str, request: PaymentRequest) -> DomainResult<Payment> {
        if request.amount <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "payment must be positive, got {}",
                request.amount
            )));
        }
        if request.payment_type == PaymentType::Refund {
            return Err(DomainError::InvalidInput(
                "refunds are issued through the refund operation".into(),
            ));
        }

        let wallet_id = self.wallet_for_user(user_id).await?.id;
        let _guard = self.locks.lock(&wallet_id).await;
        let (payment, tx) = retry_with_backoff(
            RetryConfig::contention(),
            || self.attempt_charge(&wallet_id, &request),
            |e: &DomainError| e.is_transient(),
            "process_payment",
        )
        .await
        .inspect_err(|e| {
            if let DomainError::InsufficientFunds {
                available,
                required,
            } = e
            {
                warn!(wallet_id = %wallet_id, available, required, "Payment declined");
            }
        })?;

        info!(
            payment_id = %payment.id,
            reference_id = %payment.reference_id,
            payment_type = payment.payment_type.as_str(),
            amount = payment.amount,
            balance = tx.balance_after,
            "Payment processed"
        );
        self.publish(Event::PaymentProcessed, &tx);
        Ok(payment)
    }

    async fn attempt_charge(
        &self,
        wallet_id: &str,
        request: &PaymentRequest,
    ) -> DomainResult<(Payment, LedgerTransaction)> {
        let wallet = self.load_wallet(wallet_id).await?;
        let now = self.clock.now();
        let payment_id = uuid::Uuid::new_v4().to_string();

        let (next, tx) = self.build_entry(
            &wallet,
            TransactionType::Payment,
            request.amount,
            TxLinks {
                reservation_id: request.reference.reservation_id(),
                session_id: request.reference.session_id(),
                payment_id: Some(payment_id.clone()),
            },
            request.description.clone(),
            now,
        )?;

        let anchor = self.anchors.anchor(
            "payment",
            &payment_id,
            &format!(
                "{}|{}|{}|{}",
                wallet.id,
                request.payment_type.as_str(),
                request.reference.id(),
                request.amount
            ),
        );
        let payment = Payment {
            id: payment_id,
            wallet_id: wallet.id.clone(),
            user_id: wallet.user_id.clone(),
            amount: request.amount,
            payment_type: request.payment_type,
            reference_id: request.reference.id().to_string(),
            description: request.description.clone(),
            status: PaymentStatus::Completed,
            refunded_amount: 0,
            anchor,
            created_at: now,
            updated_at: now,
        };

        self.repos
            .wallets()
            .append(LedgerAppend {
                wallet: next,
                expected_version: wallet.version,
                transaction: tx.clone(),
                payments: vec![payment.clone()],
            })
            .await?;
        Ok((payment, tx))
    }

    /// Record a charge the wallet could not cover as a `pending` payment.
    /// No money moves and no transaction is written; the payment documents
    /// the debt against its reference.
    pub async fn record_unpaid(
        &self,
        user_id: &str,
        request: PaymentRequest,
    ) -> DomainResult<Payment> {
        let result = self.open_unpaid(user_id, request).await;
        record_outcome("record_unpaid", &result);
        result
    }

    async fn open_unpaid(&self, user_id: &str, request: PaymentRequest) -> DomainResult<Payment> {
        if request.amount <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "unpaid amount must be positive, got {}",
                request.amount
            )));
        }
        let wallet = self.wallet_for_user(user_id).await?;
        let now = self.clock.now();
        let payment_id = uuid::Uuid::new_v4().to_string();
        let anchor = self.anchors.anchor(
            "payment",
            &payment_id,
            &format!(
                "{}|{}|{}|{}|pending",
                wallet.id,
                request.payment_type.as_str(),
                request.reference.id(),
                request.amount
            ),
        );
        let payment = Payment {
            id: payment_id,
            wallet_id: wallet.id,
            user_id: wallet.user_id,
            amount: request.amount,
            payment_type: request.payment_type,
            reference_id: request.reference.id().to_string(),
            description: request.description,
            status: PaymentStatus::Pending,
            refunded_amount: 0,
            anchor,
            created_at: now,
            updated_at: now,
        };
        self.repos.wallets().record_payment(payment.clone()).await?;

        warn!(
            payment_id = %payment.id,
            reference_id = %payment.reference_id,
            amount = payment.amount,
            "Unpaid charge recorded"
        );
        Ok(payment)
    }

    // ── RefundPayment ───────────────────────────────────────────

    /// Refund `amount` (default: all that is left) of a completed payment.
    /// Returns the new refund payment.
    pub async fn refund_payment(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: Option<String>,
    ) -> DomainResult<Payment> {
        let result = self.refund(payment_id, amount, reason).await;
        record_outcome("refund_payment", &result);
        result
    }

    async fn refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: Option<String>,
    ) -> DomainResult<Payment> {
        let original = self.load_payment(payment_id).await?;
        original.check_refund(amount)?;
        let reason = reason.unwrap_or_else(|| format!("Refund of payment {}", payment_id));

        let _guard = self.locks.lock(&original.wallet_id).await;
        let (refund, tx) = retry_with_backoff(
            RetryConfig::contention(),
            || self.attempt_refund(payment_id, amount, &reason),
            |e: &DomainError| e.is_transient(),
            "refund_payment",
        )
        .await?;

        info!(
            payment_id,
            refund_id = %refund.id,
            amount = refund.amount,
            balance = tx.balance_after,
            "Payment refunded"
        );
        self.publish(Event::PaymentRefunded, &tx);
        Ok(refund)
    }

    async fn attempt_refund(
        &self,
        payment_id: &str,
        amount: Option<i64>,
        reason: &str,
    ) -> DomainResult<(Payment, LedgerTransaction)> {
        let mut original = self.load_payment(payment_id).await?;
        let refund_amount = original.check_refund(amount)?;
        let wallet = self.load_wallet(&original.wallet_id).await?;
        let now = self.clock.now();
        let refund_id = uuid::Uuid::new_v4().to_string();

        let (reservation_id, session_id) = match original.payment_type {
            PaymentType::Parking => (Some(original.reference_id.clone()), None),
            PaymentType::Charging => (None, Some(original.reference_id.clone())),
            PaymentType::Refund => (None, None),
        };
        let (next, tx) = self.build_entry(
            &wallet,
            TransactionType::Refund,
            refund_amount,
            TxLinks {
                reservation_id,
                session_id,
                payment_id: Some(refund_id.clone()),
            },
            reason.to_string(),
            now,
        )?;

        original.record_refund(refund_amount, now);
        let anchor = self.anchors.anchor(
            "payment",
            &refund_id,
            &format!("{}|refund|{}|{}", wallet.id, original.id, refund_amount),
        );
        let refund = Payment {
            id: refund_id,
            wallet_id: wallet.id.clone(),
            user_id: wallet.user_id.clone(),
            amount: refund_amount,
            payment_type: PaymentType::Refund,
            reference_id: original.id.clone(),
            description: reason.to_string(),
            status: PaymentStatus::Completed,
            refunded_amount: 0,
            anchor,
            created_at: now,
            updated_at: now,
        };

        self.repos
            .wallets()
            .append(LedgerAppend {
                wallet: next,
                expected_version: wallet.version,
                transaction: tx.clone(),
                payments: vec![original, refund.clone()],
            })
            .await?;
        Ok((refund, tx))
    }

    /// Bring every completed payment of `payment_type` referencing
    /// `reference_id` up to `percent`% refunded. Returns the total refunded
    /// by this call.
    ///
    /// The target is measured against the original amount, so repeating the
    /// call after a partial failure only refunds what is still missing.
    pub async fn refund_share(
        &self,
        reference_id: &str,
        payment_type: PaymentType,
        percent: u8,
        reason: &str,
    ) -> DomainResult<i64> {
        if percent == 0 {
            return Ok(0);
        }
        let payments = self
            .repos
            .wallets()
            .find_payments_by_reference(reference_id)
            .await?;

        let mut refunded = 0;
        for payment in payments
            .into_iter()
            .filter(|p| p.payment_type == payment_type && p.status == PaymentStatus::Completed)
        {
            let target = crate::shared::money::percent_of(payment.amount, percent);
            let share = (target - payment.refunded_amount).min(payment.refundable_amount());
            if share <= 0 {
                continue;
            }
            let refund = self
                .refund_payment(&payment.id, Some(share), Some(reason.to_string()))
                .await?;
            refunded += refund.amount;
        }
        Ok(refunded)
    }

    /// Refund up to `amount` across the completed payments of
    /// `payment_type` referencing `reference_id`, oldest first.
    pub async fn refund_up_to(
        &self,
        reference_id: &str,
        payment_type: PaymentType,
        amount: i64,
        reason: &str,
    ) -> DomainResult<i64> {
        let payments = self
            .repos
            .wallets()
            .find_payments_by_reference(reference_id)
            .await?;

        let mut remaining = amount;
        for payment in payments
            .into_iter()
            .filter(|p| p.payment_type == payment_type && p.status == PaymentStatus::Completed)
        {
            if remaining <= 0 {
                break;
            }
            let share = remaining.min(payment.refundable_amount());
            if share <= 0 {
                continue;
            }
            let refund = self
                .refund_payment(&payment.id, Some(share), Some(reason.to_string()))
                .await?;
            remaining -= refund.amount;
        }
        Ok(amount - remaining)
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn transactions(
        &self,
        user_id: &str,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<LedgerTransaction>> {
        let wallet = self.wallet_for_user(user_id).await?;
        self.repos
            .wallets()
            .find_transactions(&wallet.id, filter, page)
            .await
    }

    pub async fn transaction(&self, caller: &Caller, id: &str) -> DomainResult<LedgerTransaction> {
        let tx = self
            .repos
            .wallets()
            .find_transaction(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Transaction", id))?;
        caller.ensure_owner(&tx.user_id)?;
        Ok(tx)
    }

    /// Settled debits, settled refunds, and their difference.
    pub async fn spending(&self, user_id: &str) -> DomainResult<SpendingSummary> {
        let wallet = self.wallet_for_user(user_id).await?;
        let txs = self.repos.wallets().all_transactions(&wallet.id).await?;

        let settled = || txs.iter().filter(|t| t.status.is_settled());
        let total_spending: i64 = settled()
            .filter(|t| !t.tx_type.is_credit())
            .map(|t| t.amount)
            .sum();
        let total_refunds: i64 = settled()
            .filter(|t| t.tx_type == TransactionType::Refund)
            .map(|t| t.amount)
            .sum();

        Ok(SpendingSummary {
            total_spending,
            total_refunds,
            net_spending: total_spending - total_refunds,
        })
    }

    pub async fn payment(&self, caller: &Caller, id: &str) -> DomainResult<Payment> {
        let payment = self.load_payment(id).await?;
        caller.ensure_owner(&payment.user_id)?;
        Ok(payment)
    }

    pub async fn payments_for_user(
        &self,
        user_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Payment>> {
        self.repos
            .wallets()
            .find_payments_for_user(user_id, page)
            .await
    }

    pub async fn payments_for_reference(&self, reference_id: &str) -> DomainResult<Vec<Payment>> {
        self.repos
            .wallets()
            .find_payments_by_reference(reference_id)
            .await
    }

    pub async fn receipt(&self, caller: &Caller, payment_id: &str) -> DomainResult<Receipt> {
        let payment = self.payment(caller, payment_id).await?;
        let transaction = self
            .repos
            .wallets()
            .all_transactions(&payment.wallet_id)
            .await?
            .into_iter()
            .find(|t| t.payment_id.as_deref() == Some(payment.id.as_str()));
        let refunds: Vec<Payment> = self
            .payments_for_reference(&payment.id)
            .await?
            .into_iter()
            .filter(|p| p.payment_type == PaymentType::Refund)
            .collect();

        let refunded: i64 = refunds.iter().map(|r| r.amount).sum();
        let receipt_number = format!(
            "RCPT-{}-{}",
            payment.created_at.format("%Y%m%d"),
            payment
                .id
                .split('-')
                .next()
                .unwrap_or(payment.id.as_str())
                .to_uppercase()
        );

        Ok(Receipt {
            receipt_number,
            net_amount: payment.amount - refunded,
            currency: self.settings.currency.clone(),
            issued_at: self.clock.now(),
            payment,
            transaction,
            refunds,
        })
    }

    /// Recompute the balance from the transaction log and check each link.
    pub async fn reconcile(&self, user_id: &str) -> DomainResult<ReconciliationReport> {
        let wallet = self.wallet_for_user(user_id).await?;
        let txs = self.repos.wallets().all_transactions(&wallet.id).await?;

        let mut total_credits = 0;
        let mut total_debits = 0;
        let mut running = 0;
        let mut broken_links = Vec::new();

        for tx in txs.iter().filter(|t| t.status.is_settled()) {
            if tx.balance_before != running || !tx.is_consistent() {
                broken_links.push(tx.id.clone());
            }
            if tx.tx_type.is_credit() {
                total_credits += tx.amount;
            } else {
                total_debits += tx.amount;
            }
            running = tx.balance_after;
        }

        let computed_balance = total_credits - total_debits;
        let is_consistent = broken_links.is_empty() && computed_balance == wallet.balance;
        if !is_consistent {
            warn!(
                wallet_id = %wallet.id,
                balance = wallet.balance,
                computed_balance,
                broken = broken_links.len(),
                "Wallet reconciliation mismatch"
            );
        }

        Ok(ReconciliationReport {
            wallet_id: wallet.id,
            balance: wallet.balance,
            computed_balance,
            total_credits,
            total_debits,
            transaction_count: txs.len(),
            broken_links,
            is_consistent,
        })
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::testing::Harness;

    fn parking(amount: i64, reservation_id: &str) -> PaymentRequest {
        PaymentRequest {
            amount,
            payment_type: PaymentType::Parking,
            reference: ChargeReference::Reservation(reservation_id.into()),
            description: "parking".into(),
        }
    }

    #[tokio::test]
    async fn add_pay_refund_restores_balance() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 10_000, None).await.unwrap();
        let payment = h
            .ledger
            .process_payment("u1", parking(3_000, "r1"))
            .await
            .unwrap();
        assert_eq!(h.balance("u1").await, 7_000);

        h.ledger.refund_payment(&payment.id, None, None).await.unwrap();
        assert_eq!(h.balance("u1").await, 10_000);

        let original = h.ledger.payment(&Caller::user("u1"), &payment.id).await.unwrap();
        assert_eq!(original.status, PaymentStatus::Refunded);
        assert_eq!(original.refunded_amount, 3_000);
    }

    #[tokio::test]
    async fn insufficient_funds_writes_nothing() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();

        let err = h
            .ledger
            .process_payment("u1", parking(6_000, "r1"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientFunds {
                available: 5_000,
                required: 6_000
            }
        ));
        assert_eq!(h.balance("u1").await, 5_000);

        let txs = h
            .ledger
            .transactions("u1", &TransactionFilter::default(), PageRequest::default())
            .await
            .unwrap();
        assert_eq!(txs.total, 1);
    }

    #[tokio::test]
    async fn non_positive_amounts_are_rejected() {
        let h = Harness::new().await;
        assert!(matches!(
            h.ledger.add_funds("u1", 0, None).await,
            Err(DomainError::InvalidAmount(_))
        ));
        assert!(matches!(
            h.ledger.process_payment("u1", parking(-5, "r1")).await,
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn deposit_over_limit_is_rejected() {
        let h = Harness::new().await;
        let err = h.ledger.add_funds("u1", 1_000_001, None).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn refund_type_cannot_be_charged() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 1_000, None).await.unwrap();
        let mut req = parking(100, "r1");
        req.payment_type = PaymentType::Refund;
        assert!(matches!(
            h.ledger.process_payment("u1", req).await,
            Err(DomainError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn partial_refunds_cap_at_payment_amount() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 10_000, None).await.unwrap();
        let payment = h
            .ledger
            .process_payment("u1", parking(1_000, "r1"))
            .await
            .unwrap();

        h.ledger
            .refund_payment(&payment.id, Some(400), Some("partial".into()))
            .await
            .unwrap();
        let err = h
            .ledger
            .refund_payment(&payment.id, Some(700), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));

        let refund = h.ledger.refund_payment(&payment.id, None, None).await.unwrap();
        assert_eq!(refund.amount, 600);
        assert_eq!(refund.reference_id, payment.id);

        let err = h
            .ledger
            .refund_payment(&payment.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotRefundable { .. }));
        assert_eq!(h.balance("u1").await, 10_000);
    }

    #[tokio::test]
    async fn spending_nets_out_refunds() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 10_000, None).await.unwrap();
        let p = h
            .ledger
            .process_payment("u1", parking(3_000, "r1"))
            .await
            .unwrap();
        h.ledger
            .process_payment("u1", parking(1_000, "r2"))
            .await
            .unwrap();
        h.ledger.refund_payment(&p.id, Some(500), None).await.unwrap();

        let summary = h.ledger.spending("u1").await.unwrap();
        assert_eq!(summary.total_spending, 4_000);
        assert_eq!(summary.total_refunds, 500);
        assert_eq!(summary.net_spending, 3_500);
    }

    #[tokio::test]
    async fn reconcile_agrees_with_balance() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 2_000, None).await.unwrap();
        let p = h
            .ledger
            .process_payment("u1", parking(750, "r1"))
            .await
            .unwrap();
        h.ledger.refund_payment(&p.id, Some(250), None).await.unwrap();

        let report = h.ledger.reconcile("u1").await.unwrap();
        assert!(report.is_consistent);
        assert_eq!(report.balance, 1_500);
        assert_eq!(report.computed_balance, 1_500);
        assert_eq!(report.total_credits, 2_250);
        assert_eq!(report.total_debits, 750);
        assert_eq!(report.transaction_count, 3);
    }

    #[tokio::test]
    async fn receipt_lists_refunds() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 2_000, None).await.unwrap();
        let p = h
            .ledger
            .process_payment("u1", parking(1_000, "r1"))
            .await
            .unwrap();
        h.ledger.refund_payment(&p.id, Some(300), None).await.unwrap();

        let receipt = h.ledger.receipt(&Caller::user("u1"), &p.id).await.unwrap();
        assert_eq!(receipt.net_amount, 700);
        assert_eq!(receipt.refunds.len(), 1);
        assert!(receipt.transaction.is_some());
        assert!(receipt.receipt_number.starts_with("RCPT-"));

        let err = h
            .ledger
            .receipt(&Caller::user("u2"), &p.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn refund_share_applies_percentage() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        h.ledger
            .process_payment("u1", parking(1_000, "r1"))
            .await
            .unwrap();
        h.ledger
            .process_payment("u1", parking(500, "r1"))
            .await
            .unwrap();

        let refunded = h
            .ledger
            .refund_share("r1", PaymentType::Parking, 50, "cancelled")
            .await
            .unwrap();
        assert_eq!(refunded, 750);
        assert_eq!(h.balance("u1").await, 4_250);
    }

    #[tokio::test]
    async fn repeated_refund_share_only_tops_up() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 5_000, None).await.unwrap();
        let first = h
            .ledger
            .process_payment("u1", parking(1_000, "r1"))
            .await
            .unwrap();
        let second = h
            .ledger
            .process_payment("u1", parking(500, "r1"))
            .await
            .unwrap();

        // an earlier cancel got as far as the first payment
        h.ledger
            .refund_payment(&first.id, Some(500), Some("cancelled".into()))
            .await
            .unwrap();

        let refunded = h
            .ledger
            .refund_share("r1", PaymentType::Parking, 50, "cancelled")
            .await
            .unwrap();
        assert_eq!(refunded, 250);
        assert_eq!(h.balance("u1").await, 4_250);

        let again = h
            .ledger
            .refund_share("r1", PaymentType::Parking, 50, "cancelled")
            .await
            .unwrap();
        assert_eq!(again, 0);

        let caller = Caller::user("u1");
        let first = h.ledger.payment(&caller, &first.id).await.unwrap();
        let second = h.ledger.payment(&caller, &second.id).await.unwrap();
        assert_eq!(first.refunded_amount, 500);
        assert_eq!(second.refunded_amount, 250);
    }

    #[tokio::test]
    async fn unpaid_charge_is_pending_and_moves_nothing() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 100, None).await.unwrap();

        let open = h
            .ledger
            .record_unpaid("u1", parking(500, "r1"))
            .await
            .unwrap();
        assert_eq!(open.status, PaymentStatus::Pending);
        assert_eq!(open.reference_id, "r1");
        assert_eq!(h.balance("u1").await, 100);

        let err = h
            .ledger
            .refund_payment(&open.id, None, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotRefundable { .. }));
        assert_eq!(
            h.ledger
                .refund_share("r1", PaymentType::Parking, 100, "cancelled")
                .await
                .unwrap(),
            0
        );
        assert!(matches!(
            h.ledger.record_unpaid("u1", parking(0, "r1")).await,
            Err(DomainError::InvalidAmount(_))
        ));

        let report = h.ledger.reconcile("u1").await.unwrap();
        assert!(report.is_consistent);
        assert_eq!(report.transaction_count, 1);
    }

    #[tokio::test]
    async fn concurrent_payments_never_overdraw() {
        let h = Harness::new().await;
        h.ledger.add_funds("u1", 1_000, None).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..10 {
            let ledger = h.ledger.clone();
            handles.push(tokio::spawn(async move {
                ledger
                    .process_payment("u1", parking(300, &format!("r{}", i)))
                    .await
            }));
        }
        let mut ok = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                ok += 1;
            }
        }
        assert_eq!(ok, 3);
        assert_eq!(h.balance("u1").await, 100);
        assert!(h.ledger.reconcile("u1").await.unwrap().is_consistent);
        assert!(h.ledger.locks.is_empty());
    }

    #[tokio::test]
    async fn events_are_published_after_writes() {
        let h = Harness::new().await;
        let mut sub = h.events.subscribe();
        h.ledger.add_funds("u1", 100, None).await.unwrap();
        let msg = sub.recv().await.unwrap();
        assert_eq!(msg.event.event_type(), "funds_added");
        assert_eq!(msg.event.user_id(), Some("u1"));
    }

    #[tokio::test]
    async fn second_wallet_for_user_conflicts() {
        let h = Harness::new().await;
        assert!(matches!(
            h.ledger.create_wallet("u1").await,
            Err(DomainError::Conflict(_))
        ));
    }
}
