//! Wallet ledger entities
//!
//! Amounts are positive cents; the direction of a [`LedgerTransaction`] is
//! carried by its type. Transactions and payments are write-once apart from
//! the refund bookkeeping on the original payment.

use std::str::FromStr;

use chrono::{DateTime, Utc};

use crate::domain::anchor::LedgerAnchor;
use crate::shared::DomainError;

#[derive(Debug, Clone)]
pub struct WalletInfo {
    pub id: String,
    pub user_id: String,
    /// Balance in cents
    pub balance: i64,
    pub currency: String,
    /// Optimistic concurrency counter, bumped on every balance change
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WalletInfo {
    pub fn new(user_id: impl Into<String>, currency: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.into(),
            balance: 0,
            currency: currency.into(),
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Balance after applying `amount` in the direction of `tx_type`.
    /// Debits beyond the balance fail with `InsufficientFunds`.
    pub fn balance_after(&self, tx_type: TransactionType, amount: i64) -> Result<i64, DomainError> {
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "amount must be positive, got {}",
                amount
            )));
        }
        if tx_type.is_credit() {
            self.balance
                .checked_add(amount)
                .ok_or_else(|| DomainError::InvalidAmount("balance overflow".into()))
        } else if self.balance < amount {
            Err(DomainError::InsufficientFunds {
                available: self.balance,
                required: amount,
            })
        } else {
            Ok(self.balance - amount)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionType {
    Deposit,
    Withdrawal,
    Payment,
    Refund,
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::Withdrawal => "withdrawal",
            Self::Payment => "payment",
            Self::Refund => "refund",
            Self::Credit => "credit",
            Self::Debit => "debit",
        }
    }

    /// Credit-side types increase the balance; the rest decrease it.
    pub fn is_credit(&self) -> bool {
        matches!(self, Self::Deposit | Self::Refund | Self::Credit)
    }

    /// Signed effect of `amount` on the balance.
    pub fn signed(&self, amount: i64) -> i64 {
        if self.is_credit() {
            amount
        } else {
            -amount
        }
    }
}

impl FromStr for TransactionType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(Self::Deposit),
            "withdrawal" => Ok(Self::Withdrawal),
            "payment" => Ok(Self::Payment),
            "refund" => Ok(Self::Refund),
            "credit" => Ok(Self::Credit),
            "debit" => Ok(Self::Debit),
            other => Err(DomainError::InvalidInput(format!(
                "unknown transaction type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionStatus {
    Pending,
    Confirmed,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Counts toward the balance.
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Completed)
    }
}

impl FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            other => Err(DomainError::InvalidInput(format!(
                "unknown transaction status '{}'",
                other
            ))),
        }
    }
}

/// Immutable ledger entry
#[derive(Debug, Clone)]
pub struct LedgerTransaction {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub tx_type: TransactionType,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: TransactionStatus,
    pub reservation_id: Option<String>,
    pub session_id: Option<String>,
    pub payment_id: Option<String>,
    pub description: String,
    pub anchor: Option<LedgerAnchor>,
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Whether `balance_after` follows from `balance_before`, type and amount.
    pub fn is_consistent(&self) -> bool {
        self.amount > 0 && self.balance_before + self.tx_type.signed(self.amount) == self.balance_after
    }
}

/// Which lifecycle record a transaction or payment belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChargeReference {
    Reservation(String),
    Session(String),
    Other(String),
}

impl ChargeReference {
    pub fn id(&self) -> &str {
        match self {
            Self::Reservation(id) | Self::Session(id) | Self::Other(id) => id,
        }
    }

    pub fn reservation_id(&self) -> Option<String> {
        match self {
            Self::Reservation(id) => Some(id.clone()),
            _ => None,
        }
    }

    pub fn session_id(&self) -> Option<String> {
        match self {
            Self::Session(id) => Some(id.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentType {
    Parking,
    Charging,
    Refund,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Parking => "parking",
            Self::Charging => "charging",
            Self::Refund => "refund",
        }
    }
}

impl FromStr for PaymentType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "parking" => Ok(Self::Parking),
            "charging" => Ok(Self::Charging),
            "refund" => Ok(Self::Refund),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment type '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Refunded => "refunded",
        }
    }
}

impl FromStr for PaymentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            "failed" => Ok(Self::Failed),
            "refunded" => Ok(Self::Refunded),
            other => Err(DomainError::InvalidInput(format!(
                "unknown payment status '{}'",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Settlement record linking a reservation/session charge to the ledger.
#[derive(Debug, Clone)]
pub struct Payment {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub amount: i64,
    pub payment_type: PaymentType,
    /// Reservation or session id; for refunds, the refunded payment id
    pub reference_id: String,
    pub description: String,
    pub status: PaymentStatus,
    /// Portion of `amount` already refunded
    pub refunded_amount: i64,
    pub anchor: Option<LedgerAnchor>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn refundable_amount(&self) -> i64 {
        self.amount - self.refunded_amount
    }

    /// Validate a refund of `amount` (default: everything left).
    pub fn check_refund(&self, amount: Option<i64>) -> Result<i64, DomainError> {
        let not_refundable = |reason: String| DomainError::PaymentNotRefundable {
            payment_id: self.id.clone(),
            reason,
        };
        if self.payment_type == PaymentType::Refund {
            return Err(not_refundable("refund payments cannot be refunded".into()));
        }
        if self.status != PaymentStatus::Completed {
            return Err(not_refundable(format!("status is {}", self.status)));
        }
        let remaining = self.refundable_amount();
        let amount = amount.unwrap_or(remaining);
        if amount <= 0 {
            return Err(DomainError::InvalidAmount(format!(
                "refund amount must be positive, got {}",
                amount
            )));
        }
        if amount > remaining {
            return Err(DomainError::InvalidAmount(format!(
                "refund {} exceeds refundable amount {}",
                amount, remaining
            )));
        }
        Ok(amount)
    }

    /// Book a refund of `amount`; fully refunded payments become `refunded`.
    pub fn record_refund(&mut self, amount: i64, now: DateTime<Utc>) {
        self.refunded_amount += amount;
        if self.refunded_amount >= self.amount {
            self.status = PaymentStatus::Refunded;
        }
        self.updated_at = now;
    }
}

/// One atomic ledger write: the new wallet state, its transaction, and any
/// payments created or updated by the same operation.
#[derive(Debug, Clone)]
pub struct LedgerAppend {
    pub wallet: WalletInfo,
    /// Version the wallet had when the operation read it
    pub expected_version: i64,
    pub transaction: LedgerTransaction,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone, Default)]
pub struct TransactionFilter {
    pub tx_type: Option<TransactionType>,
}

impl TransactionFilter {
    pub fn matches(&self, tx: &LedgerTransaction) -> bool {
        self.tx_type.map_or(true, |t| t == tx.tx_type)
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn wallet(balance: i64) -> WalletInfo {
        let mut w = WalletInfo::new("u1", "USD", Utc::now());
        w.balance = balance;
        w
    }

    fn payment(amount: i64) -> Payment {
        let now = Utc::now();
        Payment {
            id: "p1".into(),
            wallet_id: "w1".into(),
            user_id: "u1".into(),
            amount,
            payment_type: PaymentType::Parking,
            reference_id: "r1".into(),
            description: "parking".into(),
            status: PaymentStatus::Completed,
            refunded_amount: 0,
            anchor: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn credit_and_debit_directions() {
        assert!(TransactionType::Deposit.is_credit());
        assert!(TransactionType::Refund.is_credit());
        assert!(TransactionType::Credit.is_credit());
        assert!(!TransactionType::Payment.is_credit());
        assert!(!TransactionType::Withdrawal.is_credit());
        assert_eq!(TransactionType::Debit.signed(30), -30);
    }

    #[test]
    fn debit_over_balance_is_insufficient() {
        let w = wallet(5000);
        let err = w.balance_after(TransactionType::Payment, 6000).unwrap_err();
        assert!(matches!(
            err,
            DomainError::InsufficientFunds {
                available: 5000,
                required: 6000
            }
        ));
        assert_eq!(w.balance_after(TransactionType::Payment, 5000).unwrap(), 0);
        assert_eq!(w.balance_after(TransactionType::Deposit, 1).unwrap(), 5001);
    }

    #[test]
    fn non_positive_amount_is_invalid() {
        let w = wallet(100);
        assert!(matches!(
            w.balance_after(TransactionType::Deposit, 0),
            Err(DomainError::InvalidAmount(_))
        ));
    }

    #[test]
    fn partial_then_full_refund() {
        let mut p = payment(1000);
        assert_eq!(p.check_refund(Some(400)).unwrap(), 400);
        p.record_refund(400, Utc::now());
        assert_eq!(p.status, PaymentStatus::Completed);
        assert_eq!(p.refundable_amount(), 600);

        assert!(p.check_refund(Some(700)).is_err());
        assert_eq!(p.check_refund(None).unwrap(), 600);
        p.record_refund(600, Utc::now());
        assert_eq!(p.status, PaymentStatus::Refunded);

        let err = p.check_refund(None).unwrap_err();
        assert!(matches!(err, DomainError::PaymentNotRefundable { .. }));
    }

    #[test]
    fn refund_payments_are_not_refundable() {
        let mut p = payment(100);
        p.payment_type = PaymentType::Refund;
        assert!(matches!(
            p.check_refund(None),
            Err(DomainError::PaymentNotRefundable { .. })
        ));
    }

    #[test]
    fn transaction_consistency() {
        let tx = LedgerTransaction {
            id: "t1".into(),
            wallet_id: "w1".into(),
            user_id: "u1".into(),
            tx_type: TransactionType::Payment,
            amount: 30,
            balance_before: 100,
            balance_after: 70,
            status: TransactionStatus::Confirmed,
            reservation_id: None,
            session_id: None,
            payment_id: None,
            description: String::new(),
            anchor: None,
            created_at: Utc::now(),
        };
        assert!(tx.is_consistent());
        let mut bad = tx.clone();
        bad.balance_after = 130;
        assert!(!bad.is_consistent());
    }
}
