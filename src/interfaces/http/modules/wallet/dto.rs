//! Wallet DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::application::{ReconciliationReport, SpendingSummary};
use crate::domain::wallet::TransactionFilter;
use crate::domain::{DomainResult, LedgerTransaction, WalletInfo};
use crate::interfaces::http::common::AnchorDto;
use crate::shared::money::decimal_from_cents;

#[derive(Debug, Serialize, ToSchema)]
pub struct WalletDto {
    pub id: String,
    pub user_id: String,
    #[schema(example = "25.00")]
    pub balance: Decimal,
    pub currency: String,
    pub updated_at: DateTime<Utc>,
}

impl From<WalletInfo> for WalletDto {
    fn from(w: WalletInfo) -> Self {
        Self {
            balance: decimal_from_cents(w.balance),
            id: w.id,
            user_id: w.user_id,
            currency: w.currency,
            updated_at: w.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct AddFundsRequest {
    #[schema(example = "20.00")]
    pub amount: Decimal,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionListParams {
    /// deposit, withdrawal, payment, refund, credit, debit
    pub tx_type: Option<String>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl TransactionListParams {
    pub fn filter(&self) -> DomainResult<TransactionFilter> {
        Ok(TransactionFilter {
            tx_type: self.tx_type.as_deref().map(str::parse).transpose()?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct TransactionDto {
    pub id: String,
    pub wallet_id: String,
    pub tx_type: String,
    pub amount: Decimal,
    pub balance_before: Decimal,
    pub balance_after: Decimal,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reservation_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_id: Option<String>,
    pub description: String,
    #[serde(flatten)]
    pub anchor: Option<AnchorDto>,
    pub created_at: DateTime<Utc>,
}

impl From<LedgerTransaction> for TransactionDto {
    fn from(t: LedgerTransaction) -> Self {
        Self {
            tx_type: t.tx_type.as_str().to_string(),
            status: t.status.as_str().to_string(),
            amount: decimal_from_cents(t.amount),
            balance_before: decimal_from_cents(t.balance_before),
            balance_after: decimal_from_cents(t.balance_after),
            anchor: t.anchor.map(AnchorDto::from),
            id: t.id,
            wallet_id: t.wallet_id,
            reservation_id: t.reservation_id,
            session_id: t.session_id,
            payment_id: t.payment_id,
            description: t.description,
            created_at: t.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpendingDto {
    pub total_spending: Decimal,
    pub total_refunds: Decimal,
    pub net_spending: Decimal,
    pub currency: String,
}

impl SpendingDto {
    pub fn new(summary: SpendingSummary, currency: &str) -> Self {
        Self {
            total_spending: decimal_from_cents(summary.total_spending),
            total_refunds: decimal_from_cents(summary.total_refunds),
            net_spending: decimal_from_cents(summary.net_spending),
            currency: currency.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReconciliationDto {
    pub wallet_id: String,
    pub balance: Decimal,
    pub computed_balance: Decimal,
    pub total_credits: Decimal,
    pub total_debits: Decimal,
    pub transaction_count: usize,
    pub broken_links: Vec<String>,
    pub is_consistent: bool,
}

impl From<ReconciliationReport> for ReconciliationDto {
    fn from(r: ReconciliationReport) -> Self {
        Self {
            balance: decimal_from_cents(r.balance),
            computed_balance: decimal_from_cents(r.computed_balance),
            total_credits: decimal_from_cents(r.total_credits),
            total_debits: decimal_from_cents(r.total_debits),
            wallet_id: r.wallet_id,
            transaction_count: r.transaction_count,
            broken_links: r.broken_links,
            is_consistent: r.is_consistent,
        }
    }
}
