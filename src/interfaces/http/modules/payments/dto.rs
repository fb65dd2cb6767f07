//! Payment DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use super::super::wallet::TransactionDto;
use crate::application::{PaymentRequest, Receipt};
use crate::domain::{ChargeReference, DomainResult, Payment, PaymentType};
use crate::interfaces::http::common::AnchorDto;
use crate::shared::money::{cents_from_decimal, decimal_from_cents};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreatePaymentRequest {
    #[schema(example = "10.00")]
    pub amount: Decimal,
    /// parking or charging
    pub payment_type: String,
    /// Reservation id for parking, session id for charging
    #[validate(length(min = 1, max = 64))]
    pub reference_id: String,
    #[validate(length(max = 255))]
    pub description: Option<String>,
}

impl CreatePaymentRequest {
    pub fn into_request(self) -> DomainResult<PaymentRequest> {
        let payment_type: PaymentType = self.payment_type.parse()?;
        let reference = match payment_type {
            PaymentType::Parking => ChargeReference::Reservation(self.reference_id),
            PaymentType::Charging => ChargeReference::Session(self.reference_id),
            PaymentType::Refund => ChargeReference::Other(self.reference_id),
        };
        Ok(PaymentRequest {
            amount: cents_from_decimal(self.amount)?,
            description: self
                .description
                .unwrap_or_else(|| format!("{} payment", payment_type.as_str())),
            payment_type,
            reference,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RefundRequest {
    /// Defaults to everything not yet refunded
    pub amount: Option<Decimal>,
    #[validate(length(max = 255))]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentDto {
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub amount: Decimal,
    pub payment_type: String,
    pub reference_id: String,
    pub description: String,
    pub status: String,
    pub refunded_amount: Decimal,
    #[serde(flatten)]
    pub anchor: Option<AnchorDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Payment> for PaymentDto {
    fn from(p: Payment) -> Self {
        Self {
            payment_type: p.payment_type.as_str().to_string(),
            status: p.status.to_string(),
            amount: decimal_from_cents(p.amount),
            refunded_amount: decimal_from_cents(p.refunded_amount),
            anchor: p.anchor.map(AnchorDto::from),
            id: p.id,
            wallet_id: p.wallet_id,
            user_id: p.user_id,
            reference_id: p.reference_id,
            description: p.description,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceiptDto {
    pub receipt_number: String,
    pub payment: PaymentDto,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<TransactionDto>,
    pub refunds: Vec<PaymentDto>,
    pub net_amount: Decimal,
    pub currency: String,
    pub issued_at: DateTime<Utc>,
}

impl From<Receipt> for ReceiptDto {
    fn from(r: Receipt) -> Self {
        Self {
            receipt_number: r.receipt_number,
            payment: r.payment.into(),
            transaction: r.transaction.map(TransactionDto::from),
            refunds: r.refunds.into_iter().map(PaymentDto::from).collect(),
            net_amount: decimal_from_cents(r.net_amount),
            currency: r.currency,
            issued_at: r.issued_at,
        }
    }
}
