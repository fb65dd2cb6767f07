//! User management DTOs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::application::{ActivityEntry, UserChanges};
use crate::shared::money::decimal_from_cents;

/// Omitted fields are kept; an empty string clears the field.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateUserRequest {
    #[validate(length(max = 100))]
    pub first_name: Option<String>,
    #[validate(length(max = 100))]
    pub last_name: Option<String>,
    #[schema(example = "+998 90 123 45 67")]
    #[validate(length(max = 32))]
    pub phone: Option<String>,
}

impl From<UpdateUserRequest> for UserChanges {
    fn from(r: UpdateUserRequest) -> Self {
        Self {
            first_name: r.first_name,
            last_name: r.last_name,
            phone: r.phone,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ActivityDto {
    /// account, reservation, charging_session or transaction
    pub kind: String,
    pub reference_id: String,
    pub status: String,
    pub summary: String,
    /// Signed for transactions: credits positive, debits negative
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Decimal>,
    pub occurred_at: DateTime<Utc>,
}

impl From<ActivityEntry> for ActivityDto {
    fn from(e: ActivityEntry) -> Self {
        Self {
            kind: e.kind.as_str().to_string(),
            amount: e.amount.map(decimal_from_cents),
            reference_id: e.reference_id,
            status: e.status,
            summary: e.summary,
            occurred_at: e.occurred_at,
        }
    }
}
