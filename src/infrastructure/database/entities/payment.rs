//! Payment entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    pub amount: i64,
    /// parking, charging, refund
    pub payment_type: String,
    pub reference_id: String,
    pub description: String,
    /// pending, completed, failed, refunded
    pub status: String,
    pub refunded_amount: i64,
    #[sea_orm(nullable)]
    pub anchor_tx_hash: Option<String>,
    #[sea_orm(nullable)]
    pub anchor_block_number: Option<i64>,
    #[sea_orm(nullable)]
    pub anchor_orgs: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::wallet::Entity",
        from = "Column::WalletId",
        to = "super::wallet::Column::Id"
    )]
    Wallet,
}

impl Related<super::wallet::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Wallet.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
