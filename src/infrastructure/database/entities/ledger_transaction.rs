//! Ledger transaction entity (append-only)

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ledger_transactions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub wallet_id: String,
    pub user_id: String,
    /// deposit, withdrawal, payment, refund, credit, debit
    pub tx_type: String,
    pub amount: i64,
    pub balance_before: i64,
    pub balance_after: i64,
    pub status: String,
    #[sea_orm(nullable)]
    pub reservation_id: Option<String>,
    #[sea_orm(nullable)]
    pub session_id: Option<String>,
    #[sea_orm(nullable)]
    pub payment_id: Option<String>,
    pub description: String,
    #[sea_orm(nullable)]
    pub anchor_tx_hash: Option<String>,
    #[sea_orm(nullable)]
    pub anchor_block_number: Option<i64>,
    #[sea_orm(nullable)]
    pub anchor_orgs: Option<String>,
    /// Wallet version this transaction produced; orders a wallet's history
    pub wallet_version: i64,
    pub created_at: DateTimeUtc,
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
