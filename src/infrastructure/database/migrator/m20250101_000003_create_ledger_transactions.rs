//! Create ledger_transactions table (append-only)

use sea_orm_migration::prelude::*;

use super::m20250101_000002_create_wallets::Wallets;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LedgerTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LedgerTransactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::WalletId).string().not_null())
                    .col(ColumnDef::new(LedgerTransactions::UserId).string().not_null())
                    .col(
                        ColumnDef::new(LedgerTransactions::TxType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Amount)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::BalanceBefore)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::BalanceAfter)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::Status)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(ColumnDef::new(LedgerTransactions::ReservationId).string())
                    .col(ColumnDef::new(LedgerTransactions::SessionId).string())
                    .col(ColumnDef::new(LedgerTransactions::PaymentId).string())
                    .col(
                        ColumnDef::new(LedgerTransactions::Description)
                            .string()
                            .not_null()
                            .default(""),
                    )
                    .col(ColumnDef::new(LedgerTransactions::AnchorTxHash).string())
                    .col(ColumnDef::new(LedgerTransactions::AnchorBlockNumber).big_integer())
                    .col(ColumnDef::new(LedgerTransactions::AnchorOrgs).string())
                    .col(
                        ColumnDef::new(LedgerTransactions::WalletVersion)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LedgerTransactions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ledger_transactions_wallet")
                            .from(LedgerTransactions::Table, LedgerTransactions::WalletId)
                            .to(Wallets::Table, Wallets::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ledger_transactions_wallet_version")
                    .table(LedgerTransactions::Table)
                    .col(LedgerTransactions::WalletId)
                    .col(LedgerTransactions::WalletVersion)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LedgerTransactions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum LedgerTransactions {
    Table,
    Id,
    WalletId,
    UserId,
    TxType,
    Amount,
    BalanceBefore,
    BalanceAfter,
    Status,
    ReservationId,
    SessionId,
    PaymentId,
    Description,
    AnchorTxHash,
    AnchorBlockNumber,
    AnchorOrgs,
    WalletVersion,
    CreatedAt,
}
