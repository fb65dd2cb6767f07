//! Create charging_sessions table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingSessions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingSessions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingSessions::StationId).string().not_null())
                    .col(ColumnDef::new(ChargingSessions::UserId).string().not_null())
                    .col(
                        ColumnDef::new(ChargingSessions::StartTime)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ChargingSessions::EndTime).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(ChargingSessions::DurationMinutes)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::EnergyWh)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::PricePerKwh)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::CurrentCost)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ChargingSessions::TotalCost).big_integer())
                    .col(
                        ColumnDef::new(ChargingSessions::Status)
                            .string_len(20)
                            .not_null()
                            .default("starting"),
                    )
                    .col(ColumnDef::new(ChargingSessions::PaymentId).string())
                    .col(ColumnDef::new(ChargingSessions::AnchorTxHash).string())
                    .col(ColumnDef::new(ChargingSessions::AnchorBlockNumber).big_integer())
                    .col(ColumnDef::new(ChargingSessions::AnchorOrgs).string())
                    .col(
                        ColumnDef::new(ChargingSessions::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingSessions::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_station")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::StationId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_charging_sessions_user_status")
                    .table(ChargingSessions::Table)
                    .col(ChargingSessions::UserId)
                    .col(ChargingSessions::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingSessions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingSessions {
    Table,
    Id,
    StationId,
    UserId,
    StartTime,
    EndTime,
    DurationMinutes,
    EnergyWh,
    PricePerKwh,
    CurrentCost,
    TotalCost,
    Status,
    PaymentId,
    AnchorTxHash,
    AnchorBlockNumber,
    AnchorOrgs,
    CreatedAt,
    UpdatedAt,
}
