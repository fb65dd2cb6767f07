//! Create charging_stations table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ChargingStations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ChargingStations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ChargingStations::OperatorId).string().not_null())
                    .col(ColumnDef::new(ChargingStations::Name).string().not_null())
                    .col(ColumnDef::new(ChargingStations::Location).string().not_null())
                    .col(ColumnDef::new(ChargingStations::Latitude).double().not_null())
                    .col(ColumnDef::new(ChargingStations::Longitude).double().not_null())
                    .col(
                        ColumnDef::new(ChargingStations::PowerOutputKw)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::ConnectorType)
                            .string_len(20)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::PricePerKwh)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::Status)
                            .string_len(20)
                            .not_null()
                            .default("available"),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ChargingStations::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ChargingStations::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum ChargingStations {
    Table,
    Id,
    OperatorId,
    Name,
    Location,
    Latitude,
    Longitude,
    PowerOutputKw,
    ConnectorType,
    PricePerKwh,
    Status,
    CreatedAt,
    UpdatedAt,
}
