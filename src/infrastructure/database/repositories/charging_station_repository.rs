//! SeaORM implementation of ChargingStationRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::{db_err, fetch_page, insert_err, parse_column};
use crate::domain::catalog::ChargingStationRepository;
use crate::domain::{ChargingStation, DomainError, DomainResult, StationFilter, StationStatus};
use crate::infrastructure::database::entities::charging_station;
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmChargingStationRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargingStationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charging_station::Model) -> DomainResult<ChargingStation> {
    Ok(ChargingStation {
        connector_type: parse_column("connector_type", &m.connector_type)?,
        status: parse_column("station status", &m.status)?,
        id: m.id,
        operator_id: m.operator_id,
        name: m.name,
        location: m.location,
        latitude: m.latitude,
        longitude: m.longitude,
        power_output_kw: m.power_output_kw,
        price_per_kwh: m.price_per_kwh,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

#[async_trait]
impl ChargingStationRepository for SeaOrmChargingStationRepository {
    async fn save(&self, s: ChargingStation) -> DomainResult<()> {
        debug!(station_id = %s.id, "Saving charging station");
        let id = s.id.clone();
        let model = charging_station::ActiveModel {
            id: Set(s.id),
            operator_id: Set(s.operator_id),
            name: Set(s.name),
            location: Set(s.location),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
            power_output_kw: Set(s.power_output_kw),
            connector_type: Set(s.connector_type.as_str().to_string()),
            price_per_kwh: Set(s.price_per_kwh),
            status: Set(s.status.as_str().to_string()),
            created_at: Set(s.created_at),
            updated_at: Set(s.updated_at),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("station {} already exists", id)))?;
        Ok(())
    }

    /// Descriptive fields only; status is left to `transition_status`.
    async fn update(&self, s: ChargingStation) -> DomainResult<()> {
        let result = charging_station::Entity::update_many()
            .col_expr(charging_station::Column::Name, Expr::value(s.name.clone()))
            .col_expr(
                charging_station::Column::Location,
                Expr::value(s.location.clone()),
            )
            .col_expr(charging_station::Column::Latitude, Expr::value(s.latitude))
            .col_expr(charging_station::Column::Longitude, Expr::value(s.longitude))
            .col_expr(
                charging_station::Column::PowerOutputKw,
                Expr::value(s.power_output_kw),
            )
            .col_expr(
                charging_station::Column::ConnectorType,
                Expr::value(s.connector_type.as_str()),
            )
            .col_expr(
                charging_station::Column::PricePerKwh,
                Expr::value(s.price_per_kwh),
            )
            .col_expr(charging_station::Column::UpdatedAt, Expr::value(s.updated_at))
            .filter(charging_station::Column::Id.eq(s.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ChargingStation", s.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingStation>> {
        let model = charging_station::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn search(
        &self,
        filter: &StationFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingStation>> {
        let mut query = charging_station::Entity::find();

        if let Some(ref needle) = filter.location {
            query = query.filter(
                Condition::any()
                    .add(charging_station::Column::Location.contains(needle))
                    .add(charging_station::Column::Name.contains(needle)),
            );
        }
        if let Some(connector) = filter.connector_type {
            query = query.filter(charging_station::Column::ConnectorType.eq(connector.as_str()));
        }
        if let Some(min) = filter.min_power_kw {
            query = query.filter(charging_station::Column::PowerOutputKw.gte(min));
        }
        if let Some(max) = filter.max_power_kw {
            query = query.filter(charging_station::Column::PowerOutputKw.lte(max));
        }
        if filter.available_only {
            query = query
                .filter(charging_station::Column::Status.eq(StationStatus::Available.as_str()));
        }
        if let Some(ref op) = filter.operator_id {
            query = query.filter(charging_station::Column::OperatorId.eq(op.as_str()));
        }
        let query = query
            .order_by_asc(charging_station::Column::CreatedAt)
            .order_by_asc(charging_station::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = charging_station::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ChargingStation", id));
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: StationStatus,
        to: StationStatus,
    ) -> DomainResult<bool> {
        let result = charging_station::Entity::update_many()
            .col_expr(charging_station::Column::Status, Expr::value(to.as_str()))
            .col_expr(charging_station::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(charging_station::Column::Id.eq(id))
            .filter(charging_station::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}
