//! SeaORM implementation of ParkingSpotRepository

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use tracing::debug;

use super::{db_err, fetch_page, insert_err, parse_column};
use crate::domain::catalog::ParkingSpotRepository;
use crate::domain::{DomainError, DomainResult, ParkingSpot, SpotFilter, SpotStatus};
use crate::infrastructure::database::entities::parking_spot;
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmParkingSpotRepository {
    db: DatabaseConnection,
}

impl SeaOrmParkingSpotRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: parking_spot::Model) -> DomainResult<ParkingSpot> {
    let features: Vec<String> = serde_json::from_str(&m.features).map_err(|e| {
        DomainError::Storage(format!("invalid features for spot {}: {}", m.id, e))
    })?;
    Ok(ParkingSpot {
        spot_type: parse_column("spot_type", &m.spot_type)?,
        status: parse_column("spot status", &m.status)?,
        id: m.id,
        operator_id: m.operator_id,
        name: m.name,
        location: m.location,
        latitude: m.latitude,
        longitude: m.longitude,
        price_per_hour: m.price_per_hour,
        has_ev_charging: m.has_ev_charging,
        features,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn features_column(features: &[String]) -> DomainResult<String> {
    serde_json::to_string(features)
        .map_err(|e| DomainError::Storage(format!("failed to encode features: {}", e)))
}

// ── ParkingSpotRepository impl ──────────────────────────────────

#[async_trait]
impl ParkingSpotRepository for SeaOrmParkingSpotRepository {
    async fn save(&self, s: ParkingSpot) -> DomainResult<()> {
        debug!(spot_id = %s.id, "Saving parking spot");
        let id = s.id.clone();
        let model = parking_spot::ActiveModel {
            features: Set(features_column(&s.features)?),
            id: Set(s.id),
            operator_id: Set(s.operator_id),
            name: Set(s.name),
            location: Set(s.location),
            latitude: Set(s.latitude),
            longitude: Set(s.longitude),
            spot_type: Set(s.spot_type.as_str().to_string()),
            price_per_hour: Set(s.price_per_hour),
            has_ev_charging: Set(s.has_ev_charging),
            status: Set(s.status.as_str().to_string()),
            created_at: Set(s.created_at),
            updated_at: Set(s.updated_at),
        };
        model
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("spot {} already exists", id)))?;
        Ok(())
    }

    async fn update(&self, s: ParkingSpot) -> DomainResult<()> {
        debug!(spot_id = %s.id, "Updating parking spot");
        let result = parking_spot::Entity::update_many()
            .col_expr(parking_spot::Column::Name, Expr::value(s.name.clone()))
            .col_expr(parking_spot::Column::Location, Expr::value(s.location.clone()))
            .col_expr(parking_spot::Column::Latitude, Expr::value(s.latitude))
            .col_expr(parking_spot::Column::Longitude, Expr::value(s.longitude))
            .col_expr(
                parking_spot::Column::SpotType,
                Expr::value(s.spot_type.as_str()),
            )
            .col_expr(parking_spot::Column::PricePerHour, Expr::value(s.price_per_hour))
            .col_expr(
                parking_spot::Column::HasEvCharging,
                Expr::value(s.has_ev_charging),
            )
            .col_expr(
                parking_spot::Column::Features,
                Expr::value(features_column(&s.features)?),
            )
            .col_expr(parking_spot::Column::UpdatedAt, Expr::value(s.updated_at))
            .filter(parking_spot::Column::Id.eq(s.id.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ParkingSpot", s.id));
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ParkingSpot>> {
        let model = parking_spot::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn search(
        &self,
        filter: &SpotFilter,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ParkingSpot>> {
        let mut query = parking_spot::Entity::find();

        if let Some(ref needle) = filter.location {
            query = query.filter(
                Condition::any()
                    .add(parking_spot::Column::Location.contains(needle))
                    .add(parking_spot::Column::Name.contains(needle)),
            );
        }
        if let Some(spot_type) = filter.spot_type {
            query = query.filter(parking_spot::Column::SpotType.eq(spot_type.as_str()));
        }
        if let Some(min) = filter.min_price {
            query = query.filter(parking_spot::Column::PricePerHour.gte(min));
        }
        if let Some(max) = filter.max_price {
            query = query.filter(parking_spot::Column::PricePerHour.lte(max));
        }
        if let Some(ev) = filter.has_ev_charging {
            query = query.filter(parking_spot::Column::HasEvCharging.eq(ev));
        }
        if filter.available_only {
            query = query.filter(parking_spot::Column::Status.eq(SpotStatus::Available.as_str()));
        }
        if let Some(ref op) = filter.operator_id {
            query = query.filter(parking_spot::Column::OperatorId.eq(op.as_str()));
        }
        let query = query
            .order_by_asc(parking_spot::Column::CreatedAt)
            .order_by_asc(parking_spot::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn delete(&self, id: &str) -> DomainResult<()> {
        let result = parking_spot::Entity::delete_by_id(id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        if result.rows_affected == 0 {
            return Err(DomainError::not_found("ParkingSpot", id));
        }
        Ok(())
    }

    async fn transition_status(
        &self,
        id: &str,
        from: SpotStatus,
        to: SpotStatus,
    ) -> DomainResult<bool> {
        let result = parking_spot::Entity::update_many()
            .col_expr(parking_spot::Column::Status, Expr::value(to.as_str()))
            .col_expr(parking_spot::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(parking_spot::Column::Id.eq(id))
            .filter(parking_spot::Column::Status.eq(from.as_str()))
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected == 1)
    }
}
