//! SeaORM implementation of ChargingSessionRepository

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use tracing::debug;

use super::{anchor_columns, db_err, fetch_page, insert_err, parse_column};
use crate::domain::charging_session::ChargingSessionRepository;
use crate::domain::{ChargingSession, DomainError, DomainResult, LedgerAnchor, SessionStatus};
use crate::infrastructure::database::entities::charging_session;
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmChargingSessionRepository {
    db: DatabaseConnection,
}

impl SeaOrmChargingSessionRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: charging_session::Model) -> DomainResult<ChargingSession> {
    Ok(ChargingSession {
        status: parse_column("session status", &m.status)?,
        anchor: LedgerAnchor::from_columns(m.anchor_tx_hash, m.anchor_block_number, m.anchor_orgs),
        id: m.id,
        station_id: m.station_id,
        user_id: m.user_id,
        start_time: m.start_time,
        end_time: m.end_time,
        duration_minutes: m.duration_minutes,
        energy_wh: m.energy_wh,
        price_per_kwh: m.price_per_kwh,
        current_cost: m.current_cost,
        total_cost: m.total_cost,
        payment_id: m.payment_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn domain_to_active(s: ChargingSession) -> charging_session::ActiveModel {
    let (tx_hash, block_number, orgs) = anchor_columns(&s.anchor);
    charging_session::ActiveModel {
        id: Set(s.id),
        station_id: Set(s.station_id),
        user_id: Set(s.user_id),
        start_time: Set(s.start_time),
        end_time: Set(s.end_time),
        duration_minutes: Set(s.duration_minutes),
        energy_wh: Set(s.energy_wh),
        price_per_kwh: Set(s.price_per_kwh),
        current_cost: Set(s.current_cost),
        total_cost: Set(s.total_cost),
        status: Set(s.status.as_str().to_string()),
        payment_id: Set(s.payment_id),
        anchor_tx_hash: Set(tx_hash),
        anchor_block_number: Set(block_number),
        anchor_orgs: Set(orgs),
        created_at: Set(s.created_at),
        updated_at: Set(s.updated_at),
    }
}

#[async_trait]
impl ChargingSessionRepository for SeaOrmChargingSessionRepository {
    async fn save(&self, s: ChargingSession) -> DomainResult<()> {
        debug!(session_id = %s.id, station_id = %s.station_id, "Saving charging session");
        let id = s.id.clone();
        domain_to_active(s)
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("session {} already exists", id)))?;
        Ok(())
    }

    async fn update(&self, s: ChargingSession) -> DomainResult<()> {
        let id = s.id.clone();
        match domain_to_active(s).update(&self.db).await {
            Ok(_) => Ok(()),
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(DomainError::not_found("ChargingSession", id))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<ChargingSession>> {
        let model = charging_session::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[SessionStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        let mut query =
            charging_session::Entity::find().filter(charging_session::Column::UserId.eq(user_id));
        if !statuses.is_empty() {
            let values: Vec<&'static str> = statuses.iter().map(|s| s.as_str()).collect();
            query = query.filter(charging_session::Column::Status.is_in(values));
        }
        let query = query
            .order_by_desc(charging_session::Column::CreatedAt)
            .order_by_desc(charging_session::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn find_for_station(
        &self,
        station_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<ChargingSession>> {
        let query = charging_session::Entity::find()
            .filter(charging_session::Column::StationId.eq(station_id))
            .order_by_desc(charging_session::Column::CreatedAt)
            .order_by_desc(charging_session::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn total_energy_for_user(&self, user_id: &str) -> DomainResult<i64> {
        let total: Option<Option<i64>> = charging_session::Entity::find()
            .select_only()
            .column_as(
                Expr::col(charging_session::Column::EnergyWh).sum(),
                "total",
            )
            .filter(charging_session::Column::UserId.eq(user_id))
            .filter(charging_session::Column::Status.eq(SessionStatus::Completed.as_str()))
            .into_tuple()
            .one(&self.db)
            .await
            .map_err(db_err)?;
        Ok(total.flatten().unwrap_or(0))
    }
}
