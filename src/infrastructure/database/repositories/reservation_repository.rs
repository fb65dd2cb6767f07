//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::debug;

use super::{anchor_columns, db_err, fetch_page, insert_err, parse_column};
use crate::domain::reservation::ReservationRepository;
use crate::domain::{DomainError, DomainResult, LedgerAnchor, Reservation, ReservationStatus};
use crate::infrastructure::database::entities::reservation;
use crate::shared::{PageRequest, PaginatedResult};

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    Ok(Reservation {
        status: parse_column("reservation status", &m.status)?,
        anchor: LedgerAnchor::from_columns(m.anchor_tx_hash, m.anchor_block_number, m.anchor_orgs),
        id: m.id,
        spot_id: m.spot_id,
        user_id: m.user_id,
        start_time: m.start_time,
        end_time: m.end_time,
        actual_check_in: m.actual_check_in,
        actual_check_out: m.actual_check_out,
        price_per_hour: m.price_per_hour,
        total_cost: m.total_cost,
        qr_code: m.qr_code,
        payment_id: m.payment_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn domain_to_active(r: Reservation) -> reservation::ActiveModel {
    let (tx_hash, block_number, orgs) = anchor_columns(&r.anchor);
    reservation::ActiveModel {
        id: Set(r.id),
        spot_id: Set(r.spot_id),
        user_id: Set(r.user_id),
        start_time: Set(r.start_time),
        end_time: Set(r.end_time),
        actual_check_in: Set(r.actual_check_in),
        actual_check_out: Set(r.actual_check_out),
        price_per_hour: Set(r.price_per_hour),
        total_cost: Set(r.total_cost),
        status: Set(r.status.as_str().to_string()),
        qr_code: Set(r.qr_code),
        payment_id: Set(r.payment_id),
        anchor_tx_hash: Set(tx_hash),
        anchor_block_number: Set(block_number),
        anchor_orgs: Set(orgs),
        created_at: Set(r.created_at),
        updated_at: Set(r.updated_at),
    }
}

fn statuses_column(statuses: &[ReservationStatus]) -> Vec<&'static str> {
    statuses.iter().map(|s| s.as_str()).collect()
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn save(&self, r: Reservation) -> DomainResult<()> {
        debug!(reservation_id = %r.id, spot_id = %r.spot_id, "Saving reservation");
        let id = r.id.clone();
        domain_to_active(r)
            .insert(&self.db)
            .await
            .map_err(|e| insert_err(e, || format!("reservation {} already exists", id)))?;
        Ok(())
    }

    async fn update(&self, r: Reservation) -> DomainResult<()> {
        debug!(reservation_id = %r.id, status = %r.status, "Updating reservation");
        let id = r.id.clone();
        match domain_to_active(r).update(&self.db).await {
            Ok(_) => Ok(()),
            Err(sea_orm::DbErr::RecordNotUpdated) => {
                Err(DomainError::not_found("Reservation", id))
            }
            Err(e) => Err(db_err(e)),
        }
    }

    async fn find_by_id(&self, id: &str) -> DomainResult<Option<Reservation>> {
        let model = reservation::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        model.map(model_to_domain).transpose()
    }

    async fn find_for_user(
        &self,
        user_id: &str,
        statuses: &[ReservationStatus],
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let mut query = reservation::Entity::find().filter(reservation::Column::UserId.eq(user_id));
        if !statuses.is_empty() {
            query = query.filter(reservation::Column::Status.is_in(statuses_column(statuses)));
        }
        let query = query
            .order_by_desc(reservation::Column::CreatedAt)
            .order_by_desc(reservation::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn find_for_spot(
        &self,
        spot_id: &str,
        page: PageRequest,
    ) -> DomainResult<PaginatedResult<Reservation>> {
        let query = reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(spot_id))
            .order_by_desc(reservation::Column::CreatedAt)
            .order_by_desc(reservation::Column::Id);

        let (models, total) = fetch_page(&self.db, query, page).await?;
        let items = models
            .into_iter()
            .map(model_to_domain)
            .collect::<DomainResult<Vec<_>>>()?;
        Ok(PaginatedResult::new(items, total, page.page, page.limit))
    }

    async fn find_live_for_spot(&self, spot_id: &str) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::SpotId.eq(spot_id))
            .filter(reservation::Column::Status.is_in(statuses_column(&ReservationStatus::LIVE)))
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn find_no_shows(&self, now: DateTime<Utc>) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .filter(reservation::Column::Status.eq(ReservationStatus::Confirmed.as_str()))
            .filter(reservation::Column::ActualCheckIn.is_null())
            .filter(reservation::Column::EndTime.lte(now))
            .order_by_asc(reservation::Column::EndTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}
