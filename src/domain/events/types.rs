//! Notification events
//!
//! Facts published after a lifecycle or ledger transition has been stored.
//! Amounts are cents, energy is watt-hours.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    ReservationCreated(ReservationEvent),
    ReservationCheckedIn(ReservationEvent),
    ReservationCheckedOut(ReservationCheckedOutEvent),
    ReservationExtended(ReservationEvent),
    ReservationCancelled(ReservationCancelledEvent),
    ChargingStarted(ChargingEvent),
    ChargingProgress(ChargingEvent),
    ChargingStopped(ChargingEvent),
    ChargingCancelled(ChargingEvent),
    FundsAdded(LedgerEvent),
    PaymentProcessed(LedgerEvent),
    PaymentRefunded(LedgerEvent),
    SpotStatusChanged(ResourceStatusEvent),
    StationStatusChanged(ResourceStatusEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ReservationCreated(_) => "reservation_created",
            Event::ReservationCheckedIn(_) => "reservation_checked_in",
            Event::ReservationCheckedOut(_) => "reservation_checked_out",
            Event::ReservationExtended(_) => "reservation_extended",
            Event::ReservationCancelled(_) => "reservation_cancelled",
            Event::ChargingStarted(_) => "charging_started",
            Event::ChargingProgress(_) => "charging_progress",
            Event::ChargingStopped(_) => "charging_stopped",
            Event::ChargingCancelled(_) => "charging_cancelled",
            Event::FundsAdded(_) => "funds_added",
            Event::PaymentProcessed(_) => "payment_processed",
            Event::PaymentRefunded(_) => "payment_refunded",
            Event::SpotStatusChanged(_) => "spot_status_changed",
            Event::StationStatusChanged(_) => "station_status_changed",
        }
    }

    /// Owner of the affected record; `None` for catalog events.
    pub fn user_id(&self) -> Option<&str> {
        match self {
            Event::ReservationCreated(e)
            | Event::ReservationCheckedIn(e)
            | Event::ReservationExtended(e) => Some(&e.user_id),
            Event::ReservationCheckedOut(e) => Some(&e.reservation.user_id),
            Event::ReservationCancelled(e) => Some(&e.reservation.user_id),
            Event::ChargingStarted(e)
            | Event::ChargingProgress(e)
            | Event::ChargingStopped(e)
            | Event::ChargingCancelled(e) => Some(&e.user_id),
            Event::FundsAdded(e) | Event::PaymentProcessed(e) | Event::PaymentRefunded(e) => {
                Some(&e.user_id)
            }
            Event::SpotStatusChanged(_) | Event::StationStatusChanged(_) => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationEvent {
    pub reservation_id: String,
    pub spot_id: String,
    pub user_id: String,
    pub status: String,
    pub total_cost: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCheckedOutEvent {
    #[serde(flatten)]
    pub reservation: ReservationEvent,
    /// Positive: extra charged; negative: refunded
    pub settlement: i64,
    /// Overtime that could not be charged
    pub unpaid: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationCancelledEvent {
    #[serde(flatten)]
    pub reservation: ReservationEvent,
    pub refunded: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChargingEvent {
    pub session_id: String,
    pub station_id: String,
    pub user_id: String,
    pub status: String,
    pub energy_wh: i64,
    pub cost: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub wallet_id: String,
    pub user_id: String,
    pub transaction_id: String,
    pub payment_id: Option<String>,
    pub amount: i64,
    pub balance_after: i64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceStatusEvent {
    pub resource_id: String,
    pub old_status: String,
    pub new_status: String,
    pub timestamp: DateTime<Utc>,
}

/// Wrapper for sending events with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_type_tag() {
        let msg = EventMessage::new(Event::FundsAdded(LedgerEvent {
            wallet_id: "w1".into(),
            user_id: "u1".into(),
            transaction_id: "t1".into(),
            payment_id: None,
            amount: 100,
            balance_after: 100,
            timestamp: Utc::now(),
        }));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "FundsAdded");
        assert_eq!(json["data"]["amount"], 100);
        assert_eq!(msg.event.event_type(), "funds_added");
        assert_eq!(msg.event.user_id(), Some("u1"));
    }

    #[test]
    fn catalog_events_have_no_owner() {
        let e = Event::SpotStatusChanged(ResourceStatusEvent {
            resource_id: "S1".into(),
            old_status: "available".into(),
            new_status: "maintenance".into(),
            timestamp: Utc::now(),
        });
        assert_eq!(e.user_id(), None);
    }
}
