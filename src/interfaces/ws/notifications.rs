//! Event stream for UI clients
//!
//! Browsers cannot set headers on a WebSocket upgrade, so the JWT travels
//! in the `token` query parameter. Regular users only ever see their own
//! records plus catalog status changes; admins may watch any user.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::select;
use tracing::{debug, error, info, warn};

use crate::application::events::{EventMessage, SharedEventBus};
use crate::infrastructure::crypto::{verify_token, JwtConfig};
use crate::interfaces::http::common::{ApiResponse, EmptyData};

#[derive(Debug, Default, Deserialize)]
pub struct NotificationQuery {
    pub token: Option<String>,
    pub user_id: Option<String>,
    /// Comma-separated, e.g. `funds_added,payment_processed`
    pub event_types: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub user_id: Option<String>,
    pub event_types: Vec<String>,
}

impl EventFilter {
    pub fn new(user_id: Option<String>, event_types: Option<&str>) -> Self {
        let event_types = event_types
            .map(|types| {
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default();
        Self {
            user_id,
            event_types,
        }
    }

    /// Events without an owner (catalog status changes) pass the user filter.
    pub fn matches(&self, message: &EventMessage) -> bool {
        if let (Some(wanted), Some(owner)) = (&self.user_id, message.event.user_id()) {
            if wanted != owner {
                return false;
            }
        }
        self.event_types.is_empty()
            || self
                .event_types
                .iter()
                .any(|t| t == message.event.event_type())
    }
}

#[derive(Clone)]
pub struct NotificationState {
    pub event_bus: SharedEventBus,
    pub jwt_config: JwtConfig,
}

pub fn create_notification_state(event_bus: SharedEventBus, jwt_config: JwtConfig) -> NotificationState {
    NotificationState {
        event_bus,
        jwt_config,
    }
}

fn reject(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(ApiResponse::<EmptyData>::error_with_code(message, "unauthorized")),
    )
        .into_response()
}

/// `GET /api/v1/notifications/ws`
pub async fn ws_notifications_handler(
    ws: WebSocketUpgrade,
    State(state): State<NotificationState>,
    Query(query): Query<NotificationQuery>,
) -> Response {
    let Some(token) = query.token.as_deref() else {
        return reject("Missing token");
    };
    let claims = match verify_token(token, &state.jwt_config) {
        Ok(claims) => claims,
        Err(e) => {
            debug!(error = %e, "Rejected notification stream token");
            return reject("Invalid token");
        }
    };

    let user_id = if claims.is_admin() {
        query.user_id
    } else {
        Some(claims.sub.clone())
    };
    let filter = EventFilter::new(user_id, query.event_types.as_deref());

    info!(
        subscriber = %claims.sub,
        user_filter = ?filter.user_id,
        event_types = ?filter.event_types,
        "Notification stream opened"
    );
    ws.on_upgrade(move |socket| stream_events(socket, state, filter))
}

async fn stream_events(socket: WebSocket, state: NotificationState, filter: EventFilter) {
    let (mut sender, mut receiver) = socket.split();
    let mut subscriber = state.event_bus.subscribe();

    let welcome = serde_json::json!({
        "type": "connected",
        "filter": {
            "user_id": filter.user_id,
            "event_types": filter.event_types,
        }
    });
    if let Err(e) = sender.send(Message::Text(welcome.to_string().into())).await {
        error!(error = %e, "Failed to send welcome message");
        return;
    }

    loop {
        select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    warn!(error = %e, "Notification socket error");
                    break;
                }
                Some(Ok(_)) => {}
            },

            event = subscriber.recv() => {
                let Some(message) = event else {
                    warn!("Event bus closed");
                    break;
                };
                if !filter.matches(&message) {
                    continue;
                }
                match serde_json::to_string(&message) {
                    Ok(json) => {
                        if let Err(e) = sender.send(Message::Text(json.into())).await {
                            debug!(error = %e, "Client went away");
                            break;
                        }
                    }
                    Err(e) => error!(error = %e, "Failed to serialize event"),
                }
            }
        }
    }

    info!("Notification stream closed");
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::events::{Event, LedgerEvent, ResourceStatusEvent};
    use chrono::Utc;

    fn funds_added(user_id: &str) -> EventMessage {
        EventMessage::new(Event::FundsAdded(LedgerEvent {
            wallet_id: "w1".into(),
            user_id: user_id.into(),
            transaction_id: "t1".into(),
            payment_id: None,
            amount: 100,
            balance_after: 100,
            timestamp: Utc::now(),
        }))
    }

    fn spot_changed() -> EventMessage {
        EventMessage::new(Event::SpotStatusChanged(ResourceStatusEvent {
            resource_id: "S1".into(),
            old_status: "available".into(),
            new_status: "reserved".into(),
            timestamp: Utc::now(),
        }))
    }

    #[test]
    fn user_filter_drops_other_owners() {
        let filter = EventFilter::new(Some("u1".into()), None);
        assert!(filter.matches(&funds_added("u1")));
        assert!(!filter.matches(&funds_added("u2")));
        assert!(filter.matches(&spot_changed()));
    }

    #[test]
    fn type_filter_is_a_whitelist() {
        let filter = EventFilter::new(None, Some(" funds_added , payment_processed,"));
        assert_eq!(filter.event_types.len(), 2);
        assert!(filter.matches(&funds_added("u2")));
        assert!(!filter.matches(&spot_changed()));
    }

    #[test]
    fn empty_filter_passes_everything() {
        let filter = EventFilter::default();
        assert!(filter.matches(&funds_added("u1")));
        assert!(filter.matches(&spot_changed()));
    }
}
