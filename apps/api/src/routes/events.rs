//! # Real-time Events
//!
//! `GET /api/events` upgrades to a WebSocket that streams the calling
//! business's events as JSON text frames:
//!
//! ```text
//! {"event":"sale_completed","data":{"orderId":7,"businessId":1}}
//! {"event":"order_status_updated","data":{"orderId":7,"status":"delivered"}}
//! {"event":"stock_adjusted","data":{"productId":3,"quantity":12,"reason":"restock"}}
//! ```
//!
//! Browsers cannot set headers on a WebSocket handshake, so this route also
//! accepts `?businessId=` (see [`BusinessContext`]). Anything the client
//! sends is ignored apart from close frames.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use stockconnect_notify::EventSubscription;

use crate::business::BusinessContext;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/api/events", get(events_ws))
}

async fn events_ws(
    State(state): State<AppState>,
    business: BusinessContext,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    // Subscribe before the upgrade so nothing emitted in between is missed
    let subscription = state.hub.subscribe(business.id);
    ws.on_upgrade(move |socket| stream_events(socket, subscription, business.id))
}

async fn stream_events(socket: WebSocket, mut subscription: EventSubscription, business_id: i64) {
    info!(business_id, "Event subscriber connected");
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = subscription.recv() => {
                let Some(event) = event else {
                    debug!(business_id, "Event hub closed");
                    break;
                };
                let json = match event.to_json() {
                    Ok(json) => json,
                    Err(e) => {
                        warn!(business_id, error = %e, "Failed to serialize event");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }

            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(business_id, error = %e, "Event socket error");
                    break;
                }
            },
        }
    }

    let _ = sink.close().await;
    info!(business_id, "Event subscriber disconnected");
}
