use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::checkout::CheckoutOutcome;

/// Events pushed back to the UI task over a broadcast channel.
///
/// The cart and checkout controllers never block on slow subscribers;
/// a lagging receiver simply drops old events.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AppEvent {
    CartChanged { total: Decimal },
    ItemDetected { label: String },
    CheckoutResolved { outcome: CheckoutOutcome },
}

pub type EventSender = broadcast::Sender<AppEvent>;

pub fn channel() -> (EventSender, broadcast::Receiver<AppEvent>) {
    broadcast::channel(64)
}

/// Fire-and-forget emit; a send error only means nobody is listening.
pub fn emit(tx: &EventSender, event: AppEvent) {
    let _ = tx.send(event);
}
