use std::sync::Arc;

use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cart::CartStore;
use crate::events::{self, AppEvent, EventSender};

use super::dedup::Deduplicator;
use super::feed::DetectionSource;

// Set to false to silence per-frame logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// Continuously pulls frames' worth of detections, deduplicates them, and
/// pushes accepted labels into the cart. Runs until cancelled or until the
/// source fails; a source failure kills this task only, never the cart or
/// the UI task.
pub async fn detection_loop(
    session_id: String,
    source: Arc<dyn DetectionSource>,
    mut dedup: Deduplicator,
    cart: CartStore,
    event_tx: EventSender,
    frame_interval: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(frame_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let detections = match source.next_detections().await {
                    Ok(detections) => detections,
                    Err(err) => {
                        log_error!("detection source failed for session {session_id}, stopping feed: {err:?}");
                        break;
                    }
                };

                for event in detections {
                    let Some(label) = dedup.observe(&event) else {
                        continue;
                    };

                    log_info!(
                        "session {session_id}: detected {} (confidence {:.2})",
                        label, event.confidence
                    );

                    cart.add_item(&label).await;
                    events::emit(&event_tx, AppEvent::ItemDetected { label });
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("detection loop for session {session_id} shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::feed::{ChannelSource, DetectionEvent};
    use crate::pricing::{PriceOracle, ProductInfo};
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;

    struct OneEuroOracle;

    #[async_trait]
    impl PriceOracle for OneEuroOracle {
        async fn lookup(&self, _name: &str) -> ProductInfo {
            ProductInfo {
                price: dec!(1.00),
                ..ProductInfo::default()
            }
        }
    }

    fn event(label: &str, confidence: f32) -> DetectionEvent {
        DetectionEvent {
            label: label.to_string(),
            confidence,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_detection_adds_a_single_unit() {
        let (producer, source) = ChannelSource::new(16);
        let (event_tx, _event_rx) = crate::events::channel();
        let cart = CartStore::new(Arc::new(OneEuroOracle), event_tx.clone());
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(detection_loop(
            "test-session".into(),
            Arc::new(source),
            Deduplicator::new(0.5),
            cart.clone(),
            event_tx,
            Duration::from_millis(200),
            cancel.clone(),
        ));

        for _ in 0..5 {
            producer.send(event("apple", 0.9)).await.unwrap();
        }
        producer.send(event("blurred", 0.4)).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        cancel.cancel();
        worker.await.unwrap();

        let snapshot = cart.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].name, "apple");
        assert_eq!(snapshot[0].quantity, 1);
        assert_eq!(cart.total().await, dec!(1.00));
    }

    #[tokio::test(start_paused = true)]
    async fn source_failure_ends_the_loop_but_not_the_cart() {
        let (producer, source) = ChannelSource::new(4);
        let (event_tx, _event_rx) = crate::events::channel();
        let cart = CartStore::new(Arc::new(OneEuroOracle), event_tx.clone());
        let cancel = CancellationToken::new();

        let worker = tokio::spawn(detection_loop(
            "test-session".into(),
            Arc::new(source),
            Deduplicator::new(0.5),
            cart.clone(),
            event_tx,
            Duration::from_millis(200),
            cancel.clone(),
        ));

        producer.send(event("apple", 0.9)).await.unwrap();
        drop(producer);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(worker.is_finished());

        // Cart edits keep working after the feed dies.
        cart.increment("apple").await;
        assert_eq!(cart.total().await, dec!(2.00));
    }
}
