use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, Mutex};

/// One labeled, confidence-scored detection from the external model.
/// Bounding boxes are dropped at this boundary; the cart core only
/// consumes label and confidence.
#[derive(Debug, Clone)]
pub struct DetectionEvent {
    pub label: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
}

/// The external detection capability, one frame at a time.
///
/// An `Err` means the capture pipeline is gone for good; the detection
/// loop treats it as fatal to the detection task only.
#[async_trait]
pub trait DetectionSource: Send + Sync {
    async fn next_detections(&self) -> Result<Vec<DetectionEvent>>;
}

/// Adapts any producer pushing events over an mpsc channel to a
/// [`DetectionSource`]. Used by the operator console's inject command and
/// by tests; a real camera/model pipeline plugs in the same way.
pub struct ChannelSource {
    rx: Mutex<mpsc::Receiver<DetectionEvent>>,
}

impl ChannelSource {
    pub fn new(capacity: usize) -> (mpsc::Sender<DetectionEvent>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self { rx: Mutex::new(rx) })
    }
}

#[async_trait]
impl DetectionSource for ChannelSource {
    async fn next_detections(&self) -> Result<Vec<DetectionEvent>> {
        let mut rx = self.rx.lock().await;

        // Drain whatever the producer has queued since the last frame.
        let mut events = Vec::new();
        loop {
            match rx.try_recv() {
                Ok(event) => events.push(event),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => {
                    if events.is_empty() {
                        return Err(anyhow!("detection producer disconnected"));
                    }
                    break;
                }
            }
        }

        Ok(events)
    }
}
