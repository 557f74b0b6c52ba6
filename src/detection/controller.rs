use std::sync::Arc;

use anyhow::{bail, Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::cart::CartStore;
use crate::events::EventSender;
use crate::settings::DetectionSettings;

use super::dedup::Deduplicator;
use super::feed::DetectionSource;
use super::loop_worker::detection_loop;

/// Owns the lifecycle of the detection task: one loop, one dedup session,
/// one cancellation token. Restarting the feed starts a fresh dedup
/// session; nothing else (in particular not checkout) clears it.
pub struct DetectionController {
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl DetectionController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    pub fn start(
        &mut self,
        source: Arc<dyn DetectionSource>,
        cart: CartStore,
        event_tx: EventSender,
        settings: &DetectionSettings,
    ) -> Result<()> {
        if self.handle.is_some() {
            bail!("detection already active");
        }

        let session_id = Uuid::new_v4().to_string();
        info!("starting detection session {session_id}");

        let cancel_token = CancellationToken::new();
        let token_clone = cancel_token.clone();

        let handle = tokio::spawn(detection_loop(
            session_id,
            source,
            Deduplicator::new(settings.confidence_threshold),
            cart,
            event_tx,
            Duration::from_millis(settings.frame_interval_ms),
            token_clone,
        ));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            handle
                .await
                .context("detection loop task failed to join")
                .map(|_| ())
        } else {
            Ok(())
        }
    }
}

impl Default for DetectionController {
    fn default() -> Self {
        Self::new()
    }
}
