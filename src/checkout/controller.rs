use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::Utc;
use log::{error, info};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant, MissedTickBehavior};

use crate::cart::CartStore;
use crate::events::{self, AppEvent, EventSender};
use crate::notify::{receipt::build_receipt_body, ReceiptSink};
use crate::serial::DeviceLink;
use crate::settings::CheckoutSettings;

use super::state::{classify_line, CheckoutOutcome, CheckoutState, CheckoutStatus};

pub type SharedLink = Arc<Mutex<Box<dyn DeviceLink>>>;

/// Drives the approval handshake: `Idle -> AwaitingApproval ->
/// {Approved, Denied, TimedOut} -> Idle`.
///
/// The approval wait runs on its own task so the UI task stays responsive;
/// resolution comes back over the broadcast channel. The detection feed
/// keeps mutating the cart during the wait; the receipt snapshot is taken
/// under the cart lock at the moment the verdict is processed, so items
/// added mid-checkout are included.
#[derive(Clone)]
pub struct CheckoutController {
    state: Arc<Mutex<CheckoutState>>,
    link: SharedLink,
    cart: CartStore,
    receipts: Arc<dyn ReceiptSink>,
    events: EventSender,
    approval_timeout: Duration,
    poll_interval: Duration,
}

impl CheckoutController {
    pub fn new(
        link: SharedLink,
        cart: CartStore,
        receipts: Arc<dyn ReceiptSink>,
        events: EventSender,
        settings: &CheckoutSettings,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(CheckoutState::new())),
            link,
            cart,
            receipts,
            events,
            approval_timeout: Duration::from_secs(settings.approval_timeout_secs),
            poll_interval: Duration::from_millis(settings.poll_interval_ms),
        }
    }

    pub async fn status(&self) -> CheckoutStatus {
        self.state.lock().await.status
    }

    /// Sends the checkout command and starts the approval wait. Errors only
    /// when a checkout is already in flight; a failing serial link is not
    /// an error to the caller; it resolves the checkout as denied.
    pub async fn begin_checkout(&self) -> Result<()> {
        let deadline = Instant::now() + self.approval_timeout;

        {
            let mut state = self.state.lock().await;
            if state.status != CheckoutStatus::Idle {
                bail!("checkout already awaiting approval");
            }
            state.begin(Utc::now(), deadline);
        }

        let write_result = { self.link.lock().await.write_command("checkout") };
        if let Err(err) = write_result {
            error!("serial write failed, aborting checkout: {err}");
            self.resolve(CheckoutOutcome::Denied).await;
            return Ok(());
        }

        info!("checkout command sent, awaiting approval");

        let this = self.clone();
        tokio::spawn(async move {
            let outcome = this.poll_for_verdict(deadline).await;

            if outcome == CheckoutOutcome::Approved {
                this.finalize_approved().await;
            }

            this.resolve(outcome).await;
        });

        Ok(())
    }

    /// Interval-paced poll of the device link until a verdict or the
    /// deadline. The deadline is checked first, so a verdict arriving after
    /// it fired is ignored.
    async fn poll_for_verdict(&self, deadline: Instant) -> CheckoutOutcome {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            if Instant::now() >= deadline {
                info!("approval window elapsed without a verdict");
                return CheckoutOutcome::TimedOut;
            }

            let polled = { self.link.lock().await.poll_line() };
            match polled {
                Ok(Some(line)) => {
                    if let Some(outcome) = classify_line(&line) {
                        info!("device verdict: {line}");
                        return outcome;
                    }
                    // Free-form status noise; keep waiting.
                }
                Ok(None) => {}
                Err(err) => {
                    error!("serial poll failed, aborting checkout: {err}");
                    return CheckoutOutcome::Denied;
                }
            }
        }
    }

    /// Snapshot-and-clear is one atomic commit point; the slow mail
    /// dispatch happens after it, so a detection landing during the send
    /// stays in the cart for the next checkout. A dispatch failure is
    /// logged and swallowed and does not roll the clear back.
    async fn finalize_approved(&self) {
        let lines = self.cart.take_all().await;
        let total = lines.iter().map(|line| line.line_total).sum();
        let body = build_receipt_body(&lines, total);

        if let Err(err) = self.receipts.send_receipt(&body).await {
            error!("receipt dispatch failed: {err}");
        }
    }

    async fn resolve(&self, outcome: CheckoutOutcome) {
        {
            let mut state = self.state.lock().await;
            state.resolve();
        }

        events::emit(&self.events, AppEvent::CheckoutResolved { outcome });
    }
}
