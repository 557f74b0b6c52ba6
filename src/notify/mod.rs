pub mod dispatcher;
pub mod receipt;

use anyhow::Result;
use async_trait::async_trait;

pub use dispatcher::SmtpDispatcher;

/// Receipt delivery seam. The production implementation mails a multipart
/// message with an inline QR code; tests substitute a recorder.
///
/// Delivery is at-most-once and best-effort: by the time this runs the
/// checkout has already completed, so callers log failures and move on.
#[async_trait]
pub trait ReceiptSink: Send + Sync {
    async fn send_receipt(&self, body: &str) -> Result<()>;
}
