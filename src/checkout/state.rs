use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutStatus {
    Idle,
    AwaitingApproval,
}

impl Default for CheckoutStatus {
    fn default() -> Self {
        CheckoutStatus::Idle
    }
}

/// Terminal result of one approval handshake. Every outcome returns the
/// machine to `Idle`; only `Approved` touches the cart.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum CheckoutOutcome {
    Approved,
    Denied,
    TimedOut,
}

/// The approval session: exists from the checkout request until the
/// handshake resolves.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutState {
    pub status: CheckoutStatus,
    pub started_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl Default for CheckoutState {
    fn default() -> Self {
        Self {
            status: CheckoutStatus::Idle,
            started_at: None,
            deadline: None,
        }
    }
}

impl CheckoutState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&mut self, started_at: DateTime<Utc>, deadline: Instant) {
        self.status = CheckoutStatus::AwaitingApproval;
        self.started_at = Some(started_at);
        self.deadline = Some(deadline);
    }

    pub fn resolve(&mut self) {
        *self = Self::default();
    }
}

/// The device emits free-form status lines; the only structured content is
/// a case-insensitive APPROVED/DENIED substring. Anything else is noise.
pub fn classify_line(line: &str) -> Option<CheckoutOutcome> {
    let upper = line.to_ascii_uppercase();
    if upper.contains("APPROVED") {
        Some(CheckoutOutcome::Approved)
    } else if upper.contains("DENIED") {
        Some(CheckoutOutcome::Denied)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verdict_is_a_case_insensitive_substring_match() {
        assert_eq!(classify_line("payment approved"), Some(CheckoutOutcome::Approved));
        assert_eq!(classify_line("STATUS: DENIED BY TERMINAL"), Some(CheckoutOutcome::Denied));
        assert_eq!(classify_line("Approved"), Some(CheckoutOutcome::Approved));
    }

    #[test]
    fn other_status_lines_are_ignored() {
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line("weight 410g"), None);
        assert_eq!(classify_line("ready"), None);
    }
}
