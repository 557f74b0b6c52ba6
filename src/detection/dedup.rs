use std::collections::HashSet;

use super::feed::DetectionEvent;

/// Per-session filter turning the raw detection stream into at-most-once
/// "new product" events. Repeated frames of the same object never spam the
/// cart; quantities beyond one unit only ever come from the + button.
pub struct Deduplicator {
    threshold: f32,
    emitted: HashSet<String>,
}

impl Deduplicator {
    /// The emitted-label set lives as long as the deduplicator, i.e. one
    /// detection-loop lifetime. It is not cleared on checkout.
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            emitted: HashSet::new(),
        }
    }

    /// Accepts the event's label iff its confidence is strictly above the
    /// threshold and the label has not been emitted this session.
    pub fn observe(&mut self, event: &DetectionEvent) -> Option<String> {
        if event.confidence <= self.threshold {
            return None;
        }
        if !self.emitted.insert(event.label.clone()) {
            return None;
        }
        Some(event.label.clone())
    }
}
