//! Stale-response guard shared by form submissions and matrix saves.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Identifies one in-flight request. Later tickets compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    pub fn sequence(&self) -> u64 {
        self.0
    }
}

/// Shared handle the hosting view flips when it goes away.
#[derive(Debug, Clone)]
pub struct ViewHandle {
    mounted: Arc<AtomicBool>,
}

impl ViewHandle {
    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    /// Marks the view as gone. Responses that arrive later are dropped.
    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }
}

/// Issues tickets and decides whether a response may still be applied.
#[derive(Debug)]
pub struct SubmissionTracker {
    issued: u64,
    applied: u64,
    view: ViewHandle,
}

impl SubmissionTracker {
    pub fn new() -> Self {
        Self {
            issued: 0,
            applied: 0,
            view: ViewHandle {
                mounted: Arc::new(AtomicBool::new(true)),
            },
        }
    }

    pub fn view(&self) -> ViewHandle {
        self.view.clone()
    }

    pub fn issue(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Whether a response for `ticket` may be applied; records it when so.
    ///
    /// Refused once the view is unmounted, for tickets this tracker never
    /// issued, and when a newer response has already been applied.
    pub fn accept(&mut self, ticket: &Ticket) -> bool {
        if !self.view.is_mounted() {
            tracing::debug!(ticket = ticket.0, "response after unmount dropped");
            return false;
        }
        if ticket.0 == 0 || ticket.0 > self.issued || ticket.0 <= self.applied {
            tracing::debug!(ticket = ticket.0, applied = self.applied, "stale response dropped");
            return false;
        }
        self.applied = ticket.0;
        true
    }

    /// Whether a request is out without its response applied yet.
    pub fn in_flight(&self) -> bool {
        self.issued > self.applied
    }
}

impl Default for SubmissionTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newer_response_wins() {
        let mut tracker = SubmissionTracker::new();
        let first = tracker.issue();
        let second = tracker.issue();
        assert!(tracker.in_flight());

        assert!(tracker.accept(&second));
        assert!(!tracker.accept(&first));
        assert!(!tracker.accept(&second));
        assert!(!tracker.in_flight());
    }

    #[test]
    fn unmounted_view_refuses_everything() {
        let mut tracker = SubmissionTracker::new();
        let ticket = tracker.issue();
        let view = tracker.view();
        view.unmount();
        assert!(!view.is_mounted());
        assert!(!tracker.accept(&ticket));
    }

    #[test]
    fn foreign_tickets_are_refused() {
        let mut other = SubmissionTracker::new();
        other.issue();
        let foreign = other.issue();

        let mut tracker = SubmissionTracker::new();
        tracker.issue();
        assert!(!tracker.accept(&foreign));
    }
}
