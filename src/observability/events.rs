//! Observable events
//!
//! Every log line's `event` value comes from here, except the
//! begin/complete pairs emitted by [`ObservationScope`](super::ObservationScope).

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    BootStart,
    ConfigLoaded,
    StoreSeeded,
    Serving,
    ShutdownComplete,

    // Requests
    /// A request failed validation before reaching the store
    RequestRejected,
    /// Gate refused an actor
    AccessDenied,

    // Writes
    DraftCreated,
    DraftUpdated,
    DraftDeleted,

    /// Startup failed
    BootFailed,
}

impl Event {
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::BootStart => "DRAFTQ_STARTUP_BEGIN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::StoreSeeded => "STORE_SEEDED",
            Event::Serving => "DRAFTQ_SERVING",
            Event::ShutdownComplete => "SHUTDOWN_COMPLETE",
            Event::RequestRejected => "REQUEST_REJECTED",
            Event::AccessDenied => "ACCESS_DENIED",
            Event::DraftCreated => "DRAFT_CREATED",
            Event::DraftUpdated => "DRAFT_UPDATED",
            Event::DraftDeleted => "DRAFT_DELETED",
            Event::BootFailed => "DRAFTQ_STARTUP_FAILED",
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Event::BootFailed)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names_unique() {
        let events = [
            Event::BootStart,
            Event::ConfigLoaded,
            Event::StoreSeeded,
            Event::Serving,
            Event::ShutdownComplete,
            Event::RequestRejected,
            Event::AccessDenied,
            Event::DraftCreated,
            Event::DraftUpdated,
            Event::DraftDeleted,
            Event::BootFailed,
        ];
        let mut names: Vec<&str> = events.iter().map(Event::as_str).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), events.len());
    }

    #[test]
    fn test_only_boot_failure_is_fatal() {
        assert!(Event::BootFailed.is_fatal());
        assert!(!Event::RequestRejected.is_fatal());
    }
}
