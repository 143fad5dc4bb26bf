//! Observability
//!
//! Structured JSON logging, typed lifecycle events and begin/complete
//! scopes around engine operations.
//!
//! # Principles
//!
//! 1. Observability is read-only
//! 2. No side effects on execution
//! 3. No background threads
//! 4. Deterministic output
//!
//! # Usage
//!
//! ```ignore
//! use draftq::observability::{Logger, Event, ObservationScope};
//!
//! Logger::info(Event::ConfigLoaded.as_str(), &[("path", "draftq.json")]);
//!
//! let scope = ObservationScope::with_fields("DRAFT_LIST", &[("project_id", "...")]);
//! // ... do work ...
//! scope.complete_with_fields(&[("total_count", "42")]);
//! ```

mod events;
mod logger;
mod scope;

pub use events::Event;
pub use logger::{Logger, Severity};
pub use scope::ObservationScope;

/// Log a lifecycle event
pub fn log_event(event: Event) {
    log_event_with_fields(event, &[]);
}

/// Log a lifecycle event with fields
pub fn log_event_with_fields(event: Event, fields: &[(&str, &str)]) {
    let severity = if event.is_fatal() {
        Severity::Fatal
    } else {
        Severity::Info
    };
    Logger::log(severity, event.as_str(), fields);
}
