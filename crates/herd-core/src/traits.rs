//! Trait interfaces for the herd.
//!
//! These traits define the seams between the core and its collaborators:
//! - [`NotificationEmitter`]: receives one [`HerdEvent`] per terminal outcome
//! - [`Clock`]: wall-clock source, swappable for deterministic tests

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::types::HerdEvent;

/// Sink for structured herd events.
///
/// Emission is fire-and-forget: implementations must not block and must
/// not report failure back to the caller. Delivery problems are the
/// emitter's own concern and never roll back ledger state.
pub trait NotificationEmitter: Send + Sync {
    /// Forward one event.
    fn emit(&self, event: HerdEvent);
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The real UTC wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(start) }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.lock() = instant;
    }

    /// Move forward by `delta`.
    pub fn advance(&self, delta: chrono::Duration) {
        let mut now = self.now.lock();
        *now += delta;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

/// Emitter that drops everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEmitter;

impl NotificationEmitter for NullEmitter {
    fn emit(&self, _event: HerdEvent) {}
}

/// Emitter that keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    events: Mutex<Vec<HerdEvent>>,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything emitted so far.
    pub fn events(&self) -> Vec<HerdEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<HerdEvent> {
        std::mem::take(&mut *self.events.lock())
    }
}

impl NotificationEmitter for RecordingEmitter {
    fn emit(&self, event: HerdEvent) {
        self.events.lock().push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn manual_clock_advances() {
        let start = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(clock.now(), start + chrono::Duration::seconds(90));
    }

    #[test]
    fn manual_clock_set_overrides() {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap());
        let later = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
        clock.set(later);
        assert_eq!(clock.now(), later);
    }

    #[test]
    fn recording_emitter_keeps_order() {
        let emitter = RecordingEmitter::new();
        emitter.emit(HerdEvent::CycleReset { admission_reference: None });
        emitter.emit(HerdEvent::Admitted { identity: "a".into(), amount: 10 });
        let events = emitter.take();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], HerdEvent::CycleReset { .. }));
        assert!(emitter.events().is_empty());
    }

    #[test]
    fn traits_are_object_safe() {
        let _clock: Box<dyn Clock> = Box::new(SystemClock);
        let _emitter: Box<dyn NotificationEmitter> = Box::new(NullEmitter);
    }
}
