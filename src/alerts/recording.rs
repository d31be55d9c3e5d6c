use crate::alerts::Notifier;
use crate::events::NotificationEvent;
use std::sync::{Mutex, PoisonError};

/// Keeps every event in memory so tests can inspect what was sent
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<NotificationEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far
    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Drain the recorded events
    pub fn take(&self) -> Vec<NotificationEvent> {
        std::mem::take(&mut *self.events.lock().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn len(&self) -> usize {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, event: NotificationEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{Category, Field, NotificationKind};

    #[test]
    fn test_recording_notifier_keeps_order() {
        let notifier = RecordingNotifier::new();
        notifier.send(NotificationEvent::alert(
            NotificationKind::BatteryStatus,
            vec![Field::Status(3)],
        ));
        notifier.send(NotificationEvent::clear(
            NotificationKind::BatteryStatus,
            vec![Field::Status(2)],
        ));

        let events = notifier.events();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].category, Category::Alert);
        assert_eq!(events[1].category, Category::Clear);
        assert_eq!(events[1].status(), Some(2));
    }

    #[test]
    fn test_take_drains() {
        let notifier = RecordingNotifier::new();
        notifier.send(NotificationEvent::alert(
            NotificationKind::RfPower,
            vec![Field::Status(2)],
        ));

        assert_eq!(notifier.take().len(), 1);
        assert!(notifier.is_empty());
    }
}
