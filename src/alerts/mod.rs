/// Notification delivery
pub mod notifier;

/// In-memory notifier for tests
#[cfg(test)]
pub mod recording;

#[cfg(test)]
pub use notifier::MockNotifier;
pub use notifier::{LogNotifier, Notifier};
#[cfg(test)]
pub use recording::RecordingNotifier;
