use crate::events::{Category, NotificationEvent};
use log::{error, info, warn};

/// Delivers notification events to whatever sits downstream
///
/// Delivery is fire-and-forget: implementations log their own failures and
/// never report them back, so a broken notification path cannot disturb the
/// monitors that produce events.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn send(&self, event: NotificationEvent);
}

/// Writes each event to the log as a single JSON line
///
/// Used when no trap receiver is configured, and handy when running the
/// agent by hand.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl LogNotifier {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for LogNotifier {
    fn send(&self, event: NotificationEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to serialize {} notification: {}", event.kind, e);
                return;
            }
        };

        match event.category {
            Category::Alert => warn!("{}", line),
            Category::Clear | Category::Heartbeat => info!("{}", line),
        }
    }
}
