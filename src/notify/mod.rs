pub mod bark;
pub mod payload;

use std::future::Future;

use crate::risk::types::AlertRequest;

pub use bark::Notifier;

/// Where alerts go. Delivery is best effort: failures are logged by the
/// sink and reported only as `false`.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &AlertRequest) -> impl Future<Output = bool> + Send;

    fn heartbeat(&self, message: &str) -> impl Future<Output = bool> + Send;

    /// False when alerts can only ever reach the log.
    fn is_enabled(&self) -> bool {
        true
    }
}

impl AlertSink for Notifier {
    async fn deliver(&self, alert: &AlertRequest) -> bool {
        self.send(&alert.message, alert.risk, alert.voice).await
    }

    async fn heartbeat(&self, message: &str) -> bool {
        self.send_heartbeat(message).await
    }

    fn is_enabled(&self) -> bool {
        Notifier::is_enabled(self)
    }
}
