use tracing::error;

/// Surfaces user-visible error messages. Fire-and-forget.
pub trait Notifier: Send + Sync {
    fn report_error(&self, message: &str, title: &str);
}

/// Default notifier for headless use: writes the notification to the log.
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn report_error(&self, message: &str, title: &str) {
        error!(title, message, "user notification");
    }
}
