//! Desktop notifications through the freedesktop notification daemon.

use notify_rust::{Notification, Timeout};
use std::path::Path;
use thiserror::Error;

/// Id shared by every notification so each update replaces the last one.
pub const NOTIFICATION_ID: u32 = 222222;
pub const APP_NAME: &str = "Kua Simi?";
pub const NOTIFICATION_TITLE: &str = "Kua Simi?";
pub const NOTIFICATION_TIMEOUT_MS: u32 = 10_000;

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification could not be shown: {0}")]
    Show(String),
}

/// A display that shows one persistent, replaceable notification.
pub trait NotificationSink {
    fn notify(&self, body: &str, icon: &Path) -> Result<(), NotifyError>;
}

/// Shows updates as native desktop notifications.
#[derive(Clone, Debug, Default)]
pub struct DesktopNotifier;

impl DesktopNotifier {
    fn build(&self, body: &str, icon: &Path) -> Notification {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(NOTIFICATION_TITLE)
            .body(body)
            .icon(&icon.to_string_lossy())
            .timeout(Timeout::Milliseconds(NOTIFICATION_TIMEOUT_MS));

        #[cfg(all(unix, not(target_os = "macos")))]
        notification.id(NOTIFICATION_ID);

        notification
    }
}

impl NotificationSink for DesktopNotifier {
    fn notify(&self, body: &str, icon: &Path) -> Result<(), NotifyError> {
        self.build(body, icon)
            .show()
            .map(|_| ())
            .map_err(|err| NotifyError::Show(err.to_string()))
    }
}
