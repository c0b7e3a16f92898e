//! Process-wide presentation settings for notifications that arrive while the
//! app is in the foreground.
//!
//! Set once at startup with [`set_notification_handler`], before any screen is
//! activated. The value never changes afterwards; platforms read it through
//! [`notification_handler`].

use std::sync::OnceLock;

use crate::Error;

static NOTIFICATION_HANDLER: OnceLock<NotificationHandler> = OnceLock::new();

/// How a foreground notification is presented
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationHandler {
    pub should_show_alert: bool,
    pub should_play_sound: bool,
    pub should_set_badge: bool,
    pub should_show_banner: bool,
    pub should_show_list: bool,
}

impl Default for NotificationHandler {
    fn default() -> Self {
        Self {
            should_show_alert: true,
            should_play_sound: true,
            should_set_badge: false,
            should_show_banner: true,
            should_show_list: true,
        }
    }
}

/// Presentation options that apply to one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Presentation {
    pub alert: bool,
    pub sound: bool,
    pub badge: bool,
    pub banner: bool,
    pub list: bool,
}

impl NotificationHandler {
    /// Resolve the options for a notification, sound only plays when the
    /// notification asks for one
    pub fn presentation_for(&self, has_sound: bool) -> Presentation {
        Presentation {
            alert: self.should_show_alert,
            sound: self.should_play_sound && has_sound,
            badge: self.should_set_badge,
            banner: self.should_show_banner,
            list: self.should_show_list,
        }
    }
}

/// Install the process-wide handler
///
/// # Errors
/// - `Error::HandlerAlreadySet` if a handler was installed before
pub fn set_notification_handler(handler: NotificationHandler) -> Result<(), Error> {
    NOTIFICATION_HANDLER
        .set(handler)
        .map_err(|_| Error::HandlerAlreadySet)?;
    log::debug!("Notification handler set: {handler:?}");
    Ok(())
}

/// The installed handler, or the default one if none was installed
pub fn notification_handler() -> NotificationHandler {
    NOTIFICATION_HANDLER.get().copied().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handler_can_only_be_set_once() {
        let handler = NotificationHandler {
            should_set_badge: true,
            ..NotificationHandler::default()
        };
        // Other tests in this binary never set the handler
        set_notification_handler(handler).unwrap();
        assert!(matches!(
            set_notification_handler(NotificationHandler::default()),
            Err(Error::HandlerAlreadySet)
        ));
        assert_eq!(notification_handler(), handler);
    }

    #[test]
    fn sound_needs_both_handler_and_notification() {
        let handler = NotificationHandler::default();
        assert!(handler.presentation_for(true).sound);
        assert!(!handler.presentation_for(false).sound);
        assert!(!handler.presentation_for(true).badge);
    }
}
