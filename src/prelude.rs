pub use crate::{
    set_notification_handler, Error, ErrorMessagePolicy, LocalPlatform, LocalPlatformBuilder,
    NotificationHandler, NotifyBuilder, NotifyPlatformExt, NotifyTrigger, PermissionStatus,
    PushScreen, PushToken, ScreenConfig, ScreenState,
};
