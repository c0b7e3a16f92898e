mod config;
mod error;
mod flow;
mod handler;
mod notify;
mod platform;
mod screen;

pub use config::{ErrorMessagePolicy, ScreenConfig};
pub use error::Error;
pub use flow::{PermissionAndTokenFlow, TokenOutcome};
pub use handler::{
    notification_handler, set_notification_handler, NotificationHandler, Presentation,
};
pub use notify::*;
pub use platform::*;
pub use screen::{PushScreen, ScreenState, SCREEN_TITLE, TRIGGER_BUTTON_LABEL};

pub mod prelude;
