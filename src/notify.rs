use std::{
    collections::HashMap,
    fmt::{self, Debug},
    time::Duration,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Error;

/// The user's decision about notification display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// The user was never asked
    #[default]
    Undetermined,
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, PermissionStatus::Granted)
    }
}

impl fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            PermissionStatus::Undetermined => "undetermined",
            PermissionStatus::Granted => "granted",
            PermissionStatus::Denied => "denied",
        };
        f.write_str(status)
    }
}

/// Opaque token that addresses this installation for remote delivery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PushToken(String);

impl PushToken {
    pub fn new(token: impl Into<String>) -> Self {
        PushToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PushToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for PushToken {
    fn from(token: String) -> Self {
        PushToken(token)
    }
}

#[derive(Debug, Default, Clone)]
pub struct NotifyBuilder {
    pub(crate) body: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) subtitle: Option<String>,
    pub(crate) data: Option<HashMap<String, String>>,
    pub(crate) sound: Option<String>,
}

impl NotifyBuilder {
    pub fn new() -> Self {
        NotifyBuilder::default()
    }

    /// Set main content of notification
    pub fn body(mut self, body: &str) -> Self {
        self.body = Some(body.to_owned());
        self
    }

    /// Set primary description of notification
    pub fn title(mut self, title: &str) -> Self {
        self.title = Some(title.to_owned());
        self
    }

    /// Set secondary description of notification
    pub fn subtitle(mut self, subtitle: &str) -> Self {
        self.subtitle = Some(subtitle.to_owned());
        self
    }

    /// Set notification sound, "default" selects the system sound
    pub fn sound(mut self, sound: &str) -> Self {
        self.sound = Some(sound.to_owned());
        self
    }

    /// Set the data payload delivered along with the notification
    pub fn set_data(mut self, data: HashMap<String, String>) -> Self {
        self.data = Some(data);
        self
    }

    pub(crate) fn into_content(self) -> NotificationContent {
        NotificationContent {
            title: self.title,
            subtitle: self.subtitle,
            body: self.body,
            data: self.data.unwrap_or_default(),
            sound: self.sound,
        }
    }
}

/// When a scheduled notification should be presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NotifyTrigger {
    /// Present right away
    #[default]
    Immediate,
    /// Present once the duration has elapsed
    After(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationContent {
    pub title: Option<String>,
    pub subtitle: Option<String>,
    pub body: Option<String>,
    pub data: HashMap<String, String>,
    pub sound: Option<String>,
}

/// A notification as delivered by the platform
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    /// ID of the notification that was assigned by the system
    pub identifier: String,
    /// Delivery time in milliseconds since the unix epoch
    pub date: u64,
    pub content: NotificationContent,
}

#[derive(Debug, Clone)]
pub struct NotifyResponse {
    pub notification: Notification,
    pub action: NotifyResponseAction,
    /// The text that the user typed in as response
    pub user_input: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyResponseAction {
    /// When user clicks on the notification
    Default,
    /// When user closes the notification
    Dismiss,
    /// The identifier string of the action that the user selected
    Other(String),
}

/// Everything the platform can push to registered listeners
#[derive(Debug, Clone)]
pub enum NotifyEvent {
    Received(Notification),
    Response(NotifyResponse),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    Received,
    Response,
}

/// Handle to a registered listener.
///
/// Not `Clone`: releasing it through [`NotifyPlatformExt::remove_subscription`]
/// consumes the handle, so it can only be released once.
#[derive(Debug, PartialEq, Eq)]
pub struct Subscription {
    id: String,
    kind: ListenerKind,
}

impl Subscription {
    pub(crate) fn new(kind: ListenerKind) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn kind(&self) -> ListenerKind {
        self.kind
    }
}

pub type ReceivedCallback = Box<dyn Fn(Notification) + Send + Sync + 'static>;
pub type ResponseCallback = Box<dyn Fn(NotifyResponse) + Send + Sync + 'static>;

/// Host platform services the push screen depends on
#[async_trait]
pub trait NotifyPlatformExt
where
    Self: Send + Sync + Debug,
{
    /// Whether this is a physical device rather than a simulator
    fn is_device(&self) -> bool;

    /// Get the current notification permission decision
    async fn get_permission_status(&self) -> Result<PermissionStatus, Error>;

    /// Ask the user for notification permission, may show a system dialog
    async fn request_permission(&self) -> Result<PermissionStatus, Error>;

    /// Get a push token from the token service
    async fn get_push_token(&self, project_id: Option<&str>) -> Result<PushToken, Error>;

    /// Submit a notification for local presentation and return its id
    async fn schedule(
        &self,
        builder: NotifyBuilder,
        trigger: NotifyTrigger,
    ) -> Result<String, Error>;

    /// Listen for notifications received while the app is in the foreground
    fn add_notification_received_listener(
        &self,
        callback: ReceivedCallback,
    ) -> Result<Subscription, Error>;

    /// Listen for the user interacting with a delivered notification
    fn add_notification_response_listener(
        &self,
        callback: ResponseCallback,
    ) -> Result<Subscription, Error>;

    /// Release a listener
    fn remove_subscription(&self, subscription: Subscription) -> Result<(), Error>;

    /// Show a native modal alert
    fn show_alert(&self, title: &str, message: &str);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn permission_status_serializes_lowercase() {
        let json = serde_json::to_string(&PermissionStatus::Undetermined).unwrap();
        assert_eq!(json, "\"undetermined\"");
        assert_eq!(PermissionStatus::Denied.to_string(), "denied");
        assert!(PermissionStatus::Granted.is_granted());
        assert!(!PermissionStatus::default().is_granted());
    }

    #[test]
    fn builder_without_data_has_empty_payload() {
        let content = NotifyBuilder::new().title("Hey!").body("hi").into_content();
        assert_eq!(content.title.as_deref(), Some("Hey!"));
        assert_eq!(content.body.as_deref(), Some("hi"));
        assert!(content.data.is_empty());
    }

    #[test]
    fn subscriptions_get_distinct_ids() {
        let a = Subscription::new(ListenerKind::Received);
        let b = Subscription::new(ListenerKind::Received);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.kind(), ListenerKind::Received);
    }
}
