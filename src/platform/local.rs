//! In-process platform that behaves like a device with a scripted user.
//!
//! Permission prompts are answered with a preset decision, the token service
//! returns a preset token or error, and scheduled notifications are delivered
//! to the registered listeners through the listener thread.

use std::{
    sync::{Arc, Mutex, PoisonError},
    time::{SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

use super::dispatch::{spawn_listener_loop, Listeners, EVENT_CHANNEL_SIZE};
use crate::{
    Error, Notification, NotificationContent, NotifyBuilder, NotifyEvent, NotifyPlatformExt,
    NotifyResponse, NotifyResponseAction, NotifyTrigger, PermissionStatus, PushToken,
    ReceivedCallback, ResponseCallback, Subscription,
};

/// Number of times each platform service was called
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlatformCalls {
    pub permission_queries: usize,
    pub permission_requests: usize,
    /// Requests that actually showed the system dialog
    pub permission_prompts: usize,
    pub token_requests: usize,
    pub scheduled: usize,
}

/// A notification request accepted by [`NotifyPlatformExt::schedule`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledRequest {
    pub identifier: String,
    pub content: NotificationContent,
    pub trigger: NotifyTrigger,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct LocalPlatformBuilder {
    is_device: bool,
    permission: PermissionStatus,
    user_decision: PermissionStatus,
    token: Result<String, String>,
}

impl Default for LocalPlatformBuilder {
    fn default() -> Self {
        Self {
            is_device: true,
            permission: PermissionStatus::Undetermined,
            user_decision: PermissionStatus::Granted,
            token: Ok(generate_token()),
        }
    }
}

impl LocalPlatformBuilder {
    pub fn new() -> Self {
        LocalPlatformBuilder::default()
    }

    /// Pretend to be a physical device (`true`) or a simulator
    pub fn physical_device(mut self, is_device: bool) -> Self {
        self.is_device = is_device;
        self
    }

    /// Decision already stored before the screen starts
    pub fn permission(mut self, permission: PermissionStatus) -> Self {
        self.permission = permission;
        self
    }

    /// What the user picks when the permission dialog is shown
    pub fn user_decision(mut self, decision: PermissionStatus) -> Self {
        self.user_decision = decision;
        self
    }

    /// Token the token service hands out
    pub fn token(mut self, token: &str) -> Self {
        self.token = Ok(token.to_owned());
        self
    }

    /// Make the token service fail with this message
    pub fn token_error(mut self, message: &str) -> Self {
        self.token = Err(message.to_owned());
        self
    }

    /// Build the platform and start its listener thread
    pub fn build(self) -> LocalPlatform {
        let (tx, rx) = tokio::sync::mpsc::channel::<NotifyEvent>(EVENT_CHANNEL_SIZE);
        let listeners = Arc::new(Listeners::default());
        spawn_listener_loop(Arc::clone(&listeners), rx);

        LocalPlatform {
            inner: Arc::new(LocalPlatformInner {
                is_device: self.is_device,
                user_decision: self.user_decision,
                token: self.token,
                state: Mutex::new(RecordedState {
                    permission: self.permission,
                    ..RecordedState::default()
                }),
                listeners,
                sender: tx,
            }),
        }
    }
}

#[derive(Debug, Default)]
struct RecordedState {
    permission: PermissionStatus,
    calls: PlatformCalls,
    last_project_id: Option<Option<String>>,
    scheduled: Vec<ScheduledRequest>,
    alerts: Vec<Alert>,
}

#[derive(Debug)]
struct LocalPlatformInner {
    is_device: bool,
    user_decision: PermissionStatus,
    token: Result<String, String>,
    state: Mutex<RecordedState>,
    listeners: Arc<Listeners>,
    /// Queue feeding the listener thread
    sender: Sender<NotifyEvent>,
}

/// In-process [`NotifyPlatformExt`] implementation.
///
/// Cloning shares the same state, listeners and listener thread.
#[derive(Debug, Clone)]
pub struct LocalPlatform {
    inner: Arc<LocalPlatformInner>,
}

impl LocalPlatform {
    fn with_state<T>(&self, f: impl FnOnce(&mut RecordedState) -> T) -> T {
        let mut state = self
            .inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        f(&mut state)
    }

    pub fn calls(&self) -> PlatformCalls {
        self.with_state(|state| state.calls)
    }

    pub fn permission(&self) -> PermissionStatus {
        self.with_state(|state| state.permission)
    }

    /// Project id passed to the last token request, `None` if no token was
    /// requested yet
    pub fn last_project_id(&self) -> Option<Option<String>> {
        self.with_state(|state| state.last_project_id.clone())
    }

    pub fn scheduled(&self) -> Vec<ScheduledRequest> {
        self.with_state(|state| state.scheduled.clone())
    }

    pub fn alerts(&self) -> Vec<Alert> {
        self.with_state(|state| state.alerts.clone())
    }

    /// Number of listeners that are still registered
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.count()
    }

    /// Deliver an event to the listeners right away, the way a remote push or
    /// a user interaction would arrive
    pub fn deliver(&self, event: NotifyEvent) -> Result<(), Error> {
        self.inner.listeners.dispatch(event)
    }

    /// Simulate the user tapping a delivered notification
    pub fn tap(&self, notification: Notification) -> Result<(), Error> {
        self.deliver(NotifyEvent::Response(NotifyResponse {
            notification,
            action: NotifyResponseAction::Default,
            user_input: None,
        }))
    }
}

#[async_trait]
impl NotifyPlatformExt for LocalPlatform {
    fn is_device(&self) -> bool {
        self.inner.is_device
    }

    async fn get_permission_status(&self) -> Result<PermissionStatus, Error> {
        Ok(self.with_state(|state| {
            state.calls.permission_queries += 1;
            state.permission
        }))
    }

    /// Only an undetermined decision shows the dialog, a stored decision is
    /// returned as is
    async fn request_permission(&self) -> Result<PermissionStatus, Error> {
        let user_decision = self.inner.user_decision;
        Ok(self.with_state(|state| {
            state.calls.permission_requests += 1;
            if state.permission == PermissionStatus::Undetermined {
                state.calls.permission_prompts += 1;
                state.permission = user_decision;
            }
            state.permission
        }))
    }

    async fn get_push_token(&self, project_id: Option<&str>) -> Result<PushToken, Error> {
        self.with_state(|state| {
            state.calls.token_requests += 1;
            state.last_project_id = Some(project_id.map(str::to_owned));
        });

        match &self.inner.token {
            Ok(token) => Ok(PushToken::new(token.as_str())),
            Err(message) => Err(Error::TokenIssuance(message.clone())),
        }
    }

    async fn schedule(
        &self,
        builder: NotifyBuilder,
        trigger: NotifyTrigger,
    ) -> Result<String, Error> {
        let identifier = uuid::Uuid::new_v4().to_string();
        let content = builder.into_content();

        self.with_state(|state| {
            state.calls.scheduled += 1;
            state.scheduled.push(ScheduledRequest {
                identifier: identifier.clone(),
                content: content.clone(),
                trigger,
            });
        });

        let notification = Notification {
            identifier: identifier.clone(),
            date: now_millis(),
            content,
        };

        match trigger {
            NotifyTrigger::Immediate => {
                self.inner
                    .sender
                    .send(NotifyEvent::Received(notification))
                    .await?;
            }
            NotifyTrigger::After(delay) => {
                let sender = self.inner.sender.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(err) = sender.send(NotifyEvent::Received(notification)).await {
                        log::error!("Failed to send notification to listeners: {err:?}");
                    }
                });
            }
        }

        log::debug!("Scheduled notification {identifier} with trigger {trigger:?}");
        Ok(identifier)
    }

    fn add_notification_received_listener(
        &self,
        callback: ReceivedCallback,
    ) -> Result<Subscription, Error> {
        self.inner.listeners.add_received(callback)
    }

    fn add_notification_response_listener(
        &self,
        callback: ResponseCallback,
    ) -> Result<Subscription, Error> {
        self.inner.listeners.add_response(callback)
    }

    fn remove_subscription(&self, subscription: Subscription) -> Result<(), Error> {
        self.inner.listeners.remove(subscription)
    }

    fn show_alert(&self, title: &str, message: &str) {
        log::info!("Alert: {title}: {message}");
        self.with_state(|state| {
            state.alerts.push(Alert {
                title: title.to_owned(),
                message: message.to_owned(),
            })
        });
    }
}

fn generate_token() -> String {
    format!("ExponentPushToken[{}]", &uuid::Uuid::new_v4().simple().to_string()[..22])
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}
