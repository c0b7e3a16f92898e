use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, PoisonError,
    },
};

use tokio::sync::watch;

use crate::{
    config::ScreenConfig, flow::PermissionAndTokenFlow, Error, Notification, NotifyBuilder,
    NotifyPlatformExt, NotifyTrigger, PermissionStatus, PushToken, Subscription,
};

pub const SCREEN_TITLE: &str = "Push Notification Demo";
pub const TRIGGER_BUTTON_LABEL: &str = "Trigger Local Notification";

const TEST_NOTIFICATION_TITLE: &str = "Hey!";
const TEST_NOTIFICATION_BODY: &str = "This is a local notification.";

/// Everything the push screen displays
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenState {
    /// Only set once permission is granted
    pub token: Option<PushToken>,
    pub error_message: Option<String>,
    pub permission: PermissionStatus,
    /// `None` until the device check ran
    pub is_device: Option<bool>,
    pub last_notification: Option<Notification>,
}

#[derive(Debug)]
struct ScreenSubscriptions {
    received: Subscription,
    response: Subscription,
    /// Cleared under the state lock on deactivation, a received callback
    /// that already left the registry then drops its notification
    live: Arc<AtomicBool>,
}

/// View model for the push notification screen.
///
/// [`PushScreen::activate`] registers the listeners and runs the token flow,
/// [`PushScreen::deactivate`] releases the listeners. State changes are
/// published to [`PushScreen::subscribe`] receivers.
#[derive(Debug)]
pub struct PushScreen<P: NotifyPlatformExt> {
    platform: P,
    config: ScreenConfig,
    state: Arc<watch::Sender<ScreenState>>,
    subscriptions: Mutex<Option<ScreenSubscriptions>>,
}

impl<P: NotifyPlatformExt> PushScreen<P> {
    pub fn new(platform: P, config: ScreenConfig) -> Self {
        let (state, _) = watch::channel(ScreenState::default());
        Self {
            platform,
            config,
            state: Arc::new(state),
            subscriptions: Mutex::new(None),
        }
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Snapshot of the current state
    pub fn state(&self) -> ScreenState {
        self.state.borrow().clone()
    }

    /// Receiver notified on every state change
    pub fn subscribe(&self) -> watch::Receiver<ScreenState> {
        self.state.subscribe()
    }

    pub fn is_active(&self) -> bool {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Register the notification listeners, then fetch the push token.
    ///
    /// A failed token fetch is not an error here, it ends up in
    /// [`ScreenState::error_message`].
    ///
    /// # Errors
    /// - `Error::AlreadyActive` if the screen was activated and not deactivated
    /// - Errors from registering the listeners
    pub async fn activate(&self) -> Result<(), Error> {
        self.register_listeners()?;

        let project_id = self.config.project_id.as_deref();
        let outcome = PermissionAndTokenFlow::new(&self.platform, project_id)
            .run()
            .await;

        let error_policy = self.config.error_policy;
        self.state.send_modify(|state| {
            state.is_device = Some(outcome.is_device);
            if let Some(permission) = outcome.permission {
                state.permission = permission;
            }
            match outcome.token {
                Ok(token) => {
                    log::info!("Push token: {token}");
                    state.token = Some(token);
                    state.error_message = None;
                }
                Err(err) => {
                    state.token = None;
                    state.error_message = Some(error_policy.format(&err));
                }
            }
        });

        Ok(())
    }

    fn register_listeners(&self) -> Result<(), Error> {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if subscriptions.is_some() {
            return Err(Error::AlreadyActive);
        }

        let live = Arc::new(AtomicBool::new(true));
        let state = Arc::clone(&self.state);
        let received_live = Arc::clone(&live);
        let received = self
            .platform
            .add_notification_received_listener(Box::new(move |notification| {
                log::debug!("Notification received: {}", notification.identifier);
                state.send_if_modified(|state| {
                    if !received_live.load(Ordering::SeqCst) {
                        log::debug!("Screen inactive, dropping {}", notification.identifier);
                        return false;
                    }
                    state.last_notification = Some(notification);
                    true
                });
            }))?;

        let response = match self
            .platform
            .add_notification_response_listener(Box::new(|response| {
                log::info!("Notification response: {response:?}");
            })) {
            Ok(response) => response,
            Err(err) => {
                if let Err(release_err) = self.platform.remove_subscription(received) {
                    log::error!("Failed to release received listener: {release_err:?}");
                }
                return Err(err);
            }
        };

        log::info!("Notification listeners registered");
        *subscriptions = Some(ScreenSubscriptions {
            received,
            response,
            live,
        });
        Ok(())
    }

    /// Release the listeners and drop the last received notification.
    ///
    /// Calling this on an inactive screen does nothing.
    pub fn deactivate(&self) -> Result<(), Error> {
        let subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        let Some(ScreenSubscriptions {
            received,
            response,
            live,
        }) = subscriptions
        else {
            return Ok(());
        };

        self.state.send_modify(|state| {
            live.store(false, Ordering::SeqCst);
            state.last_notification = None;
        });
        let received = self.platform.remove_subscription(received);
        let response = self.platform.remove_subscription(response);
        log::info!("Notification listeners released");

        received.and(response)
    }

    /// Schedule the fixed test notification for immediate display and return
    /// its id. Does not wait for the notification to be shown.
    pub async fn send_local_test_notification(&self) -> Result<String, Error> {
        let data = HashMap::from([("someData".to_owned(), "demo".to_owned())]);
        let builder = NotifyBuilder::new()
            .title(TEST_NOTIFICATION_TITLE)
            .body(TEST_NOTIFICATION_BODY)
            .set_data(data);

        self.platform.schedule(builder, NotifyTrigger::Immediate).await
    }

    /// Text content of the screen, top to bottom
    pub fn render(&self) -> Result<String, Error> {
        let state = self.state();

        let token_line = match (&state.token, &state.error_message) {
            (Some(token), _) => token.to_string(),
            (None, Some(message)) => message.clone(),
            (None, None) => "Fetching token...".to_owned(),
        };
        let permission_line = match state.is_device {
            Some(false) => "Permission: unavailable on this device".to_owned(),
            _ => format!("Permission: {}", state.permission),
        };

        let mut out = format!(
            "{SCREEN_TITLE}\nYour Push Token:\n{token_line}\n{permission_line}\n[{TRIGGER_BUTTON_LABEL}]\n"
        );

        if let Some(notification) = &state.last_notification {
            out.push_str("Last Notification:\n");
            out.push_str(&serde_json::to_string_pretty(notification)?);
            out.push('\n');
        }

        Ok(out)
    }
}

impl<P: NotifyPlatformExt> Drop for PushScreen<P> {
    fn drop(&mut self) {
        if let Err(err) = self.deactivate() {
            log::error!("Failed to release notification listeners: {err:?}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ErrorMessagePolicy, LocalPlatform, LocalPlatformBuilder, NotificationContent,
        PushToken, ReceivedCallback, ResponseCallback,
    };
    use async_trait::async_trait;

    type SharedReceived = Arc<dyn Fn(Notification) + Send + Sync + 'static>;

    /// Keeps a copy of every received callback, like a listener thread that
    /// picked the callback up just before it was released
    #[derive(Debug, Clone)]
    struct LingeringPlatform {
        inner: LocalPlatform,
        kept: Arc<Mutex<Vec<SharedReceivedDebug>>>,
    }

    struct SharedReceivedDebug(SharedReceived);

    impl std::fmt::Debug for SharedReceivedDebug {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.write_str("callback")
        }
    }

    #[async_trait]
    impl NotifyPlatformExt for LingeringPlatform {
        fn is_device(&self) -> bool {
            self.inner.is_device()
        }

        async fn get_permission_status(&self) -> Result<PermissionStatus, Error> {
            self.inner.get_permission_status().await
        }

        async fn request_permission(&self) -> Result<PermissionStatus, Error> {
            self.inner.request_permission().await
        }

        async fn get_push_token(&self, project_id: Option<&str>) -> Result<PushToken, Error> {
            self.inner.get_push_token(project_id).await
        }

        async fn schedule(
            &self,
            builder: NotifyBuilder,
            trigger: NotifyTrigger,
        ) -> Result<String, Error> {
            self.inner.schedule(builder, trigger).await
        }

        fn add_notification_received_listener(
            &self,
            callback: ReceivedCallback,
        ) -> Result<Subscription, Error> {
            let callback: SharedReceived = Arc::from(callback);
            self.kept
                .lock()
                .unwrap()
                .push(SharedReceivedDebug(Arc::clone(&callback)));
            self.inner
                .add_notification_received_listener(Box::new(move |n| callback(n)))
        }

        fn add_notification_response_listener(
            &self,
            callback: ResponseCallback,
        ) -> Result<Subscription, Error> {
            self.inner.add_notification_response_listener(callback)
        }

        fn remove_subscription(&self, subscription: Subscription) -> Result<(), Error> {
            self.inner.remove_subscription(subscription)
        }

        fn show_alert(&self, title: &str, message: &str) {
            self.inner.show_alert(title, message)
        }
    }

    fn late_notification() -> Notification {
        Notification {
            identifier: "late-1".to_owned(),
            date: 0,
            content: NotificationContent {
                title: Some("Late".to_owned()),
                subtitle: None,
                body: None,
                data: HashMap::new(),
                sound: None,
            },
        }
    }

    #[tokio::test]
    async fn callback_running_after_deactivate_leaves_state_alone() {
        let platform = LingeringPlatform {
            inner: LocalPlatformBuilder::new().build(),
            kept: Arc::new(Mutex::new(Vec::new())),
        };
        let screen = PushScreen::new(platform.clone(), ScreenConfig::default());
        screen.activate().await.unwrap();

        screen.deactivate().unwrap();
        let changes = screen.subscribe();
        assert_eq!(platform.inner.listener_count(), 0);

        let kept: Vec<SharedReceived> = platform
            .kept
            .lock()
            .unwrap()
            .iter()
            .map(|callback| Arc::clone(&callback.0))
            .collect();
        assert_eq!(kept.len(), 1);
        for callback in kept {
            callback(late_notification());
        }

        assert_eq!(screen.state().last_notification, None);
        assert!(!changes.has_changed().unwrap());
    }

    #[tokio::test]
    async fn reactivated_screen_receives_again() {
        let platform = LocalPlatformBuilder::new().build();
        let screen = PushScreen::new(platform.clone(), ScreenConfig::default());

        screen.activate().await.unwrap();
        screen.deactivate().unwrap();
        screen.activate().await.unwrap();

        platform
            .deliver(crate::NotifyEvent::Received(late_notification()))
            .unwrap();
        assert_eq!(screen.state().last_notification, Some(late_notification()));
    }

    #[tokio::test]
    async fn second_activation_is_rejected() {
        let platform = LocalPlatformBuilder::new().build();
        let screen = PushScreen::new(platform.clone(), ScreenConfig::default());

        screen.activate().await.unwrap();
        assert!(matches!(screen.activate().await, Err(Error::AlreadyActive)));
        assert_eq!(platform.listener_count(), 2);
    }

    #[tokio::test]
    async fn deactivate_twice_releases_once() {
        let platform = LocalPlatformBuilder::new().build();
        let screen = PushScreen::new(platform.clone(), ScreenConfig::default());

        screen.activate().await.unwrap();
        screen.deactivate().unwrap();
        screen.deactivate().unwrap();

        assert!(!screen.is_active());
        assert_eq!(platform.listener_count(), 0);
    }

    #[tokio::test]
    async fn dropping_an_active_screen_releases_listeners() {
        let platform = LocalPlatformBuilder::new().build();
        {
            let screen = PushScreen::new(platform.clone(), ScreenConfig::default());
            screen.activate().await.unwrap();
            assert_eq!(platform.listener_count(), 2);
        }
        assert_eq!(platform.listener_count(), 0);
    }

    #[tokio::test]
    async fn generic_policy_hides_the_error_message() {
        let platform = LocalPlatformBuilder::new()
            .permission(PermissionStatus::Granted)
            .token_error("service unavailable")
            .build();
        let config = ScreenConfig::new().error_policy(ErrorMessagePolicy::Generic);
        let screen = PushScreen::new(platform, config);

        screen.activate().await.unwrap();

        assert_eq!(
            screen.state().error_message.as_deref(),
            Some(crate::config::GENERIC_ERROR_MESSAGE)
        );
    }

    #[test]
    fn fresh_screen_shows_fetching() {
        let screen = PushScreen::new(LocalPlatformBuilder::new().build(), ScreenConfig::default());
        let text = screen.render().unwrap();

        assert!(text.starts_with(SCREEN_TITLE));
        assert!(text.contains("Fetching token..."));
        assert!(text.contains("Permission: undetermined"));
        assert!(text.contains("[Trigger Local Notification]"));
        assert!(!text.contains("Last Notification:"));
    }

    #[tokio::test]
    async fn render_lists_every_line_in_order() {
        let platform = LocalPlatformBuilder::new()
            .permission(PermissionStatus::Granted)
            .token("ExpoToken[abc123]")
            .build();
        let screen = PushScreen::new(platform.clone(), ScreenConfig::default());
        screen.activate().await.unwrap();
        platform
            .deliver(crate::NotifyEvent::Received(late_notification()))
            .unwrap();

        let text = screen.render().unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(
            &lines[..6],
            &[
                SCREEN_TITLE,
                "Your Push Token:",
                "ExpoToken[abc123]",
                "Permission: granted",
                "[Trigger Local Notification]",
                "Last Notification:",
            ]
        );
        assert!(text.contains("\"identifier\": \"late-1\""));
        assert!(text.ends_with("}\n"));
    }
}
