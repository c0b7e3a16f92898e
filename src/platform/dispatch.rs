use std::{
    collections::HashMap,
    sync::{Arc, PoisonError, RwLock},
    thread,
};

use tokio::sync::mpsc::Receiver;

use crate::{
    handler::notification_handler, Error, ListenerKind, Notification, NotifyEvent, NotifyResponse,
    ReceivedCallback, ResponseCallback, Subscription,
};

/// Maximum number of events that can be queued for the listener thread
pub(super) const EVENT_CHANNEL_SIZE: usize = 10;

type SharedReceived = Arc<dyn Fn(Notification) + Send + Sync + 'static>;
type SharedResponse = Arc<dyn Fn(NotifyResponse) + Send + Sync + 'static>;

/// Registered listeners, keyed by subscription id
#[derive(Default)]
pub(super) struct Listeners {
    received: RwLock<HashMap<String, SharedReceived>>,
    response: RwLock<HashMap<String, SharedResponse>>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.count())
            .finish()
    }
}

fn poisoned<T>(_: PoisonError<T>) -> Error {
    Error::Other("listener registry lock poisoned".to_owned())
}

impl Listeners {
    pub(super) fn add_received(&self, callback: ReceivedCallback) -> Result<Subscription, Error> {
        let subscription = Subscription::new(ListenerKind::Received);
        self.received
            .write()
            .map_err(poisoned)?
            .insert(subscription.id().to_owned(), Arc::from(callback));
        Ok(subscription)
    }

    pub(super) fn add_response(&self, callback: ResponseCallback) -> Result<Subscription, Error> {
        let subscription = Subscription::new(ListenerKind::Response);
        self.response
            .write()
            .map_err(poisoned)?
            .insert(subscription.id().to_owned(), Arc::from(callback));
        Ok(subscription)
    }

    pub(super) fn remove(&self, subscription: Subscription) -> Result<(), Error> {
        let removed = match subscription.kind() {
            ListenerKind::Received => self
                .received
                .write()
                .map_err(poisoned)?
                .remove(subscription.id())
                .is_some(),
            ListenerKind::Response => self
                .response
                .write()
                .map_err(poisoned)?
                .remove(subscription.id())
                .is_some(),
        };

        if removed {
            Ok(())
        } else {
            Err(Error::UnknownSubscription(subscription.id().to_owned()))
        }
    }

    pub(super) fn count(&self) -> usize {
        let received = self
            .received
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        let response = self
            .response
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len();
        received + response
    }

    /// Call every listener for the event's kind.
    ///
    /// Callbacks are cloned out of the registry first, so a callback may add
    /// or release listeners without deadlocking.
    pub(super) fn dispatch(&self, event: NotifyEvent) -> Result<(), Error> {
        match event {
            NotifyEvent::Received(notification) => {
                let presentation =
                    notification_handler().presentation_for(notification.content.sound.is_some());
                log::debug!(
                    "Presenting notification {} with {presentation:?}",
                    notification.identifier
                );

                let callbacks: Vec<SharedReceived> = self
                    .received
                    .read()
                    .map_err(poisoned)?
                    .values()
                    .cloned()
                    .collect();
                for callback in callbacks {
                    callback(notification.clone());
                }
            }
            NotifyEvent::Response(response) => {
                let callbacks: Vec<SharedResponse> = self
                    .response
                    .read()
                    .map_err(poisoned)?
                    .values()
                    .cloned()
                    .collect();
                for callback in callbacks {
                    callback(response.clone());
                }
            }
        }
        Ok(())
    }
}

/// Start the thread that forwards queued events to the listeners.
///
/// The thread ends once every sender for `rx` is dropped.
pub(super) fn spawn_listener_loop(
    listeners: Arc<Listeners>,
    mut rx: Receiver<NotifyEvent>,
) {
    thread::spawn(move || {
        while let Some(event) = rx.blocking_recv() {
            if let Err(err) = listeners.dispatch(event) {
                log::error!("Failed to dispatch notification event: {err:?}");
            }
        }
        log::debug!("Notification listener loop stopped");
    });
}
