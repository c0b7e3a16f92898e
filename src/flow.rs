use crate::{Error, NotifyPlatformExt, PermissionStatus, PushToken};

pub(crate) const ALERT_TITLE: &str = "Error";
pub(crate) const NOT_A_DEVICE_MESSAGE: &str = "Must use physical device for Push Notifications";
pub(crate) const PERMISSION_DENIED_MESSAGE: &str =
    "Failed to get push token for push notifications!";

/// Result of one run of the permission and token sequence
#[derive(Debug)]
pub struct TokenOutcome {
    pub is_device: bool,
    /// Last known permission decision, `None` when the device check failed
    /// before the permission store was asked
    pub permission: Option<PermissionStatus>,
    pub token: Result<PushToken, Error>,
}

/// Gets notification permission and a push token from the platform.
///
/// The sequence runs once per call and is never retried.
#[derive(Debug)]
pub struct PermissionAndTokenFlow<'a, P: NotifyPlatformExt> {
    platform: &'a P,
    project_id: Option<&'a str>,
}

impl<'a, P: NotifyPlatformExt> PermissionAndTokenFlow<'a, P> {
    pub fn new(platform: &'a P, project_id: Option<&'a str>) -> Self {
        Self {
            platform,
            project_id,
        }
    }

    /// Acquire a push token
    ///
    /// # Errors
    /// - `Error::IneligibleDevice` when not running on a physical device
    /// - `Error::PermissionDenied` when the user did not grant permission
    /// - `Error::TokenIssuance` when the token service failed
    pub async fn acquire_token(&self) -> Result<PushToken, Error> {
        self.run().await.token
    }

    /// Same as [`Self::acquire_token`] but also reports the permission
    /// decision that was reached
    pub async fn run(&self) -> TokenOutcome {
        if !self.platform.is_device() {
            log::warn!("Not a physical device");
            self.platform.show_alert(ALERT_TITLE, NOT_A_DEVICE_MESSAGE);
            return TokenOutcome {
                is_device: false,
                permission: None,
                token: Err(Error::IneligibleDevice),
            };
        }

        let permission = match self.ensure_permission().await {
            Ok(permission) => permission,
            Err(err) => {
                return TokenOutcome {
                    is_device: true,
                    permission: None,
                    token: Err(err),
                }
            }
        };

        if !permission.is_granted() {
            log::warn!("Permissions not granted: {permission}");
            self.platform.show_alert(ALERT_TITLE, PERMISSION_DENIED_MESSAGE);
            return TokenOutcome {
                is_device: true,
                permission: Some(permission),
                token: Err(Error::PermissionDenied),
            };
        }

        let token = match self.platform.get_push_token(self.project_id).await {
            Ok(token) => {
                log::info!("Got push token: {token}");
                Ok(token)
            }
            Err(err) => {
                log::warn!("Error getting push token: {err}");
                Err(match err {
                    err @ Error::TokenIssuance(_) => err,
                    other => Error::TokenIssuance(other.to_string()),
                })
            }
        };

        TokenOutcome {
            is_device: true,
            permission: Some(permission),
            token,
        }
    }

    /// Read the stored decision and only ask the user when it is not granted
    async fn ensure_permission(&self) -> Result<PermissionStatus, Error> {
        let existing = self.platform.get_permission_status().await?;
        log::debug!("Existing permission status: {existing}");
        if existing.is_granted() {
            return Ok(existing);
        }

        let requested = self.platform.request_permission().await?;
        log::debug!("Requested permission status: {requested}");
        Ok(requested)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalPlatform, LocalPlatformBuilder};

    fn platform(existing: PermissionStatus, decision: PermissionStatus) -> LocalPlatform {
        LocalPlatformBuilder::new()
            .permission(existing)
            .user_decision(decision)
            .token("ExpoToken[abc123]")
            .build()
    }

    #[tokio::test]
    async fn granted_permission_skips_the_request() {
        let platform = platform(PermissionStatus::Granted, PermissionStatus::Denied);
        let outcome = PermissionAndTokenFlow::new(&platform, None).run().await;

        assert_eq!(outcome.permission, Some(PermissionStatus::Granted));
        assert_eq!(outcome.token.unwrap().as_str(), "ExpoToken[abc123]");
        assert_eq!(platform.calls().permission_requests, 0);
        assert_eq!(platform.calls().token_requests, 1);
        assert!(platform.alerts().is_empty());
    }

    #[tokio::test]
    async fn undetermined_permission_is_requested() {
        let platform = platform(PermissionStatus::Undetermined, PermissionStatus::Granted);
        let token = PermissionAndTokenFlow::new(&platform, None)
            .acquire_token()
            .await
            .unwrap();

        assert_eq!(token.as_str(), "ExpoToken[abc123]");
        assert_eq!(platform.calls().permission_requests, 1);
    }

    #[tokio::test]
    async fn previously_denied_permission_is_asked_again() {
        let platform = platform(PermissionStatus::Denied, PermissionStatus::Denied);
        let outcome = PermissionAndTokenFlow::new(&platform, None).run().await;

        assert!(matches!(outcome.token, Err(Error::PermissionDenied)));
        assert_eq!(outcome.permission, Some(PermissionStatus::Denied));
        assert_eq!(platform.calls().permission_requests, 1);
        assert_eq!(platform.calls().token_requests, 0);
    }

    #[tokio::test]
    async fn project_id_is_passed_to_the_token_service() {
        let platform = LocalPlatformBuilder::new()
            .permission(PermissionStatus::Granted)
            .build();
        let token = PermissionAndTokenFlow::new(&platform, Some("demo-project"))
            .acquire_token()
            .await
            .unwrap();

        assert!(token.as_str().starts_with("ExponentPushToken["));
        assert_eq!(
            platform.last_project_id(),
            Some(Some("demo-project".to_owned()))
        );
    }
}
