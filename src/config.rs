use std::str::FromStr;

use crate::Error;

const PROJECT_ID_ENV: &str = "PUSH_FLOW_PROJECT_ID";
const ERROR_POLICY_ENV: &str = "PUSH_FLOW_ERROR_POLICY";

pub(crate) const GENERIC_ERROR_MESSAGE: &str =
    "Could not get push token. Check permissions or device.";

/// How an error raised by a platform call is shown on the screen.
///
/// A simulator or a refused permission always shows the generic message, the
/// policy only covers errors thrown by the platform, such as a failed token
/// request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMessagePolicy {
    /// "Error: " followed by the error's own message
    #[default]
    Raw,
    /// The generic message for every failure
    Generic,
}

impl ErrorMessagePolicy {
    pub fn format(&self, err: &Error) -> String {
        match (self, err) {
            (_, Error::IneligibleDevice | Error::PermissionDenied) => {
                GENERIC_ERROR_MESSAGE.to_owned()
            }
            (ErrorMessagePolicy::Raw, err) => format!("Error: {err}"),
            (ErrorMessagePolicy::Generic, _) => GENERIC_ERROR_MESSAGE.to_owned(),
        }
    }
}

impl FromStr for ErrorMessagePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "raw" => Ok(ErrorMessagePolicy::Raw),
            "generic" => Ok(ErrorMessagePolicy::Generic),
            other => Err(Error::InvalidConfig(format!(
                "{ERROR_POLICY_ENV} must be `raw` or `generic`, got `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenConfig {
    /// Project the push token is issued for
    pub project_id: Option<String>,
    pub error_policy: ErrorMessagePolicy,
}

impl ScreenConfig {
    pub fn new() -> Self {
        ScreenConfig::default()
    }

    pub fn project_id(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_owned());
        self
    }

    pub fn error_policy(mut self, error_policy: ErrorMessagePolicy) -> Self {
        self.error_policy = error_policy;
        self
    }

    /// Read `PUSH_FLOW_PROJECT_ID` and `PUSH_FLOW_ERROR_POLICY`, unset
    /// variables keep their defaults
    pub fn from_env() -> Result<Self, Error> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
        let project_id = lookup(PROJECT_ID_ENV).filter(|id| !id.is_empty());
        let error_policy = match lookup(ERROR_POLICY_ENV) {
            Some(policy) => policy.parse()?,
            None => ErrorMessagePolicy::default(),
        };

        Ok(Self {
            project_id,
            error_policy,
        })
    }
}
