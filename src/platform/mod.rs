mod dispatch;
mod local;

pub use local::{Alert, LocalPlatform, LocalPlatformBuilder, PlatformCalls, ScheduledRequest};
