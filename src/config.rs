use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    /// Backend endpoint accepting device-token registrations.
    pub register_url: String,
    /// Backend endpoint accepting token removals. Falls back to
    /// `register_url` semantics on the server side when the two are the
    /// same route.
    pub unregister_url: String,
    /// Platform tag sent with every registration ("android" / "ios").
    pub platform: String,
    pub history_limit: usize,
    pub nav_retry_interval: Duration,
    pub nav_retry_budget: u32,
}

pub const DEFAULT_HISTORY_LIMIT: usize = 100;
pub const DEFAULT_NAV_RETRY_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_NAV_RETRY_BUDGET: u32 = 3;

impl AppConfig {
    pub fn new(
        register_url: impl Into<String>,
        unregister_url: impl Into<String>,
        platform: impl Into<String>,
    ) -> Self {
        Self {
            register_url: register_url.into(),
            unregister_url: unregister_url.into(),
            platform: platform.into(),
            history_limit: DEFAULT_HISTORY_LIMIT,
            nav_retry_interval: DEFAULT_NAV_RETRY_INTERVAL,
            nav_retry_budget: DEFAULT_NAV_RETRY_BUDGET,
        }
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self::new(
            "http://127.0.0.1:9/device-tokens",
            "http://127.0.0.1:9/device-tokens/remove",
            "android",
        )
    }
}
