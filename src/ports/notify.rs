use std::collections::HashMap;

use serde_json::Value;

/// The local-notification provider: immediate banner display for messages
/// received in the foreground, plus the app-icon badge count. One provider
/// object on the host side covers both.
pub trait LocalNotifier: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;

    fn show(
        &self,
        title: &str,
        body: &str,
        data: &HashMap<String, Value>,
    ) -> Result<(), Self::Error>;

    fn set_badge(&self, count: usize) -> Result<(), Self::Error>;
}
