use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Wire shape shared by the three remote channels: a string-keyed payload
/// plus an optional display block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteMessage {
    #[serde(default)]
    pub data: HashMap<String, Value>,
    #[serde(default)]
    pub notification: Option<NotificationContent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationContent {
    pub title: Option<String>,
    pub body: Option<String>,
}

/// A tapped local notification. The tap response carries the displayed
/// title and body alongside the payload instead of a notification block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TappedNotification {
    pub title: Option<String>,
    pub body: Option<String>,
    #[serde(default)]
    pub data: HashMap<String, Value>,
}

/// Every channel a notification can reach the app through. The variant is
/// chosen at the subscription call site, never inferred from field shape.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    /// Remote message received while the app is in the foreground.
    Foreground(RemoteMessage),
    /// Remote notification tapped while the app was backgrounded.
    BackgroundOpened(RemoteMessage),
    /// Remote notification that launched the app from a quit state.
    QuitStateInitial(RemoteMessage),
    /// Locally displayed notification tapped by the user.
    LocalTapped(TappedNotification),
}

/// The one shape the router and the history store consume.
#[derive(Debug, Clone, Default)]
pub struct CanonicalMessage {
    pub data: HashMap<String, Value>,
    pub notification: Option<NotificationContent>,
}

impl InboundEvent {
    pub fn channel(&self) -> &'static str {
        match self {
            InboundEvent::Foreground(_) => "foreground",
            InboundEvent::BackgroundOpened(_) => "background-opened",
            InboundEvent::QuitStateInitial(_) => "quit-state",
            InboundEvent::LocalTapped(_) => "local-tap",
        }
    }

    pub fn canonicalize(self) -> CanonicalMessage {
        match self {
            InboundEvent::Foreground(message)
            | InboundEvent::BackgroundOpened(message)
            | InboundEvent::QuitStateInitial(message) => CanonicalMessage {
                data: message.data,
                notification: message.notification,
            },
            InboundEvent::LocalTapped(tapped) => CanonicalMessage {
                data: tapped.data,
                notification: Some(NotificationContent {
                    title: tapped.title,
                    body: tapped.body,
                }),
            },
        }
    }
}

impl CanonicalMessage {
    /// Payload lookup that tolerates numeric values; anything else is
    /// treated as absent.
    pub fn data_str(&self, key: &str) -> Option<String> {
        match self.data.get(key) {
            Some(Value::String(value)) => Some(value.clone()),
            Some(Value::Number(value)) => Some(value.to_string()),
            _ => None,
        }
    }

    pub fn first_data_str(&self, keys: &[&str]) -> Option<String> {
        keys.iter().find_map(|key| self.data_str(key))
    }
}
