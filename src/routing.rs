use std::collections::HashMap;

use serde_json::Value;

use crate::types::message::CanonicalMessage;

pub const CONVERSATION_SCREEN: &str = "ConversationScreen";
pub const TEACHER_MESSAGING_SCREEN: &str = "TeacherMessagingScreen";
pub const STUDENT_MESSAGING_SCREEN: &str = "StudentMessagingScreen";
pub const NOTIFICATION_SCREEN: &str = "NotificationScreen";

const DEFAULT_CONVERSATION_TOPIC: &str = "Conversation";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserType {
    Teacher,
    Student,
    Parent,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Teacher => "teacher",
            UserType::Student => "student",
            UserType::Parent => "parent",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "teacher" => Some(UserType::Teacher),
            "student" => Some(UserType::Student),
            "parent" => Some(UserType::Parent),
            _ => None,
        }
    }

    fn name_param(self) -> &'static str {
        match self {
            UserType::Teacher => "teacherName",
            UserType::Student => "studentName",
            UserType::Parent => "parentName",
        }
    }

    /// Parents have no messaging inbox of their own and land on the
    /// student list.
    fn messaging_screen(self) -> &'static str {
        match self {
            UserType::Teacher => TEACHER_MESSAGING_SCREEN,
            UserType::Student | UserType::Parent => STUDENT_MESSAGING_SCREEN,
        }
    }
}

/// Locally resolved inputs to routing: who is signed in on this device.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    pub user_type: Option<UserType>,
    pub auth_code: Option<String>,
    pub display_name: Option<String>,
}

impl SessionContext {
    /// The student default is deliberate fallback policy for sessions
    /// that carry no usable role marker, not an error path.
    pub fn resolved_user_type(&self) -> UserType {
        self.user_type.unwrap_or(UserType::Student)
    }
}

/// Resolves the user type from the cached session JSON. A truthy
/// `is_teacher` wins; otherwise `role`, `userType`, `type` are tried in
/// order as role names.
pub fn resolve_user_type(session: &Value) -> Option<UserType> {
    if is_truthy(session.get("is_teacher")) {
        return Some(UserType::Teacher);
    }
    for key in ["role", "userType", "type"] {
        if let Some(raw) = session.get(key).and_then(Value::as_str)
            && let Some(user_type) = UserType::parse(raw)
        {
            return Some(user_type);
        }
    }
    None
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        Some(Value::Bool(flag)) => *flag,
        Some(Value::Number(number)) => number.as_f64().is_some_and(|number| number != 0.0),
        Some(Value::String(raw)) => raw.eq_ignore_ascii_case("true") || raw == "1",
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Destination {
    pub screen: &'static str,
    pub params: HashMap<String, Value>,
}

/// Decides the destination for one canonical message. First match wins:
/// message with a conversation id → the conversation screen; message
/// without one → the role's messaging list; anything else → the
/// notification center.
pub fn route(message: &CanonicalMessage, session: &SessionContext) -> Destination {
    if let Some(kind) = message.data_str("type") {
        // Analytics tap only; never affects the outcome.
        tracing::debug!("routing notification of type {kind}");
    }

    let user_type = session.resolved_user_type();
    let is_message = message.data_str("type").as_deref() == Some("message")
        || message.data_str("notification_type").as_deref() == Some("message");

    if is_message {
        let mut params = HashMap::new();
        if let Some(auth_code) = &session.auth_code {
            string_param(&mut params, "authCode", auth_code.clone());
        }
        string_param(
            &mut params,
            user_type.name_param(),
            message
                .data_str("user_name")
                .or_else(|| session.display_name.clone())
                .unwrap_or_default(),
        );

        if let Some(conversation_uuid) =
            message.first_data_str(&["conversation_uuid", "conversation_id"])
        {
            string_param(&mut params, "conversationUuid", conversation_uuid);
            string_param(
                &mut params,
                "conversationTopic",
                message
                    .data_str("conversation_topic")
                    .unwrap_or_else(|| DEFAULT_CONVERSATION_TOPIC.to_string()),
            );
            string_param(&mut params, "userType", user_type.as_str());
            return Destination {
                screen: CONVERSATION_SCREEN,
                params,
            };
        }

        return Destination {
            screen: user_type.messaging_screen(),
            params,
        };
    }

    let mut params = HashMap::new();
    string_param(&mut params, "userType", user_type.as_str());
    if let Some(auth_code) = &session.auth_code {
        string_param(&mut params, "authCode", auth_code.clone());
    }
    Destination {
        screen: NOTIFICATION_SCREEN,
        params,
    }
}

fn string_param(params: &mut HashMap<String, Value>, key: &str, value: impl Into<String>) {
    params.insert(key.to_string(), Value::String(value.into()));
}

#[cfg(test)]
#[allow(non_snake_case)]
mod tests {
    use super::*;
    use serde_json::json;

    fn message(entries: &[(&str, &str)]) -> CanonicalMessage {
        let mut message = CanonicalMessage::default();
        for (key, value) in entries {
            message.data.insert(key.to_string(), json!(value));
        }
        message
    }

    fn param<'a>(destination: &'a Destination, key: &str) -> Option<&'a str> {
        destination.params.get(key).and_then(Value::as_str)
    }

    #[test]
    fn route__should_open_the_conversation_for_message_with_id() {
        // Given: spec scenario — teacher taps a conversation message
        let message = message(&[
            ("type", "message"),
            ("conversation_uuid", "abc123"),
            ("user_name", "Ms. Lee"),
        ]);
        let session = SessionContext {
            user_type: Some(UserType::Teacher),
            auth_code: Some("T1".to_string()),
            display_name: None,
        };

        // When
        let destination = route(&message, &session);

        // Then
        assert_eq!(destination.screen, CONVERSATION_SCREEN);
        assert_eq!(param(&destination, "conversationUuid"), Some("abc123"));
        assert_eq!(param(&destination, "conversationTopic"), Some("Conversation"));
        assert_eq!(param(&destination, "authCode"), Some("T1"));
        assert_eq!(param(&destination, "teacherName"), Some("Ms. Lee"));
        assert_eq!(param(&destination, "userType"), Some("teacher"));
    }

    #[test]
    fn route__should_fall_back_to_the_messaging_list_without_an_id() {
        let message = message(&[("type", "message")]);
        let session = SessionContext {
            user_type: Some(UserType::Student),
            auth_code: Some("S9".to_string()),
            display_name: Some("Sam".to_string()),
        };

        let destination = route(&message, &session);

        assert_eq!(destination.screen, STUDENT_MESSAGING_SCREEN);
        assert_eq!(param(&destination, "authCode"), Some("S9"));
        assert_eq!(param(&destination, "studentName"), Some("Sam"));
    }

    #[test]
    fn route__should_send_everything_else_to_the_notification_center() {
        let message = message(&[("type", "grade")]);
        let session = SessionContext {
            user_type: Some(UserType::Parent),
            auth_code: Some("P4".to_string()),
            display_name: None,
        };

        let destination = route(&message, &session);

        assert_eq!(destination.screen, NOTIFICATION_SCREEN);
        assert_eq!(param(&destination, "userType"), Some("parent"));
        assert_eq!(param(&destination, "authCode"), Some("P4"));
    }

    #[test]
    fn route__should_accept_the_notification_type_alias() {
        let message = message(&[
            ("notification_type", "message"),
            ("conversation_id", "conv-7"),
        ]);
        let session = SessionContext {
            user_type: Some(UserType::Teacher),
            ..SessionContext::default()
        };

        let destination = route(&message, &session);

        assert_eq!(destination.screen, CONVERSATION_SCREEN);
        assert_eq!(param(&destination, "conversationUuid"), Some("conv-7"));
    }

    #[test]
    fn route__should_use_the_notification_center_when_type_is_missing() {
        let destination = route(&CanonicalMessage::default(), &SessionContext::default());

        assert_eq!(destination.screen, NOTIFICATION_SCREEN);
        assert_eq!(param(&destination, "userType"), Some("student"));
        assert!(destination.params.get("authCode").is_none());
    }

    #[test]
    fn route__should_use_the_teacher_messaging_list_for_teachers() {
        let message = message(&[("type", "message")]);
        let session = SessionContext {
            user_type: Some(UserType::Teacher),
            ..SessionContext::default()
        };

        let destination = route(&message, &session);

        assert_eq!(destination.screen, TEACHER_MESSAGING_SCREEN);
    }

    #[test]
    fn resolve_user_type__should_prefer_a_truthy_is_teacher() {
        assert_eq!(
            resolve_user_type(&json!({"is_teacher": true, "role": "parent"})),
            Some(UserType::Teacher)
        );
        assert_eq!(
            resolve_user_type(&json!({"is_teacher": 1})),
            Some(UserType::Teacher)
        );
        assert_eq!(
            resolve_user_type(&json!({"is_teacher": "true"})),
            Some(UserType::Teacher)
        );
    }

    #[test]
    fn resolve_user_type__should_fall_through_falsy_is_teacher() {
        assert_eq!(
            resolve_user_type(&json!({"is_teacher": false, "role": "parent"})),
            Some(UserType::Parent)
        );
    }

    #[test]
    fn resolve_user_type__should_try_role_keys_in_order() {
        assert_eq!(
            resolve_user_type(&json!({"userType": "Parent"})),
            Some(UserType::Parent)
        );
        assert_eq!(
            resolve_user_type(&json!({"role": "teacher", "userType": "student"})),
            Some(UserType::Teacher)
        );
        assert_eq!(
            resolve_user_type(&json!({"type": "student"})),
            Some(UserType::Student)
        );
    }

    #[test]
    fn resolve_user_type__should_report_nothing_for_unusable_sessions() {
        assert_eq!(resolve_user_type(&json!({})), None);
        assert_eq!(resolve_user_type(&json!({"role": "admin"})), None);
        assert_eq!(resolve_user_type(&Value::Null), None);
    }
}
