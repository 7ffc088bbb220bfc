//! Platform-neutral caller and conversation identity

use serde::{Deserialize, Serialize};
use std::fmt;

/// Messaging platform a message arrived on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Discord,
    Telegram,
    /// Local operator console
    Console,
}

impl Platform {
    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Discord => "discord",
            Platform::Telegram => "telegram",
            Platform::Console => "console",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who sent a message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub platform: Platform,
    /// Platform user ID
    pub user_id: String,
    /// Handle (Telegram @username), if any
    pub username: Option<String>,
    /// Name shown in logs
    pub display_name: String,
    /// Role names held in the current guild (Discord)
    #[serde(default)]
    pub roles: Vec<String>,
}

impl Caller {
    pub fn new(platform: Platform, user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            platform,
            display_name: user_id.clone(),
            user_id,
            username: None,
            roles: Vec::new(),
        }
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Key under which the caller's conversational memory is stored.
    ///
    /// Prefixed with the platform so identical numeric IDs on Discord and
    /// Telegram never share a history.
    pub fn memory_key(&self) -> String {
        format!("{}:{}", self.platform, self.user_id)
    }
}

/// Where a message was sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Conversation {
    /// Discord guild or Telegram group/supergroup
    Group { id: String, title: Option<String> },
    /// One-to-one chat with the bot
    Direct,
}

impl Conversation {
    pub fn is_dm(&self) -> bool {
        matches!(self, Conversation::Direct)
    }
}

/// An inbound text message, already stripped of platform framing
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub caller: Caller,
    pub conversation: Conversation,
    pub text: String,
}

impl InboundMessage {
    pub fn new(caller: Caller, conversation: Conversation, text: impl Into<String>) -> Self {
        Self {
            caller,
            conversation,
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_key_is_platform_scoped() {
        let discord = Caller::new(Platform::Discord, "42");
        let telegram = Caller::new(Platform::Telegram, "42");
        assert_eq!(discord.memory_key(), "discord:42");
        assert_ne!(discord.memory_key(), telegram.memory_key());
    }

    #[test]
    fn test_caller_builder() {
        let caller = Caller::new(Platform::Telegram, "7")
            .with_username("sailor")
            .with_display_name("Sailor Moon");
        assert_eq!(caller.username.as_deref(), Some("sailor"));
        assert_eq!(caller.display_name, "Sailor Moon");
        assert!(caller.roles.is_empty());
    }

    #[test]
    fn test_conversation_serialize() {
        let group = Conversation::Group {
            id: "-100".to_string(),
            title: Some("Crew".to_string()),
        };
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json["kind"], "group");
        assert!(!group.is_dm());
        assert!(Conversation::Direct.is_dm());
    }
}
