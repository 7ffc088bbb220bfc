//! Telegram channel rules

use super::auth::AdminPolicy;
use super::message::{Caller, Conversation};
use crate::config::TelegramConfig;

/// Scope of a Telegram conversation.
///
/// Groups use their title (or `Group-{id}`); private chats use the sender's
/// username (or `User-{id}`), so every DM gets its own context.
pub fn scope_for(caller: &Caller, conversation: &Conversation) -> String {
    match conversation {
        Conversation::Group { id, title } => title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Group-{}", id)),
        Conversation::Direct => caller
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .unwrap_or_else(|| format!("User-{}", caller.user_id)),
    }
}

/// Admin when the sender's username matches the configured one
pub struct TelegramAdminPolicy {
    config: TelegramConfig,
}

impl TelegramAdminPolicy {
    pub fn new(config: TelegramConfig) -> Self {
        Self { config }
    }
}

impl AdminPolicy for TelegramAdminPolicy {
    fn is_admin(&self, caller: &Caller, _scope: &str) -> bool {
        let expected = self.config.fallback_admin_username.trim_start_matches('@');
        !expected.is_empty() && caller.username.as_deref() == Some(expected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::message::Platform;

    fn create_test_config() -> TelegramConfig {
        TelegramConfig {
            fallback_admin_username: "captain".to_string(),
        }
    }

    #[test]
    fn test_group_scope() {
        let caller = Caller::new(Platform::Telegram, "7");
        let titled = Conversation::Group {
            id: "-100123".to_string(),
            title: Some("Crew".to_string()),
        };
        let untitled = Conversation::Group {
            id: "-100123".to_string(),
            title: None,
        };
        assert_eq!(scope_for(&caller, &titled), "Crew");
        assert_eq!(scope_for(&caller, &untitled), "Group--100123");
    }

    #[test]
    fn test_private_scope() {
        let named = Caller::new(Platform::Telegram, "7").with_username("sailor");
        let anonymous = Caller::new(Platform::Telegram, "7");
        assert_eq!(scope_for(&named, &Conversation::Direct), "sailor");
        assert_eq!(scope_for(&anonymous, &Conversation::Direct), "User-7");
    }

    #[test]
    fn test_admin_username() {
        let policy = TelegramAdminPolicy::new(create_test_config());
        let captain = Caller::new(Platform::Telegram, "1").with_username("captain");
        let sailor = Caller::new(Platform::Telegram, "2").with_username("sailor");
        let anonymous = Caller::new(Platform::Telegram, "3");

        assert!(policy.is_admin(&captain, "Crew"));
        assert!(!policy.is_admin(&sailor, "Crew"));
        assert!(!policy.is_admin(&anonymous, "Crew"));
    }

    #[test]
    fn test_empty_admin_username_matches_nobody() {
        let policy = TelegramAdminPolicy::new(TelegramConfig::default());
        let caller = Caller::new(Platform::Telegram, "1").with_username("");
        assert!(!policy.is_admin(&caller, "x"));
    }
}
