//! Discord channel rules

use super::auth::AdminPolicy;
use super::message::{Caller, Conversation};
use crate::config::DiscordConfig;

/// Scope shared by every Discord direct message
pub const DISCORD_DM_SCOPE: &str = "DM";

/// Scope of a Discord conversation: the guild name, or `DM`
pub fn scope_for(conversation: &Conversation) -> String {
    match conversation {
        Conversation::Group { id, title } => title.clone().unwrap_or_else(|| id.clone()),
        Conversation::Direct => DISCORD_DM_SCOPE.to_string(),
    }
}

/// Admin when holding one of the configured roles, or being the fallback ID
pub struct DiscordAdminPolicy {
    config: DiscordConfig,
}

impl DiscordAdminPolicy {
    pub fn new(config: DiscordConfig) -> Self {
        Self { config }
    }

    fn has_admin_role(&self, caller: &Caller) -> bool {
        caller
            .roles
            .iter()
            .any(|role| self.config.admin_roles.iter().any(|r| r == role))
    }

    fn is_fallback_admin(&self, caller: &Caller) -> bool {
        self.config.fallback_admin_id != 0
            && caller.user_id.parse::<u64>().ok() == Some(self.config.fallback_admin_id)
    }
}

impl AdminPolicy for DiscordAdminPolicy {
    fn is_admin(&self, caller: &Caller, _scope: &str) -> bool {
        self.has_admin_role(caller) || self.is_fallback_admin(caller)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::message::Platform;

    fn create_test_config() -> DiscordConfig {
        DiscordConfig {
            admin_roles: vec!["Admin".to_string(), "Boss".to_string()],
            fallback_admin_id: 123456789012345678,
        }
    }

    #[test]
    fn test_scope_for_guild() {
        let guild = Conversation::Group {
            id: "1".to_string(),
            title: Some("Pirates".to_string()),
        };
        assert_eq!(scope_for(&guild), "Pirates");

        let untitled = Conversation::Group {
            id: "1".to_string(),
            title: None,
        };
        assert_eq!(scope_for(&untitled), "1");
        assert_eq!(scope_for(&Conversation::Direct), "DM");
    }

    #[test]
    fn test_role_grants_admin() {
        let policy = DiscordAdminPolicy::new(create_test_config());
        let caller = Caller::new(Platform::Discord, "5").with_roles(vec!["Boss".to_string()]);
        assert!(policy.is_admin(&caller, "Pirates"));
    }

    #[test]
    fn test_fallback_id_grants_admin() {
        let policy = DiscordAdminPolicy::new(create_test_config());
        let caller = Caller::new(Platform::Discord, "123456789012345678");
        assert!(policy.is_admin(&caller, "DM"));
    }

    #[test]
    fn test_plain_member_denied() {
        let policy = DiscordAdminPolicy::new(create_test_config());
        let caller = Caller::new(Platform::Discord, "999").with_roles(vec!["Crew".to_string()]);
        assert!(!policy.is_admin(&caller, "Pirates"));
    }

    #[test]
    fn test_unset_fallback_matches_nobody() {
        let policy = DiscordAdminPolicy::new(DiscordConfig {
            fallback_admin_id: 0,
            ..create_test_config()
        });
        assert!(!policy.is_admin(&Caller::new(Platform::Discord, "0"), "DM"));
    }
}
