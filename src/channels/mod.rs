//! Channel identity rules
//!
//! Platform adapters hand the core a [`Caller`] and a [`Conversation`];
//! this module turns them into the scope used for context prompts and
//! decides who may run admin commands.

mod auth;
mod discord;
mod message;
mod telegram;

pub use auth::{AdminPolicy, AllowAll, DenyAll, PlatformAdminPolicy};
pub use discord::{DiscordAdminPolicy, DISCORD_DM_SCOPE};
pub use message::{Caller, Conversation, InboundMessage, Platform};
pub use telegram::TelegramAdminPolicy;

/// Scope name selecting the context prompt for a conversation
pub fn resolve_scope(caller: &Caller, conversation: &Conversation) -> String {
    match caller.platform {
        Platform::Discord => discord::scope_for(conversation),
        Platform::Telegram => telegram::scope_for(caller, conversation),
        Platform::Console => match conversation {
            Conversation::Group { id, title } => title.clone().unwrap_or_else(|| id.clone()),
            Conversation::Direct => "console".to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_scope_per_platform() {
        let dm = Conversation::Direct;
        assert_eq!(resolve_scope(&Caller::new(Platform::Discord, "1"), &dm), "DM");
        assert_eq!(resolve_scope(&Caller::new(Platform::Telegram, "1"), &dm), "User-1");
        assert_eq!(resolve_scope(&Caller::new(Platform::Console, "op"), &dm), "console");

        let guild = Conversation::Group {
            id: "42".to_string(),
            title: Some("guild-42".to_string()),
        };
        assert_eq!(resolve_scope(&Caller::new(Platform::Discord, "1"), &guild), "guild-42");
    }
}
