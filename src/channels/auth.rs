//! Admin capability checks
//!
//! Admin commands (context management, model switching, memory reset) are
//! gated by an `AdminPolicy`. Each platform decides what makes a caller an
//! admin; the command router only asks the predicate.

use super::discord::DiscordAdminPolicy;
use super::message::{Caller, Platform};
use super::telegram::TelegramAdminPolicy;
use crate::config::ChannelsConfig;

/// Capability predicate for admin operations
pub trait AdminPolicy: Send + Sync {
    /// Whether `caller` may run admin operations in `scope`
    fn is_admin(&self, caller: &Caller, scope: &str) -> bool;
}

/// Every caller is an admin (local console)
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

impl AdminPolicy for AllowAll {
    fn is_admin(&self, _caller: &Caller, _scope: &str) -> bool {
        true
    }
}

/// No caller is an admin
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAll;

impl AdminPolicy for DenyAll {
    fn is_admin(&self, _caller: &Caller, _scope: &str) -> bool {
        false
    }
}

/// Dispatches to the policy of the caller's platform.
///
/// Platforms without configuration have no admins; the console is always
/// trusted.
pub struct PlatformAdminPolicy {
    discord: Option<DiscordAdminPolicy>,
    telegram: Option<TelegramAdminPolicy>,
}

impl PlatformAdminPolicy {
    pub fn from_config(config: &ChannelsConfig) -> Self {
        Self {
            discord: config.discord.clone().map(DiscordAdminPolicy::new),
            telegram: config.telegram.clone().map(TelegramAdminPolicy::new),
        }
    }
}

impl AdminPolicy for PlatformAdminPolicy {
    fn is_admin(&self, caller: &Caller, scope: &str) -> bool {
        match caller.platform {
            Platform::Discord => self
                .discord
                .as_ref()
                .map(|p| p.is_admin(caller, scope))
                .unwrap_or(false),
            Platform::Telegram => self
                .telegram
                .as_ref()
                .map(|p| p.is_admin(caller, scope))
                .unwrap_or(false),
            Platform::Console => true,
        }
    }
}
