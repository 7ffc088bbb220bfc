//! Text command router
//!
//! Parses `/chatty…` commands (hyphen or underscore spelling, optional
//! `@botname` suffix) and runs them against the [`Assistant`] on behalf of
//! an inbound message. Every outcome is a plain reply string; the adapter
//! only has to send it back.

use crate::assistant::Assistant;
use crate::backend::ModelRegistry;
use crate::channels::{resolve_scope, AdminPolicy, Caller, InboundMessage};
use crate::context::normalize_context_filename;
use std::sync::Arc;

/// Fixed replies
pub mod replies {
    pub const NO_TEXT: &str = "Please provide some text after the command.";
    pub const BACKEND_FAILURE: &str = "Sorry, I couldn't get a response right now. Please try again later.";
    pub const EMPTY_ANSWER: &str = "The model returned an empty answer.";
    pub const MEMORY_RESET: &str = "Memory reset. Let's start fresh!";
    pub const ADMIN_ONLY: &str = "This command is reserved for administrators.";
    pub const PRIVATE_ONLY: &str = "This command can only be used in a private chat.";
    pub const CONTEXT_SET: &str = "Context set.";
    pub const CONTEXT_RESET: &str = "Context reset.";
    pub const INVALID_CONTEXT_FILE: &str = "Invalid context file.";
    pub const NO_CONTEXT_FILES: &str = "No context files available.";
    pub const CONTEXT_FILES_ERROR: &str = "Could not read the context files.";
    pub const INVALID_MODEL: &str = "Invalid or unsupported model.";
    pub const UNKNOWN_COMMAND: &str = "Unknown command. Try /chatty-help.";
    pub const HELP: &str = "\
/chatty <text> - ask the assistant
/chatty-reset - forget your conversation history (admin)
/chatty-admin-context <file> - use a context prompt here (admin)
/chatty-admin-context-reset - remove the context prompt here (admin)
/chatty-admin-contexts - list context prompt files (admin)
/chatty-admin-models - list models (admin, private chat)
/chatty-admin-model <name> - switch model (admin, private chat)
/chatty-help - show this message";
}

const COMMAND_PREFIX: &str = "chatty";

/// A parsed bot command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Ask the assistant (`/chatty <text>` or bare text)
    Ask(String),
    Reset,
    SetContext(String),
    ResetContext,
    ListContexts,
    ListModels,
    SetModel(String),
    Help,
    /// Slash command that is not ours
    Unknown(String),
}

impl Command {
    /// Parse message text. Text without a leading `/` is a question.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        let Some(rest) = text.strip_prefix('/') else {
            return Command::Ask(text.to_string());
        };

        let (head, args) = match rest.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (rest, ""),
        };
        // Telegram appends "@botname" in groups and forbids hyphens
        let name = head.split('@').next().unwrap_or(head).replace('_', "-");
        let first_arg = args.split_whitespace().next().unwrap_or("").to_string();

        match name.strip_prefix(COMMAND_PREFIX) {
            Some("") => Command::Ask(args.to_string()),
            Some("-reset") => Command::Reset,
            Some("-admin-context") => Command::SetContext(first_arg),
            Some("-admin-context-reset") => Command::ResetContext,
            Some("-admin-contexts") => Command::ListContexts,
            Some("-admin-models") => Command::ListModels,
            Some("-admin-model") => Command::SetModel(first_arg),
            Some("-help") => Command::Help,
            _ => Command::Unknown(name),
        }
    }

    fn requires_admin(&self) -> bool {
        !matches!(self, Command::Ask(_) | Command::Help | Command::Unknown(_))
    }

    fn requires_private(&self) -> bool {
        matches!(self, Command::ListModels | Command::SetModel(_))
    }
}

/// Runs commands for one platform adapter
pub struct CommandRouter {
    assistant: Arc<Assistant>,
    models: Option<Arc<ModelRegistry>>,
    admin: Arc<dyn AdminPolicy>,
}

impl CommandRouter {
    pub fn new(assistant: Arc<Assistant>, admin: Arc<dyn AdminPolicy>) -> Self {
        Self {
            assistant,
            models: None,
            admin,
        }
    }

    /// Enable the model commands
    pub fn with_models(mut self, models: Arc<ModelRegistry>) -> Self {
        self.models = Some(models);
        self
    }

    /// Parse and execute a message
    pub async fn dispatch(&self, message: &InboundMessage) -> String {
        let command = Command::parse(&message.text);
        self.execute(message, command).await
    }

    pub async fn execute(&self, message: &InboundMessage, command: Command) -> String {
        let caller = &message.caller;
        let scope = resolve_scope(caller, &message.conversation);

        if command.requires_private() && !message.conversation.is_dm() {
            return replies::PRIVATE_ONLY.to_string();
        }
        if command.requires_admin() && !self.admin.is_admin(caller, &scope) {
            tracing::warn!(
                "Admin command {:?} denied for {} in '{}'",
                command,
                caller.display_name,
                scope
            );
            return replies::ADMIN_ONLY.to_string();
        }

        match command {
            Command::Ask(text) => self.ask(caller, &scope, &text).await,
            Command::Reset => {
                self.assistant.reset_user(&caller.memory_key()).await;
                replies::MEMORY_RESET.to_string()
            }
            Command::SetContext(file) => self.set_context(&scope, &file).await,
            Command::ResetContext => {
                self.assistant.admin_reset_context(&scope).await;
                tracing::info!("Context reset for {}", scope);
                replies::CONTEXT_RESET.to_string()
            }
            Command::ListContexts => self.list_contexts().await,
            Command::ListModels => self.list_models().await,
            Command::SetModel(name) => self.set_model(caller, &name).await,
            Command::Help => replies::HELP.to_string(),
            Command::Unknown(name) => {
                tracing::debug!("Ignoring unknown command /{}", name);
                replies::UNKNOWN_COMMAND.to_string()
            }
        }
    }

    async fn ask(&self, caller: &Caller, scope: &str, text: &str) -> String {
        if text.trim().is_empty() {
            return replies::NO_TEXT.to_string();
        }
        tracing::info!(
            "Prompt from {}: {}",
            caller.display_name,
            text.chars().take(100).collect::<String>()
        );

        match self.assistant.handle_turn(scope, &caller.memory_key(), text).await {
            Ok(answer) if answer.trim().is_empty() => replies::EMPTY_ANSWER.to_string(),
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Turn failed for {}: {}", caller.display_name, e);
                replies::BACKEND_FAILURE.to_string()
            }
        }
    }

    async fn set_context(&self, scope: &str, file: &str) -> String {
        if file.is_empty() {
            return replies::INVALID_CONTEXT_FILE.to_string();
        }
        let filename = normalize_context_filename(file);
        if self.assistant.admin_set_context(scope, &filename).await {
            tracing::info!("Context set to '{}' for {}", filename, scope);
            replies::CONTEXT_SET.to_string()
        } else {
            tracing::warn!("Invalid context file: {}", filename);
            replies::INVALID_CONTEXT_FILE.to_string()
        }
    }

    async fn list_contexts(&self) -> String {
        match self.assistant.contexts().list_context_files().await {
            Ok(files) if files.is_empty() => replies::NO_CONTEXT_FILES.to_string(),
            Ok(files) => format!("Available context files:\n{}", files.join("\n")),
            Err(e) => {
                tracing::error!("Context listing error: {}", e);
                replies::CONTEXT_FILES_ERROR.to_string()
            }
        }
    }

    async fn list_models(&self) -> String {
        let Some(models) = &self.models else {
            return replies::INVALID_MODEL.to_string();
        };
        let current = models.current_model().await;
        let lines: Vec<String> = models
            .supported_models()
            .await
            .into_iter()
            .map(|m| {
                if m == current {
                    format!("- {} (active)", m)
                } else {
                    format!("- {}", m)
                }
            })
            .collect();
        format!("Available models:\n{}", lines.join("\n"))
    }

    async fn set_model(&self, caller: &Caller, name: &str) -> String {
        let Some(models) = &self.models else {
            return replies::INVALID_MODEL.to_string();
        };
        if !name.is_empty() && models.change_model(name).await {
            tracing::info!("Model switched to '{}' by {}", name, caller.display_name);
            format!("Model switched to {}.", name)
        } else {
            tracing::warn!("Invalid model '{}' requested by {}", name, caller.display_name);
            replies::INVALID_MODEL.to_string()
        }
    }
}
