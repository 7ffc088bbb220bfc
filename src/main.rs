//! Chatty - Conversational core for a chat assistant bot
//!
//! Command-line front end: an interactive console chat plus maintenance
//! commands for context mappings and stored memory.

use anyhow::Result;
use chatty::{
    backend::{GeminiBackend, ModelRegistry},
    channels::{AllowAll, Caller, Conversation, InboundMessage, Platform},
    commands::CommandRouter,
    config::ChattyConfig,
    context::ContextStore,
    memory::{JsonFilePersistence, MemorySettings, MemoryStore},
    Assistant,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "chatty")]
#[command(version)]
#[command(about = "Conversational core for a chat assistant bot")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CHATTY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chat with the assistant from the terminal
    Chat {
        /// User ID to chat as
        #[arg(short, long, default_value = "operator")]
        user: String,

        /// Scope (group name) whose context prompt applies; private chat if omitted
        #[arg(short, long)]
        scope: Option<String>,
    },

    /// Manage scope to context-file mappings
    Context {
        #[command(subcommand)]
        action: ContextAction,
    },

    /// Inspect or clear stored conversation memory
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[derive(Subcommand)]
enum ContextAction {
    /// List context files and current mappings
    List,

    /// Map a scope to a context file
    Set { scope: String, file: String },

    /// Remove a scope's mapping
    Reset { scope: String },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// Show stored history (all users if none given)
    Show {
        /// Memory key, e.g. `discord:1234`
        user: Option<String>,
    },

    /// Forget a user's history
    Reset { user: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("chatty={}", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    let config = match cli.config {
        Some(config_path) => ChattyConfig::from_file(&config_path)?,
        None => ChattyConfig::default(),
    };

    match cli.command {
        Commands::Chat { user, scope } => run_chat(config, user, scope).await?,
        Commands::Context { action } => run_context(&config, action).await?,
        Commands::Memory { action } => run_memory(&config, action).await?,
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_chat(config: ChattyConfig, user: String, scope: Option<String>) -> Result<()> {
    let models = Arc::new(ModelRegistry::new(
        config.storage.models_file.clone(),
        config.backend.default_model.clone(),
    ));
    let backend = GeminiBackend::from_config(&config.backend, models.clone())?;
    let assistant = Arc::new(Assistant::open(&config, Arc::new(backend)).await?);
    let router = CommandRouter::new(assistant.clone(), Arc::new(AllowAll)).with_models(models);

    let caller = Caller::new(Platform::Console, user);
    let conversation = match scope {
        Some(name) => Conversation::Group {
            id: name.clone(),
            title: Some(name),
        },
        None => Conversation::Direct,
    };

    tracing::info!("Chatting as {}. Press Ctrl+C or Ctrl+D to stop.", caller.memory_key());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }

        let message = InboundMessage::new(caller.clone(), conversation.clone(), line);
        // Ctrl+C abandons the in-flight turn; nothing is recorded for it
        let reply = tokio::select! {
            reply = router.dispatch(&message) => reply,
            _ = tokio::signal::ctrl_c() => break,
        };
        stdout.write_all(format!("{}\n", reply).as_bytes()).await?;
    }

    tracing::info!("Shutting down...");
    assistant.close().await;
    Ok(())
}

async fn run_context(config: &ChattyConfig, action: ContextAction) -> Result<()> {
    let store = ContextStore::open(
        config.storage.context_file.clone(),
        config.storage.prompts_dir.clone(),
    )
    .await?;

    match action {
        ContextAction::List => {
            println!("Context files in {}:", store.prompts_dir().display());
            for file in store.list_context_files().await? {
                println!("  {}", file);
            }
            println!();
            println!("Mappings:");
            for (scope, file) in store.mappings().await {
                println!("  {} -> {}", scope, file);
            }
        }
        ContextAction::Set { scope, file } => {
            let file = chatty::context::normalize_context_filename(&file);
            if store.set_context_file(&scope, &file).await {
                println!("{} -> {}", scope, file);
            } else {
                anyhow::bail!("invalid context file: {}", file);
            }
        }
        ContextAction::Reset { scope } => {
            if store.reset_context(&scope).await {
                println!("Context reset for {}", scope);
            } else {
                println!("No context mapped for {}", scope);
            }
        }
    }
    Ok(())
}

async fn run_memory(config: &ChattyConfig, action: MemoryAction) -> Result<()> {
    let persistence = Arc::new(JsonFilePersistence::new(&config.storage.memory_file));
    let store = MemoryStore::open(MemorySettings::from(&config.memory), persistence).await;

    match action {
        MemoryAction::Show { user } => {
            let users = match user {
                Some(user) => vec![user],
                None => store.users().await,
            };
            for user in users {
                let Some(record) = store.snapshot(&user).await else {
                    println!("{}: no history", user);
                    continue;
                };
                println!("{} ({} exchange(s)):", user, record.len());
                for exchange in &record.exchanges {
                    println!("  Q: {}", exchange.question);
                    println!("  A: {}", exchange.answer);
                }
            }
        }
        MemoryAction::Reset { user } => {
            if store.reset(&user).await {
                store.save().await?;
                println!("Memory reset for {}", user);
            } else {
                println!("{}: no history", user);
            }
        }
    }
    Ok(())
}

fn show_config(config: Option<&ChattyConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
