//! Chatty - Conversational core for a chat assistant bot
//!
//! Chatty keeps a short, bounded, expiring history per user, prepends an
//! optional per-scope context prompt, and hands the composed prompt to a
//! generative text backend. Platform adapters (Discord, Telegram, a local
//! console) only translate messages and identities; everything else lives
//! here.
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  Adapter (Discord / Telegram / console)                        │
//! │    InboundMessage { caller, conversation, text }               │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────▼───────────────────────────────┐
//! │  CommandRouter   parse /chatty…, AdminPolicy, DM-only checks   │
//! └───────────────────────────────┬───────────────────────────────┘
//!                                 │ scope, memory key, question
//! ┌───────────────────────────────▼───────────────────────────────┐
//! │  Assistant                                                     │
//! │   ┌──────────────┐   ┌──────────────┐   ┌─────────────────┐   │
//! │   │ ContextStore │   │ MemoryStore  │   │  TextGenerator  │   │
//! │   │ scope → file │   │ user → last  │   │  (Gemini REST)  │   │
//! │   │  prompts/    │   │ N exchanges  │   │                 │   │
//! │   └──────────────┘   └──────────────┘   └─────────────────┘   │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`assistant`]: turn orchestration and save policy
//! - [`memory`]: bounded, expiring per-user history and its persistence
//! - [`context`]: scope to context-prompt mapping
//! - [`prompt`]: history rendering and prompt composition
//! - [`backend`]: text generation backends and the model registry
//! - [`channels`]: caller identity, scope resolution and admin checks
//! - [`commands`]: text command parsing and dispatch
//! - [`config`]: configuration management

pub mod assistant;
pub mod backend;
pub mod channels;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod memory;
pub mod prompt;

pub use assistant::Assistant;
pub use config::ChattyConfig;
pub use error::{Error, Result};
