//! Text generation backends
//!
//! The assistant only needs one capability from a language model: turn a
//! prompt into a reply, or fail distinguishably. An `Err` means the turn
//! failed and nothing is recorded; an `Ok` with empty text is a valid reply.

mod gemini;
mod models;

pub use gemini::GeminiBackend;
pub use models::{ModelRegistry, ModelsFile};

use crate::error::Result;
use async_trait::async_trait;

/// Prompt-in, text-out language model interface
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Generate a reply for the full composed prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Human-readable backend name (used in logs)
    fn name(&self) -> &str;
}

/// Shorten a prompt for log output: head and tail around an ellipsis
pub(crate) fn preview(text: &str, edge: usize) -> String {
    let chars: Vec<char> = text.chars().collect();
    if chars.len() <= edge * 2 {
        return text.to_string();
    }
    let head: String = chars[..edge].iter().collect();
    let tail: String = chars[chars.len() - edge..].iter().collect();
    format!("{} [...] {}", head, tail)
}
