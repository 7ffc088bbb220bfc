//! Per-scope context prompts

pub mod store;

pub use store::{normalize_context_filename, ContextStore};
