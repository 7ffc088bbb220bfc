//! Prompt composition
//!
//! Pure functions that turn a scope's context prompt, a user's held
//! exchanges and the new question into the text sent to the model.
//! Nothing here performs I/O or touches shared state.

use crate::memory::Exchange;

/// Speaker labels used when rendering history
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeakerLabels {
    pub user: String,
    pub bot: String,
}

impl SpeakerLabels {
    pub fn new(user: impl Into<String>, bot: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            bot: bot.into(),
        }
    }
}

impl Default for SpeakerLabels {
    fn default() -> Self {
        Self::new("User", "Bot")
    }
}

/// Render held exchanges oldest first, then the open turn the model completes.
///
/// ```text
/// User: q1
/// Bot: a1
/// User: {question}
/// Bot:
/// ```
pub fn render_history<'a>(
    exchanges: impl IntoIterator<Item = &'a Exchange>,
    question: &str,
    labels: &SpeakerLabels,
) -> String {
    let mut prompt = String::new();
    for exchange in exchanges {
        prompt.push_str(&format!(
            "{}: {}\n{}: {}\n",
            labels.user, exchange.question, labels.bot, exchange.answer
        ));
    }
    prompt.push_str(&format!("{}: {}\n{}:", labels.user, question, labels.bot));
    prompt
}

/// Prepend a context prompt to rendered history.
///
/// The context is trimmed and joined with a blank line; an empty or
/// whitespace-only context leaves the history untouched.
pub fn compose(context_text: &str, history_and_question: &str) -> String {
    let context = context_text.trim();
    if context.is_empty() {
        history_and_question.to_string()
    } else {
        format!("{}\n\n{}", context, history_and_question)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_empty_history() {
        let rendered = render_history(&Vec::<Exchange>::new(), "hello", &SpeakerLabels::default());
        assert_eq!(rendered, "User: hello\nBot:");
    }

    #[test]
    fn test_render_keeps_insertion_order() {
        let exchanges = vec![Exchange::new("q1", "a1"), Exchange::new("q2", "a2")];
        let rendered = render_history(&exchanges, "q3", &SpeakerLabels::default());
        assert_eq!(rendered, "User: q1\nBot: a1\nUser: q2\nBot: a2\nUser: q3\nBot:");
    }

    #[test]
    fn test_render_custom_labels() {
        let labels = SpeakerLabels::new("Utente", "Coffy");
        let exchanges = vec![Exchange::new("ciao", "salve")];
        let rendered = render_history(&exchanges, "come va?", &labels);
        assert_eq!(rendered, "Utente: ciao\nCoffy: salve\nUtente: come va?\nCoffy:");
    }

    #[test]
    fn test_render_accepts_empty_question() {
        let rendered = render_history(&Vec::<Exchange>::new(), "", &SpeakerLabels::default());
        assert_eq!(rendered, "User: \nBot:");
    }

    #[test]
    fn test_compose_with_context() {
        let prompt = compose("You are a pirate.\n", "User: hello\nBot:");
        assert_eq!(prompt, "You are a pirate.\n\nUser: hello\nBot:");
    }

    #[test]
    fn test_compose_trims_both_ends() {
        let prompt = compose("\n  Be brief.  \n\n", "User: hi\nBot:");
        assert_eq!(prompt, "Be brief.\n\nUser: hi\nBot:");
    }

    #[test]
    fn test_compose_without_context() {
        assert_eq!(compose("", "User: hi\nBot:"), "User: hi\nBot:");
        assert_eq!(compose(" \n\t", "User: hi\nBot:"), "User: hi\nBot:");
    }

    #[test]
    fn test_compose_is_deterministic() {
        let a = compose("ctx", "User: x\nBot:");
        let b = compose("ctx", "User: x\nBot:");
        assert_eq!(a, b);
        assert_eq!(a.matches("\n\n").count(), 1);
    }
}
