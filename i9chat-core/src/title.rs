//! Conversation titles.

use tracing::warn;

use crate::prompt::CompletionRequest;
use crate::router::Completer;

pub const DEFAULT_TITLE: &str = "Nova conversa";

const MAX_TITLE_CHARS: usize = 60;

fn title_request(first_message: &str) -> CompletionRequest {
    CompletionRequest {
        system_instruction: "Resuma a mensagem do cliente em um título curto de no máximo \
cinco palavras, em português. Responda apenas com o título, sem aspas."
            .to_string(),
        response_schema: None,
        user_text: first_message.to_string(),
    }
}

/// Tidy a model-produced title: first line, no surrounding quotes or
/// trailing period, bounded length. `None` if nothing is left.
pub fn clean_title(raw: &str) -> Option<String> {
    let line = raw.lines().map(str::trim).find(|l| !l.is_empty())?;
    let t = line
        .trim_matches(|c: char| c == '"' || c == '\'' || c == '*' || c == '#')
        .trim()
        .trim_end_matches('.')
        .trim();
    if t.is_empty() {
        return None;
    }
    Some(t.chars().take(MAX_TITLE_CHARS).collect())
}

/// One-shot summarization of the first user message into a title.
/// Falls back to [`DEFAULT_TITLE`].
pub fn summarize_title<C: Completer + ?Sized>(completer: &C, first_message: &str) -> String {
    match completer.complete(&title_request(first_message)) {
        Ok(raw) => clean_title(&raw).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        Err(e) => {
            warn!(error = %e, "title summarization failed");
            DEFAULT_TITLE.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};

    struct Fixed(std::result::Result<&'static str, &'static str>);

    impl Completer for Fixed {
        fn complete(&self, request: &CompletionRequest) -> Result<String> {
            assert!(request.response_schema.is_none());
            self.0
                .map(str::to_string)
                .map_err(|e| Error::Completion(e.to_string()))
        }
    }

    #[test]
    fn test_clean_title_strips_quotes_and_period() {
        assert_eq!(
            clean_title("\n \"Consulta de entrega.\" \nmais texto"),
            Some("Consulta de entrega".to_string())
        );
        assert_eq!(clean_title("  \n  "), None);
        assert_eq!(clean_title("\"\""), None);
    }

    #[test]
    fn test_clean_title_bounds_length() {
        let long = "a".repeat(200);
        assert_eq!(clean_title(&long).unwrap().chars().count(), 60);
    }

    #[test]
    fn test_summarize_title_falls_back_on_failure() {
        assert_eq!(summarize_title(&Fixed(Err("boom")), "oi"), DEFAULT_TITLE);
        assert_eq!(summarize_title(&Fixed(Ok("   ")), "oi"), DEFAULT_TITLE);
        assert_eq!(
            summarize_title(&Fixed(Ok("Nova entrega")), "quero enviar"),
            "Nova entrega"
        );
    }
}
