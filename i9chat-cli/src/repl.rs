use anyhow::Result;
use i9chat_core::replies;
use std::io::{BufRead, Write};

use crate::service::ChatService;

const QUIT: &[&str] = &["/sair", "/quit", "/exit"];

/// Line-oriented chat on stdin/stdout, for pipes and dumb terminals.
pub fn run_repl(svc: &mut ChatService) -> Result<()> {
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    repl_loop(svc, stdin.lock(), stdout.lock())
}

fn repl_loop<R: BufRead, W: Write>(svc: &mut ChatService, input: R, mut out: W) -> Result<()> {
    if let Some(c) = svc.conversation() {
        writeln!(out, "# {} ({})", c.title, c.id)?;
        for m in &c.messages {
            writeln!(out, "{}: {}", label(m.role), m.content)?;
        }
    } else {
        writeln!(out, "Envie uma mensagem para começar a conversa (/sair para encerrar)")?;
    }

    for line in input.lines() {
        let line = line?;
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if QUIT.contains(&text) {
            break;
        }

        let outcome = match svc.submit(text) {
            Ok(o) => o,
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                writeln!(out, "i9: {}", replies::APOLOGY)?;
                continue;
            }
        };
        match &outcome.reply {
            Some(reply) => writeln!(out, "i9: {}", reply.content)?,
            None => writeln!(out, "({})", replies::BOT_PAUSED_NOTICE)?,
        }
        if outcome.first_message {
            if let Some(title) = svc.refresh_title()? {
                writeln!(out, "# {title}")?;
            }
        }
        out.flush()?;
    }
    Ok(())
}

fn label(role: i9chat_core::Role) -> &'static str {
    match role {
        i9chat_core::Role::User => "você",
        i9chat_core::Role::Assistant => "i9",
        i9chat_core::Role::System => "sistema",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use i9chat_core::{CompletionRequest, Completer};
    use i9chat_store::DocumentStore;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Echo;

    impl Completer for Echo {
        fn complete(&self, request: &CompletionRequest) -> i9chat_core::Result<String> {
            if request.expects_json() {
                Ok(format!(
                    r#"{{"event":{{"code":"general_response","correlation":null}},"message":"eco: {}"}}"#,
                    request.user_text
                ))
            } else {
                Ok("Conversa de teste".to_string())
            }
        }
    }

    #[test]
    fn test_repl_answers_until_quit() {
        let dir = tempfile::tempdir().unwrap();
        let store = DocumentStore::open(dir.path()).unwrap();
        let mut svc = ChatService::new(store, "demo", Box::new(Echo), StdRng::seed_from_u64(3));

        let input = b"oi\n\n  tudo bem\n/sair\nnunca lido\n";
        let mut out = Vec::new();
        repl_loop(&mut svc, &input[..], &mut out).unwrap();

        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("i9: eco: oi"));
        assert!(out.contains("# Conversa de teste"));
        assert!(out.contains("i9: eco: tudo bem"));
        assert!(!out.contains("nunca lido"));
        assert_eq!(svc.conversation().unwrap().messages.len(), 4);
    }
}
