use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};
use tokio::sync::mpsc;

use crate::service::{ChatService, SubmitOutcome};

#[derive(Debug, Clone)]
pub enum TurnRequest {
    Submit { request_id: u64, text: String },
    /// Forget the current conversation.
    Reset,
}

#[derive(Debug, Clone)]
pub enum TurnEvent {
    Started { request_id: u64 },
    Reply { request_id: u64, outcome: SubmitOutcome },
    Title { title: String },
    Error { request_id: u64, message: String },
}

fn with_service<T>(svc: &Arc<Mutex<ChatService>>, f: impl FnOnce(&mut ChatService) -> Result<T>) -> Result<T> {
    let mut guard = svc.lock().map_err(|_| anyhow!("chat service lock poisoned"))?;
    f(&mut guard)
}

/// Runs turns one at a time. The service does blocking I/O (completion
/// call, document writes), so each turn goes to the blocking pool.
pub async fn run_worker(
    svc: Arc<Mutex<ChatService>>,
    mut rx: mpsc::UnboundedReceiver<TurnRequest>,
    tx: std::sync::mpsc::Sender<TurnEvent>,
) {
    while let Some(req) = rx.recv().await {
        let (request_id, text) = match req {
            TurnRequest::Submit { request_id, text } => (request_id, text),
            TurnRequest::Reset => {
                let svc2 = svc.clone();
                let res = tokio::task::spawn_blocking(move || {
                    with_service(&svc2, |s| {
                        s.reset();
                        Ok(())
                    })
                })
                .await;
                match res {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "reset failed"),
                    Err(e) => tracing::error!(error = %e, "reset task failed"),
                }
                continue;
            }
        };

        let _ = tx.send(TurnEvent::Started { request_id });

        let svc2 = svc.clone();
        let res = tokio::task::spawn_blocking(move || with_service(&svc2, |s| s.submit(&text))).await;

        let outcome = match res {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(e)) => {
                let _ = tx.send(TurnEvent::Error {
                    request_id,
                    message: format!("{e:#}"),
                });
                continue;
            }
            Err(e) => {
                let _ = tx.send(TurnEvent::Error {
                    request_id,
                    message: format!("turn task failed: {e}"),
                });
                continue;
            }
        };

        let first_message = outcome.first_message;
        let _ = tx.send(TurnEvent::Reply { request_id, outcome });

        if first_message {
            let svc2 = svc.clone();
            let res = tokio::task::spawn_blocking(move || with_service(&svc2, |s| s.refresh_title())).await;
            match res {
                Ok(Ok(Some(title))) => {
                    let _ = tx.send(TurnEvent::Title { title });
                }
                Ok(Ok(None)) => {}
                Ok(Err(e)) => tracing::warn!(error = %e, "title refresh failed"),
                Err(e) => tracing::warn!(error = %e, "title task failed"),
            }
        }
    }
}
