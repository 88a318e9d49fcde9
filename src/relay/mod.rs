pub mod prompt;
pub mod sanitizer;
pub mod verifier;

use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use crate::assistant::{AssistantBackend, AssistantError, RunStatus, ThreadId};
use crate::instrumentation::{AttemptLog, TurnLog, TurnLogger};

/// Position in the bounded retry loop. A turn never issues more runs than
/// there are variants here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attempt {
    Initial,
    Strict,
}

impl Attempt {
    pub fn number(self) -> u32 {
        match self {
            Self::Initial => 1,
            Self::Strict => 2,
        }
    }

    fn instructions(self) -> Option<&'static str> {
        match self {
            Self::Initial => None,
            Self::Strict => Some(prompt::STRICT_INSTRUCTIONS),
        }
    }

    fn next(self) -> Option<Self> {
        match self {
            Self::Initial => Some(Self::Strict),
            Self::Strict => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    #[error("run {run_id} ended with status {status}")]
    RunNotCompleted { run_id: String, status: RunStatus },

    #[error(transparent)]
    Assistant(#[from] AssistantError),
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub reply: String,
    pub thread_id: ThreadId,
    pub log: TurnLog,
}

pub struct Relay {
    backend: Arc<dyn AssistantBackend>,
    logger: Option<TurnLogger>,
}

impl Relay {
    pub fn new(backend: Arc<dyn AssistantBackend>, logger: Option<TurnLogger>) -> Self {
        Self { backend, logger }
    }

    pub async fn handle_turn(
        &self,
        message: &str,
        thread: Option<ThreadId>,
    ) -> Result<TurnOutcome, RelayError> {
        let turn_start = Instant::now();

        let enriched = prompt::enrich(message);
        let thread = self.post_message(thread, &enriched).await?;

        let mut attempts: Vec<AttemptLog> = Vec::new();
        let mut attempt = Attempt::Initial;

        let run = loop {
            let run_start = Instant::now();
            let run = self
                .backend
                .run_to_completion(&thread, attempt.instructions())
                .await?;

            if run.status != RunStatus::Completed {
                warn!(
                    thread_id = %thread,
                    run_id = %run.id,
                    status = %run.status,
                    attempt = attempt.number(),
                    "run did not complete"
                );
                return Err(RelayError::RunNotCompleted {
                    run_id: run.id,
                    status: run.status,
                });
            }

            let steps = self.backend.run_steps(&thread, &run.id).await?;
            let searched = verifier::used_file_search(&steps);

            attempts.push(AttemptLog {
                attempt: attempt.number(),
                run_id: run.id.clone(),
                status: run.status.to_string(),
                file_search_used: searched,
                latency_ms: run_start.elapsed().as_millis() as u64,
            });

            if searched {
                break run;
            }

            match attempt.next() {
                Some(next) => {
                    warn!(
                        thread_id = %thread,
                        run_id = %run.id,
                        "answer given without file_search, re-running with strict instructions"
                    );
                    attempt = next;
                }
                None => {
                    warn!(
                        thread_id = %thread,
                        run_id = %run.id,
                        "strict run skipped file_search too, accepting its answer"
                    );
                    break run;
                }
            }
        };

        let raw = self.backend.latest_reply(&thread, &run.id).await?;
        let reply = sanitizer::finalize_reply(raw.as_deref());

        let log = TurnLog {
            turn_id: uuid::Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            thread_id: thread.to_string(),
            message: message.to_string(),
            retried: attempts.len() > 1,
            attempts,
            fallback_used: reply.is_fallback(),
            total_latency_ms: turn_start.elapsed().as_millis() as u64,
        };

        if let Some(logger) = &self.logger {
            if let Err(e) = logger.record(log.clone()).await {
                warn!(error = %e, "failed to write turn log");
            }
        }

        info!(thread_id = %thread, "{}", log.summary());

        Ok(TurnOutcome {
            reply: reply.text().to_string(),
            thread_id: thread,
            log,
        })
    }

    /// Adds the message to the client's thread, or to a new one when the
    /// client has none or the service no longer knows the supplied id.
    async fn post_message(
        &self,
        thread: Option<ThreadId>,
        content: &str,
    ) -> Result<ThreadId, RelayError> {
        let Some(thread) = thread else {
            return self.start_thread(content).await;
        };

        match self.backend.add_user_message(&thread, content).await {
            Ok(()) => Ok(thread),
            Err(AssistantError::NotFound(body)) => {
                warn!(thread_id = %thread, %body, "thread unknown to the service, starting a new one");
                self.start_thread(content).await
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn start_thread(&self, content: &str) -> Result<ThreadId, RelayError> {
        let thread = self.backend.create_thread().await?;
        self.backend.add_user_message(&thread, content).await?;
        Ok(thread)
    }
}
