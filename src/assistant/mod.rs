pub mod client;
pub mod types;

use async_trait::async_trait;

pub use client::AssistantsClient;
pub use types::{Run, RunStatus, RunStep, StepDetails, ThreadId, ToolKind};

#[derive(Debug, thiserror::Error)]
pub enum AssistantError {
    #[error("assistant API request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("assistant API resource not found: {0}")]
    NotFound(String),

    #[error("assistant API error ({status}): {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Operations the relay needs from the hosted assistant service.
#[async_trait]
pub trait AssistantBackend: Send + Sync {
    async fn create_thread(&self) -> Result<ThreadId, AssistantError>;

    async fn add_user_message(&self, thread: &ThreadId, content: &str)
        -> Result<(), AssistantError>;

    /// Starts a run on the thread and waits until it leaves the pending
    /// states. `additional_instructions` is appended to the assistant's own
    /// instructions for this run only.
    async fn run_to_completion(
        &self,
        thread: &ThreadId,
        additional_instructions: Option<&str>,
    ) -> Result<Run, AssistantError>;

    async fn run_steps(&self, thread: &ThreadId, run_id: &str)
        -> Result<Vec<RunStep>, AssistantError>;

    /// Text of the newest message produced by the given run.
    async fn latest_reply(
        &self,
        thread: &ThreadId,
        run_id: &str,
    ) -> Result<Option<String>, AssistantError>;
}
