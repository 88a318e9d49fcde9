use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::debug;

use super::types::{ListResponse, Run, RunStep, Thread, ThreadId, ThreadMessage};
use super::{AssistantBackend, AssistantError};
use crate::config::Config;

/// Client for the OpenAI Assistants v2 REST API.
#[derive(Debug, Clone)]
pub struct AssistantsClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    assistant_id: String,
    temperature: f32,
    top_p: f32,
    poll_interval: Duration,
}

#[derive(Debug, Serialize)]
struct NewMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct NewRun<'a> {
    assistant_id: &'a str,
    temperature: f32,
    top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    additional_instructions: Option<&'a str>,
}

impl AssistantsClient {
    pub fn new(api_key: &str, assistant_id: &str, config: &Config) -> Result<Self, AssistantError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.remote_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: api_key.to_string(),
            base_url: config.openai_base_url.clone(),
            assistant_id: assistant_id.to_string(),
            temperature: config.temperature,
            top_p: config.top_p,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, AssistantError> {
        let response = request
            .header("Authorization", format!("Bearer {}", &self.api_key))
            .header("OpenAI-Beta", "assistants=v2")
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::NotFound(body));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::Api { status, body });
        }

        Ok(response.json().await?)
    }

    async fn get_run(&self, thread: &ThreadId, run_id: &str) -> Result<Run, AssistantError> {
        let path = format!("/threads/{}/runs/{}", thread, run_id);
        self.send(self.client.get(self.url(&path))).await
    }
}

#[async_trait]
impl AssistantBackend for AssistantsClient {
    async fn create_thread(&self) -> Result<ThreadId, AssistantError> {
        let thread: Thread = self
            .send(
                self.client
                    .post(self.url("/threads"))
                    .json(&serde_json::json!({})),
            )
            .await?;
        debug!(thread_id = %thread.id, "created thread");
        Ok(thread.id)
    }

    async fn add_user_message(
        &self,
        thread: &ThreadId,
        content: &str,
    ) -> Result<(), AssistantError> {
        let path = format!("/threads/{}/messages", thread);
        let _: serde_json::Value = self
            .send(self.client.post(self.url(&path)).json(&NewMessage {
                role: "user",
                content,
            }))
            .await?;
        Ok(())
    }

    async fn run_to_completion(
        &self,
        thread: &ThreadId,
        additional_instructions: Option<&str>,
    ) -> Result<Run, AssistantError> {
        let path = format!("/threads/{}/runs", thread);
        let mut run: Run = self
            .send(self.client.post(self.url(&path)).json(&NewRun {
                assistant_id: &self.assistant_id,
                temperature: self.temperature,
                top_p: self.top_p,
                additional_instructions,
            }))
            .await?;

        while run.status.is_pending() {
            tokio::time::sleep(self.poll_interval).await;
            run = self.get_run(thread, &run.id).await?;
        }

        debug!(thread_id = %thread, run_id = %run.id, status = %run.status, "run settled");
        Ok(run)
    }

    async fn run_steps(
        &self,
        thread: &ThreadId,
        run_id: &str,
    ) -> Result<Vec<RunStep>, AssistantError> {
        let path = format!("/threads/{}/runs/{}/steps", thread, run_id);
        let steps: ListResponse<RunStep> = self
            .send(self.client.get(self.url(&path)).query(&[("limit", "100")]))
            .await?;
        Ok(steps.data)
    }

    async fn latest_reply(
        &self,
        thread: &ThreadId,
        run_id: &str,
    ) -> Result<Option<String>, AssistantError> {
        let path = format!("/threads/{}/messages", thread);
        let messages: ListResponse<ThreadMessage> = self
            .send(self.client.get(self.url(&path)).query(&[
                ("order", "desc"),
                ("limit", "1"),
                ("run_id", run_id),
            ]))
            .await?;

        Ok(messages
            .data
            .first()
            .and_then(|m| m.first_text())
            .map(|s| s.to_string()))
    }
}
