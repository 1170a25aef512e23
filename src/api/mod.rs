pub mod active;
pub mod phase;
pub mod project;
pub mod vote;

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};

use crate::config::Config;
use crate::models::phase::AppPhase;
use crate::models::project::Project;
use crate::models::session::{Choice, Question, QuestionId, SessionId};

/// The remote source of truth. Reads are polled; `submit_vote` is not
/// idempotent and counts every call it receives.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Title of the live project, `None` when nothing is live.
    async fn active_pointer(&self) -> Result<Option<String>>;
    async fn project(&self, title: &str) -> Result<Project>;
    /// Ordered by question id ascending.
    async fn questions(&self, project_id: SessionId) -> Result<Vec<Question>>;
    async fn global_phase(&self) -> Result<AppPhase>;
    async fn submit_vote(
        &self,
        project_id: SessionId,
        question_id: QuestionId,
        choice: Choice,
    ) -> Result<()>;
}

/// PostgREST-style backend.
#[derive(Clone)]
pub struct RestClient {
    client: Client,
    base_url: String,
    key: String,
}

impl RestClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timing.request_timeout)
            .build()?;
        Ok(Self {
            client,
            base_url: config.remote_url.clone(),
            key: config.remote_key.clone(),
        })
    }
}

#[async_trait]
impl RemoteSource for RestClient {
    async fn active_pointer(&self) -> Result<Option<String>> {
        active::get_active_pointer(&self.client, &self.base_url, &self.key).await
    }

    async fn project(&self, title: &str) -> Result<Project> {
        project::get_project(&self.client, &self.base_url, &self.key, title).await
    }

    async fn questions(&self, project_id: SessionId) -> Result<Vec<Question>> {
        project::get_questions(&self.client, &self.base_url, &self.key, project_id).await
    }

    async fn global_phase(&self) -> Result<AppPhase> {
        phase::get_global_phase(&self.client, &self.base_url, &self.key).await
    }

    async fn submit_vote(
        &self,
        project_id: SessionId,
        question_id: QuestionId,
        choice: Choice,
    ) -> Result<()> {
        vote::submit_vote(
            &self.client,
            &self.base_url,
            &self.key,
            project_id,
            question_id,
            choice,
        )
        .await
    }
}

pub(crate) fn authorized(builder: RequestBuilder, key: &str) -> RequestBuilder {
    builder
        .header("apikey", key)
        .header("Authorization", format!("Bearer {}", key))
}
