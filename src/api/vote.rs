use crate::api::authorized;
use crate::models::session::{Choice, QuestionId, SessionId};
use anyhow::Result;
use log::{error, info};
use reqwest::Client;
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct VoteRequest {
    pub project_id: i64,
    pub question_id: i64,
    pub vote_type: &'static str,
}

impl VoteRequest {
    pub fn new(project_id: SessionId, question_id: QuestionId, choice: Choice) -> Self {
        Self {
            project_id: project_id.0,
            question_id: question_id.0,
            vote_type: choice.as_wire(),
        }
    }
}

/// Not idempotent: every successful call counts one vote remotely.
pub async fn submit_vote(
    client: &Client,
    base_url: &str,
    key: &str,
    project_id: SessionId,
    question_id: QuestionId,
    choice: Choice,
) -> Result<(), anyhow::Error> {
    let url = format!("{}/rest/v1/rpc/vote_on_question", base_url);
    let request = VoteRequest::new(project_id, question_id, choice);
    let resp = authorized(client.post(&url), key)
        .json(&request)
        .send()
        .await?;

    if resp.status().is_success() {
        info!("Vote recorded: {:?}", request);
        Ok(())
    } else {
        let status = resp.status();
        let body = resp.text().await.unwrap_or_default();
        error!("Vote rejected ({}): {}", status, body);
        Err(anyhow::anyhow!("Vote rejected by server ({})", status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_payload_matches_rpc_arguments() {
        let positive = VoteRequest::new(SessionId(1), QuestionId(7), Choice::Positive);
        assert_eq!(
            serde_json::to_string(&positive).unwrap(),
            r#"{"project_id":1,"question_id":7,"vote_type":"positive"}"#
        );

        let negative = VoteRequest::new(SessionId(2), QuestionId(3), Choice::Negative);
        assert_eq!(
            serde_json::to_value(&negative).unwrap(),
            serde_json::json!({ "project_id": 2, "question_id": 3, "vote_type": "negative" })
        );
    }
}
