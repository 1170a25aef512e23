use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::models::session::{Question, QuestionId, SessionId, SessionPhase, VotingSession};

#[derive(Serialize, Deserialize, Debug)]
pub struct ActivePointerRow {
    #[serde(rename = "project_title")]
    pub title: Option<String>,
}

impl ActivePointerRow {
    /// The live project's title, if one is set.
    pub fn into_title(self) -> Option<String> {
        self.title
            .map(|title| title.trim().to_owned())
            .filter(|title| !title.is_empty())
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectStatus {
    #[serde(rename = "status_projs")]
    pub label: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ProjectRow {
    #[serde(rename = "id_projects")]
    pub id: Option<i64>,
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(rename = "image_url", default)]
    pub image_url: Option<String>,
    #[serde(rename = "ref_id_status_projs", default)]
    pub status_ref: Option<i64>,
    #[serde(rename = "status_projs", default)]
    pub status: Option<ProjectStatus>,
}

/// Validated project record, without its questions yet.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub id: SessionId,
    pub title: String,
    pub phase: SessionPhase,
    pub text: String,
    pub image_ref: Option<String>,
}

impl Project {
    pub fn into_session(self, questions: Vec<Question>) -> VotingSession {
        VotingSession {
            session_id: self.id,
            title: self.title,
            phase: self.phase,
            text: self.text,
            image_ref: self.image_ref,
            questions,
        }
    }
}

impl TryFrom<ProjectRow> for Project {
    type Error = SchemaError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        let id = row.id.ok_or(SchemaError::MissingField("id_projects"))?;
        let title = row
            .title
            .filter(|title| !title.trim().is_empty())
            .ok_or(SchemaError::MissingField("title"))?;
        let label = row.status.and_then(|status| status.label);
        let phase = resolve_phase(label.as_deref(), row.status_ref);

        Ok(Project {
            id: SessionId(id),
            title,
            phase,
            text: row.text.unwrap_or_default(),
            image_ref: row.image_url.filter(|url| !url.is_empty()),
        })
    }
}

/// Reads the project phase from its status label, falling back to the numeric
/// status reference. Anything unrecognised is treated as non-voting.
pub fn resolve_phase(label: Option<&str>, status_ref: Option<i64>) -> SessionPhase {
    if let Some(label) = label {
        let normalized: String = label
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "presenting" => return SessionPhase::Presenting,
            "voting" => return SessionPhase::Voting,
            "votingclosed" => return SessionPhase::VotingClosed,
            _ => warn!("Unrecognised project status label {:?}", label),
        }
    }

    match status_ref {
        Some(0) => SessionPhase::Presenting,
        Some(1) => SessionPhase::Voting,
        Some(2) => SessionPhase::VotingClosed,
        other => {
            warn!("No usable project status (ref {:?}), showing as presenting", other);
            SessionPhase::Presenting
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QuestionText {
    pub text: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QuestionRow {
    #[serde(rename = "ref_id_questions")]
    pub question_id: Option<i64>,
    #[serde(rename = "votes_a", default)]
    pub votes_positive: Option<i64>,
    #[serde(rename = "votes_b", default)]
    pub votes_negative: Option<i64>,
    #[serde(rename = "questions", default)]
    pub question: Option<QuestionText>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = SchemaError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question_id = row
            .question_id
            .ok_or(SchemaError::MissingField("ref_id_questions"))?;

        Ok(Question {
            question_id: QuestionId(question_id),
            text: row.question.and_then(|q| q.text).unwrap_or_default(),
            votes_positive: counter("votes_a", row.votes_positive)?,
            votes_negative: counter("votes_b", row.votes_negative)?,
        })
    }
}

fn counter(field: &'static str, value: Option<i64>) -> Result<u32, SchemaError> {
    let value = value.unwrap_or(0);
    u32::try_from(value).map_err(|_| SchemaError::InvalidValue {
        field,
        value: value.to_string(),
    })
}

/// Validates raw question rows one by one. Malformed rows are dropped, the
/// survivors come back ordered by question id with duplicates removed.
pub fn parse_questions(rows: Vec<serde_json::Value>) -> Vec<Question> {
    let mut questions: Vec<Question> = rows
        .into_iter()
        .filter_map(|value| {
            let parsed = serde_json::from_value::<QuestionRow>(value)
                .map_err(|e| SchemaError::Malformed(e.to_string()))
                .and_then(Question::try_from);
            match parsed {
                Ok(question) => Some(question),
                Err(e) => {
                    warn!("Skipping question row: {}", e);
                    None
                }
            }
        })
        .collect();

    questions.sort_by_key(|q| q.question_id);
    questions.dedup_by_key(|q| q.question_id);
    questions
}
