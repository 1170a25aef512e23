use thiserror::Error;

use crate::models::session::QuestionId;

#[derive(Error, Debug)]
pub enum VoteError {
    #[error("Voting is closed for this question")]
    Closed,

    #[error("The event is not live")]
    NotLive,

    #[error("Question {0} is not part of the active session")]
    UnknownQuestion(QuestionId),

    #[error("Vote submission failed: {0}")]
    Mutation(String),
}

#[derive(Error, Debug, PartialEq)]
pub enum SchemaError {
    #[error("Missing field `{0}`")]
    MissingField(&'static str),

    #[error("Invalid value for `{field}`: {value}")]
    InvalidValue { field: &'static str, value: String },

    #[error("Malformed row: {0}")]
    Malformed(String),
}
