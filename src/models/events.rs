use crate::models::session::{Choice, QuestionId, SessionId};

/// Requests from the render layer to the engine. Every vote-related command
/// names the session it was issued against; the engine drops it if that
/// session is no longer the active one.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Select {
        session_id: SessionId,
        question_id: QuestionId,
        choice: Choice,
    },
    Submit {
        session_id: SessionId,
        question_id: QuestionId,
        choice: Choice,
    },
    SubmitStaged {
        session_id: SessionId,
    },
}
