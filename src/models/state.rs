use crate::models::phase::AppPhase;
use crate::models::session::{Choice, Question, VotingSession};

/// Everything the render layer needs for one frame. Published as a whole, so a
/// title and its questions always come from the same session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TerminalView {
    pub app_phase: AppPhase,
    pub session: Option<SessionView>,
    /// Latest vote failure, shown until the next success or session switch.
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub session: VotingSession,
    /// Whole seconds left while the vote window is armed.
    pub remaining_secs: Option<u64>,
    pub window_open: bool,
    pub questions: Vec<QuestionView>,
}

impl SessionView {
    pub fn has_staged(&self) -> bool {
        self.questions.iter().any(|q| q.staged.is_some())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub question: Question,
    pub voted: bool,
    pub pending: bool,
    pub can_vote: bool,
    pub staged: Option<Choice>,
}
