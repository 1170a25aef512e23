use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier of the project backing a voting session.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Presenting,
    Voting,
    VotingClosed,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Positive,
    Negative,
}

impl Choice {
    /// Encoding expected by the remote vote mutation.
    pub fn as_wire(self) -> &'static str {
        match self {
            Choice::Positive => "positive",
            Choice::Negative => "negative",
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Question {
    pub question_id: QuestionId,
    pub text: String,
    pub votes_positive: u32,
    pub votes_negative: u32,
}

impl Question {
    /// Positive/negative share in whole percent. An empty tally reads 0/100.
    pub fn split_percent(&self) -> (u32, u32) {
        let total = u64::from(self.votes_positive) + u64::from(self.votes_negative);
        if total == 0 {
            return (0, 100);
        }
        let positive = ((u64::from(self.votes_positive) * 200 + total) / (total * 2)) as u32;
        (positive, 100 - positive)
    }

    fn count(&mut self, choice: Choice) {
        match choice {
            Choice::Positive => self.votes_positive = self.votes_positive.saturating_add(1),
            Choice::Negative => self.votes_negative = self.votes_negative.saturating_add(1),
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VotingSession {
    pub session_id: SessionId,
    pub title: String,
    pub phase: SessionPhase,
    pub text: String,
    pub image_ref: Option<String>,
    /// Ordered by question id ascending.
    pub questions: Vec<Question>,
}

impl VotingSession {
    pub fn question(&self, question_id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.question_id == question_id)
    }

    pub fn has_question(&self, question_id: QuestionId) -> bool {
        self.question(question_id).is_some()
    }

    /// True when `other` describes the same project, so it may be merged in place.
    pub fn same_session(&self, other: &VotingSession) -> bool {
        self.session_id == other.session_id && self.title == other.title
    }

    /// Folds a fresh fetch of the same project into this one: phase, tallies and
    /// question set follow the remote, the identity stays.
    pub fn merge(&mut self, fresh: VotingSession) {
        self.phase = fresh.phase;
        self.text = fresh.text;
        self.image_ref = fresh.image_ref;
        self.questions = fresh.questions;
    }

    /// Local +1 shown until the next authoritative poll overwrites it.
    pub fn apply_optimistic(&mut self, question_id: QuestionId, choice: Choice) -> bool {
        match self.questions.iter_mut().find(|q| q.question_id == question_id) {
            Some(question) => {
                question.count(choice);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: i64, positive: u32, negative: u32) -> Question {
        Question {
            question_id: QuestionId(id),
            text: format!("Q{id}"),
            votes_positive: positive,
            votes_negative: negative,
        }
    }

    #[test]
    fn split_percent_rounds_positive_share() {
        assert_eq!(question(1, 1, 2).split_percent(), (33, 67));
        assert_eq!(question(1, 2, 1).split_percent(), (67, 33));
        assert_eq!(question(1, 1, 1).split_percent(), (50, 50));
        assert_eq!(question(1, 5, 0).split_percent(), (100, 0));
    }

    #[test]
    fn split_percent_of_empty_tally() {
        assert_eq!(question(1, 0, 0).split_percent(), (0, 100));
    }

    #[test]
    fn optimistic_increment_targets_one_question() {
        let mut session = VotingSession {
            session_id: SessionId(3),
            title: "Topic".to_owned(),
            phase: SessionPhase::Voting,
            text: String::new(),
            image_ref: None,
            questions: vec![question(1, 0, 0), question(2, 4, 4)],
        };

        assert!(session.apply_optimistic(QuestionId(2), Choice::Negative));
        assert!(!session.apply_optimistic(QuestionId(9), Choice::Positive));
        assert_eq!(session.questions[0].votes_negative, 0);
        assert_eq!(session.questions[1].votes_negative, 5);
    }
}
