use std::collections::{BTreeMap, HashSet};

use log::{debug, error, info, warn};

use crate::error::VoteError;
use crate::models::session::{Choice, QuestionId, SessionId, SessionPhase, VotingSession};
use crate::store::{marker_key, KvStore};

/// A vote admitted for submission. Carries the identifiers it was issued
/// against, independent of whatever session is active when it settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteTicket {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub choice: Choice,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VoteOutcome {
    Recorded,
    Failed(String),
}

/// Guards the non-idempotent vote mutation. A pair is checked and marked
/// in flight before the remote call; its marker is written only on success.
#[derive(Debug, Default)]
pub struct VoteLedger {
    in_flight: HashSet<(SessionId, QuestionId)>,
    /// Successes this run, in case the store could not persist a marker.
    recorded: HashSet<(SessionId, QuestionId)>,
    ballot_session: Option<SessionId>,
    staged: BTreeMap<QuestionId, Choice>,
    notice: Option<String>,
}

impl VoteLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(
        &self,
        store: &impl KvStore,
        session_id: SessionId,
        question_id: QuestionId,
    ) -> bool {
        self.recorded.contains(&(session_id, question_id))
            || store.get(&marker_key(session_id, question_id)).is_some()
    }

    pub fn is_pending(&self, session_id: SessionId, question_id: QuestionId) -> bool {
        self.in_flight.contains(&(session_id, question_id))
    }

    pub fn can_vote(
        &self,
        store: &impl KvStore,
        session: &VotingSession,
        question_id: QuestionId,
        window_open: bool,
    ) -> bool {
        session.phase == SessionPhase::Voting
            && window_open
            && session.has_question(question_id)
            && !self.has_voted(store, session.session_id, question_id)
            && !self.is_pending(session.session_id, question_id)
    }

    /// Checks a vote and, if it may go out, marks it in flight. Already voted
    /// or already in flight yields `Ok(None)` without complaint.
    pub fn admit(
        &mut self,
        store: &impl KvStore,
        session: &VotingSession,
        question_id: QuestionId,
        choice: Choice,
        window_open: bool,
    ) -> Result<Option<VoteTicket>, VoteError> {
        let session_id = session.session_id;
        if self.has_voted(store, session_id, question_id) {
            debug!("Already voted on {}/{}, ignoring", session_id, question_id);
            return Ok(None);
        }
        if self.is_pending(session_id, question_id) {
            debug!("Vote on {}/{} already in flight", session_id, question_id);
            return Ok(None);
        }
        if !session.has_question(question_id) {
            return Err(VoteError::UnknownQuestion(question_id));
        }
        if session.phase != SessionPhase::Voting || !window_open {
            return Err(VoteError::Closed);
        }

        self.in_flight.insert((session_id, question_id));
        Ok(Some(VoteTicket {
            session_id,
            question_id,
            choice,
        }))
    }

    /// Admits every staged pick of `session`. Picks that cannot go out stay staged.
    pub fn admit_staged(
        &mut self,
        store: &impl KvStore,
        session: &VotingSession,
        window_open: bool,
    ) -> Vec<VoteTicket> {
        if self.ballot_session != Some(session.session_id) {
            return Vec::new();
        }
        let picks: Vec<(QuestionId, Choice)> =
            self.staged.iter().map(|(q, c)| (*q, *c)).collect();

        let mut tickets = Vec::with_capacity(picks.len());
        for (question_id, choice) in picks {
            match self.admit(store, session, question_id, choice, window_open) {
                Ok(Some(ticket)) => tickets.push(ticket),
                Ok(None) => {}
                Err(e) => warn!("Staged vote on question {} not sent: {}", question_id, e),
            }
        }
        tickets
    }

    /// Applies the remote result of an admitted vote. `current` is the session
    /// on display now, which may no longer be the ticket's.
    pub fn settle(
        &mut self,
        store: &mut impl KvStore,
        ticket: VoteTicket,
        result: anyhow::Result<()>,
        current: Option<&mut VotingSession>,
    ) -> VoteOutcome {
        let pair = (ticket.session_id, ticket.question_id);
        self.in_flight.remove(&pair);
        let current = current.filter(|session| session.session_id == ticket.session_id);

        match result {
            Ok(()) => {
                self.recorded.insert(pair);
                if let Err(e) = store.set(&marker_key(ticket.session_id, ticket.question_id), "true") {
                    error!(
                        "Vote on {}/{} succeeded but its marker was not persisted: {}",
                        ticket.session_id, ticket.question_id, e
                    );
                }
                info!(
                    "Voted {} on question {} of session {}",
                    ticket.choice.as_wire(),
                    ticket.question_id,
                    ticket.session_id
                );

                if self.ballot_session == Some(ticket.session_id) {
                    self.staged.remove(&ticket.question_id);
                }
                match current {
                    Some(session) => {
                        session.apply_optimistic(ticket.question_id, ticket.choice);
                        self.notice = None;
                    }
                    None => debug!("Session {} no longer shown, skipping local tally", ticket.session_id),
                }
                VoteOutcome::Recorded
            }
            Err(e) => {
                warn!(
                    "Vote on {}/{} failed: {}",
                    ticket.session_id, ticket.question_id, e
                );
                let message = VoteError::Mutation(e.to_string()).to_string();
                if current.is_some() {
                    self.notice = Some(message.clone());
                }
                VoteOutcome::Failed(message)
            }
        }
    }

    /// Stages a pick for later submission, replacing an earlier pick for the
    /// same question. Refused when the question cannot be voted on.
    pub fn stage(
        &mut self,
        store: &impl KvStore,
        session: &VotingSession,
        question_id: QuestionId,
        choice: Choice,
        window_open: bool,
    ) -> bool {
        if self.ballot_session != Some(session.session_id) {
            self.reset_ballot(session.session_id);
        }
        if !self.can_vote(store, session, question_id, window_open) {
            debug!("Not staging question {}: voting unavailable", question_id);
            return false;
        }
        self.staged.insert(question_id, choice);
        true
    }

    pub fn staged(&self, session_id: SessionId, question_id: QuestionId) -> Option<Choice> {
        if self.ballot_session == Some(session_id) {
            self.staged.get(&question_id).copied()
        } else {
            None
        }
    }

    /// Starts an empty ballot for a newly shown session.
    pub fn reset_ballot(&mut self, session_id: SessionId) {
        self.ballot_session = Some(session_id);
        self.staged.clear();
        self.notice = None;
    }

    /// Drops picks for questions the refreshed session no longer has.
    pub fn prune_ballot(&mut self, session: &VotingSession) {
        if self.ballot_session == Some(session.session_id) {
            self.staged.retain(|question_id, _| session.has_question(*question_id));
        }
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }
}
