use anyhow::Result;
use log::{debug, info, warn};

use crate::api::RemoteSource;
use crate::models::session::{SessionId, VotingSession};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionChange {
    /// Nothing to apply: no project is live, or the poll failed.
    Retained,
    Switched {
        from: Option<SessionId>,
        to: SessionId,
    },
    Refreshed(SessionId),
}

/// Title and id of the session on display, captured when a poll starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnownSession {
    pub title: String,
    pub session_id: SessionId,
}

/// Owns the active `VotingSession`. A different project replaces it whole;
/// the same project is merged in place so staged input survives.
#[derive(Debug, Default)]
pub struct SessionPoller {
    current: Option<VotingSession>,
    in_flight: bool,
    failures: u32,
}

impl SessionPoller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&VotingSession> {
        self.current.as_ref()
    }

    pub fn current_mut(&mut self) -> Option<&mut VotingSession> {
        self.current.as_mut()
    }

    pub fn known(&self) -> Option<KnownSession> {
        self.current.as_ref().map(|session| KnownSession {
            title: session.title.clone(),
            session_id: session.session_id,
        })
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    /// Reserves the single poll slot. Returns false while a poll is in flight.
    pub fn begin(&mut self) -> bool {
        if self.in_flight {
            debug!("Session poll still in flight, skipping tick");
            return false;
        }
        self.in_flight = true;
        true
    }

    pub fn apply(&mut self, result: Result<Option<VotingSession>>) -> SessionChange {
        self.in_flight = false;

        let fresh = match result {
            Ok(Some(fresh)) => fresh,
            Ok(None) => {
                debug!("No active project, keeping current session");
                self.failures = 0;
                return SessionChange::Retained;
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                warn!(
                    "Session poll failed ({} in a row), keeping last session: {:#}",
                    self.failures, e
                );
                return SessionChange::Retained;
            }
        };
        self.failures = 0;

        if let Some(current) = self.current.as_mut().filter(|c| c.same_session(&fresh)) {
            current.merge(fresh);
            return SessionChange::Refreshed(current.session_id);
        }

        let from = self.current.as_ref().map(|s| s.session_id);
        let to = fresh.session_id;
        info!("Switching to session {} ({:?})", to, fresh.title);
        self.current = Some(fresh);
        SessionChange::Switched { from, to }
    }
}

/// Resolves the live project and its questions as one consistent unit.
///
/// When the pointer still names the known project, its record and questions
/// are fetched side by side; otherwise the record is resolved first and its
/// own id picks the questions.
pub async fn fetch_active_session<R: RemoteSource + ?Sized>(
    remote: &R,
    known: Option<&KnownSession>,
) -> Result<Option<VotingSession>> {
    let Some(title) = remote.active_pointer().await? else {
        return Ok(None);
    };

    if let Some(known) = known.filter(|known| known.title == title) {
        let (project, questions) = tokio::try_join!(
            remote.project(&title),
            remote.questions(known.session_id)
        )?;
        if project.id == known.session_id {
            return Ok(Some(project.into_session(questions)));
        }
        debug!(
            "Title {:?} now belongs to project {} (was {})",
            title, project.id, known.session_id
        );
        let questions = remote.questions(project.id).await?;
        return Ok(Some(project.into_session(questions)));
    }

    debug!("Active pointer moved to {:?}", title);
    let project = remote.project(&title).await?;
    let questions = remote.questions(project.id).await?;
    Ok(Some(project.into_session(questions)))
}
