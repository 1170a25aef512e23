#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

pub use vote_terminal::api::RemoteSource;
pub use vote_terminal::config::Timing;
pub use vote_terminal::engine::countdown::Clock;
pub use vote_terminal::engine::Terminal;
pub use vote_terminal::models::phase::AppPhase;
pub use vote_terminal::models::project::Project;
pub use vote_terminal::models::session::{Choice, Question, QuestionId, SessionId, SessionPhase};
pub use vote_terminal::store::{KvStore, MemoryStore};

pub const T0: i64 = 1_700_000_000_000;

#[derive(Default)]
pub struct FakeState {
    pub pointer: Option<String>,
    pub projects: Vec<Project>,
    pub questions: HashMap<SessionId, Vec<Question>>,
    pub phase: AppPhase,
    pub fail_reads: bool,
    pub fail_votes: bool,
    pub failing_questions: HashSet<QuestionId>,
    /// Moves the pointer right after it has been read, before the project is fetched.
    pub pointer_after_read: Option<String>,
    pub vote_delay: Option<Duration>,
    pub vote_calls: Vec<(SessionId, QuestionId, Choice)>,
}

/// In-memory remote. Counts every vote call it receives, like the real one.
#[derive(Default)]
pub struct FakeRemote {
    state: Mutex<FakeState>,
}

impl FakeRemote {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with<T>(&self, f: impl FnOnce(&mut FakeState) -> T) -> T {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    /// Adds a project whose question texts are prefixed with its title.
    pub fn add_project(&self, id: i64, title: &str, phase: SessionPhase, question_ids: &[i64]) {
        let questions = question_ids
            .iter()
            .map(|q| Question {
                question_id: QuestionId(*q),
                text: format!("{title}: question {q}"),
                votes_positive: 0,
                votes_negative: 0,
            })
            .collect();
        self.with(|state| {
            state.projects.retain(|p| p.id != SessionId(id));
            state.projects.push(Project {
                id: SessionId(id),
                title: title.to_owned(),
                phase,
                text: format!("About {title}"),
                image_ref: None,
            });
            state.questions.insert(SessionId(id), questions);
        });
    }

    pub fn go_live(&self, title: &str) {
        self.with(|state| state.pointer = Some(title.to_owned()));
    }

    pub fn set_phase(&self, id: i64, phase: SessionPhase) {
        self.with(|state| {
            if let Some(project) = state.projects.iter_mut().find(|p| p.id == SessionId(id)) {
                project.phase = phase;
            }
        });
    }

    pub fn vote_calls(&self) -> usize {
        self.with(|state| state.vote_calls.len())
    }
}

#[async_trait]
impl RemoteSource for FakeRemote {
    async fn active_pointer(&self) -> Result<Option<String>> {
        self.with(|state| {
            if state.fail_reads {
                return Err(anyhow!("remote unavailable"));
            }
            let read = state.pointer.clone();
            if let Some(next) = state.pointer_after_read.take() {
                state.pointer = Some(next);
            }
            Ok(read)
        })
    }

    async fn project(&self, title: &str) -> Result<Project> {
        self.with(|state| {
            if state.fail_reads {
                return Err(anyhow!("remote unavailable"));
            }
            state
                .projects
                .iter()
                .find(|p| p.title == title)
                .cloned()
                .ok_or_else(|| anyhow!("No project titled {title:?}"))
        })
    }

    async fn questions(&self, project_id: SessionId) -> Result<Vec<Question>> {
        self.with(|state| {
            if state.fail_reads {
                return Err(anyhow!("remote unavailable"));
            }
            Ok(state.questions.get(&project_id).cloned().unwrap_or_default())
        })
    }

    async fn global_phase(&self) -> Result<AppPhase> {
        self.with(|state| {
            if state.fail_reads {
                return Err(anyhow!("remote unavailable"));
            }
            Ok(state.phase)
        })
    }

    async fn submit_vote(
        &self,
        project_id: SessionId,
        question_id: QuestionId,
        choice: Choice,
    ) -> Result<()> {
        if let Some(delay) = self.with(|state| state.vote_delay) {
            tokio::time::sleep(delay).await;
        }
        self.with(|state| {
            state.vote_calls.push((project_id, question_id, choice));
            if state.fail_votes || state.failing_questions.contains(&question_id) {
                return Err(anyhow!("vote_on_question failed"));
            }
            let question = state
                .questions
                .get_mut(&project_id)
                .and_then(|qs| qs.iter_mut().find(|q| q.question_id == question_id))
                .ok_or_else(|| anyhow!("unknown question"))?;
            match choice {
                Choice::Positive => question.votes_positive += 1,
                Choice::Negative => question.votes_negative += 1,
            }
            Ok(())
        })
    }
}

#[derive(Clone)]
pub struct ManualClock(Arc<AtomicI64>);

impl ManualClock {
    pub fn at(millis: i64) -> Self {
        Self(Arc::new(AtomicI64::new(millis)))
    }

    pub fn advance_secs(&self, secs: i64) {
        self.0.fetch_add(secs * 1_000, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.0.load(Ordering::SeqCst)
    }
}

/// Memory store that remembers every key written.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: Vec<String>,
}

impl CountingStore {
    pub fn writes_to(&self, key: &str) -> usize {
        self.writes.iter().filter(|k| k.as_str() == key).count()
    }
}

impl KvStore for CountingStore {
    fn get(&self, key: &str) -> Option<String> {
        self.inner.get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.writes.push(key.to_owned());
        self.inner.set(key, value)
    }
}

pub fn terminal(
    remote: &Arc<FakeRemote>,
    clock: &ManualClock,
) -> Terminal<FakeRemote, CountingStore, ManualClock> {
    let (terminal, _view) = Terminal::new(
        Arc::clone(remote),
        CountingStore::default(),
        clock.clone(),
        Timing::default(),
    );
    terminal
}
