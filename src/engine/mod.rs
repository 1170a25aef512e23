pub mod countdown;
pub mod ledger;
pub mod phase;
pub mod session;

use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::{Context, Result};
use futures_util::future::{join_all, BoxFuture};
use futures_util::stream::{FuturesUnordered, StreamExt};
use log::{debug, error, info, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{self, MissedTickBehavior};

use crate::api::{RemoteSource, RestClient};
use crate::config::{Config, Timing};
use crate::error::VoteError;
use crate::models::events::Command;
use crate::models::phase::AppPhase;
use crate::models::session::{QuestionId, SessionPhase, VotingSession};
use crate::models::state::{QuestionView, SessionView, TerminalView};
use crate::store::{FileStore, KvStore};

use countdown::{Clock, CountdownTimer, SystemClock};
use ledger::{VoteLedger, VoteOutcome, VoteTicket};
use phase::PhasePoller;
use session::{fetch_active_session, SessionChange, SessionPoller};

type Pending = BoxFuture<'static, Completion>;

/// Result of a remote call, applied back on the engine loop.
pub enum Completion {
    Session(Result<Option<VotingSession>>),
    Phase(Result<AppPhase>),
    Vote(VoteTicket, Result<()>),
}

/// Owns all terminal state. Every mutation happens on the one task running
/// the terminal; remote calls resolve into `Completion`s applied in turn.
pub struct Terminal<R, S, C> {
    remote: Arc<R>,
    store: S,
    clock: C,
    timing: Timing,
    sessions: SessionPoller,
    phase: PhasePoller,
    countdown: CountdownTimer,
    ledger: VoteLedger,
    view_tx: watch::Sender<TerminalView>,
}

impl<R, S, C> Terminal<R, S, C>
where
    R: RemoteSource + 'static,
    S: KvStore,
    C: Clock,
{
    pub fn new(
        remote: Arc<R>,
        store: S,
        clock: C,
        timing: Timing,
    ) -> (Self, watch::Receiver<TerminalView>) {
        let (view_tx, view_rx) = watch::channel(TerminalView::default());
        let terminal = Self {
            remote,
            store,
            clock,
            countdown: CountdownTimer::new(timing.vote_window),
            timing,
            sessions: SessionPoller::new(),
            phase: PhasePoller::new(),
            ledger: VoteLedger::new(),
            view_tx,
        };
        (terminal, view_rx)
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn app_phase(&self) -> AppPhase {
        self.phase.phase()
    }

    pub fn session(&self) -> Option<&VotingSession> {
        self.sessions.current()
    }

    pub fn countdown(&self) -> &CountdownTimer {
        &self.countdown
    }

    pub fn can_vote(&self, question_id: QuestionId) -> bool {
        self.phase.phase().is_live()
            && self.sessions.current().is_some_and(|session| {
                let window_open = self.countdown.window_open(session.session_id);
                self.ledger
                    .can_vote(&self.store, session, question_id, window_open)
            })
    }

    fn session_poll(&mut self) -> Option<Pending> {
        if !self.phase.phase().is_live() || !self.sessions.begin() {
            return None;
        }
        let remote = Arc::clone(&self.remote);
        let known = self.sessions.known();
        Some(Box::pin(async move {
            Completion::Session(fetch_active_session(remote.as_ref(), known.as_ref()).await)
        }))
    }

    fn phase_poll(&mut self) -> Option<Pending> {
        if !self.phase.begin() {
            return None;
        }
        let remote = Arc::clone(&self.remote);
        Some(Box::pin(async move { Completion::Phase(remote.global_phase().await) }))
    }

    fn vote_call(&self, ticket: VoteTicket) -> Pending {
        let remote = Arc::clone(&self.remote);
        Box::pin(async move {
            let result = remote
                .submit_vote(ticket.session_id, ticket.question_id, ticket.choice)
                .await;
            Completion::Vote(ticket, result)
        })
    }

    pub fn complete(&mut self, done: Completion) -> Option<VoteOutcome> {
        match done {
            Completion::Session(result) => {
                match self.sessions.apply(result) {
                    SessionChange::Switched { to, .. } => {
                        self.countdown.reset();
                        self.ledger.reset_ballot(to);
                    }
                    SessionChange::Refreshed(_) => {
                        if let Some(session) = self.sessions.current() {
                            self.ledger.prune_ballot(session);
                        }
                    }
                    SessionChange::Retained => {}
                }
                let now = self.clock.now_millis();
                self.countdown
                    .observe(self.sessions.current(), &mut self.store, now);
                self.countdown.tick(now);
                None
            }
            Completion::Phase(result) => {
                self.phase.apply(result);
                None
            }
            Completion::Vote(ticket, result) => Some(self.ledger.settle(
                &mut self.store,
                ticket,
                result,
                self.sessions.current_mut(),
            )),
        }
    }

    pub fn tick(&mut self) {
        if self.phase.phase().is_live() {
            let now = self.clock.now_millis();
            self.countdown.tick(now);
        }
    }

    /// Applies a render-layer command and returns the votes to send.
    pub fn handle(&mut self, command: Command) -> Result<Vec<VoteTicket>, VoteError> {
        if !self.phase.phase().is_live() {
            return Err(VoteError::NotLive);
        }
        let Some(session) = self.sessions.current() else {
            return Err(VoteError::Closed);
        };
        let target = match &command {
            Command::Select { session_id, .. }
            | Command::Submit { session_id, .. }
            | Command::SubmitStaged { session_id } => *session_id,
        };
        if target != session.session_id {
            debug!("Dropping command for session {} (showing {})", target, session.session_id);
            return Ok(Vec::new());
        }
        let window_open = self.countdown.window_open(session.session_id);

        match command {
            Command::Select {
                question_id,
                choice,
                ..
            } => {
                self.ledger
                    .stage(&self.store, session, question_id, choice, window_open);
                Ok(Vec::new())
            }
            Command::Submit {
                question_id,
                choice,
                ..
            } => self
                .ledger
                .admit(&self.store, session, question_id, choice, window_open)
                .map(|ticket| ticket.into_iter().collect()),
            Command::SubmitStaged { .. } => {
                Ok(self.ledger.admit_staged(&self.store, session, window_open))
            }
        }
    }

    /// Polls the session once and applies the result.
    pub async fn refresh_session(&mut self) {
        if let Some(poll) = self.session_poll() {
            let done = poll.await;
            self.complete(done);
        }
        self.publish();
    }

    pub async fn refresh_phase(&mut self) {
        if let Some(poll) = self.phase_poll() {
            let done = poll.await;
            self.complete(done);
        }
        self.publish();
    }

    /// Handles a command and waits for the votes it sends to settle.
    pub async fn dispatch(&mut self, command: Command) -> Result<Vec<VoteOutcome>, VoteError> {
        let tickets = self.handle(command)?;
        let calls: Vec<Pending> = tickets
            .into_iter()
            .map(|ticket| self.vote_call(ticket))
            .collect();
        let outcomes = join_all(calls)
            .await
            .into_iter()
            .filter_map(|done| self.complete(done))
            .collect();
        self.publish();
        Ok(outcomes)
    }

    pub fn view(&self) -> TerminalView {
        let live = self.phase.phase().is_live();
        let session = self.sessions.current().map(|session| {
            let window_open = self.countdown.window_open(session.session_id);
            let questions = session
                .questions
                .iter()
                .map(|question| {
                    let id = question.question_id;
                    QuestionView {
                        question: question.clone(),
                        voted: self.ledger.has_voted(&self.store, session.session_id, id),
                        pending: self.ledger.is_pending(session.session_id, id),
                        can_vote: live
                            && self.ledger.can_vote(&self.store, session, id, window_open),
                        staged: self.ledger.staged(session.session_id, id),
                    }
                })
                .collect();
            let remaining_secs = if session.phase == SessionPhase::Voting {
                self.countdown.remaining_secs()
            } else {
                None
            };
            SessionView {
                session: session.clone(),
                remaining_secs,
                window_open,
                questions,
            }
        });

        TerminalView {
            app_phase: self.phase.phase(),
            session,
            notice: self.ledger.notice().map(str::to_owned),
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.view());
    }

    pub async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut shutdown: oneshot::Receiver<()>,
    ) {
        let mut session_timer = time::interval(self.timing.session_poll);
        let mut phase_timer = time::interval(self.timing.phase_poll);
        let mut tick_timer = time::interval(self.timing.tick);
        for timer in [&mut session_timer, &mut phase_timer, &mut tick_timer] {
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        }
        let mut pending: FuturesUnordered<Pending> = FuturesUnordered::new();
        info!("Terminal started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Terminal shutdown requested");
                    break;
                }
                _ = phase_timer.tick() => pending.extend(self.phase_poll()),
                _ = session_timer.tick() => pending.extend(self.session_poll()),
                _ = tick_timer.tick() => self.tick(),
                Some(done) = pending.next(), if !pending.is_empty() => {
                    self.complete(done);
                }
                command = commands.recv() => match command {
                    Some(command) => match self.handle(command) {
                        Ok(tickets) => {
                            for ticket in tickets {
                                pending.push(self.vote_call(ticket));
                            }
                        }
                        Err(e) => warn!("Command rejected: {}", e),
                    },
                    None => {
                        info!("Command channel closed");
                        break;
                    }
                },
            }
            self.publish();
        }

        self.drain(pending).await;
    }

    /// Lets in-flight calls finish so successful votes still get their marker.
    async fn drain(&mut self, mut pending: FuturesUnordered<Pending>) {
        if pending.is_empty() {
            return;
        }
        debug!("Waiting for {} in-flight calls", pending.len());
        while let Some(done) = pending.next().await {
            if let Completion::Vote(..) = done {
                self.complete(done);
            }
        }
        self.publish();
    }
}

/// Handle to a terminal running on its own thread.
pub struct TerminalHandle {
    pub commands: mpsc::UnboundedSender<Command>,
    pub view: watch::Receiver<TerminalView>,
    shutdown_tx: oneshot::Sender<()>,
    thread: JoinHandle<()>,
}

impl TerminalHandle {
    pub fn shutdown(self) {
        info!("Shutting down terminal");
        let _ = self.shutdown_tx.send(());
        if self.thread.join().is_err() {
            error!("Terminal thread panicked");
        }
    }
}

/// Starts the terminal against the configured remote on a single-threaded runtime.
pub fn spawn(config: &Config) -> Result<TerminalHandle> {
    let remote = Arc::new(RestClient::new(config)?);
    let store = FileStore::open(&config.store_path)
        .context("Vote markers unreadable, refusing to start")?;
    let (terminal, view) = Terminal::new(remote, store, SystemClock, config.timing.clone());

    let (commands, commands_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let thread = std::thread::Builder::new()
        .name("vote-terminal".to_owned())
        .spawn(move || runtime.block_on(terminal.run(commands_rx, shutdown_rx)))?;

    Ok(TerminalHandle {
        commands,
        view,
        shutdown_tx,
        thread,
    })
}
