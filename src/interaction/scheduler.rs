//! The poll loop: select, decide, reply, sleep, repeat.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::connection::ConnectionManager;
use crate::error::{EchoError, Result};
use crate::generator::{Persona, ResponseContext, ResponseGenerator, Verdict};
use crate::log_component;
use crate::rooms::{Message, Room};

use super::filter::CandidateFilter;
use super::memory::{InMemoryMessageMemory, MessageMemory};
use super::state::EngineState;
use super::thread::build_conversation_thread;

/// Scheduler tunables.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub poll_interval: Duration,
    pub max_thread_length: usize,
    pub min_response_interval: Duration,
    pub persona: Persona,
}

impl SchedulerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            poll_interval: config.interaction.poll_interval(),
            max_thread_length: config.interaction.max_thread_length,
            min_response_interval: config.interaction.min_response_interval(),
            persona: Persona::new(config.agent.name.clone(), config.agent.bio.clone()),
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What happened in one room during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomOutcome {
    /// No message passed the candidate filter.
    NoCandidate,
    /// The selected message had already been processed.
    Duplicate { message_id: String },
    /// The generator chose IGNORE or STOP (or failed to decide).
    Declined { message_id: String, verdict: Verdict },
    /// The generator chose RESPOND but produced no text.
    NoResponse { message_id: String },
    /// A reply was posted.
    Replied { message_id: String, reply_id: String },
}

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleReport {
    pub rooms_examined: usize,
    pub rooms_failed: usize,
    pub replies_sent: usize,
    pub outcomes: Vec<(String, RoomOutcome)>,
}

impl CycleReport {
    /// A cycle fails when every room it examined failed.
    pub fn is_failure(&self) -> bool {
        self.rooms_examined > 0 && self.rooms_failed == self.rooms_examined
    }

    pub fn outcome(&self, room_id: &str) -> Option<&RoomOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| id == room_id)
            .map(|(_, outcome)| outcome)
    }
}

/// State handed back when a spawned scheduler finishes.
#[derive(Debug)]
pub struct SchedulerExit {
    pub state: EngineState,
    pub result: Result<()>,
}

/// Handle to a scheduler running on its own task.
#[derive(Debug)]
pub struct SchedulerHandle {
    scheduler: Arc<InteractionScheduler>,
    task: JoinHandle<SchedulerExit>,
}

impl SchedulerHandle {
    /// Signal the loop to stop. Returns immediately.
    pub fn stop(&self) {
        self.scheduler.stop();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the loop to exit and take back its state.
    pub async fn join(self) -> std::result::Result<SchedulerExit, JoinError> {
        self.task.await
    }
}

/// Drives the per-room interaction cycle on a fixed poll interval.
pub struct InteractionScheduler {
    connection: Arc<ConnectionManager>,
    generator: Arc<dyn ResponseGenerator>,
    memory: Arc<dyn MessageMemory>,
    settings: SchedulerSettings,
    filter: CandidateFilter,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl std::fmt::Debug for InteractionScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InteractionScheduler")
            .field("connection", &self.connection)
            .field("settings", &self.settings)
            .field("running", &self.is_running())
            .finish()
    }
}

impl InteractionScheduler {
    pub fn new(
        connection: Arc<ConnectionManager>,
        generator: Arc<dyn ResponseGenerator>,
        memory: Arc<dyn MessageMemory>,
        settings: SchedulerSettings,
    ) -> Self {
        let filter = CandidateFilter::new(
            connection.identity().username.clone(),
            settings.min_response_interval,
        );
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            connection,
            generator,
            memory,
            settings,
            filter,
            running: AtomicBool::new(false),
            shutdown_tx,
        }
    }

    /// Build a scheduler with an in-memory marker store sized from config.
    pub fn from_config(
        connection: Arc<ConnectionManager>,
        generator: Arc<dyn ResponseGenerator>,
        config: &Config,
    ) -> Self {
        let memory = Arc::new(InMemoryMessageMemory::new(
            config.interaction.processed_memory_capacity,
        ));
        Self::new(
            connection,
            generator,
            memory,
            SchedulerSettings::from_config(config),
        )
    }

    pub fn connection(&self) -> &Arc<ConnectionManager> {
        &self.connection
    }

    pub fn settings(&self) -> &SchedulerSettings {
        &self.settings
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------
    // One cycle
    // ------------------------------------------------------------------

    /// Run a single pass over the room set.
    ///
    /// Returns `Err` only when the room set cannot be determined. Failures in
    /// individual rooms are logged and counted in the report.
    pub async fn run_cycle(&self, state: &mut EngineState) -> Result<CycleReport> {
        let rooms = self.room_set().await?;
        let mut report = CycleReport::default();

        for room in &rooms {
            report.rooms_examined += 1;
            match self.process_room(room, state).await {
                Ok(outcome) => {
                    if matches!(outcome, RoomOutcome::Replied { .. }) {
                        report.replies_sent += 1;
                    }
                    report.outcomes.push((room.id.clone(), outcome));
                }
                Err(err) => {
                    report.rooms_failed += 1;
                    warn!(room_id = %room.id, error = %err, "Skipping room after error");
                }
            }
        }

        log_component!(
            debug,
            "scheduler",
            "Poll cycle finished",
            rooms = report.rooms_examined,
            failed = report.rooms_failed,
            replies = report.replies_sent,
        );
        Ok(report)
    }

    /// The watched room, or every listed room when nothing is watched.
    async fn room_set(&self) -> Result<Vec<Room>> {
        let rooms = self.connection.list_rooms(&[]).await?;
        match self.connection.watched_room() {
            Some(watched) => {
                let room = rooms
                    .into_iter()
                    .find(|r| r.id == watched)
                    .ok_or(EchoError::RoomNotFound(watched))?;
                Ok(vec![room])
            }
            None => Ok(rooms),
        }
    }

    async fn process_room(&self, room: &Room, state: &mut EngineState) -> Result<RoomOutcome> {
        let messages = self.connection.get_room_history(&room.id).await?;
        state.cache_messages(&room.id, messages);

        let cached = state.cached_messages(&room.id);
        let Some(selected) = self.filter.select(cached, room, state, Instant::now()) else {
            return Ok(RoomOutcome::NoCandidate);
        };
        let thread = build_conversation_thread(selected, cached, self.settings.max_thread_length);
        let selected = selected.clone();

        self.handle_message(room, selected, thread, state).await
    }

    async fn handle_message(
        &self,
        room: &Room,
        message: Message,
        thread: Vec<Message>,
        state: &mut EngineState,
    ) -> Result<RoomOutcome> {
        let message_id = message.id.clone();

        if self.memory.contains(&message_id).await? || state.has_history_for(&room.id, &message_id)
        {
            debug!(room_id = %room.id, message_id = %message_id, "Already processed");
            state.advance_last_checked(&room.id, &message.timestamp);
            return Ok(RoomOutcome::Duplicate { message_id });
        }
        self.memory.record(&message_id).await?;
        state.record_processed(&room.id, message.clone());

        let ctx = ResponseContext {
            agent: self.connection.identity(),
            persona: &self.settings.persona,
            room,
            message: &message,
            thread: &thread,
        };

        let verdict = match self.generator.should_respond(&ctx).await {
            Ok(verdict) => verdict,
            Err(err) => {
                warn!(room_id = %room.id, error = %err, "Verdict failed, ignoring message");
                Verdict::Ignore
            }
        };
        if verdict != Verdict::Respond {
            debug!(room_id = %room.id, message_id = %message_id, %verdict, "Not responding");
            state.advance_last_checked(&room.id, &message.timestamp);
            return Ok(RoomOutcome::Declined {
                message_id,
                verdict,
            });
        }

        let text = match self.generator.generate_response(&ctx).await {
            Ok(Some(response)) if !response.text.trim().is_empty() => response.text,
            Ok(_) => {
                debug!(room_id = %room.id, message_id = %message_id, "Generator returned no text");
                state.advance_last_checked(&room.id, &message.timestamp);
                return Ok(RoomOutcome::NoResponse { message_id });
            }
            Err(err) => {
                warn!(room_id = %room.id, error = %err, "Reply generation failed");
                state.advance_last_checked(&room.id, &message.timestamp);
                return Ok(RoomOutcome::NoResponse { message_id });
            }
        };

        let reply = self.connection.send_message(&room.id, &text).await?;
        state.record_response_time(&room.id, Instant::now());
        let reply_id = reply.id.clone();
        state.attach_response(&room.id, &message_id, reply);
        state.advance_last_checked(&room.id, &message.timestamp);

        info!(room_id = %room.id, message_id = %message_id, reply_id = %reply_id, "Replied");
        Ok(RoomOutcome::Replied {
            message_id,
            reply_id,
        })
    }

    // ------------------------------------------------------------------
    // Loop
    // ------------------------------------------------------------------

    /// Poll until [`stop`](Self::stop) is called or reconnection is exhausted.
    ///
    /// Every suspension point is raced against the shutdown signal, so a stop
    /// interrupts an in-flight cycle, backoff or poll sleep.
    pub async fn run(&self, state: &mut EngineState) -> Result<()> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(EchoError::Config(
                "Interaction scheduler already running".into(),
            ));
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let result = self.run_until_stopped(state, &mut shutdown_rx).await;

        self.running.store(false, Ordering::SeqCst);
        self.connection.stop();
        result
    }

    async fn run_until_stopped(
        &self,
        state: &mut EngineState,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> Result<()> {
        log_component!(
            info,
            "scheduler",
            "Interaction scheduler started",
            poll_interval_secs = self.settings.poll_interval.as_secs(),
        );

        loop {
            if *shutdown_rx.borrow_and_update() {
                info!("Interaction scheduler stopped");
                return Ok(());
            }

            let cycle = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                cycle = self.run_cycle(state) => cycle,
            };

            let failed = match cycle {
                Ok(report) if !report.is_failure() => {
                    self.connection.reset_reconnect_attempts();
                    false
                }
                Ok(report) => {
                    warn!(rooms = report.rooms_examined, "Every room failed this cycle");
                    true
                }
                Err(err) => {
                    warn!(error = %err, "Poll cycle failed");
                    true
                }
            };

            if failed {
                let reconnect = tokio::select! {
                    _ = shutdown_rx.changed() => continue,
                    reconnect = self.connection.handle_reconnection() => reconnect,
                };
                if let Err(err) = reconnect {
                    self.shutdown_tx.send_replace(true);
                    return Err(err);
                }
                continue;
            }

            tokio::select! {
                _ = shutdown_rx.changed() => {}
                _ = tokio::time::sleep(self.settings.poll_interval) => {}
            }
        }
    }

    /// Request shutdown. Idempotent; once stopped the scheduler does not
    /// start another cycle.
    pub fn stop(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Run the loop on a new tokio task, taking ownership of `state`.
    pub fn spawn(self: &Arc<Self>, state: EngineState) -> SchedulerHandle {
        let scheduler = Arc::clone(self);
        let task = tokio::spawn(async move {
            let mut state = state;
            let result = scheduler.run(&mut state).await;
            SchedulerExit { state, result }
        });
        SchedulerHandle {
            scheduler: Arc::clone(self),
            task,
        }
    }
}
