//! Interaction module - the agent's poll loop
//!
//! Each cycle the [`InteractionScheduler`] walks the room set, picks at most
//! one candidate message per room, asks the generator whether and how to
//! reply, and posts the reply through the [`ConnectionManager`].
//!
//! ```text
//! list rooms -> history -> filter -> thread -> dedup -> verdict -> reply -> send
//!                                                                        |
//!                          EngineState (watermarks, rate limits, history) <-
//! ```
//!
//! [`ConnectionManager`]: crate::connection::ConnectionManager

pub mod filter;
pub mod memory;
pub mod scheduler;
pub mod state;
pub mod thread;

pub use filter::CandidateFilter;
pub use memory::{InMemoryMessageMemory, MessageMemory};
pub use scheduler::{
    CycleReport, InteractionScheduler, RoomOutcome, SchedulerExit, SchedulerHandle,
    SchedulerSettings,
};
pub use state::{EngineState, HistoryEntry};
pub use thread::build_conversation_thread;
