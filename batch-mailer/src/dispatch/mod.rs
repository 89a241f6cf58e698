//! Concurrent batch dispatch.
//!
//! ## Flow
//!
//! ```text
//! rows → partition() → batch → worker pool → DispatchOutcome → caller
//!                        ↑                                      │
//!                        └──────────── pause (delay) ───────────┘
//! ```

pub mod scheduler;
pub mod types;
pub mod worker;

pub use scheduler::{partition, BatchScheduler, BatchSettings, Dispatcher, RunSummary};
pub use types::DispatchOutcome;
pub use worker::{dispatch, DispatchContext, MailDispatcher, WorkerSession};
