//! Instance acquisition engine for capgrab
//!
//! # Architecture
//!
//! ```text
//! BatchOrchestrator ── per account ──► GatewayFactory::connect
//!        │
//!        └── per template (tokio task) ──► AcquisitionEngine
//!                                             ├── ZoneRotation
//!                                             ├── ClassifierRules
//!                                             ├── Backoff ──┐
//!                                             └── ReadinessWaiter ── poll (cancellable)
//! ```
//!
//! After each account: summary notification, [`IpExporter`] pass, post-batch
//! command.

pub mod backoff;
pub mod batch;
pub mod classify;
pub mod engine;
pub mod error;
pub mod export;
pub mod hook;
pub mod readiness;
pub mod report;
pub mod retry;
pub mod rotation;

pub use backoff::{Backoff, DelaySource, FixedDelay, RandomDelay};
pub use batch::{
    AccountBatch, BatchOrchestrator, BatchSummary, BatchTally, BatchTotals, GatewayFactory,
    NamedPlan,
};
pub use classify::{AttemptClass, ClassifierRules};
pub use engine::{AcquiredInstance, AcquisitionEngine, EngineSettings, RunOutcome, RunReport};
pub use error::{EngineError, Result};
pub use export::IpExporter;
pub use hook::run_post_batch_command;
pub use readiness::{ReadinessError, ReadinessWaiter};
pub use retry::{Cancelled, PollPolicy, cancellable_sleep, poll};
pub use rotation::{CycleStep, RotationMode, ZoneRotation};
