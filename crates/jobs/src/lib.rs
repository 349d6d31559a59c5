//! `autoguard-jobs` is the job pipeline: the reliable-queue protocol
//! atop the fast lookup store's lists, the four job handlers (page
//! scrape, AI safe-page generation, external blacklist source sync,
//! custom-domain verification), the bounded-concurrency worker pool,
//! and the scheduler's periodic ticks.

pub mod collaborators;
pub mod domain_token;
pub mod error;
pub mod filesystem;
pub mod handlers;
pub mod job;
pub mod prompt_cache;
pub mod queue;
pub mod scheduler;
pub mod templates;
pub mod worker;

pub use error::{JobError, JobResult};
pub use queue::ReliableQueue;
pub use scheduler::Scheduler;
pub use worker::WorkerPool;
