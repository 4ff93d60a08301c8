//! Multi-language code execution sandbox: a Runtime abstraction that drives
//! containerized execution per language, a durable Task Queue and Worker
//! Pool for asynchronous jobs, and a Result Store tracking status and
//! output across a job's lifetime.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod packages;
pub mod pool;
pub mod queue;
pub mod runtime;
pub mod sandbox;
pub mod store;
pub mod worker;

pub use dispatcher::Dispatcher;
pub use job::{ExecutionConfig, ExecutionRecord, ExecutionResult, ExecutionStatus, Job};
pub use runtime::RuntimeRegistry;
pub use sandbox::SandboxDriver;
