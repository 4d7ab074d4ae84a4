//! mini-rtos — cooperative single-core RTOS
//!
//! Round-robin dispatch of step functions with bounded message queues,
//! for targets without hardware preemption:
//! - Static task table (no heap, no allocation)
//! - Explicit resume points instead of stack-switching coroutines
//! - Periodic re-arming relative to the pass a cycle completed in
//! - Fixed-size ring queues: overwrite-oldest send, blocking receive,
//!   wake-one-waiter on send

#![no_std]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod context;
pub mod error;
pub mod task;
pub mod scheduler;
pub mod timer;
pub mod queue;
pub mod kernel;

pub use config::KernelConfig;
pub use context::TaskContext;
pub use error::{Error, Result};
pub use task::{ResumePoint, TaskBody, TaskControl, TaskId, TaskState};
pub use scheduler::{PassReport, Scheduler};
pub use timer::{Clock, SysTimer};
#[cfg(feature = "std")]
pub use timer::StdClock;
pub use queue::{MessageQueue, QueueId};
pub use kernel::{Kernel, KernelStats};
