//! Kernel — top-level RTOS manager
//!
//! Owns the scheduler, the queue set and the clock as one instance.
//! Lifecycle: construct, create queues and register tasks, then enter the
//! dispatch loop. Registration is closed once the first pass has run.

use log::{debug, info, warn};

use crate::config::KernelConfig;
use crate::error::{Error, Result};
use crate::queue::{MessageQueue, QueueId, QueueSet};
use crate::scheduler::{PassReport, Scheduler};
use crate::task::{TaskBody, TaskControl, TaskId};
use crate::timer::Clock;

/// Cooperative RTOS kernel
///
/// Task bodies are borrowed for `'a`; nothing is allocated.
pub struct Kernel<'a, C: Clock> {
    /// Task scheduler
    scheduler: Scheduler<'a>,
    /// Message queues
    queues: QueueSet,
    /// Time source
    clock: C,
    config: KernelConfig,
    /// Set by the first pass; closes registration
    started: bool,
    /// Total passes executed
    pub total_passes: u64,
}

impl<'a, C: Clock> Kernel<'a, C> {
    pub fn new(clock: C, config: KernelConfig) -> Self {
        Self {
            scheduler: Scheduler::new(),
            queues: QueueSet::new(),
            clock,
            config,
            started: false,
            total_passes: 0,
        }
    }

    /// Kernel with default configuration
    pub fn with_clock(clock: C) -> Self {
        Self::new(clock, KernelConfig::default())
    }

    /// Create a message queue
    pub fn create_queue(&mut self, capacity: usize, item_size: usize) -> Result<QueueId> {
        if self.started {
            warn!("queue creation rejected: scheduler already started");
            return Err(Error::AlreadyStarted);
        }
        let id = self.queues.create(capacity, item_size).map_err(|e| {
            warn!("queue creation rejected: {}", e);
            e
        })?;
        debug!("created queue {} ({} x {} B)", id.0, capacity, item_size);
        Ok(id)
    }

    /// Register a task
    ///
    /// `period_ms = 0` re-dispatches whenever ready; otherwise each completed
    /// cycle re-arms the task `period_ms` after the pass it ran in.
    pub fn register_task(&mut self, body: &'a mut dyn TaskBody, period_ms: u32) -> Result<TaskId> {
        if self.started {
            warn!("task registration rejected: scheduler already started");
            return Err(Error::AlreadyStarted);
        }
        let now = self.clock.now_ms();
        let id = self.scheduler.register(body, period_ms, now).map_err(|e| {
            warn!("task registration rejected: {}", e);
            e
        })?;
        debug!("registered task {} (period {} ms)", id.0, period_ms);
        Ok(id)
    }

    /// Run a single dispatch pass
    pub fn run_pass(&mut self) -> PassReport {
        if !self.started {
            self.started = true;
            info!(
                "starting scheduler with {} tasks, {} queues",
                self.scheduler.task_count(),
                self.queues.len()
            );
        }
        self.total_passes += 1;
        self.scheduler.dispatch_pass(&mut self.queues, &self.clock)
    }

    /// Run `passes` iterations of pass + quantum
    pub fn run_for(&mut self, passes: u64) -> KernelStats {
        let dispatches_before = self.scheduler.dispatches;
        let mut idle_passes = 0u64;

        for _ in 0..passes {
            if self.run_pass().dispatched == 0 {
                idle_passes += 1;
            }
            self.clock.idle(self.config.quantum_us);
        }

        KernelStats {
            passes,
            idle_passes,
            dispatches: self.scheduler.dispatches - dispatches_before,
            cycles: self.scheduler.tasks().map(|t| t.cycles as u64).sum(),
            now_ms: self.clock.now_ms(),
        }
    }

    /// The dispatch loop. Runs until the process is killed or reset.
    pub fn run_forever(&mut self) -> ! {
        loop {
            self.run_pass();
            self.clock.idle(self.config.quantum_us);
        }
    }

    /// Send from outside any task step; still wakes a waiter
    pub fn send(&mut self, queue: QueueId, data: &[u8]) -> Result<()> {
        self.queues.send(queue, data, self.scheduler.table_mut())
    }

    /// Diagnostic receive: `WouldBlock` on empty, no task state changes
    pub fn receive(&mut self, queue: QueueId, out: &mut [u8]) -> Result<()> {
        let running = self.scheduler.current();
        self.queues
            .receive(queue, out, self.scheduler.table_mut(), running)
    }

    /// Get task control block by id
    pub fn task(&self, id: TaskId) -> Option<&TaskControl> {
        self.scheduler.get_task(id)
    }

    /// Get queue by id
    pub fn queue(&self, id: QueueId) -> Option<&MessageQueue> {
        self.queues.get(id)
    }

    pub fn task_count(&self) -> usize {
        self.scheduler.task_count()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    /// Task currently executing a step
    pub fn current(&self) -> Option<TaskId> {
        self.scheduler.current()
    }

    /// Has the dispatch loop started?
    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Mutable clock access, for driving a virtual timer
    pub fn clock_mut(&mut self) -> &mut C {
        &mut self.clock
    }

    pub fn config(&self) -> &KernelConfig {
        &self.config
    }
}

/// Kernel execution statistics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelStats {
    /// Passes executed
    pub passes: u64,
    /// Passes in which no task was due
    pub idle_passes: u64,
    /// Steps executed
    pub dispatches: u64,
    /// Completed cycles across all tasks, lifetime total
    pub cycles: u64,
    /// Clock reading after the last quantum
    pub now_ms: u64,
}
