//! Round-robin cooperative scheduler
//!
//! One pass scans the task table in ascending id order and runs one step of
//! every task that is READY and due. No preemption: a step runs until it
//! returns, and that return is the only suspension point.
//!
//! After each step the scheduler reads the yield flag:
//! - yielded → partial step; resume point, state and due time stay as the
//!   step left them
//! - not yielded → cycle complete; READY again, re-armed to
//!   `pass time + period`, resume point rewound to 0

use heapless::Vec;
use log::trace;

use crate::context::TaskContext;
use crate::error::{Error, Result};
use crate::queue::QueueSet;
use crate::task::{TaskBody, TaskControl, TaskId, TaskState, TaskTable, MAX_TASKS};
use crate::timer::Clock;

/// Outcome of a single dispatch pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PassReport {
    /// Time captured at the start of the pass
    pub now_ms: u64,
    /// Steps executed during the pass
    pub dispatched: usize,
}

/// Cooperative scheduler
///
/// Static task table, no dynamic allocation. Task bodies are borrowed for
/// the scheduler's lifetime and kept apart from their control blocks, so a
/// running body can be handed a context over the table.
pub struct Scheduler<'a> {
    /// Control blocks
    tasks: TaskTable,
    /// Step functions, parallel to `tasks`
    bodies: Vec<&'a mut dyn TaskBody, MAX_TASKS>,
    /// Currently running task (None between steps)
    current: Option<TaskId>,
    /// Total step invocations
    pub dispatches: u64,
}

impl<'a> Scheduler<'a> {
    /// Create empty scheduler
    pub const fn new() -> Self {
        Self {
            tasks: TaskTable::new(),
            bodies: Vec::new(),
            current: None,
            dispatches: 0,
        }
    }

    /// Register a task, READY and due at `now_ms`
    pub fn register(
        &mut self,
        body: &'a mut dyn TaskBody,
        period_ms: u32,
        now_ms: u64,
    ) -> Result<TaskId> {
        if self.bodies.is_full() {
            return Err(Error::CapacityExceeded);
        }
        let id = self
            .tasks
            .push(period_ms, now_ms)
            .ok_or(Error::CapacityExceeded)?;
        self.bodies
            .push(body)
            .map_err(|_| Error::CapacityExceeded)?;
        Ok(id)
    }

    /// Run one pass over the table
    pub fn dispatch_pass(&mut self, queues: &mut QueueSet, clock: &dyn Clock) -> PassReport {
        let now = clock.now_ms();
        let mut dispatched = 0;

        for idx in 0..self.tasks.len() {
            let id = TaskId(idx);
            match self.tasks.get_mut(id) {
                Some(t) if t.is_eligible(now) => {
                    t.state = TaskState::Running;
                    t.steps = t.steps.wrapping_add(1);
                }
                _ => continue,
            }
            self.current = Some(id);

            let body = &mut self.bodies[idx];
            trace!("dispatch task {} ({})", idx, body.name());
            let yielded = {
                let mut cx = TaskContext::new(id, &mut self.tasks, queues, clock);
                body.step(&mut cx);
                cx.yield_requested()
            };

            if let Some(t) = self.tasks.get_mut(id) {
                t.finish_step(yielded, now);
            }
            self.current = None;
            dispatched += 1;
        }

        self.dispatches += dispatched as u64;
        PassReport {
            now_ms: now,
            dispatched,
        }
    }

    /// Task currently executing a step
    pub fn current(&self) -> Option<TaskId> {
        self.current
    }

    /// Number of registered tasks
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Get task control block by id
    pub fn get_task(&self, id: TaskId) -> Option<&TaskControl> {
        self.tasks.get(id)
    }

    /// Iterate control blocks in id order
    pub fn tasks(&self) -> impl Iterator<Item = &TaskControl> {
        self.tasks.iter()
    }

    /// Task table, for queue operations issued outside a step
    pub(crate) fn table_mut(&mut self) -> &mut TaskTable {
        &mut self.tasks
    }
}

impl Default for Scheduler<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::QueueId;
    use crate::timer::SysTimer;

    /// Completes a full cycle every step
    struct Counter {
        runs: u32,
    }

    impl TaskBody for Counter {
        fn step(&mut self, _cx: &mut TaskContext<'_>) {
            self.runs += 1;
        }
    }

    /// Three-phase task that yields between phases
    struct Phased {
        seen: [u16; 8],
        len: usize,
    }

    impl Phased {
        fn new() -> Self {
            Self { seen: [0; 8], len: 0 }
        }
    }

    impl TaskBody for Phased {
        fn step(&mut self, cx: &mut TaskContext<'_>) {
            let point: u16 = cx.resume_point();
            if self.len < self.seen.len() {
                self.seen[self.len] = point;
                self.len += 1;
            }
            if point < 2 {
                cx.set_resume_point(point + 1);
                cx.yield_now();
            }
        }
    }

    /// Receives from queue 0 forever
    struct Waiter;

    impl TaskBody for Waiter {
        fn step(&mut self, cx: &mut TaskContext<'_>) {
            let mut buf = [0u8; 1];
            if cx.receive(QueueId(0), &mut buf).is_err() {
                cx.yield_now();
            }
        }
    }

    /// Yields without touching anything
    struct Spinner;

    impl TaskBody for Spinner {
        fn step(&mut self, cx: &mut TaskContext<'_>) {
            cx.yield_now();
        }
    }

    #[test]
    fn test_register_task() {
        let mut body = Counter { runs: 0 };
        let mut sched = Scheduler::new();
        let id = sched.register(&mut body, 0, 42).unwrap();
        assert_eq!(id, TaskId(0));
        let tcb = sched.get_task(id).unwrap();
        assert_eq!(tcb.state, TaskState::Ready);
        assert_eq!(tcb.next_due, 42);
        assert_eq!(tcb.resume_point, 0);
    }

    #[test]
    fn test_register_capacity() {
        let mut bodies: [Counter; MAX_TASKS + 1] = core::array::from_fn(|_| Counter { runs: 0 });
        let mut sched = Scheduler::new();
        let mut results = bodies.iter_mut().map(|b| sched.register(b, 0, 0));
        for i in 0..MAX_TASKS {
            assert_eq!(results.next(), Some(Ok(TaskId(i))));
        }
        assert_eq!(results.next(), Some(Err(Error::CapacityExceeded)));
    }

    #[test]
    fn test_pass_runs_in_id_order() {
        let mut a = Counter { runs: 0 };
        let mut b = Counter { runs: 0 };
        let mut queues = QueueSet::new();
        let clock = SysTimer::software();
        let mut sched = Scheduler::new();
        sched.register(&mut a, 0, 0).unwrap();
        sched.register(&mut b, 0, 0).unwrap();

        let report = sched.dispatch_pass(&mut queues, &clock);
        assert_eq!(report.dispatched, 2);
        assert_eq!(sched.current(), None);
        sched.dispatch_pass(&mut queues, &clock);
        assert_eq!(sched.dispatches, 4);
        drop(sched);
        assert_eq!((a.runs, b.runs), (2, 2));
    }

    #[test]
    fn test_resume_point_preserved_until_cycle_completes() {
        let mut body = Phased::new();
        let mut queues = QueueSet::new();
        let clock = SysTimer::software();
        let mut sched = Scheduler::new();
        let id = sched.register(&mut body, 0, 0).unwrap();

        sched.dispatch_pass(&mut queues, &clock);
        assert_eq!(sched.get_task(id).unwrap().resume_point, 1);
        sched.dispatch_pass(&mut queues, &clock);
        assert_eq!(sched.get_task(id).unwrap().resume_point, 2);
        assert_eq!(sched.get_task(id).unwrap().cycles, 0);
        sched.dispatch_pass(&mut queues, &clock);
        assert_eq!(sched.get_task(id).unwrap().resume_point, 0);
        assert_eq!(sched.get_task(id).unwrap().cycles, 1);
        sched.dispatch_pass(&mut queues, &clock);
        drop(sched);
        assert_eq!(&body.seen[..body.len], &[0, 1, 2, 0]);
    }

    #[test]
    fn test_yield_while_running_stays_runnable() {
        let mut body = Spinner;
        let mut queues = QueueSet::new();
        let clock = SysTimer::software();
        let mut sched = Scheduler::new();
        let id = sched.register(&mut body, 0, 0).unwrap();

        for _ in 0..3 {
            assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 1);
        }
        assert_eq!(sched.get_task(id).unwrap().state, TaskState::Ready);
        assert_eq!(sched.get_task(id).unwrap().steps, 3);
    }

    #[test]
    fn test_periodic_rearm() {
        let mut body = Counter { runs: 0 };
        let mut queues = QueueSet::new();
        let mut clock = SysTimer::starting_at_ms(10);
        let mut sched = Scheduler::new();
        let id = sched.register(&mut body, 100, 10).unwrap();

        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 1);
        assert_eq!(sched.get_task(id).unwrap().next_due, 110);

        clock.advance_ms(99);
        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 0);
        clock.advance_ms(1);
        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 1);
        assert_eq!(sched.get_task(id).unwrap().next_due, 210);
    }

    #[test]
    fn test_blocked_task_skipped() {
        let mut body = Waiter;
        let mut queues = QueueSet::new();
        queues.create(2, 1).unwrap();
        let clock = SysTimer::software();
        let mut sched = Scheduler::new();
        let id = sched.register(&mut body, 0, 0).unwrap();

        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 1);
        let tcb = sched.get_task(id).unwrap();
        assert_eq!(tcb.state, TaskState::Blocked);
        assert_eq!(tcb.blocked_on, Some(QueueId(0)));

        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 0);

        queues.send(QueueId(0), &[1], sched.table_mut()).unwrap();
        assert_eq!(sched.get_task(id).unwrap().state, TaskState::Ready);
        assert_eq!(sched.dispatch_pass(&mut queues, &clock).dispatched, 1);
    }
}
