//! Step context — what a running task may touch
//!
//! Handed to [`TaskBody::step`](crate::TaskBody::step) for the duration of a
//! single step. It can mutate only the running task's own control fields
//! (resume point, state via blocking, due time via delay) and the shared
//! queues. Other tasks are reachable only through the wake-on-send rule.

use crate::error::Result;
use crate::queue::{QueueId, QueueSet};
use crate::task::{ResumePoint, TaskId, TaskTable};
use crate::timer::Clock;

/// Capability granted to the running task
pub struct TaskContext<'k> {
    id: TaskId,
    tasks: &'k mut TaskTable,
    queues: &'k mut QueueSet,
    clock: &'k dyn Clock,
    yield_requested: bool,
}

impl<'k> TaskContext<'k> {
    pub(crate) fn new(
        id: TaskId,
        tasks: &'k mut TaskTable,
        queues: &'k mut QueueSet,
        clock: &'k dyn Clock,
    ) -> Self {
        Self {
            id,
            tasks,
            queues,
            clock,
            yield_requested: false,
        }
    }

    /// Id of the running task
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Current clock reading
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    /// Decode this task's resume point
    pub fn resume_point<R: ResumePoint>(&self) -> R {
        R::from_raw(self.tasks.get(self.id).map_or(0, |t| t.resume_point))
    }

    /// Record the phase the next step should run
    pub fn set_resume_point<R: ResumePoint>(&mut self, point: R) {
        if let Some(t) = self.tasks.get_mut(self.id) {
            t.resume_point = point.into_raw();
        }
    }

    /// End this step as a partial step: position and state are kept
    pub fn yield_now(&mut self) {
        self.yield_requested = true;
    }

    /// Not eligible again for `ms` milliseconds; implies a yield
    pub fn delay(&mut self, ms: u32) {
        let due = self.clock.now_ms() + ms as u64;
        if let Some(t) = self.tasks.get_mut(self.id) {
            t.next_due = due;
        }
        self.yield_now();
    }

    /// Has this step asked to yield?
    pub fn yield_requested(&self) -> bool {
        self.yield_requested
    }

    /// Send one item; may wake the lowest-id task waiting on `queue`
    pub fn send(&mut self, queue: QueueId, data: &[u8]) -> Result<()> {
        self.queues.send(queue, data, self.tasks)
    }

    /// Receive one item.
    ///
    /// `WouldBlock` on an empty queue also parks this task on `queue`;
    /// the step should then yield and retry when woken.
    pub fn receive(&mut self, queue: QueueId, out: &mut [u8]) -> Result<()> {
        self.queues.receive(queue, out, self.tasks, Some(self.id))
    }
}
