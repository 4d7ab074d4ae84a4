//! Task definition — static, no-alloc task control blocks
//!
//! A task is a step function plus its own persistent state. Each eligible
//! pass runs exactly one step; the raw resume point in the TCB tells the
//! step which segment of its cycle comes next.

use heapless::Vec;

use crate::context::TaskContext;
use crate::queue::QueueId;

/// Maximum tasks the kernel can manage
pub const MAX_TASKS: usize = 8;

/// Dense task index, assigned at registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub usize);

/// Task execution state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Task may run once its due time has passed
    Ready,
    /// Task is executing its current step
    Running,
    /// Task is waiting for a send on `blocked_on`
    Blocked,
}

/// Executable unit of a task
///
/// `step` is invoked once per eligible pass and must return promptly.
/// To stop mid-cycle it records its next phase and calls
/// [`TaskContext::yield_now`] or [`TaskContext::delay`]; returning without
/// yielding completes the cycle and rewinds the resume point to `0`.
pub trait TaskBody {
    fn step(&mut self, cx: &mut TaskContext<'_>);

    /// Label used in log output
    fn name(&self) -> &str {
        "task"
    }
}

/// Typed view of a task's raw resume point
///
/// Raw `0` must decode to the initial phase, since a completed cycle
/// always rewinds to it.
pub trait ResumePoint: Copy {
    fn from_raw(raw: u16) -> Self;
    fn into_raw(self) -> u16;
}

impl ResumePoint for u16 {
    fn from_raw(raw: u16) -> Self {
        raw
    }

    fn into_raw(self) -> u16 {
        self
    }
}

/// Task control block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskControl {
    /// Stable index
    pub id: TaskId,
    /// Next segment to execute; owned by the task's step and the reset rule
    pub resume_point: u16,
    /// Current state
    pub state: TaskState,
    /// Re-arm period; 0 = re-dispatch as soon as ready
    pub period_ms: u32,
    /// Earliest time (ms) the task may run again
    pub next_due: u64,
    /// Queue waited on, only while `Blocked`
    pub blocked_on: Option<QueueId>,
    /// Step invocations
    pub steps: u32,
    /// Completed cycles (returns without yield)
    pub cycles: u32,
}

impl TaskControl {
    /// Fresh READY block, due immediately
    pub fn new(id: TaskId, period_ms: u32, now_ms: u64) -> Self {
        Self {
            id,
            resume_point: 0,
            state: TaskState::Ready,
            period_ms,
            next_due: now_ms,
            blocked_on: None,
            steps: 0,
            cycles: 0,
        }
    }

    /// Ready and due at `now_ms`?
    pub fn is_eligible(&self, now_ms: u64) -> bool {
        self.state == TaskState::Ready && now_ms >= self.next_due
    }

    /// Is this a periodic task?
    pub fn is_periodic(&self) -> bool {
        self.period_ms > 0
    }

    /// Bookkeeping after a step returns.
    ///
    /// A yielded step keeps whatever state and due time it set; a task left
    /// `Running` is still runnable. A completed cycle is forced back to
    /// `Ready`, re-armed relative to `pass_ms`, and rewound to phase 0.
    pub fn finish_step(&mut self, yielded: bool, pass_ms: u64) {
        if yielded {
            if self.state == TaskState::Running {
                self.state = TaskState::Ready;
            }
            return;
        }

        self.state = TaskState::Ready;
        self.blocked_on = None;
        if self.is_periodic() {
            self.next_due = pass_ms + self.period_ms as u64;
        }
        self.resume_point = 0;
        self.cycles = self.cycles.wrapping_add(1);
    }
}

/// Fixed task table
pub struct TaskTable {
    tasks: Vec<TaskControl, MAX_TASKS>,
}

impl TaskTable {
    pub const fn new() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Append a READY task due at `now_ms`
    pub fn push(&mut self, period_ms: u32, now_ms: u64) -> Option<TaskId> {
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(TaskControl::new(id, period_ms, now_ms))
            .ok()?;
        Some(id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: TaskId) -> Option<&TaskControl> {
        self.tasks.get(id.0)
    }

    pub(crate) fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskControl> {
        self.tasks.get_mut(id.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TaskControl> {
        self.tasks.iter()
    }

    /// Park `id` on `queue`
    pub(crate) fn block_on(&mut self, id: TaskId, queue: QueueId) {
        if let Some(t) = self.get_mut(id) {
            t.state = TaskState::Blocked;
            t.blocked_on = Some(queue);
        }
    }

    /// Wake the lowest-id task blocked on `queue`, if any
    pub(crate) fn wake_first(&mut self, queue: QueueId) -> Option<TaskId> {
        let t = self
            .tasks
            .iter_mut()
            .find(|t| t.blocked_on == Some(queue))?;
        t.state = TaskState::Ready;
        t.blocked_on = None;
        Some(t.id)
    }
}

impl Default for TaskTable {
    fn default() -> Self {
        Self::new()
    }
}
