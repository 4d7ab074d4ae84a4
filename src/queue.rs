//! Fixed-capacity message queues with overwrite-oldest send
//!
//! Each queue is a ring of fixed-size byte slots. Sends never block and
//! never fail because the queue is full: the oldest unread item is evicted
//! first. Receives on an empty queue park the running task, and every send
//! wakes at most one parked task (the lowest id).

use heapless::Vec;
use log::debug;

use crate::error::{Error, Result};
use crate::task::{TaskId, TaskTable};

/// Maximum queues the kernel can manage
pub const MAX_QUEUES: usize = 4;
/// Maximum slots per queue
pub const MAX_QUEUE_SLOTS: usize = 16;
/// Maximum bytes per slot
pub const MAX_ITEM_SIZE: usize = 16;

/// Dense queue index, assigned at creation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QueueId(pub usize);

/// Ring buffer of fixed-size items
///
/// Storage is sized for the largest queue; `capacity` and `item_size`
/// bound the part in use. Size: MAX_QUEUE_SLOTS × MAX_ITEM_SIZE + 48 bytes
pub struct MessageQueue {
    buffer: [[u8; MAX_ITEM_SIZE]; MAX_QUEUE_SLOTS],
    /// Oldest occupied slot
    head: usize,
    /// Next slot to write
    tail: usize,
    /// Occupied slots
    count: usize,
    capacity: usize,
    item_size: usize,
    /// Items evicted by overwrite-oldest
    evicted: u32,
}

impl MessageQueue {
    /// Create an empty queue
    pub fn new(capacity: usize, item_size: usize) -> Result<Self> {
        if capacity == 0
            || capacity > MAX_QUEUE_SLOTS
            || item_size == 0
            || item_size > MAX_ITEM_SIZE
        {
            return Err(Error::InvalidArgument);
        }
        Ok(Self {
            buffer: [[0u8; MAX_ITEM_SIZE]; MAX_QUEUE_SLOTS],
            head: 0,
            tail: 0,
            count: 0,
            capacity,
            item_size,
            evicted: 0,
        })
    }

    /// Write one item, evicting the oldest if full.
    ///
    /// Returns `true` if an item was evicted to make room.
    pub fn push(&mut self, data: &[u8]) -> Result<bool> {
        if data.is_empty() || data.len() > self.item_size {
            return Err(Error::InvalidArgument);
        }

        let evicted = self.count == self.capacity;
        if evicted {
            self.head = (self.head + 1) % self.capacity;
            self.count -= 1;
            self.evicted = self.evicted.wrapping_add(1);
        }

        let slot = &mut self.buffer[self.tail][..self.item_size];
        slot.fill(0);
        slot[..data.len()].copy_from_slice(data);
        self.tail = (self.tail + 1) % self.capacity;
        self.count += 1;
        Ok(evicted)
    }

    /// Read the oldest item into `out`.
    ///
    /// Copies `out.len()` bytes of the slot; `WouldBlock` when empty.
    pub fn pop(&mut self, out: &mut [u8]) -> Result<()> {
        if out.is_empty() || out.len() > self.item_size {
            return Err(Error::InvalidArgument);
        }
        if self.count == 0 {
            return Err(Error::WouldBlock);
        }

        let n = out.len();
        out.copy_from_slice(&self.buffer[self.head][..n]);
        self.head = (self.head + 1) % self.capacity;
        self.count -= 1;
        Ok(())
    }

    /// Number of items in the queue
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn item_size(&self) -> usize {
        self.item_size
    }

    pub fn head(&self) -> usize {
        self.head
    }

    pub fn tail(&self) -> usize {
        self.tail
    }

    /// Items lost to overwrite-oldest since creation
    pub fn evicted(&self) -> u32 {
        self.evicted
    }
}

/// All queues of a kernel, indexed by `QueueId`
pub struct QueueSet {
    queues: Vec<MessageQueue, MAX_QUEUES>,
}

impl QueueSet {
    pub const fn new() -> Self {
        Self { queues: Vec::new() }
    }

    /// Add a queue; `CapacityExceeded` when all queue slots are used
    pub fn create(&mut self, capacity: usize, item_size: usize) -> Result<QueueId> {
        let queue = MessageQueue::new(capacity, item_size)?;
        let id = QueueId(self.queues.len());
        self.queues
            .push(queue)
            .map_err(|_| Error::CapacityExceeded)?;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.queues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queues.is_empty()
    }

    pub fn get(&self, id: QueueId) -> Option<&MessageQueue> {
        self.queues.get(id.0)
    }

    /// Send `data` to `id`, then wake the lowest-id task blocked on it
    pub fn send(&mut self, id: QueueId, data: &[u8], tasks: &mut TaskTable) -> Result<()> {
        let queue = self.queues.get_mut(id.0).ok_or(Error::InvalidArgument)?;
        if queue.push(data)? {
            debug!("queue {}: full, oldest item evicted", id.0);
        }
        if let Some(woken) = tasks.wake_first(id) {
            debug!("queue {}: woke task {}", id.0, woken.0);
        }
        Ok(())
    }

    /// Receive from `id` into `out`.
    ///
    /// On an empty queue the `running` task, if any, is parked on `id` and
    /// `WouldBlock` is returned; the caller must still yield.
    pub fn receive(
        &mut self,
        id: QueueId,
        out: &mut [u8],
        tasks: &mut TaskTable,
        running: Option<TaskId>,
    ) -> Result<()> {
        let queue = self.queues.get_mut(id.0).ok_or(Error::InvalidArgument)?;
        match queue.pop(out) {
            Err(Error::WouldBlock) => {
                if let Some(task) = running {
                    tasks.block_on(task, id);
                    debug!("task {} blocked on queue {}", task.0, id.0);
                }
                Err(Error::WouldBlock)
            }
            other => other,
        }
    }
}

impl Default for QueueSet {
    fn default() -> Self {
        Self::new()
    }
}
