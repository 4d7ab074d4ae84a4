//! Kernel error taxonomy
//!
//! Every fallible kernel call returns its error synchronously to the caller.
//! Nothing is retried internally: retry belongs to the task's own state machine.

/// Errors returned by registration and queue operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// A fixed-size table (tasks or queues) is full
    #[error("fixed capacity exceeded")]
    CapacityExceeded,
    /// Bad queue id, empty payload, or payload larger than the item size
    #[error("invalid argument")]
    InvalidArgument,
    /// Queue is empty; the caller should yield and retry on a later pass
    #[error("operation would block")]
    WouldBlock,
    /// Registration attempted after the dispatch loop started
    #[error("scheduler already started")]
    AlreadyStarted,
}

impl Error {
    /// Is this the normal "queue empty, yield and retry" signal?
    pub fn is_would_block(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }
}

/// Kernel result alias
pub type Result<T> = core::result::Result<T, Error>;
