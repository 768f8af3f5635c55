//! Scheduler error codes.

use core::fmt;

use crate::task::TaskId;

/// Errors reported by id-addressed scheduler operations.
///
/// Structural no-ops (sleeping a task that is already asleep, waking a
/// running task at its current level) are not errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// No task with this id exists.
    NoSuchTask(TaskId),
    /// The heap could not provide a task's execution stack.
    OutOfMemory { task: TaskId, bytes: usize },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NoSuchTask(id) => write!(f, "no such task: {}", id),
            Error::OutOfMemory { task, bytes } => {
                write!(f, "out of memory allocating {} byte stack for task {}", bytes, task)
            }
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
