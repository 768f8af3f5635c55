//! Task records: stack, saved context, message queue and scheduling state.

use alloc::collections::VecDeque;
use alloc::vec::Vec;
use core::fmt;
use core::mem::size_of;

use crate::config::{DEFAULT_LEVEL, DEFAULT_MXCSR, DEFAULT_STACK_BYTES, INITIAL_RFLAGS, MAX_LEVEL};
use crate::context::TaskContext;
use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::message::Message;

/// Scheduling priority class, `0` (idle only) through [`MAX_LEVEL`].
pub type Level = usize;

/// Entry point of a task.
///
/// Receives the task's own id and the argument given to `init_context`.
/// Tasks never exit.
pub type TaskEntry = extern "C" fn(task_id: u64, arg: i64) -> !;

/// Unique task identifier. Assigned once, in increasing order, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(pub u64);

impl TaskId {
    /// Sender id used for messages raised by interrupt handlers.
    pub const KERNEL: TaskId = TaskId(0);
    /// The event-loop task: the boot thread, adopted as the first task.
    pub const EVENT_LOOP: TaskId = TaskId(1);

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One execution context.
pub struct Task {
    id: TaskId,
    level: Level,
    /// True while the task sits in a ready queue.
    running: bool,
    stack: Vec<u64>,
    context: TaskContext,
    messages: VecDeque<Message>,
}

impl Task {
    pub(crate) fn new(id: TaskId) -> Self {
        Self {
            id,
            level: DEFAULT_LEVEL,
            running: false,
            stack: Vec::new(),
            context: TaskContext::zeroed(),
            messages: VecDeque::new(),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn level(&self) -> Level {
        self.level
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn context(&self) -> &TaskContext {
        &self.context
    }

    pub fn pending_messages(&self) -> usize {
        self.messages.len()
    }

    /// Bytes of stack owned by this task (`0` before `init_context`).
    pub fn stack_bytes(&self) -> usize {
        self.stack.len() * size_of::<u64>()
    }

    /// Prepare the task to start at `entry(id, arg)` on its own stack.
    ///
    /// The context is laid out as if `entry` had just been called: RSP sits
    /// 8 bytes below a 16-byte boundary. The task shares the current address
    /// space and starts with interrupts enabled.
    pub fn init_context<C: Cpu>(&mut self, entry: TaskEntry, arg: i64) -> Result<&mut Self> {
        let words = DEFAULT_STACK_BYTES / size_of::<u64>();
        self.stack.clear();
        self.stack
            .try_reserve_exact(words)
            .map_err(|_| Error::OutOfMemory {
                task: self.id,
                bytes: DEFAULT_STACK_BYTES,
            })?;
        self.stack.resize(words, 0);
        let stack_end = self.stack.as_ptr_range().end as u64;

        self.context = TaskContext::zeroed();
        self.context.rip = entry as usize as u64;
        self.context.rdi = self.id.as_u64();
        self.context.rsi = arg as u64;

        self.context.cr3 = C::address_space_root();
        self.context.rflags = INITIAL_RFLAGS;
        self.context.cs = u64::from(C::kernel_code_selector());
        self.context.ss = u64::from(C::kernel_stack_selector());
        self.context.rsp = (stack_end & !0xF) - 8;

        self.context.set_mxcsr(DEFAULT_MXCSR);

        log::trace!(
            "task {}: context at rip={:#x} rsp={:#x}",
            self.id,
            self.context.rip,
            self.context.rsp
        );
        Ok(self)
    }

    pub(crate) fn set_level(&mut self, level: Level) {
        self.level = level.min(MAX_LEVEL);
    }

    pub(crate) fn set_running(&mut self, running: bool) {
        self.running = running;
    }

    pub(crate) fn context_mut(&mut self) -> &mut TaskContext {
        &mut self.context
    }

    pub(crate) fn push_message(&mut self, msg: Message) {
        self.messages.push_back(msg);
    }

    /// Non-blocking: the oldest pending message, if any.
    pub(crate) fn receive_message(&mut self) -> Option<Message> {
        self.messages.pop_front()
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            level: self.level,
            running: self.running,
            pending_messages: self.messages.len(),
            stack_bytes: self.stack_bytes(),
        }
    }
}

/// Copy of a task's scheduling state, for logging and inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub level: Level,
    pub running: bool,
    pub pending_messages: usize,
    /// `0` until `init_context` gives the task a stack.
    pub stack_bytes: usize,
}
