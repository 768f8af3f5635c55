//! Single-core priority scheduler for the Mikan teaching kernel.
//!
//! The crate owns every execution context in the system and decides which
//! one runs next:
//!
//! - [`TaskManager`] keeps all tasks in an id-keyed arena and four ready
//!   queues, one per priority level. Level 3 always beats level 2, and so on;
//!   tasks inside one level share the CPU round robin.
//! - [`TimerManager`] turns the periodic hardware tick into timer-timeout
//!   messages and into scheduler ticks that drive preemption.
//! - [`Message`] is the only way tasks, drivers and interrupt handlers talk
//!   to each other. Task 1 is the event loop that dispatches them.
//!
//! All hardware access (interrupt flag, CR3, segment selectors, the context
//! switch itself) is behind the [`Cpu`] trait. The kernel crate implements it
//! for x86_64; unit tests use a recording mock.
#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod context;
pub mod cpu;
pub mod error;
pub mod event_loop;
pub mod kernel;
pub mod manager;
pub mod message;
pub mod sync;
pub mod task;
pub mod timer;

#[cfg(test)]
mod mock;

pub use context::TaskContext;
pub use cpu::Cpu;
pub use error::{Error, Result};
pub use event_loop::{EventHandler, EventLoop};
pub use kernel::Kernel;
pub use manager::{TaskHandle, TaskManager};
pub use message::{
    KeyPush, LayerOperation, LayerRequest, Message, MessageKind, Modifiers, Rectangle,
};
pub use sync::{InterruptGuard, IrqMutex};
pub use task::{Level, Task, TaskEntry, TaskId, TaskSnapshot};
pub use timer::{Timer, TimerManager};
