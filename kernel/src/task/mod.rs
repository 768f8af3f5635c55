//! Kernel tasks: the event loop's handler and the demo workers started at
//! boot.

pub mod demo;
pub mod events;

pub use demo::spawn_demo_tasks;
pub use events::KernelEvents;
