//! Memory management.
//!
//! All tasks share the address space Limine built, so the only thing the
//! kernel manages itself is the heap behind `alloc`.

pub mod heap;
