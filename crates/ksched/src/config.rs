//! Compile-time scheduler configuration.
//!
//! There is no runtime configuration source in this kernel; every knob is a
//! constant chosen at build time.

/// Frequency of the periodic timer interrupt, in Hz.
pub const TIMER_FREQ: u64 = 100;

/// Ticks between two scheduler ticks (20 ms at [`TIMER_FREQ`]).
pub const TASK_TIMER_PERIOD: u64 = TIMER_FREQ * 20 / 1000;

/// Timer tag reserved for the recurring scheduler tick.
pub const TASK_TIMER_VALUE: i32 = i32::MIN;

/// Tag carried by the sentinel timer that keeps the heap non-empty.
pub const SENTINEL_TIMER_VALUE: i32 = -1;

/// Size of every task's execution stack, in bytes.
pub const DEFAULT_STACK_BYTES: usize = 4096;

/// Highest priority level.
pub const MAX_LEVEL: usize = 3;

/// Number of ready queues (levels `0..=MAX_LEVEL`).
pub const LEVEL_COUNT: usize = MAX_LEVEL + 1;

/// Level reserved for the idle task.
pub const IDLE_LEVEL: usize = 0;

/// Level a task gets from `new_task()` until told otherwise.
pub const DEFAULT_LEVEL: usize = 1;

/// Initial RFLAGS for a new task: IF (bit 9) plus the always-one bit 1.
pub const INITIAL_RFLAGS: u64 = 0x202;

/// MXCSR reset value: all SIMD floating-point exceptions masked.
pub const DEFAULT_MXCSR: u32 = 0x1F80;

/// Byte offset of MXCSR inside the FXSAVE image.
pub const MXCSR_OFFSET: usize = 24;
