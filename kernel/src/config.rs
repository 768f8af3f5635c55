//! Build-time kernel settings.
//!
//! Scheduler constants (tick rate, scheduler period, stack size, levels) live
//! in `ksched::config`; this module only holds what the hardware glue needs.

/// Most verbose log level compiled into the serial logger.
pub const LOG_LEVEL: log::LevelFilter = log::LevelFilter::Debug;

/// Size of the static kernel heap arena.
pub const HEAP_SIZE: usize = 1024 * 1024;

/// Input clock of the 8253/8254 PIT.
pub const PIT_BASE_HZ: u64 = 1_193_182;

/// First vector of the master PIC after remapping.
pub const PIC1_OFFSET: u8 = 32;
/// First vector of the slave PIC after remapping.
pub const PIC2_OFFSET: u8 = PIC1_OFFSET + 8;

pub const TIMER_IRQ: u8 = 0;
pub const KEYBOARD_IRQ: u8 = 1;

pub const TIMER_VECTOR: u8 = PIC1_OFFSET + TIMER_IRQ;
pub const KEYBOARD_VECTOR: u8 = PIC1_OFFSET + KEYBOARD_IRQ;

/// Tag of the event loop's recurring demo timer.
pub const BLINK_TIMER_VALUE: i32 = 1;
/// Ticks between two firings of the demo timer (0.5 s at 100 Hz).
pub const BLINK_TIMER_INTERVAL: u64 = ksched::config::TIMER_FREQ / 2;

/// Layer the demo drawing task repaints.
pub const DEMO_LAYER_ID: u32 = 1;
