// =============================================================================
// Mikan Scheduler Kernel - Utilities
// =============================================================================
//
//   logger.rs - kprint!/kprintln! and the `log` backend over COM1
//   panic.rs  - panic handler
// =============================================================================

pub mod logger;
pub mod panic;
