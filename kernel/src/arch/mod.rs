// =============================================================================
// Mikan Scheduler Kernel - Architecture Selection
// =============================================================================
//
// Only x86_64 exists. The rest of the kernel names `crate::arch::*` so that
// the scheduler glue never spells out the architecture.
// =============================================================================

#[cfg(target_arch = "x86_64")]
pub mod x86_64;

#[cfg(target_arch = "x86_64")]
pub use x86_64::*;
