// =============================================================================
// Mikan Scheduler Kernel - Synchronization
// =============================================================================
//
// The kernel runs on one core, so the only concurrency is an interrupt
// handler cutting into task code. Every lock is therefore an interrupt mask
// plus a spin::Mutex, provided by `ksched` and bound to the real CPU here.
//
// Lock order (outermost first):
//   1. kernel timers       (`Kernel::tick` delivers into task queues)
//   2. scheduler state
//   3. keyboard decoder
//   4. heap, serial        (leaves: taken by anything, take nothing)
//
// Never keep any of these locked across a context switch.
// =============================================================================

use crate::arch::cpu::X86Cpu;

/// Interrupt-masking mutex on the boot CPU.
pub type IrqMutex<T> = ksched::IrqMutex<T, X86Cpu>;
