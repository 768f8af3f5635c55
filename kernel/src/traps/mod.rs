//! Interrupt and exception handling.
//!
//! Handlers reach the scheduler through one `Once` cell holding the kernel
//! context object. It is filled during boot, before the PIC lets any
//! device interrupt through.

mod handlers;
mod idt;

use ksched::Kernel;
use spin::Once;

use crate::arch::cpu::X86Cpu;

pub use idt::init_idt;

static KERNEL: Once<Kernel<X86Cpu>> = Once::new();

/// Publish the kernel context to interrupt handlers and tasks.
///
/// Only the first call stores its argument; later calls get the
/// installed instance back.
pub fn install(kernel: Kernel<X86Cpu>) -> &'static Kernel<X86Cpu> {
    KERNEL.call_once(|| kernel)
}

/// The kernel context, once `install` has run.
pub fn kernel() -> Option<&'static Kernel<X86Cpu>> {
    KERNEL.get()
}
