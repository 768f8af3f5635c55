// =============================================================================
// Mikan Scheduler Kernel - CPU Operations (x86_64)
// =============================================================================
//
// `X86Cpu` is the hardware side of `ksched::Cpu`. The scheduler never
// executes a privileged instruction itself; it calls these.
// =============================================================================

use ksched::{Cpu, TaskContext};
use x86_64::instructions::{hlt, interrupts};
use x86_64::registers::control::{Cr0, Cr0Flags, Cr2, Cr3, Cr4, Cr4Flags};
use x86_64::registers::segmentation::{CS, SS, Segment};

use super::context;

/// The bootstrap processor. Zero-sized; all operations act on the CPU
/// executing them.
pub struct X86Cpu;

impl Cpu for X86Cpu {
    #[inline]
    fn interrupts_enabled() -> bool {
        interrupts::are_enabled()
    }

    #[inline]
    fn disable_interrupts() {
        interrupts::disable();
    }

    #[inline]
    fn enable_interrupts() {
        interrupts::enable();
    }

    /// HLT with whatever IF the caller has. The idle task runs with IF set,
    /// so the next tick wakes it.
    #[inline]
    fn halt() {
        hlt();
    }

    fn address_space_root() -> u64 {
        let (frame, flags) = Cr3::read_raw();
        frame.start_address().as_u64() | u64::from(flags)
    }

    fn kernel_code_selector() -> u16 {
        CS::get_reg().0
    }

    fn kernel_stack_selector() -> u16 {
        SS::get_reg().0
    }

    unsafe fn switch_context(save: *mut TaskContext, load: *const TaskContext) {
        // SAFETY: forwarded from the scheduler, which masks interrupts and
        // passes contexts of live boxed tasks.
        unsafe { context::switch_context(save, load) }
    }
}

/// Turn on FXSAVE/FXRSTOR and SSE state handling.
///
/// Limine leaves CR0/CR4 FPU bits unspecified; the context switch saves and
/// restores the FXSAVE image of every task, which needs these set.
pub fn enable_sse() {
    // SAFETY: clearing EM and setting MP/OSFXSR/OSXMMEXCPT only changes how
    // FPU and SSE instructions behave; nothing relies on them trapping.
    unsafe {
        Cr0::update(|flags| {
            flags.remove(Cr0Flags::EMULATE_COPROCESSOR | Cr0Flags::TASK_SWITCHED);
            flags.insert(Cr0Flags::MONITOR_COPROCESSOR);
        });
        Cr4::update(|flags| flags.insert(Cr4Flags::OSFXSR | Cr4Flags::OSXMMEXCPT_ENABLE));
    }
}

/// Stop for good: interrupts off, HLT forever.
///
/// Used after fatal errors (double fault, panic, failed boot) where
/// nothing can continue.
pub fn halt_forever() -> ! {
    loop {
        interrupts::disable();
        hlt();
    }
}

/// Linear address of the most recent page fault.
#[inline]
pub fn read_cr2() -> u64 {
    Cr2::read_raw()
}
