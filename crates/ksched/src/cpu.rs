//! The hardware seam between the scheduler and the processor.

use crate::context::TaskContext;

/// Processor operations the scheduler depends on.
///
/// Everything here is an associated function: there is exactly one CPU, and
/// implementations are zero-sized markers (`X86Cpu` in the kernel, a
/// recording mock in tests).
pub trait Cpu: 'static {
    /// Whether maskable interrupts are currently enabled.
    fn interrupts_enabled() -> bool;

    /// Mask maskable interrupts (`cli`).
    fn disable_interrupts();

    /// Unmask maskable interrupts (`sti`).
    fn enable_interrupts();

    /// Stop until the next interrupt. Used by the idle task.
    fn halt();

    /// The active address-space root (CR3). All tasks share it.
    fn address_space_root() -> u64;

    /// Kernel code segment selector loaded into a new task's CS.
    fn kernel_code_selector() -> u16;

    /// Kernel stack segment selector loaded into a new task's SS.
    fn kernel_stack_selector() -> u16;

    /// Save the full CPU state into `save`, load `load` and resume there.
    ///
    /// Returns only when some later switch loads `save` again.
    ///
    /// # Safety
    /// Both pointers must reference live, 16-byte aligned contexts; `load`
    /// must hold either a state saved by this function or one prepared by
    /// `Task::init_context`. Interrupts must be masked: a nested switch
    /// corrupts both records.
    unsafe fn switch_context(save: *mut TaskContext, load: *const TaskContext);
}
