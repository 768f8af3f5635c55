//! Interrupt and exception handlers.
//!
//! Every gate is an interrupt gate, so handlers start with IF clear and
//! never block.

use x86_64::structures::idt::{InterruptStackFrame, PageFaultErrorCode};

use crate::arch::{cpu, pic};
use crate::config::{KEYBOARD_IRQ, TIMER_IRQ};

/// Breakpoint (INT 3): log and continue.
pub extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    log::info!("breakpoint at {:#x}", stack_frame.instruction_pointer.as_u64());
}

/// Double fault: unrecoverable.
pub extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) -> ! {
    log::error!("=== DOUBLE FAULT ===");
    log::error!("Error code: {}", error_code);
    log::error!("{:#?}", stack_frame);
    cpu::halt_forever()
}

/// Page fault: report the address and stop. Tasks share one mapping, so a
/// fault is always a kernel bug (typically a task overrunning its stack).
pub extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    log::error!("=== PAGE FAULT ===");
    log::error!("Faulting address (CR2): {:#018x}", cpu::read_cr2());
    log::error!("Error code: {:?}", error_code);
    if let Some(kernel) = super::kernel() {
        match kernel.tasks().try_current_task_id() {
            Some(id) => log::error!("Current task: {}", id),
            None => log::error!("Current task: unknown (scheduler locked)"),
        }
    }
    log::error!("{:#?}", stack_frame);
    cpu::halt_forever()
}

/// PIT tick (IRQ 0): advance the timers, acknowledge, maybe switch tasks.
///
/// A switch started here returns only when the interrupted task is picked
/// again; the final IRETQ then resumes it where the tick hit.
pub extern "x86-interrupt" fn timer_handler(_stack_frame: InterruptStackFrame) {
    match super::kernel() {
        Some(kernel) => kernel.on_timer_interrupt(|| pic::end_of_interrupt(TIMER_IRQ)),
        None => pic::end_of_interrupt(TIMER_IRQ),
    }
}

/// PS/2 keyboard (IRQ 1): wake the event loop, which reads the scancodes.
pub extern "x86-interrupt" fn keyboard_handler(_stack_frame: InterruptStackFrame) {
    if let Some(kernel) = super::kernel() {
        kernel.on_device_interrupt();
    }
    pic::end_of_interrupt(KEYBOARD_IRQ);
}
