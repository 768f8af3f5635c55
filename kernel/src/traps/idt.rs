//! IDT setup.

use spin::Once;
use x86_64::structures::idt::InterruptDescriptorTable;

use super::handlers;
use crate::config::{KEYBOARD_VECTOR, TIMER_VECTOR};

static IDT: Once<InterruptDescriptorTable> = Once::new();

/// Build and load the IDT: three exception handlers plus the two PIC
/// lines the kernel uses (timer, keyboard).
///
/// The GDT is the one Limine installed; its kernel code selector is what
/// `set_handler_fn` records for every gate.
pub fn init_idt() {
    let idt = IDT.call_once(|| {
        let mut idt = InterruptDescriptorTable::new();
        idt.breakpoint.set_handler_fn(handlers::breakpoint_handler);
        idt.double_fault.set_handler_fn(handlers::double_fault_handler);
        idt.page_fault.set_handler_fn(handlers::page_fault_handler);
        idt[TIMER_VECTOR].set_handler_fn(handlers::timer_handler);
        idt[KEYBOARD_VECTOR].set_handler_fn(handlers::keyboard_handler);
        idt
    });
    idt.load();
    log::debug!("idt: loaded (timer {}, keyboard {})", TIMER_VECTOR, KEYBOARD_VECTOR);
}
