//! Legacy 8259 PIC pair.
//!
//! Out of reset the PIC delivers IRQ 0-7 on vectors 8-15, on top of the CPU
//! exceptions. `init` moves IRQ 0-15 to vectors 32-47 and masks every line;
//! drivers unmask the lines they handle.

use x86_64::instructions::port::Port;

use crate::config::{PIC1_OFFSET, PIC2_OFFSET};

const PIC1_COMMAND: u16 = 0x20;
const PIC1_DATA: u16 = 0x21;
const PIC2_COMMAND: u16 = 0xA0;
const PIC2_DATA: u16 = 0xA1;

/// ICW1: start initialization, ICW4 follows.
const ICW1_INIT: u8 = 0x11;
/// ICW4: 8086 mode.
const ICW4_8086: u8 = 0x01;
/// OCW2: non-specific end of interrupt.
const EOI: u8 = 0x20;

/// IRQ line of the master cascade input.
const CASCADE_IRQ: u8 = 2;

fn outb(port: u16, value: u8) {
    // SAFETY: PIC command/data ports and the POST diagnostic port only.
    unsafe { Port::<u8>::new(port).write(value) }
}

fn inb(port: u16) -> u8 {
    // SAFETY: reading a PIC mask register has no side effect.
    unsafe { Port::<u8>::new(port).read() }
}

/// A few hundred nanoseconds of delay for old PICs between commands.
fn io_wait() {
    outb(0x80, 0);
}

/// Remap both PICs and mask all lines.
pub fn init() {
    outb(PIC1_COMMAND, ICW1_INIT);
    io_wait();
    outb(PIC2_COMMAND, ICW1_INIT);
    io_wait();

    outb(PIC1_DATA, PIC1_OFFSET);
    io_wait();
    outb(PIC2_DATA, PIC2_OFFSET);
    io_wait();

    outb(PIC1_DATA, 1 << CASCADE_IRQ);
    io_wait();
    outb(PIC2_DATA, CASCADE_IRQ);
    io_wait();

    outb(PIC1_DATA, ICW4_8086);
    io_wait();
    outb(PIC2_DATA, ICW4_8086);
    io_wait();

    outb(PIC1_DATA, 0xFF);
    outb(PIC2_DATA, 0xFF);
    log::debug!("pic: remapped to vectors {}..{}", PIC1_OFFSET, PIC2_OFFSET + 8);
}

/// Let `irq` (0-15) through.
pub fn unmask(irq: u8) {
    if irq < 8 {
        outb(PIC1_DATA, inb(PIC1_DATA) & !(1 << irq));
    } else {
        outb(PIC2_DATA, inb(PIC2_DATA) & !(1 << (irq - 8)));
        outb(PIC1_DATA, inb(PIC1_DATA) & !(1 << CASCADE_IRQ));
    }
}

/// Acknowledge `irq` so the PIC can deliver the next one.
pub fn end_of_interrupt(irq: u8) {
    if irq >= 8 {
        outb(PIC2_COMMAND, EOI);
    }
    outb(PIC1_COMMAND, EOI);
}
