// =============================================================================
// Mikan Scheduler Kernel - Panic Handler
// =============================================================================
//
// A kernel panic is fatal: print where and why, then stop the CPU.
//
// The report goes straight to the serial port with `try_lock`. If the panic
// hit while the port was locked (inside the logger, say), spinning on it
// would hang forever with interrupts masked, so the report is written
// through a fresh unlocked handle to the same UART instead. A garbled line
// beats a silent hang.
// =============================================================================

use core::fmt::Write;
use core::panic::PanicInfo;

use crate::arch::cpu;
use crate::arch::serial::{COM1_BASE, SERIAL, SerialPort};

fn report(out: &mut dyn Write, info: &PanicInfo) {
    let _ = writeln!(out);
    let _ = writeln!(out, "==========================================================");
    let _ = writeln!(out, "  KERNEL PANIC");
    let _ = writeln!(out, "==========================================================");
    match info.location() {
        Some(location) => {
            let _ = writeln!(out, "  Location: {}:{}", location.file(), location.line());
        }
        None => {
            let _ = writeln!(out, "  Location: <unknown>");
        }
    }
    let _ = writeln!(out, "  Message: {}", info.message());
    let _ = writeln!(out, "==========================================================");
    let _ = writeln!(out, "  System halted.");
}

#[panic_handler]
fn panic(info: &PanicInfo) -> ! {
    x86_64::instructions::interrupts::disable();
    match SERIAL.try_lock() {
        Some(mut serial) => report(&mut *serial, info),
        None => report(&mut SerialPort::new(COM1_BASE), info),
    }
    cpu::halt_forever()
}
