// =============================================================================
// Mikan Scheduler Kernel - Serial UART Driver (COM1)
// =============================================================================
//
// The first output device to come up and the one the logger writes to. It
// needs no heap, no interrupts and no page tables: only port I/O.
//
// HARDWARE:
//   16550 UART at I/O base 0x3F8.
//
//   Port    │ Read              │ Write
//   ────────┼───────────────────┼──────────────────
//   +0      │ Receive Buffer    │ Transmit Holding
//   +1      │ Interrupt Enable  │ Interrupt Enable
//   +2      │ Interrupt ID      │ FIFO Control
//   +3      │ Line Control      │ Line Control
//   +4      │ Modem Control     │ Modem Control
//   +5      │ Line Status       │ (factory test)
//
//   With DLAB set in Line Control, +0/+1 are the baud divisor.
//   Configured as 115200 baud, 8N1, polled.
//
// LOCKING:
//   The port sits in an `IrqMutex`: the timer handler may log while a task
//   is halfway through a line, and masking interrupts around each write keeps
//   lines whole.
// =============================================================================

use core::fmt;
use x86_64::instructions::port::Port;

use crate::sync::IrqMutex;

pub const COM1_BASE: u16 = 0x3F8;

const DATA_REG: u16 = 0;
const INT_ENABLE_REG: u16 = 1;
const FIFO_CTRL_REG: u16 = 2;
const LINE_CTRL_REG: u16 = 3;
const MODEM_CTRL_REG: u16 = 4;
const LINE_STATUS_REG: u16 = 5;

/// Transmit holding register empty.
const LSR_TX_EMPTY: u8 = 1 << 5;

/// COM1, used by `kprint!` and the `log` backend.
pub static SERIAL: IrqMutex<SerialPort> = IrqMutex::new(SerialPort::new(COM1_BASE));

pub struct SerialPort {
    base: u16,
}

impl SerialPort {
    pub const fn new(base: u16) -> Self {
        Self { base }
    }

    /// Program the UART: 115200 baud, 8N1, FIFOs on, loopback self-test.
    ///
    /// Returns `false` if the loopback byte did not come back; the port is
    /// left configured anyway, since there is no other output to complain to.
    pub fn init(&mut self) -> bool {
        self.write_port(INT_ENABLE_REG, 0x00);

        self.write_port(LINE_CTRL_REG, 0x80); // DLAB on
        self.write_port(DATA_REG, 0x01); // divisor low: 115200 baud
        self.write_port(INT_ENABLE_REG, 0x00); // divisor high
        self.write_port(LINE_CTRL_REG, 0x03); // 8N1, DLAB off

        self.write_port(FIFO_CTRL_REG, 0xC7); // enable + clear, 14-byte trigger
        self.write_port(MODEM_CTRL_REG, 0x0B); // DTR + RTS + OUT2

        self.write_port(MODEM_CTRL_REG, 0x1E); // loopback
        self.write_port(DATA_REG, 0xAE);
        let echoed = self.read_port(DATA_REG) == 0xAE;

        self.write_port(MODEM_CTRL_REG, 0x0F);
        echoed
    }

    pub fn write_byte(&mut self, byte: u8) {
        while self.read_port(LINE_STATUS_REG) & LSR_TX_EMPTY == 0 {
            core::hint::spin_loop();
        }
        self.write_port(DATA_REG, byte);
    }

    /// Write `s`, turning `\n` into CRLF for serial terminals.
    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            if byte == b'\n' {
                self.write_byte(b'\r');
            }
            self.write_byte(byte);
        }
    }

    fn read_port(&mut self, offset: u16) -> u8 {
        let mut port = Port::<u8>::new(self.base + offset);
        // SAFETY: COM1 registers; reads have no side effect beyond the UART.
        unsafe { port.read() }
    }

    fn write_port(&mut self, offset: u16, value: u8) {
        let mut port = Port::<u8>::new(self.base + offset);
        // SAFETY: COM1 registers, written in the documented init sequence.
        unsafe { port.write(value) }
    }
}

impl fmt::Write for SerialPort {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}
