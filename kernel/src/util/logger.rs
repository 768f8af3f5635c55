// =============================================================================
// Mikan Scheduler Kernel - Serial Logger
// =============================================================================
//
// Two ways to get text out of the kernel, both over COM1:
//
//   kprint!/kprintln!  raw formatted output, for banners and panic reports.
//                      Works from the first instruction after serial init.
//
//   log::{error,warn,info,debug,trace}!
//                      the `log` facade. `init()` installs `SerialLogger`,
//                      which prefixes each record with a coloured level tag
//                      and the module path:
//
//                        [ INFO] mikan_kernel::tasks: event loop started
//
// `ksched` logs through the same facade, so scheduler messages come out
// interleaved with kernel messages in one stream.
//
// Each line is written under one `SERIAL` lock hold, i.e. with interrupts
// masked, so a timer tick cannot split a line in half.
// =============================================================================

use core::fmt::{self, Write};

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::arch::serial::SERIAL;

#[doc(hidden)]
pub fn _kprint(args: fmt::Arguments) {
    let _ = SERIAL.lock().write_fmt(args);
}

/// Formatted output to COM1, no newline.
#[macro_export]
macro_rules! kprint {
    ($($arg:tt)*) => {
        $crate::util::logger::_kprint(format_args!($($arg)*))
    };
}

/// Formatted output to COM1 followed by a newline.
#[macro_export]
macro_rules! kprintln {
    () => {
        $crate::kprint!("\n")
    };
    ($($arg:tt)*) => {
        $crate::kprint!("{}\n", format_args!($($arg)*))
    };
}

fn tag(level: Level) -> (&'static str, &'static str) {
    match level {
        Level::Error => ("\x1b[31m", "ERROR"),
        Level::Warn => ("\x1b[33m", " WARN"),
        Level::Info => ("\x1b[32m", " INFO"),
        Level::Debug => ("\x1b[36m", "DEBUG"),
        Level::Trace => ("\x1b[90m", "TRACE"),
    }
}

struct SerialLogger;

impl Log for SerialLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= LevelFilter::max()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let (color, name) = tag(record.level());
        let mut serial = SERIAL.lock();
        let _ = writeln!(
            serial,
            "{}[{}]\x1b[0m {}: {}",
            color,
            name,
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

static LOGGER: SerialLogger = SerialLogger;

/// Install the serial backend for the `log` facade.
///
/// Call once, after the UART is initialised. A second call keeps the first
/// logger and reports it.
pub fn init(level: LevelFilter) {
    match log::set_logger(&LOGGER) {
        Ok(()) => log::set_max_level(level),
        Err(_) => kprintln!("[logger] already installed"),
    }
}
