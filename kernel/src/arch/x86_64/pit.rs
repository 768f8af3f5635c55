//! 8253/8254 PIT channel 0 as the periodic tick source.

use x86_64::instructions::port::Port;

use crate::config::PIT_BASE_HZ;

const CHANNEL0_DATA: u16 = 0x40;
const MODE_COMMAND: u16 = 0x43;

/// Channel 0, lobyte/hibyte access, mode 2 (rate generator), binary.
const CHANNEL0_RATE_GENERATOR: u8 = 0b0011_0100;

/// Reload value for `hz` interrupts per second, clamped to the 16-bit
/// counter.
pub const fn divisor(hz: u64) -> u16 {
    let raw = PIT_BASE_HZ / hz;
    if raw > u16::MAX as u64 {
        u16::MAX
    } else if raw == 0 {
        1
    } else {
        raw as u16
    }
}

/// Start IRQ 0 firing `hz` times per second.
pub fn init(hz: u64) {
    let [low, high] = divisor(hz).to_le_bytes();
    let mut command = Port::<u8>::new(MODE_COMMAND);
    let mut data = Port::<u8>::new(CHANNEL0_DATA);
    // SAFETY: PIT programming sequence: mode byte, then reload low/high.
    unsafe {
        command.write(CHANNEL0_RATE_GENERATOR);
        data.write(low);
        data.write(high);
    }
    log::debug!("pit: {} Hz (divisor {})", hz, divisor(hz));
}
