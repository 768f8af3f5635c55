// =============================================================================
// Mikan Scheduler Kernel - Device Drivers
// =============================================================================
//
// Drivers do not run in interrupt context. Their interrupt handler only
// posts a DeviceInterrupt message; the event loop then calls the driver's
// `poll`, which talks to the hardware and turns what it finds into messages.
//
//   keyboard.rs - PS/2 keyboard (IRQ 1) → KeyPush
// =============================================================================

pub mod keyboard;
