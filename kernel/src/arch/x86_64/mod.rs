// =============================================================================
// Mikan Scheduler Kernel - x86_64 Hardware Layer
// =============================================================================
//
// All inline assembly and port I/O of the kernel lives below this module.
//
//   boot.rs     - Limine requests (base revision, load address)
//   cpu.rs      - `X86Cpu`, the `ksched::Cpu` implementation; HLT helpers
//   context.rs  - `switch_context` assembly (full register + FXSAVE swap)
//   serial.rs   - COM1 UART, polled
//   pic.rs      - 8259 PIC remap, masks and EOI
//   pit.rs      - 8253/8254 PIT channel 0 as the periodic tick
// =============================================================================

pub mod boot;
pub mod context;
pub mod cpu;
pub mod pic;
pub mod pit;
pub mod serial;
