// =============================================================================
// Mikan Scheduler Kernel - Entry Point
// =============================================================================
//
// WHAT HAPPENED BEFORE WE GOT HERE:
//   Limine switched to long mode, mapped the kernel in the higher half,
//   filled in our requests and jumped to `kmain` on its own stack, with
//   interrupts disabled.
//
// WHAT WE DO HERE:
//   Phase 1: "Can Speak"    → COM1 + `log` backend
//   Phase 2: "Can Remember" → kernel heap
//   Phase 3: "Can Listen"   → IDT, PIC remap
//   Phase 4: "Can Think"    → scheduler: this thread becomes task 1, the
//                             idle task and the demo workers are created
//   Phase 5: "Alive"        → keyboard + PIT on, interrupts on, and task 1
//                             turns into the event loop for good
//
// From phase 5 on, the PIT drives `Kernel::tick` 100 times a second and
// every second tick preempts the running task.
// =============================================================================

#![no_std]
#![no_main]
#![feature(abi_x86_interrupt)]

extern crate alloc;

mod arch;
mod config;
mod drivers;
mod memory;
mod sync;
mod task;
mod traps;
mod util;

use ksched::config::TIMER_FREQ;
use ksched::{EventLoop, Kernel, Timer};

use arch::cpu::{self, X86Cpu};
use arch::serial::SERIAL;
use arch::{boot, pic, pit};
use config::{BLINK_TIMER_INTERVAL, BLINK_TIMER_VALUE, TIMER_IRQ};

/// Kernel entry point, jumped to by Limine. Never returns.
#[unsafe(no_mangle)]
extern "C" fn kmain() -> ! {
    // =========================================================================
    // PHASE 1: "Can Speak"
    // =========================================================================
    let uart_ok = SERIAL.lock().init();
    util::logger::init(config::LOG_LEVEL);

    kprintln!();
    kprintln!("==========================================================");
    kprintln!("  Mikan Scheduler Kernel v{}", env!("CARGO_PKG_VERSION"));
    kprintln!("  Single-core priority scheduler for x86_64");
    kprintln!("==========================================================");
    kprintln!();
    if !uart_ok {
        log::warn!("serial: loopback self-test failed");
    }

    if !boot::revision_supported() {
        log::error!("boot: Limine base revision not supported");
        cpu::halt_forever();
    }
    if let Some((phys, virt)) = boot::kernel_address() {
        log::info!("boot: kernel at phys {:#x}, virt {:#x}", phys, virt);
    }

    // =========================================================================
    // PHASE 2: "Can Remember"
    // =========================================================================
    memory::heap::init();
    cpu::enable_sse();

    // =========================================================================
    // PHASE 3: "Can Listen"
    // =========================================================================
    traps::init_idt();
    pic::init();

    // =========================================================================
    // PHASE 4: "Can Think"
    // =========================================================================
    let kernel = match Kernel::<X86Cpu>::new() {
        Ok(kernel) => traps::install(kernel),
        Err(e) => {
            log::error!("sched: {}", e);
            cpu::halt_forever();
        }
    };
    if let Err(e) = task::spawn_demo_tasks(kernel) {
        log::error!("sched: {}", e);
        cpu::halt_forever();
    }
    kernel.add_timer(Timer::new(
        kernel.current_tick() + BLINK_TIMER_INTERVAL,
        BLINK_TIMER_VALUE,
    ));

    // =========================================================================
    // PHASE 5: "Alive"
    // =========================================================================
    drivers::keyboard::init();
    pit::init(TIMER_FREQ);
    pic::unmask(TIMER_IRQ);

    log::info!(
        "boot: {} tasks, heap {} / {} bytes in use",
        kernel.tasks().task_count(),
        memory::heap::allocated_bytes(),
        memory::heap::total_bytes()
    );
    kprintln!("Press 't' for the task table.");

    x86_64::instructions::interrupts::enable();
    EventLoop::new(kernel, task::KernelEvents::new()).run()
}
