//! What the event loop (task 1) does with each message.

use ksched::config::MAX_LEVEL;
use ksched::{EventHandler, Kernel, KeyPush, LayerRequest, TaskId, Timer};

use crate::arch::cpu::X86Cpu;
use crate::config::{BLINK_TIMER_INTERVAL, BLINK_TIMER_VALUE};
use crate::drivers::keyboard;
use crate::memory::heap;

use super::demo;

/// Event handler of the boot kernel.
///
/// - device interrupts: poll the keyboard
/// - the blink timer: toggle the cursor state and re-arm
/// - key pushes: log them; `t` dumps the task table
/// - layer requests: count and log them (the loop answers with
///   `LayerFinish` itself)
#[derive(Default)]
pub struct KernelEvents {
    cursor_visible: bool,
    layer_requests: u64,
}

impl KernelEvents {
    pub fn new() -> Self {
        Self::default()
    }

    fn dump_tasks(&self, kernel: &Kernel<X86Cpu>) {
        let tasks = kernel.tasks();
        log::info!(
            "tick {}: {} tasks, current {} at level {}, heap {} / {} bytes",
            kernel.current_tick(),
            tasks.task_count(),
            tasks.current_task_id(),
            tasks.current_level(),
            heap::allocated_bytes(),
            heap::total_bytes(),
        );
        for id in tasks.task_ids() {
            if let Ok(snap) = tasks.snapshot(id) {
                log::info!(
                    "  task {:>3}  level {}  {:<8}  {} pending",
                    snap.id,
                    snap.level,
                    if snap.running { "running" } else { "sleeping" },
                    snap.pending_messages
                );
            }
        }
        for level in (0..=MAX_LEVEL).rev() {
            log::info!("  ready[{}] = {:?}", level, tasks.ready_queue(level));
        }
        log::info!("  counter {}, layer requests {}", demo::counter_value(), self.layer_requests);
    }
}

impl EventHandler<X86Cpu> for KernelEvents {
    fn on_device_interrupt(&mut self, kernel: &Kernel<X86Cpu>) {
        keyboard::poll(kernel.tasks());
    }

    fn on_timer_timeout(&mut self, kernel: &Kernel<X86Cpu>, timeout: u64, value: i32) {
        if value != BLINK_TIMER_VALUE {
            log::debug!("events: timer {} fired at tick {}", value, timeout);
            return;
        }
        self.cursor_visible = !self.cursor_visible;
        log::trace!("events: cursor {}", if self.cursor_visible { "on" } else { "off" });
        kernel.add_timer(Timer::new(timeout + BLINK_TIMER_INTERVAL, BLINK_TIMER_VALUE));
    }

    fn on_key_push(&mut self, kernel: &Kernel<X86Cpu>, key: KeyPush) {
        let ch = if key.ascii.is_ascii_graphic() { key.ascii as char } else { '.' };
        let ctrl = if key.modifier.control() { "C-" } else { "" };
        let shift = if key.modifier.shift() { "S-" } else { "" };
        log::info!(
            "key: code {:#04x} {}{}'{}' modifiers {:?}",
            key.keycode,
            ctrl,
            shift,
            ch,
            key.modifier
        );
        if key.ascii == b't' {
            self.dump_tasks(kernel);
        }
    }

    fn on_layer(&mut self, _kernel: &Kernel<X86Cpu>, source: TaskId, request: LayerRequest) {
        self.layer_requests += 1;
        if self.layer_requests % 100 == 1 {
            log::debug!(
                "events: {:?} layer {} {:?} from task {} ({} requests so far)",
                request.op,
                request.layer_id,
                request.area,
                source,
                self.layer_requests
            );
        }
    }
}
