//! The kernel context object: the task manager and the timer heap, built
//! once during boot and shared with the interrupt handlers.

use crate::config::{TASK_TIMER_PERIOD, TASK_TIMER_VALUE};
use crate::cpu::Cpu;
use crate::error::Result;
use crate::manager::TaskManager;
use crate::message::Message;
use crate::sync::IrqMutex;
use crate::task::TaskId;
use crate::timer::{Timer, TimerManager};

/// Scheduler-side kernel state.
///
/// Lock order is timers, then tasks: a tick delivers timeouts while holding
/// the timer heap. Nothing takes the timer lock while holding the task lock.
pub struct Kernel<C: Cpu> {
    tasks: TaskManager<C>,
    timers: IrqMutex<TimerManager, C>,
}

impl<C: Cpu> Kernel<C> {
    /// Adopt the calling thread as the event-loop task and arm the
    /// scheduler timer one period from now.
    pub fn new() -> Result<Self> {
        let tasks = TaskManager::new()?;
        let mut timers = TimerManager::new();
        let first = timers.current_tick() + TASK_TIMER_PERIOD;
        timers.add_timer(Timer::new(first, TASK_TIMER_VALUE));
        log::debug!("kernel: scheduler timer armed at tick {}", first);

        Ok(Self {
            tasks,
            timers: IrqMutex::new(timers),
        })
    }

    pub fn tasks(&self) -> &TaskManager<C> {
        &self.tasks
    }

    pub fn add_timer(&self, timer: Timer) {
        self.timers.lock().add_timer(timer);
    }

    pub fn current_tick(&self) -> u64 {
        self.timers.lock().current_tick()
    }

    /// Advance the timer heap by one tick; true when the scheduler should
    /// switch tasks.
    pub fn tick(&self) -> bool {
        self.timers.lock().tick(&self.tasks)
    }

    /// Body of the periodic timer interrupt.
    ///
    /// `eoi` acknowledges the interrupt controller. It runs before any
    /// switch: the next task may not return here for a long time, and the
    /// controller must be free to deliver the next tick meanwhile.
    pub fn on_timer_interrupt(&self, eoi: impl FnOnce()) {
        let switch = self.tick();
        eoi();
        if switch {
            self.tasks.switch_task(false);
        }
    }

    /// Body of a device interrupt: tell the event loop to poll the device.
    pub fn on_device_interrupt(&self) {
        if let Err(e) = self.tasks.send_message(TaskId::EVENT_LOOP, Message::device_interrupt()) {
            log::warn!("kernel: device interrupt lost: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::MessageKind;
    use crate::mock::{self, MockCpu};
    use core::cell::Cell;

    fn kernel() -> Kernel<MockCpu> {
        mock::reset();
        Kernel::new().unwrap()
    }

    extern "C" fn worker(_task_id: u64, _arg: i64) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    #[test]
    fn scheduler_tick_fires_every_period() {
        let kernel = kernel();
        let fired: Vec<bool> = (0..6).map(|_| kernel.tick()).collect();
        assert_eq!(fired, vec![false, true, false, true, false, true]);
        assert_eq!(kernel.current_tick(), 6);
    }

    #[test]
    fn timer_interrupt_acknowledges_before_switching() {
        let kernel = kernel();
        kernel
            .tasks()
            .new_task()
            .init_context(worker, 0)
            .unwrap()
            .wakeup_at(3)
            .unwrap();

        let switches_at_eoi = Cell::new(None);
        for _ in 0..TASK_TIMER_PERIOD {
            MockCpu::disable_interrupts();
            kernel.on_timer_interrupt(|| switches_at_eoi.set(Some(mock::switch_count())));
        }
        assert_eq!(switches_at_eoi.get(), Some(0));
        assert_eq!(mock::switch_count(), 1);
        assert_eq!(kernel.tasks().current_task_id(), TaskId(3));
    }

    #[test]
    fn timer_interrupt_without_scheduler_tick_does_not_switch() {
        let kernel = kernel();
        MockCpu::disable_interrupts();
        let acked = Cell::new(false);
        kernel.on_timer_interrupt(|| acked.set(true));
        assert!(acked.get());
        assert_eq!(mock::switch_count(), 0);
    }

    #[test]
    fn user_timer_reaches_event_loop() {
        let kernel = kernel();
        kernel.add_timer(Timer::new(kernel.current_tick() + 3, 11));
        for _ in 0..3 {
            kernel.tick();
        }
        let msg = kernel.tasks().receive_message(TaskId::EVENT_LOOP).unwrap().unwrap();
        assert_eq!(msg.kind, MessageKind::TimerTimeout { timeout: 3, value: 11 });
        assert_eq!(msg.source_task, TaskId::KERNEL);
    }

    #[test]
    fn device_interrupt_wakes_event_loop() {
        let kernel = kernel();
        kernel.tasks().sleep(TaskId::EVENT_LOOP).unwrap();
        assert!(!kernel.tasks().snapshot(TaskId::EVENT_LOOP).unwrap().running);

        MockCpu::disable_interrupts();
        kernel.on_device_interrupt();
        let snap = kernel.tasks().snapshot(TaskId::EVENT_LOOP).unwrap();
        assert!(snap.running);
        assert_eq!(snap.pending_messages, 1);
        assert!(!MockCpu::interrupts_enabled());
    }
}
