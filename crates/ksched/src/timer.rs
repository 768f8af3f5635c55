//! Software timers driven by the periodic hardware tick.

use alloc::collections::BinaryHeap;
use core::cmp::Reverse;

use crate::config::{SENTINEL_TIMER_VALUE, TASK_TIMER_PERIOD, TASK_TIMER_VALUE};
use crate::cpu::Cpu;
use crate::manager::TaskManager;
use crate::message::Message;
use crate::task::TaskId;

/// A one-shot timeout.
///
/// Ordered by `timeout` first; `value` only breaks ties so the order is
/// total and deterministic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timer {
    timeout: u64,
    value: i32,
}

impl Timer {
    /// `value` is returned in the `TimerTimeout` message. [`TASK_TIMER_VALUE`]
    /// is reserved for the scheduler tick.
    pub const fn new(timeout: u64, value: i32) -> Self {
        Self { timeout, value }
    }

    pub const fn timeout(&self) -> u64 {
        self.timeout
    }

    pub const fn value(&self) -> i32 {
        self.value
    }

    fn is_scheduler_tick(&self) -> bool {
        self.value == TASK_TIMER_VALUE
    }
}

/// Min-heap of timers plus the global tick counter.
pub struct TimerManager {
    timers: BinaryHeap<Reverse<Timer>>,
    tick: u64,
}

impl TimerManager {
    pub fn new() -> Self {
        let mut timers = BinaryHeap::new();
        // Never expires, so the heap always has a top to compare against.
        timers.push(Reverse(Timer::new(u64::MAX, SENTINEL_TIMER_VALUE)));
        Self { timers, tick: 0 }
    }

    pub fn add_timer(&mut self, timer: Timer) {
        self.timers.push(Reverse(timer));
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Timers still waiting, the sentinel included.
    pub fn pending(&self) -> usize {
        self.timers.len()
    }

    /// Advance one tick and fire everything that is due.
    ///
    /// Ordinary timers become `TimerTimeout` messages for the event loop.
    /// The scheduler timer is re-armed one period ahead instead; the return
    /// value says whether it fired, i.e. whether the caller should switch
    /// tasks once the interrupt is acknowledged.
    pub fn tick<C: Cpu>(&mut self, tasks: &TaskManager<C>) -> bool {
        self.tick += 1;
        let mut task_timer_timeout = false;

        while let Some(&Reverse(timer)) = self.timers.peek() {
            if timer.timeout > self.tick {
                break;
            }
            self.timers.pop();

            if timer.is_scheduler_tick() {
                task_timer_timeout = true;
                self.timers
                    .push(Reverse(Timer::new(self.tick + TASK_TIMER_PERIOD, TASK_TIMER_VALUE)));
                continue;
            }

            let msg = Message::timer_timeout(timer.timeout, timer.value);
            if let Err(e) = tasks.send_message(TaskId::EVENT_LOOP, msg) {
                log::warn!("timer: dropped timeout {} (value {}): {}", timer.timeout, timer.value, e);
            }
        }

        task_timer_timeout
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}
