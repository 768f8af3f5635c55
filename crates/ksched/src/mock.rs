//! Recording `Cpu` used by the unit tests.
//!
//! State is thread-local, so tests running in parallel do not see each
//! other's interrupt flag or switch log. Call [`reset`] first in every test.

use core::cell::RefCell;
use std::vec::Vec;

use crate::context::TaskContext;
use crate::cpu::Cpu;

pub const MOCK_CR3: u64 = 0x0010_3000;
pub const MOCK_CS: u16 = 0x28;
pub const MOCK_SS: u16 = 0x30;

/// One call to `switch_context`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchRecord {
    /// `rdi` of the loaded context: the task id for initialised tasks.
    pub loaded_rdi: u64,
    pub loaded_rip: u64,
    /// Interrupt flag at the moment of the switch.
    pub interrupts_enabled: bool,
}

struct State {
    interrupts_enabled: bool,
    switches: Vec<SwitchRecord>,
}

std::thread_local! {
    static STATE: RefCell<State> = const {
        RefCell::new(State {
            interrupts_enabled: true,
            switches: Vec::new(),
        })
    };
}

/// Back to "task context, interrupts on, nothing recorded".
pub fn reset() {
    STATE.with(|state| {
        let mut state = state.borrow_mut();
        state.interrupts_enabled = true;
        state.switches.clear();
    });
}

pub fn switches() -> Vec<SwitchRecord> {
    STATE.with(|state| state.borrow().switches.clone())
}

pub fn switch_count() -> usize {
    STATE.with(|state| state.borrow().switches.len())
}

pub struct MockCpu;

impl Cpu for MockCpu {
    fn interrupts_enabled() -> bool {
        STATE.with(|state| state.borrow().interrupts_enabled)
    }

    fn disable_interrupts() {
        STATE.with(|state| state.borrow_mut().interrupts_enabled = false);
    }

    fn enable_interrupts() {
        STATE.with(|state| state.borrow_mut().interrupts_enabled = true);
    }

    fn halt() {
        std::thread::yield_now();
    }

    fn address_space_root() -> u64 {
        MOCK_CR3
    }

    fn kernel_code_selector() -> u16 {
        MOCK_CS
    }

    fn kernel_stack_selector() -> u16 {
        MOCK_SS
    }

    /// Records the switch and returns at once, as if the outgoing task had
    /// been resumed immediately.
    unsafe fn switch_context(_save: *mut TaskContext, load: *const TaskContext) {
        // SAFETY: the scheduler hands out pointers into live boxed tasks.
        let load = unsafe { &*load };
        let record = SwitchRecord {
            loaded_rdi: load.rdi,
            loaded_rip: load.rip,
            interrupts_enabled: Self::interrupts_enabled(),
        };
        STATE.with(|state| state.borrow_mut().switches.push(record));
    }
}
