// =============================================================================
// Interrupt-masking synchronization
// =============================================================================
//
// On a single core the only source of concurrency is an interrupt handler
// running in the middle of task code. Both sides touch the same ready queues,
// message queues and timer heap, so every mutation from task context happens
// with interrupts masked.
//
// Two primitives:
//   - InterruptGuard - saves RFLAGS.IF, executes CLI, and restores the saved
//     state on drop. Nested guards compose: only the outermost one re-enables.
//   - IrqMutex - a spin::Mutex whose lock() first takes an InterruptGuard.
//     With interrupts masked the mutex can never be contended on one core; it
//     exists so the data is only reachable through a guard.
//
// RULE: never hold an IrqMutexGuard across a context switch. The task that
// runs next would spin on the lock forever. Switches drop the guard first and
// keep only a bare InterruptGuard alive across `switch_context`.
// =============================================================================

use core::marker::PhantomData;
use core::ops::{Deref, DerefMut};

use spin::{Mutex, MutexGuard};

use crate::cpu::Cpu;

/// Scoped interrupt mask.
///
/// Interrupts are disabled when the guard is created and put back to
/// exactly the state they were in when it is dropped, regardless of early
/// returns.
///
/// ```ignore
/// {
///     let _irq = InterruptGuard::<X86Cpu>::new();
///     // timer interrupt cannot fire here
/// } // previous IF state restored
/// ```
#[must_use = "interrupts are re-enabled as soon as the guard is dropped"]
pub struct InterruptGuard<C: Cpu> {
    was_enabled: bool,
    _cpu: PhantomData<fn() -> C>,
}

impl<C: Cpu> InterruptGuard<C> {
    pub fn new() -> Self {
        let was_enabled = C::interrupts_enabled();
        C::disable_interrupts();
        Self {
            was_enabled,
            _cpu: PhantomData,
        }
    }

    /// Whether interrupts will be re-enabled when this guard drops.
    pub fn restores_enabled(&self) -> bool {
        self.was_enabled
    }
}

impl<C: Cpu> Default for InterruptGuard<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Cpu> Drop for InterruptGuard<C> {
    fn drop(&mut self) {
        if self.was_enabled {
            C::enable_interrupts();
        }
    }
}

/// A mutex that masks interrupts while held.
///
/// Shape of a classic IRQ-safe spinlock: mask, then lock; unlock, then
/// restore. Usable in statics because `new` is `const`.
pub struct IrqMutex<T, C: Cpu> {
    inner: Mutex<T>,
    _cpu: PhantomData<fn() -> C>,
}

impl<T, C: Cpu> IrqMutex<T, C> {
    pub const fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
            _cpu: PhantomData,
        }
    }

    /// Mask interrupts and acquire the lock.
    pub fn lock(&self) -> IrqMutexGuard<'_, T, C> {
        let irq = InterruptGuard::new();
        IrqMutexGuard {
            data: self.inner.lock(),
            _irq: irq,
        }
    }

    /// Like [`lock`](Self::lock), but gives up instead of spinning.
    ///
    /// For paths that may run while the same core already holds the lock,
    /// such as the panic handler printing through the serial port.
    pub fn try_lock(&self) -> Option<IrqMutexGuard<'_, T, C>> {
        let irq = InterruptGuard::new();
        let data = self.inner.try_lock()?;
        Some(IrqMutexGuard { data, _irq: irq })
    }
}

/// Access to the data of a locked [`IrqMutex`].
///
/// Field order matters: the lock is released before interrupts come back.
pub struct IrqMutexGuard<'a, T, C: Cpu> {
    data: MutexGuard<'a, T>,
    _irq: InterruptGuard<C>,
}

impl<T, C: Cpu> Deref for IrqMutexGuard<'_, T, C> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T, C: Cpu> DerefMut for IrqMutexGuard<'_, T, C> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}
