//! The task manager: task arena, per-level ready queues, sleep/wakeup and
//! context switching.
//!
//! # Ready queues
//!
//! There is one FIFO queue per level. The front of the queue at
//! `current_level` is the task executing right now. A task is in exactly one
//! queue exactly once while its `running` flag is set, and in none while it
//! sleeps.
//!
//! Levels are strict: a non-empty higher level always wins at the next
//! switch, and tasks only rotate inside their own level. The idle task lives
//! in level 0 forever, so a switch always finds something to run.
//!
//! # Locking
//!
//! The whole scheduler state sits behind one [`IrqMutex`]. Operations that
//! end in a context switch compute the two context pointers under the lock,
//! release it, and switch with only an [`InterruptGuard`] held; the guard is
//! dropped when the outgoing task is eventually resumed, restoring its own
//! interrupt state.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use crate::config::{IDLE_LEVEL, LEVEL_COUNT, MAX_LEVEL};
use crate::context::TaskContext;
use crate::cpu::Cpu;
use crate::error::{Error, Result};
use crate::message::Message;
use crate::sync::{InterruptGuard, IrqMutex};
use crate::task::{Level, Task, TaskEntry, TaskId, TaskSnapshot};

/// Body of the idle task: sleep until the next interrupt, forever.
extern "C" fn idle_task<C: Cpu>(_task_id: u64, _arg: i64) -> ! {
    loop {
        C::halt();
    }
}

/// Endpoints of a context switch decided under the lock.
struct Switch {
    save: *mut TaskContext,
    load: *const TaskContext,
}

impl Switch {
    /// # Safety
    /// Interrupts must be masked and the scheduler lock released.
    unsafe fn perform<C: Cpu>(self) {
        // SAFETY: both pointers target contexts inside boxed tasks, which
        // are never freed or moved; the caller upholds the masking rule.
        unsafe { C::switch_context(self.save, self.load) }
    }
}

struct Scheduler {
    /// Boxed so context addresses stay put while the map rebalances.
    tasks: BTreeMap<TaskId, Box<Task>>,
    ready: [VecDeque<TaskId>; LEVEL_COUNT],
    current_level: Level,
    /// Forces a full level rescan on the next switch.
    level_changed: bool,
    latest_id: u64,
    idle: TaskId,
}

impl Scheduler {
    fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            ready: Default::default(),
            current_level: MAX_LEVEL,
            level_changed: false,
            latest_id: 0,
            idle: TaskId::KERNEL,
        }
    }

    fn new_task(&mut self) -> TaskId {
        self.latest_id += 1;
        let id = TaskId(self.latest_id);
        self.tasks.insert(id, Box::new(Task::new(id)));
        id
    }

    fn task(&self, id: TaskId) -> Result<&Task> {
        self.tasks.get(&id).map(|task| &**task).ok_or(Error::NoSuchTask(id))
    }

    fn task_mut(&mut self, id: TaskId) -> Result<&mut Task> {
        self.tasks
            .get_mut(&id)
            .map(|task| &mut **task)
            .ok_or(Error::NoSuchTask(id))
    }

    fn current(&self) -> TaskId {
        *self.ready[self.current_level]
            .front()
            .expect("ready queue of the current level is empty")
    }

    /// Advance the current level's queue and pick the task to run next.
    ///
    /// With `current_sleep` the outgoing task leaves the queues and stops
    /// being `running`; the idle task never does and is rotated instead.
    /// Returns `(outgoing, incoming)`; they are equal when nothing else is
    /// runnable.
    fn rotate(&mut self, mut current_sleep: bool) -> (TaskId, TaskId) {
        if current_sleep && self.current() == self.idle {
            log::warn!("sched: refusing to put the idle task to sleep");
            current_sleep = false;
        }
        let queue = &mut self.ready[self.current_level];
        let outgoing = queue
            .pop_front()
            .expect("ready queue of the current level is empty");
        if current_sleep {
            if let Some(task) = self.tasks.get_mut(&outgoing) {
                task.set_running(false);
            }
        } else {
            queue.push_back(outgoing);
        }
        if queue.is_empty() {
            self.level_changed = true;
        }

        if self.level_changed {
            self.level_changed = false;
            if let Some(level) = (0..LEVEL_COUNT).rev().find(|&level| !self.ready[level].is_empty()) {
                if level != self.current_level {
                    log::trace!("sched: level {} -> {}", self.current_level, level);
                }
                self.current_level = level;
            }
        }

        (outgoing, self.current())
    }

    fn switch_between(&mut self, from: TaskId, to: TaskId) -> Option<Switch> {
        if from == to {
            return None;
        }
        let load = self.tasks.get(&to)?.context() as *const TaskContext;
        let save = self.tasks.get_mut(&from)?.context_mut() as *mut TaskContext;
        Some(Switch { save, load })
    }

    fn switch_task(&mut self, current_sleep: bool) -> Option<Switch> {
        let (from, to) = self.rotate(current_sleep);
        self.switch_between(from, to)
    }

    fn sleep(&mut self, id: TaskId) -> Result<Option<Switch>> {
        if id == self.idle {
            log::warn!("sched: refusing to put the idle task to sleep");
            return Ok(None);
        }
        let is_current = self.current() == id;

        let task = self.task_mut(id)?;
        if !task.is_running() {
            return Ok(None);
        }
        task.set_running(false);
        let level = task.level();

        if is_current {
            return Ok(self.switch_task(true));
        }
        erase(&mut self.ready[level], id);
        Ok(None)
    }

    fn wakeup(&mut self, id: TaskId, level: Option<Level>) -> Result<()> {
        let task = self.task_mut(id)?;
        if task.is_running() {
            return self.change_level_running(id, level);
        }

        if task.stack_bytes() == 0 && id != TaskId::EVENT_LOOP {
            log::warn!("sched: task {} woken before init_context", id);
        }
        if let Some(level) = level {
            task.set_level(level);
        }
        let level = task.level();
        task.set_running(true);
        self.ready[level].push_back(id);
        if level > self.current_level {
            self.level_changed = true;
        }
        Ok(())
    }

    /// Move an already-running task to another level.
    fn change_level_running(&mut self, id: TaskId, level: Option<Level>) -> Result<()> {
        let Some(level) = level.map(|level| level.min(MAX_LEVEL)) else {
            return Ok(());
        };
        let old = self.task(id)?.level();
        if level == old {
            return Ok(());
        }
        if id == self.idle {
            log::warn!("sched: the idle task stays at level {}", IDLE_LEVEL);
            return Ok(());
        }

        if id != self.current() {
            erase(&mut self.ready[old], id);
            self.ready[level].push_back(id);
            self.task_mut(id)?.set_level(level);
            if level > self.current_level {
                self.level_changed = true;
            }
            return Ok(());
        }

        // The executing task moves itself: it stays in front, so it keeps
        // running at the new level without a switch.
        self.ready[self.current_level].pop_front();
        self.ready[level].push_front(id);
        self.task_mut(id)?.set_level(level);
        if level < self.current_level {
            self.level_changed = true;
        }
        log::debug!("sched: task {} now runs at level {}", id, level);
        self.current_level = level;
        Ok(())
    }

    fn set_level(&mut self, id: TaskId, level: Level) -> Result<()> {
        let task = self.task_mut(id)?;
        if task.is_running() {
            return self.change_level_running(id, Some(level));
        }
        task.set_level(level);
        Ok(())
    }

    fn send_message(&mut self, id: TaskId, msg: Message) -> Result<()> {
        self.task_mut(id)?.push_message(msg);
        self.wakeup(id, None)
    }
}

fn erase(queue: &mut VecDeque<TaskId>, id: TaskId) {
    if let Some(at) = queue.iter().position(|&queued| queued == id) {
        queue.remove(at);
    }
}

/// Owner of every task in the system.
pub struct TaskManager<C: Cpu> {
    state: IrqMutex<Scheduler, C>,
}

impl<C: Cpu> TaskManager<C> {
    /// Build the manager around the calling thread.
    ///
    /// The caller becomes task 1 (the event loop) at the highest level; its
    /// context is captured the first time it is switched away from. Task 2
    /// is the idle task at level 0. Fails only if the idle stack cannot be
    /// allocated.
    pub fn new() -> Result<Self> {
        let mut sched = Scheduler::new();

        let main = sched.new_task();
        let main_task = sched.task_mut(main)?;
        main_task.set_level(MAX_LEVEL);
        main_task.set_running(true);
        sched.ready[MAX_LEVEL].push_back(main);
        sched.current_level = MAX_LEVEL;

        let idle = sched.new_task();
        sched.task_mut(idle)?.init_context::<C>(idle_task::<C>, 0)?;
        sched.idle = idle;
        sched.wakeup(idle, Some(IDLE_LEVEL))?;

        log::debug!("sched: main task {} at level {}, idle task {}", main, MAX_LEVEL, idle);
        Ok(Self {
            state: IrqMutex::new(sched),
        })
    }

    /// Create a task at the default level, asleep.
    ///
    /// It has no stack or entry point until `init_context`, so configure it
    /// through the returned handle before waking it:
    ///
    /// ```ignore
    /// tasks.new_task().init_context(worker, 42)?.wakeup()?;
    /// ```
    pub fn new_task(&self) -> TaskHandle<'_, C> {
        let id = self.state.lock().new_task();
        log::debug!("sched: created task {}", id);
        TaskHandle { manager: self, id }
    }

    /// Handle to an existing task.
    pub fn task(&self, id: TaskId) -> Result<TaskHandle<'_, C>> {
        self.state.lock().task(id)?;
        Ok(TaskHandle { manager: self, id })
    }

    /// The task executing right now.
    pub fn current_task(&self) -> TaskHandle<'_, C> {
        TaskHandle {
            manager: self,
            id: self.current_task_id(),
        }
    }

    pub fn current_task_id(&self) -> TaskId {
        self.state.lock().current()
    }

    /// Like [`current_task_id`](Self::current_task_id), but `None` instead
    /// of spinning when the scheduler lock is taken. For fault handlers.
    pub fn try_current_task_id(&self) -> Option<TaskId> {
        let sched = self.state.try_lock()?;
        sched.ready[sched.current_level].front().copied()
    }

    pub fn idle_task_id(&self) -> TaskId {
        self.state.lock().idle
    }

    pub fn current_level(&self) -> Level {
        self.state.lock().current_level
    }

    pub fn level_changed(&self) -> bool {
        self.state.lock().level_changed
    }

    /// Ids queued at `level`, front first.
    pub fn ready_queue(&self, level: Level) -> Vec<TaskId> {
        let sched = self.state.lock();
        sched
            .ready
            .get(level)
            .map(|queue| queue.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn task_ids(&self) -> Vec<TaskId> {
        self.state.lock().tasks.keys().copied().collect()
    }

    pub fn task_count(&self) -> usize {
        self.state.lock().tasks.len()
    }

    pub fn snapshot(&self, id: TaskId) -> Result<TaskSnapshot> {
        Ok(self.state.lock().task(id)?.snapshot())
    }

    /// Take `id` off the CPU until it is woken again.
    ///
    /// Sleeping the executing task switches away from it; the call returns
    /// once something wakes it and the scheduler picks it again.
    pub fn sleep(&self, id: TaskId) -> Result<()> {
        let _irq = InterruptGuard::<C>::new();
        let switch = self.state.lock().sleep(id)?;
        if let Some(switch) = switch {
            // SAFETY: `_irq` masks interrupts and the lock guard is gone.
            unsafe { switch.perform::<C>() };
        }
        Ok(())
    }

    /// Make `id` runnable at the level it had before.
    pub fn wakeup(&self, id: TaskId) -> Result<()> {
        self.state.lock().wakeup(id, None)
    }

    /// Make `id` runnable at `level`, moving it if it already runs.
    ///
    /// A higher level than the current one does not preempt on the spot:
    /// the change is noticed at the next switch, at most one scheduler
    /// period later. Only the executing task changes level immediately.
    pub fn wakeup_at(&self, id: TaskId, level: Level) -> Result<()> {
        self.state.lock().wakeup(id, Some(level))
    }

    /// Set the level of a sleeping task, or move a running one.
    pub fn set_level(&self, id: TaskId, level: Level) -> Result<()> {
        self.state.lock().set_level(id, level)
    }

    /// Give the CPU to the next task.
    ///
    /// With `current_sleep == false` the executing task goes to the back of
    /// its queue (round robin); with `true` it leaves the ready queues and
    /// sleeps until woken. The idle task is always rotated.
    /// Called from the timer interrupt with interrupts already masked, or
    /// from task context, in which case interrupts are masked here.
    pub fn switch_task(&self, current_sleep: bool) {
        let _irq = InterruptGuard::<C>::new();
        let switch = self.state.lock().switch_task(current_sleep);
        if let Some(switch) = switch {
            // SAFETY: `_irq` masks interrupts and the lock guard is gone.
            unsafe { switch.perform::<C>() };
        }
    }

    /// Queue `msg` for `id` and wake it.
    pub fn send_message(&self, id: TaskId, msg: Message) -> Result<()> {
        self.state.lock().send_message(id, msg)
    }

    /// Oldest pending message of `id`; never blocks.
    pub fn receive_message(&self, id: TaskId) -> Result<Option<Message>> {
        Ok(self.state.lock().task_mut(id)?.receive_message())
    }

    /// Receive, sleeping while the queue is empty.
    ///
    /// The empty check and the sleep happen in one masked section, so a
    /// message sent in between cannot be missed.
    pub fn wait_message(&self, id: TaskId) -> Result<Message> {
        loop {
            let _irq = InterruptGuard::<C>::new();
            if let Some(msg) = self.receive_message(id)? {
                return Ok(msg);
            }
            self.sleep(id)?;
        }
    }
}

/// Borrowed handle to one task, for configuring and addressing it.
pub struct TaskHandle<'a, C: Cpu> {
    manager: &'a TaskManager<C>,
    id: TaskId,
}

impl<C: Cpu> Clone for TaskHandle<'_, C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Cpu> Copy for TaskHandle<'_, C> {}

impl<'a, C: Cpu> TaskHandle<'a, C> {
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// See [`Task::init_context`].
    pub fn init_context(self, entry: TaskEntry, arg: i64) -> Result<Self> {
        self.manager
            .state
            .lock()
            .task_mut(self.id)?
            .init_context::<C>(entry, arg)?;
        Ok(self)
    }

    pub fn set_level(self, level: Level) -> Result<Self> {
        self.manager.set_level(self.id, level)?;
        Ok(self)
    }

    pub fn wakeup(self) -> Result<Self> {
        self.manager.wakeup(self.id)?;
        Ok(self)
    }

    pub fn wakeup_at(self, level: Level) -> Result<Self> {
        self.manager.wakeup_at(self.id, level)?;
        Ok(self)
    }

    pub fn sleep(&self) -> Result<()> {
        self.manager.sleep(self.id)
    }

    pub fn send_message(&self, msg: Message) -> Result<()> {
        self.manager.send_message(self.id, msg)
    }

    pub fn receive_message(&self) -> Result<Option<Message>> {
        self.manager.receive_message(self.id)
    }

    pub fn snapshot(&self) -> Result<TaskSnapshot> {
        self.manager.snapshot(self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_LEVEL, DEFAULT_STACK_BYTES};
    use crate::mock::{self, MockCpu};
    use std::collections::BTreeMap as Counts;

    extern "C" fn worker(_task_id: u64, _arg: i64) -> ! {
        loop {
            core::hint::spin_loop();
        }
    }

    fn manager() -> TaskManager<MockCpu> {
        mock::reset();
        TaskManager::new().unwrap()
    }

    fn spawn(tasks: &TaskManager<MockCpu>, level: Level) -> TaskId {
        tasks
            .new_task()
            .init_context(worker, 0)
            .unwrap()
            .wakeup_at(level)
            .unwrap()
            .id()
    }

    /// Put the boot task to sleep so that only idle is runnable.
    fn idle_only(tasks: &TaskManager<MockCpu>) {
        tasks.sleep(TaskId::EVENT_LOOP).unwrap();
        assert_eq!(tasks.current_task_id(), tasks.idle_task_id());
        assert_eq!(tasks.current_level(), 0);
    }

    /// `running` iff the task sits in exactly one queue, once, at its level.
    fn assert_queue_invariant(tasks: &TaskManager<MockCpu>) {
        let queues: Vec<Vec<TaskId>> = (0..LEVEL_COUNT).map(|level| tasks.ready_queue(level)).collect();
        for id in tasks.task_ids() {
            let snap = tasks.snapshot(id).unwrap();
            let hits: Vec<Level> = queues
                .iter()
                .enumerate()
                .flat_map(|(level, queue)| queue.iter().filter(move |&&q| q == id).map(move |_| level))
                .collect();
            if snap.running {
                assert_eq!(hits, vec![snap.level], "task {} queued wrongly", id);
            } else {
                assert!(hits.is_empty(), "sleeping task {} is queued", id);
            }
        }
    }

    #[test]
    fn new_manager_adopts_boot_thread_and_idle() {
        let tasks = manager();
        assert_eq!(tasks.task_count(), 2);
        assert_eq!(tasks.current_task_id(), TaskId::EVENT_LOOP);
        assert_eq!(tasks.current_level(), MAX_LEVEL);
        assert_eq!(tasks.idle_task_id(), TaskId(2));
        assert_eq!(tasks.ready_queue(0), vec![TaskId(2)]);
        assert_eq!(tasks.snapshot(TaskId(2)).unwrap().level, 0);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn task_ids_strictly_increase() {
        let tasks = manager();
        let ids: Vec<TaskId> = (0..10).map(|_| tasks.new_task().id()).collect();
        assert_eq!(ids.first(), Some(&TaskId(3)));
        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert_eq!(tasks.task_count(), 12);
    }

    #[test]
    fn new_task_is_asleep_at_default_level() {
        let tasks = manager();
        let id = tasks.new_task().id();
        let snap = tasks.snapshot(id).unwrap();
        assert!(!snap.running);
        assert_eq!(snap.level, DEFAULT_LEVEL);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn woken_task_preempts_idle_at_next_switch() {
        let tasks = manager();
        idle_only(&tasks);

        let id = tasks.new_task().init_context(worker, 42).unwrap().wakeup().unwrap().id();
        assert_eq!(tasks.snapshot(id).unwrap().level, DEFAULT_LEVEL);
        assert_eq!(tasks.ready_queue(DEFAULT_LEVEL), vec![id]);
        assert!(tasks.level_changed());

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), id);
        assert_eq!(tasks.current_level(), DEFAULT_LEVEL);
        let last = *mock::switches().last().unwrap();
        assert_eq!(last.loaded_rdi, id.as_u64());
        assert_eq!(last.loaded_rip, worker as usize as u64);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn higher_level_wakeup_waits_for_next_switch() {
        let tasks = manager();
        idle_only(&tasks);
        let before = mock::switch_count();

        let id = spawn(&tasks, 2);
        assert_eq!(tasks.current_task_id(), tasks.idle_task_id());
        assert_eq!(mock::switch_count(), before);
        assert!(tasks.level_changed());

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), id);
        assert!(!tasks.level_changed());
    }

    #[test]
    fn round_robin_within_one_level() {
        let tasks = manager();
        idle_only(&tasks);
        let workers: Vec<TaskId> = (0..3).map(|_| spawn(&tasks, 1)).collect();

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), workers[0]);

        let mut order = Vec::new();
        for _ in 0..9 {
            tasks.switch_task(false);
            order.push(tasks.current_task_id());
        }
        for window in order.chunks(3) {
            let mut counts = Counts::new();
            for id in window {
                *counts.entry(*id).or_insert(0) += 1;
            }
            assert_eq!(counts.len(), 3);
            assert!(counts.values().all(|&n| n == 1));
        }
        assert_eq!(&order[..3], &[workers[1], workers[2], workers[0]]);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn strict_priority_starves_lower_levels() {
        let tasks = manager();
        idle_only(&tasks);
        let low = spawn(&tasks, 1);
        let high_a = spawn(&tasks, 2);
        let high_b = spawn(&tasks, 2);

        for _ in 0..6 {
            tasks.switch_task(false);
            let current = tasks.current_task_id();
            assert!(current == high_a || current == high_b);
            assert_ne!(current, low);
        }
    }

    #[test]
    fn switch_always_finds_a_runnable_task() {
        let tasks = manager();
        idle_only(&tasks);
        let before = mock::switch_count();
        for _ in 0..4 {
            tasks.switch_task(false);
            assert_eq!(tasks.current_task_id(), tasks.idle_task_id());
        }
        // Nothing else to run: no context switch is performed.
        assert_eq!(mock::switch_count(), before);
    }

    #[test]
    fn switch_happens_with_interrupts_masked() {
        let tasks = manager();
        idle_only(&tasks);
        spawn(&tasks, 1);
        tasks.switch_task(false);

        let switches = mock::switches();
        assert!(!switches.is_empty());
        assert!(switches.iter().all(|record| !record.interrupts_enabled));
        assert!(MockCpu::interrupts_enabled());
    }

    #[test]
    fn switch_from_interrupt_context_leaves_interrupts_masked() {
        let tasks = manager();
        spawn(&tasks, MAX_LEVEL);
        MockCpu::disable_interrupts();
        tasks.switch_task(false);
        assert!(!MockCpu::interrupts_enabled());
    }

    #[test]
    fn sleeping_current_task_yields_and_dequeues() {
        let tasks = manager();
        idle_only(&tasks);

        let snap = tasks.snapshot(TaskId::EVENT_LOOP).unwrap();
        assert!(!snap.running);
        assert!(tasks.ready_queue(MAX_LEVEL).is_empty());
        assert_eq!(mock::switches()[0].loaded_rdi, tasks.idle_task_id().as_u64());
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn sleeping_other_task_removes_it_by_identity() {
        let tasks = manager();
        let a = spawn(&tasks, 1);
        let b = spawn(&tasks, 1);
        let c = spawn(&tasks, 1);

        tasks.sleep(b).unwrap();
        assert_eq!(tasks.ready_queue(1), vec![a, c]);
        assert_eq!(tasks.current_task_id(), TaskId::EVENT_LOOP);
        assert_eq!(mock::switch_count(), 0);

        // Double sleep is harmless.
        tasks.sleep(b).unwrap();
        assert_eq!(tasks.ready_queue(1), vec![a, c]);

        tasks.wakeup(b).unwrap();
        assert_eq!(tasks.ready_queue(1), vec![a, c, b]);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn wakeup_of_running_task_at_same_level_is_noop() {
        let tasks = manager();
        let a = spawn(&tasks, 1);
        let b = spawn(&tasks, 1);

        tasks.wakeup(a).unwrap();
        tasks.wakeup_at(a, 1).unwrap();
        assert_eq!(tasks.ready_queue(1), vec![a, b]);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn waking_a_queued_task_at_new_level_migrates_it() {
        let tasks = manager();
        idle_only(&tasks);
        let a = spawn(&tasks, 1);
        let b = spawn(&tasks, 1);
        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), a);

        tasks.wakeup_at(b, 2).unwrap();
        assert_eq!(tasks.ready_queue(1), vec![a]);
        assert_eq!(tasks.ready_queue(2), vec![b]);
        assert!(tasks.level_changed());
        assert_eq!(tasks.current_task_id(), a);

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), b);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn current_task_raising_its_level_takes_effect_immediately() {
        let tasks = manager();
        idle_only(&tasks);
        let t = spawn(&tasks, 1);
        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), t);
        let before = mock::switch_count();

        tasks.wakeup_at(t, 3).unwrap();
        assert_eq!(tasks.current_level(), 3);
        assert_eq!(tasks.current_task_id(), t);
        assert_eq!(tasks.ready_queue(3), vec![t]);
        assert!(tasks.ready_queue(1).is_empty());
        assert_eq!(mock::switch_count(), before);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn current_task_lowering_its_level_rescans_at_next_switch() {
        let tasks = manager();
        let b = spawn(&tasks, 2);
        assert!(!tasks.level_changed());

        tasks.wakeup_at(TaskId::EVENT_LOOP, 1).unwrap();
        assert_eq!(tasks.current_level(), 1);
        assert_eq!(tasks.current_task_id(), TaskId::EVENT_LOOP);
        assert!(tasks.level_changed());

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), b);
        assert_eq!(tasks.ready_queue(1), vec![TaskId::EVENT_LOOP]);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn message_wakes_sleeping_receiver() {
        let tasks = manager();
        idle_only(&tasks);
        let a = spawn(&tasks, 1);
        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), a);

        // A finds nothing and goes to sleep.
        assert_eq!(tasks.receive_message(a).unwrap(), None);
        tasks.sleep(a).unwrap();
        assert!(!tasks.snapshot(a).unwrap().running);
        assert_eq!(tasks.current_task_id(), tasks.idle_task_id());

        let msg = Message::timer_timeout(30, 5);
        tasks.send_message(a, msg).unwrap();
        let snap = tasks.snapshot(a).unwrap();
        assert!(snap.running);
        assert_eq!(snap.level, 1);
        assert_eq!(tasks.ready_queue(1), vec![a]);

        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), a);
        assert_eq!(tasks.receive_message(a).unwrap(), Some(msg));
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn messages_are_received_in_send_order() {
        let tasks = manager();
        let a = tasks.new_task().init_context(worker, 0).unwrap().id();
        for value in 0..4 {
            tasks.send_message(a, Message::timer_timeout(1, value)).unwrap();
        }
        let received: Vec<i32> = core::iter::from_fn(|| tasks.receive_message(a).unwrap())
            .map(|msg| match msg.kind {
                crate::message::MessageKind::TimerTimeout { value, .. } => value,
                other => panic!("unexpected {:?}", other),
            })
            .collect();
        assert_eq!(received, vec![0, 1, 2, 3]);
        // Sending to a sleeping task queued it exactly once.
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn wait_message_returns_pending_message_without_sleeping() {
        let tasks = manager();
        let msg = Message::device_interrupt();
        tasks.send_message(TaskId::EVENT_LOOP, msg).unwrap();
        assert_eq!(tasks.wait_message(TaskId::EVENT_LOOP).unwrap(), msg);
        assert!(tasks.snapshot(TaskId::EVENT_LOOP).unwrap().running);
        assert_eq!(mock::switch_count(), 0);
        assert!(MockCpu::interrupts_enabled());
    }

    #[test]
    fn idle_task_cannot_sleep_or_leave_level_zero() {
        let tasks = manager();
        let idle = tasks.idle_task_id();
        tasks.sleep(idle).unwrap();
        tasks.wakeup_at(idle, 2).unwrap();
        assert_eq!(tasks.ready_queue(0), vec![idle]);
        assert!(tasks.snapshot(idle).unwrap().running);
    }

    #[test]
    fn set_level_before_first_wakeup() {
        let tasks = manager();
        let id = tasks.new_task().init_context(worker, 0).unwrap().set_level(2).unwrap().wakeup().unwrap().id();
        assert_eq!(tasks.ready_queue(2), vec![id]);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn unknown_ids_report_no_such_task() {
        let tasks = manager();
        let ghost = TaskId(99);
        assert_eq!(tasks.sleep(ghost), Err(Error::NoSuchTask(ghost)));
        assert_eq!(tasks.wakeup(ghost), Err(Error::NoSuchTask(ghost)));
        assert_eq!(tasks.wakeup_at(ghost, 2), Err(Error::NoSuchTask(ghost)));
        assert_eq!(
            tasks.send_message(ghost, Message::device_interrupt()),
            Err(Error::NoSuchTask(ghost))
        );
        assert_eq!(tasks.receive_message(ghost), Err(Error::NoSuchTask(ghost)));
        assert!(tasks.task(ghost).is_err());
    }

    #[test]
    fn handle_operations_address_their_task() {
        let tasks = manager();
        let handle = tasks.new_task().init_context(worker, 0).unwrap();
        handle.send_message(Message::layer_finish(TaskId::EVENT_LOOP)).unwrap();
        assert!(handle.snapshot().unwrap().running);
        assert_eq!(
            handle.receive_message().unwrap(),
            Some(Message::layer_finish(TaskId::EVENT_LOOP))
        );
        handle.sleep().unwrap();
        assert!(!handle.snapshot().unwrap().running);
        assert_eq!(tasks.current_task().id(), TaskId::EVENT_LOOP);
    }

    #[test]
    fn switch_task_with_sleep_parks_the_current_task() {
        let tasks = manager();
        tasks.switch_task(true);
        let snap = tasks.snapshot(TaskId::EVENT_LOOP).unwrap();
        assert!(!snap.running);
        assert!(tasks.ready_queue(MAX_LEVEL).is_empty());
        assert_eq!(tasks.current_task_id(), tasks.idle_task_id());
        assert_queue_invariant(&tasks);

        tasks.wakeup(TaskId::EVENT_LOOP).unwrap();
        assert_eq!(tasks.ready_queue(MAX_LEVEL), vec![TaskId::EVENT_LOOP]);
        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), TaskId::EVENT_LOOP);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn switch_task_with_sleep_keeps_idle_queued() {
        let tasks = manager();
        idle_only(&tasks);
        let idle = tasks.idle_task_id();

        tasks.switch_task(true);
        assert_eq!(tasks.current_task_id(), idle);
        assert_eq!(tasks.ready_queue(0), vec![idle]);
        assert!(tasks.snapshot(idle).unwrap().running);

        let id = spawn(&tasks, 1);
        tasks.switch_task(false);
        assert_eq!(tasks.current_task_id(), id);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn queued_task_moves_down_without_disturbing_current() {
        let tasks = manager();
        let a = spawn(&tasks, 2);
        let b = spawn(&tasks, 1);

        tasks.wakeup_at(a, 1).unwrap();
        assert!(tasks.ready_queue(2).is_empty());
        assert_eq!(tasks.ready_queue(1), vec![b, a]);
        assert_eq!(tasks.snapshot(a).unwrap().level, 1);
        assert_eq!(tasks.current_task_id(), TaskId::EVENT_LOOP);
        assert_eq!(tasks.current_level(), MAX_LEVEL);
        assert!(!tasks.level_changed());
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn sleeping_task_below_current_level_leaves_its_own_queue() {
        let tasks = manager();
        let a = spawn(&tasks, 2);
        let b = spawn(&tasks, 2);
        let c = spawn(&tasks, 1);

        tasks.sleep(a).unwrap();
        assert_eq!(tasks.ready_queue(2), vec![b]);
        assert_eq!(tasks.ready_queue(1), vec![c]);
        assert_eq!(tasks.ready_queue(MAX_LEVEL), vec![TaskId::EVENT_LOOP]);
        assert_eq!(mock::switch_count(), 0);
        assert_queue_invariant(&tasks);
    }

    #[test]
    fn try_current_task_id_gives_up_while_locked() {
        let tasks = manager();
        assert_eq!(tasks.try_current_task_id(), Some(TaskId::EVENT_LOOP));
        let held = tasks.state.lock();
        assert_eq!(tasks.try_current_task_id(), None);
        drop(held);
        assert_eq!(tasks.try_current_task_id(), Some(TaskId::EVENT_LOOP));
    }

    #[test]
    fn snapshot_shows_whether_a_stack_was_set_up() {
        let tasks = manager();
        let bare = tasks.new_task().id();
        let ready = tasks.new_task().init_context(worker, 0).unwrap().id();
        assert_eq!(tasks.snapshot(bare).unwrap().stack_bytes, 0);
        assert_eq!(tasks.snapshot(ready).unwrap().stack_bytes, DEFAULT_STACK_BYTES);
    }
}
