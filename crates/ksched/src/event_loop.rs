//! The event loop run by task 1.
//!
//! Interrupt handlers and tasks only ever post messages; the event loop
//! receives them in order and hands each to an [`EventHandler`]. When its
//! queue is empty it sleeps until the next `send_message` wakes it.

use crate::cpu::Cpu;
use crate::error::Result;
use crate::kernel::Kernel;
use crate::message::{KeyPush, LayerRequest, Message, MessageKind};
use crate::sync::InterruptGuard;
use crate::task::TaskId;

/// Reactions to the messages task 1 receives.
///
/// Every method has an empty default, so implementations only override what
/// they care about.
pub trait EventHandler<C: Cpu> {
    /// A device interrupt fired; poll the device.
    fn on_device_interrupt(&mut self, _kernel: &Kernel<C>) {}

    fn on_timer_timeout(&mut self, _kernel: &Kernel<C>, _timeout: u64, _value: i32) {}

    fn on_key_push(&mut self, _kernel: &Kernel<C>, _key: KeyPush) {}

    /// Carry out a layer request from `source`. The loop answers the
    /// requester with `LayerFinish` once this returns.
    fn on_layer(&mut self, _kernel: &Kernel<C>, _source: TaskId, _request: LayerRequest) {}
}

pub struct EventLoop<'k, C: Cpu, H> {
    kernel: &'k Kernel<C>,
    handler: H,
}

impl<'k, C: Cpu, H: EventHandler<C>> EventLoop<'k, C, H> {
    pub fn new(kernel: &'k Kernel<C>, handler: H) -> Self {
        Self { kernel, handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Route one message to the handler.
    pub fn dispatch(&mut self, msg: Message) -> Result<()> {
        match msg.kind {
            MessageKind::DeviceInterrupt => self.handler.on_device_interrupt(self.kernel),
            MessageKind::TimerTimeout { timeout, value } => {
                self.handler.on_timer_timeout(self.kernel, timeout, value)
            }
            MessageKind::KeyPush(key) => self.handler.on_key_push(self.kernel, key),
            MessageKind::Layer(request) => {
                self.handler.on_layer(self.kernel, msg.source_task, request);
                self.kernel
                    .tasks()
                    .send_message(msg.source_task, Message::layer_finish(TaskId::EVENT_LOOP))?;
            }
            MessageKind::LayerFinish => {
                log::debug!("event loop: stray layer-finish from task {}", msg.source_task);
            }
        }
        Ok(())
    }

    /// Handle one message, or sleep if there is none.
    ///
    /// Returns `Ok(true)` when a message was dispatched and `Ok(false)` when
    /// the loop slept and has since been woken. The emptiness check and the
    /// sleep run in one masked section so a wakeup cannot slip in between.
    pub fn run_once(&mut self) -> Result<bool> {
        let msg = {
            let _irq = InterruptGuard::<C>::new();
            match self.kernel.tasks().receive_message(TaskId::EVENT_LOOP)? {
                Some(msg) => msg,
                None => {
                    self.kernel.tasks().sleep(TaskId::EVENT_LOOP)?;
                    return Ok(false);
                }
            }
        };
        self.dispatch(msg)?;
        Ok(true)
    }

    pub fn run(mut self) -> ! {
        log::info!("event loop: running as task {}", TaskId::EVENT_LOOP);
        loop {
            if let Err(e) = self.run_once() {
                log::error!("event loop: {}", e);
            }
        }
    }
}
