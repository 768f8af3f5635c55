//! Worker tasks started at boot.
//!
//! Both run at the default level, below the event loop and above idle:
//!
//! - the drawing task asks the event loop to draw its layer and waits for
//!   the `LayerFinish` reply before drawing the next frame;
//! - the counter task spins, sharing level 1 round robin with the drawing
//!   task whenever that one is not waiting.

use core::sync::atomic::{AtomicU64, Ordering};

use ksched::{Kernel, LayerOperation, Message, MessageKind, Rectangle, Result, TaskId};

use crate::arch::cpu::{self, X86Cpu};
use crate::config::DEMO_LAYER_ID;
use crate::traps;

static COUNTER: AtomicU64 = AtomicU64::new(0);

/// Iterations done by the counter task so far.
pub fn counter_value() -> u64 {
    COUNTER.load(Ordering::Relaxed)
}

/// Sleep for good after an unrecoverable error in a task.
fn park(kernel: &Kernel<X86Cpu>, me: TaskId) -> ! {
    log::error!("task {}: parked", me);
    loop {
        if kernel.tasks().sleep(me).is_err() {
            cpu::halt_forever();
        }
    }
}

fn wait_layer_finish(kernel: &Kernel<X86Cpu>, me: TaskId) -> Result<()> {
    loop {
        let msg = kernel.tasks().wait_message(me)?;
        if msg.kind == MessageKind::LayerFinish {
            return Ok(());
        }
        log::debug!("task {}: ignoring {:?} from {}", me, msg.kind, msg.source_task);
    }
}

extern "C" fn drawing_task(task_id: u64, arg: i64) -> ! {
    let me = TaskId(task_id);
    let Some(kernel) = traps::kernel() else {
        cpu::halt_forever();
    };
    let layer_id = arg as u32;
    log::info!("task {}: drawing layer {}", me, layer_id);

    let mut x = 0;
    loop {
        x = (x + 4) % 256;
        let area = Rectangle {
            x,
            y: 0,
            width: 16,
            height: 16,
        };
        let request = Message::layer(me, LayerOperation::Draw, layer_id, area);
        let frame = kernel
            .tasks()
            .send_message(TaskId::EVENT_LOOP, request)
            .and_then(|()| wait_layer_finish(kernel, me));
        if let Err(e) = frame {
            log::error!("task {}: {}", me, e);
            park(kernel, me);
        }
    }
}

extern "C" fn counter_task(task_id: u64, _arg: i64) -> ! {
    log::info!("task {}: counting", task_id);
    loop {
        let n = COUNTER.fetch_add(1, Ordering::Relaxed);
        if n % (1 << 24) == 0 {
            log::debug!("task {}: counter at {}", task_id, n);
        }
        core::hint::spin_loop();
    }
}

/// Create and wake the demo workers.
pub fn spawn_demo_tasks(kernel: &Kernel<X86Cpu>) -> Result<()> {
    let tasks = kernel.tasks();
    let drawing = tasks
        .new_task()
        .init_context(drawing_task, i64::from(DEMO_LAYER_ID))?
        .wakeup()?
        .id();
    let counter = tasks.new_task().init_context(counter_task, 0)?.wakeup()?.id();
    log::info!("demo: drawing task {}, counter task {}", drawing, counter);
    Ok(())
}
