//! Messages exchanged between tasks, drivers and interrupt handlers.
//!
//! A [`Message`] is a plain value: it is copied into the receiver's queue at
//! the send site and dropped when `receive_message` hands it out.

use bitflags::bitflags;

use crate::task::TaskId;

bitflags! {
    /// Keyboard modifier state, in USB HID boot-report bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Modifiers: u8 {
        const L_CONTROL = 1 << 0;
        const L_SHIFT = 1 << 1;
        const L_ALT = 1 << 2;
        const L_GUI = 1 << 3;
        const R_CONTROL = 1 << 4;
        const R_SHIFT = 1 << 5;
        const R_ALT = 1 << 6;
        const R_GUI = 1 << 7;
    }
}

impl Modifiers {
    pub fn shift(self) -> bool {
        self.intersects(Self::L_SHIFT | Self::R_SHIFT)
    }

    pub fn control(self) -> bool {
        self.intersects(Self::L_CONTROL | Self::R_CONTROL)
    }
}

/// Payload of a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPush {
    pub modifier: Modifiers,
    pub keycode: u8,
    /// ASCII translation, `0` for keys without one.
    pub ascii: u8,
}

/// What a layer request asks the window system to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerOperation {
    Move,
    MoveRelative,
    Draw,
    DrawArea,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rectangle {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Payload of a layer request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerRequest {
    pub op: LayerOperation,
    pub layer_id: u32,
    pub area: Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// A device raised its interrupt; the event loop should poll it.
    DeviceInterrupt,
    /// A timer added with `add_timer` expired.
    TimerTimeout { timeout: u64, value: i32 },
    KeyPush(KeyPush),
    Layer(LayerRequest),
    /// Reply to a [`MessageKind::Layer`] request.
    LayerFinish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Message {
    /// Sender. [`TaskId::KERNEL`] for messages raised by interrupt handlers.
    pub source_task: TaskId,
    pub kind: MessageKind,
}

impl Message {
    pub const fn new(source_task: TaskId, kind: MessageKind) -> Self {
        Self { source_task, kind }
    }

    pub const fn device_interrupt() -> Self {
        Self::new(TaskId::KERNEL, MessageKind::DeviceInterrupt)
    }

    pub const fn timer_timeout(timeout: u64, value: i32) -> Self {
        Self::new(TaskId::KERNEL, MessageKind::TimerTimeout { timeout, value })
    }

    pub const fn key_push(source_task: TaskId, modifier: Modifiers, keycode: u8, ascii: u8) -> Self {
        Self::new(
            source_task,
            MessageKind::KeyPush(KeyPush {
                modifier,
                keycode,
                ascii,
            }),
        )
    }

    pub const fn layer(source_task: TaskId, op: LayerOperation, layer_id: u32, area: Rectangle) -> Self {
        Self::new(source_task, MessageKind::Layer(LayerRequest { op, layer_id, area }))
    }

    pub const fn layer_finish(source_task: TaskId) -> Self {
        Self::new(source_task, MessageKind::LayerFinish)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn either_side_counts_as_held() {
        assert!(Modifiers::L_SHIFT.shift());
        assert!(Modifiers::R_SHIFT.shift());
        assert!((Modifiers::R_CONTROL | Modifiers::L_ALT).control());
        assert!(!Modifiers::L_ALT.shift());
        assert!(!Modifiers::empty().control());
    }
}
