//! PS/2 keyboard.
//!
//! Scancodes are decoded with `pc-keyboard` (set 1, US 104-key layout). The
//! modifier state is tracked here, from the modifier keys' own press and
//! release events, so every key push carries the full set of held modifiers.
//!
//! `keycode` in the posted message is the make code of the key (the last
//! scancode byte, extended prefix dropped); `ascii` is its US-layout
//! character, or `0` for keys without one.

use ksched::{Message, Modifiers, TaskId, TaskManager};
use pc_keyboard::{DecodedKey, HandleControl, KeyCode, KeyState, Keyboard, ScancodeSet1, layouts};
use x86_64::instructions::port::Port;

use crate::arch::cpu::X86Cpu;
use crate::arch::pic;
use crate::config::KEYBOARD_IRQ;
use crate::sync::IrqMutex;

const PS2_DATA: u16 = 0x60;
const PS2_STATUS: u16 = 0x64;

/// Status bit: output buffer full, a byte is waiting at the data port.
const STATUS_OUTPUT_FULL: u8 = 1 << 0;

/// Upper bound on bytes drained per poll, in case the controller is stuck
/// reporting a full buffer.
const MAX_BYTES_PER_POLL: usize = 32;

fn modifier_bit(code: KeyCode) -> Option<Modifiers> {
    Some(match code {
        KeyCode::LControl => Modifiers::L_CONTROL,
        KeyCode::LShift => Modifiers::L_SHIFT,
        KeyCode::LAlt => Modifiers::L_ALT,
        KeyCode::LWin => Modifiers::L_GUI,
        KeyCode::RControl => Modifiers::R_CONTROL,
        KeyCode::RShift => Modifiers::R_SHIFT,
        KeyCode::RAltGr => Modifiers::R_ALT,
        KeyCode::RWin => Modifiers::R_GUI,
        _ => return None,
    })
}

struct Ps2Keyboard {
    decoder: Keyboard<layouts::Us104Key, ScancodeSet1>,
    modifiers: Modifiers,
}

impl Ps2Keyboard {
    fn new() -> Self {
        Self {
            decoder: Keyboard::new(ScancodeSet1::new(), layouts::Us104Key, HandleControl::Ignore),
            modifiers: Modifiers::empty(),
        }
    }

    /// Feed one scancode byte; a key-push message when it completes a press.
    fn feed(&mut self, scancode: u8) -> Option<Message> {
        let event = self.decoder.add_byte(scancode).ok()??;
        let pressed = matches!(event.state, KeyState::Down);

        if let Some(bit) = modifier_bit(event.code) {
            self.modifiers.set(bit, pressed);
        }

        // Releases still go through the decoder so its own shift and
        // caps-lock state stays right.
        let decoded = self.decoder.process_keyevent(event);
        if !pressed {
            return None;
        }

        let ascii = match decoded {
            Some(DecodedKey::Unicode(ch)) if ch.is_ascii() => ch as u8,
            _ => 0,
        };
        Some(Message::key_push(TaskId::KERNEL, self.modifiers, scancode, ascii))
    }
}

static KEYBOARD: IrqMutex<Option<Ps2Keyboard>> = IrqMutex::new(None);

fn read_status() -> u8 {
    // SAFETY: reading the PS/2 status register has no side effect.
    unsafe { Port::<u8>::new(PS2_STATUS).read() }
}

fn read_data() -> u8 {
    // SAFETY: reading the data port pops one byte from the controller.
    unsafe { Port::<u8>::new(PS2_DATA).read() }
}

/// Set up the decoder, drop stale bytes and unmask IRQ 1.
pub fn init() {
    *KEYBOARD.lock() = Some(Ps2Keyboard::new());
    let mut stale = 0;
    while read_status() & STATUS_OUTPUT_FULL != 0 && stale < MAX_BYTES_PER_POLL {
        read_data();
        stale += 1;
    }
    pic::unmask(KEYBOARD_IRQ);
    log::info!("keyboard: PS/2 on IRQ {} (dropped {} stale bytes)", KEYBOARD_IRQ, stale);
}

/// Drain the controller and post a `KeyPush` to the event loop per press.
///
/// Runs in the event loop after a `DeviceInterrupt`.
pub fn poll(tasks: &TaskManager<X86Cpu>) {
    for _ in 0..MAX_BYTES_PER_POLL {
        if read_status() & STATUS_OUTPUT_FULL == 0 {
            return;
        }
        let scancode = read_data();
        let msg = match KEYBOARD.lock().as_mut() {
            Some(keyboard) => keyboard.feed(scancode),
            None => return,
        };
        if let Some(msg) = msg {
            if let Err(e) = tasks.send_message(TaskId::EVENT_LOOP, msg) {
                log::warn!("keyboard: key push lost: {}", e);
            }
        }
    }
}
