//! Saved CPU state of a suspended task.

use core::mem::{offset_of, size_of};

/// Complete register snapshot used by `Cpu::switch_context`.
///
/// The layout is shared with the assembly in the kernel crate, which
/// addresses every field by its byte offset:
///
/// ```text
/// 0x00  cr3  rip  rflags  reserved
/// 0x20  cs   ss   fs      gs
/// 0x40  rax  rbx  rcx     rdx   rdi  rsi  rsp  rbp
/// 0x80  r8   r9   r10     r11   r12  r13  r14  r15
/// 0xC0  fxsave_area (512 bytes, 16-byte aligned)
/// ```
#[derive(Clone)]
#[repr(C, align(16))]
pub struct TaskContext {
    pub cr3: u64,
    pub rip: u64,
    pub rflags: u64,
    pub reserved1: u64,
    pub cs: u64,
    pub ss: u64,
    pub fs: u64,
    pub gs: u64,
    pub rax: u64,
    pub rbx: u64,
    pub rcx: u64,
    pub rdx: u64,
    pub rdi: u64,
    pub rsi: u64,
    pub rsp: u64,
    pub rbp: u64,
    pub r8: u64,
    pub r9: u64,
    pub r10: u64,
    pub r11: u64,
    pub r12: u64,
    pub r13: u64,
    pub r14: u64,
    pub r15: u64,
    pub fxsave_area: [u8; 512],
}

const _: () = assert!(offset_of!(TaskContext, cs) == 0x20);
const _: () = assert!(offset_of!(TaskContext, rax) == 0x40);
const _: () = assert!(offset_of!(TaskContext, rsp) == 0x70);
const _: () = assert!(offset_of!(TaskContext, r8) == 0x80);
const _: () = assert!(offset_of!(TaskContext, fxsave_area) == 0xC0);
const _: () = assert!(size_of::<TaskContext>() == 0x2C0);

impl TaskContext {
    /// An all-zero context.
    pub const fn zeroed() -> Self {
        Self {
            cr3: 0,
            rip: 0,
            rflags: 0,
            reserved1: 0,
            cs: 0,
            ss: 0,
            fs: 0,
            gs: 0,
            rax: 0,
            rbx: 0,
            rcx: 0,
            rdx: 0,
            rdi: 0,
            rsi: 0,
            rsp: 0,
            rbp: 0,
            r8: 0,
            r9: 0,
            r10: 0,
            r11: 0,
            r12: 0,
            r13: 0,
            r14: 0,
            r15: 0,
            fxsave_area: [0; 512],
        }
    }

    /// Read the MXCSR image stored in the FXSAVE area.
    pub fn mxcsr(&self) -> u32 {
        let at = crate::config::MXCSR_OFFSET;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.fxsave_area[at..at + 4]);
        u32::from_le_bytes(bytes)
    }

    /// Overwrite the MXCSR image stored in the FXSAVE area.
    pub fn set_mxcsr(&mut self, value: u32) {
        let at = crate::config::MXCSR_OFFSET;
        self.fxsave_area[at..at + 4].copy_from_slice(&value.to_le_bytes());
    }
}

impl Default for TaskContext {
    fn default() -> Self {
        Self::zeroed()
    }
}
