// =============================================================================
// Mikan Scheduler Kernel - Context Switch
// =============================================================================
//
// `switch_context(save, load)` stores the complete CPU state of the caller
// into `save` and resumes whatever `load` describes. Offsets follow the
// layout of `ksched::TaskContext` (checked there at compile time):
//
//   0x00 cr3   0x08 rip   0x10 rflags  0x18 (reserved)
//   0x20 cs    0x28 ss    0x30 fs      0x38 gs
//   0x40 rax   0x48 rbx   0x50 rcx     0x58 rdx
//   0x60 rdi   0x68 rsi   0x70 rsp     0x78 rbp
//   0x80 r8 .. 0xB8 r15
//   0xC0 FXSAVE image (512 bytes)
//
// The saved RIP is our own return address and the saved RSP points just
// above it, so resuming `save` later looks like an ordinary return from this
// function. The load side builds an interrupt frame (SS, RSP, RFLAGS, CS,
// RIP) on the current stack and leaves with IRETQ, which switches stack,
// flags and code segment in one instruction. A fresh task therefore starts
// with the RFLAGS prepared by `init_context` (IF set) even though the switch
// itself runs with interrupts masked.
//
// CR3 is only written when it differs, to keep the TLB warm: every task
// shares the kernel mapping.
// =============================================================================

use ksched::TaskContext;

core::arch::global_asm!(
    ".global mikan_switch_context",
    "mikan_switch_context:",
    // --- save: rdi = save ---
    "mov [rdi + 0x40], rax",
    "mov [rdi + 0x48], rbx",
    "mov [rdi + 0x50], rcx",
    "mov [rdi + 0x58], rdx",
    "mov [rdi + 0x60], rdi",
    "mov [rdi + 0x68], rsi",
    "lea rax, [rsp + 8]",
    "mov [rdi + 0x70], rax",
    "mov [rdi + 0x78], rbp",
    "mov [rdi + 0x80], r8",
    "mov [rdi + 0x88], r9",
    "mov [rdi + 0x90], r10",
    "mov [rdi + 0x98], r11",
    "mov [rdi + 0xA0], r12",
    "mov [rdi + 0xA8], r13",
    "mov [rdi + 0xB0], r14",
    "mov [rdi + 0xB8], r15",
    "mov rax, cr3",
    "mov [rdi + 0x00], rax",
    "mov rax, [rsp]",
    "mov [rdi + 0x08], rax",
    "pushfq",
    "pop qword ptr [rdi + 0x10]",
    "xor eax, eax",
    "mov ax, cs",
    "mov [rdi + 0x20], rax",
    "mov ax, ss",
    "mov [rdi + 0x28], rax",
    "mov ax, fs",
    "mov [rdi + 0x30], rax",
    "mov ax, gs",
    "mov [rdi + 0x38], rax",
    "fxsave64 [rdi + 0xC0]",
    // --- interrupt frame for the resume: rsi = load ---
    "push qword ptr [rsi + 0x28]",
    "push qword ptr [rsi + 0x70]",
    "push qword ptr [rsi + 0x10]",
    "push qword ptr [rsi + 0x20]",
    "push qword ptr [rsi + 0x08]",
    // --- restore ---
    "fxrstor64 [rsi + 0xC0]",
    "mov rax, [rsi + 0x00]",
    "mov rdx, cr3",
    "cmp rax, rdx",
    "je 2f",
    "mov cr3, rax",
    "2:",
    "mov rax, [rsi + 0x30]",
    "mov fs, ax",
    "mov rax, [rsi + 0x38]",
    "mov gs, ax",
    "mov rax, [rsi + 0x40]",
    "mov rbx, [rsi + 0x48]",
    "mov rcx, [rsi + 0x50]",
    "mov rdx, [rsi + 0x58]",
    "mov rdi, [rsi + 0x60]",
    "mov rbp, [rsi + 0x78]",
    "mov r8, [rsi + 0x80]",
    "mov r9, [rsi + 0x88]",
    "mov r10, [rsi + 0x90]",
    "mov r11, [rsi + 0x98]",
    "mov r12, [rsi + 0xA0]",
    "mov r13, [rsi + 0xA8]",
    "mov r14, [rsi + 0xB0]",
    "mov r15, [rsi + 0xB8]",
    "mov rsi, [rsi + 0x68]",
    "iretq",
);

unsafe extern "C" {
    fn mikan_switch_context(save: *mut TaskContext, load: *const TaskContext);
}

/// Save the running state into `save` and resume `load`.
///
/// # Safety
/// See `ksched::Cpu::switch_context`: both contexts live and aligned,
/// `load` valid, interrupts masked.
#[inline]
pub unsafe fn switch_context(save: *mut TaskContext, load: *const TaskContext) {
    // SAFETY: forwarded from the caller.
    unsafe { mikan_switch_context(save, load) }
}
