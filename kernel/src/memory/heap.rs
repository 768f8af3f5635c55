//! Kernel heap: a linked-list allocator over a static arena.
//!
//! The arena is part of `.bss`, which Limine maps together with the kernel
//! image, so the heap is usable without any page-table work. Freed blocks go
//! back on the free list; task stacks, message queues and the task map all
//! live here.
//!
//! Allocation runs under an `IrqMutex`: a timer interrupt that wakes a task
//! may push onto a queue (and so allocate) while task code is in the middle
//! of an allocation.

use core::alloc::{GlobalAlloc, Layout};
use core::ptr::{self, NonNull};

use linked_list_allocator::Heap;

use crate::config::HEAP_SIZE;
use crate::sync::IrqMutex;

#[repr(C, align(4096))]
struct Arena([u8; HEAP_SIZE]);

static mut ARENA: Arena = Arena([0; HEAP_SIZE]);

struct KernelHeap {
	inner: IrqMutex<Heap>,
}

#[global_allocator]
static ALLOCATOR: KernelHeap = KernelHeap {
	inner: IrqMutex::new(Heap::empty()),
};

unsafe impl GlobalAlloc for KernelHeap {
	unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
		self.inner
			.lock()
			.allocate_first_fit(layout)
			.map_or(ptr::null_mut(), |block| block.as_ptr())
	}

	unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
		if let Some(block) = NonNull::new(ptr) {
			// SAFETY: `ptr` came from `alloc` with the same layout.
			unsafe { self.inner.lock().deallocate(block, layout) }
		}
	}
}

/// Hand the arena to the allocator. Call once, before the first allocation.
pub fn init() {
	let mut heap = ALLOCATOR.inner.lock();
	if heap.size() != 0 {
		log::warn!("heap: already initialised");
		return;
	}
	// SAFETY: the arena is a static used by nothing else, and the size
	// check above makes this the only `init`.
	unsafe { heap.init((&raw mut ARENA).cast::<u8>(), HEAP_SIZE) };
	log::info!("heap: {} KiB at {:p}", HEAP_SIZE / 1024, heap.bottom());
}

pub fn allocated_bytes() -> usize {
	ALLOCATOR.inner.lock().used()
}

pub fn total_bytes() -> usize {
	ALLOCATOR.inner.lock().size()
}
