// =============================================================================
// Mikan Scheduler Kernel - Limine Boot Protocol Interface
// =============================================================================
//
// Limine scans the kernel image for request structures and fills in their
// response pointers before jumping to `kmain`. The scheduler needs very little
// from the bootloader: long mode, a higher-half mapping of the kernel image
// (which covers the static heap arena) and a stack to adopt as task 1.
//
// Requests are bracketed by start/end markers so Limine only scans the
// `.limine_requests*` sections laid out in `linker.ld`.
// =============================================================================

use limine::BaseRevision;
use limine::request::{ExecutableAddressRequest, RequestsEndMarker, RequestsStartMarker};

#[used]
#[unsafe(link_section = ".limine_requests_start")]
static REQUESTS_START: RequestsStartMarker = RequestsStartMarker::new();

/// Protocol revision this kernel is written against.
#[used]
#[unsafe(link_section = ".limine_requests")]
static BASE_REVISION: BaseRevision = BaseRevision::new();

/// Where the kernel image was loaded; printed in the boot banner.
#[used]
#[unsafe(link_section = ".limine_requests")]
static KERNEL_ADDRESS_REQUEST: ExecutableAddressRequest = ExecutableAddressRequest::new();

#[used]
#[unsafe(link_section = ".limine_requests_end")]
static REQUESTS_END: RequestsEndMarker = RequestsEndMarker::new();

/// Whether the bootloader speaks our protocol revision.
///
/// If it does not, none of the responses can be trusted and boot stops.
pub fn revision_supported() -> bool {
    BASE_REVISION.is_supported()
}

/// `(physical_base, virtual_base)` of the kernel image, if Limine told us.
pub fn kernel_address() -> Option<(u64, u64)> {
    KERNEL_ADDRESS_REQUEST
        .get_response()
        .map(|response| (response.physical_base(), response.virtual_base()))
}
