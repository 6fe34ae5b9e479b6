//! The one place where a failed allocation ends up.
//!
//! Nothing on this path allocates through the Rust global allocator: we are
//! usually here because the heap has run out.

use std::{process, ptr::NonNull};

use libc::ENOMEM;

use crate::{os::errno, util::print::perror};

use super::count;

/// Prints the message for the current `errno` and exits with `errno` as the
/// status. If `errno` is zero, it is set to `ENOMEM` first.
#[cold]
#[inline(never)]
pub fn print_error_and_die() -> ! {
    if errno::get() == 0 {
        errno::set(ENOMEM);
    }
    // `perror()` is allowed to clobber `errno`
    let code = errno::get();
    perror();
    process::exit(code)
}

/// Set `errno` to `code`, then [`print_error_and_die()`].
#[cold]
#[inline(never)]
pub fn die_with(code: i32) -> ! {
    errno::set(code);
    print_error_and_die()
}

/// If `memory` is null, exits with an error code, otherwise counts it as a
/// live allocation and returns it.
#[inline]
pub fn not_null_or_die<T>(memory: *mut T) -> NonNull<T> {
    match NonNull::new(memory) {
        Some(memory) => {
            count::increment();
            memory
        }
        None => print_error_and_die(),
    }
}
