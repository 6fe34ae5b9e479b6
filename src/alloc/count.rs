//! The live-allocation counter, and the leak checks that read it at shutdown.
//!
//! Only the number of live allocations is kept, not which ones they are, so a
//! failed check tells you *that* something leaked but not *what*. With the
//! `count-allocs` feature disabled every function here is a no-op and the
//! count always reads zero.

use std::process;

#[cfg(feature = "count-allocs")]
use std::sync::atomic::{AtomicIsize, Ordering};

use log::debug;

/// Successful allocations minus releases of non-null pointers. The contract
/// is single-threaded, the atomic only keeps stray concurrent use defined.
#[cfg(feature = "count-allocs")]
static ALLOC_COUNT: AtomicIsize = AtomicIsize::new(0);

#[cfg(feature = "count-allocs")]
#[inline]
pub(crate) fn increment() {
    ALLOC_COUNT.fetch_add(1, Ordering::Relaxed);
}

#[cfg(not(feature = "count-allocs"))]
#[inline(always)]
pub(crate) fn increment() {}

#[cfg(feature = "count-allocs")]
#[inline]
pub(crate) fn decrement() {
    ALLOC_COUNT.fetch_sub(1, Ordering::Relaxed);
}

#[cfg(not(feature = "count-allocs"))]
#[inline(always)]
pub(crate) fn decrement() {}

/// How many allocations made through this crate have not been freed yet
#[cfg(feature = "count-allocs")]
pub fn alloc_count() -> isize {
    ALLOC_COUNT.load(Ordering::Relaxed)
}

#[cfg(not(feature = "count-allocs"))]
pub fn alloc_count() -> isize {
    0
}

fn leak_warning(count: isize) -> String {
    let plural = if count == 1 { "" } else { "s" };
    format!("WARNING: {count} memory allocation{plural} not freed.")
}

/// Exits with `EXIT_FAILURE` if any allocation is still live. Call this once
/// at the end of `main()`, after everything should have been freed.
///
/// This is an assertion for development and tests. It does not try to
/// recover anything.
pub fn alloc_count_is_zero_or_die() {
    let count = alloc_count();
    debug!("alloc_count_is_zero_or_die(): {count} live");
    if count != 0 {
        eprintln!("{}", leak_warning(count));
        process::exit(libc::EXIT_FAILURE);
    }
}

/// Like [`alloc_count_is_zero_or_die()`], but only prints the warning.
pub fn expect_alloc_count_zero() {
    let count = alloc_count();
    debug!("expect_alloc_count_zero(): {count} live");
    if count != 0 {
        eprintln!("{}", leak_warning(count));
    }
}
