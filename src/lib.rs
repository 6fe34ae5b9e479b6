//! Fail-fast heap allocation.
//!
//! Thin wrappers over the `libc` heap functions that exit the process on
//! failure instead of returning null, plus a count of live allocations that
//! can be checked for leaks at the end of `main()`:
//!
//! ```no_run
//! use alloc_or_die::{alloc_count_is_zero_or_die, free_or_die, strdup_or_die};
//!
//! let name = strdup_or_die(c"world");
//! unsafe { free_or_die(name.as_ptr().cast()) };
//! alloc_count_is_zero_or_die();
//! ```
//!
//! The count is process-wide and meant for single-threaded use.

pub mod alloc;
pub mod os;
pub mod util;

pub use alloc::{
    count::{alloc_count, alloc_count_is_zero_or_die, expect_alloc_count_zero},
    die::{not_null_or_die, print_error_and_die},
    format::vasprintf_or_die,
    guarded::{
        arraydup_or_die, calloc_or_die, free_or_die, getcwd_or_die, malloc_or_die,
        memdup_or_die, realloc_or_die, reallocarray_or_die, strdup_or_die,
    },
    size::{array_size, array_size_or_die},
};
