//! `libc` heap functions that exit the process instead of returning null.
//!
//! Every function that hands out memory counts it as a live allocation, and
//! [`free_or_die()`] uncounts it again. Blocks must be freed with
//! [`free_or_die()`], or the count drifts.
//!
//! A zero-byte request is made as a one-byte request, so every successful call
//! returns a distinct, non-null block, and `realloc_or_die(p, 0)` resizes `p`
//! rather than freeing it.

use std::{
    cmp,
    ffi::{c_char, c_void, CStr},
    ptr::{self, NonNull},
};

use log::trace;

use super::{
    count,
    die::{not_null_or_die, print_error_and_die},
    size::array_size_or_die,
};

#[inline]
fn nonzero(size: usize) -> libc::size_t {
    cmp::max(size, 1)
}

/// Allocate `count * element_size` zeroed bytes
pub fn calloc_or_die(count: usize, element_size: usize) -> NonNull<c_void> {
    let (nmemb, size) = if count == 0 || element_size == 0 {
        (1, 1)
    } else {
        (count, element_size)
    };
    // SAFETY: `calloc()` has no preconditions, and checks `nmemb * size` for
    // overflow itself.
    let memory = not_null_or_die(unsafe { libc::calloc(nmemb, size) });
    trace!("calloc_or_die({count}, {element_size}) -> {memory:p}");
    memory
}

/// Allocate `size` uninitialized bytes
pub fn malloc_or_die(size: usize) -> NonNull<c_void> {
    // SAFETY: `malloc()` has no preconditions
    let memory = not_null_or_die(unsafe { libc::malloc(nonzero(size)) });
    trace!("malloc_or_die({size}) -> {memory:p}");
    memory
}

/// Resize `memory` to `size` bytes, keeping its contents up to the smaller of
/// the two sizes. A null `memory` makes this a plain allocation, and only then
/// is the result counted: a resized block was already counted when it was
/// first allocated.
///
/// # Safety
///
/// - `memory` must be null, or a live block from this module that is not used
///   again after this call (use the returned pointer instead).
pub unsafe fn realloc_or_die(memory: *mut c_void, size: usize) -> NonNull<c_void> {
    // SAFETY: Identical contract to caller
    let new_memory = unsafe { libc::realloc(memory, nonzero(size)) };
    let Some(new_memory) = NonNull::new(new_memory) else {
        // `memory` is still valid here, but we are about to exit anyway
        print_error_and_die()
    };
    if memory.is_null() {
        count::increment();
    }
    trace!("realloc_or_die({memory:p}, {size}) -> {new_memory:p}");
    new_memory
}

/// [`realloc_or_die()`] for `count` elements of `element_size` bytes each.
/// Exits with `EOVERFLOW` if the total does not fit in a `usize`.
///
/// # Safety
///
/// Same as [`realloc_or_die()`].
pub unsafe fn reallocarray_or_die(
    memory: *mut c_void,
    count: usize,
    element_size: usize,
) -> NonNull<c_void> {
    let size = array_size_or_die(count, element_size);
    // SAFETY: Identical contract to caller
    unsafe { realloc_or_die(memory, size) }
}

/// Copy `size` bytes starting at `memory` into a new allocation
///
/// # Safety
///
/// - `memory` must be valid for reads of `size` bytes. It is not read at all
///   when `size` is zero, so any pointer (including null) is fine then.
pub unsafe fn memdup_or_die(memory: *const c_void, size: usize) -> NonNull<c_void> {
    let dupe = malloc_or_die(size);
    if size != 0 {
        // SAFETY:
        //   - The caller guarantees `memory` is readable for `size` bytes
        //   - `dupe` was just allocated with at least `size` bytes, so it is
        //     writable and cannot overlap `memory`
        unsafe {
            ptr::copy_nonoverlapping(memory.cast::<u8>(), dupe.as_ptr().cast::<u8>(), size);
        }
    }
    dupe
}

/// [`memdup_or_die()`] for `count` elements of `element_size` bytes each.
/// Exits with `EOVERFLOW` if the total does not fit in a `usize`.
///
/// # Safety
///
/// - `memory` must be valid for reads of `count * element_size` bytes
pub unsafe fn arraydup_or_die(
    memory: *const c_void,
    count: usize,
    element_size: usize,
) -> NonNull<c_void> {
    let size = array_size_or_die(count, element_size);
    // SAFETY: Identical contract to caller
    unsafe { memdup_or_die(memory, size) }
}

/// Copy `string`, nul terminator included, into a new allocation
pub fn strdup_or_die(string: &CStr) -> NonNull<c_char> {
    // SAFETY: `string` is a valid nul-terminated string for the duration of
    // the call
    let dupe = not_null_or_die(unsafe { libc::strdup(string.as_ptr()) });
    trace!("strdup_or_die({string:?}) -> {dupe:p}");
    dupe
}

/// The current working directory, as a newly allocated C string. Exits with
/// the `getcwd()` error (e.g. `ENOENT` if the directory has been removed) on
/// failure.
pub fn getcwd_or_die() -> NonNull<c_char> {
    // SAFETY: With a null buffer and zero size, `getcwd()` allocates a buffer
    // of the right size with `malloc()`. Both glibc and the BSD libcs do this.
    let cwd = not_null_or_die(unsafe { libc::getcwd(ptr::null_mut(), 0) });
    trace!("getcwd_or_die() -> {cwd:p}");
    cwd
}

/// Free a block from this crate. Null is ignored.
///
/// # Safety
///
/// - `memory` must be null or a live block returned by this crate, and must
///   not be used (or freed) again afterwards.
pub unsafe fn free_or_die(memory: *mut c_void) {
    trace!("free_or_die({memory:p})");
    // SAFETY: Identical contract to caller
    unsafe { libc::free(memory) };
    if !memory.is_null() {
        count::decrement();
    }
}

#[cfg(all(test, feature = "count-allocs"))]
mod tests {
    use std::{env, slice};

    use serial_test::serial;

    use super::*;
    use crate::alloc::count::alloc_count;

    unsafe fn bytes<'a>(memory: NonNull<c_void>, len: usize) -> &'a [u8] {
        unsafe { slice::from_raw_parts(memory.as_ptr().cast::<u8>(), len) }
    }

    #[test]
    #[serial]
    fn malloc_and_free_balance_the_count() {
        let before = alloc_count();
        let memory = malloc_or_die(64);
        assert_eq!(alloc_count(), before + 1);
        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn calloc_memory_is_zeroed() {
        let before = alloc_count();
        let memory = calloc_or_die(16, 4);
        assert_eq!(alloc_count(), before + 1);
        assert!(unsafe { bytes(memory, 64) }.iter().all(|&b| b == 0));
        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn zero_sized_requests_return_distinct_blocks() {
        let before = alloc_count();
        let a = calloc_or_die(0, 8);
        let b = calloc_or_die(8, 0);
        let c = malloc_or_die(0);
        assert_eq!(alloc_count(), before + 3);
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
        unsafe {
            free_or_die(a.as_ptr());
            free_or_die(b.as_ptr());
            free_or_die(c.as_ptr());
        }
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn realloc_of_null_counts_as_an_allocation() {
        let before = alloc_count();
        let memory = unsafe { realloc_or_die(ptr::null_mut(), 32) };
        assert_eq!(alloc_count(), before + 1);
        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn realloc_of_a_live_block_is_not_counted_again() {
        let before = alloc_count();
        let memory = malloc_or_die(4);
        unsafe { memory.as_ptr().cast::<[u8; 4]>().write(*b"abcd") };

        let memory = unsafe { realloc_or_die(memory.as_ptr(), 4096) };
        assert_eq!(alloc_count(), before + 1);
        assert_eq!(unsafe { bytes(memory, 4) }, b"abcd");

        let memory = unsafe { realloc_or_die(memory.as_ptr(), 2) };
        assert_eq!(alloc_count(), before + 1);
        assert_eq!(unsafe { bytes(memory, 2) }, b"ab");

        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn realloc_to_zero_keeps_the_block_alive() {
        let before = alloc_count();
        let memory = malloc_or_die(16);
        let memory = unsafe { realloc_or_die(memory.as_ptr(), 0) };
        assert_eq!(alloc_count(), before + 1);
        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn reallocarray_grows_by_element_count() {
        let before = alloc_count();
        let memory = unsafe { reallocarray_or_die(ptr::null_mut(), 2, 8) };
        unsafe { memory.as_ptr().cast::<[u64; 2]>().write([7, 9]) };
        let memory = unsafe { reallocarray_or_die(memory.as_ptr(), 1000, 8) };
        assert_eq!(alloc_count(), before + 1);
        let values = unsafe { slice::from_raw_parts(memory.as_ptr().cast::<u64>(), 2) };
        assert_eq!(values, [7, 9]);
        unsafe { free_or_die(memory.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn memdup_copies_into_a_new_block() {
        let source = *b"hello, heap";
        let before = alloc_count();
        let dupe = unsafe { memdup_or_die(source.as_ptr().cast(), source.len()) };
        assert_eq!(alloc_count(), before + 1);
        assert_ne!(dupe.as_ptr().cast_const().cast::<u8>(), source.as_ptr());
        assert_eq!(unsafe { bytes(dupe, source.len()) }, &source);
        unsafe { free_or_die(dupe.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn memdup_of_nothing_is_still_an_allocation() {
        let source: [u8; 0] = [];
        let before = alloc_count();
        let a = unsafe { memdup_or_die(source.as_ptr().cast(), 0) };
        let b = unsafe { memdup_or_die(ptr::null(), 0) };
        assert_eq!(alloc_count(), before + 2);
        assert_ne!(a, b);
        unsafe {
            free_or_die(a.as_ptr());
            free_or_die(b.as_ptr());
        }
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn arraydup_copies_every_element() {
        let source: [u16; 5] = [1, 1, 2, 3, 5];
        let before = alloc_count();
        let dupe = unsafe { arraydup_or_die(source.as_ptr().cast(), source.len(), 2) };
        assert_eq!(alloc_count(), before + 1);
        let copied = unsafe { slice::from_raw_parts(dupe.as_ptr().cast::<u16>(), 5) };
        assert_eq!(copied, source);
        unsafe { free_or_die(dupe.as_ptr()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn strdup_outlives_its_source() {
        let before = alloc_count();
        let original = strdup_or_die(c"world");
        let dupe = strdup_or_die(unsafe { CStr::from_ptr(original.as_ptr()) });
        assert_eq!(alloc_count(), before + 2);
        assert_ne!(original, dupe);

        unsafe { free_or_die(original.as_ptr().cast()) };
        assert_eq!(alloc_count(), before + 1);

        let dupe_str = unsafe { CStr::from_ptr(dupe.as_ptr()) };
        assert_eq!(dupe_str.to_bytes_with_nul(), b"world\0");
        unsafe { free_or_die(dupe.as_ptr().cast()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn getcwd_matches_std() {
        let before = alloc_count();
        let cwd = getcwd_or_die();
        assert_eq!(alloc_count(), before + 1);
        let cwd_str = unsafe { CStr::from_ptr(cwd.as_ptr()) };
        let expected = env::current_dir().expect("cwd");
        assert_eq!(
            cwd_str.to_str().expect("utf-8 cwd"),
            expected.to_str().expect("utf-8 cwd")
        );
        unsafe { free_or_die(cwd.as_ptr().cast()) };
        assert_eq!(alloc_count(), before);
    }

    #[test]
    #[serial]
    fn freeing_null_changes_nothing() {
        let before = alloc_count();
        unsafe { free_or_die(ptr::null_mut()) };
        assert_eq!(alloc_count(), before);
    }
}
