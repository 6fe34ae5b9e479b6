//! `asprintf()` for Rust format strings: render into a heap C string sized
//! exactly to its contents.
//!
//! Rendering runs the format arguments twice, once to measure and once to
//! fill the buffer, so nothing is allocated through the Rust allocator.

use std::{
    ffi::c_char,
    fmt::{self, Write},
    ptr::NonNull,
    slice,
};

use libc::{EINVAL, EOVERFLOW};
use log::trace;

use super::{count, die::print_error_and_die};
use crate::os::errno;

/// Counts bytes. `None` once the total no longer fits in a `usize`.
struct Measure(Option<usize>);

impl Write for Measure {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 = self.0.and_then(|len| len.checked_add(s.len()));
        self.0.map(|_| ()).ok_or(fmt::Error)
    }
}

/// Writes into a fixed buffer, failing rather than writing past its end
struct Fill<'a> {
    buf: &'a mut [u8],
    len: usize,
}

impl Write for Fill<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len.checked_add(s.len()).ok_or(fmt::Error)?;
        let dst = self.buf.get_mut(self.len..end).ok_or(fmt::Error)?;
        dst.copy_from_slice(s.as_bytes());
        self.len = end;
        Ok(())
    }
}

/// Render `arguments` into a new `malloc()` block with a trailing nul.
///
/// Returns `None` with `errno` set on failure: `ENOMEM` from `malloc()`,
/// `EOVERFLOW` if the output is too long to size, `EINVAL` if a `Display` impl
/// reported an error (or rendered differently the second time round).
fn render(arguments: fmt::Arguments<'_>) -> Option<(NonNull<c_char>, usize)> {
    let mut measure = Measure(Some(0));
    if measure.write_fmt(arguments).is_err() {
        errno::set(if measure.0.is_none() { EOVERFLOW } else { EINVAL });
        return None;
    }
    let Some(size) = measure.0.and_then(|len| len.checked_add(1)) else {
        errno::set(EOVERFLOW);
        return None;
    };

    // SAFETY: `malloc()` has no preconditions
    let data = NonNull::new(unsafe { libc::malloc(size) })?.cast::<u8>();
    // SAFETY:
    //   - `data` is a fresh allocation of `size` bytes, so it is valid for
    //     writes and not aliased
    //   - The bytes are zeroed before the slice is made, so it is initialized
    let buf = unsafe {
        data.as_ptr().write_bytes(0, size);
        slice::from_raw_parts_mut(data.as_ptr(), size)
    };

    let mut fill = Fill {
        buf: &mut buf[..size - 1],
        len: 0,
    };
    if fill.write_fmt(arguments).is_err() {
        // SAFETY: `data` came from `malloc()` above and is not used again
        unsafe { libc::free(data.as_ptr().cast()) };
        errno::set(EINVAL);
        return None;
    }
    let len = fill.len;
    buf[len] = 0;
    Some((data.cast(), len))
}

/// Render `arguments` into a newly allocated, nul-terminated C string and
/// return it with its length (terminator not included). The string must be
/// released with [`free_or_die()`](super::guarded::free_or_die).
///
/// This is the building block for your own formatting wrappers; most callers
/// want [`asprintf_or_die!`](crate::asprintf_or_die).
pub fn vasprintf_or_die(arguments: fmt::Arguments<'_>) -> (NonNull<c_char>, usize) {
    errno::clear();
    let Some((string, len)) = render(arguments) else {
        print_error_and_die()
    };
    count::increment();
    trace!("vasprintf_or_die() -> {string:p} ({len} bytes)");
    (string, len)
}

/// `format!()`, but into a counted `malloc()` C string. Evaluates to
/// `(NonNull<c_char>, usize)`: the string and its length.
///
/// ```no_run
/// use alloc_or_die::{asprintf_or_die, free_or_die};
///
/// let (message, len) = asprintf_or_die!("Hello {}!", "world");
/// assert_eq!(len, 12);
/// unsafe { free_or_die(message.as_ptr().cast()) };
/// ```
#[macro_export]
macro_rules! asprintf_or_die {
    ($($arg:tt)*) => {
        $crate::alloc::format::vasprintf_or_die(::std::format_args!($($arg)*))
    };
}
