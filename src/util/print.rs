use std::ptr;

/// `perror(NULL)`: write the message for the current `errno` to stderr. This
/// goes straight to libc, so it is safe to call when the heap is exhausted.
pub fn perror() {
    // SAFETY: `perror()` accepts a null prefix, in which case it prints only
    // the error message.
    unsafe { libc::perror(ptr::null()) }
}
