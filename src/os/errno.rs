//! The calling thread's `errno`, which the C allocation primitives use to say
//! why they failed.

use errno::{errno, set_errno, Errno};

/// Read `errno`
pub fn get() -> i32 {
    errno().0
}

pub fn set(code: i32) {
    set_errno(Errno(code));
}

/// Reset `errno` to zero, so that a later failure can tell whether anything
/// actually reported a cause.
pub fn clear() {
    set(0);
}
