//! Array sizes in bytes, checked for overflow.

use libc::EOVERFLOW;

use super::die::die_with;

/// `sqrt(usize::MAX + 1)`. If both operands are below this their product
/// fits in a `usize`.
const SQRT_USIZE_MAX_PLUS_1: usize = 1 << (usize::BITS / 2);

/// `count * element_size`, or `None` if that does not fit in a `usize`.
///
/// Small operands skip the division entirely. A zero `element_size` never
/// overflows, whatever `count` is.
#[inline]
pub const fn array_size(count: usize, element_size: usize) -> Option<usize> {
    if (count >= SQRT_USIZE_MAX_PLUS_1 || element_size >= SQRT_USIZE_MAX_PLUS_1)
        && element_size != 0
        && count > usize::MAX / element_size
    {
        return None;
    }
    Some(count * element_size)
}

/// Calculate the array size in bytes. Sets `errno` to `EOVERFLOW` and exits
/// if the size does not fit in a `usize`.
#[inline]
pub fn array_size_or_die(count: usize, element_size: usize) -> usize {
    match array_size(count, element_size) {
        Some(size) => size,
        None => die_with(EOVERFLOW),
    }
}
