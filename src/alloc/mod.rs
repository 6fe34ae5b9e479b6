//! Allocation wrappers that never return null.
//!
//! Each wrapper either returns usable memory or prints why it could not and
//! exits the process with `errno` as the status. Callers never write
//! allocation failure handling.

pub mod count;
pub mod die;
pub mod format;
pub mod guarded;
pub mod size;
