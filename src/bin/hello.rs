//! Greets someone on stdout, freeing everything it allocated before the leak
//! check runs.
//!
//! ```text
//! $ hello
//! Hello world!
//! $ hello Ferris
//! Hello Ferris!
//! ```

use std::{
    env,
    ffi::{CStr, CString},
    os::unix::ffi::OsStrExt,
    process::ExitCode,
};

use alloc_or_die::{alloc_count_is_zero_or_die, asprintf_or_die, free_or_die, strdup_or_die};

fn main() -> ExitCode {
    env_logger::init();

    let name = match env::args_os().nth(1) {
        Some(arg) => match CString::new(arg.as_bytes()) {
            Ok(arg) => strdup_or_die(&arg),
            Err(e) => {
                eprintln!("hello: bad name: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => strdup_or_die(c"world"),
    };

    // SAFETY: `strdup_or_die()` returns a nul-terminated string
    let name_str = unsafe { CStr::from_ptr(name.as_ptr()) }.to_string_lossy();
    let (message, _) = asprintf_or_die!("Hello {name_str}!");
    drop(name_str);
    // SAFETY: `name` is not used again
    unsafe { free_or_die(name.as_ptr().cast()) };

    // SAFETY: `asprintf_or_die!` returns a nul-terminated string
    println!("{}", unsafe { CStr::from_ptr(message.as_ptr()) }.to_string_lossy());
    // SAFETY: `message` is not used again
    unsafe { free_or_die(message.as_ptr().cast()) };

    alloc_count_is_zero_or_die();
    ExitCode::SUCCESS
}
