// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error handling for the C interface.
//!
//! Functions exposed to C return an exit code; if it is non-zero, the details
//! can be obtained by (1) getting the length of the error string by calling
//! `ebeam_last_error_length` and (2) calling `ebeam_last_error_message` with a
//! string buffer with a length at least equal to the error length.

use std::{
    cell::RefCell,
    os::raw::{c_char, c_int},
    slice,
};

// Error handling taken from
// https://michael-f-bryan.github.io/rust-ffi-guide/errors/return_types.html
thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// Update the most recent error, clearing whatever may have been there before.
pub(crate) fn update_last_error(err: String) {
    LAST_ERROR.with(|prev| {
        *prev.borrow_mut() = Some(err);
    });
}

/// Retrieve the most recent error, clearing it in the process.
pub(crate) fn take_last_error() -> Option<String> {
    LAST_ERROR.with(|prev| prev.borrow_mut().take())
}

/// Unwrap a `Result`, or set the last error and return 1 from the calling
/// function.
macro_rules! ffi_error {
    ($result:expr) => {{
        match $result {
            Ok(r) => r,
            Err(e) => {
                $crate::ffi::update_last_error(e.to_string());
                return 1;
            }
        }
    }};
}
pub(crate) use ffi_error;

/// Calculate the number of bytes in the last error's error message,
/// including a trailing `null` character. If there is no error, 0 is returned.
#[no_mangle]
pub extern "C" fn ebeam_last_error_length() -> c_int {
    LAST_ERROR.with(|prev| match *prev.borrow() {
        Some(ref err) => err.len() as c_int + 1,
        None => 0,
    })
}

/// Write the most recent error message into a caller-provided buffer as a UTF-8
/// string, returning the number of bytes written.
///
/// # Note
///
/// This writes a **UTF-8** string into the buffer. Windows users may need to
/// convert it to a UTF-16 "unicode" afterwards.
///
/// If there are no recent errors then this returns `0` (because we wrote 0
/// bytes). `-1` is returned if there are any errors, for example when passed a
/// null pointer or a buffer of insufficient size.
///
/// # Safety
///
/// `buffer` must point to at least `length` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn ebeam_last_error_message(buffer: *mut c_char, length: c_int) -> c_int {
    if buffer.is_null() || length < 0 {
        return -1;
    }

    let last_error = match take_last_error() {
        Some(err) => err,
        None => return 0,
    };

    let buffer = slice::from_raw_parts_mut(buffer as *mut u8, length as usize);

    if last_error.len() >= buffer.len() {
        // Put the error back so a bigger buffer can be tried.
        update_last_error(last_error);
        return -1;
    }

    buffer[..last_error.len()].copy_from_slice(last_error.as_bytes());

    // Add a trailing null so people using the string as a `char *` don't
    // accidentally read into garbage.
    buffer[last_error.len()] = 0;

    last_error.len() as c_int
}
