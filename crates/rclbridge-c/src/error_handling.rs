// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-local last-error state.
//!
//! A failing entry point stores one diagnostic per thread. The state stays
//! set until [`rclb_reset_error`] is called, so a caller that forgets to clear
//! it would hand a stale message to the next failure on the same thread.

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::c_char;

const ERROR_NOT_SET: &[u8] = b"error not set\0";

thread_local! {
    static ERROR_STATE: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record `msg` as the current thread's error.
pub(crate) fn set_error_msg(msg: impl Into<String>) {
    let mut msg = msg.into();
    // Interior NULs would truncate the C view; replace them.
    if msg.contains('\0') {
        msg = msg.replace('\0', " ");
    }
    log::debug!("[rclbridge-c] {}", msg);
    let cmsg = CString::new(msg).unwrap_or_default();
    ERROR_STATE.with(|state| {
        let mut state = state.borrow_mut();
        if let Some(previous) = state.as_ref() {
            log::debug!(
                "[rclbridge-c] overwriting unread error: {}",
                previous.to_string_lossy()
            );
        }
        *state = Some(cmsg);
    });
}

/// Whether an error is currently recorded on this thread.
#[no_mangle]
pub extern "C" fn rclb_error_is_set() -> bool {
    ERROR_STATE.with(|state| state.borrow().is_some())
}

/// Current error string for this thread, or `"error not set"`.
///
/// The returned pointer stays valid until the next call to
/// [`rclb_reset_error`] or the next failing entry point on this thread.
#[no_mangle]
pub extern "C" fn rclb_get_error_string() -> *const c_char {
    ERROR_STATE.with(|state| match state.borrow().as_ref() {
        Some(msg) => msg.as_ptr(),
        None => ERROR_NOT_SET.as_ptr().cast::<c_char>(),
    })
}

/// Clear the error state of the calling thread.
#[no_mangle]
pub extern "C" fn rclb_reset_error() {
    ERROR_STATE.with(|state| {
        state.borrow_mut().take();
    });
}
