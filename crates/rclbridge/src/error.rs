// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Translation of native status codes into [`Error`] values.
//!
//! The native library keeps one diagnostic string per thread. It is read at
//! most once per failure and cleared right after, so a later call never
//! observes a stale message.

use std::ffi::CStr;

use rclbridge_c::{rclb_error_is_set, rclb_get_error_string, rclb_reset_error, RclbRet};
use thiserror::Error;

/// Errors emitted by the bridge.
#[derive(Debug, Error)]
pub enum Error {
    /// A precondition failed before any native call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// The clock type name is not one of the known time sources.
    #[error("unrecognized clock type: {0}")]
    UnrecognizedClockType(String),
    /// Native allocation or initialization failed.
    #[error("{message} ({ret:?})")]
    Init { ret: RclbRet, message: String },
    /// A native operation on a context or clock failed.
    #[error("{message} ({ret:?})")]
    Runtime { ret: RclbRet, message: String },
    /// A timer operation failed; the timer is in an illegal state for it.
    #[error("{message} ({ret:?})")]
    State { ret: RclbRet, message: String },
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    Init,
    Runtime,
    State,
}

/// Result alias used throughout the bridge.
pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) | Self::UnrecognizedClockType(_) => ErrorKind::InvalidArgument,
            Self::Init { .. } => ErrorKind::Init,
            Self::Runtime { .. } => ErrorKind::Runtime,
            Self::State { .. } => ErrorKind::State,
        }
    }

    /// Native status behind the failure, if a native call produced it.
    #[must_use]
    pub fn ret(&self) -> Option<RclbRet> {
        match self {
            Self::Init { ret, .. } | Self::Runtime { ret, .. } | Self::State { ret, .. } => {
                Some(*ret)
            }
            Self::InvalidArgument(_) | Self::UnrecognizedClockType(_) => None,
        }
    }

    /// Full diagnostic text, without the status suffix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidArgument(msg) | Self::UnrecognizedClockType(msg) => msg,
            Self::Init { message, .. }
            | Self::Runtime { message, .. }
            | Self::State { message, .. } => message,
        }
    }
}

/// Read the native diagnostic and clear it.
pub(crate) fn take_native_error() -> String {
    if !rclb_error_is_set() {
        return String::from("unknown error");
    }
    // SAFETY: the returned pointer is valid until the next native call on
    // this thread; it is copied out before `rclb_reset_error`.
    let msg = unsafe { CStr::from_ptr(rclb_get_error_string()) }
        .to_string_lossy()
        .into_owned();
    rclb_reset_error();
    msg
}

/// Clear the native diagnostic of a secondary failure that is not surfaced.
pub(crate) fn discard_native_error(ret: RclbRet, what: &str) {
    let msg = take_native_error();
    log::debug!("[rclbridge] ignoring {} failure ({:?}): {}", what, ret, msg);
}

/// Build the error for a failed native call, consuming the diagnostic.
pub(crate) fn native_error(kind: ErrorKind, ret: RclbRet, what: &str) -> Error {
    let message = format!("{}: {}", what, take_native_error());
    log::debug!("[rclbridge] {}", message);
    match kind {
        ErrorKind::InvalidArgument => Error::InvalidArgument(message),
        ErrorKind::Init => Error::Init { ret, message },
        ErrorKind::Runtime => Error::Runtime { ret, message },
        ErrorKind::State => Error::State { ret, message },
    }
}

/// `Ok(())` for [`RclbRet::Ok`], otherwise the translated error.
pub(crate) fn check(ret: RclbRet, kind: ErrorKind, what: &str) -> Result<()> {
    if ret.is_ok() {
        Ok(())
    } else {
        Err(native_error(kind, ret, what))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rclbridge_c::{rclb_clock_fini, rclb_get_zero_initialized_clock};

    fn provoke_native_error() -> RclbRet {
        let mut clock = rclb_get_zero_initialized_clock();
        // Finalizing a zero-initialized clock fails and records a diagnostic.
        unsafe { rclb_clock_fini(&mut clock) }
    }

    #[test]
    fn check_ok_passes_through() {
        assert!(check(RclbRet::Ok, ErrorKind::Runtime, "noop").is_ok());
    }

    #[test]
    fn check_failure_carries_diagnostic_and_clears_it() {
        let ret = provoke_native_error();
        assert_eq!(ret, RclbRet::InvalidArgument);
        assert!(rclb_error_is_set());

        let err = check(ret, ErrorKind::Runtime, "Failed to fini clock").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert_eq!(err.ret(), Some(RclbRet::InvalidArgument));
        assert_eq!(err.message(), "Failed to fini clock: clock is not initialized");
        assert!(!rclb_error_is_set());
    }

    #[test]
    fn kind_maps_every_variant() {
        let state = Error::State {
            ret: RclbRet::TimerCanceled,
            message: String::from("canceled"),
        };
        assert_eq!(state.kind(), ErrorKind::State);
        assert_eq!(
            Error::UnrecognizedClockType("X".into()).kind(),
            ErrorKind::InvalidArgument
        );
        assert_eq!(Error::InvalidArgument("x".into()).ret(), None);
    }

    #[test]
    fn missing_diagnostic_is_reported_as_unknown() {
        rclb_reset_error();
        let err = native_error(ErrorKind::Init, RclbRet::Error, "Failed");
        assert_eq!(err.message(), "Failed: unknown error");
    }

    #[test]
    fn discarded_error_leaves_state_clear() {
        let ret = provoke_native_error();
        discard_native_error(ret, "clock fini");
        assert!(!rclb_error_is_set());
    }
}
