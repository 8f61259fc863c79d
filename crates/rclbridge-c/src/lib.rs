// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # rclbridge native client library
//!
//! In-process implementation of the ROS 2 client-library primitives the
//! bridge wraps: init options, contexts, clocks and timers, exposed through a
//! C ABI.
//!
//! Every entry point returns an [`RclbRet`] status. On failure the entry point
//! records a diagnostic in the thread-local error state, which the caller
//! reads with [`rclb_get_error_string`] and must clear with
//! [`rclb_reset_error`].
//!
//! # Safety
//!
//! Entry points taking pointers are `unsafe` and require the caller to uphold
//! the invariants documented on each function. Structures are obtained
//! zero-initialized from the `rclb_get_zero_initialized_*` functions, owned by
//! the caller, and must not be moved while initialized objects refer to them
//! (a timer keeps a pointer to its clock).

mod arguments;
mod context;
mod error_handling;
mod logging;
mod time;
mod timer;

pub use context::*;
pub use error_handling::*;
pub use logging::*;
pub use time::*;
pub use timer::*;

/// Status codes returned by every native entry point.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RclbRet {
    /// Success
    Ok = 0,
    /// Unspecified failure
    Error = 1,
    /// Operation timed out
    Timeout = 2,
    /// Operation not supported by this implementation
    Unsupported = 3,
    /// Allocation failed
    BadAlloc = 10,
    /// An argument was null or out of range
    InvalidArgument = 11,
    /// The object was already initialized
    AlreadyInit = 100,
    /// The object was not initialized
    NotInit = 101,
    /// The timer structure is not initialized
    TimerInvalid = 800,
    /// The timer is canceled
    TimerCanceled = 801,
    /// Malformed ROS arguments
    InvalidRosArgs = 1001,
    /// The context was already shut down
    AlreadyShutdown = 1900,
}

impl RclbRet {
    /// `true` for [`RclbRet::Ok`].
    #[must_use]
    pub fn is_ok(self) -> bool {
        self == RclbRet::Ok
    }
}

/// Default domain id sentinel: resolve from `ROS_DOMAIN_ID` at init time.
pub const RCLB_DEFAULT_DOMAIN_ID: usize = usize::MAX;

/// Record an error and return `$ret` when `$ptr` is null.
macro_rules! check_arg_for_null {
    ($ptr:expr, $name:literal, $ret:expr) => {
        if $ptr.is_null() {
            $crate::error_handling::set_error_msg(concat!($name, " argument is null"));
            return $ret;
        }
    };
}
pub(crate) use check_arg_for_null;
