// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Process logger for the native library.
//!
//! The `env_logger` filter is taken from the first non-empty source:
//! `RUST_LOG`, then [`RCLB_LOG_LEVEL_ENV`], then the severity passed by the
//! caller. Both variables accept full filter directives such as
//! `rclbridge_c=debug,info`.

use std::env;

use super::RclbRet;

/// Environment variable holding the rclbridge log filter.
pub const RCLB_LOG_LEVEL_ENV: &str = "RCLBRIDGE_LOG_LEVEL";

/// Fallback severity when neither variable is set
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RclbLogSeverity {
    RclbLogOff = 0,
    RclbLogError = 1,
    RclbLogWarn = 2,
    RclbLogInfo = 3,
    RclbLogDebug = 4,
    RclbLogTrace = 5,
}

impl RclbLogSeverity {
    fn directive(self) -> &'static str {
        match self {
            Self::RclbLogOff => "off",
            Self::RclbLogError => "error",
            Self::RclbLogWarn => "warn",
            Self::RclbLogInfo => "info",
            Self::RclbLogDebug => "debug",
            Self::RclbLogTrace => "trace",
        }
    }
}

fn resolve_filter(
    rust_log: Option<&str>,
    bridge_level: Option<&str>,
    fallback: RclbLogSeverity,
) -> String {
    [rust_log, bridge_level]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|filter| !filter.is_empty())
        .unwrap_or_else(|| fallback.directive())
        .to_string()
}

/// Install the process logger.
///
/// # Returns
/// `RclbRet::Ok` on success, `RclbRet::AlreadyInit` if a logger is already
/// installed; that logger is left in place.
///
/// # Example (C)
/// ```c
/// rclb_logging_init(RCLB_LOG_SEVERITY_RCLB_LOG_INFO);
/// ```
#[no_mangle]
pub extern "C" fn rclb_logging_init(fallback: RclbLogSeverity) -> RclbRet {
    let rust_log = env::var("RUST_LOG").ok();
    let bridge_level = env::var(RCLB_LOG_LEVEL_ENV).ok();
    let filter = resolve_filter(rust_log.as_deref(), bridge_level.as_deref(), fallback);

    match env_logger::Builder::new()
        .parse_filters(&filter)
        .format_timestamp_millis()
        .try_init()
    {
        Ok(()) => {
            log::debug!("[rclbridge-c] logger installed with filter '{}'", filter);
            RclbRet::Ok
        }
        Err(_) => RclbRet::AlreadyInit,
    }
}
