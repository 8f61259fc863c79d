// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Safe Rust bridge over the rclbridge native contexts, clocks and timers.
//!
//! Native structures are held through move-only [`Handle`]s. Each component
//! offers handle-level functions ([`context`], [`clock`], [`timer`]) and an
//! owned wrapper ([`Context`], [`Clock`], [`Timer`]) that disposes in `Drop`.
//! Native failures become [`Error`] values carrying the native diagnostic,
//! which is cleared as soon as it is read.
//!
//! ```no_run
//! use rclbridge::{Clock, ClockType, Context, Timer};
//!
//! # fn main() -> rclbridge::Result<()> {
//! rclbridge::init_logging();
//! let context = Context::new(&["talker", "--ros-args", "-r", "chatter:=talk"])?;
//! let clock = Clock::new(ClockType::SteadyTime)?;
//! let mut timer = Timer::new(&clock, &context, 1_000_000, |elapsed| {
//!     log::info!("tick after {} ns", elapsed);
//! })?;
//! if timer.is_ready()? {
//!     timer.call()?;
//! }
//! # Ok(())
//! # }
//! ```

pub mod clock;
pub mod context;
pub mod env_config;
mod error;
mod handle;
pub mod time;
pub mod time_source;
pub mod timer;
mod util;

pub use clock::{Clock, ClockType};
pub use context::{Context, InitOptions};
pub use env_config::EnvConfig;
pub use error::{Error, ErrorKind, Result};
pub use handle::Handle;
pub use time::{Time, TimeMsg};
pub use time_source::TimeSource;
pub use timer::Timer;

pub use rclbridge_c::{RclbClock, RclbContext, RclbRet, RclbTimer};

use rclbridge_c::{rclb_logging_init, RclbLogSeverity};

/// Install the process logger.
///
/// The filter is `RUST_LOG` when set, otherwise `RCLBRIDGE_LOG_LEVEL`,
/// otherwise `info`. A logger installed by the host is kept, and only the
/// first successful call logs the environment configuration.
pub fn init_logging() {
    if rclb_logging_init(RclbLogSeverity::RclbLogInfo) == RclbRet::AlreadyInit {
        log::debug!("[rclbridge] logger already installed, keeping it");
        return;
    }
    let config = EnvConfig::from_env();
    if config.is_custom() {
        log::info!(
            "[rclbridge] Environment config: domain_id={:?}, log_level={}, use_sim_time={}",
            config.domain_id,
            config.log_level,
            config.use_sim_time
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_logging_is_repeatable() {
        init_logging();
        init_logging();
    }
}
