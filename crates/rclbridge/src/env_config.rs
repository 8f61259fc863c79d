// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Environment variable configuration for rclbridge.
//!
//! - `RCLBRIDGE_DOMAIN_ID`: domain ID applied to contexts (fallback: `ROS_DOMAIN_ID`)
//! - `RCLBRIDGE_LOG_LEVEL`: logging level (default: "info")
//! - `RCLBRIDGE_USE_SIM_TIME`: start time sources with ROS time active ("1" or "true")
//!
//! # Example
//!
//! ```bash
//! export RCLBRIDGE_DOMAIN_ID=42
//! export RCLBRIDGE_LOG_LEVEL=debug
//! export RCLBRIDGE_USE_SIM_TIME=true
//! ```

use std::env;

/// Environment variable names
pub const ENV_DOMAIN_ID: &str = "RCLBRIDGE_DOMAIN_ID";
pub const ENV_LOG_LEVEL: &str = rclbridge_c::RCLB_LOG_LEVEL_ENV;
pub const ENV_USE_SIM_TIME: &str = "RCLBRIDGE_USE_SIM_TIME";

/// ROS 2 environment variable for domain ID (fallback)
pub const ENV_ROS_DOMAIN_ID: &str = "ROS_DOMAIN_ID";

/// Runtime configuration from environment variables
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    /// Domain ID; `None` lets the native library resolve it
    pub domain_id: Option<usize>,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Whether ROS time starts active on new time sources
    pub use_sim_time: bool,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            domain_id: None,
            log_level: "info".to_string(),
            use_sim_time: false,
        }
    }
}

fn parse_flag(value: &str) -> bool {
    value == "1" || value.eq_ignore_ascii_case("true")
}

impl EnvConfig {
    /// Load configuration from environment variables
    ///
    /// Priority for domain ID:
    /// 1. RCLBRIDGE_DOMAIN_ID
    /// 2. ROS_DOMAIN_ID
    /// 3. None (native default)
    #[must_use]
    pub fn from_env() -> Self {
        let domain_id = env::var(ENV_DOMAIN_ID)
            .ok()
            .and_then(|s| s.trim().parse::<usize>().ok())
            .or_else(|| {
                env::var(ENV_ROS_DOMAIN_ID)
                    .ok()
                    .and_then(|s| s.trim().parse::<usize>().ok())
            });

        let log_level = env::var(ENV_LOG_LEVEL)
            .ok()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "info".to_string());

        let use_sim_time = env::var(ENV_USE_SIM_TIME)
            .ok()
            .map(|s| parse_flag(&s))
            .unwrap_or(false);

        Self {
            domain_id,
            log_level,
            use_sim_time,
        }
    }

    /// Check if any custom configuration was provided
    #[must_use]
    pub fn is_custom(&self) -> bool {
        self.domain_id.is_some() || self.log_level != "info" || self.use_sim_time
    }
}
