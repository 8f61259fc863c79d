// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Feeds externally received time into ROS-time clocks.
//!
//! Receiving the time (a `/clock` subscription) is node wiring and lives
//! outside this crate; whoever receives it calls [`TimeSource::update_time`].

use std::ptr;

use crate::clock::{Clock, ClockType};
use crate::env_config::EnvConfig;
use crate::error::{Error, Result};
use crate::time::Time;

/// Set of ROS-time clocks driven from one time feed.
#[derive(Debug)]
pub struct TimeSource<'a> {
    clocks: Vec<&'a Clock>,
    ros_time_is_active: bool,
    last_time_set: Time,
}

impl Default for TimeSource<'_> {
    fn default() -> Self {
        Self::new(false)
    }
}

impl<'a> TimeSource<'a> {
    #[must_use]
    pub fn new(use_sim_time: bool) -> Self {
        Self {
            clocks: Vec::new(),
            ros_time_is_active: use_sim_time,
            last_time_set: Time::zero(ClockType::RosTime),
        }
    }

    /// Activation taken from `RCLBRIDGE_USE_SIM_TIME`.
    #[must_use]
    pub fn from_env() -> Self {
        Self::new(EnvConfig::from_env().use_sim_time)
    }

    #[must_use]
    pub fn ros_time_is_active(&self) -> bool {
        self.ros_time_is_active
    }

    /// Enable or disable ROS time on every attached clock.
    ///
    /// Clocks are only touched when the flag actually changes.
    pub fn set_ros_time_is_active(&mut self, enabled: bool) -> Result<()> {
        if self.ros_time_is_active == enabled {
            return Ok(());
        }
        self.ros_time_is_active = enabled;
        log::debug!(
            "[rclbridge] ROS time {} on {} clocks",
            if enabled { "enabled" } else { "disabled" },
            self.clocks.len()
        );
        for clock in &self.clocks {
            clock.set_ros_time_is_active(enabled)?;
        }
        Ok(())
    }

    /// Attach a `ROS_TIME` clock; it immediately receives the last time and
    /// the current activation.
    pub fn attach_clock(&mut self, clock: &'a Clock) -> Result<()> {
        if clock.clock_type() != ClockType::RosTime {
            return Err(Error::InvalidArgument(format!(
                "cannot attach a {} clock to a time source, ROS_TIME required",
                clock.clock_type()
            )));
        }
        clock.set_ros_time_override(self.last_time_set)?;
        clock.set_ros_time_is_active(self.ros_time_is_active)?;
        self.clocks.push(clock);
        Ok(())
    }

    /// Stop updating `clock`; unknown clocks are ignored.
    pub fn detach_clock(&mut self, clock: &Clock) {
        self.clocks.retain(|attached| !ptr::eq(*attached, clock));
    }

    #[must_use]
    pub fn attached_clocks(&self) -> usize {
        self.clocks.len()
    }

    /// Record a received time and push it to every attached clock.
    pub fn update_time(&mut self, time: Time) -> Result<()> {
        self.last_time_set = time.with_clock_type(ClockType::RosTime);
        for clock in &self.clocks {
            clock.set_ros_time_override(self.last_time_set)?;
        }
        Ok(())
    }

    #[must_use]
    pub fn last_time_set(&self) -> Time {
        self.last_time_set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn starts_inactive() {
        let source = TimeSource::default();
        assert!(!source.ros_time_is_active());
        assert_eq!(source.last_time_set().nanoseconds(), 0);
    }

    #[test]
    fn attach_rejects_non_ros_clock() {
        let clock = Clock::new(ClockType::SteadyTime).expect("clock");
        let mut source = TimeSource::default();
        let err = source.attach_clock(&clock).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(source.attached_clocks(), 0);
    }

    #[test]
    fn attach_pushes_activation_and_last_time() {
        let clock = Clock::new(ClockType::RosTime).expect("clock");
        let mut source = TimeSource::new(true);
        source
            .update_time(Time::from_nanos(1_234, ClockType::RosTime).expect("time"))
            .expect("update");

        source.attach_clock(&clock).expect("attach");
        assert!(clock.ros_time_is_active().expect("active"));
        assert_eq!(clock.now().expect("now").nanoseconds(), 1_234);
    }

    #[test]
    fn detached_clock_is_not_updated() {
        let clock = Clock::new(ClockType::RosTime).expect("clock");
        let mut source = TimeSource::default();
        source.attach_clock(&clock).expect("attach");
        source.detach_clock(&clock);
        assert_eq!(source.attached_clocks(), 0);

        source.set_ros_time_is_active(true).expect("activate");
        assert!(!clock.ros_time_is_active().expect("active"));
    }
}
