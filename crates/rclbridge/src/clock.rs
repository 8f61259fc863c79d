// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Clocks and their ROS-time override.
//!
//! Override queries and mutations on a clock that is not valid (never
//! initialized, or of type `UNINITIALIZED`) are no-ops, so a polling loop
//! holding a stale clock degrades instead of failing.

use std::fmt;
use std::str::FromStr;

use rclbridge_c::{
    rclb_clock_fini, rclb_clock_get_now, rclb_clock_init, rclb_clock_valid,
    rclb_disable_ros_time_override, rclb_enable_ros_time_override,
    rclb_get_zero_initialized_clock, rclb_is_enabled_ros_time_override,
    rclb_set_ros_time_override, RclbClock, RclbClockType,
};

use crate::error::{check, native_error, Error, ErrorKind, Result};
use crate::handle::Handle;
use crate::time::Time;

/// Time source of a clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClockType {
    Uninitialized,
    /// System time, replaced by the override value while it is enabled
    RosTime,
    #[default]
    SystemTime,
    SteadyTime,
}

impl ClockType {
    /// Symbolic name, as accepted by [`ClockType::from_str`].
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Uninitialized => "UNINITIALIZED",
            Self::RosTime => "ROS_TIME",
            Self::SystemTime => "SYSTEM_TIME",
            Self::SteadyTime => "STEADY_TIME",
        }
    }
}

impl FromStr for ClockType {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        match name {
            "UNINITIALIZED" | "TIME_SOURCE_UNINITIALIZED" => Ok(Self::Uninitialized),
            "ROS_TIME" => Ok(Self::RosTime),
            "SYSTEM_TIME" => Ok(Self::SystemTime),
            "STEADY_TIME" => Ok(Self::SteadyTime),
            other => Err(Error::UnrecognizedClockType(other.to_string())),
        }
    }
}

impl fmt::Display for ClockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<ClockType> for RclbClockType {
    fn from(clock_type: ClockType) -> Self {
        match clock_type {
            ClockType::Uninitialized => RclbClockType::RclbClockUninitialized,
            ClockType::RosTime => RclbClockType::RclbRosTime,
            ClockType::SystemTime => RclbClockType::RclbSystemTime,
            ClockType::SteadyTime => RclbClockType::RclbSteadyTime,
        }
    }
}

/// Allocate and initialize a clock from its symbolic type name.
///
/// An unknown name fails before anything is allocated.
pub fn create(clock_type_name: &str) -> Result<Handle<RclbClock>> {
    let clock_type = clock_type_name.parse::<ClockType>()?;
    create_with_type(clock_type)
}

pub fn create_with_type(clock_type: ClockType) -> Result<Handle<RclbClock>> {
    let mut handle = Handle::from_box(Box::new(rclb_get_zero_initialized_clock()));
    // SAFETY: freshly allocated, zero-initialized clock.
    let ret = unsafe { rclb_clock_init(clock_type.into(), handle.as_ptr()) };
    if !ret.is_ok() {
        let err = native_error(ErrorKind::Init, ret, "Failed to init clock");
        handle.retire();
        return Err(err);
    }
    Ok(handle)
}

fn is_valid(handle: &Handle<RclbClock>) -> bool {
    // SAFETY: null or a live clock owned by `handle`.
    unsafe { rclb_clock_valid(handle.as_ptr()) }
}

/// Current time in nanoseconds.
pub fn now(handle: &Handle<RclbClock>) -> Result<i64> {
    let mut nanos = 0i64;
    // SAFETY: `nanos` is a writable local.
    let ret = unsafe { rclb_clock_get_now(handle.as_ptr(), &mut nanos) };
    check(ret, ErrorKind::Runtime, "Failed to get current time")?;
    Ok(nanos)
}

/// `false` without failing on a clock that is not valid.
pub fn is_ros_time_override_enabled(handle: &Handle<RclbClock>) -> Result<bool> {
    if !is_valid(handle) {
        return Ok(false);
    }
    let mut enabled = false;
    // SAFETY: valid clock, `enabled` is a writable local.
    let ret = unsafe { rclb_is_enabled_ros_time_override(handle.as_ptr(), &mut enabled) };
    check(ret, ErrorKind::Runtime, "Failed to get ros_time_override_enabled")?;
    Ok(enabled)
}

pub fn set_ros_time_override_enabled(handle: &Handle<RclbClock>, enabled: bool) -> Result<()> {
    if !is_valid(handle) {
        return Ok(());
    }
    // SAFETY: valid clock.
    let ret = unsafe {
        if enabled {
            rclb_enable_ros_time_override(handle.as_ptr())
        } else {
            rclb_disable_ros_time_override(handle.as_ptr())
        }
    };
    check(ret, ErrorKind::Runtime, "Failed to set ros_time_override_enabled")
}

/// Store the simulated time; visible through [`now`] while the override is
/// enabled.
pub fn set_ros_time_override(handle: &Handle<RclbClock>, nanoseconds: i64) -> Result<()> {
    if !is_valid(handle) {
        return Ok(());
    }
    // SAFETY: valid clock.
    let ret = unsafe { rclb_set_ros_time_override(handle.as_ptr(), nanoseconds) };
    check(ret, ErrorKind::Runtime, "Failed to set time override")
}

/// Finalize and release the clock; no-op on an empty handle.
pub fn dispose(handle: &mut Handle<RclbClock>) -> Result<()> {
    if handle.is_empty() {
        return Ok(());
    }
    // SAFETY: non-empty handles own a live clock.
    let ret = unsafe { rclb_clock_fini(handle.as_ptr()) };
    check(ret, ErrorKind::Runtime, "Failed to fini clock")?;
    handle.retire();
    Ok(())
}

/// Owned clock; disposed on drop.
#[derive(Debug)]
pub struct Clock {
    handle: Handle<RclbClock>,
    clock_type: ClockType,
}

impl Clock {
    pub fn new(clock_type: ClockType) -> Result<Self> {
        Ok(Self {
            handle: create_with_type(clock_type)?,
            clock_type,
        })
    }

    /// Clock from a symbolic type name such as `"ROS_TIME"`.
    pub fn from_name(clock_type_name: &str) -> Result<Self> {
        Self::new(clock_type_name.parse()?)
    }

    #[must_use]
    pub fn clock_type(&self) -> ClockType {
        self.clock_type
    }

    #[must_use]
    pub fn handle(&self) -> &Handle<RclbClock> {
        &self.handle
    }

    /// Fails on a negative reading, which only a raw negative override can
    /// produce.
    pub fn now(&self) -> Result<Time> {
        Time::from_nanos(now(&self.handle)?, self.clock_type)
    }

    pub fn ros_time_is_active(&self) -> Result<bool> {
        is_ros_time_override_enabled(&self.handle)
    }

    pub fn set_ros_time_is_active(&self, enabled: bool) -> Result<()> {
        set_ros_time_override_enabled(&self.handle, enabled)
    }

    pub fn set_ros_time_override(&self, time: Time) -> Result<()> {
        set_ros_time_override(&self.handle, time.nanoseconds())
    }

    pub fn dispose(&mut self) -> Result<()> {
        dispose(&mut self.handle)
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if let Err(e) = dispose(&mut self.handle) {
            log::warn!("[rclbridge] {} clock dispose on drop failed: {}", self.clock_type, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rclbridge_c::rclb_error_is_set;

    #[test]
    fn names_round_trip() {
        for clock_type in [
            ClockType::Uninitialized,
            ClockType::RosTime,
            ClockType::SystemTime,
            ClockType::SteadyTime,
        ] {
            assert_eq!(clock_type.name().parse::<ClockType>().expect("parse"), clock_type);
        }
        assert_eq!(
            "TIME_SOURCE_UNINITIALIZED".parse::<ClockType>().expect("alias"),
            ClockType::Uninitialized
        );
    }

    #[test]
    fn unknown_name_is_rejected() {
        let err = create("BOGUS_TYPE").unwrap_err();
        assert!(matches!(err, Error::UnrecognizedClockType(ref name) if name == "BOGUS_TYPE"));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn non_ros_clock_override_query_fails() {
        let mut handle = create("SYSTEM_TIME").expect("clock");
        let err = is_ros_time_override_enabled(&handle).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Runtime);
        assert!(err.message().contains("not of type RCLB_ROS_TIME"));
        assert!(!rclb_error_is_set());
        dispose(&mut handle).expect("dispose");
    }

    #[test]
    fn uninitialized_clock_is_inert() {
        let mut handle = create("UNINITIALIZED").expect("clock");
        assert!(!is_ros_time_override_enabled(&handle).expect("query"));
        set_ros_time_override_enabled(&handle, true).expect("noop");
        set_ros_time_override(&handle, 5).expect("noop");
        assert_eq!(now(&handle).unwrap_err().kind(), ErrorKind::Runtime);
        dispose(&mut handle).expect("dispose");
    }

    #[test]
    fn negative_override_is_not_a_time() {
        let clock = Clock::new(ClockType::RosTime).expect("clock");
        clock.set_ros_time_is_active(true).expect("override");
        set_ros_time_override(clock.handle(), -1).expect("raw override");
        assert_eq!(now(clock.handle()).expect("raw now"), -1);
        let err = clock.now().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn owned_clock_reports_its_type() {
        let clock = Clock::new(ClockType::default()).expect("clock");
        let now = clock.now().expect("now");
        assert_eq!(now.clock_type(), ClockType::SystemTime);
        assert!(now.nanoseconds() > 0);
    }
}
