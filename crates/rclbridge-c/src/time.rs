// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Clocks and the ROS-time override.

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::error_handling::set_error_msg;
use crate::{check_arg_for_null, RclbRet};

/// Time source selector
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RclbClockType {
    RclbClockUninitialized = 0,
    RclbRosTime = 1,
    RclbSystemTime = 2,
    RclbSteadyTime = 3,
}

struct RosTimeOverride {
    active: AtomicBool,
    current_time: AtomicI64,
}

/// Private state of an initialized clock
pub struct RclbClockImpl {
    ros_override: Option<RosTimeOverride>,
}

/// Clock structure; `impl_` is null until [`rclb_clock_init`] succeeds.
#[repr(C)]
#[derive(Debug)]
pub struct RclbClock {
    pub clock_type: RclbClockType,
    pub impl_: *mut RclbClockImpl,
}

#[cfg(unix)]
fn clock_gettime_ns(clockid: libc::clockid_t) -> io::Result<i64> {
    // SAFETY: timespec is a POD type that can be safely zero-initialized
    let mut ts: libc::timespec = unsafe { std::mem::zeroed() };
    // SAFETY: &mut ts is a valid pointer to a properly sized timespec struct
    let ret = unsafe { libc::clock_gettime(clockid, &mut ts) };
    if ret < 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(ts.tv_sec as i64 * 1_000_000_000 + ts.tv_nsec as i64)
}

#[cfg(unix)]
fn system_time_now() -> io::Result<i64> {
    clock_gettime_ns(libc::CLOCK_REALTIME)
}

#[cfg(unix)]
fn steady_time_now() -> io::Result<i64> {
    clock_gettime_ns(libc::CLOCK_MONOTONIC)
}

#[cfg(not(unix))]
fn system_time_now() -> io::Result<i64> {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    Ok(now.as_nanos() as i64)
}

#[cfg(not(unix))]
fn steady_time_now() -> io::Result<i64> {
    use std::sync::OnceLock;
    use std::time::Instant;
    static ORIGIN: OnceLock<Instant> = OnceLock::new();
    Ok(ORIGIN.get_or_init(Instant::now).elapsed().as_nanos() as i64)
}

/// Read `clock`, recording the diagnostic on failure.
pub(crate) unsafe fn clock_now(clock: *const RclbClock) -> Result<i64, RclbRet> {
    if !rclb_clock_valid(clock) {
        set_error_msg("clock is not initialized or does not have a time source");
        return Err(RclbRet::Error);
    }
    let clock = &*clock;
    let imp = &*clock.impl_;
    let read = match clock.clock_type {
        RclbClockType::RclbRosTime => match imp.ros_override.as_ref() {
            Some(ov) if ov.active.load(Ordering::Acquire) => {
                return Ok(ov.current_time.load(Ordering::Acquire));
            }
            _ => system_time_now(),
        },
        RclbClockType::RclbSystemTime => system_time_now(),
        RclbClockType::RclbSteadyTime => steady_time_now(),
        RclbClockType::RclbClockUninitialized => unreachable!("validated above"),
    };
    read.map_err(|err| {
        set_error_msg(format!("failed to read the time source: {}", err));
        RclbRet::Error
    })
}

unsafe fn ros_override<'a>(
    clock: *mut RclbClock,
    action: &str,
) -> Result<&'a RosTimeOverride, RclbRet> {
    if (*clock).clock_type != RclbClockType::RclbRosTime {
        set_error_msg(format!(
            "clock is not of type RCLB_ROS_TIME, cannot {}",
            action
        ));
        return Err(RclbRet::Error);
    }
    match (*clock).impl_.as_ref().and_then(|imp| imp.ros_override.as_ref()) {
        Some(ov) => Ok(ov),
        None => {
            set_error_msg("clock storage is not initialized, cannot access ROS time override");
            Err(RclbRet::Error)
        }
    }
}

/// Return a clock with a null implementation.
#[no_mangle]
pub extern "C" fn rclb_get_zero_initialized_clock() -> RclbClock {
    RclbClock {
        clock_type: RclbClockType::RclbClockUninitialized,
        impl_: ptr::null_mut(),
    }
}

/// Initialize a clock of the given type.
///
/// An `RclbClockUninitialized` clock initializes successfully but is never
/// valid.
///
/// # Safety
/// - `clock` must be null or point to a writable `RclbClock`.
#[no_mangle]
pub unsafe extern "C" fn rclb_clock_init(
    clock_type: RclbClockType,
    clock: *mut RclbClock,
) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    if !(*clock).impl_.is_null() {
        set_error_msg("clock already initialized");
        return RclbRet::AlreadyInit;
    }
    let ros_override = (clock_type == RclbClockType::RclbRosTime).then(|| RosTimeOverride {
        active: AtomicBool::new(false),
        current_time: AtomicI64::new(0),
    });
    (*clock).clock_type = clock_type;
    (*clock).impl_ = Box::into_raw(Box::new(RclbClockImpl { ros_override }));
    RclbRet::Ok
}

/// Whether the clock is initialized with a real time source.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
#[no_mangle]
pub unsafe extern "C" fn rclb_clock_valid(clock: *const RclbClock) -> bool {
    if clock.is_null() {
        return false;
    }
    let clock = &*clock;
    !clock.impl_.is_null() && clock.clock_type != RclbClockType::RclbClockUninitialized
}

/// Read the current time in nanoseconds.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
/// - `time_point_value` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_clock_get_now(
    clock: *const RclbClock,
    time_point_value: *mut i64,
) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    check_arg_for_null!(time_point_value, "time_point_value", RclbRet::InvalidArgument);
    match clock_now(clock) {
        Ok(now) => {
            time_point_value.write(now);
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Make `now` report the override value.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
#[no_mangle]
pub unsafe extern "C" fn rclb_enable_ros_time_override(clock: *mut RclbClock) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    match ros_override(clock, "enable override") {
        Ok(ov) => {
            ov.active.store(true, Ordering::Release);
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Make `now` track the system clock again.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
#[no_mangle]
pub unsafe extern "C" fn rclb_disable_ros_time_override(clock: *mut RclbClock) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    match ros_override(clock, "disable override") {
        Ok(ov) => {
            ov.active.store(false, Ordering::Release);
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Query the override flag.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
/// - `is_enabled` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_is_enabled_ros_time_override(
    clock: *mut RclbClock,
    is_enabled: *mut bool,
) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    check_arg_for_null!(is_enabled, "is_enabled", RclbRet::InvalidArgument);
    match ros_override(clock, "query override state") {
        Ok(ov) => {
            is_enabled.write(ov.active.load(Ordering::Acquire));
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Store the simulated time; observable only while the override is enabled.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
#[no_mangle]
pub unsafe extern "C" fn rclb_set_ros_time_override(
    clock: *mut RclbClock,
    time_value: i64,
) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    match ros_override(clock, "set time override") {
        Ok(ov) => {
            ov.current_time.store(time_value, Ordering::Release);
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Release a clock and reset it to zero-initialized.
///
/// # Safety
/// - `clock` must be null or point to an `RclbClock`.
/// - No timer bound to the clock may be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn rclb_clock_fini(clock: *mut RclbClock) -> RclbRet {
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    if (*clock).impl_.is_null() {
        set_error_msg("clock is not initialized");
        return RclbRet::InvalidArgument;
    }
    drop(Box::from_raw((*clock).impl_));
    (*clock).impl_ = ptr::null_mut();
    (*clock).clock_type = RclbClockType::RclbClockUninitialized;
    RclbRet::Ok
}
