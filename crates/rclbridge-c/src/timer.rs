// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic timers bound to a clock.
//!
//! Deadlines are evaluated against the associated clock on every query, so a
//! timer bound to a ROS-time clock with the override enabled only moves when
//! the override value moves.

use std::os::raw::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};

use crate::context::{rclb_context_is_valid, RclbContext};
use crate::error_handling::set_error_msg;
use crate::time::{clock_now, RclbClock};
use crate::{check_arg_for_null, RclbRet};

/// Invoked by [`rclb_timer_call`] with the nanoseconds elapsed since the
/// previous call.
pub type RclbTimerCallback =
    Option<unsafe extern "C" fn(*mut RclbTimer, i64, *mut c_void)>;

/// Private state of an initialized timer
pub struct RclbTimerImpl {
    clock: *mut RclbClock,
    callback: RclbTimerCallback,
    user_data: *mut c_void,
    period: AtomicI64,
    last_call_time: AtomicI64,
    next_call_time: AtomicI64,
    canceled: AtomicBool,
}

/// Timer structure; `impl_` is null until [`rclb_timer_init`] succeeds.
#[repr(C)]
#[derive(Debug)]
pub struct RclbTimer {
    pub impl_: *mut RclbTimerImpl,
}

unsafe fn timer_impl<'a>(timer: *const RclbTimer) -> Result<&'a RclbTimerImpl, RclbRet> {
    if timer.is_null() {
        set_error_msg("timer argument is null");
        return Err(RclbRet::InvalidArgument);
    }
    match (*timer).impl_.as_ref() {
        Some(imp) => Ok(imp),
        None => {
            set_error_msg("timer is not initialized");
            Err(RclbRet::TimerInvalid)
        }
    }
}

/// Next deadline after a call at `now`: advance by exactly one period from
/// the previous deadline, skipping whole periods that were missed.
fn next_deadline(previous_deadline: i64, period: i64, now: i64) -> i64 {
    let next = previous_deadline.saturating_add(period);
    if next >= now {
        return next;
    }
    if period == 0 {
        return now;
    }
    // `now - next` can exceed the i64 range; the sum only overflows upwards.
    let (next, period) = (i128::from(next), i128::from(period));
    let behind = i128::from(now) - next;
    let periods_behind = 1 + (behind - 1) / period;
    i64::try_from(next + periods_behind * period).unwrap_or(i64::MAX)
}

/// Return a timer with a null implementation.
#[no_mangle]
pub extern "C" fn rclb_get_zero_initialized_timer() -> RclbTimer {
    RclbTimer {
        impl_: ptr::null_mut(),
    }
}

/// Bind a timer to a clock with a period in nanoseconds.
///
/// # Safety
/// - `timer` must be null or point to a writable `RclbTimer`.
/// - `clock` must be null or point to an initialized clock that outlives the
///   timer and does not move while the timer is initialized.
/// - `context` must be null or point to an `RclbContext`.
/// - `user_data` is passed through to `callback` untouched.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_init(
    timer: *mut RclbTimer,
    clock: *mut RclbClock,
    context: *const RclbContext,
    period: i64,
    callback: RclbTimerCallback,
    user_data: *mut c_void,
) -> RclbRet {
    check_arg_for_null!(timer, "timer", RclbRet::InvalidArgument);
    check_arg_for_null!(clock, "clock", RclbRet::InvalidArgument);
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    if !(*timer).impl_.is_null() {
        set_error_msg("timer already initialized, or memory was uninitialized");
        return RclbRet::AlreadyInit;
    }
    if period < 0 {
        set_error_msg(format!("timer period must be non-negative, got {}", period));
        return RclbRet::InvalidArgument;
    }
    if !rclb_context_is_valid(context) {
        set_error_msg("context is not valid");
        return RclbRet::NotInit;
    }
    let now = match clock_now(clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    let imp = Box::new(RclbTimerImpl {
        clock,
        callback,
        user_data,
        period: AtomicI64::new(period),
        last_call_time: AtomicI64::new(now),
        next_call_time: AtomicI64::new(now.saturating_add(period)),
        canceled: AtomicBool::new(false),
    });
    (*timer).impl_ = Box::into_raw(imp);
    RclbRet::Ok
}

/// Consume the current period and invoke the callback.
///
/// Fails with `RclbRet::TimerCanceled` on a canceled timer and with
/// `RclbRet::Error` when the deadline has not elapsed yet.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_call(timer: *mut RclbTimer) -> RclbRet {
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    if imp.canceled.load(Ordering::Acquire) {
        set_error_msg("timer is canceled");
        return RclbRet::TimerCanceled;
    }
    let now = match clock_now(imp.clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    if now < 0 {
        set_error_msg("clock now returned negative time point value");
        return RclbRet::Error;
    }
    let deadline = imp.next_call_time.load(Ordering::Acquire);
    if now < deadline {
        set_error_msg(format!(
            "timer is not ready to be called, next call in {} ns",
            deadline.saturating_sub(now)
        ));
        return RclbRet::Error;
    }

    let previous = imp.last_call_time.swap(now, Ordering::AcqRel);
    let period = imp.period.load(Ordering::Acquire);
    imp.next_call_time
        .store(next_deadline(deadline, period, now), Ordering::Release);

    if let Some(callback) = imp.callback {
        callback(timer, now.saturating_sub(previous), imp.user_data);
    }
    RclbRet::Ok
}

/// Whether the deadline has elapsed on a non-canceled timer.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `is_ready` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_is_ready(
    timer: *const RclbTimer,
    is_ready: *mut bool,
) -> RclbRet {
    check_arg_for_null!(is_ready, "is_ready", RclbRet::InvalidArgument);
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    if imp.canceled.load(Ordering::Acquire) {
        is_ready.write(false);
        return RclbRet::Ok;
    }
    let now = match clock_now(imp.clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    is_ready.write(imp.next_call_time.load(Ordering::Acquire) <= now);
    RclbRet::Ok
}

/// Query the canceled flag.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `is_canceled` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_is_canceled(
    timer: *const RclbTimer,
    is_canceled: *mut bool,
) -> RclbRet {
    check_arg_for_null!(is_canceled, "is_canceled", RclbRet::InvalidArgument);
    match timer_impl(timer) {
        Ok(imp) => {
            is_canceled.write(imp.canceled.load(Ordering::Acquire));
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Re-arm: deadline and last call are recomputed from now, cancel is cleared.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_reset(timer: *mut RclbTimer) -> RclbRet {
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    let now = match clock_now(imp.clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    let period = imp.period.load(Ordering::Acquire);
    imp.last_call_time.store(now, Ordering::Release);
    imp.next_call_time
        .store(now.saturating_add(period), Ordering::Release);
    imp.canceled.store(false, Ordering::Release);
    RclbRet::Ok
}

/// Cancel; the timer stays canceled until [`rclb_timer_reset`].
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_cancel(timer: *mut RclbTimer) -> RclbRet {
    match timer_impl(timer) {
        Ok(imp) => {
            imp.canceled.store(true, Ordering::Release);
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Nanoseconds until the deadline; negative once it has passed. Saturates
/// at the `i64` bounds.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `time_until_next_call` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_get_time_until_next_call(
    timer: *const RclbTimer,
    time_until_next_call: *mut i64,
) -> RclbRet {
    check_arg_for_null!(
        time_until_next_call,
        "time_until_next_call",
        RclbRet::InvalidArgument
    );
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    if imp.canceled.load(Ordering::Acquire) {
        set_error_msg("timer is canceled");
        return RclbRet::TimerCanceled;
    }
    let now = match clock_now(imp.clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    time_until_next_call.write(
        imp.next_call_time
            .load(Ordering::Acquire)
            .saturating_sub(now),
    );
    RclbRet::Ok
}

/// Nanoseconds since the last call (or since init/reset).
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `time_since_last_call` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_get_time_since_last_call(
    timer: *const RclbTimer,
    time_since_last_call: *mut i64,
) -> RclbRet {
    check_arg_for_null!(
        time_since_last_call,
        "time_since_last_call",
        RclbRet::InvalidArgument
    );
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    let now = match clock_now(imp.clock) {
        Ok(now) => now,
        Err(ret) => return ret,
    };
    time_since_last_call.write(now.saturating_sub(imp.last_call_time.load(Ordering::Acquire)));
    RclbRet::Ok
}

/// Period in nanoseconds.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `period` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_get_period(
    timer: *const RclbTimer,
    period: *mut i64,
) -> RclbRet {
    check_arg_for_null!(period, "period", RclbRet::InvalidArgument);
    match timer_impl(timer) {
        Ok(imp) => {
            period.write(imp.period.load(Ordering::Acquire));
            RclbRet::Ok
        }
        Err(ret) => ret,
    }
}

/// Swap the period, writing the previous one to `old_period`.
///
/// The current deadline is kept; the new period applies from the next call
/// or reset.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
/// - `old_period` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_exchange_period(
    timer: *const RclbTimer,
    new_period: i64,
    old_period: *mut i64,
) -> RclbRet {
    check_arg_for_null!(old_period, "old_period", RclbRet::InvalidArgument);
    let imp = match timer_impl(timer) {
        Ok(imp) => imp,
        Err(ret) => return ret,
    };
    if new_period < 0 {
        set_error_msg(format!(
            "timer period must be non-negative, got {}",
            new_period
        ));
        return RclbRet::InvalidArgument;
    }
    old_period.write(imp.period.swap(new_period, Ordering::AcqRel));
    RclbRet::Ok
}

/// Release a timer; a null or zero-initialized timer is accepted.
///
/// # Safety
/// - `timer` must be null or point to an `RclbTimer`.
#[no_mangle]
pub unsafe extern "C" fn rclb_timer_fini(timer: *mut RclbTimer) -> RclbRet {
    if timer.is_null() || (*timer).impl_.is_null() {
        return RclbRet::Ok;
    }
    let imp = Box::from_raw((*timer).impl_);
    imp.canceled.store(true, Ordering::Release);
    drop(imp);
    (*timer).impl_ = ptr::null_mut();
    RclbRet::Ok
}
