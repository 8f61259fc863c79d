// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Periodic timers.
//!
//! Every handle-level operation except [`dispose`] requires a non-empty
//! handle and panics otherwise: using a disposed timer is a lifecycle bug in
//! the caller. Native failures surface as [`Error::State`](crate::Error).

use std::marker::PhantomData;
use std::os::raw::c_void;
use std::panic::{self, AssertUnwindSafe};
use std::ptr;

use rclbridge_c::{
    rclb_get_zero_initialized_timer, rclb_timer_call, rclb_timer_cancel,
    rclb_timer_exchange_period, rclb_timer_fini, rclb_timer_get_period,
    rclb_timer_get_time_since_last_call, rclb_timer_get_time_until_next_call, rclb_timer_init,
    rclb_timer_is_canceled, rclb_timer_is_ready, rclb_timer_reset, RclbClock, RclbContext,
    RclbTimer, RclbTimerCallback,
};

use crate::clock::Clock;
use crate::context::Context;
use crate::error::{check, native_error, ErrorKind, Result};
use crate::handle::Handle;

type Callback = Box<dyn FnMut(i64) + Send>;

fn expect_live(handle: &Handle<RclbTimer>) -> *mut RclbTimer {
    assert!(!handle.is_empty(), "timer handle used after dispose");
    handle.as_ptr()
}

unsafe fn init_timer(
    clock: *mut RclbClock,
    context: *const RclbContext,
    period: i64,
    callback: RclbTimerCallback,
    user_data: *mut c_void,
) -> Result<Handle<RclbTimer>> {
    let mut handle = Handle::from_box(Box::new(rclb_get_zero_initialized_timer()));
    let ret = rclb_timer_init(handle.as_ptr(), clock, context, period, callback, user_data);
    if !ret.is_ok() {
        let err = native_error(ErrorKind::Init, ret, "Failed to init timer");
        handle.retire();
        return Err(err);
    }
    Ok(handle)
}

/// Create a timer without a callback.
///
/// # Safety
/// The clock must stay alive and must not be disposed until the returned
/// timer is disposed. [`Timer`] enforces this with a borrow.
pub unsafe fn create(
    clock: &Handle<RclbClock>,
    context: &Handle<RclbContext>,
    period: i64,
) -> Result<Handle<RclbTimer>> {
    init_timer(clock.as_ptr(), context.as_ptr(), period, None, ptr::null_mut())
}

pub fn is_ready(handle: &Handle<RclbTimer>) -> Result<bool> {
    let timer = expect_live(handle);
    let mut ready = false;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_is_ready(timer, &mut ready) };
    check(ret, ErrorKind::State, "Failed to check timer ready")?;
    Ok(ready)
}

pub fn is_canceled(handle: &Handle<RclbTimer>) -> Result<bool> {
    let timer = expect_live(handle);
    let mut canceled = false;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_is_canceled(timer, &mut canceled) };
    check(ret, ErrorKind::State, "Failed to check timer canceled")?;
    Ok(canceled)
}

/// Re-arm: the next deadline is one period from now and the cancel is
/// cleared.
pub fn reset(handle: &Handle<RclbTimer>) -> Result<()> {
    let timer = expect_live(handle);
    // SAFETY: live timer.
    let ret = unsafe { rclb_timer_reset(timer) };
    check(ret, ErrorKind::State, "Failed to reset timer")
}

/// Cancel until the next [`reset`].
pub fn cancel(handle: &Handle<RclbTimer>) -> Result<()> {
    let timer = expect_live(handle);
    // SAFETY: live timer.
    let ret = unsafe { rclb_timer_cancel(timer) };
    check(ret, ErrorKind::State, "Failed to cancel timer")
}

/// Nanoseconds until the deadline; negative once it has passed.
pub fn time_until_next_call(handle: &Handle<RclbTimer>) -> Result<i64> {
    let timer = expect_live(handle);
    let mut remaining = 0i64;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_get_time_until_next_call(timer, &mut remaining) };
    check(ret, ErrorKind::State, "Failed to get time until next timer call")?;
    Ok(remaining)
}

pub fn time_since_last_call(handle: &Handle<RclbTimer>) -> Result<i64> {
    let timer = expect_live(handle);
    let mut elapsed = 0i64;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_get_time_since_last_call(timer, &mut elapsed) };
    check(ret, ErrorKind::State, "Failed to get time since last timer call")?;
    Ok(elapsed)
}

pub fn get_period(handle: &Handle<RclbTimer>) -> Result<i64> {
    let timer = expect_live(handle);
    let mut period = 0i64;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_get_period(timer, &mut period) };
    check(ret, ErrorKind::State, "Failed to get timer period")?;
    Ok(period)
}

/// Swap the period and return the previous one.
pub fn exchange_period(handle: &Handle<RclbTimer>, new_period: i64) -> Result<i64> {
    let timer = expect_live(handle);
    let mut old_period = 0i64;
    // SAFETY: live timer, writable local.
    let ret = unsafe { rclb_timer_exchange_period(timer, new_period, &mut old_period) };
    check(ret, ErrorKind::State, "Failed to exchange timer period")?;
    Ok(old_period)
}

/// [`exchange_period`], discarding the previous period.
pub fn set_period(handle: &Handle<RclbTimer>, period: i64) -> Result<()> {
    exchange_period(handle, period).map(|_| ())
}

/// Consume the elapsed period and run the callback, if any.
///
/// Fails when the timer is canceled or not ready yet.
pub fn call(handle: &Handle<RclbTimer>) -> Result<()> {
    let timer = expect_live(handle);
    // SAFETY: live timer.
    let ret = unsafe { rclb_timer_call(timer) };
    check(ret, ErrorKind::State, "Failed to call timer")
}

/// Finalize and release the timer; no-op on an empty handle.
pub fn dispose(handle: &mut Handle<RclbTimer>) -> Result<()> {
    if handle.is_empty() {
        return Ok(());
    }
    // SAFETY: non-empty handles own a live timer.
    let ret = unsafe { rclb_timer_fini(handle.as_ptr()) };
    check(ret, ErrorKind::State, "Failed to fini timer")?;
    handle.retire();
    Ok(())
}

unsafe extern "C" fn dispatch_callback(
    _timer: *mut RclbTimer,
    elapsed: i64,
    user_data: *mut c_void,
) {
    if user_data.is_null() {
        return;
    }
    let callback = &mut *user_data.cast::<Callback>();
    if panic::catch_unwind(AssertUnwindSafe(|| callback(elapsed))).is_err() {
        log::error!("[rclbridge] timer callback panicked");
    }
}

/// Owned timer bound to a clock it borrows; disposed on drop.
pub struct Timer<'clock> {
    handle: Handle<RclbTimer>,
    // Thin pointer from `Box::into_raw`, shared with the native timer and
    // freed only after native fini. Null without a callback.
    callback: *mut Callback,
    _clock: PhantomData<&'clock Clock>,
}

impl<'clock> Timer<'clock> {
    /// Timer firing `callback` with the nanoseconds elapsed since the
    /// previous call.
    pub fn new<F>(clock: &'clock Clock, context: &Context, period: i64, callback: F) -> Result<Self>
    where
        F: FnMut(i64) + Send + 'static,
    {
        let boxed: Box<Callback> = Box::new(Box::new(callback));
        let callback = Box::into_raw(boxed);
        // SAFETY: the borrow keeps the clock alive; the callback outlives the
        // native registration.
        let init = unsafe {
            init_timer(
                clock.handle().as_ptr(),
                context.handle().as_ptr(),
                period,
                Some(dispatch_callback),
                callback.cast::<c_void>(),
            )
        };
        match init {
            Ok(handle) => Ok(Self {
                handle,
                callback,
                _clock: PhantomData,
            }),
            Err(err) => {
                // SAFETY: never registered, so this is the only owner.
                drop(unsafe { Box::from_raw(callback) });
                Err(err)
            }
        }
    }

    /// Timer whose calls only advance the schedule.
    pub fn without_callback(clock: &'clock Clock, context: &Context, period: i64) -> Result<Self> {
        // SAFETY: the borrow keeps the clock alive.
        let handle = unsafe { create(clock.handle(), context.handle(), period)? };
        Ok(Self {
            handle,
            callback: ptr::null_mut(),
            _clock: PhantomData,
        })
    }

    #[must_use]
    pub fn handle(&self) -> &Handle<RclbTimer> {
        &self.handle
    }

    #[must_use]
    pub fn has_callback(&self) -> bool {
        !self.callback.is_null()
    }

    pub fn is_ready(&self) -> Result<bool> {
        is_ready(&self.handle)
    }

    pub fn is_canceled(&self) -> Result<bool> {
        is_canceled(&self.handle)
    }

    pub fn reset(&self) -> Result<()> {
        reset(&self.handle)
    }

    pub fn cancel(&self) -> Result<()> {
        cancel(&self.handle)
    }

    pub fn time_until_next_call(&self) -> Result<i64> {
        time_until_next_call(&self.handle)
    }

    pub fn time_since_last_call(&self) -> Result<i64> {
        time_since_last_call(&self.handle)
    }

    pub fn period(&self) -> Result<i64> {
        get_period(&self.handle)
    }

    pub fn exchange_period(&self, new_period: i64) -> Result<i64> {
        exchange_period(&self.handle, new_period)
    }

    pub fn set_period(&self, period: i64) -> Result<()> {
        set_period(&self.handle, period)
    }

    pub fn call(&mut self) -> Result<()> {
        call(&self.handle)
    }

    /// Finalize now and release the callback; later calls and the drop
    /// become no-ops.
    pub fn dispose(&mut self) -> Result<()> {
        dispose(&mut self.handle)?;
        if !self.callback.is_null() {
            // SAFETY: the native timer is finalized and no longer holds the
            // pointer.
            drop(unsafe { Box::from_raw(self.callback) });
            self.callback = ptr::null_mut();
        }
        Ok(())
    }
}

impl Drop for Timer<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            // The native timer may still call into it, so the callback leaks.
            log::warn!("[rclbridge] timer dispose on drop failed: {}", e);
        }
    }
}
