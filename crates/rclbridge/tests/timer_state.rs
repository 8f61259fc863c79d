// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Timer state machine driven by a ROS-time clock with the override enabled,
// so every deadline is deterministic.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use rclbridge::{clock, timer};
use rclbridge::{Clock, ClockType, Context, ErrorKind, Handle, RclbRet, Time, Timer};

const PERIOD: i64 = 100;

fn sim_clock(start: i64) -> Result<Clock> {
    let clock = Clock::new(ClockType::RosTime)?;
    clock.set_ros_time_is_active(true)?;
    clock.set_ros_time_override(Time::from_nanos(start, ClockType::RosTime)?)?;
    Ok(clock)
}

fn set_time(clock: &Clock, nanos: i64) -> Result<()> {
    clock.set_ros_time_override(Time::from_nanos(nanos, ClockType::RosTime)?)?;
    Ok(())
}

#[test]
fn test_cancel_and_reset() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(0)?;
    let timer = Timer::without_callback(&clock, &context, PERIOD)?;

    assert!(!timer.is_canceled()?);
    timer.cancel()?;
    assert!(timer.is_canceled()?);
    set_time(&clock, 10 * PERIOD)?;
    assert!(!timer.is_ready()?);

    timer.reset()?;
    assert!(!timer.is_canceled()?);
    Ok(())
}

#[test]
fn test_reset_rearms_one_period_from_now() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(1_000)?;
    let timer = Timer::without_callback(&clock, &context, PERIOD)?;

    set_time(&clock, 1_250)?;
    timer.reset()?;
    assert_eq!(timer.time_until_next_call()?, PERIOD);
    assert_eq!(timer.time_since_last_call()?, 0);
    Ok(())
}

#[test]
fn test_reset_on_real_clock_is_close_to_period() -> Result<()> {
    const LONG_PERIOD: i64 = 1_000_000_000;
    let context = Context::new::<&str>(&[])?;
    let clock = Clock::new(ClockType::SteadyTime)?;
    let timer = Timer::without_callback(&clock, &context, LONG_PERIOD)?;

    timer.reset()?;
    let until = timer.time_until_next_call()?;
    let since = timer.time_since_last_call()?;
    assert!(until <= LONG_PERIOD && until > LONG_PERIOD / 2, "until = {}", until);
    assert!((0..LONG_PERIOD / 2).contains(&since), "since = {}", since);
    Ok(())
}

#[test]
fn test_exchange_period_returns_previous() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(0)?;
    let timer = Timer::without_callback(&clock, &context, PERIOD)?;

    assert_eq!(timer.exchange_period(250)?, PERIOD);
    assert_eq!(timer.period()?, 250);
    timer.set_period(PERIOD)?;
    assert_eq!(timer.period()?, PERIOD);

    let err = timer.exchange_period(-1).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(timer.period()?, PERIOD);
    Ok(())
}

#[test]
fn test_call_requires_ready_timer() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(0)?;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let mut timer = Timer::new(&clock, &context, PERIOD, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;

    let err = timer.call().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert_eq!(err.ret(), Some(RclbRet::Error));
    assert!(err.message().contains("not ready"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    set_time(&clock, PERIOD)?;
    timer.call()?;
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!timer.is_ready()?);

    timer.cancel()?;
    set_time(&clock, 5 * PERIOD)?;
    let err = timer.call().unwrap_err();
    assert_eq!(err.ret(), Some(RclbRet::TimerCanceled));
    assert_eq!(timer.time_until_next_call().unwrap_err().kind(), ErrorKind::State);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    Ok(())
}

#[test]
fn test_handle_level_operations_and_idempotent_dispose() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(0)?;
    let mut handle = unsafe { timer::create(clock.handle(), context.handle(), PERIOD)? };

    assert_eq!(timer::get_period(&handle)?, PERIOD);
    set_time(&clock, PERIOD)?;
    assert!(timer::is_ready(&handle)?);
    timer::call(&handle)?;
    assert_eq!(timer::time_until_next_call(&handle)?, PERIOD);

    timer::dispose(&mut handle)?;
    timer::dispose(&mut handle)?;
    timer::dispose(&mut Handle::empty())?;
    Ok(())
}

#[test]
fn test_timer_needs_valid_context() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    context.shutdown()?;
    let clock = sim_clock(0)?;

    let err = Timer::without_callback(&clock, &context, PERIOD).err().expect("error");
    assert_eq!(err.kind(), ErrorKind::Init);
    assert_eq!(err.ret(), Some(RclbRet::NotInit));
    Ok(())
}

#[test]
fn test_extreme_period_and_negative_time_saturate() -> Result<()> {
    let context = Context::new::<&str>(&[])?;
    let clock = sim_clock(1_000)?;
    let mut timer = Timer::without_callback(&clock, &context, i64::MAX)?;

    // Negative overrides are only reachable through the raw clock handle.
    clock::set_ros_time_override(clock.handle(), -1)?;
    assert_eq!(timer.time_until_next_call()?, i64::MAX);
    assert!(!timer.is_ready()?);
    assert_eq!(timer.time_since_last_call()?, -1_001);

    let err = timer.call().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::State);
    assert!(err.message().contains("negative"));

    clock::set_ros_time_override(clock.handle(), i64::MIN)?;
    assert_eq!(timer.time_since_last_call()?, i64::MIN);
    Ok(())
}
