// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

// Drives the C ABI the way a foreign caller does: zero-initialized structs,
// status codes, error string read then cleared.

use std::ffi::CStr;
use std::os::raw::c_void;
use std::ptr;

use rclbridge_c::*;

fn take_error() -> String {
    let msg = unsafe { CStr::from_ptr(rclb_get_error_string()) }
        .to_string_lossy()
        .into_owned();
    rclb_reset_error();
    msg
}

unsafe extern "C" fn count_calls(_timer: *mut RclbTimer, elapsed: i64, user_data: *mut c_void) {
    let calls = &mut *user_data.cast::<Vec<i64>>();
    calls.push(elapsed);
}

#[test]
fn test_timer_callback_runs_through_c_abi() {
    let mut options = rclb_get_zero_initialized_init_options();
    let mut context = Box::new(rclb_get_zero_initialized_context());
    let mut clock = Box::new(rclb_get_zero_initialized_clock());
    let mut timer = Box::new(rclb_get_zero_initialized_timer());
    let mut calls: Vec<i64> = Vec::new();

    unsafe {
        assert_eq!(rclb_init_options_init(&mut options), RclbRet::Ok);
        assert_eq!(rclb_init_options_set_domain_id(&mut options, 3), RclbRet::Ok);
        assert_eq!(
            rclb_init(0, ptr::null(), &options, &mut *context),
            RclbRet::Ok
        );
        assert_eq!(rclb_init_options_fini(&mut options), RclbRet::Ok);

        assert_eq!(
            rclb_clock_init(RclbClockType::RclbRosTime, &mut *clock),
            RclbRet::Ok
        );
        assert_eq!(rclb_enable_ros_time_override(&mut *clock), RclbRet::Ok);
        assert_eq!(rclb_set_ros_time_override(&mut *clock, 10), RclbRet::Ok);

        assert_eq!(
            rclb_timer_init(
                &mut *timer,
                &mut *clock,
                &*context,
                5,
                Some(count_calls),
                (&mut calls as *mut Vec<i64>).cast::<c_void>(),
            ),
            RclbRet::Ok
        );

        rclb_set_ros_time_override(&mut *clock, 15);
        assert_eq!(rclb_timer_call(&mut *timer), RclbRet::Ok);
        rclb_set_ros_time_override(&mut *clock, 27);
        assert_eq!(rclb_timer_call(&mut *timer), RclbRet::Ok);

        assert_eq!(rclb_timer_fini(&mut *timer), RclbRet::Ok);
        assert_eq!(rclb_clock_fini(&mut *clock), RclbRet::Ok);
        assert_eq!(rclb_shutdown(&mut *context), RclbRet::Ok);
        assert_eq!(rclb_context_fini(&mut *context), RclbRet::Ok);
    }

    assert_eq!(calls, vec![5, 12]);
    assert!(!rclb_error_is_set());
}

#[test]
fn test_timer_on_invalid_context_is_rejected() {
    let context = rclb_get_zero_initialized_context();
    let mut clock = rclb_get_zero_initialized_clock();
    let mut timer = rclb_get_zero_initialized_timer();
    unsafe {
        assert_eq!(
            rclb_clock_init(RclbClockType::RclbSteadyTime, &mut clock),
            RclbRet::Ok
        );
        let ret = rclb_timer_init(
            &mut timer,
            &mut clock,
            &context,
            1_000,
            None,
            ptr::null_mut(),
        );
        assert_eq!(ret, RclbRet::NotInit);
        assert_eq!(take_error(), "context is not valid");
        assert!(timer.impl_.is_null());
        assert_eq!(rclb_clock_fini(&mut clock), RclbRet::Ok);
    }
}

#[test]
fn test_shutdown_twice_reports_already_shutdown() {
    let mut options = rclb_get_zero_initialized_init_options();
    let mut context = rclb_get_zero_initialized_context();
    unsafe {
        rclb_init_options_init(&mut options);
        rclb_init_options_set_domain_id(&mut options, 0);
        assert_eq!(rclb_init(0, ptr::null(), &options, &mut context), RclbRet::Ok);
        rclb_init_options_fini(&mut options);

        assert_eq!(rclb_shutdown(&mut context), RclbRet::Ok);
        assert_eq!(rclb_shutdown(&mut context), RclbRet::AlreadyShutdown);
        assert_eq!(
            take_error(),
            "rclb_shutdown already called on the given context"
        );
        assert_eq!(rclb_context_fini(&mut context), RclbRet::Ok);
    }
}
