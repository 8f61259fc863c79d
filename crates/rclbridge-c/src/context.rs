// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Init options and context lifecycle.
//!
//! `zero-initialized -> rclb_init -> valid -> rclb_shutdown -> rclb_context_fini`

use std::env;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::arguments::{parse_arguments, ParsedArguments};
use crate::error_handling::set_error_msg;
use crate::{check_arg_for_null, RclbRet, RCLB_DEFAULT_DOMAIN_ID};

/// Environment variable consulted when the init options keep the default domain.
pub const ROS_DOMAIN_ID_ENV: &str = "ROS_DOMAIN_ID";

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

/// Private state of initialized init options
pub struct RclbInitOptionsImpl {
    domain_id: usize,
}

/// Options consumed by [`rclb_init`]
#[repr(C)]
#[derive(Debug)]
pub struct RclbInitOptions {
    pub impl_: *mut RclbInitOptionsImpl,
}

/// Private state of an initialized context
pub struct RclbContextImpl {
    instance_id: AtomicU64,
    domain_id: usize,
    arguments: ParsedArguments,
    unparsed: Vec<CString>,
}

/// Root session state.
///
/// `impl_` is null until [`rclb_init`] succeeds and again after
/// [`rclb_context_fini`].
#[repr(C)]
#[derive(Debug)]
pub struct RclbContext {
    pub impl_: *mut RclbContextImpl,
}

unsafe fn context_impl<'a>(context: *const RclbContext) -> Option<&'a RclbContextImpl> {
    if context.is_null() {
        return None;
    }
    (*context).impl_.as_ref()
}

unsafe fn valid_context_impl<'a>(context: *const RclbContext) -> Option<&'a RclbContextImpl> {
    context_impl(context).filter(|imp| imp.instance_id.load(Ordering::Acquire) != 0)
}

fn resolve_domain_id(requested: usize) -> Result<usize, String> {
    if requested != RCLB_DEFAULT_DOMAIN_ID {
        return Ok(requested);
    }
    match env::var(ROS_DOMAIN_ID_ENV) {
        Ok(value) if value.trim().is_empty() => Ok(0),
        Ok(value) => value.trim().parse::<usize>().map_err(|_| {
            format!(
                "{} is not an integral number: '{}'",
                ROS_DOMAIN_ID_ENV, value
            )
        }),
        Err(_) => Ok(0),
    }
}

/// Return init options with a null implementation.
#[no_mangle]
pub extern "C" fn rclb_get_zero_initialized_init_options() -> RclbInitOptions {
    RclbInitOptions {
        impl_: ptr::null_mut(),
    }
}

/// Initialize zero-initialized init options.
///
/// # Safety
/// - `options` must be null or point to a writable `RclbInitOptions`.
#[no_mangle]
pub unsafe extern "C" fn rclb_init_options_init(options: *mut RclbInitOptions) -> RclbRet {
    check_arg_for_null!(options, "options", RclbRet::InvalidArgument);
    if !(*options).impl_.is_null() {
        set_error_msg(
            "init options already initialized, did you forget to call rclb_init_options_fini?",
        );
        return RclbRet::AlreadyInit;
    }
    let imp = Box::new(RclbInitOptionsImpl {
        domain_id: RCLB_DEFAULT_DOMAIN_ID,
    });
    (*options).impl_ = Box::into_raw(imp);
    RclbRet::Ok
}

/// Set the domain id; [`RCLB_DEFAULT_DOMAIN_ID`] defers to `ROS_DOMAIN_ID`.
///
/// # Safety
/// - `options` must be null or point to initialized init options.
#[no_mangle]
pub unsafe extern "C" fn rclb_init_options_set_domain_id(
    options: *mut RclbInitOptions,
    domain_id: usize,
) -> RclbRet {
    check_arg_for_null!(options, "options", RclbRet::InvalidArgument);
    let Some(imp) = (*options).impl_.as_mut() else {
        set_error_msg("init options impl is invalid");
        return RclbRet::InvalidArgument;
    };
    imp.domain_id = domain_id;
    RclbRet::Ok
}

/// Read the configured domain id.
///
/// # Safety
/// - `options` must be null or point to initialized init options.
/// - `domain_id` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_init_options_get_domain_id(
    options: *const RclbInitOptions,
    domain_id: *mut usize,
) -> RclbRet {
    check_arg_for_null!(options, "options", RclbRet::InvalidArgument);
    check_arg_for_null!(domain_id, "domain_id", RclbRet::InvalidArgument);
    let Some(imp) = (*options).impl_.as_ref() else {
        set_error_msg("init options impl is invalid");
        return RclbRet::InvalidArgument;
    };
    domain_id.write(imp.domain_id);
    RclbRet::Ok
}

/// Release init options.
///
/// # Safety
/// - `options` must be null or point to init options obtained from
///   [`rclb_get_zero_initialized_init_options`].
#[no_mangle]
pub unsafe extern "C" fn rclb_init_options_fini(options: *mut RclbInitOptions) -> RclbRet {
    check_arg_for_null!(options, "options", RclbRet::InvalidArgument);
    if (*options).impl_.is_null() {
        set_error_msg("init options impl is invalid");
        return RclbRet::InvalidArgument;
    }
    drop(Box::from_raw((*options).impl_));
    (*options).impl_ = ptr::null_mut();
    RclbRet::Ok
}

/// Return a context with a null implementation.
#[no_mangle]
pub extern "C" fn rclb_get_zero_initialized_context() -> RclbContext {
    RclbContext {
        impl_: ptr::null_mut(),
    }
}

/// Initialize a context from a process argument vector.
///
/// # Safety
/// - `argv` must be null (only when `argc` is 0) or point to `argc` valid
///   null-terminated C strings.
/// - `options` must be null or point to initialized init options.
/// - `context` must be null or point to a writable `RclbContext`.
#[no_mangle]
pub unsafe extern "C" fn rclb_init(
    argc: c_int,
    argv: *const *const c_char,
    options: *const RclbInitOptions,
    context: *mut RclbContext,
) -> RclbRet {
    if argc < 0 {
        set_error_msg("argc must be non-negative");
        return RclbRet::InvalidArgument;
    }
    if argc > 0 && argv.is_null() {
        set_error_msg("argv is null but argc is positive");
        return RclbRet::InvalidArgument;
    }
    check_arg_for_null!(options, "options", RclbRet::InvalidArgument);
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    let Some(options) = (*options).impl_.as_ref() else {
        set_error_msg("init options impl is invalid");
        return RclbRet::InvalidArgument;
    };
    if !(*context).impl_.is_null() {
        set_error_msg("context is already initialized");
        return RclbRet::AlreadyInit;
    }

    let mut args = Vec::with_capacity(argc as usize);
    for index in 0..argc as usize {
        let item = *argv.add(index);
        if item.is_null() {
            set_error_msg(format!("argv[{}] is null", index));
            return RclbRet::InvalidArgument;
        }
        args.push(CStr::from_ptr(item).to_string_lossy().into_owned());
    }

    let arguments = match parse_arguments(&args) {
        Ok(parsed) => parsed,
        Err(err) => {
            set_error_msg(format!("failed to parse ROS arguments: {}", err.0));
            return RclbRet::InvalidRosArgs;
        }
    };

    let domain_id = match resolve_domain_id(options.domain_id) {
        Ok(id) => id,
        Err(msg) => {
            set_error_msg(msg);
            return RclbRet::Error;
        }
    };

    log::trace!(
        "[rclbridge-c] ros args: {} remaps, {} params, {} params files, log level {:?}, enclave {:?}",
        arguments.remaps.len(),
        arguments.params.len(),
        arguments.params_files.len(),
        arguments.log_level,
        arguments.enclave
    );

    let unparsed = arguments
        .unparsed
        .iter()
        .map(|arg| CString::new(arg.as_str()).unwrap_or_default())
        .collect();
    let instance_id = NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed);
    let imp = Box::new(RclbContextImpl {
        instance_id: AtomicU64::new(instance_id),
        domain_id,
        arguments,
        unparsed,
    });
    (*context).impl_ = Box::into_raw(imp);
    log::debug!(
        "[rclbridge-c] context {} initialized (domain {}, {} args)",
        instance_id,
        domain_id,
        argc
    );
    RclbRet::Ok
}

/// Shut a context down; it stays allocated until [`rclb_context_fini`].
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
#[no_mangle]
pub unsafe extern "C" fn rclb_shutdown(context: *mut RclbContext) -> RclbRet {
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    let Some(imp) = context_impl(context) else {
        set_error_msg("context is zero-initialized");
        return RclbRet::InvalidArgument;
    };
    let previous = imp.instance_id.swap(0, Ordering::AcqRel);
    if previous == 0 {
        set_error_msg("rclb_shutdown already called on the given context");
        return RclbRet::AlreadyShutdown;
    }
    log::debug!("[rclbridge-c] context {} shut down", previous);
    RclbRet::Ok
}

/// Whether the context is initialized and not shut down.
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_is_valid(context: *const RclbContext) -> bool {
    valid_context_impl(context).is_some()
}

/// Instance id of a valid context, 0 otherwise.
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_get_instance_id(context: *const RclbContext) -> u64 {
    context_impl(context)
        .map(|imp| imp.instance_id.load(Ordering::Acquire))
        .unwrap_or(0)
}

/// Domain id resolved at init time.
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
/// - `domain_id` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_get_domain_id(
    context: *const RclbContext,
    domain_id: *mut usize,
) -> RclbRet {
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    check_arg_for_null!(domain_id, "domain_id", RclbRet::InvalidArgument);
    let Some(imp) = valid_context_impl(context) else {
        set_error_msg("context is not valid");
        return RclbRet::InvalidArgument;
    };
    domain_id.write(imp.domain_id);
    RclbRet::Ok
}

/// Number of non-ROS arguments kept from init.
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
/// - `count` must be null or writable.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_get_unparsed_argument_count(
    context: *const RclbContext,
    count: *mut usize,
) -> RclbRet {
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    check_arg_for_null!(count, "count", RclbRet::InvalidArgument);
    let Some(imp) = context_impl(context) else {
        set_error_msg("context is zero-initialized");
        return RclbRet::InvalidArgument;
    };
    count.write(imp.unparsed.len());
    RclbRet::Ok
}

/// Borrow one unparsed argument; null (with the error set) when out of range.
///
/// The string is owned by the context and lives until [`rclb_context_fini`].
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_get_unparsed_argument(
    context: *const RclbContext,
    index: usize,
) -> *const c_char {
    check_arg_for_null!(context, "context", ptr::null());
    let Some(imp) = context_impl(context) else {
        set_error_msg("context is zero-initialized");
        return ptr::null();
    };
    match imp.unparsed.get(index) {
        Some(arg) => arg.as_ptr(),
        None => {
            set_error_msg(format!(
                "argument index {} out of range ({} unparsed arguments)",
                index,
                imp.unparsed.len()
            ));
            ptr::null()
        }
    }
}

/// Release a shut-down context and reset it to zero-initialized.
///
/// Fails on a zero-initialized context and on a context that is still valid.
///
/// # Safety
/// - `context` must be null or point to an `RclbContext`.
/// - No timer created against the context may be used afterwards.
#[no_mangle]
pub unsafe extern "C" fn rclb_context_fini(context: *mut RclbContext) -> RclbRet {
    check_arg_for_null!(context, "context", RclbRet::InvalidArgument);
    let Some(imp) = context_impl(context) else {
        set_error_msg("context is zero-initialized");
        return RclbRet::InvalidArgument;
    };
    if imp.instance_id.load(Ordering::Acquire) != 0 {
        set_error_msg("rclb_shutdown() not called on the given context");
        return RclbRet::InvalidArgument;
    }
    if !imp.arguments.remaps.is_empty() || !imp.arguments.params.is_empty() {
        log::trace!(
            "[rclbridge-c] releasing {} remaps and {} params",
            imp.arguments.remaps.len(),
            imp.arguments.params.len()
        );
    }
    drop(Box::from_raw((*context).impl_));
    (*context).impl_ = ptr::null_mut();
    RclbRet::Ok
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rclb_reset_error;

    fn init_options() -> RclbInitOptions {
        let mut options = rclb_get_zero_initialized_init_options();
        assert_eq!(
            unsafe { rclb_init_options_init(&mut options) },
            RclbRet::Ok
        );
        options
    }

    #[test]
    fn init_options_lifecycle() {
        let mut options = init_options();
        unsafe {
            assert_eq!(rclb_init_options_init(&mut options), RclbRet::AlreadyInit);
            assert_eq!(rclb_init_options_set_domain_id(&mut options, 42), RclbRet::Ok);
            let mut domain = 0usize;
            assert_eq!(
                rclb_init_options_get_domain_id(&options, &mut domain),
                RclbRet::Ok
            );
            assert_eq!(domain, 42);
            assert_eq!(rclb_init_options_fini(&mut options), RclbRet::Ok);
            assert_eq!(rclb_init_options_fini(&mut options), RclbRet::InvalidArgument);
        }
        rclb_reset_error();
    }

    #[test]
    fn context_full_lifecycle() {
        let mut options = init_options();
        let mut context = rclb_get_zero_initialized_context();
        unsafe {
            assert!(!rclb_context_is_valid(&context));
            rclb_init_options_set_domain_id(&mut options, 7);
            assert_eq!(
                rclb_init(0, ptr::null(), &options, &mut context),
                RclbRet::Ok
            );
            assert!(rclb_context_is_valid(&context));
            assert_ne!(rclb_context_get_instance_id(&context), 0);

            let mut domain = 0usize;
            assert_eq!(rclb_context_get_domain_id(&context, &mut domain), RclbRet::Ok);
            assert_eq!(domain, 7);

            assert_eq!(rclb_shutdown(&mut context), RclbRet::Ok);
            assert!(!rclb_context_is_valid(&context));
            assert_eq!(rclb_shutdown(&mut context), RclbRet::AlreadyShutdown);

            assert_eq!(rclb_context_fini(&mut context), RclbRet::Ok);
            assert!(context.impl_.is_null());
            assert_eq!(rclb_init_options_fini(&mut options), RclbRet::Ok);
        }
        rclb_reset_error();
    }

    #[test]
    fn fini_requires_shutdown_and_init() {
        let mut options = init_options();
        let mut context = rclb_get_zero_initialized_context();
        unsafe {
            assert_eq!(rclb_context_fini(&mut context), RclbRet::InvalidArgument);
            rclb_reset_error();

            assert_eq!(
                rclb_init(0, ptr::null(), &options, &mut context),
                RclbRet::Ok
            );
            assert_eq!(rclb_context_fini(&mut context), RclbRet::InvalidArgument);
            rclb_reset_error();
            assert_eq!(
                rclb_init(0, ptr::null(), &options, &mut context),
                RclbRet::AlreadyInit
            );
            rclb_reset_error();

            assert_eq!(rclb_shutdown(&mut context), RclbRet::Ok);
            assert_eq!(rclb_context_fini(&mut context), RclbRet::Ok);
            rclb_init_options_fini(&mut options);
        }
    }

    #[test]
    fn init_keeps_unparsed_arguments() {
        let mut options = init_options();
        let mut context = rclb_get_zero_initialized_context();
        let owned: Vec<CString> = ["app", "--ros-args", "-r", "a:=b", "--", "extra"]
            .iter()
            .map(|s| CString::new(*s).expect("cstring"))
            .collect();
        let argv: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        unsafe {
            assert_eq!(
                rclb_init(argv.len() as c_int, argv.as_ptr(), &options, &mut context),
                RclbRet::Ok
            );
            let mut count = 0usize;
            assert_eq!(
                rclb_context_get_unparsed_argument_count(&context, &mut count),
                RclbRet::Ok
            );
            assert_eq!(count, 2);
            let second = rclb_context_get_unparsed_argument(&context, 1);
            assert_eq!(CStr::from_ptr(second).to_str().expect("utf8"), "extra");
            assert!(rclb_context_get_unparsed_argument(&context, 2).is_null());
            rclb_reset_error();

            rclb_shutdown(&mut context);
            rclb_context_fini(&mut context);
            rclb_init_options_fini(&mut options);
        }
    }

    #[test]
    fn invalid_ros_args_leave_context_untouched() {
        let mut options = init_options();
        let mut context = rclb_get_zero_initialized_context();
        let owned: Vec<CString> = ["--ros-args", "--unknown"]
            .iter()
            .map(|s| CString::new(*s).expect("cstring"))
            .collect();
        let argv: Vec<*const c_char> = owned.iter().map(|s| s.as_ptr()).collect();
        unsafe {
            assert_eq!(
                rclb_init(2, argv.as_ptr(), &options, &mut context),
                RclbRet::InvalidRosArgs
            );
            assert!(context.impl_.is_null());
            rclb_reset_error();
            rclb_init_options_fini(&mut options);
        }
    }

    #[test]
    fn init_rejects_bad_arguments() {
        let options = init_options();
        let mut context = rclb_get_zero_initialized_context();
        unsafe {
            assert_eq!(
                rclb_init(-1, ptr::null(), &options, &mut context),
                RclbRet::InvalidArgument
            );
            assert_eq!(
                rclb_init(1, ptr::null(), &options, &mut context),
                RclbRet::InvalidArgument
            );
            let zero = rclb_get_zero_initialized_init_options();
            assert_eq!(
                rclb_init(0, ptr::null(), &zero, &mut context),
                RclbRet::InvalidArgument
            );
        }
        rclb_reset_error();
        let mut options = options;
        unsafe { rclb_init_options_fini(&mut options) };
    }
}
