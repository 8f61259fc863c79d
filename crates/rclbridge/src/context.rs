// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Execution context lifecycle.
//!
//! Idempotency differs per operation: [`shutdown`] of an invalid context is a
//! no-op, [`dispose`] of an empty handle or of a never-initialized context is
//! a no-op, while native finalization of a context that was not shut down
//! fails.

use std::ffi::CStr;

use rclbridge_c::{
    rclb_context_fini, rclb_context_get_domain_id, rclb_context_get_instance_id,
    rclb_context_get_unparsed_argument, rclb_context_get_unparsed_argument_count,
    rclb_context_is_valid, rclb_get_zero_initialized_context,
    rclb_get_zero_initialized_init_options, rclb_init, rclb_init_options_fini,
    rclb_init_options_init, rclb_init_options_set_domain_id, rclb_shutdown, RclbContext,
    RclbInitOptions, RclbRet,
};

use crate::env_config::EnvConfig;
use crate::error::{check, discard_native_error, native_error, Error, ErrorKind, Result};
use crate::handle::Handle;
use crate::util::NativeArgs;

/// Options applied when initializing a context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitOptions {
    /// Explicit domain ID; `None` lets the native library resolve
    /// `ROS_DOMAIN_ID`.
    pub domain_id: Option<usize>,
}

impl InitOptions {
    #[must_use]
    pub fn with_domain_id(domain_id: usize) -> Self {
        Self {
            domain_id: Some(domain_id),
        }
    }

    #[must_use]
    pub fn from_env_config(config: &EnvConfig) -> Self {
        Self {
            domain_id: config.domain_id,
        }
    }
}

#[cfg(test)]
thread_local! {
    static FAIL_NEXT_OPTIONS_FINI: std::cell::Cell<bool> = const { std::cell::Cell::new(false) };
}

/// Native init options, finalized exactly once.
struct NativeInitOptions {
    raw: RclbInitOptions,
    finished: bool,
}

impl NativeInitOptions {
    fn new(options: &InitOptions) -> Result<Self> {
        let mut raw = rclb_get_zero_initialized_init_options();
        // SAFETY: `raw` is a zero-initialized local.
        let ret = unsafe { rclb_init_options_init(&mut raw) };
        check(ret, ErrorKind::Init, "Failed to init context options")?;

        let mut guard = Self {
            raw,
            finished: false,
        };
        if let Some(domain_id) = options.domain_id {
            // SAFETY: the options were initialized above.
            let ret = unsafe { rclb_init_options_set_domain_id(&mut guard.raw, domain_id) };
            check(ret, ErrorKind::Init, "Failed to set domain id")?;
        }
        Ok(guard)
    }

    fn as_ptr(&self) -> *const RclbInitOptions {
        &self.raw
    }

    fn fini_raw(&mut self) -> RclbRet {
        #[cfg(test)]
        if FAIL_NEXT_OPTIONS_FINI.with(|fail| fail.replace(false)) {
            // SAFETY: the second fini sees released options and fails natively.
            let _ = unsafe { rclb_init_options_fini(&mut self.raw) };
            return unsafe { rclb_init_options_fini(&mut self.raw) };
        }
        // SAFETY: still initialized; `finished` keeps this to a single call.
        unsafe { rclb_init_options_fini(&mut self.raw) }
    }

    fn finish(mut self) -> Result<()> {
        self.finished = true;
        let ret = self.fini_raw();
        check(ret, ErrorKind::Init, "Failed to fini context options")
    }
}

impl Drop for NativeInitOptions {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let ret = self.fini_raw();
        if !ret.is_ok() {
            discard_native_error(ret, "init options fini");
        }
    }
}

/// Allocate a zero-initialized context, ready for [`init`].
#[must_use]
pub fn create() -> Handle<RclbContext> {
    Handle::from_box(Box::new(rclb_get_zero_initialized_context()))
}

/// Whether the context is initialized and not shut down. Never fails.
#[must_use]
pub fn is_valid(handle: &Handle<RclbContext>) -> bool {
    // SAFETY: null or a live context owned by `handle`.
    unsafe { rclb_context_is_valid(handle.as_ptr()) }
}

/// Initialize with the native default domain.
pub fn init<S: AsRef<str>>(handle: &Handle<RclbContext>, args: &[S]) -> Result<()> {
    init_with_options(handle, args, &InitOptions::default())
}

/// Initialize the context from a process argument vector.
///
/// Arguments are checked before any native call. On a native init failure
/// the transient options are still finalized; if finalizing them fails after
/// a successful init, the context is shut down again.
pub fn init_with_options<S: AsRef<str>>(
    handle: &Handle<RclbContext>,
    args: &[S],
    options: &InitOptions,
) -> Result<()> {
    let argv = NativeArgs::new(args)?;
    if handle.is_empty() {
        return Err(Error::InvalidArgument("context handle is empty".to_string()));
    }
    let native_options = NativeInitOptions::new(options)?;

    // SAFETY: `argv` outlives the call; options and context are live.
    let ret = unsafe {
        rclb_init(
            argv.argc(),
            argv.argv(),
            native_options.as_ptr(),
            handle.as_ptr(),
        )
    };
    if !ret.is_ok() {
        let err = native_error(ErrorKind::Init, ret, "Failed to init context");
        drop(native_options);
        return Err(err);
    }

    if let Err(err) = native_options.finish() {
        // SAFETY: the context was initialized by the call above.
        let ret = unsafe { rclb_shutdown(handle.as_ptr()) };
        if !ret.is_ok() {
            discard_native_error(ret, "context rollback shutdown");
        }
        return Err(err);
    }
    log::debug!(
        "[rclbridge] context {} initialized with {} args",
        instance_id(handle),
        args.len()
    );
    Ok(())
}

/// Shut the context down; no-op if it is not valid.
pub fn shutdown(handle: &Handle<RclbContext>) -> Result<()> {
    if !is_valid(handle) {
        return Ok(());
    }
    // SAFETY: non-empty, checked valid above.
    let ret = unsafe { rclb_shutdown(handle.as_ptr()) };
    check(ret, ErrorKind::Runtime, "Failed to shutdown context")
}

/// Finalize and release the context.
///
/// No-op on an empty handle. A context that was never initialized is
/// released without calling native fini. If native fini fails the handle is
/// kept, so shutting down and disposing again releases it.
pub fn dispose(handle: &mut Handle<RclbContext>) -> Result<()> {
    let ptr = handle.as_ptr();
    if ptr.is_null() {
        return Ok(());
    }
    // SAFETY: non-empty handles own a live `RclbContext`.
    if unsafe { !(*ptr).impl_.is_null() } {
        let ret = unsafe { rclb_context_fini(ptr) };
        check(ret, ErrorKind::Runtime, "Failed to fini context")?;
    }
    handle.retire();
    Ok(())
}

/// Instance ID of a valid context, zero otherwise.
#[must_use]
pub fn instance_id(handle: &Handle<RclbContext>) -> u64 {
    // SAFETY: null or a live context owned by `handle`.
    unsafe { rclb_context_get_instance_id(handle.as_ptr()) }
}

/// Domain ID resolved at init.
pub fn domain_id(handle: &Handle<RclbContext>) -> Result<usize> {
    let mut domain_id = 0usize;
    // SAFETY: `domain_id` is a writable local.
    let ret = unsafe { rclb_context_get_domain_id(handle.as_ptr(), &mut domain_id) };
    check(ret, ErrorKind::Runtime, "Failed to get domain id")?;
    Ok(domain_id)
}

/// Arguments that were not consumed as ROS arguments, in order.
pub fn unparsed_arguments(handle: &Handle<RclbContext>) -> Result<Vec<String>> {
    let mut count = 0usize;
    // SAFETY: `count` is a writable local.
    let ret = unsafe { rclb_context_get_unparsed_argument_count(handle.as_ptr(), &mut count) };
    check(ret, ErrorKind::Runtime, "Failed to count unparsed arguments")?;

    let mut args = Vec::with_capacity(count);
    for index in 0..count {
        // SAFETY: index is in range; the string lives as long as the context.
        let arg = unsafe { rclb_context_get_unparsed_argument(handle.as_ptr(), index) };
        if arg.is_null() {
            return Err(native_error(
                ErrorKind::Runtime,
                RclbRet::Error,
                "Failed to get unparsed argument",
            ));
        }
        args.push(unsafe { CStr::from_ptr(arg) }.to_string_lossy().into_owned());
    }
    Ok(args)
}

/// Owned context; shut down and disposed on drop.
#[derive(Debug)]
pub struct Context {
    handle: Handle<RclbContext>,
}

impl Context {
    /// Create and initialize a context.
    pub fn new<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        Self::with_options(args, &InitOptions::default())
    }

    pub fn with_options<S: AsRef<str>>(args: &[S], options: &InitOptions) -> Result<Self> {
        // Wrapped first so a failed init still releases the block.
        let context = Self { handle: create() };
        init_with_options(&context.handle, args, options)?;
        Ok(context)
    }

    /// Initialize from [`EnvConfig::from_env`].
    pub fn from_env<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        Self::with_options(args, &InitOptions::from_env_config(&EnvConfig::from_env()))
    }

    #[must_use]
    pub fn handle(&self) -> &Handle<RclbContext> {
        &self.handle
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        is_valid(&self.handle)
    }

    pub fn shutdown(&self) -> Result<()> {
        shutdown(&self.handle)
    }

    #[must_use]
    pub fn instance_id(&self) -> u64 {
        instance_id(&self.handle)
    }

    pub fn domain_id(&self) -> Result<usize> {
        domain_id(&self.handle)
    }

    pub fn unparsed_arguments(&self) -> Result<Vec<String>> {
        unparsed_arguments(&self.handle)
    }

    /// Finalize now; later calls and the drop become no-ops.
    pub fn dispose(&mut self) -> Result<()> {
        dispose(&mut self.handle)
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        if let Err(e) = shutdown(&self.handle) {
            log::warn!("[rclbridge] context shutdown on drop failed: {}", e);
        }
        if let Err(e) = dispose(&mut self.handle) {
            log::warn!("[rclbridge] context dispose on drop failed: {}", e);
        }
    }
}
