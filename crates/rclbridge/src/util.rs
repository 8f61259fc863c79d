// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::ffi::CString;
use std::ptr;

use libc::{c_char, c_int};

use crate::error::{Error, Result};

/// Convert an argument count to the native `argc` type.
pub(crate) fn native_argc(len: usize) -> Result<c_int> {
    c_int::try_from(len).map_err(|_| {
        Error::InvalidArgument(format!(
            "too many arguments: {} exceeds the native maximum of {}",
            len,
            c_int::MAX
        ))
    })
}

/// Native `argc`/`argv` pair built in one pass.
///
/// The owned strings and the pointer vector live together, so `argv()` stays
/// valid for as long as the value is alive.
pub(crate) struct NativeArgs {
    _owned: Vec<CString>,
    pointers: Vec<*const c_char>,
    argc: c_int,
}

impl NativeArgs {
    pub(crate) fn new<S: AsRef<str>>(args: &[S]) -> Result<Self> {
        let argc = native_argc(args.len())?;
        let mut owned = Vec::with_capacity(args.len());
        let mut pointers = Vec::with_capacity(args.len());
        for (index, arg) in args.iter().enumerate() {
            let arg = CString::new(arg.as_ref()).map_err(|e| {
                Error::InvalidArgument(format!("argument {} contains a NUL byte: {}", index, e))
            })?;
            // The heap buffer of a CString does not move with the Vec.
            pointers.push(arg.as_ptr());
            owned.push(arg);
        }
        Ok(Self {
            _owned: owned,
            pointers,
            argc,
        })
    }

    pub(crate) fn argc(&self) -> c_int {
        self.argc
    }

    pub(crate) fn argv(&self) -> *const *const c_char {
        if self.pointers.is_empty() {
            ptr::null()
        } else {
            self.pointers.as_ptr()
        }
    }
}
