// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Move-only handles to natively owned structures.

use std::fmt;
use std::marker::PhantomData;
use std::ptr::{self, NonNull};

/// Single-owner reference to a native structure of type `T`.
///
/// The empty handle (raw value zero) means "no resource". A handle is not
/// `Clone`: exactly one owner can dispose it, and disposal empties it, so a
/// second dispose is a no-op. Dropping a non-empty handle without disposing
/// it leaks the structure; the owned wrappers (`Context`, `Clock`, `Timer`)
/// dispose in `Drop`.
pub struct Handle<T> {
    ptr: Option<NonNull<T>>,
    _owns: PhantomData<Box<T>>,
}

// SAFETY: the native structures carry no thread affinity; the handle moves
// ownership between threads but is never shared (`NonNull` keeps it !Sync).
unsafe impl<T> Send for Handle<T> {}

impl<T> Handle<T> {
    /// The "no resource" handle.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            ptr: None,
            _owns: PhantomData,
        }
    }

    pub(crate) fn from_box(value: Box<T>) -> Self {
        Self {
            ptr: Some(NonNull::from(Box::leak(value))),
            _owns: PhantomData,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    /// Integer form of the handle; zero when empty.
    #[must_use]
    pub fn as_raw(&self) -> i64 {
        self.ptr.map_or(0, |p| p.as_ptr() as usize as i64)
    }

    /// Give up ownership and return the integer form.
    #[must_use]
    pub fn into_raw(mut self) -> i64 {
        let raw = self.as_raw();
        self.ptr = None;
        raw
    }

    /// Re-adopt a handle produced by [`Handle::into_raw`].
    ///
    /// # Safety
    /// `raw` must be zero or come from `into_raw` on a `Handle<T>` of the same
    /// `T`, and must not be adopted twice.
    #[must_use]
    pub unsafe fn from_raw(raw: i64) -> Self {
        Self {
            ptr: NonNull::new(raw as usize as *mut T),
            _owns: PhantomData,
        }
    }

    /// Pointer handed to native calls; null when empty.
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.ptr.map_or(ptr::null_mut(), NonNull::as_ptr)
    }

    /// Release the allocation and leave the handle empty.
    ///
    /// Callers finalize the native contents first.
    pub(crate) fn retire(&mut self) {
        if let Some(p) = self.ptr.take() {
            // SAFETY: non-empty handles always own a leaked `Box<T>`.
            drop(unsafe { Box::from_raw(p.as_ptr()) });
        }
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle({:#x})", self.as_raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_handle_is_zero() {
        let handle: Handle<u32> = Handle::empty();
        assert!(handle.is_empty());
        assert_eq!(handle.as_raw(), 0);
        assert!(handle.as_ptr().is_null());
    }

    #[test]
    fn raw_round_trip_keeps_the_allocation() {
        let handle = Handle::from_box(Box::new(7u32));
        let raw = handle.into_raw();
        assert_ne!(raw, 0);

        let mut handle = unsafe { Handle::<u32>::from_raw(raw) };
        assert_eq!(unsafe { *handle.as_ptr() }, 7);
        handle.retire();
        assert!(handle.is_empty());
        handle.retire();
        assert!(handle.is_empty());
    }

    #[test]
    fn debug_shows_raw_value() {
        let handle: Handle<u8> = Handle::default();
        assert_eq!(format!("{:?}", handle), "Handle(0x0)");
    }
}
