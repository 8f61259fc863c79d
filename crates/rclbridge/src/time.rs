// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use crate::clock::ClockType;
use crate::error::{Error, Result};

const NANOS_PER_SEC: i64 = 1_000_000_000;

/// `builtin_interfaces/Time` wire layout.
///
/// `sec` is 32-bit: times past 2038-01-19T03:14:07Z saturate to `i32::MAX`
/// seconds in [`Time::to_msg`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TimeMsg {
    pub sec: i32,
    pub nanosec: u32,
}

/// A point in time measured by a clock of a given type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Time {
    nanoseconds: i64,
    clock_type: ClockType,
}

impl Time {
    /// Seconds plus nanoseconds; both must be non-negative.
    pub fn new(secs: i64, nanos: i64, clock_type: ClockType) -> Result<Self> {
        if secs < 0 || nanos < 0 {
            return Err(Error::InvalidArgument(
                "seconds and nanoseconds must not be negative".to_string(),
            ));
        }
        let nanoseconds = secs
            .checked_mul(NANOS_PER_SEC)
            .and_then(|ns| ns.checked_add(nanos))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("{}s + {}ns overflows i64 nanoseconds", secs, nanos))
            })?;
        Ok(Self {
            nanoseconds,
            clock_type,
        })
    }

    /// Non-negative nanoseconds.
    pub fn from_nanos(nanoseconds: i64, clock_type: ClockType) -> Result<Self> {
        if nanoseconds < 0 {
            return Err(Error::InvalidArgument(format!(
                "nanoseconds must not be negative, got {}",
                nanoseconds
            )));
        }
        Ok(Self {
            nanoseconds,
            clock_type,
        })
    }

    /// The epoch of `clock_type`.
    #[must_use]
    pub const fn zero(clock_type: ClockType) -> Self {
        Self {
            nanoseconds: 0,
            clock_type,
        }
    }

    /// Same instant, relabelled with another clock type.
    #[must_use]
    pub const fn with_clock_type(self, clock_type: ClockType) -> Self {
        Self {
            nanoseconds: self.nanoseconds,
            clock_type,
        }
    }

    pub fn from_msg(msg: TimeMsg, clock_type: ClockType) -> Result<Self> {
        Self::new(i64::from(msg.sec), i64::from(msg.nanosec), clock_type)
    }

    #[must_use]
    pub const fn nanoseconds(&self) -> i64 {
        self.nanoseconds
    }

    #[must_use]
    pub const fn clock_type(&self) -> ClockType {
        self.clock_type
    }

    /// Split into whole seconds and remaining nanoseconds.
    ///
    /// Seconds saturate at `i32::MAX`, see [`TimeMsg`].
    #[must_use]
    pub fn to_msg(&self) -> TimeMsg {
        let secs = self.nanoseconds.div_euclid(NANOS_PER_SEC);
        match i32::try_from(secs) {
            Ok(sec) => TimeMsg {
                sec,
                nanosec: self.nanoseconds.rem_euclid(NANOS_PER_SEC) as u32,
            },
            Err(_) => TimeMsg {
                sec: i32::MAX,
                nanosec: (NANOS_PER_SEC - 1) as u32,
            },
        }
    }
}
